//! One-shot bring-up run before the pipeline loop.
//!
//! Nothing here is fatal. A step that fails is logged and the recorder
//! carries on with whatever calibration it has.

use crate::config::RecorderConfig;
use crate::error::{CalibrationFault, LogFault};
use crate::logger::{LogRecord, LogStorage, RecordLogger, Stream};
use crate::reader::SensorReader;
use crate::status::{StatusIndicator, StatusState};
use log::{info, warn};
use recorder_traits::{CalibrationBiases, Clock, ImuDriver, SelfTestReport, Vector3};

#[derive(Debug, Default)]
pub struct StartupReport {
    pub self_test: Option<SelfTestReport>,
    pub biases: Option<CalibrationBiases>,
    pub mag_sensitivity: Option<Vector3>,
    pub calibration_faults: Vec<CalibrationFault>,
    pub log_faults: Vec<LogFault>,
}

pub fn run_startup<C, D, S, I>(
    clock: &mut C,
    reader: &mut SensorReader<D>,
    logger: &mut RecordLogger<S, I>,
    config: &RecorderConfig,
) -> StartupReport
where
    C: Clock,
    D: ImuDriver,
    S: LogStorage,
    I: StatusIndicator,
{
    let mut report = StartupReport::default();

    logger.indicator_mut().set(StatusState::Waiting);
    info!("Waiting {} ms for the sensor to settle", config.startup_delay_ms);
    clock.delay_ms(config.startup_delay_ms);
    logger.indicator_mut().set(StatusState::Recording);

    if let Err(fault) = logger.initialize() {
        report.log_faults.push(fault);
    }

    match reader.driver_mut().self_test() {
        Ok(st) => {
            let [ax, ay, az, gx, gy, gz] = st.deviations;
            info!(
                "Self-test deviation from factory trim (%): accel {:.3} {:.3} {:.3}, gyro {:.3} {:.3} {:.3}",
                ax, ay, az, gx, gy, gz
            );
            report.self_test = Some(st);
        }
        Err(e) => {
            warn!("Self-test failed: {}", e);
            report.calibration_faults.push(e.into());
        }
    }

    match reader.driver_mut().calibrate() {
        Ok(biases) => {
            info!("Gyro bias {} deg/s, accel bias {} g", biases.gyro, biases.accel);
            reader.calibration_mut().set_device_biases(biases);
            report.biases = Some(biases);
        }
        Err(e) => {
            warn!("Bias calibration failed, using zero bias: {}", e);
            report.calibration_faults.push(e.into());
        }
    }

    if let Err(e) = reader.driver_mut().init() {
        warn!("Sensor init failed: {}", e);
        report.calibration_faults.push(e.into());
    }

    match reader.driver_mut().mag_device_id() {
        Ok(id) if id == config.expected_mag_id => info!("Magnetometer ID {:#04x}", id),
        Ok(id) => {
            let fault = CalibrationFault::DeviceIdMismatch {
                expected: config.expected_mag_id,
                found: id,
            };
            warn!("{}", fault);
            report.calibration_faults.push(fault);
        }
        Err(e) => {
            warn!("Cannot read magnetometer ID: {}", e);
            report.calibration_faults.push(e.into());
        }
    }

    match reader.driver_mut().init_magnetometer() {
        Ok(sensitivity) => {
            info!("Magnetometer sensitivity {}", sensitivity);
            reader.calibration_mut().set_mag_sensitivity(sensitivity);
            report.mag_sensitivity = Some(sensitivity);
        }
        Err(e) => {
            warn!("Magnetometer init failed: {}", e);
            report.calibration_faults.push(e.into());
        }
    }

    for record in diagnostics_rows(report.self_test.as_ref(), reader) {
        if let Err(fault) = logger.append(Stream::Diagnostics, &record) {
            report.log_faults.push(fault);
        }
    }

    report
}

/// One row per axis: accel self-test deviation, gyro bias, accel bias and
/// magnetometer sensitivity. A missing self-test is written as NaN.
fn diagnostics_rows<D: ImuDriver>(
    self_test: Option<&SelfTestReport>,
    reader: &SensorReader<D>,
) -> Vec<LogRecord> {
    let calibration = reader.calibration();
    let deviation = self_test.map(|st| st.accel().to_array());
    let gyro_bias = calibration.gyro.bias.to_array();
    let accel_bias = calibration.accel.bias.to_array();
    let mag_scale = calibration.mag.scale.to_array();

    (0..3)
        .map(|axis| {
            LogRecord::untimed(vec![
                deviation.map_or(f64::NAN, |d| d[axis] as f64),
                gyro_bias[axis] as f64,
                accel_bias[axis] as f64,
                mag_scale[axis] as f64,
            ])
        })
        .collect()
}
