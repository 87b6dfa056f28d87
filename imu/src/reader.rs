use crate::calibration::CalibrationProfile;
use crate::config::{TEMP_CONVERSION_FACTOR, TEMP_OFFSET_C};
use crate::data::SensorSample;
use crate::error::SensorFault;
use log::trace;
use recorder_traits::{FullScale, ImuDriver};

/// Turns driver counts into corrected engineering units.
pub struct SensorReader<D: ImuDriver> {
    driver: D,
    calibration: CalibrationProfile,
    scale: FullScale,
    /// The magnetometer runs slower than the accel/gyro; bursts without a
    /// fresh measurement reuse these counts.
    last_mag_counts: [i16; 3],
}

impl<D: ImuDriver> SensorReader<D> {
    pub fn new(driver: D, calibration: CalibrationProfile, scale: FullScale) -> Self {
        SensorReader {
            driver,
            calibration,
            scale,
            last_mag_counts: [0; 3],
        }
    }

    pub fn data_ready(&mut self) -> Result<bool, SensorFault> {
        Ok(self.driver.data_ready()?)
    }

    pub fn read(&mut self, timestamp_ms: u64) -> Result<SensorSample, SensorFault> {
        let raw = self.driver.read_raw()?;
        match raw.mag {
            Some(counts) => self.last_mag_counts = counts,
            None => trace!("No fresh magnetometer data, reusing previous counts"),
        }

        Ok(SensorSample {
            accel: self
                .calibration
                .accel
                .apply(raw.accel, self.scale.accel.resolution()),
            gyro: self
                .calibration
                .gyro
                .apply(raw.gyro, self.scale.gyro.resolution()),
            mag: self
                .calibration
                .mag
                .apply(self.last_mag_counts, self.scale.mag.resolution()),
            timestamp_ms,
        })
    }

    /// Die temperature in °C.
    pub fn read_temperature(&mut self) -> Result<f32, SensorFault> {
        let count = self.driver.read_temperature()?;
        Ok(count as f32 / TEMP_CONVERSION_FACTOR + TEMP_OFFSET_C)
    }

    pub fn calibration(&self) -> &CalibrationProfile {
        &self.calibration
    }

    pub fn calibration_mut(&mut self) -> &mut CalibrationProfile {
        &mut self.calibration
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use recorder_traits::{
        CalibrationBiases, ImuError, MagScale, RawSample, SelfTestReport, Vector3,
    };
    use std::collections::VecDeque;

    struct QueueDriver {
        samples: VecDeque<Result<RawSample, ImuError>>,
    }

    impl ImuDriver for QueueDriver {
        fn data_ready(&mut self) -> Result<bool, ImuError> {
            Ok(!self.samples.is_empty())
        }
        fn read_raw(&mut self) -> Result<RawSample, ImuError> {
            self.samples
                .pop_front()
                .unwrap_or_else(|| Err(ImuError::ReadError("empty".to_string())))
        }
        fn read_temperature(&mut self) -> Result<i16, ImuError> {
            Ok(3339)
        }
        fn self_test(&mut self) -> Result<SelfTestReport, ImuError> {
            Ok(SelfTestReport::default())
        }
        fn calibrate(&mut self) -> Result<CalibrationBiases, ImuError> {
            Ok(CalibrationBiases::default())
        }
        fn init(&mut self) -> Result<(), ImuError> {
            Ok(())
        }
        fn mag_device_id(&mut self) -> Result<u8, ImuError> {
            Ok(0x48)
        }
        fn init_magnetometer(&mut self) -> Result<Vector3, ImuError> {
            Ok(Vector3::splat(1.0))
        }
    }

    fn reader(samples: Vec<Result<RawSample, ImuError>>) -> SensorReader<QueueDriver> {
        SensorReader::new(
            QueueDriver {
                samples: samples.into(),
            },
            CalibrationProfile::new(Vector3::new(470.0, 120.0, 125.0)),
            FullScale::default(),
        )
    }

    #[test]
    fn test_counts_converted_with_resolution_and_bias() {
        let mut reader = reader(vec![Ok(RawSample {
            accel: [16384, 0, -16384],
            gyro: [131, -262, 0],
            mag: Some([100, 100, 100]),
        })]);

        let sample = reader.read(42).unwrap();
        assert_eq!(sample.timestamp_ms, 42);
        assert_relative_eq!(sample.accel.x, 1.0);
        assert_relative_eq!(sample.accel.z, -1.0);
        assert_relative_eq!(sample.gyro.x, 131.0 * 250.0 / 32768.0, epsilon = 1e-6);
        assert_relative_eq!(sample.gyro.y, -262.0 * 250.0 / 32768.0, epsilon = 1e-6);
        let res = MagScale::Bits16.resolution();
        assert_relative_eq!(sample.mag.x, 100.0 * res - 470.0, epsilon = 1e-4);
        assert_relative_eq!(sample.mag.y, 100.0 * res - 120.0, epsilon = 1e-4);
    }

    #[test]
    fn test_stale_magnetometer_reuses_previous_counts() {
        let mut reader = reader(vec![
            Ok(RawSample {
                accel: [0; 3],
                gyro: [0; 3],
                mag: Some([200, -200, 50]),
            }),
            Ok(RawSample {
                accel: [1; 3],
                gyro: [1; 3],
                mag: None,
            }),
        ]);

        let first = reader.read(0).unwrap();
        let second = reader.read(5).unwrap();
        assert_eq!(first.mag, second.mag);
        assert_ne!(first.accel, second.accel);
    }

    #[test]
    fn test_bus_failure_surfaces_as_sensor_fault() {
        let mut reader = reader(vec![Err(ImuError::DeviceError("nack".to_string()))]);
        assert!(matches!(reader.read(0), Err(SensorFault::Bus(_))));
    }

    #[test]
    fn test_temperature_conversion() {
        let mut reader = reader(vec![]);
        assert_relative_eq!(reader.read_temperature().unwrap(), 31.0, epsilon = 1e-2);
    }
}
