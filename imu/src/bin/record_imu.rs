use clap::Parser;
use imu_recorder::{AccelScale, GyroScale, MagScale, PipelineMode, RecorderConfig};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

//* run by `cargo run --bin record_imu -- --i2c-bus /dev/i2c-1 --mode ahrs` */

#[derive(Parser, Debug)]
#[command(version, about = "Reads an MPU-9250 and records orientation logs")]
struct Args {
    /// I2C bus the sensor is attached to
    #[arg(long, default_value = "/dev/i2c-1")]
    i2c_bus: String,

    /// JSON config file. Options given here override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    mode: Option<PipelineMode>,

    /// Directory the log files are written to
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(long)]
    startup_delay_ms: Option<u32>,

    #[arg(long, allow_hyphen_values = true)]
    declination_deg: Option<f32>,

    /// e.g. 2g, 4g, 8g, 16g
    #[arg(long)]
    accel_scale: Option<AccelScale>,

    /// e.g. 250dps, 500dps, 1000dps, 2000dps
    #[arg(long)]
    gyro_scale: Option<GyroScale>,

    /// 14bit or 16bit
    #[arg(long)]
    mag_scale: Option<MagScale>,

    /// Suppress the per-interval console readouts
    #[arg(long)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> io::Result<(String, RecorderConfig)> {
        let mut config = match &self.config {
            Some(path) => RecorderConfig::from_json_file(path)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?,
            None => RecorderConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = log_dir;
        }
        if let Some(delay) = self.startup_delay_ms {
            config.startup_delay_ms = delay;
        }
        if let Some(declination) = self.declination_deg {
            config.declination_deg = declination;
        }
        if let Some(accel) = self.accel_scale {
            config.full_scale.accel = accel;
        }
        if let Some(gyro) = self.gyro_scale {
            config.full_scale.gyro = gyro;
        }
        if let Some(mag) = self.mag_scale {
            config.full_scale.mag = mag;
        }
        if self.quiet {
            config.console_output = false;
        }

        Ok((self.i2c_bus, config))
    }
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (i2c_bus, config) = Args::parse().into_config()?;
    tracing::info!(config = %config.to_json(), "Starting recorder");

    record(&i2c_bus, config)
}

#[cfg(target_os = "linux")]
fn record(i2c_bus: &str, config: RecorderConfig) -> io::Result<()> {
    use imu_recorder::{
        run_startup, CalibrationProfile, DirStorage, LogIndicator, Pipeline, RecordLogger,
        SensorReader, SystemClock,
    };
    use linux_mpu9250::Mpu9250;

    let driver = Mpu9250::new(i2c_bus, config.full_scale)
        .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e.to_string()))?;
    tracing::info!("Connected to MPU-9250 on {}", i2c_bus);

    let mut reader = SensorReader::new(
        driver,
        CalibrationProfile::new(config.mag_bias_mg),
        config.full_scale,
    );
    let mut logger = RecordLogger::new(
        DirStorage::new(&config.log_dir),
        LogIndicator::new(),
        config.record_buffer_size,
    );
    let mut clock = SystemClock::new();

    let report = run_startup(&mut clock, &mut reader, &mut logger, &config);
    if !report.calibration_faults.is_empty() || !report.log_faults.is_empty() {
        tracing::warn!(
            calibration_faults = report.calibration_faults.len(),
            log_faults = report.log_faults.len(),
            "Startup finished with faults"
        );
    }

    let mut pipeline = Pipeline::with_config(config, reader, logger);
    pipeline.run(&clock)
}

#[cfg(not(target_os = "linux"))]
fn record(_i2c_bus: &str, _config: RecorderConfig) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("Unsupported OS: {}", std::env::consts::OS),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "record_imu",
            "--mode",
            "basic",
            "--declination-deg",
            "-2.5",
            "--accel-scale",
            "4g",
            "--quiet",
        ]);
        let (bus, config) = args.into_config().unwrap();
        assert_eq!(bus, "/dev/i2c-1");
        assert_eq!(config.mode, PipelineMode::Basic);
        assert_eq!(config.declination_deg, -2.5);
        assert_eq!(config.full_scale.accel, AccelScale::G4);
        assert!(!config.console_output);
        assert_eq!(config.startup_delay_ms, 30_000);
    }
}
