//! Deployment constants and the runtime configuration built from them.

use crate::error::ConfigError;
use recorder_traits::{FullScale, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumString};

pub const STARTUP_DELAY_MS: u32 = 30_000;
pub const AHRS_UPDATE_INTERVAL_MS: u64 = 100;
pub const BASIC_UPDATE_INTERVAL_MS: u64 = 500;

/// Longest formatted record line accepted by the logger, in bytes.
pub const RECORD_BUFFER_SIZE: usize = 100;

/// Hard-iron offset of the deployment site (mG).
pub const MAG_BIAS_MG: Vector3 = Vector3::new(470.0, 120.0, 125.0);

/// Magnetic declination of the deployment site (degrees, east positive).
pub const MAGNETIC_DECLINATION_DEG: f32 = 8.5;

pub const AK8963_EXPECTED_ID: u8 = 0x48;

pub const TEMP_CONVERSION_FACTOR: f32 = 333.87;
pub const TEMP_OFFSET_C: f32 = 21.0;

/// Mahony filter gains.
pub const MAHONY_KP: f32 = 10.0;
pub const MAHONY_KI: f32 = 0.0;

pub const DEFAULT_LOG_DIR: &str = "/mnt/sd";

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Periodic console snapshot of the raw corrected readings
    Basic,
    /// Orientation fusion with interval logging to storage
    #[default]
    Ahrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub mode: PipelineMode,
    pub basic_interval_ms: u64,
    pub ahrs_interval_ms: u64,
    pub startup_delay_ms: u32,
    pub mag_bias_mg: Vector3,
    pub declination_deg: f32,
    pub expected_mag_id: u8,
    pub record_buffer_size: usize,
    /// Human-readable readouts on the log output. Records are written
    /// regardless.
    pub console_output: bool,
    pub full_scale: FullScale,
    pub mahony_kp: f32,
    pub mahony_ki: f32,
    pub log_dir: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        RecorderConfig {
            mode: PipelineMode::default(),
            basic_interval_ms: BASIC_UPDATE_INTERVAL_MS,
            ahrs_interval_ms: AHRS_UPDATE_INTERVAL_MS,
            startup_delay_ms: STARTUP_DELAY_MS,
            mag_bias_mg: MAG_BIAS_MG,
            declination_deg: MAGNETIC_DECLINATION_DEG,
            expected_mag_id: AK8963_EXPECTED_ID,
            record_buffer_size: RECORD_BUFFER_SIZE,
            console_output: true,
            full_scale: FullScale::default(),
            mahony_kp: MAHONY_KP,
            mahony_ki: MAHONY_KI,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl RecorderConfig {
    /// Reads a JSON config. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Parse)
    }

    /// Emission interval of the selected mode.
    pub fn interval_ms(&self) -> u64 {
        match self.mode {
            PipelineMode::Basic => self.basic_interval_ms,
            PipelineMode::Ahrs => self.ahrs_interval_ms,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
