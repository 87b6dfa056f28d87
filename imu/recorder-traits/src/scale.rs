use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Accelerometer full-scale range.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum AccelScale {
    #[default]
    #[strum(serialize = "2g")]
    #[serde(rename = "2g")]
    G2,
    #[strum(serialize = "4g")]
    #[serde(rename = "4g")]
    G4,
    #[strum(serialize = "8g")]
    #[serde(rename = "8g")]
    G8,
    #[strum(serialize = "16g")]
    #[serde(rename = "16g")]
    G16,
}

impl AccelScale {
    /// g per count.
    pub fn resolution(self) -> f32 {
        match self {
            AccelScale::G2 => 2.0 / 32768.0,
            AccelScale::G4 => 4.0 / 32768.0,
            AccelScale::G8 => 8.0 / 32768.0,
            AccelScale::G16 => 16.0 / 32768.0,
        }
    }

    /// ACCEL_FS_SEL field value.
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Gyroscope full-scale range.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum GyroScale {
    #[default]
    #[strum(serialize = "250dps")]
    #[serde(rename = "250dps")]
    Dps250,
    #[strum(serialize = "500dps")]
    #[serde(rename = "500dps")]
    Dps500,
    #[strum(serialize = "1000dps")]
    #[serde(rename = "1000dps")]
    Dps1000,
    #[strum(serialize = "2000dps")]
    #[serde(rename = "2000dps")]
    Dps2000,
}

impl GyroScale {
    /// deg/s per count.
    pub fn resolution(self) -> f32 {
        match self {
            GyroScale::Dps250 => 250.0 / 32768.0,
            GyroScale::Dps500 => 500.0 / 32768.0,
            GyroScale::Dps1000 => 1000.0 / 32768.0,
            GyroScale::Dps2000 => 2000.0 / 32768.0,
        }
    }

    /// GYRO_FS_SEL field value.
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Magnetometer output resolution.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum MagScale {
    #[strum(serialize = "14bit")]
    #[serde(rename = "14bit")]
    Bits14,
    #[default]
    #[strum(serialize = "16bit")]
    #[serde(rename = "16bit")]
    Bits16,
}

impl MagScale {
    /// Milligauss per count. The sensor spans ±4912 µT.
    pub fn resolution(self) -> f32 {
        match self {
            MagScale::Bits14 => 10.0 * 4912.0 / 8190.0,
            MagScale::Bits16 => 10.0 * 4912.0 / 32760.0,
        }
    }

    /// BIT field value of CNTL1.
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// The full-scale settings the device is configured with. The recorder
/// must convert counts with the same settings the driver programmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullScale {
    pub accel: AccelScale,
    pub gyro: GyroScale,
    pub mag: MagScale,
}
