use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;

mod scale;
pub use scale::{AccelScale, FullScale, GyroScale, MagScale};

// --- Basic Types ---
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vector3 { x, y, z }
    }

    pub const fn splat(v: f32) -> Self {
        Vector3 { x: v, y: v, z: v }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(v: [f32; 3]) -> Self {
        Vector3::new(v[0], v[1], v[2])
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector3(x={}, y={}, z={})", self.x, self.y, self.z)
    }
}

/// One burst of raw ADC counts, straight from the device registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
    /// `None` when the magnetometer had no fresh (or an overflowed) measurement.
    pub mag: Option<[i16; 3]>,
}

/// Self-test deviations from the factory trim, in percent.
/// Order is accel X/Y/Z followed by gyro X/Y/Z.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SelfTestReport {
    pub deviations: [f32; 6],
}

impl SelfTestReport {
    pub fn accel(&self) -> Vector3 {
        Vector3::new(self.deviations[0], self.deviations[1], self.deviations[2])
    }

    pub fn gyro(&self) -> Vector3 {
        Vector3::new(self.deviations[3], self.deviations[4], self.deviations[5])
    }
}

/// Biases measured while the device sat still, in engineering units
/// (deg/s for the gyro, g for the accelerometer).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationBiases {
    pub gyro: Vector3,
    pub accel: Vector3,
}

// --- Standard Error Type ---
#[derive(Debug)]
pub enum ImuError {
    /// Error originating from the underlying bus (I2C)
    DeviceError(String),
    /// Error reading data from the device
    ReadError(String),
    /// Error writing commands or configuration to the device
    WriteError(String),
    /// Error during device configuration or setup
    ConfigurationError(String),
    /// Functionality not supported by this specific driver
    NotSupported(String),
}

impl fmt::Display for ImuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImuError::DeviceError(s) => write!(f, "Device error: {}", s),
            ImuError::ReadError(s) => write!(f, "Read error: {}", s),
            ImuError::WriteError(s) => write!(f, "Write error: {}", s),
            ImuError::ConfigurationError(s) => write!(f, "Configuration error: {}", s),
            ImuError::NotSupported(s) => write!(f, "Not supported: {}", s),
        }
    }
}

impl StdError for ImuError {}

/// Register-level access to a 9-axis IMU.
///
/// Everything here is blocking. Implementations convert nothing: counts go
/// out as counts and the recorder applies resolution and calibration.
pub trait ImuDriver {
    /// Data-ready bit of the interrupt status register.
    fn data_ready(&mut self) -> Result<bool, ImuError>;

    fn read_raw(&mut self) -> Result<RawSample, ImuError>;

    /// Raw die temperature count.
    fn read_temperature(&mut self) -> Result<i16, ImuError>;

    fn self_test(&mut self) -> Result<SelfTestReport, ImuError>;

    /// Measures accel/gyro bias. The device must be still and level.
    fn calibrate(&mut self) -> Result<CalibrationBiases, ImuError>;

    /// Puts the accelerometer and gyroscope in active data mode.
    fn init(&mut self) -> Result<(), ImuError>;

    fn mag_device_id(&mut self) -> Result<u8, ImuError>;

    /// Starts continuous magnetometer measurements and returns the factory
    /// sensitivity adjustment per axis.
    fn init_magnetometer(&mut self) -> Result<Vector3, ImuError>;
}

/// Monotonic time source for the acquisition loop.
pub trait Clock {
    fn now_us(&self) -> u64;

    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }

    /// Blocks the calling thread.
    fn delay_ms(&mut self, ms: u32);
}
