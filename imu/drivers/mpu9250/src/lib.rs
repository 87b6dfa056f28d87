pub mod registers;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use log::{debug, error, warn};
use registers::{
    ConfigRegisters, Constants, DataRegisters, IntPinConfig, IntStatus, MagMode, MagRegisters,
    MagStatus, SelfTestEnable, SelfTestRegisters,
};
use std::error::Error as StdError;
use std::fmt;
use std::thread;
use std::time::Duration;

pub use recorder_traits::{
    AccelScale, CalibrationBiases, FullScale, GyroScale, ImuDriver, ImuError, MagScale,
    RawSample, SelfTestReport, Vector3,
};

/// Samples averaged for each half of the self-test.
const SELF_TEST_SAMPLES: usize = 200;
/// Samples averaged while measuring bias.
const CALIBRATION_SAMPLES: usize = 100;
const CALIBRATION_DELAY_MS: u64 = 5;

/// WHO_AM_I values of the MPU-9250 and its MPU-9255 sibling.
const ACCEPTED_CHIP_IDS: [u8; 2] = [Constants::MpuChipId as u8, 0x73];

// Local Error type
#[derive(Debug)]
pub enum Error {
    I2c(LinuxI2CError),
    InvalidChipId(u8),
    ShortRead { expected: usize, got: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {}", e),
            Error::InvalidChipId(id) => write!(f, "Invalid chip ID {:#04x}", id),
            Error::ShortRead { expected, got } => {
                write!(f, "Short read: expected {} bytes, got {}", expected, got)
            }
        }
    }
}

impl StdError for Error {}

impl From<LinuxI2CError> for Error {
    fn from(err: LinuxI2CError) -> Self {
        Error::I2c(err)
    }
}

// Map local Error to the shared ImuError
impl From<Error> for ImuError {
    fn from(err: Error) -> Self {
        match err {
            Error::I2c(e) => ImuError::DeviceError(format!("I2C error: {}", e)),
            Error::InvalidChipId(id) => {
                ImuError::ConfigurationError(format!("Invalid chip ID {:#04x}", id))
            }
            Error::ShortRead { expected, got } => ImuError::ReadError(format!(
                "MPU9250 short read ({} of {} bytes)",
                got, expected
            )),
        }
    }
}

/// Low-level MPU-9250 driver. The AK8963 sits behind the I2C bypass, so it
/// gets its own device handle on the same bus.
pub struct Mpu9250 {
    mpu_i2c: LinuxI2CDevice,
    mag_i2c: LinuxI2CDevice,
    scale: FullScale,
}

impl Mpu9250 {
    /// Opens both devices on the given I2C bus.
    ///
    /// # Arguments
    /// * `i2c_bus` - The I2C bus path (e.g., "/dev/i2c-1")
    /// * `scale` - Full-scale ranges to program during `init`
    pub fn new(i2c_bus: &str, scale: FullScale) -> Result<Self, Error> {
        debug!("Initializing Mpu9250 on {}...", i2c_bus);
        let mpu_i2c = LinuxI2CDevice::new(i2c_bus, Constants::MpuI2cAddr as u16)?;
        let mag_i2c = LinuxI2CDevice::new(i2c_bus, Constants::MagI2cAddr as u16)?;

        let mut imu = Mpu9250 {
            mpu_i2c,
            mag_i2c,
            scale,
        };
        imu.verify_chip_id()?;
        Ok(imu)
    }

    pub fn scale(&self) -> FullScale {
        self.scale
    }

    fn verify_chip_id(&mut self) -> Result<(), Error> {
        let chip_id = self
            .mpu_i2c
            .smbus_read_byte_data(DataRegisters::WhoAmI as u8)?;
        if !ACCEPTED_CHIP_IDS.contains(&chip_id) {
            error!("Invalid chip ID. Expected 0x71, got {:#x}", chip_id);
            return Err(Error::InvalidChipId(chip_id));
        }
        debug!("Mpu9250 chip ID verified: 0x{:02X}", chip_id);
        Ok(())
    }

    fn write(&mut self, register: ConfigRegisters, value: u8) -> Result<(), Error> {
        self.mpu_i2c
            .smbus_write_byte_data(register as u8, value)
            .map_err(Error::I2c)
    }

    fn write_mag(&mut self, value: u8) -> Result<(), Error> {
        self.mag_i2c
            .smbus_write_byte_data(MagRegisters::Cntl1 as u8, value)
            .map_err(Error::I2c)
    }

    fn read_block(device: &mut LinuxI2CDevice, register: u8, len: usize) -> Result<Vec<u8>, Error> {
        let buf = device.smbus_read_i2c_block_data(register, len as u8)?;
        if buf.len() < len {
            return Err(Error::ShortRead {
                expected: len,
                got: buf.len(),
            });
        }
        Ok(buf)
    }

    /// Clears sleep mode and selects the gyro PLL as clock source.
    fn wake(&mut self) -> Result<(), Error> {
        self.write(ConfigRegisters::PwrMgmt1, 0x00)?;
        thread::sleep(Duration::from_millis(100));
        self.write(ConfigRegisters::PwrMgmt1, 0x01)?;
        thread::sleep(Duration::from_millis(200));
        Ok(())
    }

    /// 41 Hz DLPF, 200 Hz sample rate, configured ranges, magnetometer
    /// bypass and raw-data-ready interrupt.
    fn configure(&mut self) -> Result<(), Error> {
        self.write(ConfigRegisters::Config, 0x03)?;
        self.write(ConfigRegisters::SmplrtDiv, 0x04)?;
        self.write(ConfigRegisters::GyroConfig, self.scale.gyro.bits() << 3)?;
        self.write(ConfigRegisters::AccelConfig, self.scale.accel.bits() << 3)?;
        self.write(ConfigRegisters::AccelConfig2, 0x03)?;
        self.write(ConfigRegisters::UserCtrl, 0x00)?;
        self.write(
            ConfigRegisters::IntPinCfg,
            (IntPinConfig::BYPASS_EN | IntPinConfig::LATCH_INT_EN).bits(),
        )?;
        self.write(ConfigRegisters::IntEnable, IntStatus::RAW_DATA_RDY.bits())?;
        Ok(())
    }

    /// Reads accel, temperature and gyro in one burst so they belong to the
    /// same sample.
    fn read_motion(&mut self) -> Result<([i16; 3], i16, [i16; 3]), Error> {
        let buf = Self::read_block(&mut self.mpu_i2c, DataRegisters::AccelXoutH as u8, 14)?;
        let accel = [
            BigEndian::read_i16(&buf[0..2]),
            BigEndian::read_i16(&buf[2..4]),
            BigEndian::read_i16(&buf[4..6]),
        ];
        let temp = BigEndian::read_i16(&buf[6..8]);
        let gyro = [
            BigEndian::read_i16(&buf[8..10]),
            BigEndian::read_i16(&buf[10..12]),
            BigEndian::read_i16(&buf[12..14]),
        ];
        Ok((accel, temp, gyro))
    }

    /// Returns `None` when no new measurement is ready or the sensor
    /// overflowed. Reading ST2 releases the data registers for the next
    /// measurement.
    fn read_mag_counts(&mut self) -> Result<Option<[i16; 3]>, Error> {
        let st1 = MagStatus::from_bits_truncate(
            self.mag_i2c.smbus_read_byte_data(MagRegisters::St1 as u8)?,
        );
        if !st1.contains(MagStatus::DATA_READY) {
            return Ok(None);
        }
        let buf = Self::read_block(&mut self.mag_i2c, MagRegisters::XoutL as u8, 7)?;
        let st2 = MagStatus::from_bits_truncate(buf[6]);
        if st2.contains(MagStatus::SENSOR_OVERFLOW) {
            warn!("AK8963 magnetic sensor overflow, dropping measurement");
            return Ok(None);
        }
        Ok(Some([
            LittleEndian::read_i16(&buf[0..2]),
            LittleEndian::read_i16(&buf[2..4]),
            LittleEndian::read_i16(&buf[4..6]),
        ]))
    }

    fn average_motion(&mut self, samples: usize) -> Result<([f32; 3], [f32; 3]), Error> {
        let mut accel = Vec::with_capacity(samples);
        let mut gyro = Vec::with_capacity(samples);
        for _ in 0..samples {
            let (a, _, g) = self.read_motion()?;
            accel.push(a);
            gyro.push(g);
            thread::sleep(Duration::from_millis(1));
        }
        Ok((average_counts(&accel), average_counts(&gyro)))
    }

    pub fn run_self_test(&mut self) -> Result<SelfTestReport, Error> {
        self.wake()?;
        // Self-test is specified at 250 dps / 2 g with 92 Hz bandwidth.
        self.write(ConfigRegisters::SmplrtDiv, 0x00)?;
        self.write(ConfigRegisters::Config, 0x02)?;
        self.write(ConfigRegisters::GyroConfig, 0x00)?;
        self.write(ConfigRegisters::AccelConfig2, 0x02)?;
        self.write(ConfigRegisters::AccelConfig, 0x00)?;

        let (accel_normal, gyro_normal) = self.average_motion(SELF_TEST_SAMPLES)?;

        let enable = SelfTestEnable::all().bits();
        self.write(ConfigRegisters::AccelConfig, enable)?;
        self.write(ConfigRegisters::GyroConfig, enable)?;
        thread::sleep(Duration::from_millis(25));

        let (accel_st, gyro_st) = self.average_motion(SELF_TEST_SAMPLES)?;

        self.write(ConfigRegisters::AccelConfig, 0x00)?;
        self.write(ConfigRegisters::GyroConfig, 0x00)?;
        thread::sleep(Duration::from_millis(25));

        let trim_registers = [
            SelfTestRegisters::XAccel,
            SelfTestRegisters::YAccel,
            SelfTestRegisters::ZAccel,
            SelfTestRegisters::XGyro,
            SelfTestRegisters::YGyro,
            SelfTestRegisters::ZGyro,
        ];
        let mut deviations = [0.0f32; 6];
        for (i, register) in trim_registers.iter().enumerate() {
            let code = self.mpu_i2c.smbus_read_byte_data(*register as u8)?;
            let (normal, st) = if i < 3 {
                (accel_normal[i], accel_st[i])
            } else {
                (gyro_normal[i - 3], gyro_st[i - 3])
            };
            deviations[i] = self_test_deviation(normal, st, factory_trim(code));
        }

        self.configure()?;
        Ok(SelfTestReport { deviations })
    }

    pub fn measure_biases(&mut self) -> Result<CalibrationBiases, Error> {
        self.wake()?;
        self.configure()?;
        thread::sleep(Duration::from_millis(100));

        let mut accel = Vec::with_capacity(CALIBRATION_SAMPLES);
        let mut gyro = Vec::with_capacity(CALIBRATION_SAMPLES);
        for _ in 0..CALIBRATION_SAMPLES {
            let (a, _, g) = self.read_motion()?;
            accel.push(a);
            gyro.push(g);
            thread::sleep(Duration::from_millis(CALIBRATION_DELAY_MS));
        }

        let gyro_res = self.scale.gyro.resolution();
        let accel_res = self.scale.accel.resolution();
        let gyro_avg = average_counts(&gyro);
        let accel_avg = average_counts(&accel).map(|c| c * accel_res);

        Ok(CalibrationBiases {
            gyro: Vector3::new(
                gyro_avg[0] * gyro_res,
                gyro_avg[1] * gyro_res,
                gyro_avg[2] * gyro_res,
            ),
            accel: Vector3::from(remove_gravity(accel_avg)),
        })
    }

    pub fn start_magnetometer(&mut self) -> Result<Vector3, Error> {
        self.write_mag(MagMode::PowerDown as u8)?;
        thread::sleep(Duration::from_millis(10));
        self.write_mag(MagMode::FuseRom as u8)?;
        thread::sleep(Duration::from_millis(10));

        let asa = Self::read_block(&mut self.mag_i2c, MagRegisters::AsaX as u8, 3)?;

        self.write_mag(MagMode::PowerDown as u8)?;
        thread::sleep(Duration::from_millis(10));
        self.write_mag((self.scale.mag.bits() << 4) | MagMode::Continuous100Hz as u8)?;
        thread::sleep(Duration::from_millis(10));

        Ok(Vector3::new(
            sensitivity_adjustment(asa[0]),
            sensitivity_adjustment(asa[1]),
            sensitivity_adjustment(asa[2]),
        ))
    }
}

impl ImuDriver for Mpu9250 {
    fn data_ready(&mut self) -> Result<bool, ImuError> {
        let status = self
            .mpu_i2c
            .smbus_read_byte_data(DataRegisters::IntStatus as u8)
            .map_err(Error::I2c)?;
        Ok(IntStatus::from_bits_truncate(status).contains(IntStatus::RAW_DATA_RDY))
    }

    fn read_raw(&mut self) -> Result<RawSample, ImuError> {
        let (accel, _, gyro) = self.read_motion()?;
        let mag = self.read_mag_counts()?;
        Ok(RawSample { accel, gyro, mag })
    }

    fn read_temperature(&mut self) -> Result<i16, ImuError> {
        let buf = Self::read_block(&mut self.mpu_i2c, DataRegisters::TempOutH as u8, 2)?;
        Ok(BigEndian::read_i16(&buf[0..2]))
    }

    fn self_test(&mut self) -> Result<SelfTestReport, ImuError> {
        Ok(self.run_self_test()?)
    }

    fn calibrate(&mut self) -> Result<CalibrationBiases, ImuError> {
        Ok(self.measure_biases()?)
    }

    fn init(&mut self) -> Result<(), ImuError> {
        self.wake()?;
        self.configure()?;
        debug!("Mpu9250 configured: {:?}", self.scale);
        Ok(())
    }

    fn mag_device_id(&mut self) -> Result<u8, ImuError> {
        let id = self
            .mag_i2c
            .smbus_read_byte_data(MagRegisters::WhoAmI as u8)
            .map_err(Error::I2c)?;
        if id != Constants::MagChipId as u8 {
            debug!("AK8963 reported id {:#04x}", id);
        }
        Ok(id)
    }

    fn init_magnetometer(&mut self) -> Result<Vector3, ImuError> {
        Ok(self.start_magnetometer()?)
    }
}

/// Factory self-test response for a trim code at the 250 dps / 2 g range.
pub fn factory_trim(code: u8) -> f32 {
    2620.0 * 1.01f32.powf(code as f32 - 1.0)
}

/// Percent deviation of the measured self-test response from the factory
/// response.
pub fn self_test_deviation(normal: f32, self_test: f32, trim: f32) -> f32 {
    100.0 * (self_test - normal) / trim - 100.0
}

/// AK8963 ASA register to a multiplicative sensitivity factor.
pub fn sensitivity_adjustment(asa: u8) -> f32 {
    (asa as f32 - 128.0) / 256.0 + 1.0
}

pub fn average_counts(samples: &[[i16; 3]]) -> [f32; 3] {
    if samples.is_empty() {
        return [0.0; 3];
    }
    let mut sum = [0i64; 3];
    for s in samples {
        for (acc, v) in sum.iter_mut().zip(s) {
            *acc += *v as i64;
        }
    }
    let n = samples.len() as f32;
    sum.map(|v| v as f32 / n)
}

/// Takes out the 1 g the Z axis sees when the board lies flat, either side up.
pub fn remove_gravity(accel_g: [f32; 3]) -> [f32; 3] {
    let [x, y, z] = accel_g;
    let z = if z > 0.0 { z - 1.0 } else { z + 1.0 };
    [x, y, z]
}
