use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive)]
pub enum SelfTestRegisters {
    XGyro = 0x00,
    YGyro = 0x01,
    ZGyro = 0x02,
    XAccel = 0x0D,
    YAccel = 0x0E,
    ZAccel = 0x0F,
}

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive)]
pub enum ConfigRegisters {
    SmplrtDiv = 0x19,
    Config = 0x1A,
    GyroConfig = 0x1B,
    AccelConfig = 0x1C,
    AccelConfig2 = 0x1D,
    IntPinCfg = 0x37,
    IntEnable = 0x38,
    UserCtrl = 0x6A,
    PwrMgmt1 = 0x6B,
    PwrMgmt2 = 0x6C,
}

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive)]
pub enum DataRegisters {
    IntStatus = 0x3A,
    AccelXoutH = 0x3B,
    TempOutH = 0x41,
    GyroXoutH = 0x43,
    WhoAmI = 0x75,
}

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive)]
pub enum MagRegisters {
    WhoAmI = 0x00,
    St1 = 0x02,
    XoutL = 0x03,
    St2 = 0x09,
    Cntl1 = 0x0A,
    AsaX = 0x10,
}

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive)]
pub enum MagMode {
    PowerDown = 0x00,
    Continuous8Hz = 0x02,
    Continuous100Hz = 0x06,
    FuseRom = 0x0F,
}

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive)]
pub enum Constants {
    MpuI2cAddr = 0x68,
    MagI2cAddr = 0x0C,
    MpuChipId = 0x71,
    MagChipId = 0x48,
}

bitflags! {
    /// INT_STATUS
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IntStatus: u8 {
        const RAW_DATA_RDY = 0x01;
        const FSYNC = 0x08;
        const FIFO_OVERFLOW = 0x10;
        const WOM = 0x40;
    }
}

bitflags! {
    /// AK8963 ST1 / ST2
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MagStatus: u8 {
        const DATA_READY = 0x01;
        const DATA_OVERRUN = 0x02;
        const SENSOR_OVERFLOW = 0x08;
    }
}

bitflags! {
    /// INT_PIN_CFG
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IntPinConfig: u8 {
        const BYPASS_EN = 0x02;
        const LATCH_INT_EN = 0x20;
    }
}

bitflags! {
    /// Self-test enable bits of GYRO_CONFIG / ACCEL_CONFIG.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SelfTestEnable: u8 {
        const X = 0x80;
        const Y = 0x40;
        const Z = 0x20;
    }
}
