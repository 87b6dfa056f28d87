use crate::logger::Stream;
use recorder_traits::ImuError;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// A sensor read that produced no sample. The tick skips acquisition.
#[derive(Debug)]
pub enum SensorFault {
    Bus(ImuError),
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorFault::Bus(e) => write!(f, "Sensor bus fault: {}", e),
        }
    }
}

impl StdError for SensorFault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SensorFault::Bus(e) => Some(e),
        }
    }
}

impl From<ImuError> for SensorFault {
    fn from(err: ImuError) -> Self {
        SensorFault::Bus(err)
    }
}

/// A record that did not reach its stream. Nothing was written for it.
#[derive(Debug)]
pub enum LogFault {
    IoError { stream: Stream, source: io::Error },
    SchemaMismatch {
        stream: Stream,
        expected: usize,
        found: usize,
    },
    RecordTooLong {
        stream: Stream,
        len: usize,
        limit: usize,
    },
}

impl LogFault {
    pub fn stream(&self) -> Stream {
        match self {
            LogFault::IoError { stream, .. }
            | LogFault::SchemaMismatch { stream, .. }
            | LogFault::RecordTooLong { stream, .. } => *stream,
        }
    }
}

impl fmt::Display for LogFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFault::IoError { stream, source } => {
                write!(f, "I/O error on stream {}: {}", stream, source)
            }
            LogFault::SchemaMismatch {
                stream,
                expected,
                found,
            } => write!(
                f,
                "Stream {} takes {} values, record has {}",
                stream, expected, found
            ),
            LogFault::RecordTooLong { stream, len, limit } => write!(
                f,
                "Record for stream {} is {} bytes, limit is {}",
                stream, len, limit
            ),
        }
    }
}

impl StdError for LogFault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            LogFault::IoError { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Problems found while bringing the sensor up. None of them stop the
/// recorder.
#[derive(Debug)]
pub enum CalibrationFault {
    DeviceIdMismatch { expected: u8, found: u8 },
    Device(ImuError),
}

impl fmt::Display for CalibrationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationFault::DeviceIdMismatch { expected, found } => write!(
                f,
                "Magnetometer ID mismatch: expected {:#04x}, found {:#04x}",
                expected, found
            ),
            CalibrationFault::Device(e) => write!(f, "Calibration failed: {}", e),
        }
    }
}

impl StdError for CalibrationFault {}

impl From<ImuError> for CalibrationFault {
    fn from(err: ImuError) -> Self {
        CalibrationFault::Device(err)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Cannot read config {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "Invalid config: {}", e),
        }
    }
}

impl StdError for ConfigError {}
