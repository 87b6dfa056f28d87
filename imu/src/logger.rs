//! Fixed-schema CSV records appended to one file per stream.

use crate::error::LogFault;
use crate::status::{StatusIndicator, StatusState};
use log::{debug, error};
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Stream {
    #[strum(serialize = "acceleration")]
    Acceleration,
    #[strum(serialize = "gyroscope")]
    Gyroscope,
    #[strum(serialize = "magnetometer")]
    Magnetometer,
    #[strum(serialize = "quaternion")]
    Quaternion,
    #[strum(serialize = "yaw-pitch-roll")]
    YawPitchRoll,
    #[strum(serialize = "diagnostics")]
    Diagnostics,
}

impl Stream {
    pub fn file_name(self) -> &'static str {
        match self {
            Stream::Acceleration => "acceleration.txt",
            Stream::Gyroscope => "gyro.txt",
            Stream::Magnetometer => "mag.txt",
            Stream::Quaternion => "quaternion.txt",
            Stream::YawPitchRoll => "ypr.txt",
            Stream::Diagnostics => "diagnostics.txt",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            Stream::Acceleration => "millis,aX,aY,aZ",
            Stream::Gyroscope => "millis,gX,gY,gZ",
            Stream::Magnetometer => "millis,mX,mY,mZ",
            Stream::Quaternion => "millis,q0,qX,qY,qZ",
            Stream::YawPitchRoll => "millis,rate_hz,Yaw,Pitch,Roll",
            Stream::Diagnostics => "SelfTest,GyroBias,AccelBias,MagCalibration",
        }
    }

    /// Whether records carry a leading millisecond timestamp.
    pub fn timed(self) -> bool {
        !matches!(self, Stream::Diagnostics)
    }

    /// Number of values per record, not counting the timestamp.
    pub fn columns(self) -> usize {
        let fields = self.header().split(',').count();
        if self.timed() {
            fields - 1
        } else {
            fields
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub millis: Option<u64>,
    pub values: Vec<f64>,
}

impl LogRecord {
    pub fn timed(millis: u64, values: Vec<f64>) -> Self {
        LogRecord {
            millis: Some(millis),
            values,
        }
    }

    pub fn untimed(values: Vec<f64>) -> Self {
        LogRecord {
            millis: None,
            values,
        }
    }

    /// `\r\n` then the comma-separated fields. Values get six decimals.
    pub fn format_line(&self) -> String {
        let mut line = String::from("\r\n");
        let mut first = true;
        if let Some(millis) = self.millis {
            let _ = write!(line, "{}", millis);
            first = false;
        }
        for value in &self.values {
            if !first {
                line.push(',');
            }
            let _ = write!(line, "{:.6}", value);
            first = false;
        }
        line
    }
}

/// Named append-only files.
pub trait LogStorage {
    /// Creates `name`, or empties it if it exists, and writes `bytes`.
    fn truncate_with(&mut self, name: &str, bytes: &[u8]) -> io::Result<()>;

    fn append(&mut self, name: &str, bytes: &[u8]) -> io::Result<()>;
}

/// Files under a root directory. Every append opens, writes and closes the
/// file so nothing stays buffered between records.
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    /// The directory is created on the first truncate, not here.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        DirStorage {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl LogStorage for DirStorage {
    fn truncate_with(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.root.join(name))?;
        file.write_all(bytes)?;
        file.flush()
    }

    fn append(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(name))?;
        file.write_all(bytes)?;
        file.flush()
    }
}

/// Validates and writes records, and raises the status indicator on any
/// failure. Streams are independent: a failed append touches no other
/// stream.
pub struct RecordLogger<S: LogStorage, I: StatusIndicator> {
    storage: S,
    indicator: I,
    buffer_size: usize,
}

impl<S: LogStorage, I: StatusIndicator> RecordLogger<S, I> {
    pub fn new(storage: S, indicator: I, buffer_size: usize) -> Self {
        RecordLogger {
            storage,
            indicator,
            buffer_size,
        }
    }

    /// Writes every stream's header, truncating old contents. All streams
    /// are attempted; the first failure is returned.
    pub fn initialize(&mut self) -> Result<(), LogFault> {
        let mut first_fault = None;
        for stream in Stream::iter() {
            let result = self
                .storage
                .truncate_with(stream.file_name(), stream.header().as_bytes())
                .map_err(|source| LogFault::IoError { stream, source });
            match result {
                Ok(()) => debug!("Initialized {} log", stream),
                Err(fault) => {
                    self.fail(&fault);
                    first_fault.get_or_insert(fault);
                }
            }
        }
        match first_fault {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    pub fn append(&mut self, stream: Stream, record: &LogRecord) -> Result<(), LogFault> {
        let result = self.write_record(stream, record);
        if let Err(fault) = &result {
            self.fail(fault);
        }
        result
    }

    fn write_record(&mut self, stream: Stream, record: &LogRecord) -> Result<(), LogFault> {
        if record.values.len() != stream.columns() || record.millis.is_some() != stream.timed() {
            return Err(LogFault::SchemaMismatch {
                stream,
                expected: stream.columns(),
                found: record.values.len(),
            });
        }

        let line = record.format_line();
        if line.len() > self.buffer_size {
            return Err(LogFault::RecordTooLong {
                stream,
                len: line.len(),
                limit: self.buffer_size,
            });
        }

        self.storage
            .append(stream.file_name(), line.as_bytes())
            .map_err(|source| LogFault::IoError { stream, source })
    }

    fn fail(&mut self, fault: &LogFault) {
        error!("{}", fault);
        self.indicator.set(StatusState::Error);
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn indicator_mut(&mut self) -> &mut I {
        &mut self.indicator
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemStorage {
        files: HashMap<String, String>,
        failing: Option<&'static str>,
    }

    impl LogStorage for MemStorage {
        fn truncate_with(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
            if self.failing == Some(name) {
                return Err(io::Error::new(io::ErrorKind::Other, "card removed"));
            }
            self.files
                .insert(name.to_string(), String::from_utf8_lossy(bytes).into_owned());
            Ok(())
        }

        fn append(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
            if self.failing == Some(name) {
                return Err(io::Error::new(io::ErrorKind::Other, "card removed"));
            }
            self.files
                .entry(name.to_string())
                .or_default()
                .push_str(&String::from_utf8_lossy(bytes));
            Ok(())
        }
    }

    #[derive(Default)]
    struct LastState(Option<StatusState>);

    impl StatusIndicator for LastState {
        fn set(&mut self, state: StatusState) {
            self.0 = Some(state);
        }
    }

    fn logger(failing: Option<&'static str>) -> RecordLogger<MemStorage, LastState> {
        RecordLogger::new(
            MemStorage {
                failing,
                ..Default::default()
            },
            LastState::default(),
            100,
        )
    }

    #[test]
    fn test_stream_columns() {
        assert_eq!(Stream::Acceleration.columns(), 3);
        assert_eq!(Stream::Quaternion.columns(), 4);
        assert_eq!(Stream::YawPitchRoll.columns(), 4);
        assert_eq!(Stream::Diagnostics.columns(), 4);
        assert_eq!(Stream::YawPitchRoll.to_string(), "yaw-pitch-roll");
    }

    #[test]
    fn test_line_format() {
        let record = LogRecord::timed(1234, vec![1.0, -0.5, 1000.123456789]);
        assert_eq!(record.format_line(), "\r\n1234,1.000000,-0.500000,1000.123457");

        let record = LogRecord::untimed(vec![0.25, f64::NAN]);
        assert_eq!(record.format_line(), "\r\n0.250000,NaN");
    }

    #[test]
    fn test_initialize_writes_headers() {
        let mut logger = logger(None);
        logger.storage.files.insert("gyro.txt".into(), "old".into());
        logger.initialize().unwrap();

        assert_eq!(logger.storage().files.len(), 6);
        assert_eq!(logger.storage().files["gyro.txt"], "millis,gX,gY,gZ");
        assert_eq!(
            logger.storage().files["diagnostics.txt"],
            "SelfTest,GyroBias,AccelBias,MagCalibration"
        );
        assert_eq!(logger.indicator().0, None);
    }

    #[test]
    fn test_initialize_failure_still_writes_other_headers() {
        let mut logger = logger(Some("mag.txt"));
        let fault = logger.initialize().unwrap_err();
        assert_eq!(fault.stream(), Stream::Magnetometer);
        assert_eq!(logger.storage().files.len(), 5);
        assert_eq!(logger.indicator().0, Some(StatusState::Error));
    }

    #[test]
    fn test_append_adds_line() {
        let mut logger = logger(None);
        logger.initialize().unwrap();
        logger
            .append(Stream::Acceleration, &LogRecord::timed(7, vec![1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(
            logger.storage().files["acceleration.txt"],
            "millis,aX,aY,aZ\r\n7,1.000000,2.000000,3.000000"
        );
    }

    #[test]
    fn test_wrong_value_count_is_rejected() {
        let mut logger = logger(None);
        let result = logger.append(Stream::Quaternion, &LogRecord::timed(0, vec![1.0, 0.0]));
        assert!(matches!(
            result,
            Err(LogFault::SchemaMismatch {
                expected: 4,
                found: 2,
                ..
            })
        ));
        assert!(!logger.storage().files.contains_key("quaternion.txt"));
        assert_eq!(logger.indicator().0, Some(StatusState::Error));
    }

    #[test]
    fn test_overlong_record_is_dropped() {
        let mut logger = logger(None);
        let record = LogRecord::timed(u64::MAX, vec![1.0e30, -1.0e30, 1.0e30]);
        assert!(matches!(
            logger.append(Stream::Magnetometer, &record),
            Err(LogFault::RecordTooLong { limit: 100, .. })
        ));
        assert!(!logger.storage().files.contains_key("mag.txt"));
    }

    #[test]
    fn test_io_failure_sets_error() {
        let mut logger = logger(Some("gyro.txt"));
        let result = logger.append(Stream::Gyroscope, &LogRecord::timed(1, vec![0.0; 3]));
        assert!(matches!(result, Err(LogFault::IoError { stream: Stream::Gyroscope, .. })));
        assert_eq!(logger.indicator().0, Some(StatusState::Error));

        logger
            .append(Stream::Magnetometer, &LogRecord::timed(1, vec![0.0; 3]))
            .unwrap();
    }

    #[test]
    fn test_dir_storage_truncates_and_appends() {
        let root = std::env::temp_dir().join(format!("imu-recorder-logs-{}", std::process::id()));
        let mut storage = DirStorage::new(&root);
        storage.truncate_with("gyro.txt", b"millis,gX,gY,gZ").unwrap();
        storage.append("gyro.txt", b"\r\n1,0.5").unwrap();
        assert_eq!(
            fs::read_to_string(root.join("gyro.txt")).unwrap(),
            "millis,gX,gY,gZ\r\n1,0.5"
        );

        storage.truncate_with("gyro.txt", b"millis,gX,gY,gZ").unwrap();
        assert_eq!(
            fs::read_to_string(root.join("gyro.txt")).unwrap(),
            "millis,gX,gY,gZ"
        );
        fs::remove_dir_all(&root).unwrap();
    }
}
