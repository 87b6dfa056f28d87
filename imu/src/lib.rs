pub mod calibration;
pub mod clock;
pub mod config;
pub mod data;
pub mod decoder;
pub mod error;
pub mod estimator;
pub mod fusion;
pub mod logger;
pub mod pipeline;
pub mod reader;
pub mod startup;
pub mod status;

pub use calibration::{AxisCalibration, CalibrationProfile};
pub use clock::SystemClock;
pub use config::{PipelineMode, RecorderConfig};
pub use data::{EulerAngles, Quaternion, SensorSample};
pub use decoder::OrientationDecoder;
pub use error::{CalibrationFault, ConfigError, LogFault, SensorFault};
pub use estimator::{OrientationEstimator, OrientationState};
pub use fusion::{FusionFilter, Mahony, MahonyParams};
pub use logger::{DirStorage, LogRecord, LogStorage, RecordLogger, Stream};
pub use pipeline::{Acquisition, Pipeline, RateCounter, TickReport};
pub use reader::SensorReader;
pub use startup::{run_startup, StartupReport};
pub use status::{LogIndicator, StatusIndicator, StatusState};

// --- Shared driver-facing types ---
pub use recorder_traits::{
    AccelScale, CalibrationBiases, Clock, FullScale, GyroScale, ImuDriver, ImuError, MagScale,
    RawSample, SelfTestReport, Vector3,
};
