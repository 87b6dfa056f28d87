//! The poll-driven acquisition loop.
//!
//! Every tick polls the sensor. In AHRS mode every tick also advances the
//! orientation estimate, and once per interval all streams get one record.
//! In Basic mode the latest sample is printed once per interval and nothing
//! is stored.

use crate::config::{PipelineMode, RecorderConfig};
use crate::data::SensorSample;
use crate::decoder::OrientationDecoder;
use crate::error::LogFault;
use crate::estimator::OrientationEstimator;
use crate::fusion::{FusionFilter, Mahony, MahonyParams};
use crate::logger::{LogRecord, LogStorage, RecordLogger, Stream};
use crate::reader::SensorReader;
use crate::status::StatusIndicator;
use log::{debug, info, warn};
use recorder_traits::{Clock, ImuDriver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// A new sample was read this tick.
    Fresh,
    /// The sensor had nothing new.
    NotReady,
    /// The read failed; the previous sample stays current.
    Faulted,
}

#[derive(Debug)]
pub struct TickReport {
    pub acquisition: Acquisition,
    pub emitted: bool,
    /// Records that were dropped during this tick's emission.
    pub log_faults: Vec<LogFault>,
}

/// Estimator updates per second since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateCounter {
    updates: u64,
    since_us: Option<u64>,
}

impl RateCounter {
    pub fn record(&mut self, now_us: u64) {
        match self.since_us {
            Some(_) => self.updates += 1,
            None => self.since_us = Some(now_us),
        }
    }

    pub fn rate_hz(&self, now_us: u64) -> f32 {
        let Some(since) = self.since_us else {
            return 0.0;
        };
        let elapsed_us = now_us.saturating_sub(since);
        if elapsed_us == 0 {
            return 0.0;
        }
        (self.updates as f64 * 1_000_000.0 / elapsed_us as f64) as f32
    }

    pub fn reset(&mut self, now_us: u64) {
        self.updates = 0;
        self.since_us = Some(now_us);
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }
}

pub struct Pipeline<D, S, I, F = Mahony>
where
    D: ImuDriver,
    S: LogStorage,
    I: StatusIndicator,
    F: FusionFilter,
{
    config: RecorderConfig,
    reader: SensorReader<D>,
    estimator: OrientationEstimator<F>,
    decoder: OrientationDecoder,
    logger: RecordLogger<S, I>,
    latest: Option<SensorSample>,
    last_emit_ms: u64,
    rate: RateCounter,
}

impl<D, S, I> Pipeline<D, S, I, Mahony>
where
    D: ImuDriver,
    S: LogStorage,
    I: StatusIndicator,
{
    /// Pipeline with a Mahony filter tuned from the config gains.
    pub fn with_config(
        config: RecorderConfig,
        reader: SensorReader<D>,
        logger: RecordLogger<S, I>,
    ) -> Self {
        let filter = Mahony::new(MahonyParams {
            kp: config.mahony_kp,
            ki: config.mahony_ki,
        });
        Pipeline::new(config, reader, OrientationEstimator::new(filter), logger)
    }
}

impl<D, S, I, F> Pipeline<D, S, I, F>
where
    D: ImuDriver,
    S: LogStorage,
    I: StatusIndicator,
    F: FusionFilter,
{
    pub fn new(
        config: RecorderConfig,
        reader: SensorReader<D>,
        estimator: OrientationEstimator<F>,
        logger: RecordLogger<S, I>,
    ) -> Self {
        let decoder = OrientationDecoder::new(config.declination_deg);
        Pipeline {
            config,
            reader,
            estimator,
            decoder,
            logger,
            latest: None,
            last_emit_ms: 0,
            rate: RateCounter::default(),
        }
    }

    /// Runs one poll at `now_us` on the monotonic clock.
    pub fn tick(&mut self, now_us: u64) -> TickReport {
        let now_ms = now_us / 1000;
        let acquisition = self.acquire(now_ms);

        if self.config.mode == PipelineMode::Ahrs {
            self.advance_estimator(now_us);
        }

        let mut report = TickReport {
            acquisition,
            emitted: false,
            log_faults: Vec::new(),
        };

        if now_ms.saturating_sub(self.last_emit_ms) >= self.config.interval_ms() {
            match self.config.mode {
                PipelineMode::Basic => self.emit_snapshot(),
                PipelineMode::Ahrs => report.log_faults = self.emit_records(now_us),
            }
            self.last_emit_ms = now_ms;
            report.emitted = true;
        }

        report
    }

    /// Ticks forever on `clock`.
    pub fn run<C: Clock>(&mut self, clock: &C) -> ! {
        info!(
            "Running in {} mode, emitting every {} ms",
            self.config.mode,
            self.config.interval_ms()
        );
        loop {
            self.tick(clock.now_us());
        }
    }

    fn acquire(&mut self, now_ms: u64) -> Acquisition {
        match self.reader.data_ready() {
            Ok(false) => Acquisition::NotReady,
            Ok(true) => match self.reader.read(now_ms) {
                Ok(sample) => {
                    self.latest = Some(sample);
                    Acquisition::Fresh
                }
                Err(e) => {
                    warn!("Skipping sample: {}", e);
                    Acquisition::Faulted
                }
            },
            Err(e) => {
                warn!("Skipping sample: {}", e);
                Acquisition::Faulted
            }
        }
    }

    fn advance_estimator(&mut self, now_us: u64) {
        let dt = self.estimator.tick_dt(now_us);
        if let Some(sample) = &self.latest {
            self.estimator.update(sample, dt);
            self.rate.record(now_us);
        }
    }

    fn emit_snapshot(&mut self) {
        if !self.config.console_output {
            return;
        }
        let Some(sample) = self.latest else {
            info!("Waiting for first sample");
            return;
        };

        let a = sample.accel;
        let g = sample.gyro;
        let m = sample.mag;
        let temperature = match self.reader.read_temperature() {
            Ok(t) => format!(" temp {:6.1} C", t),
            Err(e) => {
                debug!("No temperature: {}", e);
                String::new()
            }
        };
        info!(
            "accel {:8.1} {:8.1} {:8.1} mg | gyro {:8.2} {:8.2} {:8.2} deg/s | mag {:8.1} {:8.1} {:8.1} mG |{}",
            1000.0 * a.x,
            1000.0 * a.y,
            1000.0 * a.z,
            g.x,
            g.y,
            g.z,
            m.x,
            m.y,
            m.z,
            temperature
        );
    }

    fn emit_records(&mut self, now_us: u64) -> Vec<LogFault> {
        let now_ms = now_us / 1000;
        let q = self.estimator.quaternion();
        let angles = self.decoder.decode(q);
        let rate_hz = self.rate.rate_hz(now_us);

        let mut records = Vec::with_capacity(5);
        match &self.latest {
            Some(sample) => {
                let (a, g, m) = (sample.accel, sample.gyro, sample.mag);
                records.push((
                    Stream::Acceleration,
                    LogRecord::timed(
                        now_ms,
                        vec![
                            1000.0 * a.x as f64,
                            1000.0 * a.y as f64,
                            1000.0 * a.z as f64,
                        ],
                    ),
                ));
                records.push((
                    Stream::Gyroscope,
                    LogRecord::timed(now_ms, vec![g.x as f64, g.y as f64, g.z as f64]),
                ));
                records.push((
                    Stream::Magnetometer,
                    LogRecord::timed(now_ms, vec![m.x as f64, m.y as f64, m.z as f64]),
                ));
            }
            None => debug!("No sample yet, skipping sensor streams"),
        }
        records.push((
            Stream::Quaternion,
            LogRecord::timed(now_ms, q.to_array().iter().map(|&c| c as f64).collect()),
        ));
        records.push((
            Stream::YawPitchRoll,
            LogRecord::timed(
                now_ms,
                vec![
                    rate_hz as f64,
                    angles.yaw as f64,
                    angles.pitch as f64,
                    angles.roll as f64,
                ],
            ),
        ));

        let mut faults = Vec::new();
        for (stream, record) in &records {
            if let Err(fault) = self.logger.append(*stream, record) {
                faults.push(fault);
            }
        }

        if self.config.console_output {
            info!(
                "yaw {:7.2} pitch {:7.2} roll {:7.2} | rate {:7.1} Hz",
                angles.yaw, angles.pitch, angles.roll, rate_hz
            );
        }

        self.rate.reset(now_us);
        faults
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn mode(&self) -> PipelineMode {
        self.config.mode
    }

    pub fn latest_sample(&self) -> Option<&SensorSample> {
        self.latest.as_ref()
    }

    pub fn last_emit_ms(&self) -> u64 {
        self.last_emit_ms
    }

    pub fn rate(&self) -> &RateCounter {
        &self.rate
    }

    pub fn estimator(&self) -> &OrientationEstimator<F> {
        &self.estimator
    }

    pub fn reader(&self) -> &SensorReader<D> {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut SensorReader<D> {
        &mut self.reader
    }

    pub fn logger(&self) -> &RecordLogger<S, I> {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut RecordLogger<S, I> {
        &mut self.logger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rate_counts_updates_after_reference() {
        let mut rate = RateCounter::default();
        assert_eq!(rate.rate_hz(1_000), 0.0);

        rate.record(0);
        for t in 1..=100u64 {
            rate.record(t * 1_000);
        }
        assert_eq!(rate.updates(), 100);
        assert_relative_eq!(rate.rate_hz(100_000), 1000.0);
    }

    #[test]
    fn test_rate_zero_elapsed() {
        let mut rate = RateCounter::default();
        rate.reset(5_000);
        rate.record(5_000);
        assert_eq!(rate.rate_hz(5_000), 0.0);

        rate.reset(6_000);
        assert_eq!(rate.updates(), 0);
        assert_eq!(rate.rate_hz(7_000), 0.0);
    }
}
