use crate::data::{Quaternion, SensorSample};
use crate::fusion::{FusionFilter, Mahony};
use nalgebra::Vector3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationState {
    pub quaternion: Quaternion,
    /// `None` until the first tick.
    pub last_update_us: Option<u64>,
}

/// Owns the running orientation and feeds corrected samples into the
/// fusion filter.
pub struct OrientationEstimator<F: FusionFilter = Mahony> {
    filter: F,
    state: OrientationState,
}

impl Default for OrientationEstimator<Mahony> {
    fn default() -> Self {
        OrientationEstimator::new(Mahony::default())
    }
}

impl<F: FusionFilter> OrientationEstimator<F> {
    pub fn new(filter: F) -> Self {
        let quaternion = Quaternion::from(filter.orientation());
        OrientationEstimator {
            filter,
            state: OrientationState {
                quaternion,
                last_update_us: None,
            },
        }
    }

    /// Seconds since the previous call, and marks `now_us` as the latest
    /// update. The first call returns zero.
    pub fn tick_dt(&mut self, now_us: u64) -> f32 {
        let dt = match self.state.last_update_us {
            Some(previous) => now_us.saturating_sub(previous) as f32 / 1_000_000.0,
            None => 0.0,
        };
        self.state.last_update_us = Some(now_us);
        dt
    }

    /// Advances the filter by `dt_seconds` of wall time. The gyro goes in
    /// as rad/s and the magnetometer with X and Y swapped, which lines the
    /// magnetometer frame up with the accel/gyro frame.
    pub fn update(&mut self, sample: &SensorSample, dt_seconds: f32) {
        let gyro = Vector3::new(
            sample.gyro.x.to_radians(),
            sample.gyro.y.to_radians(),
            sample.gyro.z.to_radians(),
        );
        let accel = Vector3::new(sample.accel.x, sample.accel.y, sample.accel.z);
        let mag = Vector3::new(sample.mag.y, sample.mag.x, sample.mag.z);

        let q = self.filter.update(gyro, accel, mag, dt_seconds);
        self.state.quaternion = Quaternion::from(q);
    }

    pub fn quaternion(&self) -> Quaternion {
        self.state.quaternion
    }

    pub fn state(&self) -> OrientationState {
        self.state
    }
}
