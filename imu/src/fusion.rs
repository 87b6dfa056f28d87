use crate::config::{MAHONY_KI, MAHONY_KP};
use crate::data::Quaternion;
use nalgebra::{Quaternion as NaQuaternion, UnitQuaternion, Vector3};

/// An orientation filter driven by a caller-measured time step.
pub trait FusionFilter {
    fn orientation(&self) -> UnitQuaternion<f32>;

    /// `gyroscope` in rad/s. `accelerometer` and `magnetometer` only need a
    /// consistent unit; they are normalized. A zero `dt` must leave the
    /// orientation unchanged.
    fn update(
        &mut self,
        gyroscope: Vector3<f32>,
        accelerometer: Vector3<f32>,
        magnetometer: Vector3<f32>,
        dt: f32,
    ) -> UnitQuaternion<f32>;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MahonyParams {
    pub kp: f32,
    pub ki: f32,
}

impl Default for MahonyParams {
    fn default() -> Self {
        Self {
            kp: MAHONY_KP,
            ki: MAHONY_KI,
        }
    }
}

/// Mahony complementary filter with optional integral feedback.
#[derive(Debug)]
pub struct Mahony {
    params: MahonyParams,
    integral_error: Vector3<f32>,
    quaternion: UnitQuaternion<f32>,
}

impl Default for Mahony {
    fn default() -> Mahony {
        Mahony::new(MahonyParams::default())
    }
}

impl Mahony {
    pub fn new(params: MahonyParams) -> Self {
        Mahony::new_with_orientation(params, UnitQuaternion::identity())
    }

    pub fn new_with_orientation(params: MahonyParams, orientation: UnitQuaternion<f32>) -> Self {
        Mahony {
            params,
            integral_error: Vector3::zeros(),
            quaternion: orientation,
        }
    }

    fn integrate(&mut self, rate: Vector3<f32>, dt: f32) -> UnitQuaternion<f32> {
        let q = self.quaternion.into_inner();
        let q_dot = q * NaQuaternion::from_parts(0.0, rate) * 0.5;
        self.quaternion = UnitQuaternion::from_quaternion(q + q_dot * dt);
        self.quaternion
    }

    /// Gravity direction predicted by the current orientation, in the body
    /// frame.
    fn predicted_gravity(&self) -> Vector3<f32> {
        let q = self.quaternion.quaternion();
        let (q1, q2, q3, q4) = (q.w, q.i, q.j, q.k);
        Vector3::new(
            2.0 * (q2 * q4 - q1 * q3),
            2.0 * (q1 * q2 + q3 * q4),
            q1 * q1 - q2 * q2 - q3 * q3 + q4 * q4,
        )
    }

    /// Earth field direction predicted by the current orientation, in the
    /// body frame, with the reference field rebuilt from `mag`.
    fn predicted_field(&self, mag: &Vector3<f32>) -> Vector3<f32> {
        let q = self.quaternion.quaternion();
        let (q1, q2, q3, q4) = (q.w, q.i, q.j, q.k);
        let (mx, my, mz) = (mag.x, mag.y, mag.z);

        let hx = 2.0 * mx * (0.5 - q3 * q3 - q4 * q4)
            + 2.0 * my * (q2 * q3 - q1 * q4)
            + 2.0 * mz * (q2 * q4 + q1 * q3);
        let hy = 2.0 * mx * (q2 * q3 + q1 * q4)
            + 2.0 * my * (0.5 - q2 * q2 - q4 * q4)
            + 2.0 * mz * (q3 * q4 - q1 * q2);
        let bx = (hx * hx + hy * hy).sqrt();
        let bz = 2.0 * mx * (q2 * q4 - q1 * q3)
            + 2.0 * my * (q3 * q4 + q1 * q2)
            + 2.0 * mz * (0.5 - q2 * q2 - q3 * q3);

        Vector3::new(
            2.0 * bx * (0.5 - q3 * q3 - q4 * q4) + 2.0 * bz * (q2 * q4 - q1 * q3),
            2.0 * bx * (q2 * q3 - q1 * q4) + 2.0 * bz * (q1 * q2 + q3 * q4),
            2.0 * bx * (q1 * q3 + q2 * q4) + 2.0 * bz * (0.5 - q2 * q2 - q3 * q3),
        )
    }
}

impl FusionFilter for Mahony {
    fn orientation(&self) -> UnitQuaternion<f32> {
        self.quaternion
    }

    fn update(
        &mut self,
        gyroscope: Vector3<f32>,
        accelerometer: Vector3<f32>,
        magnetometer: Vector3<f32>,
        dt: f32,
    ) -> UnitQuaternion<f32> {
        let Some(accel) = accelerometer.try_normalize(f32::EPSILON) else {
            return self.integrate(gyroscope, dt);
        };

        let mut error = accel.cross(&self.predicted_gravity());
        if let Some(mag) = magnetometer.try_normalize(f32::EPSILON) {
            error += mag.cross(&self.predicted_field(&mag));
        }

        if self.params.ki > 0.0 {
            self.integral_error += error * dt;
        } else {
            self.integral_error = Vector3::zeros();
        }

        let corrected = gyroscope + error * self.params.kp + self.integral_error * self.params.ki;
        self.integrate(corrected, dt)
    }
}

impl From<UnitQuaternion<f32>> for Quaternion {
    fn from(q: UnitQuaternion<f32>) -> Self {
        let q = q.into_inner();
        Quaternion::new(q.w, q.i, q.j, q.k)
    }
}
