use crate::data::{EulerAngles, Quaternion};

/// Quaternion to yaw/pitch/roll in degrees, with yaw referenced to true
/// north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationDecoder {
    declination_deg: f32,
}

impl OrientationDecoder {
    pub fn new(declination_deg: f32) -> Self {
        OrientationDecoder { declination_deg }
    }

    pub fn declination_deg(&self) -> f32 {
        self.declination_deg
    }

    pub fn decode(&self, q: Quaternion) -> EulerAngles {
        let Quaternion {
            w: q0,
            x: q1,
            y: q2,
            z: q3,
        } = q;

        let yaw = (2.0 * (q1 * q2 + q0 * q3)).atan2(q0 * q0 + q1 * q1 - q2 * q2 - q3 * q3);
        // Rounding can push a unit quaternion slightly past ±1 here.
        let pitch = -(2.0 * (q1 * q3 - q0 * q2)).clamp(-1.0, 1.0).asin();
        let roll = (2.0 * (q0 * q1 + q2 * q3)).atan2(q0 * q0 - q1 * q1 - q2 * q2 + q3 * q3);

        let mut yaw = yaw.to_degrees();
        if yaw <= -180.0 {
            yaw += 360.0;
        }

        EulerAngles {
            yaw: yaw - self.declination_deg,
            pitch: pitch.to_degrees(),
            roll: roll.to_degrees(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Quaternion as NaQuaternion, UnitQuaternion, Vector3};
    use rstest::rstest;

    fn from_axis_angle(axis: Vector3<f32>, angle_deg: f32) -> Quaternion {
        let q = UnitQuaternion::from_axis_angle(
            &nalgebra::Unit::new_normalize(axis),
            angle_deg.to_radians(),
        );
        Quaternion::from(q)
    }

    #[test]
    fn test_identity_yields_negative_declination() {
        let angles = OrientationDecoder::new(8.5).decode(Quaternion::IDENTITY);
        assert_eq!(angles.yaw, -8.5);
        assert_eq!(angles.pitch, 0.0);
        assert_eq!(angles.roll, 0.0);
    }

    #[rstest]
    #[case(Vector3::z(), 30.0, (30.0, 0.0, 0.0))]
    #[case(Vector3::z(), -120.0, (-120.0, 0.0, 0.0))]
    #[case(Vector3::x(), 45.0, (0.0, 0.0, 45.0))]
    #[case(Vector3::y(), 20.0, (0.0, 20.0, 0.0))]
    #[case(Vector3::y(), -60.0, (0.0, -60.0, 0.0))]
    fn test_single_axis_rotations(
        #[case] axis: Vector3<f32>,
        #[case] angle_deg: f32,
        #[case] expected: (f32, f32, f32),
    ) {
        let angles = OrientationDecoder::new(0.0).decode(from_axis_angle(axis, angle_deg));
        assert_abs_diff_eq!(angles.yaw, expected.0, epsilon = 1e-3);
        assert_abs_diff_eq!(angles.pitch, expected.1, epsilon = 1e-3);
        assert_abs_diff_eq!(angles.roll, expected.2, epsilon = 1e-3);
    }

    #[test]
    fn test_unit_quaternions_stay_in_range() {
        let decoder = OrientationDecoder::new(0.0);
        let steps = [-1.0f32, -0.7, -0.3, 0.0, 0.2, 0.5, 0.9, 1.0];
        for &w in &steps {
            for &x in &steps {
                for &y in &steps {
                    for &z in &steps {
                        let raw = NaQuaternion::new(w, x, y, z);
                        if raw.norm() < 1e-3 {
                            continue;
                        }
                        let q = Quaternion::from(UnitQuaternion::from_quaternion(raw));
                        let angles = decoder.decode(q);
                        assert!((-90.0..=90.0).contains(&angles.pitch), "{:?}", angles);
                        assert!(angles.yaw > -180.0 && angles.yaw <= 180.0, "{:?}", angles);
                        assert!(angles.roll.is_finite());
                    }
                }
            }
        }
    }

    #[rstest]
    #[case(Quaternion::new(0.7072, 0.0, -0.7072, 0.0), -90.0)]
    #[case(Quaternion::new(0.7072, 0.0, 0.7072, 0.0), 90.0)]
    #[case(Quaternion::new(0.0, 0.7072, 0.0, 0.7072), -90.0)]
    fn test_out_of_domain_pitch_is_clamped(#[case] q: Quaternion, #[case] expected: f32) {
        assert!((2.0 * (q.x * q.z - q.w * q.y)).abs() > 1.0);
        let angles = OrientationDecoder::new(0.0).decode(q);
        assert!(!angles.pitch.is_nan());
        assert_abs_diff_eq!(angles.pitch, expected, epsilon = 1e-4);
    }

    #[test]
    fn test_yaw_half_turn_reported_as_positive() {
        let q = Quaternion::new(0.0, 0.0, 0.0, 1.0);
        let angles = OrientationDecoder::new(0.0).decode(q);
        assert_abs_diff_eq!(angles.yaw, 180.0, epsilon = 1e-4);
        assert!(angles.yaw > -180.0);
    }
}
