use recorder_traits::{CalibrationBiases, Vector3};

/// Per-axis correction for one sensor channel.
///
/// A corrected value is `count * resolution * scale - bias`; the bias is in
/// engineering units and comes off after scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCalibration {
    pub scale: Vector3,
    pub bias: Vector3,
}

impl Default for AxisCalibration {
    fn default() -> Self {
        AxisCalibration {
            scale: Vector3::splat(1.0),
            bias: Vector3::default(),
        }
    }
}

impl AxisCalibration {
    pub fn with_bias(bias: Vector3) -> Self {
        AxisCalibration {
            bias,
            ..Default::default()
        }
    }

    pub fn apply(&self, counts: [i16; 3], resolution: f32) -> Vector3 {
        Vector3 {
            x: counts[0] as f32 * resolution * self.scale.x - self.bias.x,
            y: counts[1] as f32 * resolution * self.scale.y - self.bias.y,
            z: counts[2] as f32 * resolution * self.scale.z - self.bias.z,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationProfile {
    pub accel: AxisCalibration,
    pub gyro: AxisCalibration,
    pub mag: AxisCalibration,
}

impl CalibrationProfile {
    /// Unit scale everywhere, no accel/gyro bias, and the site's hard-iron
    /// offset on the magnetometer.
    pub fn new(mag_bias: Vector3) -> Self {
        CalibrationProfile {
            mag: AxisCalibration::with_bias(mag_bias),
            ..Default::default()
        }
    }

    pub fn set_device_biases(&mut self, biases: CalibrationBiases) {
        self.gyro.bias = biases.gyro;
        self.accel.bias = biases.accel;
    }

    pub fn set_mag_sensitivity(&mut self, sensitivity: Vector3) {
        self.mag.scale = sensitivity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scale_defaults_to_one() {
        let profile = CalibrationProfile::new(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(profile.accel.scale, Vector3::splat(1.0));
        assert_eq!(profile.gyro.scale, Vector3::splat(1.0));
        assert_eq!(profile.mag.scale, Vector3::splat(1.0));
        assert_eq!(profile.accel.bias, Vector3::default());
        assert_eq!(profile.mag.bias, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_mag_bias_subtracted_after_scale() {
        let mut profile = CalibrationProfile::new(Vector3::new(470.0, 120.0, 125.0));
        profile.set_mag_sensitivity(Vector3::splat(1.0));

        let mag = profile.mag.apply([100, 100, 100], 0.15);
        assert_relative_eq!(mag.x, -455.0, epsilon = 1e-3);
        assert_relative_eq!(mag.y, -105.0, epsilon = 1e-3);
        assert_relative_eq!(mag.z, -110.0, epsilon = 1e-3);
    }

    #[test]
    fn test_correction_formula_with_sensitivity() {
        let (c, r, s, b) = (-2500i16, 1.4993895f32, 1.1875f32, 470.0f32);
        let mut profile = CalibrationProfile::new(Vector3::splat(b));
        profile.set_mag_sensitivity(Vector3::splat(s));

        let mag = profile.mag.apply([c, c, c], r);
        assert_eq!(mag.x, c as f32 * r * s - b);
        assert_ne!(mag.x, (c as f32 * r - b) * s);
    }

    #[test]
    fn test_device_biases_land_on_their_channels() {
        let mut profile = CalibrationProfile::new(Vector3::default());
        profile.set_device_biases(CalibrationBiases {
            gyro: Vector3::new(0.5, -0.25, 1.0),
            accel: Vector3::new(0.01, 0.02, -0.03),
        });

        let gyro = profile.gyro.apply([131, 0, 0], 250.0 / 32768.0);
        assert_relative_eq!(gyro.x, 131.0 * 250.0 / 32768.0 - 0.5, epsilon = 1e-6);
        assert_relative_eq!(gyro.y, 0.25);
        let accel = profile.accel.apply([0, 0, 16384], 2.0 / 32768.0);
        assert_relative_eq!(accel.z, 1.03, epsilon = 1e-6);
    }
}
