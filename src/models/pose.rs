use serde::{Deserialize, Serialize};

/// Raw fused rotation-vector reading as delivered by the platform sensor.
///
/// `x`, `y`, `z` are the vector part of a unit quaternion. Some devices omit the
/// scalar part, in which case it is reconstructed from the other three.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RotationVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub w: Option<f64>,
    pub timestamp_ms: u64,
}

impl RotationVector {
    pub fn new(x: f64, y: f64, z: f64, w: Option<f64>, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            z,
            w,
            timestamp_ms,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
            && self.w.map_or(true, f64::is_finite)
    }

    /// Scalar quaternion component, reconstructed when the sensor omits it.
    pub fn scalar(&self) -> f64 {
        match self.w {
            Some(w) => w,
            None => {
                let rest = 1.0 - self.x * self.x - self.y * self.y - self.z * self.z;
                if rest > 0.0 {
                    rest.sqrt()
                } else {
                    0.0
                }
            }
        }
    }

    /// Row-major 3x3 rotation matrix for this quaternion.
    pub fn rotation_matrix(&self) -> [f64; 9] {
        let (q1, q2, q3, q0) = (self.x, self.y, self.z, self.scalar());

        let sq_q1 = 2.0 * q1 * q1;
        let sq_q2 = 2.0 * q2 * q2;
        let sq_q3 = 2.0 * q3 * q3;
        let q1_q2 = 2.0 * q1 * q2;
        let q3_q0 = 2.0 * q3 * q0;
        let q1_q3 = 2.0 * q1 * q3;
        let q2_q0 = 2.0 * q2 * q0;
        let q2_q3 = 2.0 * q2 * q3;
        let q1_q0 = 2.0 * q1 * q0;

        [
            1.0 - sq_q2 - sq_q3,
            q1_q2 - q3_q0,
            q1_q3 + q2_q0,
            q1_q2 + q3_q0,
            1.0 - sq_q1 - sq_q3,
            q2_q3 - q1_q0,
            q1_q3 - q2_q0,
            q2_q3 + q1_q0,
            1.0 - sq_q1 - sq_q2,
        ]
    }
}

/// Smoothed device pose produced by the orientation tracker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoseSample {
    /// Heading in degrees, always within `[0, 360)`.
    pub azimuth_deg: f64,
    /// Normalized tilt within `[0, 100]`; 50 is level.
    pub altitude: f64,
    pub timestamp_ms: u64,
    /// Tracker confidence within `[0, 1]`.
    pub confidence: f64,
    pub azimuth_variance: f64,
    pub altitude_variance: f64,
}
