use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FocusSample, PoseSample};

/// One shutter decision. Immutable once emitted; the shutter path and the
/// telemetry path each receive their own copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureEvent {
    pub sequence_id: u64,
    /// Focal zone satisfied by this frame, `None` for operator-initiated captures.
    pub zone_index: Option<usize>,
    pub pose: PoseSample,
    pub focus: FocusSample,
    pub lens_index: u8,
    pub captured_at: DateTime<Utc>,
}

impl CaptureEvent {
    pub fn is_ad_hoc(&self) -> bool {
        self.zone_index.is_none()
    }

    pub fn exif(&self) -> ExifPayload {
        ExifPayload {
            heading: round_to(self.pose.azimuth_deg, 2),
            altitude: round_to(self.pose.altitude, 2),
            focus_distance: self.focus.focus_distance_m(),
        }
    }
}

/// Metadata embedded in the `UserComment` EXIF field of the captured image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExifPayload {
    pub heading: f64,
    pub altitude: f64,
    pub focus_distance: f64,
}

impl ExifPayload {
    pub fn user_comment(&self) -> String {
        // Three plain floats cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(diopter: f64) -> CaptureEvent {
        CaptureEvent {
            sequence_id: 7,
            zone_index: Some(2),
            pose: PoseSample {
                azimuth_deg: 123.4567,
                altitude: 48.123,
                timestamp_ms: 1_000,
                confidence: 1.0,
                azimuth_variance: 0.0,
                altitude_variance: 0.0,
            },
            focus: FocusSample::new(diopter, 1_000),
            lens_index: 1,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn exif_carries_heading_altitude_and_distance() {
        let exif = event(4.0).exif();
        assert_eq!(exif.heading, 123.46);
        assert_eq!(exif.altitude, 48.12);
        assert_eq!(exif.focus_distance, 0.25);
    }

    #[test]
    fn user_comment_is_compact_json() {
        let comment = event(4.0).exif().user_comment();
        let parsed: serde_json::Value = serde_json::from_str(&comment).unwrap();
        assert_eq!(parsed["focus_distance"], 0.25);
        assert!(!comment.contains('\n'));
    }

    #[test]
    fn zoneless_event_is_ad_hoc() {
        let mut ev = event(1.0);
        assert!(!ev.is_ad_hoc());
        ev.zone_index = None;
        assert!(ev.is_ad_hoc());
    }
}
