//! Heading arithmetic on the 0-360° circle.

/// Normalizes any finite angle into `[0, 360)`.
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest-arc difference `to - from`, within `(-180, 180]`.
pub fn delta_deg(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Unsigned shortest-arc distance between two headings.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    delta_deg(a, b).abs()
}
