//! Small helpers on top of `glam::DVec2` used by every steering routine.

use glam::DVec2;

/// Clamp `v` to `max` length. Zero or negative limits yield a zero vector.
pub fn limit(v: DVec2, max: f64) -> DVec2 {
    if max <= 0.0 || !v.is_finite() {
        return DVec2::ZERO;
    }
    let len_sq = v.length_squared();
    if len_sq > max * max {
        v * (max / len_sq.sqrt())
    } else {
        v
    }
}

/// Rescale `v` to length `magnitude`, or zero when `v` has no direction.
pub fn with_magnitude(v: DVec2, magnitude: f64) -> DVec2 {
    v.normalize_or_zero() * magnitude
}

/// Rotate `v` by `angle` radians.
pub fn rotate(v: DVec2, angle: f64) -> DVec2 {
    DVec2::from_angle(angle).rotate(v)
}

/// Shortest displacement from `from` to `to` on a map that wraps horizontally.
pub fn wrapped_delta(from: DVec2, to: DVec2, width: f64) -> DVec2 {
    let mut dx = to.x - from.x;
    if width > 0.0 {
        let half = width * 0.5;
        if dx > half {
            dx -= width;
        } else if dx < -half {
            dx += width;
        }
    }
    DVec2::new(dx, to.y - from.y)
}

pub fn wrapped_distance(a: DVec2, b: DVec2, width: f64) -> f64 {
    wrapped_delta(a, b, width).length()
}

/// Fold `x` back into `[0, width)`.
pub fn wrap_x(x: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return x;
    }
    let wrapped = x.rem_euclid(width);
    // rem_euclid can round up to exactly `width` for tiny negative inputs
    if wrapped >= width { 0.0 } else { wrapped }
}
