/**
 * Angle helpers shared by every PID channel.
 *
 * Angles are in degrees on [0, 360) unless stated otherwise.
 */

/// Below this magnitude both thrust components count as zero in [`sub_angle`].
pub const SUB_ANGLE_EPSILON: f64 = 1e-6;

/// Signed shortest error from `reference` to `current`, in (-180, 180].
///
/// Positive when `current` lies clockwise of `reference` within half a turn.
/// Callers on every angular axis pass `(measured, reference)`; the gain signs
/// downstream are tuned for that order.
pub fn subtract_angles(current: f64, reference: f64) -> f64 {
    if current == reference {
        0.0
    } else if current < reference {
        if reference - current < 180.0 {
            current - reference
        } else {
            360.0 - reference + current
        }
    } else if current - reference <= 180.0 {
        // Exactly half a turn resolves to +180 from either side.
        current - reference
    } else {
        -360.0 + current - reference
    }
}

/// Anti-windup for an integral accumulator: keeps `|value * gain|` within `bound`.
///
/// With `gain == 0` the product is zero and `value` comes back unchanged.
pub fn bound_integral(value: f64, gain: f64, bound: f64) -> f64 {
    if (value * gain).abs() > bound {
        value.signum() * (bound / gain).abs()
    } else {
        value
    }
}

/// Direction of a planar thrust demand, radians.
///
/// Argument order is `atan2(fx, fy)`, measured from the forward (`fy`) axis.
pub fn sub_angle(fx: f64, fy: f64) -> f64 {
    if fx.abs() < SUB_ANGLE_EPSILON && fy.abs() < SUB_ANGLE_EPSILON {
        return 0.0;
    }
    fx.atan2(fy)
}
