//! Deterministic integer math.
//!
//! Nothing in the visibility pipeline touches floating point, so results are
//! bit-identical across platforms and optimisation levels.

use crate::constants::{ANGLE_FULL, ANGLE_HALF, ANGLE_QUARTER};

/// Integer square root, rounded down.
pub fn isqrt(value: u64) -> u64 {
    if value < 2 {
        return value;
    }
    // Newton iteration from an upper bound; converges monotonically downward.
    let mut x = 1u64 << ((64 - value.leading_zeros()).div_ceil(2));
    loop {
        let next = (x + value / x) / 2;
        if next >= x {
            return x;
        }
        x = next;
    }
}

/// Arctangent of `ratio / 65536` for `0 <= ratio <= 65536`, in angle units.
///
/// Uses `atan(z) ≈ π/4·z + 0.273·z·(1 − z)`, max error about 0.22°.
fn atan_unit(ratio: i64) -> i64 {
    const ONE: i64 = 65_536;
    // π/4 in angle units is 8192; 0.273 rad is 2847.5 angle units.
    let linear = 8192 * ratio / ONE;
    let bend = 28_475 * ratio / ONE * (ONE - ratio) / ONE / 10;
    linear + bend
}

/// Four-quadrant arctangent in 16-bit angle units, `0` along +x, counter-clockwise.
///
/// Returns a value in `[0, ANGLE_FULL)`. `iatan2(0, 0)` is `0`.
pub fn iatan2(y: i64, x: i64) -> i32 {
    if x == 0 && y == 0 {
        return 0;
    }
    let ax = x.unsigned_abs() as i128;
    let ay = y.unsigned_abs() as i128;

    // Reduce to the first octant.
    let (num, den, swapped) = if ay <= ax { (ay, ax, false) } else { (ax, ay, true) };
    let ratio = (num * 65_536 / den) as i64;
    let mut angle = atan_unit(ratio);
    if swapped {
        angle = ANGLE_QUARTER as i64 - angle;
    }

    let angle = match (x >= 0, y >= 0) {
        (true, true) => angle,
        (false, true) => ANGLE_HALF as i64 - angle,
        (false, false) => ANGLE_HALF as i64 + angle,
        (true, false) => ANGLE_FULL as i64 - angle,
    };
    (angle as i32).rem_euclid(ANGLE_FULL)
}

/// Normalise an angle to `(-ANGLE_HALF, ANGLE_HALF]`.
pub fn angle_delta(angle: i32) -> i32 {
    let wrapped = angle.rem_euclid(ANGLE_FULL);
    if wrapped > ANGLE_HALF {
        wrapped - ANGLE_FULL
    } else {
        wrapped
    }
}
