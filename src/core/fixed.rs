//! Q16.16 Fixed-Point Arithmetic
//!
//! This module provides deterministic fixed-point math for the simulation.
//! All operations use integer arithmetic only - no floats in gameplay logic.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  1.0 = one map tile = 32 world pixels                       │
//! │  1 pixel = 2048 raw units                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why tiles?
//!
//! Positions are stored in tile units so that a 32k-tile map fits the
//! integer range while a single pixel still has 11 bits of sub-precision.
//! The wire format works in whole pixels (positions) and 1/256 pixels
//! (velocities); see [`quantize_px`] and [`quantize_vel`].

/// Q16.16 fixed-point number stored as i32.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

/// World pixels per tile
pub const TILE_SIZE_PX: i32 = 32;

/// One world pixel in fixed-point (65536 / 32 = 2048)
pub const PIXEL: Fixed = FIXED_ONE / TILE_SIZE_PX;

/// Raw units per 1/256 pixel, the wire velocity resolution
pub const VEL_UNIT: Fixed = PIXEL / 256;

// =============================================================================
// CONVERSIONS
// =============================================================================

/// Convert a whole number of world pixels to fixed-point.
#[inline]
pub const fn px(pixels: i32) -> Fixed {
    pixels.wrapping_mul(PIXEL)
}

/// Convert a fractional pixel amount to fixed-point tile units.
///
/// Same caveat as [`to_fixed`]: configuration and constants only.
#[inline]
pub const fn pxf(pixels: f64) -> Fixed {
    to_fixed(pixels / TILE_SIZE_PX as f64)
}

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use at compile-time or initialization. NEVER in tick loop.
///
/// # Example
/// ```
/// use solofng::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float for display/logging.
///
/// # Warning
/// Only use for visual output. NEVER use result in game logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Round a fixed-point length to whole world pixels (half rounds up).
#[inline]
pub fn quantize_px(value: Fixed) -> i32 {
    (((value as i64) + (PIXEL as i64 / 2)) >> 11) as i32
}

/// Round a fixed-point velocity to 1/256 pixel units (half rounds up).
#[inline]
pub fn quantize_vel(value: Fixed) -> i32 {
    (((value as i64) + (VEL_UNIT as i64 / 2)) >> 3) as i32
}

// =============================================================================
// CORE OPERATIONS (All deterministic, wrapping semantics)
// =============================================================================

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers.
///
/// Pre-shifts numerator to maintain precision.
/// Divide-by-zero returns 0 (not panic).
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0;
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Square root of a fixed-point number.
///
/// Exact integer square root of `x << 16`, so the result is the
/// floor of the true root at Q16.16 precision. Non-positive input yields 0.
#[inline]
pub fn fixed_sqrt(x: Fixed) -> Fixed {
    if x <= 0 {
        return 0;
    }
    isqrt_u64((x as u64) << FIXED_SCALE) as Fixed
}

/// Integer square root (floor) by Newton iteration on u64.
pub fn isqrt_u64(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) >> 1;
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }
    x
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

/// Minimum of two fixed-point numbers.
#[inline]
pub fn fixed_min(a: Fixed, b: Fixed) -> Fixed {
    if a < b { a } else { b }
}

/// Maximum of two fixed-point numbers.
#[inline]
pub fn fixed_max(a: Fixed, b: Fixed) -> Fixed {
    if a > b { a } else { b }
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    fixed_max(min, fixed_min(max, value))
}

/// pi in fixed-point
pub const FIXED_PI: Fixed = 205887;

/// pi/4 in fixed-point
const FIXED_QUARTER_PI: Fixed = 51472;

/// Angle of the vector (x, y) in radians, in the range [-pi, pi].
///
/// Uses the rational approximation `atan(z) = z*pi/4 + 0.273*z*(1-|z|)`
/// on the octant-reduced ratio; worst-case error is about 0.004 rad, below
/// the 1/256 rad resolution of the wire angle.
pub fn fixed_atan2(y: Fixed, x: Fixed) -> Fixed {
    if x == 0 && y == 0 {
        return 0;
    }
    let ax = fixed_abs(x);
    let ay = fixed_abs(y);

    let octant = |z: Fixed| -> Fixed {
        let az = fixed_abs(z);
        fixed_mul(z, FIXED_QUARTER_PI) + fixed_mul(fixed_mul(z, 17891), FIXED_ONE - az)
    };

    let a = if ax >= ay {
        let base = octant(fixed_div(ay, ax));
        if x >= 0 { base } else { FIXED_PI - base }
    } else {
        let base = (FIXED_PI >> 1) - octant(fixed_div(ax, ay));
        if x >= 0 { base } else { FIXED_PI - base }
    };

    if y < 0 { -a } else { a }
}

/// Accelerate `value` by `amount` towards a speed limit without
/// clamping speeds that already exceed the limit.
///
/// Mirrors the ground/air control model: input can only push the
/// velocity up to `max` in the direction of `amount`.
#[inline]
pub fn saturated_add(min: Fixed, max: Fixed, value: Fixed, amount: Fixed) -> Fixed {
    if amount > 0 {
        if value < max {
            return fixed_min(max, value.saturating_add(amount));
        }
    } else if value > min {
        return fixed_max(min, value.saturating_add(amount));
    }
    value
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_constants() {
        assert_eq!(FIXED_ONE, 65536);
        assert_eq!(FIXED_HALF, 32768);
        assert_eq!(PIXEL, 2048);
        assert_eq!(VEL_UNIT, 8);
        assert_eq!(px(32), FIXED_ONE);
    }

    #[test]
    fn test_fixed_mul_div() {
        assert_eq!(fixed_mul(to_fixed(2.0), to_fixed(3.0)), to_fixed(6.0));
        assert_eq!(fixed_mul(FIXED_HALF, FIXED_HALF), to_fixed(0.25));
        assert_eq!(fixed_mul(to_fixed(-2.0), to_fixed(3.0)), to_fixed(-6.0));

        assert_eq!(fixed_div(to_fixed(6.0), to_fixed(2.0)), to_fixed(3.0));
        assert_eq!(fixed_div(FIXED_ONE, to_fixed(4.0)), to_fixed(0.25));
        assert_eq!(fixed_div(FIXED_ONE, 0), 0);
    }

    #[test]
    fn test_fixed_sqrt_is_exact() {
        assert_eq!(fixed_sqrt(to_fixed(4.0)), to_fixed(2.0));
        assert_eq!(fixed_sqrt(FIXED_ONE), FIXED_ONE);
        assert_eq!(fixed_sqrt(to_fixed(0.25)), FIXED_HALF);
        assert_eq!(fixed_sqrt(0), 0);
        assert_eq!(fixed_sqrt(-FIXED_ONE), 0);
        assert_eq!(fixed_sqrt(to_fixed(10000.0)), to_fixed(100.0));
    }

    #[test]
    fn test_quantize_rounds_half_up() {
        assert_eq!(quantize_px(px(5)), 5);
        assert_eq!(quantize_px(px(5) + PIXEL / 2), 6);
        assert_eq!(quantize_px(px(5) + PIXEL / 2 - 1), 5);
        assert_eq!(quantize_px(-px(5)), -5);
        assert_eq!(quantize_vel(PIXEL), 256);
        assert_eq!(quantize_vel(-PIXEL), -256);
    }

    #[test]
    fn test_fixed_atan2_quadrants() {
        let close = |a: Fixed, b: f64| (to_float(a) as f64 - b).abs() < 0.005;
        assert_eq!(fixed_atan2(0, 0), 0);
        assert!(close(fixed_atan2(0, FIXED_ONE), 0.0));
        assert!(close(fixed_atan2(FIXED_ONE, 0), std::f64::consts::FRAC_PI_2));
        assert!(close(fixed_atan2(FIXED_ONE, FIXED_ONE), std::f64::consts::FRAC_PI_4));
        assert!(close(fixed_atan2(-FIXED_ONE, -FIXED_ONE), -3.0 * std::f64::consts::FRAC_PI_4));
        assert!(close(fixed_atan2(0, -FIXED_ONE), std::f64::consts::PI));
        assert!(close(fixed_atan2(to_fixed(-0.5), FIXED_ONE), (-0.5f64).atan()));
    }

    #[test]
    fn test_saturated_add() {
        let max = px(10);
        assert_eq!(saturated_add(-max, max, 0, px(2)), px(2));
        assert_eq!(saturated_add(-max, max, px(9), px(2)), max);
        // Faster than the limit: input does not brake
        assert_eq!(saturated_add(-max, max, px(15), px(2)), px(15));
        assert_eq!(saturated_add(-max, max, px(15), -px(2)), px(13));
    }
}
