//! Fixed-Point 2D Vector
//!
//! Deterministic 2D vector operations for character physics.
//! All operations use fixed-point arithmetic. World space is screen
//! space: +X points right and +Y points down.

use std::fmt;
use std::ops::{Add, Sub, Neg};
use serde::{Serialize, Deserialize};

use super::fixed::{
    Fixed, FIXED_ONE, FIXED_SCALE,
    fixed_mul, fixed_div, fixed_clamp, isqrt_u64, to_float,
};

/// 2D vector with fixed-point components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point)
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Unit vector pointing right (+X)
    pub const RIGHT: Self = Self { x: FIXED_ONE, y: 0 };

    /// Unit vector pointing up (-Y in screen space)
    pub const UP: Self = Self { x: 0, y: -FIXED_ONE };

    /// Unit vector pointing down (+Y in screen space)
    pub const DOWN: Self = Self { x: 0, y: FIXED_ONE };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from whole tile coordinates.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Add another vector.
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_add(other.x),
            y: self.y.wrapping_add(other.y),
        }
    }

    /// Subtract another vector.
    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(other.x),
            y: self.y.wrapping_sub(other.y),
        }
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, scalar),
            y: fixed_mul(self.y, scalar),
        }
    }

    /// Divide by a fixed-point scalar.
    #[inline]
    pub fn div_scalar(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_div(self.x, scalar),
            y: fixed_div(self.y, scalar),
        }
    }

    /// Squared length in raw units squared (i64, never overflows).
    #[inline]
    pub fn length_squared_wide(self) -> i64 {
        let x = self.x as i64;
        let y = self.y as i64;
        x * x + y * y
    }

    /// Squared length in fixed-point, saturating at `Fixed::MAX`.
    #[inline]
    pub fn length_squared(self) -> Fixed {
        let wide = self.length_squared_wide() >> FIXED_SCALE;
        wide.min(Fixed::MAX as i64) as Fixed
    }

    /// Length (magnitude), exact to the last raw unit.
    #[inline]
    pub fn length(self) -> Fixed {
        let root = isqrt_u64(self.length_squared_wide() as u64);
        root.min(Fixed::MAX as u64) as Fixed
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> Fixed {
        self.sub(other).length()
    }

    /// Normalize to unit length.
    /// Returns ZERO if length is zero.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0 {
            return Self::ZERO;
        }
        self.div_scalar(len)
    }

    /// Dot product with another vector.
    #[inline]
    pub fn dot(self, other: Self) -> Fixed {
        fixed_mul(self.x, other.x)
            .wrapping_add(fixed_mul(self.y, other.y))
    }

    /// Clamp both components to a range.
    #[inline]
    pub fn clamp(self, min: Fixed, max: Fixed) -> Self {
        Self {
            x: fixed_clamp(self.x, min, max),
            y: fixed_clamp(self.y, min, max),
        }
    }

    /// Linear interpolation between two vectors.
    /// t = 0 returns self, t = FIXED_ONE returns other.
    #[inline]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        let dx = other.x.wrapping_sub(self.x);
        let dy = other.y.wrapping_sub(self.y);
        Self {
            x: self.x.wrapping_add(fixed_mul(dx, t)),
            y: self.y.wrapping_add(fixed_mul(dy, t)),
        }
    }

    /// Rotate by an angle given as its precomputed cosine and sine.
    #[inline]
    pub fn rotate(self, cos: Fixed, sin: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, cos).wrapping_sub(fixed_mul(self.y, sin)),
            y: fixed_mul(self.x, sin).wrapping_add(fixed_mul(self.y, cos)),
        }
    }

    /// Negate the vector.
    #[inline]
    pub fn negate(self) -> Self {
        Self {
            x: self.x.wrapping_neg(),
            y: self.y.wrapping_neg(),
        }
    }

    /// Closest point to `target` on the segment `self..end`.
    pub fn closest_point_on_segment(self, end: Self, target: Self) -> Self {
        let seg = end.sub(self);
        let len = seg.length();
        if len == 0 {
            return self;
        }
        let dir = seg.div_scalar(len);
        let along = fixed_clamp(dir.dot(target.sub(self)), 0, len);
        self.add(dir.scale(along))
    }

    /// Convert to floats for logging only.
    pub fn to_floats(self) -> (f32, f32) {
        (to_float(self.x), to_float(self.y))
    }
}

// =============================================================================
// OPERATOR TRAITS
// =============================================================================

impl Add for FixedVec2 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        FixedVec2::add(self, other)
    }
}

impl Sub for FixedVec2 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        FixedVec2::sub(self, other)
    }
}

impl Neg for FixedVec2 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        self.negate()
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.to_floats();
        write!(f, "FixedVec2({:.3}, {:.3})", x, y)
    }
}

impl fmt::Display for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.to_floats();
        write!(f, "({:.2}, {:.2})", x, y)
    }
}

// =============================================================================
// TESTS
// =============================================================================
