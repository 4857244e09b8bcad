//! World-space geometry: [`Vector`] positions and [`WorldBox`] rectangles.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use crate::geom::Point;

/// A 2D float position or displacement in world pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector {
    pub x: f32,
    pub y: f32,
}

impl Vector {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    #[inline]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Straight-line distance to `other`, ignoring any world wrap.
    #[inline]
    pub fn distance(self, other: Vector) -> f32 {
        (other - self).length()
    }

    /// The pixel containing this position.
    #[inline]
    pub fn floor(self) -> Point {
        Point::new(self.x.floor() as i32, self.y.floor() as i32)
    }

    /// Whether both components are finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vector {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vector {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// WorldBox
// ---------------------------------------------------------------------------

/// An axis-aligned world rectangle \[min, max).
///
/// Produced by terrain mutations (digging, explosions) and by callers that
/// toggle navigability of a region.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldBox {
    pub min: Vector,
    pub max: Vector,
}

impl WorldBox {
    /// Box spanning two corners, canonicalized.
    pub fn new(a: Vector, b: Vector) -> Self {
        Self {
            min: Vector::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vector::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Box with the given corner and size.
    pub fn from_corner(corner: Vector, width: f32, height: f32) -> Self {
        Self::new(corner, corner + Vector::new(width, height))
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Whether `p` is inside the half-open box.
    #[inline]
    pub fn contains(&self, p: Vector) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }
}

impl fmt::Display for WorldBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{})", self.min, self.max)
    }
}
