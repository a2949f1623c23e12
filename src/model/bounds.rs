//! Axis-aligned bounding volumes in f64 precision.

use serde::{Deserialize, Serialize};

/// A point or extent in model space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    fn min(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    fn max(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

/// Axis-aligned bounding box
///
/// The empty box has `min = +inf` and `max = -inf` on every axis, so it is the
/// identity element of [`Bounds::union`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vector3,
    pub max: Vector3,
}

impl Bounds {
    pub const fn new(min: Vector3, max: Vector3) -> Self {
        Self { min, max }
    }

    /// Box spanning `[min_x, max_x] x [min_y, max_y]` with zero height at z = 0.
    pub const fn planar(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Vector3::new(min_x, min_y, 0.0), Vector3::new(max_x, max_y, 0.0))
    }

    pub const fn empty() -> Self {
        Self {
            min: Vector3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Vector3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// True when no point has been included yet
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to contain a point
    #[inline]
    pub fn include_point(&mut self, point: Vector3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Componentwise min of minimums and max of maximums
    #[inline]
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[inline]
    pub fn expand(&mut self, other: &Bounds) {
        *self = self.union(other);
    }

    /// Bounds of a point set; empty when the iterator yields nothing.
    pub fn from_points<I: IntoIterator<Item = Vector3>>(points: I) -> Bounds {
        let mut bounds = Bounds::empty();
        for point in points {
            bounds.include_point(point);
        }
        bounds
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}
