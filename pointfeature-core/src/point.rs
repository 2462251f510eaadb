//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A point with normal vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalPoint3f {
    pub position: Point3f,
    pub normal: Vector3f,
}

impl NormalPoint3f {
    pub fn new(position: Point3f, normal: Vector3f) -> Self {
        Self { position, normal }
    }
}

impl Default for NormalPoint3f {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            normal: Vector3f::new(0.0, 0.0, 1.0),
        }
    }
}

/// Squared Euclidean distance between two points, accumulated in double precision.
///
/// Every radius test in the workspace goes through this function and
/// [`within_radius`] so that different search structures agree on boundary
/// cases bit for bit.
#[inline]
pub fn distance_squared(a: &Point3f, b: &Point3f) -> f64 {
    let dx = a.x as f64 - b.x as f64;
    let dy = a.y as f64 - b.y as f64;
    let dz = a.z as f64 - b.z as f64;
    dx * dx + dy * dy + dz * dz
}

/// Inclusive radius test on a squared distance from [`distance_squared`].
///
/// `radius * radius` may round below `d2` even when `sqrt(d2) == radius`,
/// so the exact comparison falls back to the distance itself. A negative or
/// NaN radius contains nothing.
#[inline]
pub fn within_radius(d2: f64, radius: f64) -> bool {
    radius >= 0.0 && (d2 <= radius * radius || d2.sqrt() <= radius)
}
