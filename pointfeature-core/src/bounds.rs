//! Axis-aligned bounding boxes

use crate::point::{distance_squared, Point3f, Vector3f};
use serde::{Deserialize, Serialize};

/// 3D axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    min: Point3f,
    max: Point3f,
}

impl Aabb {
    /// Creates a new bounding box from its minimum and maximum corner.
    ///
    /// Returns `None` if `min` is not less than or equal to `max` on every axis
    /// or if a coordinate is not finite.
    pub fn from_min_max(min: Point3f, max: Point3f) -> Option<Self> {
        let finite = min.coords.iter().chain(max.coords.iter()).all(|c| c.is_finite());
        if !finite || min.x > max.x || min.y > max.y || min.z > max.z {
            return None;
        }
        Some(Self { min, max })
    }

    /// Creates a new bounding box without checking that `min <= max`
    pub fn from_min_max_unchecked(min: Point3f, max: Point3f) -> Self {
        Self { min, max }
    }

    /// Computes the tight bounding box of `points`. Returns `None` for an empty slice.
    ///
    /// ```
    /// use pointfeature_core::{Aabb, Point3f};
    ///
    /// let bounds = Aabb::from_points(&[
    ///     Point3f::new(0.0, 2.0, 0.0),
    ///     Point3f::new(1.0, 0.0, -1.0),
    /// ]).unwrap();
    /// assert_eq!(*bounds.min(), Point3f::new(0.0, 0.0, -1.0));
    /// assert_eq!(*bounds.max(), Point3f::new(1.0, 2.0, 0.0));
    /// ```
    pub fn from_points(points: &[Point3f]) -> Option<Self> {
        let first = points.first()?;
        let mut min = *first;
        let mut max = *first;

        for p in &points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    /// Computes the tight bounding box of the points selected by `indices`
    pub fn from_indexed_points(points: &[Point3f], indices: &[u32]) -> Option<Self> {
        let (&first, rest) = indices.split_first()?;
        let mut min = points[first as usize];
        let mut max = min;

        for &i in rest {
            let p = &points[i as usize];
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    pub fn min(&self) -> &Point3f {
        &self.min
    }

    pub fn max(&self) -> &Point3f {
        &self.max
    }

    /// Size between the minimum and maximum corner
    pub fn extent(&self) -> Vector3f {
        self.max - self.min
    }

    pub fn center(&self) -> Point3f {
        Point3f::new(
            self.min.x + (self.max.x - self.min.x) * 0.5,
            self.min.y + (self.max.y - self.min.y) * 0.5,
            self.min.z + (self.max.z - self.min.z) * 0.5,
        )
    }

    /// Length of the box diagonal, computed in double precision.
    ///
    /// Equal to the distance between the two corners as measured by
    /// [`distance_squared`], so a radius of this length reaches the far corner.
    pub fn diagonal(&self) -> f64 {
        distance_squared(&self.min, &self.max).sqrt()
    }

    /// True if the box has zero extent on every axis
    pub fn is_point(&self) -> bool {
        self.min == self.max
    }

    /// Returns true if `point` lies inside the box. Points on the boundary count as inside.
    pub fn contains(&self, point: &Point3f) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Squared distance from `point` to the closest point of the box (0 inside the box)
    pub fn min_distance_squared(&self, point: &Point3f) -> f64 {
        let closest = Point3f::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        );
        distance_squared(point, &closest)
    }

    /// Octant of `point` relative to the box center.
    ///
    /// Bit 0 is set when `x >= center.x`, bit 1 for `y`, bit 2 for `z`.
    pub fn octant_of(&self, point: &Point3f) -> usize {
        let c = self.center();
        (point.x >= c.x) as usize | ((point.y >= c.y) as usize) << 1 | ((point.z >= c.z) as usize) << 2
    }

    /// Bounds of the given octant (see [`Aabb::octant_of`] for the bit layout)
    pub fn octant_bounds(&self, octant: usize) -> Aabb {
        let c = self.center();
        let (min_x, max_x) = if octant & 1 == 0 { (self.min.x, c.x) } else { (c.x, self.max.x) };
        let (min_y, max_y) = if octant & 2 == 0 { (self.min.y, c.y) } else { (c.y, self.max.y) };
        let (min_z, max_z) = if octant & 4 == 0 { (self.min.z, c.z) } else { (c.z, self.max.z) };
        Aabb {
            min: Point3f::new(min_x, min_y, min_z),
            max: Point3f::new(max_x, max_y, max_z),
        }
    }
}
