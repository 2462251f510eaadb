//! Point set container handed to the feature computation

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// An ordered set of point coordinates with an optional parallel set of normals.
///
/// The normal sequence is either empty or holds exactly one normal per point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    points: Vec<Point3f>,
    normals: Vec<Vector3f>,
}

impl PointSet {
    /// Create a new empty point set
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            normals: Vec::new(),
        }
    }

    /// Create a point set without normals
    pub fn from_points(points: Vec<Point3f>) -> Self {
        Self {
            points,
            normals: Vec::new(),
        }
    }

    /// Create a point set with one normal per point
    ///
    /// # Errors
    /// Returns [`Error::InvalidData`] if `normals` is non-empty and its length
    /// differs from the number of points.
    pub fn with_normals(points: Vec<Point3f>, normals: Vec<Vector3f>) -> Result<Self> {
        if !normals.is_empty() && normals.len() != points.len() {
            return Err(Error::InvalidData(format!(
                "expected {} normals, got {}",
                points.len(),
                normals.len()
            )));
        }
        Ok(Self { points, normals })
    }

    /// Get the number of points in the set
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point set is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3f] {
        &self.points
    }

    /// The normal sequence, if the set carries one normal per point
    pub fn normals(&self) -> Option<&[Vector3f]> {
        if self.has_normals() {
            Some(&self.normals)
        } else {
            None
        }
    }

    /// True if there is exactly one normal per point.
    ///
    /// An empty set trivially has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.len() == self.points.len()
    }

    /// Point and normal at `index`, if the set carries normals
    pub fn normal_point(&self, index: usize) -> Option<NormalPoint3f> {
        let position = *self.points.get(index)?;
        let normal = *self.normals.get(index)?;
        Some(NormalPoint3f { position, normal })
    }

    /// Get an iterator over the point coordinates
    pub fn iter(&self) -> std::slice::Iter<'_, Point3f> {
        self.points.iter()
    }

    /// Tight axis-aligned bounding box of the coordinates, `None` when empty
    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.points)
    }

    /// Split the set back into its coordinate and normal buffers
    pub fn into_parts(self) -> (Vec<Point3f>, Vec<Vector3f>) {
        (self.points, self.normals)
    }
}

impl Index<usize> for PointSet {
    type Output = Point3f;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point3f;
    type IntoIter = std::slice::Iter<'a, Point3f>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl FromIterator<Point3f> for PointSet {
    fn from_iter<I: IntoIterator<Item = Point3f>>(iter: I) -> Self {
        Self::from_points(Vec::from_iter(iter))
    }
}

impl FromIterator<NormalPoint3f> for PointSet {
    fn from_iter<I: IntoIterator<Item = NormalPoint3f>>(iter: I) -> Self {
        let (points, normals) = iter
            .into_iter()
            .map(|p| (p.position, p.normal))
            .unzip();
        Self { points, normals }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_normals_length_mismatch() {
        let points = vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)];
        let normals = vec![Vector3f::z()];
        assert!(matches!(
            PointSet::with_normals(points, normals),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_without_normals() {
        let set = PointSet::from_points(vec![Point3f::origin(), Point3f::new(1.0, 1.0, 1.0)]);
        assert_eq!(set.len(), 2);
        assert!(!set.has_normals());
        assert!(set.normals().is_none());
        assert!(set.normal_point(0).is_none());
    }

    #[test]
    fn test_empty_normals_are_allowed() {
        let set = PointSet::with_normals(vec![Point3f::origin()], Vec::new()).unwrap();
        assert!(!set.has_normals());
    }

    #[test]
    fn test_collect_normal_points() {
        let set: PointSet = (0..4)
            .map(|i| NormalPoint3f::new(Point3f::new(i as f32, 0.0, 0.0), Vector3f::y()))
            .collect();
        assert_eq!(set.len(), 4);
        assert!(set.has_normals());
        assert_eq!(set.normal_point(3).unwrap().normal, Vector3f::y());

        let bounds = set.bounding_box().unwrap();
        assert_eq!(*bounds.max(), Point3f::new(3.0, 0.0, 0.0));
    }
}
