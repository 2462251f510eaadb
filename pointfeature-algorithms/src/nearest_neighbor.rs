//! Nearest neighbor search implementations

use pointfeature_core::{distance_squared, within_radius, NearestNeighborSearch, Point3f};

/// Simple brute force radius search for small datasets and for checking the octree
pub struct BruteForceSearch {
    points: Vec<Point3f>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3f]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_radius_neighbors(&self, query: &Point3f, radius: f64) -> Vec<(usize, f64)> {
        self.points
            .iter()
            .enumerate()
            .filter_map(|(idx, point)| {
                let d2 = distance_squared(point, query);
                if within_radius(d2, radius) {
                    Some((idx, d2.sqrt()))
                } else {
                    None
                }
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brute_force_radius_is_inclusive() {
        let points = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(2.0, 0.0, 0.0),
        ];
        let search = BruteForceSearch::new(&points);

        let mut found: Vec<usize> = search
            .find_radius_neighbors(&Point3f::origin(), 1.0)
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        found.sort_unstable();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn test_brute_force_reaches_far_corner_at_diagonal() {
        let points = vec![
            Point3f::new(-3.25, 0.5, 11.0),
            Point3f::new(252.39537, 71.94743, 186.80606),
        ];
        let bounds = pointfeature_core::Aabb::from_points(&points).unwrap();
        let search = BruteForceSearch::new(&points);
        assert_eq!(search.find_radius_neighbors(bounds.min(), bounds.diagonal()).len(), 2);
    }

    #[test]
    fn test_brute_force_indices_into_clears_buffer() {
        let points = vec![Point3f::new(0.0, 0.0, 0.0)];
        let search = BruteForceSearch::new(&points);
        let mut out = vec![42, 43];
        search.find_radius_indices_into(&Point3f::new(5.0, 0.0, 0.0), 1.0, &mut out);
        assert!(out.is_empty());
    }
}
