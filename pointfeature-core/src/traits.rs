//! Core traits for pointfeature

use crate::point::Point3f;

/// Trait for fixed-radius neighbor search over a static point set
pub trait NearestNeighborSearch {
    /// Find all indexed points within `radius` of `query` (inclusive).
    ///
    /// Returns `(index, distance)` pairs in no particular order.
    fn find_radius_neighbors(&self, query: &Point3f, radius: f64) -> Vec<(usize, f64)>;

    /// Like [`find_radius_neighbors`](Self::find_radius_neighbors), but appends
    /// only the indices to a caller-owned buffer, which is cleared first.
    fn find_radius_indices_into(&self, query: &Point3f, radius: f64, out: &mut Vec<usize>) {
        out.clear();
        out.extend(self.find_radius_neighbors(query, radius).into_iter().map(|(i, _)| i));
    }

    /// Number of indexed points
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
