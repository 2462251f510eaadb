//! # pointfeature algorithms
//!
//! Octree radius search and per-point local shape descriptors.
//!
//! The crate builds an [`Octree`] over a point set, gathers the neighbors of
//! every point within a search radius and reduces their covariance statistics
//! to a scalar: linearity and related eigenvalue features of the coordinates,
//! change of curvature of the normals, or the dispersion of the normals.

pub mod config;
pub mod covariance;
pub mod features;
pub mod nearest_neighbor;
pub mod noise;
pub mod octree;

// Re-export commonly used items
pub use config::*;
pub use covariance::*;
pub use features::*;
pub use nearest_neighbor::*;
pub use noise::*;
pub use octree::*;
