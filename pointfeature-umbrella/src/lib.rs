//! # pointfeature
//!
//! Per-point local surface descriptors for unstructured 3D point clouds.
//!
//! This is the umbrella crate that re-exports the core data structures and the
//! feature extraction algorithms. Use the individual crates for finer control
//! over dependencies.
//!
//! ## Crates
//!
//! - **Core**: point sets with optional normals, bounding boxes, errors
//! - **Algorithms**: octree radius search, covariance eigen features, noise injection
//!
//! ## Quick Start
//!
//! ```rust
//! use pointfeature::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let points: PointSet = (0..20)
//!     .map(|i| Point3f::new(i as f32 * 0.1, 0.0, 0.0))
//!     .collect();
//!
//! let mut extractor = FeatureExtractor::configured(FeatureType::PointPca, 0.25);
//! let features = extractor.calc(&points)?;
//! assert!(features.max() > 0.99);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables algorithms
//! - `algorithms`: Octree and feature extraction

// Re-export core functionality
pub use pointfeature_core::*;

#[cfg(feature = "algorithms")]
pub use pointfeature_algorithms as algorithms;

/// Convenient imports for common use cases
pub mod prelude {
    pub use pointfeature_core::*;

    #[cfg(feature = "algorithms")]
    pub use pointfeature_algorithms::*;
}
