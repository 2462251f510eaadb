//! Core data structures and traits for pointfeature
//!
//! This crate provides the fundamental types shared by the feature extraction
//! algorithms: points, point sets with optional normals, bounding boxes,
//! the neighbor search trait and the error type.

pub mod bounds;
pub mod error;
pub mod point;
pub mod point_cloud;
pub mod traits;

pub use bounds::*;
pub use error::*;
pub use point::*;
pub use point_cloud::*;
pub use traits::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Point3, Vector3};
