//! Covariance matrices of 3D vector sets and their eigenvalues

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// How the covariance matrix is accumulated.
///
/// Both forms use the population divisor `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CovarianceForm {
    /// Subtract the mean first, then accumulate products
    Centered,
    /// Accumulate raw sums and products, then subtract `sum_a * sum_b / n`
    RawMoment,
}

/// Covariance matrix of `vectors`, `None` for an empty set
pub fn covariance_matrix(vectors: &[Vector3<f64>], form: CovarianceForm) -> Option<Matrix3<f64>> {
    if vectors.is_empty() {
        return None;
    }
    let n = vectors.len() as f64;

    let (xx, yy, zz, xy, yz, zx) = match form {
        CovarianceForm::Centered => {
            let mean = vectors.iter().sum::<Vector3<f64>>() / n;
            let mut acc = [0.0f64; 6];
            for v in vectors {
                let d = v - mean;
                acc[0] += d.x * d.x;
                acc[1] += d.y * d.y;
                acc[2] += d.z * d.z;
                acc[3] += d.x * d.y;
                acc[4] += d.y * d.z;
                acc[5] += d.z * d.x;
            }
            (acc[0] / n, acc[1] / n, acc[2] / n, acc[3] / n, acc[4] / n, acc[5] / n)
        }
        CovarianceForm::RawMoment => {
            let mut sum = Vector3::<f64>::zeros();
            let mut acc = [0.0f64; 6];
            for v in vectors {
                sum += v;
                acc[0] += v.x * v.x;
                acc[1] += v.y * v.y;
                acc[2] += v.z * v.z;
                acc[3] += v.x * v.y;
                acc[4] += v.y * v.z;
                acc[5] += v.z * v.x;
            }
            (
                (acc[0] - sum.x * sum.x / n) / n,
                (acc[1] - sum.y * sum.y / n) / n,
                (acc[2] - sum.z * sum.z / n) / n,
                (acc[3] - sum.x * sum.y / n) / n,
                (acc[4] - sum.y * sum.z / n) / n,
                (acc[5] - sum.z * sum.x / n) / n,
            )
        }
    };

    Some(Matrix3::new(
        xx, xy, zx, //
        xy, yy, yz, //
        zx, yz, zz,
    ))
}

/// Eigenvalues of a symmetric 3x3 matrix, largest first.
///
/// nalgebra's `symmetric_eigen` returns eigenvalues in no guaranteed order;
/// they are sorted here so that index 0 always holds the largest value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Eigenvalues(pub [f64; 3]);

impl Eigenvalues {
    pub fn of(matrix: &Matrix3<f64>) -> Self {
        let eigen = matrix.symmetric_eigen();
        let mut values = [eigen.eigenvalues[0], eigen.eigenvalues[1], eigen.eigenvalues[2]];
        values.sort_by(|a, b| b.total_cmp(a));
        Self(values)
    }

    /// Largest eigenvalue
    pub fn l0(&self) -> f64 {
        self.0[0]
    }

    pub fn l1(&self) -> f64 {
        self.0[1]
    }

    /// Smallest eigenvalue
    pub fn l2(&self) -> f64 {
        self.0[2]
    }

    pub fn sum(&self) -> f64 {
        self.0[0] + self.0[1] + self.0[2]
    }
}
