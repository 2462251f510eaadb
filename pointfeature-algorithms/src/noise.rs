//! Gaussian perturbation of query origins along point normals
//!
//! Each point draws its sample from its own generator seeded from the run
//! seed and the point index, so a run is reproducible no matter how the
//! points are distributed across threads.

use pointfeature_core::{Point3f, Vector3f};
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;

/// Zero-mean Gaussian displacement with standard deviation
/// `sqrt(search_radius) * magnitude`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseInjector {
    magnitude: f64,
    stddev: f64,
    seed: u64,
}

impl NoiseInjector {
    /// Create a new noise injector
    ///
    /// If `seed` is `None`, a seed is drawn from the thread-local generator.
    pub fn new(magnitude: f64, search_radius: f64, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| thread_rng().gen());
        Self {
            magnitude,
            stddev: search_radius.sqrt() * magnitude,
            seed,
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn stddev(&self) -> f64 {
        self.stddev
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Gaussian sample for the point at `index`
    pub fn sample(&self, index: usize) -> f64 {
        if self.stddev == 0.0 {
            return 0.0;
        }
        let mut rng = SmallRng::seed_from_u64(point_seed(self.seed, index as u64));
        let n: f64 = rng.sample(StandardNormal);
        n * self.stddev
    }

    /// Query origin of point `index` moved along its normal by one sample
    pub fn displace(&self, index: usize, origin: &Point3f, normal: &Vector3f) -> Point3f {
        let t = self.sample(index);
        if t == 0.0 {
            return *origin;
        }
        Point3f::new(
            (origin.x as f64 + t * normal.x as f64) as f32,
            (origin.y as f64 + t * normal.y as f64) as f32,
            (origin.z as f64 + t * normal.z as f64) as f32,
        )
    }
}

/// splitmix64 finalizer over the run seed and point index
fn point_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
