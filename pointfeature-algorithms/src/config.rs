//! Tuning parameters for a feature extraction run

use crate::octree::{OctreeParams, DEFAULT_LEAF_THRESHOLD, DEFAULT_MAX_DEPTH};
use pointfeature_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Eigenvalue sums below this value yield a descriptor of 0
pub const DEFAULT_EPSILON: f64 = 1.0e-16;

/// Points between two progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: usize = 1_000_000;

/// Points processed between two cancellation checks
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Configuration of a [`FeatureExtractor`](crate::features::FeatureExtractor) run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Maximum number of points per octree leaf
    pub leaf_threshold: usize,
    /// Octree subdivision depth limit
    pub max_depth: usize,
    /// Eigenvalue sum below which a neighborhood counts as degenerate
    pub epsilon: f64,
    /// Log a progress line every this many points (0 disables it)
    pub progress_interval: usize,
    /// Points per batch; cancellation is checked between batches
    pub batch_size: usize,
    /// Process the points of a batch in parallel
    pub parallel: bool,
    /// Number of worker threads (None = rayon's global pool)
    pub num_threads: Option<usize>,
    /// Seed for noise injection (None = fresh entropy per run)
    pub noise_seed: Option<u64>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            leaf_threshold: DEFAULT_LEAF_THRESHOLD,
            max_depth: DEFAULT_MAX_DEPTH,
            epsilon: DEFAULT_EPSILON,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            parallel: true,
            num_threads: None,
            noise_seed: None,
        }
    }
}

impl ExtractorConfig {
    /// Set the octree leaf threshold
    pub fn with_leaf_threshold(mut self, leaf_threshold: usize) -> Self {
        self.leaf_threshold = leaf_threshold;
        self
    }

    /// Set the octree depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable parallel processing (can be disabled for debugging)
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run on a dedicated pool with `num_threads` workers
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Make noise injection reproducible
    pub fn with_noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = Some(seed);
        self
    }

    pub fn octree_params(&self) -> OctreeParams {
        OctreeParams {
            leaf_threshold: self.leaf_threshold,
            max_depth: self.max_depth,
        }
    }

    /// Check the values for consistency
    pub fn validate(&self) -> Result<()> {
        if self.leaf_threshold == 0 {
            return Err(Error::Configuration("leaf_threshold must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::Configuration("batch_size must be at least 1".to_string()));
        }
        if !(self.epsilon >= 0.0) {
            return Err(Error::Configuration("epsilon must be non-negative".to_string()));
        }
        if self.num_threads == Some(0) {
            return Err(Error::Configuration("num_threads must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.leaf_threshold, 15);
        assert_eq!(config.epsilon, 1.0e-16);
        assert_eq!(config.progress_interval, 1_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ExtractorConfig::default()
            .with_leaf_threshold(4)
            .with_threads(2)
            .with_parallel(false)
            .with_noise_seed(7);
        assert_eq!(config.octree_params().leaf_threshold, 4);
        assert_eq!(config.num_threads, Some(2));
        assert!(!config.parallel);
        assert_eq!(config.noise_seed, Some(7));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ExtractorConfig::default().with_leaf_threshold(0).validate().is_err());
        assert!(ExtractorConfig::default().with_batch_size(0).validate().is_err());
        assert!(ExtractorConfig::default().with_epsilon(f64::NAN).validate().is_err());
        assert!(ExtractorConfig::default().with_threads(0).validate().is_err());
    }
}
