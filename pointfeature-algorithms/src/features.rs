//! Per-point local shape descriptors
//!
//! [`FeatureExtractor`] gathers the neighbors of every point with an
//! [`Octree`] radius query, computes covariance statistics of the neighbor
//! coordinates or normals and reduces them to one scalar per point.

use crate::config::ExtractorConfig;
use crate::covariance::{covariance_matrix, CovarianceForm, Eigenvalues};
use crate::noise::NoiseInjector;
use crate::octree::Octree;
use nalgebra::Vector3;
use pointfeature_core::{Aabb, Error, NearestNeighborSearch, Point3f, PointSet, Result, Vector3f};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Kind of descriptor computed for each point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    /// Eigenvalue feature of the neighbor coordinate covariance
    PointPca,
    /// Change of curvature of the neighbor normal covariance
    NormalPca,
    /// Variance of the dot products between neighbor normals
    NormalDispersion,
    /// Reserved, not implemented
    RdocFeature,
    /// Reserved, not implemented
    MinimumEntropy,
    /// Reserved, not implemented
    MsFeature,
    /// Reserved, not implemented
    PlaneBasedFeature,
}

impl FeatureType {
    /// The implemented feature types
    pub const SUPPORTED: [FeatureType; 3] = [
        FeatureType::PointPca,
        FeatureType::NormalPca,
        FeatureType::NormalDispersion,
    ];

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }

    /// True if the descriptor reads the point normals
    pub fn requires_normals(&self) -> bool {
        matches!(self, FeatureType::NormalPca | FeatureType::NormalDispersion)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeatureType::PointPca => "point-pca",
            FeatureType::NormalPca => "normal-pca",
            FeatureType::NormalDispersion => "normal-dispersion",
            FeatureType::RdocFeature => "rdoc",
            FeatureType::MinimumEntropy => "minimum-entropy",
            FeatureType::MsFeature => "ms",
            FeatureType::PlaneBasedFeature => "plane-based",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "point-pca" | "pointpca" => Ok(FeatureType::PointPca),
            "normal-pca" | "normalpca" => Ok(FeatureType::NormalPca),
            "normal-dispersion" | "normaldispersion" => Ok(FeatureType::NormalDispersion),
            "rdoc" => Ok(FeatureType::RdocFeature),
            "minimum-entropy" => Ok(FeatureType::MinimumEntropy),
            "ms" => Ok(FeatureType::MsFeature),
            "plane-based" => Ok(FeatureType::PlaneBasedFeature),
            _ => Err(Error::InvalidData(format!("unknown feature type '{}'", s))),
        }
    }
}

/// Scalar derived from the eigenvalues `L0 >= L1 >= L2` of a covariance matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EigenFeature {
    /// `(L0 - L1) / L0`
    #[default]
    Linearity,
    /// `(L1 - L2) / L0`
    Planarity,
    /// `1 - (L1 - L2) / L0`
    Aplanarity,
    /// `L2 / (L0 + L1 + L2)`
    ChangeOfCurvature,
    /// `L0 + L1 + L2`
    SumOfEigenvalues,
    /// `-sum(e_i ln e_i)` with `e_i = L_i / (L0 + L1 + L2)`
    Eigentropy,
}

impl EigenFeature {
    /// Evaluate the feature, or `None` if the eigenvalue sum is below `epsilon`
    pub fn evaluate(&self, l: &Eigenvalues, epsilon: f64) -> Option<f64> {
        let sum = l.sum();
        if !(sum >= epsilon) || sum <= 0.0 {
            return None;
        }
        let value = match self {
            EigenFeature::Linearity => (l.l0() - l.l1()) / l.l0(),
            EigenFeature::Planarity => (l.l1() - l.l2()) / l.l0(),
            EigenFeature::Aplanarity => 1.0 - (l.l1() - l.l2()) / l.l0(),
            EigenFeature::ChangeOfCurvature => l.l2() / sum,
            EigenFeature::SumOfEigenvalues => sum,
            EigenFeature::Eigentropy => -l
                .0
                .iter()
                .map(|v| v / sum)
                .filter(|&e| e > 0.0)
                .map(|e| e * e.ln())
                .sum::<f64>(),
        };
        Some(value)
    }
}

impl FromStr for EigenFeature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linearity" => Ok(EigenFeature::Linearity),
            "planarity" => Ok(EigenFeature::Planarity),
            "aplanarity" => Ok(EigenFeature::Aplanarity),
            "change-of-curvature" | "curvature" => Ok(EigenFeature::ChangeOfCurvature),
            "sum-of-eigenvalues" | "sum" => Ok(EigenFeature::SumOfEigenvalues),
            "eigentropy" => Ok(EigenFeature::Eigentropy),
            _ => Err(Error::InvalidData(format!("unknown eigen feature '{}'", s))),
        }
    }
}

/// Per-point descriptors of one extraction run, index-aligned with the input points
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureArray {
    values: Vec<f32>,
    max: f64,
    min: f64,
    degenerate: usize,
}

impl FeatureArray {
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest descriptor value (0 for an empty array)
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Smallest descriptor value (0 for an empty array)
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Number of points whose neighborhood was too small or too flat for the
    /// descriptor. Their value is 0.
    pub fn degenerate_count(&self) -> usize {
        self.degenerate
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f32> {
        self.values.iter()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }
}

impl Index<usize> for FeatureArray {
    type Output = f32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

/// Lifecycle of a [`FeatureExtractor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorState {
    /// Feature type or search radius not set yet
    Unconfigured,
    /// Ready to run
    Configured,
    /// A run finished and its feature array is available
    Computed,
}

/// Computes one local shape descriptor per point.
///
/// # Example
/// ```rust
/// use pointfeature_core::{Point3f, PointSet};
/// use pointfeature_algorithms::{FeatureExtractor, FeatureType};
///
/// fn main() -> pointfeature_core::Result<()> {
///     let points: PointSet = (0..10)
///         .map(|i| Point3f::new(i as f32 * 0.1, 0.0, 0.0))
///         .collect();
///
///     let mut extractor = FeatureExtractor::new();
///     extractor
///         .set_feature_type(FeatureType::PointPca)
///         .set_search_radius(0.25);
///     let features = extractor.calc(&points)?;
///
///     // Points on a line are perfectly linear
///     assert!(features.iter().all(|&v| (v - 1.0).abs() < 1e-5));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    feature_type: Option<FeatureType>,
    eigen_feature: EigenFeature,
    search_radius: Option<f64>,
    noise: Option<f64>,
    config: ExtractorConfig,
    result: Option<FeatureArray>,
}

impl FeatureExtractor {
    /// Create an unconfigured extractor with the default [`ExtractorConfig`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor ready to run
    pub fn configured(feature_type: FeatureType, search_radius: f64) -> Self {
        let mut extractor = Self::new();
        extractor
            .set_feature_type(feature_type)
            .set_search_radius(search_radius);
        extractor
    }

    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set_config(&mut self, config: ExtractorConfig) -> &mut Self {
        self.config = config;
        self.result = None;
        self
    }

    pub fn set_feature_type(&mut self, feature_type: FeatureType) -> &mut Self {
        self.feature_type = Some(feature_type);
        self.result = None;
        self
    }

    /// Select the eigenvalue feature used by [`FeatureType::PointPca`] (default: linearity)
    pub fn set_eigen_feature(&mut self, eigen_feature: EigenFeature) -> &mut Self {
        self.eigen_feature = eigen_feature;
        self.result = None;
        self
    }

    /// Set the neighbor search radius as an absolute distance
    pub fn set_search_radius(&mut self, radius: f64) -> &mut Self {
        self.search_radius = Some(radius);
        self.result = None;
        self
    }

    /// Set the neighbor search radius to the diagonal of `bounds` divided by `divisor`
    pub fn set_search_radius_from_bounds(&mut self, divisor: f64, bounds: &Aabb) -> &mut Self {
        self.set_search_radius(bounds.diagonal() / divisor)
    }

    /// Perturb each query origin along its point normal by Gaussian noise with
    /// standard deviation `sqrt(search_radius) * magnitude`. Requires normals.
    pub fn add_noise(&mut self, magnitude: f64) -> &mut Self {
        self.noise = Some(magnitude);
        self.result = None;
        self
    }

    pub fn clear_noise(&mut self) -> &mut Self {
        self.noise = None;
        self.result = None;
        self
    }

    pub fn feature_type(&self) -> Option<FeatureType> {
        self.feature_type
    }

    pub fn eigen_feature(&self) -> EigenFeature {
        self.eigen_feature
    }

    pub fn search_radius(&self) -> Option<f64> {
        self.search_radius
    }

    pub fn noise(&self) -> Option<f64> {
        self.noise
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn state(&self) -> ExtractorState {
        if self.result.is_some() {
            ExtractorState::Computed
        } else if self.feature_type.is_some() && self.search_radius.is_some() {
            ExtractorState::Configured
        } else {
            ExtractorState::Unconfigured
        }
    }

    /// Feature array of the last successful run
    pub fn feature(&self) -> Option<&FeatureArray> {
        self.result.as_ref()
    }

    /// Take the feature array of the last run, returning to the configured state
    pub fn take_feature(&mut self) -> Option<FeatureArray> {
        self.result.take()
    }

    pub fn max_feature(&self) -> Option<f64> {
        self.result.as_ref().map(FeatureArray::max)
    }

    pub fn min_feature(&self) -> Option<f64> {
        self.result.as_ref().map(FeatureArray::min)
    }

    /// Compute the descriptor of every point.
    ///
    /// Configuration problems are reported before any point is processed.
    /// Calling this again recomputes from scratch and replaces the previous array.
    ///
    /// # Errors
    /// * [`Error::Configuration`] - missing or invalid feature type, radius,
    ///   noise magnitude or config values
    /// * [`Error::Unsupported`] - a reserved feature type was selected
    /// * [`Error::MissingNormals`] - noise or a normal based descriptor was
    ///   requested for points without normals
    pub fn calc(&mut self, points: &PointSet) -> Result<&FeatureArray> {
        let never = AtomicBool::new(false);
        self.calc_with_cancel(points, &never)
    }

    /// Like [`calc`](Self::calc), checking `cancel` before every batch of points.
    ///
    /// A cancelled run returns [`Error::Cancelled`] and produces no output.
    pub fn calc_with_cancel(&mut self, points: &PointSet, cancel: &AtomicBool) -> Result<&FeatureArray> {
        self.result = None;
        let plan = self.plan(points)?;

        let array = match self.config.num_threads {
            Some(n) if self.config.parallel => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|index| format!("pointfeature-{}", index))
                    .build()
                    .map_err(|e| Error::Algorithm(format!("Failed to create thread pool: {}", e)))?;
                pool.install(|| run_pass(&plan, points, &self.config, cancel))?
            }
            _ => run_pass(&plan, points, &self.config, cancel)?,
        };

        log::info!(
            "Computed {} features for {} points: max {}, min {}",
            plan.feature_type,
            array.len(),
            array.max(),
            array.min()
        );
        if array.degenerate_count() > 0 {
            log::warn!(
                "{} of {} points had a degenerate neighborhood and were set to 0",
                array.degenerate_count(),
                array.len()
            );
        }

        Ok(&*self.result.insert(array))
    }

    /// Validate the configuration against `points`
    fn plan(&self, points: &PointSet) -> Result<RunPlan> {
        let feature_type = self
            .feature_type
            .ok_or_else(|| Error::Configuration("feature type not set".to_string()))?;
        let radius = self
            .search_radius
            .ok_or_else(|| Error::Configuration("search radius not set".to_string()))?;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(Error::Configuration(format!(
                "search radius must be positive and finite, got {}",
                radius
            )));
        }
        if let Some(noise) = self.noise {
            if !(noise.is_finite() && noise >= 0.0) {
                return Err(Error::Configuration(format!(
                    "noise magnitude must be non-negative and finite, got {}",
                    noise
                )));
            }
        }
        self.config.validate()?;

        let descriptor = Descriptor::new(feature_type, self.eigen_feature)?;

        if (self.noise.is_some() || feature_type.requires_normals()) && !points.has_normals() {
            let required_by = if feature_type.requires_normals() {
                feature_type.to_string()
            } else {
                "noise injection".to_string()
            };
            return Err(Error::MissingNormals {
                required_by,
                points: points.len(),
                normals: points.normals().map_or(0, |n| n.len()),
            });
        }

        let noise = self
            .noise
            .map(|magnitude| NoiseInjector::new(magnitude, radius, self.config.noise_seed));
        if let Some(noise) = &noise {
            log::info!(
                "Adding noise: magnitude {}, standard deviation {}",
                noise.magnitude(),
                noise.stddev()
            );
        }

        Ok(RunPlan {
            feature_type,
            descriptor,
            radius,
            noise,
        })
    }
}

/// Validated parameters of one run
struct RunPlan {
    feature_type: FeatureType,
    descriptor: Descriptor,
    radius: f64,
    noise: Option<NoiseInjector>,
}

/// The implemented descriptors
#[derive(Debug, Clone, Copy, PartialEq)]
enum Descriptor {
    PointPca(EigenFeature),
    NormalPca,
    NormalDispersion,
}

impl Descriptor {
    fn new(feature_type: FeatureType, eigen_feature: EigenFeature) -> Result<Self> {
        match feature_type {
            FeatureType::PointPca => Ok(Descriptor::PointPca(eigen_feature)),
            FeatureType::NormalPca => Ok(Descriptor::NormalPca),
            FeatureType::NormalDispersion => Ok(Descriptor::NormalDispersion),
            FeatureType::RdocFeature
            | FeatureType::MinimumEntropy
            | FeatureType::MsFeature
            | FeatureType::PlaneBasedFeature => Err(Error::Unsupported(format!(
                "feature type '{}' is not implemented",
                feature_type
            ))),
        }
    }
}

/// Descriptor value of a single point
#[derive(Debug, Clone, Copy, PartialEq)]
struct PointFeature {
    value: f32,
    neighbors: usize,
    degenerate: bool,
}

impl PointFeature {
    fn valid(value: f64, neighbors: usize) -> Self {
        Self {
            value: value as f32,
            neighbors,
            degenerate: false,
        }
    }

    fn degenerate(neighbors: usize) -> Self {
        Self {
            value: 0.0,
            neighbors,
            degenerate: true,
        }
    }
}

/// Running maximum, minimum and degenerate count.
///
/// `merge` is associative and commutative so partial results from
/// different workers can be combined in any order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FeatureStats {
    max: f64,
    min: f64,
    degenerate: usize,
}

impl Default for FeatureStats {
    fn default() -> Self {
        Self {
            max: f64::NEG_INFINITY,
            min: f64::INFINITY,
            degenerate: 0,
        }
    }
}

impl FeatureStats {
    fn of(feature: &PointFeature) -> Self {
        let value = feature.value as f64;
        Self {
            max: value,
            min: value,
            degenerate: feature.degenerate as usize,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            max: self.max.max(other.max),
            min: self.min.min(other.min),
            degenerate: self.degenerate + other.degenerate,
        }
    }
}

/// Buffers reused across the points handled by one worker
#[derive(Default)]
struct Scratch {
    neighbors: Vec<usize>,
    vectors: Vec<Vector3<f64>>,
}

/// Shared read-only state of a pass
struct PassContext<'a> {
    tree: &'a Octree,
    normals: &'a [Vector3f],
    descriptor: Descriptor,
    radius: f64,
    epsilon: f64,
    noise: Option<NoiseInjector>,
}

impl PassContext<'_> {
    fn compute(&self, index: usize, scratch: &mut Scratch) -> PointFeature {
        let point = &self.tree.points()[index];
        let origin: Point3f = match &self.noise {
            Some(noise) => noise.displace(index, point, &self.normals[index]),
            None => *point,
        };

        self.tree
            .find_radius_indices_into(&origin, self.radius, &mut scratch.neighbors);
        // Traversal order depends on the tree layout; sorting makes the
        // result independent of it.
        scratch.neighbors.sort_unstable();
        let n0 = scratch.neighbors.len();

        match self.descriptor {
            Descriptor::PointPca(eigen_feature) => {
                let points = self.tree.points();
                scratch.vectors.clear();
                scratch
                    .vectors
                    .extend(scratch.neighbors.iter().map(|&j| points[j].coords.cast::<f64>()));
                self.eigen_descriptor(&scratch.vectors, CovarianceForm::Centered, eigen_feature, n0)
            }
            Descriptor::NormalPca => {
                scratch.vectors.clear();
                scratch
                    .vectors
                    .extend(scratch.neighbors.iter().map(|&j| self.normals[j].cast::<f64>()));
                self.eigen_descriptor(
                    &scratch.vectors,
                    CovarianceForm::RawMoment,
                    EigenFeature::ChangeOfCurvature,
                    n0,
                )
            }
            Descriptor::NormalDispersion => match normal_dispersion(&scratch.neighbors, self.normals) {
                Some(value) if value.is_finite() => PointFeature::valid(value, n0),
                _ => PointFeature::degenerate(n0),
            },
        }
    }

    fn eigen_descriptor(
        &self,
        vectors: &[Vector3<f64>],
        form: CovarianceForm,
        feature: EigenFeature,
        n0: usize,
    ) -> PointFeature {
        let Some(covariance) = covariance_matrix(vectors, form) else {
            return PointFeature::degenerate(n0);
        };
        // The eigen solver does not converge on NaN input
        if !covariance.iter().all(|v| v.is_finite()) {
            return PointFeature::degenerate(n0);
        }
        let eigenvalues = Eigenvalues::of(&covariance);
        match feature.evaluate(&eigenvalues, self.epsilon) {
            Some(value) if value.is_finite() => PointFeature::valid(value, n0),
            _ => PointFeature::degenerate(n0),
        }
    }
}

/// Population variance of the dot products between the first neighbor's
/// normal and every other neighbor's normal. `None` for fewer than 2 neighbors.
fn normal_dispersion(neighbors: &[usize], normals: &[Vector3f]) -> Option<f64> {
    let (&first, rest) = neighbors.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let reference = normals[first].cast::<f64>();
    let m = rest.len() as f64;

    let mean = rest
        .iter()
        .map(|&j| reference.dot(&normals[j].cast::<f64>()))
        .sum::<f64>()
        / m;
    let variance = rest
        .iter()
        .map(|&j| {
            let d = reference.dot(&normals[j].cast::<f64>()) - mean;
            d * d
        })
        .sum::<f64>()
        / m;
    Some(variance)
}

fn run_pass(
    plan: &RunPlan,
    points: &PointSet,
    config: &ExtractorConfig,
    cancel: &AtomicBool,
) -> Result<FeatureArray> {
    let n = points.len();
    log::info!(
        "Computing {} features for {} points (search radius {})",
        plan.feature_type,
        n,
        plan.radius
    );

    let normals: Cow<'_, [Vector3f]> = match points.normals() {
        Some(normals) => Cow::Borrowed(normals),
        None => Cow::Owned(vec![Vector3f::zeros(); n]),
    };

    log::info!("Creating octree over {} points", n);
    let tree = Octree::build(points.points(), config.octree_params())?;
    log::debug!(
        "Octree bounds {:?} .. {:?}, {} nodes",
        tree.bounds().min(),
        tree.bounds().max(),
        tree.node_count()
    );

    let ctx = PassContext {
        tree: &tree,
        normals: &normals,
        descriptor: plan.descriptor,
        radius: plan.radius,
        epsilon: config.epsilon,
        noise: plan.noise,
    };

    let mut values = Vec::with_capacity(n);
    let mut stats = FeatureStats::default();
    let mut batch: Vec<PointFeature> = Vec::with_capacity(config.batch_size.min(n));
    let mut start = 0;

    while start < n {
        if cancel.load(Ordering::Relaxed) {
            log::warn!("Feature computation cancelled after {} of {} points", start, n);
            return Err(Error::Cancelled { processed: start });
        }
        let end = (start + config.batch_size).min(n);

        if config.parallel {
            (start..end)
                .into_par_iter()
                .map_init(Scratch::default, |scratch, i| ctx.compute(i, scratch))
                .collect_into_vec(&mut batch);
            stats = batch
                .par_iter()
                .map(FeatureStats::of)
                .reduce(FeatureStats::default, FeatureStats::merge)
                .merge(stats);
        } else {
            let mut scratch = Scratch::default();
            batch.clear();
            batch.extend((start..end).map(|i| ctx.compute(i, &mut scratch)));
            stats = batch.iter().map(FeatureStats::of).fold(stats, FeatureStats::merge);
        }

        log_progress(config.progress_interval, start, &batch);
        values.extend(batch.iter().map(|f| f.value));
        start = end;
    }

    let (max, min) = if values.is_empty() { (0.0, 0.0) } else { (stats.max, stats.min) };
    Ok(FeatureArray {
        values,
        max,
        min,
        degenerate: stats.degenerate,
    })
}

/// Log every point whose 1-based position is a multiple of `interval`
fn log_progress(interval: usize, start: usize, batch: &[PointFeature]) {
    if interval == 0 {
        return;
    }
    let first = (start / interval + 1) * interval;
    for position in (first..=start + batch.len()).step_by(interval) {
        let feature = &batch[position - start - 1];
        log::info!(
            "{} points processed ({} neighbors: {})",
            position,
            feature.neighbors,
            feature.value
        );
    }
}
