//! Feature extraction demo on a synthetic point cloud
//!
//! Samples a surface with normals, computes one descriptor per point and
//! prints a summary with a coarse histogram of the values.
//!
//! Usage:
//!   cargo run --bin feature_demo -- --surface cylinder --feature point-pca --eigen-feature planarity
//!   cargo run --bin feature_demo -- --feature normal-dispersion --noise 0.1 --seed 42
//!
//! Enable logging to see progress and octree statistics:
//!   RUST_LOG=debug cargo run --bin feature_demo

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use pointfeature_algorithms::{EigenFeature, ExtractorConfig, FeatureArray, FeatureExtractor, FeatureType};
use pointfeature_core::{NormalPoint3f, Point3f, PointSet, Vector3f};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::f32::consts::{PI, TAU};
use std::time::Instant;

/// Synthetic surfaces to sample
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Surface {
    Sphere,
    Cylinder,
    Plane,
    Box,
}

/// Local shape descriptors on a synthetic point cloud
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Surface to sample
    #[arg(short, long, value_enum, default_value = "sphere")]
    surface: Surface,

    /// Number of points
    #[arg(short = 'n', long, default_value = "50000")]
    points: usize,

    /// Feature type (point-pca, normal-pca, normal-dispersion)
    #[arg(short, long, default_value = "point-pca")]
    feature: FeatureType,

    /// Eigenvalue feature used by point-pca
    #[arg(short, long, default_value = "linearity")]
    eigen_feature: EigenFeature,

    /// Absolute search radius
    #[arg(short, long, conflicts_with = "divisor")]
    radius: Option<f64>,

    /// Search radius as the bounding box diagonal divided by this value
    #[arg(short, long, default_value = "50.0")]
    divisor: f64,

    /// Noise magnitude for the query origins
    #[arg(long)]
    noise: Option<f64>,

    /// Seed for the sampled surface and the noise
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Worker threads (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Disable parallel processing
    #[arg(long)]
    sequential: bool,

    /// Number of histogram bins
    #[arg(long, default_value = "10")]
    bins: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.points == 0 {
        bail!("--points must be at least 1");
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let cloud = sample_surface(args.surface, args.points, &mut rng);
    println!("Sampled {:?} with {} points", args.surface, cloud.len());

    let mut config = ExtractorConfig::default()
        .with_parallel(!args.sequential)
        .with_noise_seed(args.seed);
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }

    let mut extractor = FeatureExtractor::new().with_config(config);
    extractor
        .set_feature_type(args.feature)
        .set_eigen_feature(args.eigen_feature);
    match args.radius {
        Some(radius) => {
            extractor.set_search_radius(radius);
        }
        None => {
            let bounds = cloud.bounding_box().context("point cloud has no finite bounds")?;
            extractor.set_search_radius_from_bounds(args.divisor, &bounds);
        }
    }
    if let Some(noise) = args.noise {
        extractor.add_noise(noise);
    }

    let radius = extractor.search_radius().unwrap_or_default();
    log::info!("Extractor configuration: {:?}", extractor.config());
    let start = Instant::now();
    let features = extractor
        .calc(&cloud)
        .with_context(|| format!("computing {} features", args.feature))?;
    let elapsed = start.elapsed();

    println!("\n{} features (search radius {:.4})", args.feature, radius);
    println!("  computed in {:?}", elapsed);
    println!("  max {:.6}, min {:.6}", features.max(), features.min());
    println!("  degenerate neighborhoods: {}", features.degenerate_count());
    print_histogram(features, args.bins);

    Ok(())
}

fn sample_surface(surface: Surface, n: usize, rng: &mut StdRng) -> PointSet {
    (0..n)
        .map(|_| match surface {
            Surface::Sphere => {
                let z: f32 = rng.gen_range(-1.0..1.0);
                let theta: f32 = rng.gen_range(0.0..TAU);
                let r = (1.0 - z * z).sqrt();
                let normal = Vector3f::new(r * theta.cos(), r * theta.sin(), z);
                NormalPoint3f::new(Point3f::from(normal), normal)
            }
            Surface::Cylinder => {
                let theta: f32 = rng.gen_range(0.0..TAU);
                let z: f32 = rng.gen_range(0.0..2.0);
                let normal = Vector3f::new(theta.cos(), theta.sin(), 0.0);
                NormalPoint3f::new(Point3f::new(normal.x * 0.5, normal.y * 0.5, z), normal)
            }
            Surface::Plane => {
                let x: f32 = rng.gen_range(-1.0..1.0);
                let y: f32 = rng.gen_range(-1.0..1.0);
                let z = 0.05 * (x * PI * 2.0).sin();
                let normal = Vector3f::new(-0.1 * PI * (x * PI * 2.0).cos(), 0.0, 1.0).normalize();
                NormalPoint3f::new(Point3f::new(x, y, z), normal)
            }
            Surface::Box => {
                let face = rng.gen_range(0..6);
                let u: f32 = rng.gen_range(-1.0..1.0);
                let v: f32 = rng.gen_range(-1.0..1.0);
                let sign = if face % 2 == 0 { 1.0 } else { -1.0 };
                let (position, normal) = match face / 2 {
                    0 => (Point3f::new(sign, u, v), Vector3f::new(sign, 0.0, 0.0)),
                    1 => (Point3f::new(u, sign, v), Vector3f::new(0.0, sign, 0.0)),
                    _ => (Point3f::new(u, v, sign), Vector3f::new(0.0, 0.0, sign)),
                };
                NormalPoint3f::new(position, normal)
            }
        })
        .collect()
}

fn print_histogram(features: &FeatureArray, bins: usize) {
    if features.is_empty() || bins == 0 {
        return;
    }
    let (min, max) = (features.min(), features.max());
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &value in features.iter() {
        let bin = if width > 0.0 {
            (((value as f64 - min) / width) as usize).min(bins - 1)
        } else {
            0
        };
        counts[bin] += 1;
    }

    let largest = counts.iter().copied().max().unwrap_or(1).max(1);
    println!("\n  histogram:");
    for (i, count) in counts.iter().enumerate() {
        let lower = min + width * i as f64;
        let bar = "#".repeat(count * 40 / largest);
        println!("  {:>10.4} | {:<40} {}", lower, bar, count);
    }
}
