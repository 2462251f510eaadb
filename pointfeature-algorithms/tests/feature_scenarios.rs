//! End-to-end feature extraction scenarios

use approx::assert_relative_eq;
use pointfeature_algorithms::{
    covariance_matrix, BruteForceSearch, CovarianceForm, EigenFeature, Eigenvalues, ExtractorConfig,
    FeatureArray, FeatureExtractor, FeatureType, NoiseInjector,
};
use pointfeature_core::{NearestNeighborSearch, NormalPoint3f, Point3f, PointSet, Vector3f};
use rand::prelude::*;
use rand::rngs::StdRng;

fn lattice(size: usize) -> Vec<Point3f> {
    let mut points = Vec::with_capacity(size * size * size);
    for x in 0..size {
        for y in 0..size {
            for z in 0..size {
                points.push(Point3f::new(x as f32, y as f32, z as f32));
            }
        }
    }
    points
}

/// Points on a unit sphere with outward normals
fn sphere(n: usize) -> PointSet {
    let golden = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / n as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            let normal = Vector3f::new(theta.cos() * r, y, theta.sin() * r);
            NormalPoint3f::new(Point3f::from(normal), normal)
        })
        .collect()
}

/// A noisy patch of a plane with slightly jittered normals
fn noisy_patch(seed: u64, n: usize) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let p = Point3f::new(rng.gen_range(0.0..4.0), rng.gen_range(0.0..4.0), rng.gen_range(-0.05..0.05));
            let normal = Vector3f::new(rng.gen_range(-0.2..0.2), rng.gen_range(-0.2..0.2), 1.0).normalize();
            NormalPoint3f::new(p, normal)
        })
        .collect()
}

fn assert_max_min_consistent(features: &FeatureArray) {
    let max = features.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let min = features.iter().fold(f32::INFINITY, |a, &b| a.min(b));
    assert_eq!(features.max(), max as f64);
    assert_eq!(features.min(), min as f64);
}

#[test]
fn lattice_point_pca_linearity() {
    let points = PointSet::from_points(lattice(3));
    let mut extractor = FeatureExtractor::configured(FeatureType::PointPca, 1.5);
    let features = extractor.calc(&points).unwrap();
    assert_eq!(features.len(), 27);

    for (i, p) in points.iter().enumerate() {
        let centered_axes = [p.x, p.y, p.z].iter().filter(|&&c| c == 1.0).count();
        let value = features[i] as f64;
        match centered_axes {
            // Interior point: 19 neighbors, isotropic covariance 10/19 * I
            3 => assert_relative_eq!(value, 0.0, epsilon = 1e-6),
            // Face centers: eigenvalues 8/14, 8/14, 45/196
            2 => assert_relative_eq!(value, 0.0, epsilon = 1e-6),
            // Edge midpoints: eigenvalues 0.6, 0.3, 0.18
            1 => assert_relative_eq!(value, 0.5, epsilon = 1e-6),
            // Corners: eigenvalues 14/49, 14/49, 8/49
            0 => assert_relative_eq!(value, 0.0, epsilon = 1e-6),
            _ => unreachable!(),
        }
    }

    assert_relative_eq!(features.max(), 0.5, epsilon = 1e-6);
    assert_eq!(features.degenerate_count(), 0);
}

#[test]
fn lattice_edge_midpoint_eigenvalues() {
    // Neighborhood of (1, 0, 0) in the 3x3x3 lattice at radius 1.5
    let points = lattice(3);
    let search = BruteForceSearch::new(&points);
    let neighbors = search.find_radius_neighbors(&Point3f::new(1.0, 0.0, 0.0), 1.5);
    assert_eq!(neighbors.len(), 10);

    let vectors: Vec<_> = neighbors.iter().map(|&(j, _)| points[j].coords.cast::<f64>()).collect();
    let l = Eigenvalues::of(&covariance_matrix(&vectors, CovarianceForm::Centered).unwrap());
    assert_relative_eq!(l.l0(), 0.6, epsilon = 1e-12);
    assert_relative_eq!(l.l1(), 0.3, epsilon = 1e-12);
    assert_relative_eq!(l.l2(), 0.18, epsilon = 1e-12);
}

#[test]
fn coincident_normals_have_zero_dispersion() {
    let points: PointSet = [
        Point3f::new(0.0, 0.0, 0.0),
        Point3f::new(0.1, 0.0, 0.0),
        Point3f::new(0.0, 0.1, 0.0),
        Point3f::new(0.1, 0.1, 0.0),
        Point3f::new(0.05, 0.05, 0.05),
    ]
    .into_iter()
    .map(|p| NormalPoint3f::new(p, Vector3f::new(0.0, 0.0, 1.0)))
    .collect();

    let mut extractor = FeatureExtractor::configured(FeatureType::NormalDispersion, 1.0);
    let features = extractor.calc(&points).unwrap();

    assert_eq!(features.len(), 5);
    assert!(features.iter().all(|&v| v == 0.0));
    assert_eq!(features.max(), 0.0);
    assert_eq!(features.degenerate_count(), 0);
}

#[test]
fn isolated_points_are_degenerate_for_dispersion() {
    let points: PointSet = [Point3f::new(0.0, 0.0, 0.0), Point3f::new(10.0, 0.0, 0.0)]
        .into_iter()
        .map(|p| NormalPoint3f::new(p, Vector3f::z()))
        .collect();

    let mut extractor = FeatureExtractor::configured(FeatureType::NormalDispersion, 1.0);
    let features = extractor.calc(&points).unwrap();
    assert_eq!(features.values(), &[0.0, 0.0]);
    assert_eq!(features.degenerate_count(), 2);
}

#[test]
fn identical_normals_are_degenerate_for_normal_pca() {
    let points: PointSet = lattice(4)
        .into_iter()
        .map(|p| NormalPoint3f::new(p, Vector3f::z()))
        .collect();

    // Identical normals have a zero covariance matrix
    let mut extractor = FeatureExtractor::configured(FeatureType::NormalPca, 1.5);
    let features = extractor.calc(&points).unwrap();
    assert!(features.iter().all(|&v| v == 0.0));
    assert_eq!(features.degenerate_count(), points.len());
}

#[test]
fn sphere_normal_features_are_bounded() {
    let points = sphere(2000);

    let mut extractor = FeatureExtractor::configured(FeatureType::NormalPca, 0.2);
    let curvature = extractor.calc(&points).unwrap().clone();
    assert!(curvature.iter().all(|&v| (0.0..=1.0 / 3.0 + 1e-6).contains(&v)));
    assert!(curvature.max() > 0.0);

    extractor.set_feature_type(FeatureType::NormalDispersion);
    let dispersion = extractor.calc(&points).unwrap();
    assert!(dispersion.iter().all(|&v| v >= 0.0));
    assert!(dispersion.max() > 0.0);
}

#[test]
fn max_and_min_match_array_for_every_configuration() {
    let points = noisy_patch(1, 800);
    let eigen_features = [
        EigenFeature::Linearity,
        EigenFeature::Planarity,
        EigenFeature::Aplanarity,
        EigenFeature::ChangeOfCurvature,
        EigenFeature::SumOfEigenvalues,
        EigenFeature::Eigentropy,
    ];

    for feature_type in FeatureType::SUPPORTED {
        for eigen_feature in eigen_features {
            for noise in [None, Some(0.05)] {
                let mut extractor = FeatureExtractor::configured(feature_type, 0.3)
                    .with_config(ExtractorConfig::default().with_noise_seed(5));
                extractor.set_eigen_feature(eigen_feature);
                if let Some(magnitude) = noise {
                    extractor.add_noise(magnitude);
                }

                let features = extractor.calc(&points).unwrap();
                assert_eq!(features.len(), points.len());
                assert_max_min_consistent(features);
                assert_eq!(extractor.max_feature(), Some(extractor.feature().unwrap().max()));
            }
        }
    }
}

#[test]
fn zero_noise_matches_no_noise() {
    let points = noisy_patch(2, 600);

    let mut plain = FeatureExtractor::configured(FeatureType::PointPca, 0.4);
    let expected = plain.calc(&points).unwrap().clone();

    let mut noisy = FeatureExtractor::configured(FeatureType::PointPca, 0.4);
    noisy.add_noise(0.0);
    let actual = noisy.calc(&points).unwrap();

    assert_eq!(actual, &expected);
}

#[test]
fn noise_only_moves_the_own_query_origin() {
    let points = noisy_patch(3, 400);
    let radius = 0.5;
    let magnitude = 0.2;
    let seed = 99;

    let mut extractor = FeatureExtractor::configured(FeatureType::PointPca, radius)
        .with_config(ExtractorConfig::default().with_noise_seed(seed));
    extractor.add_noise(magnitude);
    let features = extractor.calc(&points).unwrap();

    // Recompute each point against the unperturbed coordinates
    let noise = NoiseInjector::new(magnitude, radius, Some(seed));
    let normals = points.normals().unwrap();
    let search = BruteForceSearch::new(points.points());
    for i in 0..points.len() {
        let origin = noise.displace(i, &points[i], &normals[i]);
        let mut neighbors: Vec<usize> = search
            .find_radius_neighbors(&origin, radius)
            .into_iter()
            .map(|(j, _)| j)
            .collect();
        neighbors.sort_unstable();

        let vectors: Vec<_> = neighbors.iter().map(|&j| points[j].coords.cast::<f64>()).collect();
        let expected = covariance_matrix(&vectors, CovarianceForm::Centered)
            .and_then(|m| EigenFeature::Linearity.evaluate(&Eigenvalues::of(&m), 1e-16))
            .unwrap_or(0.0);
        assert_eq!(features[i], expected as f32, "point {}", i);
    }
}

#[test]
fn seeded_noise_is_reproducible() {
    let points = noisy_patch(4, 500);
    let run = |seed: u64, parallel: bool| {
        let mut extractor = FeatureExtractor::configured(FeatureType::NormalDispersion, 0.3)
            .with_config(ExtractorConfig::default().with_noise_seed(seed).with_parallel(parallel));
        extractor.add_noise(0.3);
        extractor.calc(&points).unwrap().clone()
    };

    assert_eq!(run(17, true), run(17, false));
    assert_ne!(run(17, true), run(18, true));
}

#[test]
fn parallel_and_sequential_agree() {
    let points = noisy_patch(5, 1500);

    for feature_type in FeatureType::SUPPORTED {
        let sequential = FeatureExtractor::configured(feature_type, 0.25)
            .with_config(ExtractorConfig::default().with_parallel(false).with_progress_interval(100))
            .calc(&points)
            .unwrap()
            .clone();

        let parallel = FeatureExtractor::configured(feature_type, 0.25)
            .with_config(ExtractorConfig::default().with_batch_size(64))
            .calc(&points)
            .unwrap()
            .clone();

        let pooled = FeatureExtractor::configured(feature_type, 0.25)
            .with_config(ExtractorConfig::default().with_threads(3).with_batch_size(100))
            .calc(&points)
            .unwrap()
            .clone();

        assert_eq!(sequential, parallel, "{}", feature_type);
        assert_eq!(sequential, pooled, "{}", feature_type);
    }
}

#[test]
fn result_does_not_depend_on_leaf_threshold() {
    let points = noisy_patch(6, 700);

    let with_threshold = |leaf_threshold: usize| {
        FeatureExtractor::configured(FeatureType::NormalDispersion, 0.35)
            .with_config(ExtractorConfig::default().with_leaf_threshold(leaf_threshold))
            .calc(&points)
            .unwrap()
            .clone()
    };

    let reference = with_threshold(15);
    assert_eq!(with_threshold(1), reference);
    assert_eq!(with_threshold(1000), reference);
}

#[test]
fn radius_from_bounding_box_divisor() {
    let points = PointSet::from_points(lattice(3));
    let bounds = points.bounding_box().unwrap();

    // diagonal sqrt(12) / 2.309... = 1.5
    let divisor = 12.0f64.sqrt() / 1.5;
    let mut extractor = FeatureExtractor::new();
    extractor
        .set_feature_type(FeatureType::PointPca)
        .set_search_radius_from_bounds(divisor, &bounds);
    assert_relative_eq!(extractor.search_radius().unwrap(), 1.5, epsilon = 1e-9);

    let features = extractor.calc(&points).unwrap();
    assert_relative_eq!(features.max(), 0.5, epsilon = 1e-6);
}
