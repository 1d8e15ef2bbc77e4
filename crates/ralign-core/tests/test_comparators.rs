#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use ralign_core::compare::{
    create_comparator, list_comparators, Ccc, Comparator, ComparatorConfig, ComparatorSpec, Dot,
    SqEuclidean,
};
use ralign_core::error::AlignError;
use ralign_core::image::Image;

fn ramp() -> Image {
    Image::from_2d(Array2::from_shape_fn((8, 8), |(y, x)| (y * 8 + x) as f32 / 64.0))
}

#[test]
fn test_ccc_range_and_sign() {
    let a = ramp();
    let inverted = a.with_data(a.data.mapv(|v| 1.0 - v));
    assert_abs_diff_eq!(Ccc.score(&a, &a).unwrap(), -1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(Ccc.score(&inverted, &a).unwrap(), 1.0, epsilon = 1e-9);
}

#[test]
fn test_ccc_ignores_gain_and_offset() {
    let a = ramp();
    let scaled = a.with_data(a.data.mapv(|v| 3.0 * v + 0.2));
    assert_abs_diff_eq!(Ccc.score(&scaled, &a).unwrap(), -1.0, epsilon = 1e-6);
}

#[test]
fn test_ccc_constant_image_scores_zero() {
    let a = ramp();
    let flat = Image::zeros(8, 8, 1);
    assert_eq!(Ccc.score(&flat, &a).unwrap(), 0.0);
}

#[test]
fn test_sqeuclidean() {
    let a = ramp();
    let offset = a.with_data(a.data.mapv(|v| v + 0.5));
    assert_eq!(SqEuclidean::new(false).score(&a, &a).unwrap(), 0.0);
    assert_abs_diff_eq!(SqEuclidean::new(false).score(&offset, &a).unwrap(), 0.25, epsilon = 1e-6);
    // Normalized: the offset is fitted away.
    assert_abs_diff_eq!(SqEuclidean::new(true).score(&offset, &a).unwrap(), 0.0, epsilon = 1e-9);
}

#[test]
fn test_dot() {
    let a = ramp();
    let doubled = a.with_data(a.data.mapv(|v| 2.0 * v));
    let plain = Dot::new(false).score(&doubled, &a).unwrap();
    assert!(plain < Dot::new(false).score(&a, &a).unwrap());
    assert_abs_diff_eq!(Dot::new(true).score(&doubled, &a).unwrap(), -1.0, epsilon = 1e-9);
}

#[test]
fn test_size_mismatch() {
    let a = ramp();
    let b = Image::zeros(4, 4, 1);
    assert!(matches!(Ccc.score(&a, &b), Err(AlignError::DimensionMismatch { .. })));
}

#[test]
fn test_registry() {
    let names: Vec<&str> = list_comparators().iter().map(|(n, _)| *n).collect();
    assert_eq!(names, ["sqeuclidean", "ccc", "dot"]);
    for name in names {
        let c = create_comparator(name, &ComparatorConfig::default()).unwrap();
        assert_eq!(c.name(), name);
    }
    assert!(matches!(
        create_comparator("phase", &ComparatorConfig::default()),
        Err(AlignError::UnknownComparator(_))
    ));
}

#[test]
fn test_spec_from_toml() {
    let spec: ComparatorSpec = toml::from_str("name = \"sqeuclidean\"\n[config]\nnormalize = true\n").unwrap();
    assert!(spec.config.normalize);
    assert_eq!(spec.build().unwrap().name(), "sqeuclidean");
    assert_eq!(ComparatorSpec::default().name, "ccc");
}
