#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use ndarray::{array, Array2, Array3};

use ralign_core::error::AlignError;
use ralign_core::image::Image;
use ralign_core::ops::{
    apply_transform, bilinear_sample, flip_x, median_shrink, rotate_180, rotate_columns,
    subtract_row_means, unwrap, Span,
};
use ralign_core::transform::Transform;

// ---------------------------------------------------------------------------
// Resampling
// ---------------------------------------------------------------------------

#[test]
fn test_bilinear_sample_interpolates_and_zero_fills() {
    let data = array![[0.0f32, 1.0], [2.0, 3.0]];
    let v = data.view();
    assert_abs_diff_eq!(bilinear_sample(&v, 0.5, 0.5), 1.5, epsilon = 1e-6);
    assert_abs_diff_eq!(bilinear_sample(&v, 1.0, 0.0), 2.0, epsilon = 1e-6);
    assert_eq!(bilinear_sample(&v, -5.0, 0.0), 0.0);
}

#[test]
fn test_integer_translation_moves_content() {
    let image = common::points(16, 16, &[(5, 6)]);
    let out = apply_transform(&image, &Transform::planar(0.0, 3.0, -2.0, false));
    assert_eq!(out.get(8, 4, 0), 1.0);
    assert_abs_diff_eq!(out.data.sum(), 1.0, epsilon = 1e-6);
}

#[test]
fn test_rotation_by_90_about_center() {
    // Center is (8, 8); (12, 8) is +4 along x and rotates onto +4 along y.
    let image = common::points(16, 16, &[(12, 8)]);
    let out = apply_transform(&image, &Transform::rotation_2d(90.0));
    assert_abs_diff_eq!(out.get(8, 12, 0), 1.0, epsilon = 1e-5);
}

#[test]
fn test_apply_transform_keeps_metadata() {
    let mut image = common::reference();
    image.set_transform("xform.projection", std::sync::Arc::new(Transform::rotation_2d(5.0)));
    let out = apply_transform(&image, &Transform::rotation_2d(10.0));
    assert!(out.transform("xform.projection").is_some());
}

#[test]
fn test_flip_x_reflects_about_center() {
    let image = common::points(8, 4, &[(5, 1)]);
    let out = flip_x(&image);
    // cx = 4: x = 5 maps to 3.
    assert_eq!(out.get(3, 1, 0), 1.0);
    assert_eq!(flip_x(&out).data, image.data);
}

#[test]
fn test_rotate_180_matches_resampled_rotation() {
    let image = common::reference();
    let turned = rotate_180(&image);
    let resampled = apply_transform(&image, &Transform::rotation_2d(180.0));
    for (a, b) in turned.data.iter().zip(resampled.data.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
    }
}

#[test]
fn test_volume_translation() {
    let image = common::point_volume(8, 3, 4, 2);
    let out = apply_transform(&image, &Transform::translation_3d([1.0, -1.0, 2.0]));
    assert_eq!(out.get(4, 3, 4), 1.0);
}

// ---------------------------------------------------------------------------
// Median shrink
// ---------------------------------------------------------------------------

#[test]
fn test_median_shrink_even_block_averages_middle_pair() {
    let data = array![[1.0f32, 2.0, 10.0, 10.0], [3.0, 100.0, 10.0, 10.0]];
    let out = median_shrink(&Image::from_2d(data), 2).unwrap();
    assert_eq!(out.dims(), [2, 1, 1]);
    // Sorted block 1, 2, 3, 100: median (2 + 3) / 2.
    assert_eq!(out.get(0, 0, 0), 2.5);
    assert_eq!(out.get(1, 0, 0), 10.0);
}

#[test]
fn test_median_shrink_drops_partial_blocks() {
    let image = Image::zeros(9, 7, 1);
    let out = median_shrink(&image, 2).unwrap();
    assert_eq!(out.dims(), [4, 3, 1]);
}

#[test]
fn test_median_shrink_rejects_bad_factor() {
    let image = Image::zeros(4, 4, 1);
    assert!(matches!(median_shrink(&image, 0), Err(AlignError::InvalidConfig(_))));
    assert!(matches!(median_shrink(&image, 5), Err(AlignError::InvalidInput(_))));
}

// ---------------------------------------------------------------------------
// Polar unwrap
// ---------------------------------------------------------------------------

#[test]
fn test_unwrap_shape_and_first_column() {
    let image = common::points(32, 32, &[(26, 16)]);
    let rings = unwrap(&image.plane(), 4, 14, 72, 0.0, 0.0, Span::Full);
    assert_eq!(rings.dim(), (10, 72));
    // Radius 10, angle 0 points along +x from (16, 16).
    assert_abs_diff_eq!(rings[[6, 0]], 1.0, epsilon = 1e-5);
}

#[test]
fn test_unwrap_with_offset_origin() {
    let image = common::points(32, 32, &[(21, 19)]);
    let rings = unwrap(&image.plane(), 4, 10, 36, -3.0, 3.0, Span::Full);
    // Origin (13, 19); the point is 8 px along +x.
    assert_abs_diff_eq!(rings[[4, 0]], 1.0, epsilon = 1e-5);
}

#[test]
fn test_rotate_columns_shifts_right() {
    let a = array![[1.0f32, 2.0, 3.0, 4.0]];
    assert_eq!(rotate_columns(&a.view(), 1), array![[4.0f32, 1.0, 2.0, 3.0]]);
    assert_eq!(rotate_columns(&a.view(), -1), array![[2.0f32, 3.0, 4.0, 1.0]]);
    assert_eq!(rotate_columns(&a.view(), 4), a);
}

#[test]
fn test_subtract_row_means() {
    let mut a: Array2<f32> = array![[1.0, 3.0], [10.0, 10.0]];
    subtract_row_means(&mut a);
    assert_eq!(a, array![[-1.0f32, 1.0], [0.0, 0.0]]);
}

#[test]
fn test_zero_image_dims() {
    let image = Image::new(Array3::zeros((2, 3, 4)));
    assert_eq!(image.dims(), [4, 3, 2]);
    assert!(image.is_volume());
}
