#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use ndarray::{array, Array3};

use ralign_core::compute::{ComputeBackend, CpuBackend};
use ralign_core::compute::cpu::correlate_rows_fft;
use ralign_core::correlation::{argmax, resolve_maxshift, smooth_fft_size, CorrelationMap};

#[test]
fn test_cross_correlation_peak_is_translation() {
    let moving = common::points(64, 64, &[(35, 43)]);
    let reference = common::points(64, 64, &[(40, 40)]);
    let ccf = CpuBackend.cross_correlate(&moving, &reference).unwrap();
    assert_abs_diff_eq!(ccf.at_shift([5, -3, 0]), 1.0, epsilon = 1e-9);
    assert_eq!(ccf.peak_wrapped([10, 10, 0]), [5, -3, 0]);
}

#[test]
fn test_peak_search_respects_window() {
    let mut data = Array3::<f64>::zeros((1, 32, 32));
    data[[0, 0, 9]] = 5.0; // dx = 9, outside the window
    data[[0, 2, 30]] = 1.0; // dx = -2, dy = 2
    let map = CorrelationMap::new(data);
    assert_eq!(map.peak_wrapped([4, 4, 0]), [-2, 2, 0]);
    assert_eq!(map.peak_wrapped([10, 10, 0]), [9, 0, 0]);
}

#[test]
fn test_peak_ties_keep_first_in_scan_order() {
    let mut data = Array3::<f64>::zeros((1, 16, 16));
    data[[0, 3, 0]] = 1.0; // dy = 3
    data[[0, 13, 0]] = 1.0; // dy = -3, scanned first
    let map = CorrelationMap::new(data);
    assert_eq!(map.peak_wrapped([5, 5, 0]), [0, -3, 0]);
}

#[test]
fn test_zero_origin_neighborhood_wraps() {
    let mut map = CorrelationMap::new(Array3::from_elem((1, 8, 8), 1.0));
    map.zero_origin_neighborhood();
    assert_eq!(map.data.sum(), 64.0 - 9.0);
    assert_eq!(map.at_shift([-1, -1, 0]), 0.0);
    assert_eq!(map.at_shift([2, 0, 0]), 1.0);

    let mut volume = CorrelationMap::new(Array3::from_elem((4, 4, 4), 1.0));
    volume.zero_origin_neighborhood();
    assert_eq!(volume.data.sum(), 64.0 - 27.0);
}

#[test]
fn test_resolve_maxshift() {
    assert_eq!(resolve_maxshift(None, 64, 8), 8);
    assert_eq!(resolve_maxshift(Some(3), 64, 8), 3);
    assert_eq!(resolve_maxshift(Some(100), 64, 8), 31);
    assert_eq!(resolve_maxshift(Some(3), 1, 8), 0);
    assert_eq!(resolve_maxshift(Some(0), 64, 8), 8);
}

#[test]
fn test_smooth_fft_size() {
    assert_eq!(smooth_fft_size(1), 1);
    assert_eq!(smooth_fft_size(7), 8);
    assert_eq!(smooth_fft_size(11), 12);
    assert_eq!(smooth_fft_size(97), 100);
    assert_eq!(smooth_fft_size(302), 320);
}

#[test]
fn test_argmax_first_maximum() {
    assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
    assert_eq!(argmax(&[]), 0);
}

#[test]
fn test_row_correlation_finds_circular_shift() {
    let a = array![[1.0f32, 0.0, 0.0, 0.0, 0.0], [0.0, 2.0, 0.0, 0.0, 0.0]];
    let b = array![[0.0f32, 0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 0.0, 2.0, 0.0]];
    let ccf = correlate_rows_fft(&a.view(), &b.view()).unwrap();
    assert_eq!(ccf.len(), 5);
    assert_eq!(argmax(&ccf), 2);
    assert_abs_diff_eq!(ccf[2], 5.0, epsilon = 1e-9);
}

#[test]
fn test_row_correlation_rejects_shape_mismatch() {
    let a = array![[1.0f32, 0.0]];
    let b = array![[1.0f32, 0.0, 0.0]];
    assert!(correlate_rows_fft(&a.view(), &b.view()).is_err());
}

#[test]
fn test_amplitude_spectrum_of_constant() {
    let image = ralign_core::image::Image::from_2d(ndarray::Array2::from_elem((4, 4), 1.0));
    let amp = CpuBackend.amplitude_spectrum(&image).unwrap();
    assert_abs_diff_eq!(amp[[0, 0, 0]], 16.0, epsilon = 1e-9);
    assert_abs_diff_eq!(amp[[0, 1, 1]], 0.0, epsilon = 1e-9);
}
