#[allow(dead_code)]
mod common;

use ndarray::Array3;

use ralign_core::align::config::TranslationalConfig;
use ralign_core::align::{Aligner, TranslationalAligner};
use ralign_core::compare::Ccc;
use ralign_core::compute::CpuBackend;
use ralign_core::consts::{XFORM_ALIGN_2D, XFORM_ALIGN_3D};
use ralign_core::error::AlignError;
use ralign_core::image::Image;
use ralign_core::transform::TransformKind;

fn aligner(maxshift: Option<usize>, nozero: bool, intonly: bool) -> TranslationalAligner {
    TranslationalAligner::new(TranslationalConfig {
        maxshift,
        nozero,
        intonly,
    })
}

#[test]
fn test_recovers_point_offset() {
    let moving = common::points(64, 64, &[(35, 43)]);
    let reference = common::points(64, 64, &[(40, 40)]);
    let a = aligner(Some(10), false, false);

    let t = a.estimate(&moving, Some(&reference), &CpuBackend).unwrap();
    assert_eq!(t.translation(), [5.0, -3.0, 0.0]);
    assert_eq!(t.alpha(), 0.0);

    let out = a.align(&moving, Some(&reference), &Ccc, &CpuBackend).unwrap();
    assert_eq!(out.get(40, 40, 0), 1.0);
    let stored = out.transform(XFORM_ALIGN_2D).expect("transform stored");
    assert_eq!(stored.translation(), [5.0, -3.0, 0.0]);
}

#[test]
fn test_shift_outside_window_is_not_found() {
    let moving = common::points(64, 64, &[(20, 40)]);
    let reference = common::points(64, 64, &[(40, 40)]);
    let t = aligner(Some(10), false, false)
        .estimate(&moving, Some(&reference), &CpuBackend)
        .unwrap();
    assert!(t.translation()[0].abs() <= 10.0);
}

#[test]
fn test_self_alignment_halves_peak() {
    // Two points 5 px apart in x and 3 px in y; the autocorrelation peaks at
    // ±(5, 3) once the zero lag is suppressed.
    let image = common::points(64, 64, &[(20, 30), (25, 33)]);
    let t = aligner(Some(10), true, false)
        .estimate(&image, None, &CpuBackend)
        .unwrap();
    let [tx, ty, _] = t.translation();
    assert_eq!(tx.abs(), 2.5);
    assert_eq!(ty.abs(), 1.5);
    assert_eq!(tx.signum(), ty.signum());
}

#[test]
fn test_self_alignment_intonly_rounds() {
    let image = common::points(64, 64, &[(20, 30), (25, 33)]);
    let t = aligner(Some(10), true, true)
        .estimate(&image, None, &CpuBackend)
        .unwrap();
    let [tx, ty, _] = t.translation();
    // floor(±2.5 + 0.5), floor(±1.5 + 0.5)
    assert!((tx, ty) == (3.0, 2.0) || (tx, ty) == (-2.0, -1.0), "got ({tx}, {ty})");
}

#[test]
fn test_self_alignment_without_nozero_is_identity() {
    let image = common::reference();
    let t = aligner(None, false, false)
        .estimate(&image, None, &CpuBackend)
        .unwrap();
    assert!(t.is_identity());
}

#[test]
fn test_volume_translation() {
    let moving = common::point_volume(16, 5, 6, 7);
    let reference = common::point_volume(16, 7, 5, 10);
    let a = aligner(Some(5), false, false);

    let t = a.estimate(&moving, Some(&reference), &CpuBackend).unwrap();
    assert_eq!(t.kind(), TransformKind::ThreeD);
    assert_eq!(t.translation(), [2.0, -1.0, 3.0]);

    let out = a.align(&moving, Some(&reference), &Ccc, &CpuBackend).unwrap();
    assert_eq!(out.get(7, 5, 10), 1.0);
    assert!(out.transform(XFORM_ALIGN_3D).is_some());
}

#[test]
fn test_volume_nozero_suppresses_diagonal_neighbors() {
    let mut m = Array3::<f32>::zeros((16, 16, 16));
    m[[5, 5, 5]] = 1.0;
    let mut r = Array3::<f32>::zeros((16, 16, 16));
    r[[5, 5, 5]] = 1.0;
    // (1, 1, 1) is a corner of the 26-neighborhood.
    r[[6, 6, 6]] = 0.8;
    r[[6, 7, 8]] = 0.5;
    let (moving, reference) = (Image::new(m), Image::new(r));

    let plain = aligner(Some(5), false, false)
        .estimate(&moving, Some(&reference), &CpuBackend)
        .unwrap();
    assert_eq!(plain.translation(), [0.0, 0.0, 0.0]);

    let t = aligner(Some(5), true, false)
        .estimate(&moving, Some(&reference), &CpuBackend)
        .unwrap();
    assert_eq!(t.translation(), [3.0, 2.0, 1.0]);
}

#[test]
fn test_maxshift_clamped_to_half_extent() {
    let a = aligner(Some(100), false, false);
    assert_eq!(a.maxshift([16, 16, 1]), [7, 7, 0]);
    assert_eq!(aligner(None, false, false).maxshift([64, 32, 1]), [8, 4, 0]);
}

#[test]
fn test_size_mismatch() {
    let moving = common::points(32, 32, &[(1, 1)]);
    let reference = common::points(32, 16, &[(1, 1)]);
    let err = aligner(None, false, false)
        .estimate(&moving, Some(&reference), &CpuBackend)
        .unwrap_err();
    assert!(matches!(err, AlignError::DimensionMismatch { .. }));
}
