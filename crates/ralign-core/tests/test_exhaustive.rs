#[allow(dead_code)]
mod common;

use ralign_core::align::config::{ExhaustiveConfig, SlowExhaustiveConfig};
use ralign_core::align::exhaustive::Candidate;
use ralign_core::align::slow_exhaustive::Pose;
use ralign_core::align::{Aligner, ExhaustiveAligner, SlowExhaustiveAligner};
use ralign_core::compare::Ccc;
use ralign_core::compute::CpuBackend;
use ralign_core::consts::XFORM_ALIGN_2D;
use ralign_core::error::AlignError;
use ralign_core::ops::flip_x;

fn exhaustive(maxshift: Option<usize>) -> ExhaustiveAligner {
    ExhaustiveAligner::new(ExhaustiveConfig {
        maxshift,
        flip: None,
    })
}

fn slow(maxshift: Option<usize>) -> SlowExhaustiveAligner {
    SlowExhaustiveAligner::new(SlowExhaustiveConfig {
        maxshift,
        ..Default::default()
    })
}

// ---------------------------------------------------------------------------
// Ring-based exhaustive search
// ---------------------------------------------------------------------------

#[test]
fn test_candidate_transform_undoes_origin_offset() {
    let c = Candidate {
        angle: 0.0,
        dx: 4.0,
        dy: -2.0,
        mirror: false,
        score: 0.0,
    };
    assert_eq!(c.to_transform().translation(), [-4.0, 2.0, 0.0]);
    let m = Candidate { mirror: true, ..c };
    assert!(m.to_transform().mirror());
}

#[test]
fn test_exhaustive_identity() {
    let reference = common::reference();
    let outcome = exhaustive(None)
        .search(&reference, &reference, &Ccc, &CpuBackend)
        .unwrap();
    let fine = outcome.fine;
    assert_eq!((fine.dx, fine.dy), (0.0, 0.0));
    assert!(!fine.mirror);
    assert!(common::angle_diff(fine.angle, 0.0) < 1.0, "angle = {}", fine.angle);
    assert!(fine.score <= outcome.seed_score);
}

#[test]
fn test_exhaustive_recovers_translation() {
    let reference = common::reference();
    let moving = common::shifted(&reference, 4.0, -2.0);

    let outcome = exhaustive(None)
        .search(&moving, &reference, &Ccc, &CpuBackend)
        .unwrap();
    assert_eq!((outcome.coarse.dx, outcome.coarse.dy), (2.0, -1.0));
    assert_eq!((outcome.fine.dx, outcome.fine.dy), (4.0, -2.0));
    assert!(!outcome.fine.mirror);
    assert!(outcome.fine.score <= outcome.seed_score);

    let out = exhaustive(None)
        .align(&moving, Some(&reference), &Ccc, &CpuBackend)
        .unwrap();
    let t = out.transform(XFORM_ALIGN_2D).unwrap();
    let [tx, ty, _] = t.translation();
    assert!((tx + 4.0).abs() < 0.1 && (ty - 2.0).abs() < 0.1, "transform = {t}");
    assert!(common::correlation(&out, &reference) > 0.99);
}

#[test]
fn test_exhaustive_recovers_rotation() {
    let reference = common::reference();
    let moving = common::rotated(&reference, -30.0);

    let outcome = exhaustive(Some(4))
        .search(&moving, &reference, &Ccc, &CpuBackend)
        .unwrap();
    assert!(common::angle_diff(outcome.fine.angle, 30.0) < 1.5, "{:?}", outcome.fine);
    assert!(!outcome.fine.mirror);
    assert!(outcome.fine.score <= outcome.seed_score);
}

#[test]
fn test_exhaustive_finds_mirror() {
    let reference = common::reference();
    let moving = flip_x(&reference);
    let out = exhaustive(Some(4))
        .align(&moving, Some(&reference), &Ccc, &CpuBackend)
        .unwrap();
    assert!(out.transform(XFORM_ALIGN_2D).unwrap().mirror());
    assert!(common::correlation(&out, &reference) > 0.95);
}

#[test]
fn test_exhaustive_preconditions() {
    let reference = common::reference();
    let err = exhaustive(Some(1))
        .search(&reference, &reference, &Ccc, &CpuBackend)
        .unwrap_err();
    assert!(matches!(err, AlignError::InvalidConfig(_)));

    // nx / 8 < 2 for a 12-pixel image.
    let tiny = common::blobs(12, 12);
    assert!(matches!(exhaustive(None).maxshift(tiny.nx()), Err(AlignError::InvalidConfig(_))));

    // The shift eats every ring.
    let err = exhaustive(Some(26))
        .search(&reference, &reference, &Ccc, &CpuBackend)
        .unwrap_err();
    assert!(matches!(err, AlignError::InvalidConfig(_)));

    let err = exhaustive(None)
        .align(&reference, None, &Ccc, &CpuBackend)
        .unwrap_err();
    assert!(matches!(err, AlignError::InvalidInput(_)));

    let volume = common::point_volume(32, 1, 1, 1);
    let err = exhaustive(None)
        .search(&volume, &volume, &Ccc, &CpuBackend)
        .unwrap_err();
    assert!(matches!(err, AlignError::InvalidInput(_)));
}

// ---------------------------------------------------------------------------
// Resampling exhaustive search
// ---------------------------------------------------------------------------

#[test]
fn test_pose_transform_translates_after_rotation() {
    let p = Pose {
        alpha: 90.0,
        tx: 1.0,
        ty: 2.0,
        mirror: false,
        score: 0.0,
    };
    let t = p.to_transform();
    assert_eq!(t.alpha(), 90.0);
    assert_eq!(t.translation(), [1.0, 2.0, 0.0]);
}

#[test]
fn test_slow_default_angle_step() {
    let step = slow(None).angle_step(64);
    assert!((step - 2.0_f64.atan2(64.0).to_degrees()).abs() < 1e-12);
    let custom = SlowExhaustiveAligner::new(SlowExhaustiveConfig {
        angstep: Some(3.0),
        ..Default::default()
    });
    assert_eq!(custom.angle_step(64), 3.0);
}

#[test]
fn test_slow_recovers_translation() {
    let reference = common::reference();
    let moving = common::shifted(&reference, 4.0, -2.0);

    let outcome = slow(None)
        .search(&moving, &reference, &Ccc, &CpuBackend)
        .unwrap();
    let fine = outcome.fine;
    assert!(!fine.mirror);
    assert!((fine.tx + 4.0).abs() < 0.5 && (fine.ty - 2.0).abs() < 0.5, "{fine:?}");
    assert!(common::angle_diff(fine.alpha, 0.0) < 2.0, "{fine:?}");
    assert!(fine.score <= outcome.seed_score);
}

#[test]
fn test_slow_stays_inside_maxshift_disk() {
    let reference = common::reference();
    let moving = common::shifted(&reference, 5.0, 0.0);

    let outcome = slow(Some(4))
        .search(&moving, &reference, &Ccc, &CpuBackend)
        .unwrap();
    let (coarse, fine) = (outcome.coarse, outcome.fine);
    assert!(coarse.tx.hypot(coarse.ty) * 2.0 <= 4.0 + 1e-9, "{coarse:?}");
    assert!(fine.tx.hypot(fine.ty) <= 4.0 + 1e-9, "{fine:?}");
    assert!(fine.score <= outcome.seed_score);
}

#[test]
fn test_slow_zero_maxshift_selects_default() {
    let reference = common::reference();
    let moving = common::shifted(&reference, 4.0, -2.0);
    let outcome = slow(Some(0))
        .search(&moving, &reference, &Ccc, &CpuBackend)
        .unwrap();
    let fine = outcome.fine;
    assert!((fine.tx + 4.0).abs() < 0.5 && (fine.ty - 2.0).abs() < 0.5, "{fine:?}");
}

#[test]
fn test_slow_finds_mirror() {
    let reference = common::reference();
    let moving = flip_x(&reference);
    let out = slow(None)
        .align(&moving, Some(&reference), &Ccc, &CpuBackend)
        .unwrap();
    assert!(out.transform(XFORM_ALIGN_2D).unwrap().mirror());
    assert!(common::correlation(&out, &reference) > 0.95);
}

#[test]
fn test_slow_rejects_bad_steps() {
    let reference = common::reference();
    let bad = SlowExhaustiveAligner::new(SlowExhaustiveConfig {
        transtep: 0.0,
        ..Default::default()
    });
    let err = bad.align(&reference, Some(&reference), &Ccc, &CpuBackend).unwrap_err();
    assert!(matches!(err, AlignError::InvalidConfig(_)));
}
