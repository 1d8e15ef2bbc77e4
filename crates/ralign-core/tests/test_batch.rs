#[allow(dead_code)]
mod common;

use ralign_core::compute::{
    create_backend, BatchAligner, BatchGeometry, ComputeBackend, CpuBackend, CpuBatchAligner,
    DevicePreference,
};
use ralign_core::error::AlignError;
use ralign_core::image::Image;
use ralign_core::job::align_stack;
use ralign_core::ops::flip_x;

fn geometry() -> BatchGeometry {
    BatchGeometry::for_image(common::SIZE, common::SIZE, 4).unwrap()
}

#[test]
fn test_geometry_for_image() {
    let g = geometry();
    assert_eq!(g.inner_radius(), 4);
    assert_eq!(g.outer_radius(), 26);
    assert_eq!((g.kx, g.ky, g.step), (4, 4, 1));
    assert_eq!(g.offsets().len(), 81);
    assert_eq!(g.offsets()[0], (-4, -4));
    assert!(BatchGeometry::for_image(16, 16, 6).is_err());
}

#[test]
fn test_setup_validates() {
    let mut batch = CpuBatchAligner::new();
    let err = batch.setup(0, (64, 64), geometry()).unwrap_err();
    assert!(matches!(err, AlignError::InvalidConfig(_)));

    let too_big = BatchGeometry {
        ring_count: 40,
        ..geometry()
    };
    let err = batch.setup(2, (64, 64), too_big).unwrap_err();
    assert!(matches!(err, AlignError::InvalidConfig(_)));
}

#[test]
fn test_use_before_setup() {
    let mut batch = CpuBatchAligner::new();
    let image = common::reference();
    assert!(matches!(batch.insert_image(&image, 0), Err(AlignError::Backend(_))));
    assert!(matches!(batch.align_to_reference(&image), Err(AlignError::Backend(_))));
}

#[test]
fn test_insert_checks_size_and_index() {
    let mut batch = CpuBatchAligner::new();
    batch.setup(2, (64, 64), geometry()).unwrap();
    let wrong = Image::zeros(32, 32, 1);
    assert!(matches!(batch.insert_image(&wrong, 0), Err(AlignError::InvalidInput(_))));
    let image = common::reference();
    assert!(matches!(batch.insert_image(&image, 2), Err(AlignError::InvalidInput(_))));
}

#[test]
fn test_empty_slot_fails_whole_batch() {
    let mut batch = CpuBatchAligner::new();
    batch.setup(2, (64, 64), geometry()).unwrap();
    let reference = common::reference();
    batch.insert_image(&reference, 0).unwrap();
    assert!(matches!(
        batch.align_to_reference(&reference),
        Err(AlignError::InvalidInput(_))
    ));
}

#[test]
fn test_batch_recovers_shift_and_mirror() {
    let reference = common::reference();
    let images = [
        reference.clone(),
        common::shifted(&reference, 3.0, -2.0),
        flip_x(&reference),
    ];

    let mut batch = CpuBatchAligner::new();
    batch.setup(images.len(), (64, 64), geometry()).unwrap();
    for (i, image) in images.iter().enumerate() {
        batch.insert_image(image, i).unwrap();
    }
    let results = batch.align_to_reference(&reference).unwrap();
    assert_eq!(results.len(), 3);

    assert_eq!((results[0].sx, results[0].sy, results[0].mirror), (0.0, 0.0, false));
    assert!(common::angle_diff(results[0].angle, 0.0) < 1.0);
    assert!(results[0].score > 0.999);

    assert_eq!((results[1].sx, results[1].sy, results[1].mirror), (3.0, -2.0, false));
    assert!(common::angle_diff(results[1].angle, 0.0) < 1.0);

    assert!(results[2].mirror);
    assert_eq!((results[2].sx, results[2].sy), (0.0, 0.0));

    // The stack persists: a second reference reuses the inserted images.
    let again = batch.align_to_reference(&images[1]).unwrap();
    assert_eq!((again[1].sx, again[1].sy), (0.0, 0.0));
}

#[test]
fn test_batch_recovers_rotation() {
    let reference = common::reference();
    let moving = common::rotated(&reference, -40.0);
    let mut batch = CpuBackend.batch_aligner().unwrap();
    batch.setup(1, (64, 64), geometry()).unwrap();
    batch.insert_image(&moving, 0).unwrap();
    let result = batch.align_to_reference(&reference).unwrap()[0];
    assert!(common::angle_diff(result.angle, 40.0) < 1.5, "{result:?}");
    assert!(!result.mirror);
}

#[test]
fn test_align_stack_applies_results() {
    let reference = common::reference();
    let images = vec![
        common::shifted(&reference, -2.0, 1.0),
        common::rotated(&reference, 20.0),
        common::shifted(&reference, 1.0, 3.0),
        flip_x(&reference),
        reference.clone(),
    ];
    let backend = create_backend(&DevicePreference::Cpu);
    let seen = std::cell::Cell::new(0);
    let aligned = align_stack(&images, &reference, geometry(), backend.as_ref(), |n| seen.set(n)).unwrap();
    assert_eq!(seen.get(), images.len());
    assert_eq!(aligned.len(), images.len());
    for (result, image) in &aligned {
        assert!(
            common::correlation(image, &reference) > 0.95,
            "poor alignment {result:?}"
        );
        assert!(image.align_transform().is_some());
    }
}

#[test]
fn test_align_stack_rejects_empty_and_mismatched() {
    let reference = common::reference();
    let backend = CpuBackend;
    assert!(align_stack(&[], &reference, geometry(), &backend, |_| {}).is_err());
    let small = vec![Image::zeros(32, 32, 1)];
    assert!(matches!(
        align_stack(&small, &reference, geometry(), &backend, |_| {}),
        Err(AlignError::DimensionMismatch { .. })
    ));
}

// ---------------------------------------------------------------------------
// GPU batch aligner (requires `gpu` feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "gpu")]
#[test]
fn gpu_batch_matches_cpu_batch() {
    let backend = create_backend(&DevicePreference::Gpu);
    if !backend.capabilities().accelerated_batch {
        return; // skip if no GPU available
    }

    let reference = common::reference();
    let images = vec![
        common::shifted(&reference, -2.0, 1.0),
        flip_x(&reference),
        common::rotated(&reference, -40.0),
    ];

    let mut gpu = backend.batch_aligner().unwrap();
    assert!(matches!(
        gpu.insert_image(&images[0], 0),
        Err(AlignError::Backend(_))
    ));
    gpu.setup(images.len(), (64, 64), geometry()).unwrap();
    assert!(matches!(
        gpu.align_to_reference(&reference),
        Err(AlignError::InvalidInput(_))
    ));
    for (i, image) in images.iter().enumerate() {
        gpu.insert_image(image, i).unwrap();
    }

    let mut cpu = CpuBatchAligner::new();
    cpu.setup(images.len(), (64, 64), geometry()).unwrap();
    for (i, image) in images.iter().enumerate() {
        cpu.insert_image(image, i).unwrap();
    }

    // Buffers stay resident: a second call reuses the uploaded rings.
    for target in [&reference, &images[0]] {
        let on_gpu = gpu.align_to_reference(target).unwrap();
        let on_cpu = cpu.align_to_reference(target).unwrap();
        for (g, c) in on_gpu.iter().zip(&on_cpu) {
            assert_eq!((g.sx, g.sy, g.mirror), (c.sx, c.sy, c.mirror), "gpu {g:?} cpu {c:?}");
            // f32 on the device may move a near-tied peak by one bin.
            assert!(common::angle_diff(g.angle, c.angle) <= 2.0 + 1e-9, "gpu {g:?} cpu {c:?}");
            assert!((g.score - c.score).abs() < 1e-2);
        }
    }
}
