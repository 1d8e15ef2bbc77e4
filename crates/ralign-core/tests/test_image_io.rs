use ndarray::{Array2, Array3};

use ralign_core::error::AlignError;
use ralign_core::image::Image;
use ralign_core::io::{load_image, save_image, save_png, save_tiff};
use ralign_core::stack::mean_stack;

#[test]
fn test_save_load_roundtrip_tiff() {
    let mut data = Array2::<f32>::zeros((4, 4));
    data[[0, 1]] = 0.5;
    data[[1, 0]] = 1.0;
    data[[2, 3]] = 0.25;
    let image = Image::from_2d(data);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.tiff");

    save_tiff(&image, &path).unwrap();
    let loaded = load_image(&path).unwrap();

    assert_eq!(loaded.dims(), [4, 4, 1]);
    assert!((loaded.get(0, 0, 0) - 0.0).abs() < 1e-4);
    assert!((loaded.get(1, 0, 0) - 0.5).abs() < 1e-3);
    assert!((loaded.get(0, 1, 0) - 1.0).abs() < 1e-4);
    assert!((loaded.get(3, 2, 0) - 0.25).abs() < 1e-3);
}

#[test]
fn test_save_png_by_extension() {
    let image = Image::from_2d(Array2::<f32>::from_elem((8, 8), 0.5));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.png");

    save_image(&image, &path).unwrap();
    assert!(path.exists());
    let loaded = load_image(&path).unwrap();
    assert!((loaded.get(4, 4, 0) - 0.5).abs() < 0.01);
}

#[test]
fn test_volumes_cannot_be_saved() {
    let volume = Image::new(Array3::zeros((2, 4, 4)));
    let dir = tempfile::tempdir().unwrap();
    let err = save_png(&volume, &dir.path().join("v.png")).unwrap_err();
    assert!(matches!(err, AlignError::InvalidInput(_)));
}

#[test]
fn test_load_missing_file() {
    assert!(load_image(std::path::Path::new("/nonexistent/image.tif")).is_err());
}

#[test]
fn test_mean_stack() {
    let a = Image::from_2d(Array2::from_elem((2, 2), 1.0));
    let b = Image::from_2d(Array2::from_elem((2, 2), 3.0));
    let mean = mean_stack(&[a.clone(), b]).unwrap();
    assert_eq!(mean.get(1, 1, 0), 2.0);

    assert!(mean_stack(&[]).is_err());
    let small = Image::zeros(1, 1, 1);
    assert!(matches!(
        mean_stack(&[a, small]),
        Err(AlignError::DimensionMismatch { .. })
    ));
}
