use ndarray::{Array2, Array3};

use ralign_core::compare::{Ccc, Comparator};
use ralign_core::image::Image;
use ralign_core::ops::apply_transform;
use ralign_core::transform::Transform;

pub const SIZE: usize = 64;

/// `(dx, dy, sigma, amplitude)` of each blob relative to the image center.
/// No symmetry: every rotation, shift and mirror of the pattern differs.
const BLOBS: [(f64, f64, f64, f64); 5] = [
    (-10.0, -6.0, 3.0, 1.0),
    (7.0, -9.0, 2.5, 0.8),
    (4.0, 8.0, 4.0, 0.6),
    (-5.0, 11.0, 2.0, 0.9),
    (12.0, 4.0, 2.0, 0.5),
];

/// Gaussian blobs on a black `nx` x `ny` plane, all within radius ~14 of the center.
pub fn blobs(nx: usize, ny: usize) -> Image {
    let (cx, cy) = ((nx / 2) as f64, (ny / 2) as f64);
    let data = Array2::from_shape_fn((ny, nx), |(y, x)| {
        BLOBS
            .iter()
            .map(|&(bx, by, sigma, amp)| {
                let dx = x as f64 - (cx + bx);
                let dy = y as f64 - (cy + by);
                amp * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
            })
            .sum::<f64>() as f32
    });
    Image::from_2d(data)
}

pub fn reference() -> Image {
    blobs(SIZE, SIZE)
}

/// A `n`³ volume holding a single bright voxel at `(x, y, z)`.
pub fn point_volume(n: usize, x: usize, y: usize, z: usize) -> Image {
    let mut data = Array3::<f32>::zeros((n, n, n));
    data[[z, y, x]] = 1.0;
    Image::new(data)
}

/// A plane with single bright pixels at each `(x, y)`.
pub fn points(nx: usize, ny: usize, at: &[(usize, usize)]) -> Image {
    let mut data = Array2::<f32>::zeros((ny, nx));
    for &(x, y) in at {
        data[[y, x]] = 1.0;
    }
    Image::from_2d(data)
}

pub fn shifted(image: &Image, dx: f64, dy: f64) -> Image {
    apply_transform(image, &Transform::planar(0.0, dx, dy, false))
}

pub fn rotated(image: &Image, alpha: f64) -> Image {
    apply_transform(image, &Transform::rotation_2d(alpha))
}

/// Pearson correlation (higher is better).
pub fn correlation(a: &Image, b: &Image) -> f64 {
    -Ccc.score(a, b).unwrap()
}

/// Distance between two angles in degrees, in `[0, 180]`.
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}
