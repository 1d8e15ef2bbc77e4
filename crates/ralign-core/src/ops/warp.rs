use ndarray::{Array3, ArrayView2, ArrayView3, Axis, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::image::Image;
use crate::transform::Transform;

/// Bilinear sample at fractional `(y, x)`; samples outside the grid read as zero.
pub fn bilinear_sample(data: &ArrayView2<f32>, y: f64, x: f64) -> f32 {
    let (h, w) = data.dim();

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let sample = |r: i64, c: i64| -> f32 {
        if r >= 0 && r < h as i64 && c >= 0 && c < w as i64 {
            data[[r as usize, c as usize]]
        } else {
            0.0
        }
    };

    let v00 = sample(y0, x0);
    let v10 = sample(y0, x1);
    let v01 = sample(y1, x0);
    let v11 = sample(y1, x1);

    v00 * (1.0 - fx) * (1.0 - fy) + v10 * fx * (1.0 - fy) + v01 * (1.0 - fx) * fy + v11 * fx * fy
}

/// Trilinear sample at fractional `(z, y, x)` with zero fill.
pub fn trilinear_sample(data: &ArrayView3<f32>, z: f64, y: f64, x: f64) -> f32 {
    let nz = data.len_of(Axis(0)) as i64;
    let z0 = z.floor() as i64;
    let fz = (z - z0 as f64) as f32;

    let plane = |zi: i64| -> f32 {
        if zi >= 0 && zi < nz {
            bilinear_sample(&data.index_axis(Axis(0), zi as usize), y, x)
        } else {
            0.0
        }
    };

    let lo = plane(z0);
    if fz == 0.0 {
        return lo;
    }
    lo * (1.0 - fz) + plane(z0 + 1) * fz
}

/// Resample `image` through `transform`: `out(p') = in(T⁻¹ p')` about the
/// image center. The result carries a copy of the input metadata.
pub fn apply_transform(image: &Image, transform: &Transform) -> Image {
    let (nz, ny, nx) = image.data.dim();
    let center = [(nx / 2) as f64, (ny / 2) as f64, (nz / 2) as f64];
    let src = image.data.view();
    let volume = nz > 1;

    let sample_at = |z: usize, y: usize, x: usize| -> f32 {
        let p = [
            x as f64 - center[0],
            y as f64 - center[1],
            z as f64 - center[2],
        ];
        let q = transform.invert_point(p);
        let (sx, sy) = (q[0] + center[0], q[1] + center[1]);
        if volume {
            trilinear_sample(&src, q[2] + center[2], sy, sx)
        } else {
            bilinear_sample(&src.index_axis(Axis(0), 0), sy, sx)
        }
    };

    let mut out = Array3::<f32>::zeros((nz, ny, nx));
    if nx * ny * nz >= PARALLEL_PIXEL_THRESHOLD {
        Zip::indexed(&mut out).par_for_each(|(z, y, x), v| *v = sample_at(z, y, x));
    } else {
        Zip::indexed(&mut out).for_each(|(z, y, x), v| *v = sample_at(z, y, x));
    }
    image.with_data(out)
}

/// Mirror about the vertical axis through the image center:
/// `x' = (2·cx − x) mod nx`.
pub fn flip_x(image: &Image) -> Image {
    let (nz, ny, nx) = image.data.dim();
    let cx = nx / 2;
    let out = Array3::from_shape_fn((nz, ny, nx), |(z, y, x)| {
        image.data[[z, y, reflect(x, cx, nx)]]
    });
    image.with_data(out)
}

/// In-plane rotation by exactly 180° about the center, without resampling.
pub fn rotate_180(image: &Image) -> Image {
    let (nz, ny, nx) = image.data.dim();
    let (cx, cy) = (nx / 2, ny / 2);
    let out = Array3::from_shape_fn((nz, ny, nx), |(z, y, x)| {
        image.data[[z, reflect(y, cy, ny), reflect(x, cx, nx)]]
    });
    image.with_data(out)
}

fn reflect(i: usize, c: usize, n: usize) -> usize {
    (2 * c + n - i) % n
}
