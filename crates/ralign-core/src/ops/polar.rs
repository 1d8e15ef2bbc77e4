//! Polar resampling of a plane into `(radius, angle)` rows.

use std::f64::consts::PI;

use ndarray::{Array2, ArrayView2};

use super::warp::bilinear_sample;

/// Angular span of an unwrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Span {
    /// `[0°, 180°)`, for centrosymmetric inputs.
    Half,
    /// `[0°, 360°)`.
    Full,
}

impl Span {
    pub fn degrees(self) -> f64 {
        match self {
            Self::Half => 180.0,
            Self::Full => 360.0,
        }
    }

    fn radians(self) -> f64 {
        match self {
            Self::Half => PI,
            Self::Full => 2.0 * PI,
        }
    }
}

/// Unwrap `data` into a `(r2 − r1) × samples` grid. Row `i` holds radius
/// `r1 + i`; column `j` holds angle `j · span / samples`. The polar origin is
/// the plane center shifted by `(dx, dy)`.
pub fn unwrap(
    data: &ArrayView2<f32>,
    r1: usize,
    r2: usize,
    samples: usize,
    dx: f64,
    dy: f64,
    span: Span,
) -> Array2<f32> {
    let (ny, nx) = data.dim();
    let cx = (nx / 2) as f64 + dx;
    let cy = (ny / 2) as f64 + dy;
    let rows = r2.saturating_sub(r1);
    let step = span.radians() / samples.max(1) as f64;

    let trig: Vec<(f64, f64)> = (0..samples).map(|j| (j as f64 * step).sin_cos()).collect();
    Array2::from_shape_fn((rows, samples), |(i, j)| {
        let rho = (r1 + i) as f64;
        let (s, c) = trig[j];
        bilinear_sample(data, cy + rho * s, cx + rho * c)
    })
}

/// Circularly shift every row right by `k` columns:
/// `out[:, (j + k) mod L] = a[:, j]`.
pub fn rotate_columns(a: &ArrayView2<f32>, k: i64) -> Array2<f32> {
    let (rows, len) = a.dim();
    if len == 0 {
        return a.to_owned();
    }
    let k = k.rem_euclid(len as i64) as usize;
    let mut out = Array2::<f32>::zeros((rows, len));
    for i in 0..rows {
        for j in 0..len {
            out[[i, (j + k) % len]] = a[[i, j]];
        }
    }
    out
}

/// Subtract each row's mean.
pub fn subtract_row_means(a: &mut Array2<f32>) {
    for mut row in a.rows_mut() {
        let n = row.len();
        if n == 0 {
            continue;
        }
        let mean = row.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
        row.mapv_inplace(|v| v - mean as f32);
    }
}
