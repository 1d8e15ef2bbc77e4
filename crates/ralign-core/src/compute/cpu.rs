use std::sync::Arc;

use ndarray::{Array3, ArrayView2, Axis, Zip};
use num_complex::Complex;
use num_traits::Zero;
use rustfft::{Fft, FftPlanner};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::correlation::CorrelationMap;
use crate::error::{AlignError, Result};
use crate::image::{require_same_size, Image};

use super::batch::{BatchAligner, CpuBatchAligner};
use super::ComputeBackend;

/// CPU backend using Rayon for parallelism.
pub struct CpuBackend;

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "CPU/Rayon"
    }

    fn cross_correlate(&self, moving: &Image, reference: &Image) -> Result<CorrelationMap> {
        require_same_size(moving, reference)?;
        let m = fft3d_forward(&moving.data);
        let r = fft3d_forward(&reference.data);
        let cross = Zip::from(&m)
            .and(&r)
            .map_collect(|a, b| a.conj() * *b);
        Ok(CorrelationMap::new(ifft3d_real(cross)))
    }

    fn amplitude_spectrum(&self, image: &Image) -> Result<Array3<f64>> {
        Ok(fft3d_forward(&image.data).mapv(|v| v.norm()))
    }

    fn correlate_rows(&self, a: &ArrayView2<f32>, b: &ArrayView2<f32>) -> Result<Vec<f64>> {
        correlate_rows_fft(a, b)
    }

    fn batch_aligner(&self) -> Result<Box<dyn BatchAligner>> {
        Ok(Box::new(CpuBatchAligner::new()))
    }
}

// ---------------------------------------------------------------------------
// N-D FFT helpers
// ---------------------------------------------------------------------------

/// Forward FFT over every axis of extent > 1.
pub fn fft3d_forward(data: &Array3<f32>) -> Array3<Complex<f64>> {
    let mut work = data.mapv(|v| Complex::new(v as f64, 0.0));
    let mut planner = FftPlanner::new();
    for axis in 0..3 {
        let n = work.len_of(Axis(axis));
        if n > 1 {
            let fft = planner.plan_fft_forward(n);
            transform_lanes(&mut work, Axis(axis), &fft);
        }
    }
    work
}

/// Inverse FFT over every axis, returning the real part scaled by `1/N`.
pub fn ifft3d_real(mut data: Array3<Complex<f64>>) -> Array3<f64> {
    let mut planner = FftPlanner::new();
    for axis in 0..3 {
        let n = data.len_of(Axis(axis));
        if n > 1 {
            let ifft = planner.plan_fft_inverse(n);
            transform_lanes(&mut data, Axis(axis), &ifft);
        }
    }
    let scale = 1.0 / data.len().max(1) as f64;
    data.mapv(|v| v.re * scale)
}

fn transform_lanes(data: &mut Array3<Complex<f64>>, axis: Axis, fft: &Arc<dyn Fft<f64>>) {
    let parallel = data.len() >= PARALLEL_PIXEL_THRESHOLD;
    let run = |mut lane: ndarray::ArrayViewMut1<Complex<f64>>| {
        let mut buf: Vec<Complex<f64>> = lane.iter().copied().collect();
        fft.process(&mut buf);
        for (dst, src) in lane.iter_mut().zip(buf) {
            *dst = src;
        }
    };
    if parallel {
        Zip::from(data.lanes_mut(axis)).par_for_each(run);
    } else {
        Zip::from(data.lanes_mut(axis)).for_each(run);
    }
}

// ---------------------------------------------------------------------------
// Row correlation
// ---------------------------------------------------------------------------

/// Summed circular row correlation via one inverse FFT of `Σ conj(A)·B`.
pub fn correlate_rows_fft(a: &ArrayView2<f32>, b: &ArrayView2<f32>) -> Result<Vec<f64>> {
    if a.dim() != b.dim() {
        return Err(AlignError::InvalidInput(format!(
            "row correlation needs equal shapes, got {:?} and {:?}",
            a.dim(),
            b.dim()
        )));
    }
    let (rows, len) = a.dim();
    if len == 0 {
        return Ok(Vec::new());
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(len);
    let ifft = planner.plan_fft_inverse(len);

    let mut acc = vec![Complex::<f64>::zero(); len];
    let mut ra = vec![Complex::<f64>::zero(); len];
    let mut rb = vec![Complex::<f64>::zero(); len];
    for i in 0..rows {
        for j in 0..len {
            ra[j] = Complex::new(a[[i, j]] as f64, 0.0);
            rb[j] = Complex::new(b[[i, j]] as f64, 0.0);
        }
        fft.process(&mut ra);
        fft.process(&mut rb);
        for ((dst, x), y) in acc.iter_mut().zip(&ra).zip(&rb) {
            *dst += x.conj() * *y;
        }
    }
    ifft.process(&mut acc);

    let scale = 1.0 / len as f64;
    Ok(acc.into_iter().map(|v| v.re * scale).collect())
}
