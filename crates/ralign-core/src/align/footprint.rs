//! Translation-invariant rotational footprints.
//!
//! A footprint is a centrosymmetric function of the image that rotates with
//! it but ignores translation. Unwrapped over `[0°, 180°)`, two footprints
//! differ by a circular column shift equal to the rotation between images.

use ndarray::{s, Array2, Array3, ArrayView2};

use crate::compute::ComputeBackend;
use crate::consts::{UNWRAP_EDGE_MARGIN, UNWRAP_INNER_RADIUS};
use crate::correlation::smooth_fft_size;
use crate::error::{AlignError, Result};
use crate::image::{require_2d, Image};
use crate::ops::{subtract_row_means, unwrap, Span};

use super::config::FootprintMode;

/// Ring layout shared by both footprints of a comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingLayout {
    pub inner: usize,
    pub outer: usize,
    /// Angular samples over the unwrap span.
    pub length: usize,
}

impl RingLayout {
    /// Rings `4 .. min(nx, ny)/2 − 2`, `length` = smooth size ≥ ⌈π·outer⌉.
    pub fn for_footprint(nx: usize, ny: usize) -> Result<Self> {
        let outer = (nx.min(ny) / 2).saturating_sub(UNWRAP_EDGE_MARGIN);
        if outer <= UNWRAP_INNER_RADIUS {
            return Err(AlignError::InvalidInput(format!(
                "{nx}x{ny} is too small for a rotational footprint"
            )));
        }
        let length = smooth_fft_size((std::f64::consts::PI * outer as f64).ceil() as usize);
        Ok(Self {
            inner: UNWRAP_INNER_RADIUS,
            outer,
            length,
        })
    }

    pub fn rings(&self) -> usize {
        self.outer - self.inner
    }
}

/// Polar-unwrapped footprint of a 2-D image, `rings × length`, over `[0°, 180°)`.
pub fn footprint(
    image: &Image,
    mode: FootprintMode,
    layout: &RingLayout,
    backend: &dyn ComputeBackend,
) -> Result<Array2<f32>> {
    require_2d(image, "rotational footprint")?;
    let centered = match mode {
        FootprintMode::Autocorrelation | FootprintMode::RawAutocorrelation => {
            padded_autocorrelation(image, backend)?
        }
        FootprintMode::Amplitude => {
            let amp = backend.amplitude_spectrum(image)?;
            fftshift_plane(&amp.slice(s![0, .., ..]))
        }
    };

    let mut rings = unwrap(
        &centered.view(),
        layout.inner,
        layout.outer,
        layout.length,
        0.0,
        0.0,
        Span::Half,
    );
    if mode != FootprintMode::RawAutocorrelation {
        subtract_row_means(&mut rings);
    }
    Ok(rings)
}

/// Autocorrelation of the image zero-padded to twice its size, with zero lag
/// moved to the center of the padded grid.
fn padded_autocorrelation(image: &Image, backend: &dyn ComputeBackend) -> Result<Array2<f32>> {
    let (nx, ny) = (image.nx(), image.ny());
    let mut padded = Array3::<f32>::zeros((1, 2 * ny, 2 * nx));
    padded
        .slice_mut(s![0, ..ny, ..nx])
        .assign(&image.plane());
    let padded = Image::new(padded);
    let ccf = backend.cross_correlate(&padded, &padded)?;
    Ok(fftshift_plane(&ccf.data.slice(s![0, .., ..])))
}

/// Move index 0 to `n / 2` on both axes.
fn fftshift_plane(data: &ArrayView2<f64>) -> Array2<f32> {
    let (h, w) = data.dim();
    let mut out = Array2::<f32>::zeros((h, w));
    for r in 0..h {
        for c in 0..w {
            out[[(r + h / 2) % h, (c + w / 2) % w]] = data[[r, c]] as f32;
        }
    }
    out
}
