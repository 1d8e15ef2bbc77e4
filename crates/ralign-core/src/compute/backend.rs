use std::sync::Arc;

use ndarray::{Array3, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationMap;
use crate::error::Result;
use crate::image::Image;
use crate::ops;
use crate::transform::Transform;

use super::batch::BatchAligner;
use super::cpu::CpuBackend;

/// What a backend can accelerate beyond the baseline operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Ring correlations for a persistent image stack run on the device.
    pub accelerated_batch: bool,
}

/// Numeric primitives the aligners are written against.
///
/// Every method is a pure function of its inputs; implementations hold no
/// per-call state and can be shared across threads.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Circulant cross-correlation `c[k] = Σₓ m(x)·r(x+k)`.
    fn cross_correlate(&self, moving: &Image, reference: &Image) -> Result<CorrelationMap>;

    /// Amplitude `|F|` of the unshifted Fourier transform, shaped like the image.
    fn amplitude_spectrum(&self, image: &Image) -> Result<Array3<f64>>;

    /// Circular correlation along rows, summed over rows:
    /// `c[k] = Σᵢ Σⱼ a[i, j]·b[i, (j+k) mod L]`.
    fn correlate_rows(&self, a: &ArrayView2<f32>, b: &ArrayView2<f32>) -> Result<Vec<f64>>;

    fn find_peak_wrapped(&self, map: &CorrelationMap, maxshift: [usize; 3]) -> [i64; 3] {
        map.peak_wrapped(maxshift)
    }

    fn apply_transform(&self, image: &Image, transform: &Transform) -> Image {
        ops::apply_transform(image, transform)
    }

    /// A fresh persistent stack aligner bound to this backend.
    fn batch_aligner(&self) -> Result<Box<dyn BatchAligner>>;
}

/// Device preference for backend selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevicePreference {
    /// Use the GPU when one is available, otherwise the CPU.
    #[default]
    Auto,
    Cpu,
    Gpu,
}

/// Build a backend for `pref`. A GPU request without a usable device falls
/// back to the CPU with a warning.
pub fn create_backend(pref: &DevicePreference) -> Arc<dyn ComputeBackend> {
    match pref {
        DevicePreference::Cpu => Arc::new(CpuBackend),
        DevicePreference::Auto | DevicePreference::Gpu => gpu_or_cpu(*pref),
    }
}

#[cfg(feature = "gpu")]
fn gpu_or_cpu(pref: DevicePreference) -> Arc<dyn ComputeBackend> {
    match super::wgpu_backend::WgpuBackend::new() {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            if pref == DevicePreference::Gpu {
                tracing::warn!("GPU requested but unavailable ({e}), using CPU");
            } else {
                tracing::debug!("no GPU backend ({e}), using CPU");
            }
            Arc::new(CpuBackend)
        }
    }
}

#[cfg(not(feature = "gpu"))]
fn gpu_or_cpu(pref: DevicePreference) -> Arc<dyn ComputeBackend> {
    if pref == DevicePreference::Gpu {
        tracing::warn!("built without the `gpu` feature, using CPU");
    }
    Arc::new(CpuBackend)
}
