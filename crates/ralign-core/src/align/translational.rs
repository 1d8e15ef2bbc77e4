use tracing::debug;

use crate::compare::Comparator;
use crate::compute::ComputeBackend;
use crate::consts::MAXSHIFT_DIVISOR;
use crate::correlation::resolve_maxshift;
use crate::error::Result;
use crate::image::{require_same_size, Image};
use crate::transform::Transform;

use super::config::TranslationalConfig;
use super::{Aligned, Aligner};

/// Integer translation from the cross-correlation peak.
///
/// Without a reference the image is correlated with itself and the peak
/// offset is halved, which centers a symmetric object when `nozero` hides
/// the trivial zero-shift peak.
#[derive(Clone, Debug, Default)]
pub struct TranslationalAligner {
    pub config: TranslationalConfig,
}

impl TranslationalAligner {
    pub fn new(config: TranslationalConfig) -> Self {
        Self { config }
    }

    /// Per-axis search bounds `[x, y, z]` for an image of `dims`.
    pub fn maxshift(&self, dims: [usize; 3]) -> [usize; 3] {
        dims.map(|n| resolve_maxshift(self.config.maxshift, n, MAXSHIFT_DIVISOR))
    }

    pub fn estimate(
        &self,
        moving: &Image,
        reference: Option<&Image>,
        backend: &dyn ComputeBackend,
    ) -> Result<Transform> {
        if let Some(r) = reference {
            require_same_size(moving, r)?;
        }
        let mut ccf = backend.cross_correlate(moving, reference.unwrap_or(moving))?;
        if self.config.nozero {
            ccf.zero_origin_neighborhood();
        }

        let bounds = self.maxshift(moving.dims());
        let peak = backend.find_peak_wrapped(&ccf, bounds);
        let mut shift = peak.map(|v| v as f64);
        if reference.is_none() {
            shift = shift.map(|v| v / 2.0);
            if self.config.intonly {
                shift = shift.map(|v| (v + 0.5).floor());
            }
        }
        debug!(?peak, ?bounds, ?shift, "translational peak");

        Ok(if moving.is_volume() {
            Transform::translation_3d(shift)
        } else {
            Transform::planar(0.0, shift[0], shift[1], false)
        })
    }

    pub fn run(
        &self,
        moving: &Image,
        reference: Option<&Image>,
        backend: &dyn ComputeBackend,
    ) -> Result<Aligned> {
        let t = self.estimate(moving, reference, backend)?;
        Ok(Aligned::apply(moving, t, backend))
    }
}

impl Aligner for TranslationalAligner {
    fn name(&self) -> &str {
        "translational"
    }

    fn align(
        &self,
        moving: &Image,
        reference: Option<&Image>,
        _comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Image> {
        Ok(self.run(moving, reference, backend)?.into_image())
    }
}
