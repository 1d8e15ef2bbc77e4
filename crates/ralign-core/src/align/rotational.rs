use tracing::debug;

use crate::compare::Comparator;
use crate::compute::ComputeBackend;
use crate::consts::{
    PRECENTER_ANGULAR_OVERSAMPLE, PRECENTER_OUTER_RADIUS_FRACTION, UNWRAP_INNER_RADIUS,
};
use crate::correlation::{argmax, smooth_fft_size};
use crate::error::{AlignError, Result};
use crate::image::{require_2d, Image};
use crate::ops::{unwrap, Span};
use crate::transform::Transform;

use super::config::{FootprintMode, PrecenterConfig, RotationalConfig};
use super::footprint::{footprint, RingLayout};
use super::select::{keep_better, Scored};
use super::{require_reference, Aligned, Aligner};

/// Rotation from footprint correlation, resolved between the estimate and
/// its 180° complement by the comparator.
#[derive(Clone, Debug, Default)]
pub struct RotationalAligner {
    pub config: RotationalConfig,
}

impl RotationalAligner {
    pub fn new(config: RotationalConfig) -> Self {
        Self { config }
    }

    pub fn with_mode(rfp_mode: FootprintMode) -> Self {
        Self::new(RotationalConfig { rfp_mode })
    }

    /// Footprint angle in degrees, in `[0, 180)`.
    pub fn estimate_angle(
        &self,
        moving: &Image,
        reference: &Image,
        backend: &dyn ComputeBackend,
    ) -> Result<f64> {
        require_2d(moving, "rotational alignment")?;
        let layout = RingLayout::for_footprint(moving.nx(), moving.ny())?;
        let fm = footprint(moving, self.config.rfp_mode, &layout, backend)?;
        let fr = footprint(reference, self.config.rfp_mode, &layout, backend)?;
        let ccf = backend.correlate_rows(&fm.view(), &fr.view())?;
        let k = argmax(&ccf);
        Ok(k as f64 * Span::Half.degrees() / layout.length as f64)
    }

    /// Both 180° branches, scored; the lower score wins and ties keep the
    /// estimate itself.
    pub fn run(
        &self,
        moving: &Image,
        reference: &Image,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Scored<Aligned>> {
        let angle = self.estimate_angle(moving, reference, backend)?;
        let scored = |alpha: f64| -> Result<Scored<Aligned>> {
            let aligned = Aligned::apply(moving, Transform::rotation_2d(alpha), backend);
            let score = comparator.score(&aligned.image, reference)?;
            Ok(Scored::new(aligned, score))
        };
        let (branch, best) = keep_better(scored(angle)?, scored(angle - 180.0)?);
        debug!(angle, ?branch, score = best.score, "rotational branch");
        Ok(best)
    }
}

impl Aligner for RotationalAligner {
    fn name(&self) -> &str {
        "rotational"
    }

    fn align(
        &self,
        moving: &Image,
        reference: Option<&Image>,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Image> {
        let reference = require_reference(reference, moving, self.name())?;
        Ok(self.run(moving, reference, comparator, backend)?.value.into_image())
    }
}

/// Rotation between images that already share a center: their 360° polar
/// unwraps are correlated directly.
#[derive(Clone, Debug, Default)]
pub struct PrecenterAligner {
    pub config: PrecenterConfig,
}

impl PrecenterAligner {
    pub fn new(config: PrecenterConfig) -> Self {
        Self { config }
    }

    pub fn estimate_angle(
        &self,
        moving: &Image,
        reference: &Image,
        backend: &dyn ComputeBackend,
    ) -> Result<f64> {
        require_2d(moving, "rotate_precenter")?;
        let ny = moving.ny();
        let outer = (ny as f64 * PRECENTER_OUTER_RADIUS_FRACTION) as usize;
        if outer <= UNWRAP_INNER_RADIUS {
            return Err(AlignError::InvalidInput(format!(
                "ny={ny} is too small for rotate_precenter"
            )));
        }
        let length = smooth_fft_size(
            (PRECENTER_ANGULAR_OVERSAMPLE * std::f64::consts::PI * ny as f64).ceil() as usize,
        );
        let rings = |img: &Image| {
            unwrap(&img.plane(), UNWRAP_INNER_RADIUS, outer, length, 0.0, 0.0, Span::Full)
        };
        let ccf = backend.correlate_rows(&rings(moving).view(), &rings(reference).view())?;
        let k = argmax(&ccf);
        Ok(k as f64 * Span::Full.degrees() / length as f64)
    }
}

impl Aligner for PrecenterAligner {
    fn name(&self) -> &str {
        "rotate_precenter"
    }

    fn align(
        &self,
        moving: &Image,
        reference: Option<&Image>,
        _comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Image> {
        let reference = require_reference(reference, moving, self.name())?;
        let angle = self.estimate_angle(moving, reference, backend)?;
        debug!(angle, "precentered rotation");
        Ok(Aligned::apply(moving, Transform::rotation_2d(angle), backend).into_image())
    }
}
