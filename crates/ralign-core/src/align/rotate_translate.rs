use tracing::debug;

use crate::compare::Comparator;
use crate::compute::ComputeBackend;
use crate::error::Result;
use crate::image::Image;
use crate::transform::Transform;

use super::config::{RotateTranslateConfig, RotationalConfig};
use super::rotational::RotationalAligner;
use super::select::{keep_better, Scored};
use super::translational::TranslationalAligner;
use super::{require_reference, Aligned, Aligner};

/// Footprint rotation followed by a translational search, run separately on
/// the estimate and on its 180° complement.
#[derive(Clone, Debug, Default)]
pub struct RotateTranslateAligner {
    pub config: RotateTranslateConfig,
}

impl RotateTranslateAligner {
    pub fn new(config: RotateTranslateConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        moving: &Image,
        reference: &Image,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Scored<Aligned>> {
        let rotational = RotationalAligner::new(RotationalConfig {
            rfp_mode: self.config.rfp_mode,
        });
        let translational = TranslationalAligner::new(self.config.translational());
        let angle = rotational.estimate_angle(moving, reference, backend)?;

        let evaluate = |alpha: f64| -> Result<Scored<Aligned>> {
            let rotated = backend.apply_transform(moving, &Transform::rotation_2d(alpha));
            let shift = translational.estimate(&rotated, Some(reference), backend)?;
            let [tx, ty, _] = shift.translation();
            let aligned = Aligned::apply(moving, Transform::planar(alpha, tx, ty, false), backend);
            let score = comparator.score(&aligned.image, reference)?;
            Ok(Scored::new(aligned, score))
        };

        let (branch, best) = keep_better(evaluate(angle)?, evaluate(angle - 180.0)?);
        debug!(angle, ?branch, transform = %best.value.transform, "rotate_translate branch");
        Ok(best)
    }
}

impl Aligner for RotateTranslateAligner {
    fn name(&self) -> &str {
        "rotate_translate"
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
