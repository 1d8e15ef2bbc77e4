//! Mirror-aware composites.
//!
//! The inner strategy runs once against the reference and once against the
//! mirrored reference. When the mirrored branch wins, its transform is
//! re-expressed with the mirror folded in and its image is flipped back, so
//! results are always reported in the reference's own frame.

use std::sync::Arc;

use tracing::debug;

use crate::compare::Comparator;
use crate::compute::ComputeBackend;
use crate::error::Result;
use crate::image::{require_same_size, Image};
use crate::ops::flip_x;

use super::config::{FlipReference, RotateFlipConfig, RotateTranslateFlipConfig, RotationalConfig};
use super::rotate_translate::RotateTranslateAligner;
use super::rotational::RotationalAligner;
use super::select::{keep_better, Branch, Scored};
use super::{require_reference, Aligned, Aligner};

/// The supplied mirrored reference, or a freshly computed one.
pub(crate) fn mirrored_reference(flip: &FlipReference, reference: &Image) -> Result<Arc<Image>> {
    match flip {
        Some(f) => {
            require_same_size(reference, f)?;
            Ok(Arc::clone(f))
        }
        None => Ok(Arc::new(flip_x(reference))),
    }
}

/// Fold a mirrored-branch result back into the reference frame.
pub(crate) fn unmirror(aligned: Aligned) -> Aligned {
    Aligned {
        image: flip_x(&aligned.image),
        transform: aligned.transform.mirrored(),
    }
}

fn resolve(straight: Scored<Aligned>, mirrored: Scored<Aligned>, strategy: &str) -> Scored<Aligned> {
    let (branch, best) = keep_better(straight, mirrored);
    debug!(strategy, mirrored = branch == Branch::Second, score = best.score, "flip branch");
    match branch {
        Branch::First => best,
        Branch::Second => Scored::new(unmirror(best.value), best.score),
    }
}

/// Rotational alignment against the reference and its mirror image.
#[derive(Clone, Debug, Default)]
pub struct RotateFlipAligner {
    pub config: RotateFlipConfig,
}

impl RotateFlipAligner {
    pub fn new(config: RotateFlipConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        moving: &Image,
        reference: &Image,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Scored<Aligned>> {
        let flipped = mirrored_reference(&self.config.flip, reference)?;
        let inner = RotationalAligner::new(RotationalConfig {
            rfp_mode: self.config.rfp_mode,
        });
        let straight = inner.run(moving, reference, comparator, backend)?;
        let mirrored = inner.run(moving, &flipped, comparator, backend)?;
        Ok(resolve(straight, mirrored, "rotate_flip"))
    }
}

impl Aligner for RotateFlipAligner {
    fn name(&self) -> &str {
        "rotate_flip"
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

/// Rotation plus translation against the reference and its mirror image.
#[derive(Clone, Debug, Default)]
pub struct RotateTranslateFlipAligner {
    pub config: RotateTranslateFlipConfig,
}

impl RotateTranslateFlipAligner {
    pub fn new(config: RotateTranslateFlipConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        moving: &Image,
        reference: &Image,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Scored<Aligned>> {
        let flipped = mirrored_reference(&self.config.flip, reference)?;
        let inner = RotateTranslateAligner::new(self.config.rotate_translate());
        let straight = inner.run(moving, reference, comparator, backend)?;
        let mirrored = inner.run(moving, &flipped, comparator, backend)?;
        Ok(resolve(straight, mirrored, "rotate_translate_flip"))
    }
}

impl Aligner for RotateTranslateFlipAligner {
    fn name(&self) -> &str {
        "rotate_translate_flip"
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
