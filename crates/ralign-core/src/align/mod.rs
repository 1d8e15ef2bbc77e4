//! Alignment strategies.
//!
//! Every strategy takes a moving image, an optional reference, a comparator
//! and a compute backend, and returns a transformed copy of the moving image
//! carrying the winning transform under `xform.align2d` (or `xform.align3d`
//! for volumes).

pub mod config;
pub mod exhaustive;
pub mod flip;
pub mod footprint;
pub mod refine;
mod registry;
pub mod rotate_translate;
pub mod rotational;
pub mod select;
pub mod slow_exhaustive;
pub mod translational;

use std::sync::Arc;

use crate::compare::Comparator;
use crate::compute::ComputeBackend;
use crate::consts::{XFORM_ALIGN_2D, XFORM_ALIGN_3D};
use crate::error::{AlignError, Result};
use crate::image::{require_same_size, Image};
use crate::transform::{Transform, TransformKind};

pub use config::{AlignerConfig, AlignerKind, FootprintMode, ParamBag, ParamInfo};
pub use exhaustive::ExhaustiveAligner;
pub use flip::{RotateFlipAligner, RotateTranslateFlipAligner};
pub use refine::RefineAligner;
pub use registry::{align_with, create_aligner, list_aligners, AlignerInfo};
pub use rotate_translate::RotateTranslateAligner;
pub use rotational::{PrecenterAligner, RotationalAligner};
pub use select::{keep_better, Branch, Scored};
pub use slow_exhaustive::SlowExhaustiveAligner;
pub use translational::TranslationalAligner;

pub trait Aligner: Send + Sync {
    fn name(&self) -> &str;

    fn align(
        &self,
        moving: &Image,
        reference: Option<&Image>,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Image>;
}

/// A transformed moving image together with the transform that produced it.
#[derive(Clone, Debug)]
pub struct Aligned {
    pub image: Image,
    pub transform: Transform,
}

impl Aligned {
    /// Resample `moving` through `transform`.
    pub fn apply(moving: &Image, transform: Transform, backend: &dyn ComputeBackend) -> Self {
        Self {
            image: backend.apply_transform(moving, &transform),
            transform,
        }
    }

    /// Attach the transform to the image and hand back both.
    pub fn finish(self) -> (Image, Arc<Transform>) {
        let mut image = self.image;
        let key = match self.transform.kind() {
            TransformKind::TwoD => XFORM_ALIGN_2D,
            TransformKind::ThreeD => XFORM_ALIGN_3D,
        };
        let transform = Arc::new(self.transform);
        image.set_transform(key, Arc::clone(&transform));
        (image, transform)
    }

    pub fn into_image(self) -> Image {
        self.finish().0
    }
}

/// Fail with `InvalidInput` when `reference` is absent; check sizes otherwise.
pub(crate) fn require_reference<'a>(
    reference: Option<&'a Image>,
    moving: &Image,
    strategy: &str,
) -> Result<&'a Image> {
    let reference = reference
        .ok_or_else(|| AlignError::InvalidInput(format!("{strategy} requires a reference image")))?;
    require_same_size(moving, reference)?;
    Ok(reference)
}
