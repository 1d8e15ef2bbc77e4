use tracing::debug;

use crate::compare::{create_comparator, ComparatorConfig};
use crate::compute::ComputeBackend;
use crate::error::Result;
use crate::image::Image;

use super::config::{AlignerConfig, AlignerKind, ParamBag, ParamInfo};
use super::exhaustive::ExhaustiveAligner;
use super::flip::{RotateFlipAligner, RotateTranslateFlipAligner};
use super::refine::RefineAligner;
use super::rotate_translate::RotateTranslateAligner;
use super::rotational::{PrecenterAligner, RotationalAligner};
use super::slow_exhaustive::SlowExhaustiveAligner;
use super::translational::TranslationalAligner;
use super::Aligner;

/// Listing entry for one strategy.
#[derive(Clone, Copy, Debug)]
pub struct AlignerInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamInfo],
}

pub fn list_aligners() -> Vec<AlignerInfo> {
    AlignerKind::ALL
        .iter()
        .map(|k| AlignerInfo {
            name: k.name(),
            description: k.description(),
            params: k.params(),
        })
        .collect()
}

/// Instantiate the strategy described by `config`.
pub fn create_aligner(config: AlignerConfig) -> Box<dyn Aligner> {
    match config {
        AlignerConfig::Translational(c) => Box::new(TranslationalAligner::new(c)),
        AlignerConfig::Rotational(c) => Box::new(RotationalAligner::new(c)),
        AlignerConfig::RotatePrecenter(c) => Box::new(PrecenterAligner::new(c)),
        AlignerConfig::RotateTranslate(c) => Box::new(RotateTranslateAligner::new(c)),
        AlignerConfig::RotateFlip(c) => Box::new(RotateFlipAligner::new(c)),
        AlignerConfig::RotateTranslateFlip(c) => Box::new(RotateTranslateFlipAligner::new(c)),
        AlignerConfig::RtfExhaustive(c) => Box::new(ExhaustiveAligner::new(c)),
        AlignerConfig::RtfSlowExhaustive(c) => Box::new(SlowExhaustiveAligner::new(c)),
        AlignerConfig::Refine(c) => Box::new(RefineAligner::new(c)),
    }
}

/// Resolve a strategy and a comparator by name and run one alignment.
pub fn align_with(
    name: &str,
    params: &ParamBag,
    moving: &Image,
    reference: Option<&Image>,
    comparator_name: &str,
    comparator_config: &ComparatorConfig,
    backend: &dyn ComputeBackend,
) -> Result<Image> {
    let kind: AlignerKind = name.parse()?;
    let config = AlignerConfig::from_params(kind, params)?;
    let comparator = create_comparator(comparator_name, comparator_config)?;
    debug!(aligner = name, comparator = comparator_name, backend = backend.name(), "align");
    create_aligner(config).align(moving, reference, comparator.as_ref(), backend)
}
