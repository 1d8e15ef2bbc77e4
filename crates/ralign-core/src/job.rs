//! File-driven alignment jobs.
//!
//! A job names one reference, any number of moving images, a strategy and a
//! comparator. Every moving image is aligned, written to the output
//! directory, and its transform recorded in `transforms.toml`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::align::{create_aligner, AlignerConfig};
use crate::compare::ComparatorSpec;
use crate::compute::{create_backend, BatchAlignment, BatchGeometry, ComputeBackend, DevicePreference};
use crate::consts::{PARALLEL_IMAGE_THRESHOLD, XFORM_ALIGN_2D};
use crate::error::{AlignError, Result};
use crate::image::{require_same_size, Image};
use crate::io::{load_image, save_image};
use crate::ops::flip_x;
use crate::stack::mean_stack;
use crate::transform::Transform;

/// Name of the per-job transform report.
pub const REPORT_FILE: &str = "transforms.toml";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobConfig {
    pub reference: PathBuf,
    pub moving: Vec<PathBuf>,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub device: DevicePreference,
    #[serde(default)]
    pub aligner: AlignerConfig,
    #[serde(default)]
    pub comparator: ComparatorSpec,
    /// Also write the mean of all aligned images here.
    #[serde(default)]
    pub average: Option<PathBuf>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            reference: PathBuf::from("reference.tif"),
            moving: vec![PathBuf::from("moving_0001.tif")],
            output_dir: PathBuf::from("aligned"),
            device: DevicePreference::Auto,
            aligner: AlignerConfig::default(),
            comparator: ComparatorSpec::default(),
            average: None,
        }
    }
}

impl JobConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AlignError::InvalidConfig(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AlignError::InvalidConfig(e.to_string()))
    }
}

/// One aligned input.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobEntry {
    pub input: PathBuf,
    pub output: PathBuf,
    pub transform: Transform,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JobReport {
    pub entries: Vec<JobEntry>,
    pub average: Option<PathBuf>,
}

/// Output path for `input` inside `dir`: `<stem>_aligned.<ext>`.
pub fn aligned_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| matches!(*e, "png" | "tif" | "tiff"))
        .unwrap_or("tif");
    dir.join(format!("{stem}_aligned.{ext}"))
}

/// Run a job. `on_done(n)` is called as each image finishes.
pub fn run_job<F>(config: &JobConfig, on_done: F) -> Result<JobReport>
where
    F: Fn(usize) + Send + Sync,
{
    let backend = create_backend(&config.device);
    info!(backend = backend.name(), images = config.moving.len(), "starting job");

    let reference = load_image(&config.reference)?;
    let mut aligner_config = config.aligner.clone();
    aligner_config.set_flip(Arc::new(flip_x(&reference)));
    let aligner = create_aligner(aligner_config);
    let comparator = config.comparator.build()?;
    std::fs::create_dir_all(&config.output_dir)?;

    let counter = AtomicUsize::new(0);
    let align_one = |input: &PathBuf| -> Result<(JobEntry, Image)> {
        let moving = load_image(input)?;
        let aligned = aligner.align(&moving, Some(&reference), comparator.as_ref(), backend.as_ref())?;
        let transform = aligned
            .align_transform()
            .map(|t| t.as_ref().clone())
            .unwrap_or_default();
        let output = aligned_path(&config.output_dir, input);
        save_image(&aligned, &output)?;
        on_done(counter.fetch_add(1, Ordering::Relaxed) + 1);
        Ok((
            JobEntry {
                input: input.clone(),
                output,
                transform,
            },
            aligned,
        ))
    };

    let results: Vec<(JobEntry, Image)> = if config.moving.len() >= PARALLEL_IMAGE_THRESHOLD {
        config.moving.par_iter().map(align_one).collect::<Result<_>>()?
    } else {
        config.moving.iter().map(align_one).collect::<Result<_>>()?
    };
    let (entries, images): (Vec<JobEntry>, Vec<Image>) = results.into_iter().unzip();

    if let Some(path) = &config.average {
        save_image(&mean_stack(&images)?, path)?;
    }

    let report = JobReport {
        entries,
        average: config.average.clone(),
    };
    let text = toml::to_string_pretty(&report).map_err(|e| AlignError::InvalidConfig(e.to_string()))?;
    std::fs::write(config.output_dir.join(REPORT_FILE), text)?;
    info!(aligned = report.entries.len(), "job finished");
    Ok(report)
}

/// Align a stack to one reference through the backend's batch aligner,
/// returning each image resampled by its winning transform.
pub fn align_stack<F>(
    images: &[Image],
    reference: &Image,
    geometry: BatchGeometry,
    backend: &dyn ComputeBackend,
    on_inserted: F,
) -> Result<Vec<(BatchAlignment, Image)>>
where
    F: Fn(usize),
{
    let first = images
        .first()
        .ok_or_else(|| AlignError::InvalidInput("empty image stack".into()))?;
    require_same_size(first, reference)?;

    let mut batch = backend.batch_aligner()?;
    batch.setup(images.len(), (first.nx(), first.ny()), geometry)?;
    for (i, image) in images.iter().enumerate() {
        batch.insert_image(image, i)?;
        on_inserted(i + 1);
    }
    let results = batch.align_to_reference(reference)?;
    info!(batch = batch.name(), images = results.len(), "stack aligned");

    Ok(results
        .into_iter()
        .zip(images)
        .map(|(r, image)| {
            let transform = r.to_transform();
            let mut out = backend.apply_transform(image, &transform);
            out.set_transform(XFORM_ALIGN_2D, Arc::new(transform));
            (r, out)
        })
        .collect())
}
