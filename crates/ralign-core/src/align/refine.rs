//! Local refinement of a seed transform by simplex minimization over
//! `(tx, ty, alpha)`, with the mirror flag held fixed.

use ndarray::Array2;
use tracing::{debug, warn};

use crate::compare::Comparator;
use crate::compute::ComputeBackend;
use crate::consts::EPSILON;
use crate::error::Result;
use crate::image::{require_2d, Image};
use crate::ops::bilinear_sample;
use crate::optimize::{minimize, SimplexOptions, SimplexResult};
use crate::transform::Transform;

use super::config::{RefineConfig, RefineMode};
use super::{require_reference, Aligned, Aligner};

#[derive(Clone, Debug, Default)]
pub struct RefineAligner {
    pub config: RefineConfig,
}

/// Result of a refinement run.
#[derive(Clone, Debug)]
pub struct Refinement {
    pub transform: Transform,
    pub score: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl RefineAligner {
    pub fn new(config: RefineConfig) -> Self {
        Self { config }
    }

    pub fn refine(
        &self,
        moving: &Image,
        reference: &Image,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Refinement> {
        self.config.validate()?;
        require_2d(moving, "refine")?;

        let seed = self.config.seed.clone().unwrap_or_default().params_2d();
        let mirror = seed.mirror;
        let pose = |p: &[f64]| Transform::planar(p[2], p[0], p[1], mirror);

        let options = SimplexOptions {
            step: vec![self.config.stepx, self.config.stepy, self.config.stepaz],
            precision: self.config.precision,
            maxiter: self.config.maxiter,
        };
        let start = [seed.tx, seed.ty, seed.alpha];

        let result: SimplexResult = match self.config.mode {
            RefineMode::General => minimize(
                |p| {
                    let candidate = backend.apply_transform(moving, &pose(p));
                    comparator.score(&candidate, reference)
                },
                &start,
                &options,
            )?,
            RefineMode::Fast => {
                let m = standardized(&moving.plane().to_owned());
                let r = standardized(&reference.plane().to_owned());
                minimize(|p| Ok(fast_objective(&m, &r, &pose(p))), &start, &options)?
            }
        };

        if !result.converged {
            warn!(
                iterations = result.iterations,
                size = result.size,
                precision = self.config.precision,
                "refine stopped at maxiter; result may be degraded"
            );
        }
        let transform = pose(&result.point);
        debug!(%transform, score = result.value, iterations = result.iterations, "refined");
        Ok(Refinement {
            transform,
            score: result.value,
            iterations: result.iterations,
            converged: result.converged,
        })
    }
}

/// Zero-mean, unit-variance copy; a constant plane becomes all zeros.
fn standardized(data: &Array2<f32>) -> Array2<f32> {
    let n = data.len().max(1) as f64;
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = data.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    let sd = var.sqrt();
    if sd < EPSILON {
        return Array2::zeros(data.dim());
    }
    data.mapv(|v| ((v as f64 - mean) / sd) as f32)
}

/// `1 − Σ r(p)·m(T⁻¹p) / N`, sampling the moving plane without building the
/// transformed image.
///
/// The sum is not renormalized after interpolation, so fractional poses read
/// a smoothed plane and score slightly worse than nearby whole-pixel ones.
fn fast_objective(moving: &Array2<f32>, reference: &Array2<f32>, t: &Transform) -> f64 {
    let (ny, nx) = reference.dim();
    let (cx, cy) = ((nx / 2) as f64, (ny / 2) as f64);
    let view = moving.view();
    let mut sum = 0.0;
    for y in 0..ny {
        for x in 0..nx {
            let q = t.invert_point([x as f64 - cx, y as f64 - cy, 0.0]);
            let v = bilinear_sample(&view, q[1] + cy, q[0] + cx);
            sum += reference[[y, x]] as f64 * v as f64;
        }
    }
    1.0 - sum / (nx * ny).max(1) as f64
}

impl Aligner for RefineAligner {
    fn name(&self) -> &str {
        "refine"
    }

    fn align(
        &self,
        moving: &Image,
        reference: Option<&Image>,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Image> {
        self.config.validate()?;
        let reference = require_reference(reference, moving, self.name())?;
        let refined = self.refine(moving, reference, comparator, backend)?;
        Ok(Aligned::apply(moving, refined.transform, backend).into_image())
    }
}
