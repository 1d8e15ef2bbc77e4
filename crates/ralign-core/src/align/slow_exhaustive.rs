//! Coarse-to-fine exhaustive search that resamples the moving image for
//! every `(angle, translation)` hypothesis and scores it with the comparator.

use tracing::debug;

use crate::compare::Comparator;
use crate::compute::ComputeBackend;
use crate::consts::{
    COARSE_ANGLE_STRIDE, REFINE_ANGLE_STEPS, REFINE_TRANSLATION_WINDOW, SHRINK_FACTOR,
    SLOW_MAXSHIFT_DIVISOR,
};
use crate::error::{AlignError, Result};
use crate::image::{require_2d, Image};
use crate::ops::median_shrink;
use crate::transform::Transform;

use super::config::SlowExhaustiveConfig;
use super::flip::mirrored_reference;
use super::{require_reference, Aligned, Aligner};

/// A scored in-plane pose; the translation applies after the rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub alpha: f64,
    pub tx: f64,
    pub ty: f64,
    pub mirror: bool,
    pub score: f64,
}

impl Pose {
    pub fn to_transform(&self) -> Transform {
        let t = Transform::planar(self.alpha, self.tx, self.ty, false);
        if self.mirror {
            t.mirrored()
        } else {
            t
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SlowSearchOutcome {
    /// Stage-1 winner, in shrunk-image pixels.
    pub coarse: Pose,
    /// Full-resolution score of the stage-1 winner scaled to full size.
    pub seed_score: f64,
    /// Stage-2 winner; `fine.score <= seed_score`.
    pub fine: Pose,
}

struct Scorer<'a> {
    moving: &'a Image,
    reference: &'a Image,
    flipped: &'a Image,
    comparator: &'a dyn Comparator,
    backend: &'a dyn ComputeBackend,
}

impl Scorer<'_> {
    fn evaluate(&self, alpha: f64, tx: f64, ty: f64, mirror: bool) -> Result<Pose> {
        let t = Transform::planar(alpha, tx, ty, false);
        let candidate = self.backend.apply_transform(self.moving, &t);
        let target = if mirror { self.flipped } else { self.reference };
        let score = self.comparator.score(&candidate, target)?;
        Ok(Pose {
            alpha,
            tx,
            ty,
            mirror,
            score,
        })
    }

    /// Both references for one pose; keeps `best` on ties.
    fn consider(&self, best: &mut Option<Pose>, alpha: f64, tx: f64, ty: f64) -> Result<()> {
        for mirror in [false, true] {
            let p = self.evaluate(alpha, tx, ty, mirror)?;
            if best.map_or(true, |b| p.score < b.score) {
                *best = Some(p);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct SlowExhaustiveAligner {
    pub config: SlowExhaustiveConfig,
}

impl SlowExhaustiveAligner {
    pub fn new(config: SlowExhaustiveConfig) -> Self {
        Self { config }
    }

    /// Angular step in degrees for an image `nx` wide.
    pub fn angle_step(&self, nx: usize) -> f64 {
        self.config
            .angstep
            .unwrap_or_else(|| 2.0_f64.atan2(nx as f64).to_degrees())
    }

    pub fn search(
        &self,
        moving: &Image,
        reference: &Image,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<SlowSearchOutcome> {
        self.config.validate()?;
        require_2d(moving, "rtf_slow_exhaustive")?;
        let nx = moving.nx();
        let maxshift = self.config.maxshift.filter(|&m| m > 0).unwrap_or(nx / SLOW_MAXSHIFT_DIVISOR);
        let step = self.angle_step(nx);
        let transtep = self.config.transtep;
        let flipped = mirrored_reference(&self.config.flip, reference)?;

        // Stage 1: shrunk images.
        let small_m = median_shrink(moving, SHRINK_FACTOR)?;
        let small_r = median_shrink(reference, SHRINK_FACTOR)?;
        let small_f = median_shrink(&flipped, SHRINK_FACTOR)?;
        let coarse_scorer = Scorer {
            moving: &small_m,
            reference: &small_r,
            flipped: &small_f,
            comparator,
            backend,
        };
        let scale = SHRINK_FACTOR as f64;
        let limit = maxshift as f64;
        let half = (maxshift / 2) as i64;
        let stride = COARSE_ANGLE_STRIDE * step;
        let angles: Vec<f64> = (0..)
            .map(|i| -2.0 * step + i as f64 * stride)
            .take_while(|a| *a < 360.0)
            .collect();

        let mut coarse = None;
        for dy in -half..=half {
            for dx in -half..=half {
                // Disk is measured at full resolution.
                if (dx as f64).hypot(dy as f64) * scale > limit {
                    continue;
                }
                for &alpha in &angles {
                    coarse_scorer.consider(&mut coarse, alpha, dx as f64, dy as f64)?;
                }
            }
        }
        let coarse = coarse
            .ok_or_else(|| AlignError::InvalidConfig("empty coarse search window".into()))?;
        debug!(?coarse, "rtf_slow_exhaustive coarse winner");

        // Stage 2: full resolution around the scaled coarse winner.
        let fine_scorer = Scorer {
            moving,
            reference,
            flipped: &flipped,
            comparator,
            backend,
        };
        let (cx, cy) = (coarse.tx * scale, coarse.ty * scale);
        let seed = fine_scorer.evaluate(coarse.alpha, cx, cy, coarse.mirror)?;
        let n = (REFINE_TRANSLATION_WINDOW / transtep).floor() as i64;

        let mut fine = None;
        for iy in -n..=n {
            for ix in -n..=n {
                let (tx, ty) = (cx + ix as f64 * transtep, cy + iy as f64 * transtep);
                if tx.hypot(ty) > limit {
                    continue;
                }
                for ia in -REFINE_ANGLE_STEPS..=REFINE_ANGLE_STEPS {
                    let alpha = coarse.alpha + ia as f64 * step;
                    fine_scorer.consider(&mut fine, alpha, tx, ty)?;
                }
            }
        }
        let fine = match fine {
            Some(f) if f.score < seed.score => f,
            _ => seed,
        };
        debug!(?fine, seed_score = seed.score, "rtf_slow_exhaustive fine winner");

        Ok(SlowSearchOutcome {
            coarse,
            seed_score: seed.score,
            fine,
        })
    }
}

impl Aligner for SlowExhaustiveAligner {
    fn name(&self) -> &str {
        "rtf_slow_exhaustive"
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
        let outcome = self.search(moving, reference, comparator, backend)?;
        Ok(Aligned::apply(moving, outcome.fine.to_transform(), backend).into_image())
    }
}
