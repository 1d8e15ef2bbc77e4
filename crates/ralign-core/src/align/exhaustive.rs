//! Coarse-to-fine exhaustive rotation/translation/mirror search over polar
//! unwraps.
//!
//! For every candidate translation the moving image is unwrapped about the
//! shifted center; one circular row correlation against the unwrapped
//! reference then resolves the rotation for that translation at once.

use tracing::debug;

use crate::compare::Comparator;
use crate::compute::ComputeBackend;
use crate::consts::{
    MAXSHIFT_DIVISOR, REFINE_TRANSLATION_WINDOW, SHRINK_FACTOR, UNWRAP_EDGE_MARGIN,
    UNWRAP_INNER_RADIUS,
};
use crate::correlation::{argmax, smooth_fft_size};
use crate::error::{AlignError, Result};
use crate::image::{require_2d, Image};
use crate::ops::{median_shrink, rotate_columns, unwrap, Span};
use crate::transform::Transform;

use super::config::ExhaustiveConfig;
use super::flip::mirrored_reference;
use super::{require_reference, Aligned, Aligner};

/// One evaluated `(angle, translation, mirror)` hypothesis.
///
/// `(dx, dy)` is the offset of the polar origin in the moving image; the
/// matching transform rotates by `angle` after translating by `−(dx, dy)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub angle: f64,
    pub dx: f64,
    pub dy: f64,
    pub mirror: bool,
    pub score: f64,
}

impl Candidate {
    pub fn to_transform(&self) -> Transform {
        let mut t = Transform::rotation_2d(self.angle);
        t.set_pre_translation([-self.dx, -self.dy, 0.0]);
        if self.mirror {
            t.mirrored()
        } else {
            t
        }
    }
}

/// Winners of both stages.
#[derive(Clone, Copy, Debug)]
pub struct SearchOutcome {
    /// Stage-1 winner, in shrunk-image pixels.
    pub coarse: Candidate,
    /// Full-resolution score of the stage-1 winner scaled to full size.
    pub seed_score: f64,
    /// Stage-2 winner; `fine.score <= seed_score`.
    pub fine: Candidate,
}

/// Unwrapped rings of one image pair at one resolution.
struct RingStage<'a> {
    moving: &'a Image,
    reference: Image,
    flipped: Image,
    inner: usize,
    outer: usize,
    length: usize,
}

impl<'a> RingStage<'a> {
    fn new(
        moving: &'a Image,
        reference: &Image,
        flipped: &Image,
        outer: usize,
        length: usize,
    ) -> Self {
        let rings = |img: &Image| {
            Image::from_2d(unwrap(
                &img.plane(),
                UNWRAP_INNER_RADIUS,
                outer,
                length,
                0.0,
                0.0,
                Span::Full,
            ))
        };
        Self {
            moving,
            reference: rings(reference),
            flipped: rings(flipped),
            inner: UNWRAP_INNER_RADIUS,
            outer,
            length,
        }
    }

    /// Best rotation for the polar origin `(dx, dy)` against one reference.
    fn evaluate(
        &self,
        dx: i64,
        dy: i64,
        mirror: bool,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Candidate> {
        let moving = unwrap(
            &self.moving.plane(),
            self.inner,
            self.outer,
            self.length,
            dx as f64,
            dy as f64,
            Span::Full,
        );
        let target = if mirror { &self.flipped } else { &self.reference };
        let ccf = backend.correlate_rows(&moving.view(), &target.plane())?;
        let k = argmax(&ccf);
        let rotated = Image::from_2d(rotate_columns(&moving.view(), k as i64));
        let score = comparator.score(&rotated, target)?;
        Ok(Candidate {
            angle: k as f64 * Span::Full.degrees() / self.length as f64,
            dx: dx as f64,
            dy: dy as f64,
            mirror,
            score,
        })
    }

    /// Lowest-scoring candidate over `offsets` and both references; ties keep
    /// the earliest.
    fn search(
        &self,
        offsets: &[(i64, i64)],
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Option<Candidate>> {
        let mut best: Option<Candidate> = None;
        for &(dx, dy) in offsets {
            for mirror in [false, true] {
                let c = self.evaluate(dx, dy, mirror, comparator, backend)?;
                if best.map_or(true, |b| c.score < b.score) {
                    best = Some(c);
                }
            }
        }
        Ok(best)
    }
}

/// Integer offsets within `[cx − r, cx + r] × [cy − r, cy + r]` whose
/// distance from the origin is at most `limit`, y-major.
fn offsets_around(cx: i64, cy: i64, r: i64, limit: f64) -> Vec<(i64, i64)> {
    let mut out = Vec::new();
    for dy in cy - r..=cy + r {
        for dx in cx - r..=cx + r {
            if (dx as f64).hypot(dy as f64) <= limit {
                out.push((dx, dy));
            }
        }
    }
    out
}

#[derive(Clone, Debug, Default)]
pub struct ExhaustiveAligner {
    pub config: ExhaustiveConfig,
}

impl ExhaustiveAligner {
    pub fn new(config: ExhaustiveConfig) -> Self {
        Self { config }
    }

    pub fn maxshift(&self, nx: usize) -> Result<usize> {
        self.config.validate()?;
        let m = self.config.maxshift.filter(|&m| m > 0).unwrap_or(nx / MAXSHIFT_DIVISOR);
        if m < 2 {
            return Err(AlignError::InvalidConfig(format!(
                "maxshift must be at least 2, got {m}"
            )));
        }
        Ok(m)
    }

    pub fn search(
        &self,
        moving: &Image,
        reference: &Image,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<SearchOutcome> {
        require_2d(moving, "rtf_exhaustive")?;
        let maxshift = self.maxshift(moving.nx())?;
        let half = maxshift / 2;
        let flipped = mirrored_reference(&self.config.flip, reference)?;

        let xst = smooth_fft_size((2.0 * std::f64::consts::PI * moving.ny() as f64) as usize);

        // Stage 1: shrunk images, translations within maxshift/2.
        let small_m = median_shrink(moving, SHRINK_FACTOR)?;
        let small_r = median_shrink(reference, SHRINK_FACTOR)?;
        let small_f = median_shrink(&flipped, SHRINK_FACTOR)?;
        let outer1 = ring_outer(small_m.ny(), half)?;
        let coarse_stage = RingStage::new(&small_m, &small_r, &small_f, outer1, (xst / 2).max(1));
        let h = half as i64;
        let coarse = coarse_stage
            .search(&offsets_around(0, 0, h, half as f64), comparator, backend)?
            .ok_or_else(|| AlignError::InvalidConfig("empty coarse search window".into()))?;
        debug!(?coarse, "rtf_exhaustive coarse winner");

        // Stage 2: full resolution, ±3 px around the scaled coarse winner.
        let outer2 = ring_outer(moving.ny(), maxshift)?;
        let fine_stage = RingStage::new(moving, reference, &flipped, outer2, xst);
        let (sx, sy) = (
            coarse.dx as i64 * SHRINK_FACTOR as i64,
            coarse.dy as i64 * SHRINK_FACTOR as i64,
        );
        let seed = fine_stage.evaluate(sx, sy, coarse.mirror, comparator, backend)?;
        let window = REFINE_TRANSLATION_WINDOW as i64;
        let fine = fine_stage
            .search(&offsets_around(sx, sy, window, maxshift as f64), comparator, backend)?
            .map_or(seed, |c| if c.score < seed.score { c } else { seed });
        debug!(?fine, seed_score = seed.score, "rtf_exhaustive fine winner");

        Ok(SearchOutcome {
            coarse,
            seed_score: seed.score,
            fine,
        })
    }
}

/// Outer ring radius `ny/2 − 2 − shift`; fails when no ring remains past the
/// inner radius.
fn ring_outer(ny: usize, shift: usize) -> Result<usize> {
    let outer = (ny / 2)
        .checked_sub(UNWRAP_EDGE_MARGIN + shift)
        .filter(|&r| r > UNWRAP_INNER_RADIUS)
        .ok_or_else(|| {
            AlignError::InvalidConfig(format!(
                "maxshift {shift} leaves no rings inside ny={ny}"
            ))
        })?;
    Ok(outer)
}

impl Aligner for ExhaustiveAligner {
    fn name(&self) -> &str {
        "rtf_exhaustive"
    }

    fn align(
        &self,
        moving: &Image,
        reference: Option<&Image>,
        comparator: &dyn Comparator,
        backend: &dyn ComputeBackend,
    ) -> Result<Image> {
        let reference = require_reference(reference, moving, self.name())?;
        let outcome = self.search(moving, reference, comparator, backend)?;
        Ok(Aligned::apply(moving, outcome.fine.to_transform(), backend).into_image())
    }
}
