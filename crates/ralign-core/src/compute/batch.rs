//! Persistent image stacks aligned against a common reference.
//!
//! A `BatchAligner` is set up once for a stack shape, filled slot by slot,
//! then asked to align every slot to one reference. Each stacked image is
//! polar-unwrapped about every offset of a translation grid and its rings are
//! circularly correlated against the unwrapped reference and the unwrapped
//! mirrored reference. The best `(angle, offset, mirror)` per image wins.

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::{EPSILON, PARALLEL_IMAGE_THRESHOLD, UNWRAP_EDGE_MARGIN, UNWRAP_INNER_RADIUS};
use crate::correlation::{argmax, smooth_fft_size};
use crate::error::{AlignError, Result};
use crate::image::{require_2d, Image};
use crate::ops::{flip_x, unwrap, Span};
use crate::transform::Transform;

use super::cpu::correlate_rows_fft;

/// Ring layout and translation grid of a batch search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchGeometry {
    /// Angular samples per ring over 360°.
    pub ring_length: usize,
    /// Number of rings, starting at the inner unwrap radius.
    pub ring_count: usize,
    /// Translation grid spacing in pixels.
    pub step: usize,
    /// Largest |x| offset searched.
    pub kx: usize,
    /// Largest |y| offset searched.
    pub ky: usize,
}

impl BatchGeometry {
    /// Rings filling an `nx` x `ny` image while still fitting when the polar
    /// origin moves by up to `shift` pixels, one grid point per pixel.
    pub fn for_image(nx: usize, ny: usize, shift: usize) -> Result<Self> {
        let half = nx.min(ny) / 2;
        let outer = half.saturating_sub(UNWRAP_EDGE_MARGIN + shift);
        if outer <= UNWRAP_INNER_RADIUS {
            return Err(AlignError::InvalidConfig(format!(
                "{nx}x{ny} image is too small for a batch search with shift {shift}"
            )));
        }
        Ok(Self {
            ring_length: smooth_fft_size((2.0 * std::f64::consts::PI * outer as f64).ceil() as usize),
            ring_count: outer - UNWRAP_INNER_RADIUS,
            step: 1,
            kx: shift,
            ky: shift,
        })
    }

    pub fn inner_radius(&self) -> usize {
        UNWRAP_INNER_RADIUS
    }

    pub fn outer_radius(&self) -> usize {
        UNWRAP_INNER_RADIUS + self.ring_count
    }

    /// Offsets `(sx, sy)` of the translation grid, y-major.
    pub fn offsets(&self) -> Vec<(i64, i64)> {
        let step = self.step.max(1);
        let (kx, ky) = (self.kx as i64, self.ky as i64);
        let mut out = Vec::new();
        for sy in (-ky..=ky).step_by(step) {
            for sx in (-kx..=kx).step_by(step) {
                out.push((sx, sy));
            }
        }
        out
    }

    pub(crate) fn validate(&self, dims: (usize, usize)) -> Result<()> {
        if self.ring_length == 0 || self.ring_count == 0 || self.step == 0 {
            return Err(AlignError::InvalidConfig(format!(
                "batch geometry needs ring_length, ring_count and step > 0, got {self:?}"
            )));
        }
        let half = dims.0.min(dims.1) / 2;
        let reach = self.outer_radius() + self.kx.max(self.ky);
        if reach > half {
            return Err(AlignError::InvalidConfig(format!(
                "rings up to radius {} shifted by {} exceed half-size {half}",
                self.outer_radius(),
                self.kx.max(self.ky)
            )));
        }
        Ok(())
    }
}

/// Winning parameters for one stacked image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchAlignment {
    /// Rotation in degrees applied after the pre-translation.
    pub angle: f64,
    /// Polar origin offset at which the image matched.
    pub sx: f64,
    pub sy: f64,
    pub mirror: bool,
    /// Normalized ring correlation at the winner, in `[-1, 1]` (higher is better).
    pub score: f64,
}

impl BatchAlignment {
    /// Transform carrying the image onto the reference.
    pub fn to_transform(&self) -> Transform {
        let mut t = Transform::rotation_2d(self.angle);
        t.set_pre_translation([-self.sx, -self.sy, 0.0]);
        if self.mirror {
            t.mirrored()
        } else {
            t
        }
    }
}

/// Single-owner stack aligner; every operation takes `&mut self`.
pub trait BatchAligner: Send {
    fn name(&self) -> &str;

    /// Size the stack for `count` images of `dims = (nx, ny)`.
    fn setup(&mut self, count: usize, dims: (usize, usize), geometry: BatchGeometry) -> Result<()>;

    fn insert_image(&mut self, image: &Image, index: usize) -> Result<()>;

    /// Align every slot to `reference`; fails if any slot is empty.
    fn align_to_reference(&mut self, reference: &Image) -> Result<Vec<BatchAlignment>>;
}

/// Reject an empty stack or a geometry that does not fit `dims`.
pub(crate) fn check_setup(count: usize, dims: (usize, usize), geometry: &BatchGeometry) -> Result<()> {
    if count == 0 {
        return Err(AlignError::InvalidConfig("batch count must be > 0".into()));
    }
    geometry.validate(dims)
}

/// Reject a slot index past the stack or an image of the wrong shape.
pub(crate) fn check_insert(image: &Image, index: usize, count: usize, dims: (usize, usize)) -> Result<()> {
    require_2d(image, "batch alignment")?;
    if (image.nx(), image.ny()) != dims {
        return Err(AlignError::InvalidInput(format!(
            "image is {}x{}, stack expects {}x{}",
            image.nx(),
            image.ny(),
            dims.0,
            dims.1
        )));
    }
    if index >= count {
        return Err(AlignError::InvalidInput(format!(
            "slot {index} out of range for {count} images"
        )));
    }
    Ok(())
}

pub(crate) fn not_set_up() -> AlignError {
    AlignError::Backend("batch aligner used before setup".into())
}

pub(crate) fn empty_slot(index: usize) -> AlignError {
    AlignError::InvalidInput(format!("batch slot {index} was never filled"))
}

/// Unwrapped reference and mirrored reference rings.
pub(crate) fn reference_rings(
    geometry: &BatchGeometry,
    dims: (usize, usize),
    reference: &Image,
) -> Result<(Array2<f32>, Array2<f32>)> {
    require_2d(reference, "batch alignment")?;
    if (reference.nx(), reference.ny()) != dims {
        return Err(AlignError::DimensionMismatch {
            moving: [dims.0, dims.1, 1],
            reference: reference.dims(),
        });
    }
    let flipped = flip_x(reference);
    let rings = |img: &Image| {
        unwrap(
            &img.plane(),
            geometry.inner_radius(),
            geometry.outer_radius(),
            geometry.ring_length,
            0.0,
            0.0,
            Span::Full,
        )
    };
    Ok((rings(reference), rings(&flipped)))
}

/// Host-side slot storage of the CPU aligner.
#[derive(Default)]
struct StackSlots {
    dims: (usize, usize),
    geometry: Option<BatchGeometry>,
    slots: Vec<Option<Array2<f32>>>,
}

impl StackSlots {
    fn setup(&mut self, count: usize, dims: (usize, usize), geometry: BatchGeometry) -> Result<()> {
        check_setup(count, dims, &geometry)?;

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(count)
            .map_err(|e| AlignError::Backend(format!("cannot allocate {count} slots: {e}")))?;
        slots.resize(count, None);

        self.dims = dims;
        self.geometry = Some(geometry);
        self.slots = slots;
        Ok(())
    }

    fn insert(&mut self, image: &Image, index: usize) -> Result<()> {
        self.geometry()?;
        check_insert(image, index, self.slots.len(), self.dims)?;
        self.slots[index] = Some(image.plane().to_owned());
        Ok(())
    }

    fn geometry(&self) -> Result<BatchGeometry> {
        self.geometry.ok_or_else(not_set_up)
    }

    /// All filled planes, or an error naming the first empty slot.
    fn filled(&self) -> Result<Vec<&Array2<f32>>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, s)| s.as_ref().ok_or_else(|| empty_slot(i)))
            .collect()
    }
}

/// Euclidean norm of a ring set.
pub(crate) fn ring_norm<'a>(values: impl IntoIterator<Item = &'a f32>) -> f64 {
    values
        .into_iter()
        .map(|&v| (v as f64) * (v as f64))
        .sum::<f64>()
        .sqrt()
}

/// Ring correlation scaled to a cosine similarity; zero for blank rings.
pub(crate) fn normalized_score(ccf: f64, norm_a: f64, norm_b: f64) -> f64 {
    let denom = norm_a * norm_b;
    if denom < EPSILON {
        0.0
    } else {
        ccf / denom
    }
}

/// Convert a ring-correlation argmax into an angle in degrees.
pub(crate) fn bin_to_degrees(bin: usize, ring_length: usize) -> f64 {
    bin as f64 * 360.0 / ring_length as f64
}

/// CPU stack aligner, parallel over images.
#[derive(Default)]
pub struct CpuBatchAligner {
    stack: StackSlots,
}

impl CpuBatchAligner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchAligner for CpuBatchAligner {
    fn name(&self) -> &str {
        "CPU/Rayon batch"
    }

    fn setup(&mut self, count: usize, dims: (usize, usize), geometry: BatchGeometry) -> Result<()> {
        self.stack.setup(count, dims, geometry)
    }

    fn insert_image(&mut self, image: &Image, index: usize) -> Result<()> {
        self.stack.insert(image, index)
    }

    fn align_to_reference(&mut self, reference: &Image) -> Result<Vec<BatchAlignment>> {
        let geometry = self.stack.geometry()?;
        let (ref_rings, flip_rings) = reference_rings(&geometry, self.stack.dims, reference)?;
        let planes = self.stack.filled()?;
        let offsets = geometry.offsets();

        let align_one = |plane: &&Array2<f32>| {
            best_alignment(&plane.view(), &ref_rings.view(), &flip_rings.view(), &offsets, &geometry)
        };
        if planes.len() >= PARALLEL_IMAGE_THRESHOLD {
            planes.par_iter().map(align_one).collect()
        } else {
            planes.iter().map(align_one).collect()
        }
    }
}

fn best_alignment(
    plane: &ArrayView2<f32>,
    ref_rings: &ArrayView2<f32>,
    flip_rings: &ArrayView2<f32>,
    offsets: &[(i64, i64)],
    geometry: &BatchGeometry,
) -> Result<BatchAlignment> {
    let mut best = BatchAlignment {
        angle: 0.0,
        sx: 0.0,
        sy: 0.0,
        mirror: false,
        score: f64::NEG_INFINITY,
    };
    let targets = [
        (false, ref_rings, ring_norm(ref_rings)),
        (true, flip_rings, ring_norm(flip_rings)),
    ];
    for &(sx, sy) in offsets {
        let rings = unwrap(
            plane,
            geometry.inner_radius(),
            geometry.outer_radius(),
            geometry.ring_length,
            sx as f64,
            sy as f64,
            Span::Full,
        );
        let norm = ring_norm(&rings);
        for &(mirror, target, target_norm) in &targets {
            let ccf = correlate_rows_fft(&rings.view(), target)?;
            let k = argmax(&ccf);
            let score = normalized_score(ccf[k], norm, target_norm);
            if score > best.score {
                best = BatchAlignment {
                    angle: bin_to_degrees(k, geometry.ring_length),
                    sx: sx as f64,
                    sy: sy as f64,
                    mirror,
                    score,
                };
            }
        }
    }
    Ok(best)
}
