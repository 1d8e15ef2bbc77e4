use crate::consts::EPSILON;
use crate::error::Result;
use crate::image::Image;

use super::{Comparator, Moments};

/// Negative mean dot product; with `normalize`, negative cosine similarity.
pub struct Dot {
    normalize: bool,
}

impl Dot {
    pub fn new(normalize: bool) -> Self {
        Self { normalize }
    }
}

impl Comparator for Dot {
    fn name(&self) -> &str {
        "dot"
    }

    fn score(&self, candidate: &Image, reference: &Image) -> Result<f64> {
        let m = Moments::of(candidate, reference)?;
        if m.n == 0.0 {
            return Ok(0.0);
        }
        if self.normalize {
            let norm = (m.saa * m.sbb).sqrt();
            if norm < EPSILON {
                return Ok(0.0);
            }
            Ok(-m.sab / norm)
        } else {
            Ok(-m.sab / m.n)
        }
    }
}
