use crate::consts::EPSILON;
use crate::error::Result;
use crate::image::Image;

use super::{Comparator, Moments};

/// Negative Pearson correlation coefficient, in `[-1, 1]`.
/// A constant image correlates with nothing and scores 0.
pub struct Ccc;

impl Comparator for Ccc {
    fn name(&self) -> &str {
        "ccc"
    }

    fn score(&self, candidate: &Image, reference: &Image) -> Result<f64> {
        let m = Moments::of(candidate, reference)?;
        let denom = (m.var_a() * m.var_b()).max(0.0).sqrt();
        if m.n == 0.0 || denom < EPSILON {
            return Ok(0.0);
        }
        Ok(-m.cov() / denom)
    }
}
