use crate::consts::EPSILON;
use crate::error::Result;
use crate::image::Image;

use super::{Comparator, Moments};

/// Mean squared difference.
///
/// With `normalize`, the candidate is first fitted to the reference as
/// `a·c + b` by least squares, so gain and offset differences cost nothing.
pub struct SqEuclidean {
    normalize: bool,
}

impl SqEuclidean {
    pub fn new(normalize: bool) -> Self {
        Self { normalize }
    }
}

impl Comparator for SqEuclidean {
    fn name(&self) -> &str {
        "sqeuclidean"
    }

    fn score(&self, candidate: &Image, reference: &Image) -> Result<f64> {
        let m = Moments::of(candidate, reference)?;
        if m.n == 0.0 {
            return Ok(0.0);
        }

        let (gain, offset) = if self.normalize {
            let var = m.var_a();
            if var.abs() < EPSILON {
                (0.0, m.sb / m.n)
            } else {
                let gain = m.cov() / var;
                (gain, (m.sb - gain * m.sa) / m.n)
            }
        } else {
            (1.0, 0.0)
        };

        let sum: f64 = candidate
            .data
            .iter()
            .zip(reference.data.iter())
            .map(|(&c, &r)| {
                let d = gain * c as f64 + offset - r as f64;
                d * d
            })
            .sum();
        Ok(sum / m.n)
    }
}
