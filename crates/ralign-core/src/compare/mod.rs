//! Image similarity metrics. Lower scores are better for every comparator.

pub mod ccc;
pub mod dot;
pub mod sqeuclidean;

use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};
use crate::image::{require_same_size, Image};

pub use ccc::Ccc;
pub use dot::Dot;
pub use sqeuclidean::SqEuclidean;

pub trait Comparator: Send + Sync {
    fn name(&self) -> &str;

    /// Score `candidate` against `reference`; both must be the same size.
    fn score(&self, candidate: &Image, reference: &Image) -> Result<f64>;
}

/// Options shared by the built-in comparators.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorConfig {
    /// Remove gain/offset (`sqeuclidean`) or magnitude (`dot`) before scoring.
    pub normalize: bool,
}

/// A comparator selected by name, as stored in job files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparatorSpec {
    pub name: String,
    #[serde(default)]
    pub config: ComparatorConfig,
}

impl Default for ComparatorSpec {
    fn default() -> Self {
        Self {
            name: "ccc".into(),
            config: ComparatorConfig::default(),
        }
    }
}

impl ComparatorSpec {
    pub fn build(&self) -> Result<Box<dyn Comparator>> {
        create_comparator(&self.name, &self.config)
    }
}

/// Registered comparator names with one-line descriptions.
pub fn list_comparators() -> &'static [(&'static str, &'static str)] {
    &[
        ("sqeuclidean", "mean squared difference"),
        ("ccc", "negative Pearson correlation"),
        ("dot", "negative mean dot product"),
    ]
}

pub fn create_comparator(name: &str, config: &ComparatorConfig) -> Result<Box<dyn Comparator>> {
    match name {
        "sqeuclidean" => Ok(Box::new(SqEuclidean::new(config.normalize))),
        "ccc" => Ok(Box::new(Ccc)),
        "dot" => Ok(Box::new(Dot::new(config.normalize))),
        other => Err(AlignError::UnknownComparator(other.to_string())),
    }
}

/// First and second order sums over paired samples.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Moments {
    pub n: f64,
    pub sa: f64,
    pub sb: f64,
    pub saa: f64,
    pub sbb: f64,
    pub sab: f64,
}

impl Moments {
    pub fn of(a: &Image, b: &Image) -> Result<Self> {
        require_same_size(a, b)?;
        let mut m = Moments::default();
        for (&x, &y) in a.data.iter().zip(b.data.iter()) {
            let (x, y) = (x as f64, y as f64);
            m.n += 1.0;
            m.sa += x;
            m.sb += y;
            m.saa += x * x;
            m.sbb += y * y;
            m.sab += x * y;
        }
        Ok(m)
    }

    pub fn var_a(&self) -> f64 {
        self.saa - self.sa * self.sa / self.n
    }

    pub fn var_b(&self) -> f64 {
        self.sbb - self.sb * self.sb / self.n
    }

    pub fn cov(&self) -> f64 {
        self.sab - self.sa * self.sb / self.n
    }
}
