use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_REFINE_MAXITER, DEFAULT_REFINE_PRECISION, DEFAULT_REFINE_STEP_AZ,
    DEFAULT_REFINE_STEP_X, DEFAULT_REFINE_STEP_Y,
};
use crate::error::{AlignError, Result};
use crate::image::Image;
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// ParamBag
// ---------------------------------------------------------------------------

/// Untyped `key=value` options, as given on a command line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamBag(BTreeMap<String, String>);

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` items. An item without `=` is an error.
    pub fn parse<S: AsRef<str>>(items: &[S]) -> Result<Self> {
        let mut bag = Self::new();
        for item in items {
            let item = item.as_ref();
            let (k, v) = item.split_once('=').ok_or_else(|| {
                AlignError::InvalidConfig(format!("expected key=value, got '{item}'"))
            })?;
            bag.insert(k.trim(), v.trim());
        }
        Ok(bag)
    }

    pub fn insert(&mut self, key: &str, value: impl ToString) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                AlignError::InvalidConfig(format!("cannot parse {key}='{raw}'"))
            }),
        }
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        self.parsed(key)
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        self.parsed(key)
    }

    /// `0`/`1` or `true`/`false`.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some("1") | Some("true") => Ok(Some(true)),
            Some("0") | Some("false") => Ok(Some(false)),
            Some(raw) => Err(AlignError::InvalidConfig(format!(
                "cannot parse {key}='{raw}' as a flag"
            ))),
        }
    }

    /// A search bound; zero or negative values select the default.
    pub fn get_maxshift(&self) -> Result<Option<usize>> {
        Ok(self
            .get_i64("maxshift")?
            .filter(|&v| v > 0)
            .and_then(|v| usize::try_from(v).ok()))
    }

    /// `seed=alpha,tx,ty[,mirror]`.
    pub fn get_seed(&self) -> Result<Option<Transform>> {
        let Some(raw) = self.get("seed") else {
            return Ok(None);
        };
        let bad = || AlignError::InvalidConfig(format!("cannot parse seed='{raw}'"));
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        if !(3..=4).contains(&parts.len()) {
            return Err(bad());
        }
        let num = |s: &str| s.parse::<f64>().map_err(|_| bad());
        let mirror = match parts.get(3) {
            None | Some(&"0") | Some(&"false") => false,
            Some(&"1") | Some(&"true") => true,
            Some(_) => return Err(bad()),
        };
        Ok(Some(Transform::planar(
            num(parts[0])?,
            num(parts[1])?,
            num(parts[2])?,
            mirror,
        )))
    }
}

// ---------------------------------------------------------------------------
// Shared option types
// ---------------------------------------------------------------------------

/// How the translation-invariant rotational footprint is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootprintMode {
    /// Zero-padded autocorrelation with per-ring mean removed.
    #[default]
    Autocorrelation,
    /// Zero-padded autocorrelation as is.
    RawAutocorrelation,
    /// Fourier amplitude with per-ring mean removed.
    Amplitude,
}

impl FootprintMode {
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::Autocorrelation),
            1 => Ok(Self::RawAutocorrelation),
            2 => Ok(Self::Amplitude),
            other => Err(AlignError::InvalidConfig(format!(
                "rfp_mode must be 0, 1 or 2, got {other}"
            ))),
        }
    }

    fn from_params(params: &ParamBag) -> Result<Self> {
        params
            .get_i64("rfp_mode")?
            .map_or(Ok(Self::default()), Self::from_code)
    }
}

/// A precomputed mirrored reference, supplied programmatically.
pub type FlipReference = Option<Arc<Image>>;

// ---------------------------------------------------------------------------
// Per-strategy configurations
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationalConfig {
    /// Per-axis search bound; `None` selects `extent / 8`.
    pub maxshift: Option<usize>,
    /// Suppress the zero-shift peak and its neighborhood.
    pub nozero: bool,
    /// Round self-alignment shifts to whole pixels.
    pub intonly: bool,
}

impl TranslationalConfig {
    pub fn from_params(params: &ParamBag) -> Result<Self> {
        Ok(Self {
            maxshift: params.get_maxshift()?,
            nozero: params.get_bool("nozero")?.unwrap_or(false),
            intonly: params.get_bool("intonly")?.unwrap_or(false),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationalConfig {
    pub rfp_mode: FootprintMode,
}

impl RotationalConfig {
    pub fn from_params(params: &ParamBag) -> Result<Self> {
        Ok(Self {
            rfp_mode: FootprintMode::from_params(params)?,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecenterConfig {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateTranslateConfig {
    pub rfp_mode: FootprintMode,
    pub maxshift: Option<usize>,
    pub nozero: bool,
}

impl RotateTranslateConfig {
    pub fn from_params(params: &ParamBag) -> Result<Self> {
        Ok(Self {
            rfp_mode: FootprintMode::from_params(params)?,
            maxshift: params.get_maxshift()?,
            nozero: params.get_bool("nozero")?.unwrap_or(false),
        })
    }

    /// Translation settings forwarded to each branch; `intonly` stays off.
    pub fn translational(&self) -> TranslationalConfig {
        TranslationalConfig {
            maxshift: self.maxshift,
            nozero: self.nozero,
            intonly: false,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateFlipConfig {
    pub rfp_mode: FootprintMode,
    #[serde(skip)]
    pub flip: FlipReference,
}

impl RotateFlipConfig {
    pub fn from_params(params: &ParamBag) -> Result<Self> {
        Ok(Self {
            rfp_mode: FootprintMode::from_params(params)?,
            flip: None,
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateTranslateFlipConfig {
    pub rfp_mode: FootprintMode,
    pub maxshift: Option<usize>,
    pub nozero: bool,
    #[serde(skip)]
    pub flip: FlipReference,
}

impl RotateTranslateFlipConfig {
    pub fn from_params(params: &ParamBag) -> Result<Self> {
        Ok(Self {
            rfp_mode: FootprintMode::from_params(params)?,
            maxshift: params.get_maxshift()?,
            nozero: params.get_bool("nozero")?.unwrap_or(false),
            flip: None,
        })
    }

    pub fn rotate_translate(&self) -> RotateTranslateConfig {
        RotateTranslateConfig {
            rfp_mode: self.rfp_mode,
            maxshift: self.maxshift,
            nozero: self.nozero,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExhaustiveConfig {
    /// Largest translation radius; `None` selects `nx / 8`. Must be ≥ 2.
    pub maxshift: Option<usize>,
    #[serde(skip)]
    pub flip: FlipReference,
}

impl ExhaustiveConfig {
    pub fn from_params(params: &ParamBag) -> Result<Self> {
        let config = Self {
            maxshift: params.get_maxshift()?,
            flip: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.maxshift {
            Some(m) if m < 2 => Err(AlignError::InvalidConfig(format!(
                "maxshift must be at least 2, got {m}"
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowExhaustiveConfig {
    /// Largest translation radius; `None` selects `nx / 10`.
    pub maxshift: Option<usize>,
    /// Angular step in degrees; `None` selects `atan2(2, nx)`.
    pub angstep: Option<f64>,
    /// Translation step of the fine stage, in pixels.
    pub transtep: f64,
    #[serde(skip)]
    pub flip: FlipReference,
}

impl Default for SlowExhaustiveConfig {
    fn default() -> Self {
        Self {
            maxshift: None,
            angstep: None,
            transtep: 1.0,
            flip: None,
        }
    }
}

impl SlowExhaustiveConfig {
    pub fn from_params(params: &ParamBag) -> Result<Self> {
        let config = Self {
            maxshift: params.get_maxshift()?,
            angstep: params.get_f64("angstep")?,
            transtep: params.get_f64("transtep")?.unwrap_or(1.0),
            flip: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.transtep > 0.0) {
            return Err(AlignError::InvalidConfig(format!(
                "transtep must be > 0, got {}",
                self.transtep
            )));
        }
        if let Some(a) = self.angstep {
            if !(a > 0.0) {
                return Err(AlignError::InvalidConfig(format!(
                    "angstep must be > 0, got {a}"
                )));
            }
        }
        Ok(())
    }
}

/// Objective evaluated by the refiner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineMode {
    /// Transform a working copy and score it with the comparator.
    #[default]
    General,
    /// Correlate normalized copies directly, skipping the comparator.
    Fast,
}

impl RefineMode {
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 | 1 => Ok(Self::General),
            2 => Ok(Self::Fast),
            other => Err(AlignError::InvalidConfig(format!(
                "mode must be 0, 1 or 2, got {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    pub mode: RefineMode,
    pub maxiter: usize,
    pub precision: f64,
    pub stepx: f64,
    pub stepy: f64,
    /// Initial angular step in degrees.
    pub stepaz: f64,
    /// Starting transform; identity when absent.
    pub seed: Option<Transform>,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            mode: RefineMode::General,
            maxiter: DEFAULT_REFINE_MAXITER,
            precision: DEFAULT_REFINE_PRECISION,
            stepx: DEFAULT_REFINE_STEP_X,
            stepy: DEFAULT_REFINE_STEP_Y,
            stepaz: DEFAULT_REFINE_STEP_AZ,
            seed: None,
        }
    }
}

impl RefineConfig {
    pub fn from_params(params: &ParamBag) -> Result<Self> {
        let d = Self::default();
        let maxiter = match params.get_i64("maxiter")? {
            None => d.maxiter,
            Some(v) => usize::try_from(v).map_err(|_| {
                AlignError::InvalidConfig(format!("maxiter must be positive, got {v}"))
            })?,
        };
        let config = Self {
            mode: params
                .get_i64("mode")?
                .map_or(Ok(d.mode), RefineMode::from_code)?,
            maxiter,
            precision: params.get_f64("precision")?.unwrap_or(d.precision),
            stepx: params.get_f64("stepx")?.unwrap_or(d.stepx),
            stepy: params.get_f64("stepy")?.unwrap_or(d.stepy),
            stepaz: params.get_f64("stepaz")?.unwrap_or(d.stepaz),
            seed: params.get_seed()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.precision > 0.0) {
            return Err(AlignError::InvalidConfig(format!(
                "precision must be > 0, got {}",
                self.precision
            )));
        }
        if self.maxiter == 0 {
            return Err(AlignError::InvalidConfig("maxiter must be > 0".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry table
// ---------------------------------------------------------------------------

/// Every registered strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignerKind {
    Translational,
    Rotational,
    RotatePrecenter,
    RotateTranslate,
    RotateFlip,
    RotateTranslateFlip,
    RtfExhaustive,
    RtfSlowExhaustive,
    Refine,
}

/// One recognized parameter and its default, for listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamInfo {
    pub key: &'static str,
    pub default: &'static str,
    pub help: &'static str,
}

const fn param(key: &'static str, default: &'static str, help: &'static str) -> ParamInfo {
    ParamInfo { key, default, help }
}

const P_MAXSHIFT: ParamInfo = param("maxshift", "nx/8", "largest shift searched per axis");
const P_NOZERO: ParamInfo = param("nozero", "0", "ignore the zero-shift peak");
const P_RFP: ParamInfo = param("rfp_mode", "0", "footprint: 0 autocorr, 1 raw autocorr, 2 amplitude");

const TRANSLATIONAL_PARAMS: &[ParamInfo] = &[
    P_MAXSHIFT,
    P_NOZERO,
    param("intonly", "0", "round self-alignment shifts"),
];
const ROTATIONAL_PARAMS: &[ParamInfo] = &[P_RFP];
const ROTATE_TRANSLATE_PARAMS: &[ParamInfo] = &[P_RFP, P_MAXSHIFT, P_NOZERO];
const EXHAUSTIVE_PARAMS: &[ParamInfo] = &[param("maxshift", "nx/8", "largest translation radius, >= 2")];
const SLOW_EXHAUSTIVE_PARAMS: &[ParamInfo] = &[
    param("maxshift", "nx/10", "largest translation radius"),
    param("angstep", "atan2(2,nx)", "angular step in degrees"),
    param("transtep", "1.0", "fine translation step"),
];
const REFINE_PARAMS: &[ParamInfo] = &[
    param("mode", "0", "0/1 general, 2 fast correlation"),
    param("maxiter", "28", "iteration cap"),
    param("precision", "0.04", "simplex size to stop at"),
    param("stepx", "1.0", "initial x step"),
    param("stepy", "1.0", "initial y step"),
    param("stepaz", "5.0", "initial angle step in degrees"),
    param("seed", "identity", "alpha,tx,ty[,mirror]"),
];

impl AlignerKind {
    pub const ALL: [AlignerKind; 9] = [
        Self::Translational,
        Self::Rotational,
        Self::RotatePrecenter,
        Self::RotateTranslate,
        Self::RotateFlip,
        Self::RotateTranslateFlip,
        Self::RtfExhaustive,
        Self::RtfSlowExhaustive,
        Self::Refine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Translational => "translational",
            Self::Rotational => "rotational",
            Self::RotatePrecenter => "rotate_precenter",
            Self::RotateTranslate => "rotate_translate",
            Self::RotateFlip => "rotate_flip",
            Self::RotateTranslateFlip => "rotate_translate_flip",
            Self::RtfExhaustive => "rtf_exhaustive",
            Self::RtfSlowExhaustive => "rtf_slow_exhaustive",
            Self::Refine => "refine",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Translational => "translation by cross-correlation peak search",
            Self::Rotational => "rotation from a translation-invariant footprint",
            Self::RotatePrecenter => "rotation of pre-centered images by ring correlation",
            Self::RotateTranslate => "rotation then translation, both 180° branches",
            Self::RotateFlip => "rotation against the reference and its mirror",
            Self::RotateTranslateFlip => "rotation and translation with mirror handling",
            Self::RtfExhaustive => "coarse-to-fine exhaustive search over rings",
            Self::RtfSlowExhaustive => "coarse-to-fine exhaustive search by resampling",
            Self::Refine => "local simplex refinement of a seed transform",
        }
    }

    pub fn params(self) -> &'static [ParamInfo] {
        match self {
            Self::Translational => TRANSLATIONAL_PARAMS,
            Self::Rotational | Self::RotateFlip => ROTATIONAL_PARAMS,
            Self::RotatePrecenter => &[],
            Self::RotateTranslate | Self::RotateTranslateFlip => ROTATE_TRANSLATE_PARAMS,
            Self::RtfExhaustive => EXHAUSTIVE_PARAMS,
            Self::RtfSlowExhaustive => SLOW_EXHAUSTIVE_PARAMS,
            Self::Refine => REFINE_PARAMS,
        }
    }
}

impl fmt::Display for AlignerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlignerKind {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| AlignError::UnknownAligner(s.to_string()))
    }
}

/// A fully typed strategy selection, tagged by strategy name in TOML.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum AlignerConfig {
    Translational(TranslationalConfig),
    Rotational(RotationalConfig),
    RotatePrecenter(PrecenterConfig),
    RotateTranslate(RotateTranslateConfig),
    RotateFlip(RotateFlipConfig),
    RotateTranslateFlip(RotateTranslateFlipConfig),
    RtfExhaustive(ExhaustiveConfig),
    RtfSlowExhaustive(SlowExhaustiveConfig),
    Refine(RefineConfig),
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self::RotateTranslateFlip(RotateTranslateFlipConfig::default())
    }
}

impl AlignerConfig {
    /// Build the typed config for `kind` from untyped options. Unknown keys
    /// are ignored.
    pub fn from_params(kind: AlignerKind, params: &ParamBag) -> Result<Self> {
        Ok(match kind {
            AlignerKind::Translational => Self::Translational(TranslationalConfig::from_params(params)?),
            AlignerKind::Rotational => Self::Rotational(RotationalConfig::from_params(params)?),
            AlignerKind::RotatePrecenter => Self::RotatePrecenter(PrecenterConfig {}),
            AlignerKind::RotateTranslate => {
                Self::RotateTranslate(RotateTranslateConfig::from_params(params)?)
            }
            AlignerKind::RotateFlip => Self::RotateFlip(RotateFlipConfig::from_params(params)?),
            AlignerKind::RotateTranslateFlip => {
                Self::RotateTranslateFlip(RotateTranslateFlipConfig::from_params(params)?)
            }
            AlignerKind::RtfExhaustive => Self::RtfExhaustive(ExhaustiveConfig::from_params(params)?),
            AlignerKind::RtfSlowExhaustive => {
                Self::RtfSlowExhaustive(SlowExhaustiveConfig::from_params(params)?)
            }
            AlignerKind::Refine => Self::Refine(RefineConfig::from_params(params)?),
        })
    }

    pub fn kind(&self) -> AlignerKind {
        match self {
            Self::Translational(_) => AlignerKind::Translational,
            Self::Rotational(_) => AlignerKind::Rotational,
            Self::RotatePrecenter(_) => AlignerKind::RotatePrecenter,
            Self::RotateTranslate(_) => AlignerKind::RotateTranslate,
            Self::RotateFlip(_) => AlignerKind::RotateFlip,
            Self::RotateTranslateFlip(_) => AlignerKind::RotateTranslateFlip,
            Self::RtfExhaustive(_) => AlignerKind::RtfExhaustive,
            Self::RtfSlowExhaustive(_) => AlignerKind::RtfSlowExhaustive,
            Self::Refine(_) => AlignerKind::Refine,
        }
    }

    /// Attach a precomputed mirrored reference to the strategies that use one.
    pub fn set_flip(&mut self, flip: Arc<Image>) {
        match self {
            Self::RotateFlip(c) => c.flip = Some(flip),
            Self::RotateTranslateFlip(c) => c.flip = Some(flip),
            Self::RtfExhaustive(c) => c.flip = Some(flip),
            Self::RtfSlowExhaustive(c) => c.flip = Some(flip),
            _ => {}
        }
    }
}
