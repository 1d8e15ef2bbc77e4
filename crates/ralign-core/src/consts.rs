/// Minimum sample count (nx*ny*nz) to use lane-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum image count to spread batch alignment across Rayon workers.
pub const PARALLEL_IMAGE_THRESHOLD: usize = 4;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-12;

/// Metadata key of the in-plane alignment transform.
pub const XFORM_ALIGN_2D: &str = "xform.align2d";

/// Metadata key of the volumetric (translation-only) alignment transform.
pub const XFORM_ALIGN_3D: &str = "xform.align3d";

/// Default translational search window is `extent / MAXSHIFT_DIVISOR`.
pub const MAXSHIFT_DIVISOR: usize = 8;

/// Default slow exhaustive search window is `nx / SLOW_MAXSHIFT_DIVISOR`.
pub const SLOW_MAXSHIFT_DIVISOR: usize = 10;

/// Downsampling factor of the coarse stage in exhaustive searches.
pub const SHRINK_FACTOR: usize = 2;

/// Innermost ring radius used by every polar unwrap.
pub const UNWRAP_INNER_RADIUS: usize = 4;

/// Rings stop this many pixels short of the image edge.
pub const UNWRAP_EDGE_MARGIN: usize = 2;

/// Half-width (pixels) of the full-resolution translation window searched
/// around the coarse exhaustive winner.
pub const REFINE_TRANSLATION_WINDOW: f64 = 3.0;

/// Number of angular steps searched on either side of the coarse angle in
/// the slow exhaustive fine stage.
pub const REFINE_ANGLE_STEPS: i32 = 6;

/// Angular stride (in units of `angstep`) of the slow exhaustive coarse stage.
pub const COARSE_ANGLE_STRIDE: f64 = 4.0;

/// Outer ring radius of the precentered rotational aligner, as a fraction of ny.
pub const PRECENTER_OUTER_RADIUS_FRACTION: f64 = 7.0 / 16.0;

/// Angular oversampling of the precentered rotational aligner.
pub const PRECENTER_ANGULAR_OVERSAMPLE: f64 = 1.5;

/// Default Nelder-Mead initial step along x (pixels).
pub const DEFAULT_REFINE_STEP_X: f64 = 1.0;

/// Default Nelder-Mead initial step along y (pixels).
pub const DEFAULT_REFINE_STEP_Y: f64 = 1.0;

/// Default Nelder-Mead initial step in angle (degrees).
pub const DEFAULT_REFINE_STEP_AZ: f64 = 5.0;

/// Simplex size below which the refine optimizer stops.
pub const DEFAULT_REFINE_PRECISION: f64 = 0.04;

/// Iteration cap of the refine optimizer.
pub const DEFAULT_REFINE_MAXITER: usize = 28;
