//! Pixel operators the aligners are built from.

pub mod polar;
pub mod shrink;
pub mod warp;

pub use polar::{rotate_columns, subtract_row_means, unwrap, Span};
pub use shrink::median_shrink;
pub use warp::{apply_transform, bilinear_sample, flip_x, rotate_180, trilinear_sample};
