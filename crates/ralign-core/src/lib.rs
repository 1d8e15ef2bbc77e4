pub mod error;
pub mod consts;
pub mod image;
pub mod transform;
pub mod ops;
pub mod correlation;
pub mod compute;
pub mod compare;
pub mod optimize;
pub mod align;
pub mod io;
pub mod stack;
pub mod job;
