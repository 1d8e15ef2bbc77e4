pub mod simplex;

pub use simplex::{minimize, SimplexOptions, SimplexResult};
