use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Image size mismatch: moving {moving:?} vs reference {reference:?}")]
    DimensionMismatch {
        moving: [usize; 3],
        reference: [usize; 3],
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown aligner: {0}")]
    UnknownAligner(String),

    #[error("Unknown comparator: {0}")]
    UnknownComparator(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, AlignError>;
