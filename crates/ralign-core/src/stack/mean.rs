use ndarray::Array3;

use crate::error::{AlignError, Result};
use crate::image::{require_same_size, Image};

/// Average images sample by sample. All images must share one size; the
/// result has no metadata.
pub fn mean_stack(images: &[Image]) -> Result<Image> {
    let first = images
        .first()
        .ok_or_else(|| AlignError::InvalidInput("cannot average an empty image list".into()))?;

    let mut sum = Array3::<f32>::zeros(first.data.dim());
    for image in images {
        require_same_size(first, image)?;
        sum += &image.data;
    }
    sum /= images.len() as f32;

    Ok(Image::new(sum))
}
