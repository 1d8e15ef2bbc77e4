use ndarray::Array3;

use crate::error::{AlignError, Result};
use crate::image::Image;

/// Downsample each xy plane by an integer `factor`, replacing every
/// `factor × factor` block by its median. Trailing rows/columns that do not
/// fill a block are dropped.
pub fn median_shrink(image: &Image, factor: usize) -> Result<Image> {
    if factor == 0 {
        return Err(AlignError::InvalidConfig(
            "shrink factor must be at least 1".into(),
        ));
    }
    let (nz, ny, nx) = image.data.dim();
    let (sx, sy) = (nx / factor, ny / factor);
    if sx == 0 || sy == 0 {
        return Err(AlignError::InvalidInput(format!(
            "cannot shrink {nx}x{ny} by {factor}"
        )));
    }

    let mut block = Vec::with_capacity(factor * factor);
    let mut out = Array3::<f32>::zeros((nz, sy, sx));
    for z in 0..nz {
        for y in 0..sy {
            for x in 0..sx {
                block.clear();
                for dy in 0..factor {
                    for dx in 0..factor {
                        block.push(image.data[[z, y * factor + dy, x * factor + dx]]);
                    }
                }
                out[[z, y, x]] = median(&mut block);
            }
        }
    }
    Ok(image.with_data(out))
}

fn median(values: &mut [f32]) -> f32 {
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}
