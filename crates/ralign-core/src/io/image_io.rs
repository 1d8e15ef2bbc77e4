use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::{AlignError, Result};
use crate::image::{require_2d, Image};

/// Save a 2-D image as 16-bit grayscale TIFF. Samples are clamped to `[0, 1]`.
pub fn save_tiff(image: &Image, path: &Path) -> Result<()> {
    require_2d(image, "TIFF output")?;
    let (h, w) = (image.ny(), image.nx());

    let mut pixels: Vec<u16> = Vec::with_capacity(h * w);
    for &v in image.plane().iter() {
        pixels.push((v.clamp(0.0, 1.0) * 65535.0) as u16);
    }

    let img = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or_else(|| AlignError::InvalidInput("pixel buffer does not match dimensions".into()))?;
    img.save(path)?;
    Ok(())
}

/// Save a 2-D image as 8-bit grayscale PNG.
pub fn save_png(image: &Image, path: &Path) -> Result<()> {
    require_2d(image, "PNG output")?;
    let plane = image.plane();
    let (h, w) = plane.dim();

    let mut img = GrayImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let val = (plane[[row, col]].clamp(0.0, 1.0) * 255.0) as u8;
            img.put_pixel(col as u32, row as u32, Luma([val]));
        }
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save an image, choosing the format from the file extension.
pub fn save_image(image: &Image, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(image, path),
        _ => save_tiff(image, path),
    }
}

/// Load any grayscale-convertible image file, scaled to `[0, 1]`.
pub fn load_image(path: &Path) -> Result<Image> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let mut data = Array2::<f32>::zeros((h as usize, w as usize));

    for (col, row, pixel) in gray.enumerate_pixels() {
        data[[row as usize, col as usize]] = pixel.0[0] as f32 / 65535.0;
    }

    Ok(Image::from_2d(data))
}
