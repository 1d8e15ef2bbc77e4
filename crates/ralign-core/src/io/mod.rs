pub mod image_io;

pub use image_io::{load_image, save_image, save_png, save_tiff};
