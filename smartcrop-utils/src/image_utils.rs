use std::{borrow::Cow, path::Path};

use anyhow::{Context, Result};
use image::{DynamicImage, RgbaImage, imageops::FilterType};

/// Load an image from disk into memory.
///
/// # Arguments
///
/// * `path` - The path to the image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    image::open(path_ref).with_context(|| format!("failed to open image {}", path_ref.display()))
}

/// Dimensions that fit `(width, height)` inside a `max_dim` square while keeping the aspect ratio.
///
/// Each side is at least one pixel.
pub fn fit_within(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dim || longest == 0 {
        return (width, height);
    }
    let scale = max_dim as f64 / longest as f64;
    let w = (width as f64 * scale).round().max(1.0) as u32;
    let h = (height as f64 * scale).round().max(1.0) as u32;
    (w, h)
}

/// Downscale `img` with a triangle filter when its longer side exceeds `max_dim`.
///
/// Neither side shrinks below `min_side` (or its original length, if shorter), so thin
/// strips keep their aspect only approximately.
pub fn downscale_to_fit(img: &RgbaImage, max_dim: u32, min_side: u32) -> Cow<'_, RgbaImage> {
    let (w, h) = img.dimensions();
    let (nw, nh) = fit_within(w, h, max_dim);
    let (nw, nh) = (nw.max(min_side.min(w)), nh.max(min_side.min(h)));
    if (nw, nh) == (w, h) {
        Cow::Borrowed(img)
    } else {
        Cow::Owned(image::imageops::resize(img, nw, nh, FilterType::Triangle))
    }
}
