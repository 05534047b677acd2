//! Conversion of untrusted detector boxes into validated pixel rectangles.
//!
//! [`normalize`] is the only way to obtain a [`PixelBoundingBox`], so every box that reaches
//! the positioner already satisfies `0 <= x`, `0 <= y`, `x + width <= image width`,
//! `y + height <= image height` and `width, height >= 1`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bounding box as reported by a detector.
///
/// Values may be normalized to `[0, 1]` or in pixels, and may be non-finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBoundingBox {
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
}

impl RawBoundingBox {
    pub const fn new(origin_x: f32, origin_y: f32, width: f32, height: f32) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    /// True when every value lies in the unit range the detector uses for relative boxes.
    pub fn is_normalized(&self) -> bool {
        let unit = 0.0..=1.0;
        unit.contains(&self.origin_x)
            && unit.contains(&self.origin_y)
            && self.width > 0.0
            && self.width <= 1.0
            && self.height > 0.0
            && self.height <= 1.0
    }

    fn finite_or_zero(self) -> Self {
        let f = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self::new(f(self.origin_x), f(self.origin_y), f(self.width), f(self.height))
    }
}

/// Why a detector box was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidBox {
    #[error("detector returned no bounding box")]
    Missing,
    #[error("bounding box is not finite after scaling to {image_width}x{image_height}")]
    NonFinite { image_width: u32, image_height: u32 },
    #[error("bounding box at ({x}, {y}) has no area inside the {image_width}x{image_height} image")]
    Empty {
        x: f32,
        y: f32,
        image_width: u32,
        image_height: u32,
    },
}

/// Face rectangle in source pixel coordinates, clamped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelBoundingBox {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl PixelBoundingBox {
    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Smallest whole-pixel rectangle `(x, y, width, height)` covering the box.
    pub fn pixel_rect(&self) -> (u32, u32, u32, u32) {
        let x0 = self.x.floor() as u32;
        let y0 = self.y.floor() as u32;
        let x1 = (self.x + self.width).ceil() as u32;
        let y1 = (self.y + self.height).ceil() as u32;
        (x0, y0, (x1 - x0).max(1), (y1 - y0).max(1))
    }

    pub fn as_raw(&self) -> RawBoundingBox {
        RawBoundingBox::new(self.x, self.y, self.width, self.height)
    }
}

/// Validate a detector box against an `image_width` x `image_height` raster.
///
/// Non-finite inputs are treated as zero. A box whose origin lies in `[0, 1]` and whose size
/// lies in `(0, 1]` is taken as relative and scaled by the image size; anything else is
/// taken as pixels. The origin is clamped into the image, then the size is clamped to at
/// least one pixel and at most the remaining extent. Boxes left with less than one pixel
/// of width or height are rejected.
pub fn normalize(
    raw: Option<&RawBoundingBox>,
    image_width: u32,
    image_height: u32,
) -> Result<PixelBoundingBox, InvalidBox> {
    let raw = raw.ok_or(InvalidBox::Missing)?.finite_or_zero();
    let (w_img, h_img) = (image_width as f32, image_height as f32);

    let (x, y, width, height) = if raw.is_normalized() {
        (
            raw.origin_x * w_img,
            raw.origin_y * h_img,
            raw.width * w_img,
            raw.height * h_img,
        )
    } else {
        (raw.origin_x, raw.origin_y, raw.width, raw.height)
    };

    if ![x, y, width, height].iter().all(|v| v.is_finite()) {
        return Err(InvalidBox::NonFinite {
            image_width,
            image_height,
        });
    }

    let x = x.clamp(0.0, w_img);
    let y = y.clamp(0.0, h_img);
    let width = width.max(1.0).min(w_img - x);
    let height = height.max(1.0).min(h_img - y);

    if width < 1.0 || height < 1.0 {
        return Err(InvalidBox::Empty {
            x,
            y,
            image_width,
            image_height,
        });
    }

    Ok(PixelBoundingBox {
        x,
        y,
        width,
        height,
    })
}
