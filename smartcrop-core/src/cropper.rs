//! Smart-crop positioning.
//!
//! The crop is scale-based: the source rectangle is sized so that, once resampled to the
//! output canvas, the face occupies `face_height_pct` of the output height. The rectangle
//! keeps the output aspect ratio, is placed according to [`PositioningMode`], and is then
//! clamped so its origin never leaves the image. When the crop is larger than the image
//! the origin floors at zero and [`SourceRect::sampling_rect`] shrinks the sampled area.

use std::{fmt, str::FromStr};

use log::warn;
use serde::{Deserialize, Serialize};
use smartcrop_utils::{
    ImageFormatHint, MetadataSettings, PngCompression, config::CropSettings as PersistedCrop,
    jpeg_quality_from_fraction, naming::DEFAULT_TEMPLATE,
};

use crate::{normalize::PixelBoundingBox, presets::preset_by_name};

/// Fraction of the face height, measured from the top of the box, where the eyes sit.
pub const EYE_LINE_FRACTION: f32 = 0.35;

/// How to place the face within the crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositioningMode {
    /// Face center at crop center. Offsets are ignored.
    #[default]
    Center,
    /// Eye line on the upper third of the crop; horizontal offset still applies.
    RuleOfThirds,
    /// Face center shifted by both offsets.
    Custom,
}

impl PositioningMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::RuleOfThirds => "rule-of-thirds",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for PositioningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositioningMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "center" | "centre" => Ok(Self::Center),
            "rule-of-thirds" | "rule_of_thirds" | "ruleofthirds" | "thirds" => {
                Ok(Self::RuleOfThirds)
            }
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown positioning mode '{other}'")),
        }
    }
}

/// Validated crop settings. Never mutated by the core.
#[derive(Debug, Clone, PartialEq)]
pub struct CropSettings {
    /// Preset the output size came from, if any.
    pub preset: Option<String>,
    pub output_width: u32,
    pub output_height: u32,
    /// Face height as a percentage of the output height (1-100).
    pub face_height_pct: u32,
    pub positioning_mode: PositioningMode,
    /// Percent of half the crop width (-100..=100). Positive moves the crop right.
    pub horizontal_offset: i32,
    /// Percent of half the crop height (-100..=100). Positive moves the crop down.
    pub vertical_offset: i32,
    pub output_format: ImageFormatHint,
    /// JPEG quality in (0, 1].
    pub jpeg_quality: f32,
    pub png_compression: PngCompression,
    pub naming_template: String,
    pub metadata: MetadataSettings,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            preset: None,
            output_width: 400,
            output_height: 400,
            face_height_pct: 70,
            positioning_mode: PositioningMode::Center,
            horizontal_offset: 0,
            vertical_offset: 0,
            output_format: ImageFormatHint::Png,
            jpeg_quality: 0.9,
            png_compression: PngCompression::Default,
            naming_template: DEFAULT_TEMPLATE.to_string(),
            metadata: MetadataSettings::default(),
        }
    }
}

impl CropSettings {
    /// Build validated settings from the persisted document.
    ///
    /// A named preset other than `custom` supplies the output size. Unknown modes and
    /// formats fall back to their defaults with a warning, and numeric values are clamped.
    pub fn from_persisted(cfg: &PersistedCrop) -> Self {
        let preset = preset_by_name(&cfg.preset).filter(|p| !p.is_custom());
        let (output_width, output_height) = match preset {
            Some(p) => (p.width, p.height),
            None => (cfg.output_width, cfg.output_height),
        };
        let positioning_mode = cfg.positioning_mode.parse().unwrap_or_else(|err| {
            warn!("{err}; using center");
            PositioningMode::Center
        });
        let output_format = cfg.output_format.parse().unwrap_or_else(|err| {
            warn!("{err}; using png");
            ImageFormatHint::Png
        });
        let jpeg_quality = if cfg.jpeg_quality.is_finite() && cfg.jpeg_quality > 0.0 {
            cfg.jpeg_quality.min(1.0)
        } else {
            0.9
        };

        Self {
            preset: preset.map(|p| p.key()),
            output_width: output_width.max(1),
            output_height: output_height.max(1),
            face_height_pct: cfg.face_height_pct.clamp(1, 100),
            positioning_mode,
            horizontal_offset: cfg.horizontal_offset.clamp(-100, 100),
            vertical_offset: cfg.vertical_offset.clamp(-100, 100),
            output_format,
            jpeg_quality,
            png_compression: PngCompression::parse(&cfg.png_compression),
            naming_template: if cfg.naming_template.trim().is_empty() {
                DEFAULT_TEMPLATE.to_string()
            } else {
                cfg.naming_template.clone()
            },
            metadata: cfg.metadata.clone(),
        }
    }

    /// Encoder quality on the 1-100 scale.
    pub fn jpeg_quality_percent(&self) -> u8 {
        jpeg_quality_from_fraction(self.jpeg_quality)
    }
}

/// Crop rectangle in source coordinates. May extend past the image when the crop is
/// larger than the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Whole-pixel rectangle guaranteed to lie inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SamplingRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SourceRect {
    /// Clamp to whole pixels inside `img_w` x `img_h`.
    ///
    /// Each side becomes `min(round(dim), image_dim - origin)` and at least one pixel.
    /// Returns `None` only for an empty image.
    pub fn sampling_rect(&self, img_w: u32, img_h: u32) -> Option<SamplingRect> {
        if img_w == 0 || img_h == 0 {
            return None;
        }
        let clamp_origin = |v: f32, limit: u32| (v.max(0.0).floor() as u32).min(limit - 1);
        let clamp_extent = |v: f32, origin: u32, limit: u32| {
            let v = if v.is_finite() { v.round().max(1.0) } else { 1.0 };
            (v.min(u32::MAX as f32) as u32).min(limit - origin).max(1)
        };
        let x = clamp_origin(self.x, img_w);
        let y = clamp_origin(self.y, img_h);
        Some(SamplingRect {
            x,
            y,
            width: clamp_extent(self.width, x, img_w),
            height: clamp_extent(self.height, y, img_h),
        })
    }
}

/// Compute the source crop rectangle for `face` inside an `img_w` x `img_h` image.
pub fn compute_crop_rect(
    face: &PixelBoundingBox,
    settings: &CropSettings,
    img_w: u32,
    img_h: u32,
) -> SourceRect {
    let out_w = settings.output_width.max(1) as f32;
    let out_h = settings.output_height.max(1) as f32;
    let pct = settings.face_height_pct.clamp(1, 100) as f32 / 100.0;

    let scale = out_h * pct / face.height();
    let crop_w = out_w / scale;
    let crop_h = out_h / scale;

    let (face_cx, face_cy) = face.center();
    let h_shift = settings.horizontal_offset.clamp(-100, 100) as f32 / 100.0 * crop_w / 2.0;
    let v_shift = settings.vertical_offset.clamp(-100, 100) as f32 / 100.0 * crop_h / 2.0;

    let (crop_x, crop_y) = match settings.positioning_mode {
        PositioningMode::Center => (face_cx - crop_w / 2.0, face_cy - crop_h / 2.0),
        PositioningMode::RuleOfThirds => {
            let eye_line = face.y() + EYE_LINE_FRACTION * face.height();
            (face_cx + h_shift - crop_w / 2.0, eye_line - crop_h / 3.0)
        }
        PositioningMode::Custom => (
            face_cx + h_shift - crop_w / 2.0,
            face_cy + v_shift - crop_h / 2.0,
        ),
    };

    SourceRect {
        x: crop_x.min(img_w as f32 - crop_w).max(0.0),
        y: crop_y.min(img_h as f32 - crop_h).max(0.0),
        width: crop_w,
        height: crop_h,
    }
}
