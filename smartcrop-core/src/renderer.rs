//! Crop rendering: sample, resize, enhance, encode, name.

use image::{DynamicImage, RgbaImage, imageops::FilterType};
use log::{Level, debug};
use serde::Serialize;
use smartcrop_utils::{
    CropMetadata, EnhancementSettings, MetadataContext, NamingContext, OutputOptions,
    QualityFilter, QualityResult, append_suffix_to_filename, apply_enhancements, encode_image,
    render_filename, timing_guard, unix_timestamp_millis,
};
use thiserror::Error;

use crate::{
    cropper::{CropSettings, compute_crop_rect},
    face::FaceRecord,
    normalize::PixelBoundingBox,
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("source image is empty ({width}x{height})")]
    EmptySource { width: u32, height: u32 },
    #[error("failed to encode crop: {0}")]
    Encode(#[from] image::ImageError),
}

/// An encoded crop, owned by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CropResult {
    pub source_image_id: String,
    pub face_id: usize,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityResult>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Identifies the face being rendered and the names used for its filename.
#[derive(Debug, Clone, Copy)]
pub struct RenderTarget<'a> {
    pub image_id: &'a str,
    /// Source file stem.
    pub original_name: &'a str,
    pub csv_name: Option<&'a str>,
    pub face: &'a FaceRecord,
}

/// Cut the crop for `face` out of `source` and resample it to the output size.
///
/// Sampling uses the clamped in-bounds rectangle and a bilinear filter, stretching to
/// exactly `output_width` x `output_height` without letterboxing. Enhancements are
/// applied to the resampled raster when given.
pub fn render_crop(
    source: &DynamicImage,
    face: &PixelBoundingBox,
    settings: &CropSettings,
    enhancement: Option<&EnhancementSettings>,
) -> Result<RgbaImage, RenderError> {
    let (img_w, img_h) = (source.width(), source.height());
    let rect = compute_crop_rect(face, settings, img_w, img_h);
    let sample = rect.sampling_rect(img_w, img_h).ok_or(RenderError::EmptySource {
        width: img_w,
        height: img_h,
    })?;

    let cropped = source.crop_imm(sample.x, sample.y, sample.width, sample.height);
    let mut output = cropped
        .resize_exact(
            settings.output_width.max(1),
            settings.output_height.max(1),
            FilterType::Triangle,
        )
        .to_rgba8();

    if let Some(enhancement) = enhancement.filter(|e| !e.is_noop()) {
        apply_enhancements(&mut output, enhancement);
    }
    Ok(output)
}

/// Renders faces with fixed crop, enhancement and output settings.
#[derive(Debug, Clone)]
pub struct CropRenderer {
    settings: CropSettings,
    enhancement: Option<EnhancementSettings>,
    output: OutputOptions,
    quality_filter: QualityFilter,
}

impl CropRenderer {
    pub fn new(settings: CropSettings, enhancement: Option<EnhancementSettings>) -> Self {
        let output = OutputOptions {
            format: settings.output_format,
            jpeg_quality: settings.jpeg_quality_percent(),
            png_compression: settings.png_compression,
            metadata: settings.metadata.clone(),
        };
        Self {
            settings,
            enhancement,
            output,
            quality_filter: QualityFilter::default(),
        }
    }

    /// Use `filter` for the quality filename suffix.
    pub fn with_quality_filter(mut self, filter: QualityFilter) -> Self {
        self.quality_filter = filter;
        self
    }

    pub fn settings(&self) -> &CropSettings {
        &self.settings
    }

    /// Render, encode and name one face crop.
    pub fn render(
        &self,
        source: &DynamicImage,
        target: &RenderTarget<'_>,
    ) -> Result<CropResult, RenderError> {
        let _guard = timing_guard(
            format!("render {}#{}", target.image_id, target.face.id()),
            Level::Debug,
        );
        let face = target.face;
        let image = render_crop(
            source,
            face.bbox(),
            &self.settings,
            self.enhancement.as_ref(),
        )?;
        let (width, height) = image.dimensions();

        let metadata = MetadataContext {
            crop: Some(self.crop_metadata()),
            detection_score: Some(face.confidence()),
            quality: face.quality(),
        };
        let bytes = encode_image(&DynamicImage::ImageRgba8(image), &self.output, &metadata)?;

        let filename = self.filename(target, width, height);
        debug!(
            "{}: face {} -> {filename} ({} bytes)",
            target.image_id,
            face.id(),
            bytes.len()
        );

        Ok(CropResult {
            source_image_id: target.image_id.to_string(),
            face_id: face.id(),
            filename,
            width,
            height,
            quality: face.quality(),
            bytes,
        })
    }

    fn filename(&self, target: &RenderTarget<'_>, width: u32, height: u32) -> String {
        let ctx = NamingContext {
            original: target.original_name,
            index: target.face.id(),
            timestamp_millis: unix_timestamp_millis(),
            width,
            height,
            csv_name: target.csv_name,
            ext: self.settings.output_format.extension(),
        };
        let name = render_filename(&self.settings.naming_template, &ctx);
        match self
            .quality_filter
            .suffix_for(target.face.quality_or_unknown().level)
        {
            Some(suffix) => append_suffix_to_filename(&name, suffix),
            None => name,
        }
    }

    fn crop_metadata(&self) -> CropMetadata {
        CropMetadata {
            preset: self.settings.preset.clone(),
            output_width: self.settings.output_width,
            output_height: self.settings.output_height,
            face_height_pct: self.settings.face_height_pct,
            positioning_mode: self.settings.positioning_mode.to_string(),
            horizontal_offset: self.settings.horizontal_offset,
            vertical_offset: self.settings.vertical_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        detector::RawDetection,
        face::build_face_records,
        normalize::{RawBoundingBox, normalize},
    };
    use image::Rgba;
    use smartcrop_utils::{ImageFormatHint, Quality};

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        }))
    }

    fn settings(w: u32, h: u32) -> CropSettings {
        CropSettings {
            output_width: w,
            output_height: h,
            ..CropSettings::default()
        }
    }

    fn face_at(img: &DynamicImage, raw: RawBoundingBox) -> FaceRecord {
        build_face_records("img", img, &[RawDetection::new(raw, 0.9)], true)
            .pop()
            .expect("face")
    }

    #[test]
    fn output_has_exact_requested_size() {
        let img = gradient(640, 480);
        let bbox = normalize(Some(&RawBoundingBox::new(300.0, 200.0, 80.0, 100.0)), 640, 480)
            .expect("box");
        for (w, h) in [(400, 400), (413, 531), (600, 200)] {
            let out = render_crop(&img, &bbox, &settings(w, h), None).expect("render");
            assert_eq!(out.dimensions(), (w, h));
        }
    }

    #[test]
    fn crop_larger_than_image_still_renders() {
        let img = gradient(50, 40);
        let bbox = normalize(Some(&RawBoundingBox::new(0.0, 0.0, 10.0, 10.0)), 50, 40)
            .expect("box");
        let tight = CropSettings {
            face_height_pct: 5,
            ..settings(300, 300)
        };
        let out = render_crop(&img, &bbox, &tight, None).expect("render");
        assert_eq!(out.dimensions(), (300, 300));
    }

    #[test]
    fn enhancement_changes_pixels() {
        let img = gradient(200, 200);
        let bbox = normalize(Some(&RawBoundingBox::new(50.0, 50.0, 100.0, 100.0)), 200, 200)
            .expect("box");
        let plain = render_crop(&img, &bbox, &settings(64, 64), None).expect("plain");
        let brighter = EnhancementSettings {
            exposure_stops: 1.0,
            ..EnhancementSettings::default()
        };
        let enhanced =
            render_crop(&img, &bbox, &settings(64, 64), Some(&brighter)).expect("enhanced");
        assert_ne!(plain, enhanced);
        assert!(enhanced.get_pixel(10, 10)[2] > plain.get_pixel(10, 10)[2]);
    }

    #[test]
    fn render_encodes_and_names_crop() {
        let img = gradient(320, 240);
        let face = face_at(&img, RawBoundingBox::new(100.0, 60.0, 80.0, 100.0));
        let renderer = CropRenderer::new(
            CropSettings {
                output_format: ImageFormatHint::Jpeg,
                ..settings(120, 160)
            },
            None,
        );
        let result = renderer
            .render(
                &img,
                &RenderTarget {
                    image_id: "img-1",
                    original_name: "portrait",
                    csv_name: None,
                    face: &face,
                },
            )
            .expect("render");
        assert_eq!(result.filename, "portrait_face_1.jpg");
        assert_eq!(result.face_id, 1);
        assert_eq!(&result.bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&result.bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (120, 160));
    }

    #[test]
    fn quality_suffix_is_appended() {
        let img = gradient(320, 240);
        let face = face_at(&img, RawBoundingBox::new(100.0, 60.0, 80.0, 100.0));
        let level = face.quality().map(|q| q.level).expect("scored");
        let renderer = CropRenderer::new(
            CropSettings {
                naming_template: "{csv_name}_{index}".into(),
                ..settings(64, 64)
            },
            None,
        )
        .with_quality_filter(QualityFilter {
            suffix_enabled: true,
            ..QualityFilter::default()
        });
        let result = renderer
            .render(
                &img,
                &RenderTarget {
                    image_id: "img-1",
                    original_name: "portrait",
                    csv_name: Some("jane"),
                    face: &face,
                },
            )
            .expect("render");
        let suffix = match level {
            Quality::High => "_highq",
            Quality::Medium => "_medq",
            Quality::Low => "_lowq",
            Quality::Unknown => "_unknownq",
        };
        assert_eq!(result.filename, format!("jane_1{suffix}.png"));
    }
}
