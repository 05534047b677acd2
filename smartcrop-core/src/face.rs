//! Face records built from detector output.

use image::DynamicImage;
use log::{debug, warn};
use serde::Serialize;
use smartcrop_utils::{QualityResult, score_region, timing_guard};

use crate::{
    detector::RawDetection,
    normalize::{PixelBoundingBox, normalize},
};

/// One detected face. Only the selection flag changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceRecord {
    id: usize,
    #[serde(rename = "box")]
    bbox: PixelBoundingBox,
    confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<QualityResult>,
    selected: bool,
}

impl FaceRecord {
    /// 1-based position among the faces kept for an image.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn bbox(&self) -> &PixelBoundingBox {
        &self.bbox
    }

    /// Detector confidence clamped to `[0, 1]`.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn quality(&self) -> Option<QualityResult> {
        self.quality
    }

    /// Quality for ranking; unscored faces count as unknown.
    pub fn quality_or_unknown(&self) -> QualityResult {
        self.quality.unwrap_or(QualityResult::UNKNOWN)
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

/// Score the sharpness of the face region of `image`.
pub fn score_face(image: &DynamicImage, bbox: &PixelBoundingBox) -> QualityResult {
    let (x, y, w, h) = bbox.pixel_rect();
    let region = image.crop_imm(x, y, w, h).to_rgba8();
    score_region(&region)
}

/// Normalize every detection against `image` and build the face list.
///
/// Invalid boxes are logged and dropped; surviving faces are numbered from 1 and start
/// selected. With `score_quality` each face region is scored.
pub fn build_face_records(
    image_id: &str,
    image: &DynamicImage,
    detections: &[RawDetection],
    score_quality: bool,
) -> Vec<FaceRecord> {
    let _guard = timing_guard(format!("build_face_records({image_id})"), log::Level::Debug);
    let (width, height) = (image.width(), image.height());
    let mut faces = Vec::with_capacity(detections.len());

    for (index, detection) in detections.iter().enumerate() {
        let bbox = match normalize(detection.bbox.as_ref(), width, height) {
            Ok(bbox) => bbox,
            Err(err) => {
                warn!("{image_id}: dropping detection {}: {err}", index + 1);
                continue;
            }
        };
        let confidence = if detection.confidence.is_finite() {
            detection.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let quality = score_quality.then(|| score_face(image, &bbox));
        faces.push(FaceRecord {
            id: faces.len() + 1,
            bbox,
            confidence,
            quality,
            selected: true,
        });
    }

    debug!(
        "{image_id}: kept {} of {} detection(s)",
        faces.len(),
        detections.len()
    );
    faces
}
