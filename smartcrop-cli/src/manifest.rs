//! Detection manifest: face boxes produced ahead of time by an external detector.
//!
//! ```json
//! {
//!   "images": {
//!     "portraits/ada.jpg": [
//!       { "originX": 0.41, "originY": 0.22, "width": 0.18, "height": 0.27, "confidence": 0.97 }
//!     ]
//!   },
//!   "names": { "portraits/ada.jpg": "Ada Lovelace" }
//! }
//! ```
//!
//! Keys are matched against the trailing components of each image path, so both bare
//! file names and paths relative to the input directory work. Boxes may be normalized or
//! in pixels. A face missing any of the four box fields has no usable geometry and is
//! dropped later by the normalizer.

use std::{
    collections::HashMap,
    fs,
    path::{Component, Path},
};

use anyhow::{Context, Result};
use image::DynamicImage;
use log::{debug, info};
use serde::Deserialize;
use smartcrop_core::{DetectionError, FaceDetector, RawBoundingBox, RawDetection};

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    images: HashMap<String, Vec<ManifestFace>>,
    #[serde(default)]
    names: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFace {
    origin_x: Option<f32>,
    origin_y: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl From<&ManifestFace> for RawDetection {
    fn from(face: &ManifestFace) -> Self {
        let bbox = match (face.origin_x, face.origin_y, face.width, face.height) {
            (Some(x), Some(y), Some(w), Some(h)) => Some(RawBoundingBox::new(x, y, w, h)),
            _ => None,
        };
        RawDetection {
            bbox,
            confidence: face.confidence,
        }
    }
}

/// [`FaceDetector`] backed by a detection manifest.
#[derive(Debug, Default)]
pub struct ManifestDetector {
    images: HashMap<String, Vec<RawDetection>>,
    names: HashMap<String, String>,
}

impl ManifestDetector {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read detection manifest {}", path.display()))?;
        let detector = Self::from_json(&contents)
            .with_context(|| format!("failed to parse detection manifest {}", path.display()))?;
        info!(
            "Loaded detections for {} image(s) from {}",
            detector.images.len(),
            path.display()
        );
        Ok(detector)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: ManifestFile = serde_json::from_str(json)?;
        let images = file
            .images
            .into_iter()
            .map(|(key, faces)| {
                let detections = faces.iter().map(RawDetection::from).collect();
                (normalize_key(&key), detections)
            })
            .collect();
        let names = file
            .names
            .into_iter()
            .map(|(key, name)| (normalize_key(&key), name))
            .collect();
        Ok(Self { images, names })
    }

    /// Externally supplied name for the image at `path`.
    pub fn name_for(&self, path: &Path) -> Option<&str> {
        lookup(&self.names, path).map(String::as_str)
    }

    fn detections_for(&self, path: &Path) -> Option<&Vec<RawDetection>> {
        lookup(&self.images, path)
    }
}

impl FaceDetector for ManifestDetector {
    fn detect(
        &self,
        image_id: &str,
        _image: &DynamicImage,
    ) -> Result<Vec<RawDetection>, DetectionError> {
        match self.detections_for(Path::new(image_id)) {
            Some(detections) => Ok(detections.clone()),
            None => {
                debug!("{image_id}: not in detection manifest");
                Ok(Vec::new())
            }
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .replace('\\', "/")
        .trim_start_matches("./")
        .to_string()
}

/// Longest trailing run of `path` components present in `map`.
fn lookup<'a, T>(map: &'a HashMap<String, T>, path: &Path) -> Option<&'a T> {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (0..parts.len()).find_map(|start| map.get(&parts[start..].join("/")))
}
