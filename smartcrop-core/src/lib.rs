//! Face crop geometry, rendering and batch orchestration.
//!
//! Raw detector boxes are normalized into pixel space, positioned into a crop rectangle,
//! sampled, enhanced and encoded. The batch layer runs the whole pipeline over many
//! images with per-item failure isolation. The detection model itself is supplied by the
//! caller through [`FaceDetector`].

/// Parallel detect, select and render passes over many images.
pub mod batch;
/// Crop rectangle placement.
pub mod cropper;
/// Detector seam with timeout and retry.
pub mod detector;
/// Face records and quality scoring.
pub mod face;
/// Bounding box normalization.
pub mod normalize;
/// Standard crop size presets.
pub mod presets;
/// Crop sampling, encoding and naming.
pub mod renderer;
/// Undo/redo for face selection.
pub mod selection;

pub use crate::batch::{
    BatchItem, BatchOptions, BatchOrchestrator, BatchProgress, BatchReport, BatchStage,
    CancelToken, DetectionPass, ImageFaces, ItemReport, ItemStatus, RenderPass,
    apply_quality_rules,
};
pub use crate::cropper::{
    CropSettings, EYE_LINE_FRACTION, PositioningMode, SamplingRect, SourceRect,
    compute_crop_rect,
};
pub use crate::detector::{DetectionError, DetectionRunner, FaceDetector, RawDetection};
pub use crate::face::{FaceRecord, build_face_records, score_face};
pub use crate::normalize::{InvalidBox, PixelBoundingBox, RawBoundingBox, normalize};
pub use crate::presets::{CropPreset, preset_by_name, standard_presets};
pub use crate::renderer::{CropRenderer, CropResult, RenderError, RenderTarget, render_crop};
pub use crate::selection::{DEFAULT_HISTORY_DEPTH, SelectionHistory};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
