//! Batch orchestration: detect, select and render across many images.
//!
//! Work is split into two passes so callers can inspect and change the selection in
//! between: [`BatchOrchestrator::detect_all`] loads, detects, normalizes and scores every
//! image, then [`BatchOrchestrator::render_selected`] renders the selected faces. Both
//! passes run on a rayon pool, isolate failures per item, report progress through an
//! optional callback and stop dispatching new items once the [`CancelToken`] is set.
//! [`BatchOrchestrator::run`] chains both passes with the quality rules in between.
//!
//! Images are decoded again for rendering rather than kept in memory between passes.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use image::DynamicImage;
use log::{Level, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use smartcrop_utils::{BatchSettings, QualityFilter, QualityResult, load_image, timing_guard};

use crate::{
    detector::DetectionRunner,
    face::{FaceRecord, build_face_records},
    renderer::{CropRenderer, CropResult, RenderTarget},
    selection::SelectionHistory,
};

/// One source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    pub id: String,
    pub path: PathBuf,
    /// File stem used for `{original}`.
    pub original_name: String,
    /// Externally supplied name used for `{csv_name}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_name: Option<String>,
}

impl BatchItem {
    /// Item whose id is the path and whose original name is the file stem.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let original_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "image".to_string());
        Self {
            id: path.display().to_string(),
            path,
            original_name,
            csv_name: None,
        }
    }

    pub fn with_csv_name(mut self, name: impl Into<String>) -> Self {
        self.csv_name = Some(name.into());
        self
    }
}

/// Per-item outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Detected {
        faces_detected: usize,
    },
    Completed {
        faces_detected: usize,
        faces_exported: usize,
        faces_failed: usize,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
    /// Not dispatched because the batch was cancelled.
    Cancelled,
}

impl ItemStatus {
    /// True for items that were handled without error, including skips.
    pub fn is_processed(&self) -> bool {
        matches!(
            self,
            Self::Detected { .. } | Self::Completed { .. } | Self::Skipped { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub id: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: ItemStatus,
}

/// Faces detected in one image.
#[derive(Debug, Clone)]
pub struct ImageFaces {
    pub item: BatchItem,
    pub dimensions: (u32, u32),
    pub faces: Vec<FaceRecord>,
}

impl ImageFaces {
    pub fn selected(&self) -> impl Iterator<Item = &FaceRecord> {
        self.faces.iter().filter(|f| f.is_selected())
    }
}

/// Output of [`BatchOrchestrator::detect_all`].
#[derive(Debug, Clone)]
pub struct DetectionPass {
    /// Successfully detected images, in input order.
    pub images: Vec<ImageFaces>,
    /// One report per input item, in input order.
    pub reports: Vec<ItemReport>,
}

/// Output of [`BatchOrchestrator::render_selected`].
#[derive(Debug, Clone)]
pub struct RenderPass {
    pub crops: Vec<CropResult>,
    pub reports: Vec<ItemReport>,
}

/// Shared cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStage {
    Detect,
    Render,
}

/// Progress event emitted after each item finishes a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    pub stage: BatchStage,
    pub completed: usize,
    pub total: usize,
    pub item_id: String,
}

type ProgressCallback = Arc<dyn Fn(BatchProgress) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Worker threads; 0 uses the global rayon pool.
    pub jobs: usize,
    pub continue_on_error: bool,
    /// Score face sharpness during detection.
    pub score_quality: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 0,
            continue_on_error: true,
            score_quality: true,
        }
    }
}

impl From<&BatchSettings> for BatchOptions {
    fn from(settings: &BatchSettings) -> Self {
        Self {
            jobs: settings.jobs,
            continue_on_error: settings.continue_on_error,
            score_quality: true,
        }
    }
}

/// Summary of a complete run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub images_total: usize,
    pub images_processed: usize,
    pub images_skipped: usize,
    pub images_failed: usize,
    pub images_cancelled: usize,
    pub faces_detected: usize,
    pub faces_exported: usize,
    pub faces_failed: usize,
    pub cancelled: bool,
    pub items: Vec<ItemReport>,
    pub crops: Vec<CropResult>,
}

impl BatchReport {
    pub fn new(items: Vec<ItemReport>, crops: Vec<CropResult>, cancelled: bool) -> Self {
        let mut report = Self {
            images_total: items.len(),
            images_processed: 0,
            images_skipped: 0,
            images_failed: 0,
            images_cancelled: 0,
            faces_detected: 0,
            faces_exported: 0,
            faces_failed: 0,
            cancelled,
            items: Vec::new(),
            crops,
        };
        for item in &items {
            if item.status.is_processed() {
                report.images_processed += 1;
            }
            match &item.status {
                ItemStatus::Detected { faces_detected } => {
                    report.faces_detected += faces_detected;
                }
                ItemStatus::Completed {
                    faces_detected,
                    faces_exported,
                    faces_failed,
                } => {
                    report.faces_detected += faces_detected;
                    report.faces_exported += faces_exported;
                    report.faces_failed += faces_failed;
                }
                ItemStatus::Skipped { .. } => report.images_skipped += 1,
                ItemStatus::Failed { .. } => report.images_failed += 1,
                ItemStatus::Cancelled => report.images_cancelled += 1,
                ItemStatus::Pending => {}
            }
        }
        report.items = items;
        report
    }
}

/// Deselect faces according to `filter`. Never selects a face.
///
/// Faces below the minimum tier are deselected (unknown quality is kept). When the image
/// has no `High` face and skipping is enabled, every face is deselected. With
/// auto-select, only the best face (tier, then raw score) may stay selected.
pub fn apply_quality_rules(filter: &QualityFilter, faces: &mut [FaceRecord]) {
    for face in faces.iter_mut() {
        if filter.should_skip(face.quality_or_unknown().level) {
            face.set_selected(false);
        }
    }

    let qualities: Vec<QualityResult> = faces.iter().map(FaceRecord::quality_or_unknown).collect();
    let best = filter.select_best_index(&qualities);

    if filter.should_skip_image(best.map(|idx| qualities[idx].level)) {
        faces.iter_mut().for_each(|f| f.set_selected(false));
        return;
    }

    if filter.auto_select
        && let Some(best) = best
    {
        for (idx, face) in faces.iter_mut().enumerate() {
            if idx != best {
                face.set_selected(false);
            }
        }
    }
}

/// Drives detection and rendering over a set of [`BatchItem`]s.
pub struct BatchOrchestrator {
    runner: DetectionRunner,
    renderer: CropRenderer,
    filter: QualityFilter,
    options: BatchOptions,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
}

impl BatchOrchestrator {
    pub fn new(runner: DetectionRunner, renderer: CropRenderer) -> Self {
        Self {
            runner,
            renderer,
            filter: QualityFilter::default(),
            options: BatchOptions::default(),
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    /// Use `filter` for selection rules and filename suffixes.
    pub fn with_quality_filter(mut self, filter: QualityFilter) -> Self {
        self.renderer = self.renderer.with_quality_filter(filter.clone());
        self.filter = filter;
        self
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(
        mut self,
        callback: impl Fn(BatchProgress) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Load, detect, normalize and score every item.
    pub fn detect_all(&self, items: &[BatchItem]) -> DetectionPass {
        let _guard = timing_guard(format!("detect_all({} items)", items.len()), Level::Info);
        let total = items.len();
        let completed = AtomicUsize::new(0);

        let outcomes: Vec<(ItemStatus, Option<ImageFaces>)> = self.install(|| {
            items
                .par_iter()
                .map(|item| {
                    if self.cancel.is_cancelled() {
                        return (ItemStatus::Cancelled, None);
                    }
                    let outcome = match self.detect_item(item) {
                        Ok(faces) => (
                            ItemStatus::Detected {
                                faces_detected: faces.faces.len(),
                            },
                            Some(faces),
                        ),
                        Err(error) => {
                            warn!("{}: {error}", item.id);
                            self.note_failure();
                            (ItemStatus::Failed { error }, None)
                        }
                    };
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.emit(BatchStage::Detect, done, total, &item.id);
                    outcome
                })
                .collect()
        });

        let mut images = Vec::new();
        let mut reports = Vec::with_capacity(items.len());
        for (item, (status, faces)) in items.iter().zip(outcomes) {
            reports.push(ItemReport {
                id: item.id.clone(),
                path: item.path.clone(),
                status,
            });
            images.extend(faces);
        }
        info!(
            "Detected faces in {} of {} image(s)",
            images.len(),
            items.len()
        );
        DetectionPass { images, reports }
    }

    /// Apply the quality rules to every image and record the result in `history`.
    pub fn apply_quality_rules(&self, images: &mut [ImageFaces], history: &mut SelectionHistory) {
        for image in images.iter_mut() {
            apply_quality_rules(&self.filter, &mut image.faces);
        }
        history.record(images);
    }

    /// Render every selected face.
    pub fn render_selected(&self, images: &[ImageFaces]) -> RenderPass {
        let _guard = timing_guard(format!("render_selected({} images)", images.len()), Level::Info);
        let total = images.len();
        let completed = AtomicUsize::new(0);

        let outcomes: Vec<(ItemReport, Vec<CropResult>)> = self.install(|| {
            images
                .par_iter()
                .map(|image| {
                    let (status, crops) = if self.cancel.is_cancelled() {
                        (ItemStatus::Cancelled, Vec::new())
                    } else {
                        let outcome = self.render_image(image);
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        self.emit(BatchStage::Render, done, total, &image.item.id);
                        outcome
                    };
                    let report = ItemReport {
                        id: image.item.id.clone(),
                        path: image.item.path.clone(),
                        status,
                    };
                    (report, crops)
                })
                .collect()
        });

        let mut crops = Vec::new();
        let mut reports = Vec::with_capacity(outcomes.len());
        for (report, image_crops) in outcomes {
            reports.push(report);
            crops.extend(image_crops);
        }
        info!("Rendered {} crop(s)", crops.len());
        RenderPass { crops, reports }
    }

    /// Detect, apply quality rules, render.
    pub fn run(&self, items: &[BatchItem]) -> BatchReport {
        let DetectionPass {
            mut images,
            mut reports,
        } = self.detect_all(items);

        let mut history = SelectionHistory::new(&images);
        self.apply_quality_rules(&mut images, &mut history);

        let rendered = self.render_selected(&images);
        let mut by_id: HashMap<String, ItemStatus> = rendered
            .reports
            .into_iter()
            .map(|r| (r.id, r.status))
            .collect();
        for report in reports.iter_mut() {
            if let Some(status) = by_id.remove(&report.id) {
                report.status = status;
            }
        }

        let report = BatchReport::new(reports, rendered.crops, self.cancel.is_cancelled());
        info!(
            "Batch finished: {} processed, {} failed, {} face(s) exported",
            report.images_processed, report.images_failed, report.faces_exported
        );
        report
    }

    fn detect_item(&self, item: &BatchItem) -> Result<ImageFaces, String> {
        let image = load_image(&item.path).map_err(|err| format!("{err:#}"))?;
        let image = Arc::new(image);
        let detections = self
            .runner
            .detect(&item.id, &image)
            .map_err(|err| err.to_string())?;
        let faces = build_face_records(&item.id, &image, &detections, self.options.score_quality);
        Ok(ImageFaces {
            item: item.clone(),
            dimensions: (image.width(), image.height()),
            faces,
        })
    }

    fn render_image(&self, image: &ImageFaces) -> (ItemStatus, Vec<CropResult>) {
        let faces_detected = image.faces.len();
        if faces_detected == 0 {
            return (
                ItemStatus::Skipped {
                    reason: "no faces detected".into(),
                },
                Vec::new(),
            );
        }
        let selected: Vec<&FaceRecord> = image.selected().collect();
        if selected.is_empty() {
            return (
                ItemStatus::Skipped {
                    reason: "no faces selected".into(),
                },
                Vec::new(),
            );
        }

        let source: DynamicImage = match load_image(&image.item.path) {
            Ok(source) => source,
            Err(err) => {
                warn!("{}: {err:#}", image.item.id);
                self.note_failure();
                return (
                    ItemStatus::Failed {
                        error: format!("{err:#}"),
                    },
                    Vec::new(),
                );
            }
        };

        let results: Vec<_> = selected
            .par_iter()
            .map(|face| {
                let target = RenderTarget {
                    image_id: &image.item.id,
                    original_name: &image.item.original_name,
                    csv_name: image.item.csv_name.as_deref(),
                    face,
                };
                self.renderer.render(&source, &target)
            })
            .collect();

        let mut crops = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (face, result) in selected.iter().zip(results) {
            match result {
                Ok(crop) => crops.push(crop),
                Err(err) => {
                    warn!("{}: face {} failed: {err}", image.item.id, face.id());
                    first_error.get_or_insert_with(|| err.to_string());
                }
            }
        }

        let faces_failed = selected.len() - crops.len();
        if faces_failed > 0 {
            self.note_failure();
        }
        match first_error {
            Some(error) if crops.is_empty() => (ItemStatus::Failed { error }, crops),
            _ => (
                ItemStatus::Completed {
                    faces_detected,
                    faces_exported: crops.len(),
                    faces_failed,
                },
                crops,
            ),
        }
    }

    fn note_failure(&self) {
        if !self.options.continue_on_error && !self.cancel.is_cancelled() {
            warn!("Stopping batch after failure (continue_on_error is off)");
            self.cancel.cancel();
        }
    }

    fn emit(&self, stage: BatchStage, completed: usize, total: usize, item_id: &str) {
        if let Some(callback) = &self.progress {
            callback(BatchProgress {
                stage,
                completed,
                total,
                item_id: item_id.to_string(),
            });
        }
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        if self.options.jobs == 0 {
            return op();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .build()
        {
            Ok(pool) => pool.install(op),
            Err(err) => {
                warn!(
                    "Failed to build {}-thread pool: {err}; using global pool",
                    self.options.jobs
                );
                op()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cropper::CropSettings,
        detector::{DetectionError, FaceDetector, RawDetection},
        normalize::RawBoundingBox,
    };
    use image::{Rgba, RgbaImage};
    use smartcrop_utils::Quality;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Reports one centered face for every image except those whose id contains "broken".
    struct CenterFace;

    impl FaceDetector for CenterFace {
        fn detect(
            &self,
            image_id: &str,
            _: &DynamicImage,
        ) -> Result<Vec<RawDetection>, DetectionError> {
            if image_id.contains("broken") {
                return Err(DetectionError::Unavailable("model offline".into()));
            }
            Ok(vec![RawDetection::new(RawBoundingBox::new(0.3, 0.3, 0.4, 0.4), 0.95)])
        }
    }

    fn write_image(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        RgbaImage::from_fn(80, 60, |x, y| Rgba([(x * 3) as u8, (y * 4) as u8, 90, 255]))
            .save(&path)
            .expect("write fixture");
        path
    }

    fn orchestrator() -> BatchOrchestrator {
        let runner = DetectionRunner::new(Arc::new(CenterFace));
        let renderer = CropRenderer::new(
            CropSettings {
                output_width: 32,
                output_height: 40,
                ..CropSettings::default()
            },
            None,
        );
        BatchOrchestrator::new(runner, renderer)
    }

    fn unscored(count: usize) -> Vec<FaceRecord> {
        let img = DynamicImage::new_rgba8(200, 200);
        let detections: Vec<_> = (0..count)
            .map(|i| RawDetection::new(RawBoundingBox::new(20.0 * i as f32, 0.0, 10.0, 10.0), 0.9))
            .collect();
        build_face_records("t", &img, &detections, false)
    }

    #[test]
    fn run_renders_every_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let items: Vec<_> = ["a.png", "b.png"]
            .iter()
            .map(|n| BatchItem::from_path(write_image(&dir, n)))
            .collect();
        let report = orchestrator().run(&items);
        assert_eq!(report.images_total, 2);
        assert_eq!(report.images_processed, 2);
        assert_eq!(report.faces_exported, 2);
        assert_eq!(report.crops.len(), 2);
        assert_eq!(report.crops[0].filename, "a_face_1.png");
        assert!(!report.cancelled);
        assert!(matches!(
            report.items[0].status,
            ItemStatus::Completed {
                faces_detected: 1,
                faces_exported: 1,
                faces_failed: 0
            }
        ));
    }

    #[test]
    fn failures_are_isolated_per_item() {
        let dir = tempfile::tempdir().expect("tempdir");
        let items = vec![
            BatchItem::from_path(write_image(&dir, "ok.png")),
            BatchItem::from_path(write_image(&dir, "broken.png")),
            BatchItem::from_path(dir.path().join("missing.png")),
        ];
        let report = orchestrator().run(&items);
        assert_eq!(report.images_processed, 1);
        assert_eq!(report.images_failed, 2);
        assert_eq!(report.faces_exported, 1);
        match &report.items[1].status {
            ItemStatus::Failed { error } => assert!(error.contains("model offline")),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn stop_on_error_cancels_remaining_items() {
        let dir = tempfile::tempdir().expect("tempdir");
        let items = vec![
            BatchItem::from_path(write_image(&dir, "broken.png")),
            BatchItem::from_path(write_image(&dir, "later.png")),
        ];
        let orchestrator = orchestrator().with_options(BatchOptions {
            jobs: 1,
            continue_on_error: false,
            score_quality: true,
        });
        let report = orchestrator.run(&items);
        assert!(report.cancelled);
        assert_eq!(report.images_failed, 1);
        assert_eq!(report.images_cancelled, 1);
        assert!(report.crops.is_empty());
    }

    #[test]
    fn pre_cancelled_token_dispatches_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let items = vec![BatchItem::from_path(write_image(&dir, "a.png"))];
        let token = CancelToken::new();
        token.cancel();
        let report = orchestrator().with_cancel_token(token).run(&items);
        assert_eq!(report.images_cancelled, 1);
        assert!(report.crops.is_empty());
    }

    #[test]
    fn progress_reports_each_stage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let items: Vec<_> = ["a.png", "b.png", "c.png"]
            .iter()
            .map(|n| BatchItem::from_path(write_image(&dir, n)))
            .collect();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        orchestrator()
            .with_progress(move |p| sink.lock().expect("lock").push(p))
            .run(&items);
        let events = events.lock().expect("lock");
        let detect: Vec<_> = events.iter().filter(|e| e.stage == BatchStage::Detect).collect();
        let render: Vec<_> = events.iter().filter(|e| e.stage == BatchStage::Render).collect();
        assert_eq!(detect.len(), 3);
        assert_eq!(render.len(), 3);
        assert!(events.iter().all(|e| e.total == 3));
        assert_eq!(detect.iter().map(|e| e.completed).max(), Some(3));
    }

    #[test]
    fn deselected_faces_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let items = vec![BatchItem::from_path(write_image(&dir, "a.png"))];
        let orchestrator = orchestrator();
        let mut pass = orchestrator.detect_all(&items);
        let mut history = SelectionHistory::new(&pass.images);
        pass.images[0].faces[0].set_selected(false);
        history.record(&pass.images);

        let rendered = orchestrator.render_selected(&pass.images);
        assert!(rendered.crops.is_empty());
        assert!(matches!(rendered.reports[0].status, ItemStatus::Skipped { .. }));

        assert!(history.undo(&mut pass.images));
        let rendered = orchestrator.render_selected(&pass.images);
        assert_eq!(rendered.crops.len(), 1);
    }

    #[test]
    fn csv_name_flows_into_filename() {
        let dir = tempfile::tempdir().expect("tempdir");
        let items = vec![BatchItem::from_path(write_image(&dir, "a.png")).with_csv_name("Ada")];
        let runner = DetectionRunner::new(Arc::new(CenterFace));
        let renderer = CropRenderer::new(
            CropSettings {
                naming_template: "{csv_name}-{index}.{ext}".into(),
                ..CropSettings::default()
            },
            None,
        );
        let report = BatchOrchestrator::new(runner, renderer).run(&items);
        assert_eq!(report.crops[0].filename, "Ada-1.png");
    }

    #[test]
    fn unscored_faces_survive_min_quality() {
        let mut faces = unscored(2);
        let filter = QualityFilter::new(Some(Quality::High));
        apply_quality_rules(&filter, &mut faces);
        assert!(faces.iter().all(FaceRecord::is_selected));
    }

    #[test]
    fn skip_without_high_deselects_everything() {
        let mut faces = unscored(1);
        let filter = QualityFilter {
            auto_skip_no_high: true,
            ..QualityFilter::default()
        };
        apply_quality_rules(&filter, &mut faces);
        assert!(!faces[0].is_selected());
    }

    #[test]
    fn auto_select_keeps_sharpest_face() {
        // Left half is a checkerboard (sharp), right half flat gray.
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(200, 100, |x, y| {
            if x < 100 && (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else if x < 100 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([20, 20, 20, 255])
            }
        }));
        let detections = [
            RawDetection::new(RawBoundingBox::new(120.0, 10.0, 60.0, 60.0), 0.99),
            RawDetection::new(RawBoundingBox::new(10.0, 10.0, 60.0, 60.0), 0.6),
        ];
        let mut faces = build_face_records("t", &img, &detections, true);
        let filter = QualityFilter {
            auto_select: true,
            ..QualityFilter::default()
        };
        apply_quality_rules(&filter, &mut faces);
        assert!(!faces[0].is_selected());
        assert!(faces[1].is_selected());
    }

    #[test]
    fn report_serializes_status_inline() {
        let report = BatchReport::new(
            vec![ItemReport {
                id: "a".into(),
                path: PathBuf::from("a.png"),
                status: ItemStatus::Skipped {
                    reason: "no faces detected".into(),
                },
            }],
            Vec::new(),
            false,
        );
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["items"][0]["status"], "skipped");
        assert_eq!(json["items"][0]["reason"], "no faces detected");
        assert_eq!(json["images_skipped"], 1);
        assert_eq!(json["images_processed"], 1);
    }
}
