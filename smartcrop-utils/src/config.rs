//! Persisted settings shared by the smartcrop front ends.
//!
//! Everything here is a plain serde document. Sections default independently so a partial
//! JSON file on disk only overrides what it names. The core crate converts these loose,
//! string-typed values into its own validated `CropSettings` before doing any work.

use crate::{
    enhance::EnhancementSettings,
    quality::{Quality, QualityFilter},
};

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Relative location of the settings file used when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "config/smartcrop_settings.json";

/// Persisted crop settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CropSettings {
    /// Crop preset name (e.g. "linkedin", "passport", "custom").
    pub preset: String,
    /// Output width in pixels.
    pub output_width: u32,
    /// Output height in pixels.
    pub output_height: u32,
    /// Face height as a percentage of the output height (1-100).
    pub face_height_pct: u32,
    /// "center", "rule-of-thirds" or "custom".
    pub positioning_mode: String,
    /// Vertical offset percent (-100..=100), custom mode only.
    pub vertical_offset: i32,
    /// Horizontal offset percent (-100..=100).
    pub horizontal_offset: i32,
    /// "png", "jpeg" or "webp".
    pub output_format: String,
    /// JPEG quality in (0, 1].
    pub jpeg_quality: f32,
    /// PNG compression strategy ("fast", "default", "best") or numeric level (0-9).
    pub png_compression: String,
    /// Filename template, see `naming::render_filename`.
    pub naming_template: String,
    pub metadata: MetadataSettings,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            preset: "linkedin".to_string(),
            output_width: 400,
            output_height: 400,
            face_height_pct: 70,
            positioning_mode: "center".to_string(),
            vertical_offset: 0,
            horizontal_offset: 0,
            output_format: "png".to_string(),
            jpeg_quality: 0.9,
            png_compression: "default".to_string(),
            naming_template: crate::naming::DEFAULT_TEMPLATE.to_string(),
            metadata: MetadataSettings::default(),
        }
    }
}

impl CropSettings {
    /// Clamp values to their valid ranges.
    pub fn sanitize(&mut self) {
        self.output_width = self.output_width.max(1);
        self.output_height = self.output_height.max(1);
        self.face_height_pct = self.face_height_pct.clamp(1, 100);
        self.vertical_offset = self.vertical_offset.clamp(-100, 100);
        self.horizontal_offset = self.horizontal_offset.clamp(-100, 100);
        if !self.jpeg_quality.is_finite() || self.jpeg_quality <= 0.0 {
            self.jpeg_quality = 0.9;
        }
        self.jpeg_quality = self.jpeg_quality.min(1.0);
        if self.naming_template.trim().is_empty() {
            self.naming_template = crate::naming::DEFAULT_TEMPLATE.to_string();
        }
    }
}

/// Persisted enhancement settings: an on/off switch, a preset and explicit values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnhanceSettings {
    pub enabled: bool,
    /// "none", "natural", "vivid" or "professional".
    pub preset: String,
    pub auto_color: bool,
    pub exposure_stops: f32,
    pub contrast: f32,
    pub sharpness: f32,
    pub skin_smoothing: f32,
    pub red_eye_removal: bool,
    pub background_blur: f32,
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        let base = EnhancementSettings::default();
        Self {
            enabled: false,
            preset: "none".to_string(),
            auto_color: base.auto_color,
            exposure_stops: base.exposure_stops,
            contrast: base.contrast,
            sharpness: base.sharpness,
            skin_smoothing: base.skin_smoothing,
            red_eye_removal: base.red_eye_removal,
            background_blur: base.background_blur,
        }
    }
}

impl From<&EnhanceSettings> for EnhancementSettings {
    fn from(settings: &EnhanceSettings) -> Self {
        EnhancementSettings {
            auto_color: settings.auto_color,
            exposure_stops: settings.exposure_stops,
            contrast: settings.contrast,
            sharpness: settings.sharpness,
            skin_smoothing: settings.skin_smoothing,
            red_eye_removal: settings.red_eye_removal,
            background_blur: settings.background_blur,
        }
        .sanitized()
    }
}

/// How metadata is handled for exported crops.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetadataMode {
    /// Write pixels only.
    #[default]
    Strip,
    /// Embed a JSON payload describing the crop.
    Embed,
}

impl FromStr for MetadataMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strip" | "none" => Ok(MetadataMode::Strip),
            "embed" | "custom" => Ok(MetadataMode::Embed),
            other => Err(format!("unknown metadata mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetadataSettings {
    pub mode: MetadataMode,
    /// Include crop geometry (size, offsets, preset) in the payload.
    pub include_crop_settings: bool,
    /// Include quality score, tier and detection confidence in the payload.
    pub include_quality_metrics: bool,
    /// Arbitrary user-defined key/value pairs.
    pub custom_tags: BTreeMap<String, String>,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            mode: MetadataMode::Strip,
            include_crop_settings: true,
            include_quality_metrics: true,
            custom_tags: BTreeMap::new(),
        }
    }
}

/// Automation options driven by quality analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct QualityAutomationSettings {
    /// Keep only the highest quality face of each image.
    pub auto_select_best_face: bool,
    /// Deselect faces below this tier. Faces of unknown quality are kept.
    pub min_quality: Option<Quality>,
    /// Skip an image entirely when none of its faces reaches `Quality::High`.
    pub auto_skip_no_high_quality: bool,
    /// Append a quality suffix (e.g. `_highq`) to exported filenames.
    pub quality_suffix: bool,
}

impl QualityAutomationSettings {
    pub fn to_filter(&self) -> QualityFilter {
        QualityFilter {
            min_quality: self.min_quality,
            auto_select: self.auto_select_best_face,
            auto_skip_no_high: self.auto_skip_no_high_quality,
            suffix_enabled: self.quality_suffix,
        }
    }
}

/// Batch driver settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchSettings {
    /// Render worker count; 0 uses the rayon default.
    pub jobs: usize,
    /// Keep dispatching items after a failure.
    pub continue_on_error: bool,
    /// Per-attempt detection timeout in milliseconds.
    pub detection_timeout_ms: u64,
    /// Total detection attempts per image (at least 1).
    pub detection_attempts: u32,
    /// Delay before retry `n` is `n * detection_backoff_ms`.
    pub detection_backoff_ms: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            jobs: 0,
            continue_on_error: true,
            detection_timeout_ms: 30_000,
            detection_attempts: 1,
            detection_backoff_ms: 250,
        }
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    /// Logging level for timing output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string, defaulting to `Debug` for unknown values.
    pub fn level_filter(&self) -> LevelFilter {
        self.level.trim().parse().unwrap_or(LevelFilter::Debug)
    }

    pub fn set_level(&mut self, level: LevelFilter) {
        self.level = level.as_str().to_ascii_lowercase();
    }
}

/// The complete settings document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppSettings {
    pub crop: CropSettings,
    pub enhance: EnhanceSettings,
    pub quality_rules: QualityAutomationSettings,
    pub batch: BatchSettings,
    pub telemetry: TelemetrySettings,
}

impl AppSettings {
    /// Load settings from a JSON file. Missing sections and fields take their defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;
        settings.crop.sanitize();
        settings.batch.detection_attempts = settings.batch.detection_attempts.max(1);
        Ok(settings)
    }

    /// Write settings as pretty-printed JSON, creating the parent directory if needed.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists())
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }
}

/// `config/smartcrop_settings.json` under the current directory.
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join(DEFAULT_SETTINGS_FILE))
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_FILE))
}
