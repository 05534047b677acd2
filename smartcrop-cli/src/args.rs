//! Command-line argument definitions for smartcrop-cli.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Crop detected faces out of images using a detection manifest.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct CropArgs {
    /// Path to an image file or a directory containing images.
    #[arg(short, long)]
    pub input: PathBuf,

    /// JSON detection manifest produced by an external face detector.
    #[arg(short, long)]
    pub detections: PathBuf,

    /// Output directory for cropped face images.
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Optional settings JSON. Defaults to `config/smartcrop_settings.json` when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the effective settings (after overrides) to this path.
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Write the batch report to a JSON file instead of stdout.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace, off).
    #[arg(long, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,

    /// Preset name for output size (e.g., LinkedIn, Passport, Instagram). Overrides the stored size.
    #[arg(long)]
    pub preset: Option<String>,

    /// Output width for crops (pixels). Switches the preset to custom.
    #[arg(long)]
    pub output_width: Option<u32>,

    /// Output height for crops (pixels). Switches the preset to custom.
    #[arg(long)]
    pub output_height: Option<u32>,

    /// Face height as a percentage of the output height (1-100).
    #[arg(long)]
    pub face_height_pct: Option<u32>,

    /// Positioning mode for crop: center, rule-of-thirds, custom.
    #[arg(long)]
    pub positioning_mode: Option<String>,

    /// Horizontal offset in percent of half the crop width (-100..100).
    #[arg(long, allow_hyphen_values = true)]
    pub horizontal_offset: Option<i32>,

    /// Vertical offset in percent of half the crop height (-100..100).
    #[arg(long, allow_hyphen_values = true)]
    pub vertical_offset: Option<i32>,

    /// Output image format for saved crops: png, jpeg, webp.
    #[arg(long)]
    pub output_format: Option<String>,

    /// JPEG quality when saving as JPEG (1-100).
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// PNG compression strategy: fast, default, best, or numeric level 0-9.
    #[arg(long)]
    pub png_compression: Option<String>,

    /// Naming template. Variables: {original}, {index}, {width}, {height}, {ext}, {timestamp}, {csv_name}
    #[arg(long)]
    pub naming_template: Option<String>,

    /// Minimum quality to keep a face selected (low, medium, high).
    #[arg(long)]
    pub min_quality: Option<String>,

    /// Shortcut to skip low-quality crops (equivalent to `--min-quality medium`).
    #[arg(long)]
    pub skip_low_quality: Option<bool>,

    /// Keep only the highest-quality face per image.
    #[arg(long)]
    pub auto_select_best: Option<bool>,

    /// Skip an image when none of its faces is high quality.
    #[arg(long)]
    pub skip_no_high_quality: Option<bool>,

    /// Append a quality suffix (e.g., `_highq`) to exported filenames.
    #[arg(long)]
    pub quality_suffix: Option<bool>,

    /// Metadata handling mode: strip or embed.
    #[arg(long)]
    pub metadata_mode: Option<String>,

    /// Include crop settings in embedded metadata.
    #[arg(long)]
    pub metadata_include_crop: Option<bool>,

    /// Include quality scores in embedded metadata.
    #[arg(long)]
    pub metadata_include_quality: Option<bool>,

    /// Custom metadata tags in KEY=VALUE form (may be repeated).
    #[arg(long = "metadata-tag")]
    pub metadata_tags: Vec<String>,

    /// Apply the enhancement pipeline to each crop.
    #[arg(long)]
    pub enhance: Option<bool>,

    /// Enhancement preset: natural, vivid, professional. Explicit flags override preset values.
    #[arg(long)]
    pub enhancement_preset: Option<String>,

    /// Stretch each color channel to the full range.
    #[arg(long)]
    pub enhance_auto_color: Option<bool>,

    /// Exposure adjustment in stops (-2.0..=2.0).
    #[arg(long, allow_hyphen_values = true)]
    pub enhance_exposure: Option<f32>,

    /// Contrast multiplier (0.5-2.0, 1.0 = unchanged).
    #[arg(long)]
    pub enhance_contrast: Option<f32>,

    /// Sharpening amount (0.0-2.0).
    #[arg(long)]
    pub enhance_sharpness: Option<f32>,

    /// Skin smoothing radius (0.0-5.0).
    #[arg(long)]
    pub enhance_skin_smooth: Option<f32>,

    /// Enable red-eye removal.
    #[arg(long)]
    pub enhance_red_eye_removal: Option<bool>,

    /// Background blur radius in pixels (0.0-10.0).
    #[arg(long)]
    pub enhance_background_blur: Option<f32>,

    /// Worker threads for the batch (0 = one per core).
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Keep going after a failed image. Use `--continue-on-error=false` to stop at the first failure.
    #[arg(long)]
    pub continue_on_error: Option<bool>,

    /// Per-attempt detection timeout in milliseconds.
    #[arg(long)]
    pub detection_timeout_ms: Option<u64>,

    /// Detection attempts per image (at least 1).
    #[arg(long)]
    pub detection_attempts: Option<u32>,

    /// Base backoff between detection attempts in milliseconds.
    #[arg(long)]
    pub detection_backoff_ms: Option<u64>,
}
