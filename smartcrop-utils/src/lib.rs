//! Common helpers shared across smartcrop crates.

/// Persisted settings (JSON) for crop, enhancement, quality rules, batch and telemetry.
pub mod config;
/// Fixed face-photo enhancement pipeline.
pub mod enhance;
/// Image loading and downscaling.
pub mod image_utils;
/// Filename templates.
pub mod naming;
/// Output encoding and metadata embedding.
pub mod output;
/// Sharpness scoring (Laplacian response energy) and quality tiers.
pub mod quality;
/// Scoped timing logs.
pub mod telemetry;

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::LevelFilter;

pub use config::{
    AppSettings, BatchSettings, EnhanceSettings, MetadataMode, MetadataSettings,
    QualityAutomationSettings, TelemetrySettings, default_settings_path,
};
pub use enhance::{EnhancementSettings, apply_enhancements};
pub use image_utils::{downscale_to_fit, fit_within, load_image};
pub use naming::{DEFAULT_TEMPLATE, NamingContext, render_filename, unix_timestamp_millis};
pub use output::{
    CropMetadata, ImageFormatHint, MetadataContext, OutputOptions, PngCompression,
    append_suffix_to_filename, encode_image, jpeg_quality_from_fraction, write_output,
};
pub use quality::{Quality, QualityFilter, QualityResult, laplacian_variance, score_region};
pub use telemetry::{
    TELEMETRY_TARGET, TimingGuard, configure as configure_telemetry, telemetry_allows,
    timing_guard, timing_guard_if,
};

/// Initialize logging once.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies. The telemetry target is
/// always let through so [`configure_telemetry`] alone decides whether timings are printed.
/// Calling this again after a logger is installed does nothing.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(TELEMETRY_TARGET, LevelFilter::Trace);
    if builder.try_init().is_err() {
        log::debug!("logger already initialized");
    }
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}
