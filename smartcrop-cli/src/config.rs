//! Configuration loading and CLI override logic.

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use smartcrop_core::{CropSettings, preset_by_name};
use smartcrop_utils::{
    MetadataMode, Quality,
    config::{AppSettings, CropSettings as ConfigCropSettings, default_settings_path},
    normalize_path,
};

use crate::{args::CropArgs, enhancement::apply_enhancement_overrides};

/// Load application settings from a file or use defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    if let Some(path) = config_path {
        let resolved = normalize_path(path)?;
        let settings = AppSettings::load_from_path(&resolved)?;
        info!("Loaded settings from {}", resolved.display());
        Ok(settings)
    } else {
        let default_path = default_settings_path();
        if default_path.exists() {
            let settings = AppSettings::load_from_path(&default_path).with_context(|| {
                format!(
                    "failed to load default settings from {}",
                    default_path.display()
                )
            })?;
            info!("Loaded settings from {}", default_path.display());
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }
}

/// Apply command-line arguments to override loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, args: &CropArgs) {
    if args.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = args.telemetry_level.as_ref() {
        let normalized = level.trim();
        if !normalized.is_empty() {
            let lower = normalized.to_ascii_lowercase();
            if lower == "off" {
                settings.telemetry.enabled = false;
            }
            settings.telemetry.level = lower;
        }
    }

    let crop = &mut settings.crop;
    if let Some(preset_name) = args.preset.as_ref() {
        crop.preset = preset_name.to_ascii_lowercase();
        if crop.preset != "custom"
            && let Some(preset) = preset_by_name(preset_name)
        {
            crop.output_width = preset.width;
            crop.output_height = preset.height;
        } else if crop.preset != "custom" {
            warn!(
                "unknown preset '{preset_name}', keeping {}x{}",
                crop.output_width, crop.output_height
            );
        }
    }
    if let Some(width) = args.output_width {
        crop.output_width = width;
        crop.preset = "custom".to_string();
    }
    if let Some(height) = args.output_height {
        crop.output_height = height;
        crop.preset = "custom".to_string();
    }
    if let Some(pct) = args.face_height_pct {
        crop.face_height_pct = pct;
    }
    if let Some(mode) = args.positioning_mode.as_ref() {
        crop.positioning_mode = mode.replace('_', "-");
    }
    if let Some(offset) = args.horizontal_offset {
        crop.horizontal_offset = offset;
    }
    if let Some(offset) = args.vertical_offset {
        crop.vertical_offset = offset;
    }
    if let Some(format) = args.output_format.as_ref() {
        crop.output_format = format.to_ascii_lowercase();
    }
    if let Some(quality) = args.jpeg_quality {
        crop.jpeg_quality = f32::from(quality) / 100.0;
    }
    if let Some(compression) = args.png_compression.as_ref() {
        crop.png_compression = compression.clone();
    }
    if let Some(template) = args.naming_template.as_ref() {
        crop.naming_template = template.clone();
    }

    if let Some(ref mode) = args.metadata_mode {
        match mode.parse::<MetadataMode>() {
            Ok(mode) => crop.metadata.mode = mode,
            Err(err) => warn!("{err}"),
        }
    }
    if let Some(include) = args.metadata_include_crop {
        crop.metadata.include_crop_settings = include;
    }
    if let Some(include) = args.metadata_include_quality {
        crop.metadata.include_quality_metrics = include;
    }
    if !args.metadata_tags.is_empty() {
        crop.metadata.custom_tags = parse_metadata_tags_args(&args.metadata_tags);
    }
    crop.sanitize();

    let rules = &mut settings.quality_rules;
    if let Some(auto) = args.auto_select_best {
        rules.auto_select_best_face = auto;
    }
    if let Some(skip) = args.skip_no_high_quality {
        rules.auto_skip_no_high_quality = skip;
    }
    if let Some(flag) = args.quality_suffix {
        rules.quality_suffix = flag;
    }
    if let Some(skip) = args.skip_low_quality {
        rules.min_quality = skip.then_some(Quality::Medium);
    } else if let Some(ref s) = args.min_quality {
        match s.parse::<Quality>() {
            Ok(q) => rules.min_quality = Some(q),
            Err(_) => warn!("unknown --min-quality value '{s}', ignoring"),
        }
    }

    let batch = &mut settings.batch;
    if let Some(jobs) = args.jobs {
        batch.jobs = jobs;
    }
    if let Some(flag) = args.continue_on_error {
        batch.continue_on_error = flag;
    }
    if let Some(ms) = args.detection_timeout_ms {
        batch.detection_timeout_ms = ms;
    }
    if let Some(attempts) = args.detection_attempts {
        batch.detection_attempts = attempts.max(1);
    }
    if let Some(ms) = args.detection_backoff_ms {
        batch.detection_backoff_ms = ms;
    }

    apply_enhancement_overrides(&mut settings.enhance, args);
}

/// Convert persisted crop settings into the core's validated form.
pub fn build_core_crop_settings(cfg: &ConfigCropSettings) -> CropSettings {
    CropSettings::from_persisted(cfg)
}

fn parse_metadata_tags_args(entries: &[String]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for entry in entries {
        if let Some((key, value)) = entry.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                warn!("Ignoring metadata tag with empty key: '{entry}'");
                continue;
            }
            map.insert(key.to_string(), value.trim().to_string());
        } else {
            warn!("Invalid metadata tag '{entry}', expected key=value");
        }
    }
    map
}
