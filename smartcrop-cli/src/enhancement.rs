//! Enhancement settings construction from CLI arguments.

use log::warn;
use smartcrop_utils::{EnhanceSettings, EnhancementSettings};

use crate::args::CropArgs;

/// Values for a named enhancement preset.
pub fn preset_values(name: &str) -> Option<EnhancementSettings> {
    let base = EnhancementSettings::default();
    match name.trim().to_ascii_lowercase().as_str() {
        "natural" => Some(EnhancementSettings {
            auto_color: true,
            exposure_stops: 0.1,
            contrast: 1.1,
            sharpness: 0.3,
            ..base
        }),
        "vivid" => Some(EnhancementSettings {
            exposure_stops: 0.3,
            contrast: 1.25,
            sharpness: 0.7,
            ..base
        }),
        "professional" => Some(EnhancementSettings {
            auto_color: true,
            exposure_stops: 0.2,
            contrast: 1.15,
            sharpness: 1.0,
            skin_smoothing: 1.0,
            red_eye_removal: true,
            ..base
        }),
        _ => None,
    }
}

/// Apply `--enhance`, `--enhancement-preset` and the explicit enhancement flags.
///
/// A preset replaces every value; explicit flags are applied on top of it.
pub fn apply_enhancement_overrides(settings: &mut EnhanceSettings, args: &CropArgs) {
    if let Some(enabled) = args.enhance {
        settings.enabled = enabled;
    }

    if let Some(name) = args.enhancement_preset.as_ref() {
        match preset_values(name) {
            Some(values) => {
                settings.preset = name.trim().to_ascii_lowercase();
                settings.auto_color = values.auto_color;
                settings.exposure_stops = values.exposure_stops;
                settings.contrast = values.contrast;
                settings.sharpness = values.sharpness;
                settings.skin_smoothing = values.skin_smoothing;
                settings.red_eye_removal = values.red_eye_removal;
                settings.background_blur = values.background_blur;
            }
            None => warn!("unknown enhancement preset '{name}', using defaults"),
        }
    }

    if let Some(v) = args.enhance_auto_color {
        settings.auto_color = v;
    }
    if let Some(v) = args.enhance_exposure {
        settings.exposure_stops = v;
    }
    if let Some(v) = args.enhance_contrast {
        settings.contrast = v;
    }
    if let Some(v) = args.enhance_sharpness {
        settings.sharpness = v;
    }
    if let Some(v) = args.enhance_skin_smooth {
        settings.skin_smoothing = v;
    }
    if let Some(v) = args.enhance_red_eye_removal {
        settings.red_eye_removal = v;
    }
    if let Some(v) = args.enhance_background_blur {
        settings.background_blur = v;
    }
}

/// Build the enhancer input. Returns None when enhancements aren't enabled.
pub fn build_enhancement_settings(settings: &EnhanceSettings) -> Option<EnhancementSettings> {
    settings
        .enabled
        .then(|| EnhancementSettings::from(settings))
        .filter(|e| !e.is_noop())
}
