//! Named output sizes.

/// A named output size. `Custom` has no size of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropPreset {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub description: &'static str,
}

impl CropPreset {
    const fn sized(name: &'static str, width: u32, height: u32, description: &'static str) -> Self {
        Self {
            name,
            width,
            height,
            description,
        }
    }

    /// Lowercase alphanumeric form of the name, used for lookups and persisted settings.
    pub fn key(&self) -> String {
        lookup_key(self.name)
    }

    pub fn is_custom(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Output aspect ratio (width / height), `None` for `Custom`.
    pub fn aspect_ratio(&self) -> Option<f32> {
        (!self.is_custom()).then(|| self.width as f32 / self.height as f32)
    }
}

static PRESETS: [CropPreset; 7] = [
    CropPreset::sized("LinkedIn", 400, 400, "Square profile photo"),
    CropPreset::sized("Passport", 413, 531, "Passport photo at 35x45 mm, 300 dpi"),
    CropPreset::sized("Instagram", 1080, 1080, "Square feed post"),
    CropPreset::sized("ID Card", 332, 498, "Identity card portrait"),
    CropPreset::sized("Avatar", 512, 512, "Square avatar"),
    CropPreset::sized("Headshot", 600, 800, "Portrait headshot"),
    CropPreset::sized("Custom", 0, 0, "User-defined dimensions"),
];

pub fn standard_presets() -> &'static [CropPreset] {
    &PRESETS
}

/// Find a preset ignoring case, spaces and punctuation.
pub fn preset_by_name(name: &str) -> Option<&'static CropPreset> {
    let key = lookup_key(name);
    if key.is_empty() {
        return None;
    }
    PRESETS.iter().find(|p| lookup_key(p.name) == key)
}

fn lookup_key(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
