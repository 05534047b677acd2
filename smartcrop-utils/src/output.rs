//! Encoding cropped faces to PNG, JPEG or WebP, with optional embedded metadata.
//!
//! Encoding produces an in-memory buffer so callers can hand the bytes to an archive
//! writer or write them to disk with [`write_output`].

use crate::{
    config::{MetadataMode, MetadataSettings},
    quality::QualityResult,
};

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use crc32fast::Hasher as Crc32;
use image::{
    DynamicImage, ExtendedColorType, ImageEncoder, ImageResult,
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
        webp::WebPEncoder,
    },
};
use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};
use std::{
    fmt, fs,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    str::FromStr,
};

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
const PNG_TEXT_KEYWORD: &str = "SmartCrop";

/// Output image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormatHint {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ImageFormatHint {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

impl fmt::Display for ImageFormatHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        })
    }
}

impl FromStr for ImageFormatHint {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            other => Err(format!("unknown image format '{other}'")),
        }
    }
}

/// Simplified PNG compression strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PngCompression {
    Fast,
    #[default]
    Default,
    Best,
}

impl PngCompression {
    /// Parse a strategy name or a 0-9 level. Unknown input falls back to `Default`.
    pub fn parse(input: &str) -> Self {
        let normalized = input.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "fast" => Self::Fast,
            "best" => Self::Best,
            "default" | "" => Self::Default,
            _ => match normalized.parse::<u8>() {
                Ok(0..=3) => Self::Fast,
                Ok(7..=9) => Self::Best,
                Ok(_) => Self::Default,
                Err(_) => {
                    warn!("Unknown PNG compression '{input}', falling back to default strategy");
                    Self::Default
                }
            },
        }
    }

    fn into_image(self) -> CompressionType {
        match self {
            Self::Fast => CompressionType::Fast,
            Self::Default => CompressionType::Default,
            Self::Best => CompressionType::Best,
        }
    }
}

/// Map a `(0, 1]` quality fraction onto the encoder's `1..=100` scale.
pub fn jpeg_quality_from_fraction(fraction: f32) -> u8 {
    if !fraction.is_finite() {
        return 90;
    }
    (fraction * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encoder configuration for one export.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: ImageFormatHint,
    /// 1-100.
    pub jpeg_quality: u8,
    pub png_compression: PngCompression,
    pub metadata: MetadataSettings,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: ImageFormatHint::Png,
            jpeg_quality: 90,
            png_compression: PngCompression::Default,
            metadata: MetadataSettings::default(),
        }
    }
}

/// Crop geometry recorded in embedded metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CropMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    pub output_width: u32,
    pub output_height: u32,
    pub face_height_pct: u32,
    pub positioning_mode: String,
    pub horizontal_offset: i32,
    pub vertical_offset: i32,
}

/// Per-crop values that may be embedded alongside the pixels.
#[derive(Debug, Clone, Default)]
pub struct MetadataContext {
    pub crop: Option<CropMetadata>,
    pub detection_score: Option<f32>,
    pub quality: Option<QualityResult>,
}

/// Encode `image` with the configured format and metadata mode.
pub fn encode_image(
    image: &DynamicImage,
    options: &OutputOptions,
    metadata: &MetadataContext,
) -> ImageResult<Vec<u8>> {
    let encoded = match options.format {
        ImageFormatHint::Png => encode_png(image, options.png_compression)?,
        ImageFormatHint::Jpeg => encode_jpeg(image, options.jpeg_quality)?,
        ImageFormatHint::Webp => encode_webp(image)?,
    };

    let Some(payload) = build_metadata_payload(&options.metadata, metadata) else {
        return Ok(encoded);
    };

    Ok(match options.format {
        ImageFormatHint::Png => inject_png_text(encoded, &payload),
        ImageFormatHint::Jpeg => inject_jpeg_xmp(encoded, &payload),
        ImageFormatHint::Webp => {
            debug!(
                "WebP metadata embedding is not supported; dropping {} byte payload",
                payload.len()
            );
            encoded
        }
    })
}

/// Write encoded bytes to `destination`, creating parent directories.
pub fn write_output(destination: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty() && !p.exists())
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(destination)
        .with_context(|| format!("failed to create {}", destination.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .with_context(|| format!("failed to write {}", destination.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", destination.display()))?;
    Ok(())
}

fn encode_png(image: &DynamicImage, compression: PngCompression) -> ImageResult<Vec<u8>> {
    let rgba = image.to_rgba8();
    let mut buffer = Vec::new();
    PngEncoder::new_with_quality(&mut buffer, compression.into_image(), FilterType::Adaptive)
        .write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            ExtendedColorType::Rgba8,
        )?;
    Ok(buffer)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buffer)
}

fn encode_webp(image: &DynamicImage) -> ImageResult<Vec<u8>> {
    let rgba = image.to_rgba8();
    let mut buffer = Vec::new();
    WebPEncoder::new_lossless(&mut buffer).write_image(
        rgba.as_raw(),
        rgba.width(),
        rgba.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buffer)
}

/// Insert a `tEXt` chunk right after IHDR.
fn inject_png_text(encoded: Vec<u8>, payload: &str) -> Vec<u8> {
    if encoded.len() < 16 || &encoded[..8] != PNG_SIGNATURE {
        return encoded;
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&encoded[8..12]);
    let ihdr_end = 8 + 8 + u32::from_be_bytes(len_bytes) as usize + 4;
    if ihdr_end > encoded.len() {
        return encoded;
    }
    let Some(chunk) = build_png_text_chunk(PNG_TEXT_KEYWORD, payload) else {
        return encoded;
    };

    let mut output = Vec::with_capacity(encoded.len() + chunk.len());
    output.extend_from_slice(&encoded[..ihdr_end]);
    output.extend_from_slice(&chunk);
    output.extend_from_slice(&encoded[ihdr_end..]);
    output
}

fn build_png_text_chunk(keyword: &str, value: &str) -> Option<Vec<u8>> {
    if keyword.is_empty() || keyword.len() > 79 || !value.is_ascii() {
        warn!("PNG text payload is not representable as tEXt; skipping");
        return None;
    }

    let mut data = Vec::with_capacity(keyword.len() + value.len() + 1);
    data.extend_from_slice(keyword.as_bytes());
    data.push(0);
    data.extend_from_slice(value.as_bytes());

    let mut chunk = Vec::with_capacity(12 + data.len());
    chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
    chunk.extend_from_slice(b"tEXt");
    chunk.extend_from_slice(&data);

    let mut hasher = Crc32::new();
    hasher.update(b"tEXt");
    hasher.update(&data);
    chunk.extend_from_slice(&hasher.finalize().to_be_bytes());
    Some(chunk)
}

/// Insert an XMP APP1 segment right after SOI.
fn inject_jpeg_xmp(encoded: Vec<u8>, payload: &str) -> Vec<u8> {
    if encoded.len() < 2 || encoded[0] != 0xFF || encoded[1] != 0xD8 {
        return encoded;
    }
    let Some(segment) = build_jpeg_xmp_segment(payload) else {
        return encoded;
    };
    let mut output = Vec::with_capacity(encoded.len() + segment.len());
    output.extend_from_slice(&encoded[..2]);
    output.extend_from_slice(&segment);
    output.extend_from_slice(&encoded[2..]);
    output
}

fn build_jpeg_xmp_segment(json: &str) -> Option<Vec<u8>> {
    let encoded = BASE64.encode(json.as_bytes());
    let packet = format!(
        r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description xmlns:smartcrop="https://smartcrop.dev/ns/1.0/">
   <smartcrop:Metadata>{encoded}</smartcrop:Metadata>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#
    );

    let header = b"http://ns.adobe.com/xap/1.0/\0";
    let total_len = header.len() + packet.len() + 2;
    if total_len > u16::MAX as usize {
        warn!("XMP payload too large; skipping metadata embed");
        return None;
    }

    let mut segment = Vec::with_capacity(total_len + 2);
    segment.extend_from_slice(&[0xFF, 0xE1]);
    segment.extend_from_slice(&(total_len as u16).to_be_bytes());
    segment.extend_from_slice(header);
    segment.extend_from_slice(packet.as_bytes());
    Some(segment)
}

fn build_metadata_payload(settings: &MetadataSettings, ctx: &MetadataContext) -> Option<String> {
    if settings.mode == MetadataMode::Strip {
        return None;
    }

    let mut root = JsonMap::new();
    for (key, value) in &settings.custom_tags {
        root.insert(key.clone(), JsonValue::String(value.clone()));
    }

    if settings.include_crop_settings
        && let Some(crop) = &ctx.crop
    {
        match serde_json::to_value(crop) {
            Ok(value) => {
                root.insert("crop_settings".into(), value);
            }
            Err(err) => warn!("Failed to serialize crop metadata: {err}"),
        }
    }

    if settings.include_quality_metrics {
        if let Some(quality) = ctx.quality {
            root.insert(
                "quality".into(),
                JsonValue::String(quality.level.as_str().to_string()),
            );
            if let Some(num) = JsonNumber::from_f64(quality.score) {
                root.insert("quality_score".into(), JsonValue::Number(num));
            }
        }
        if let Some(num) = ctx
            .detection_score
            .and_then(|conf| JsonNumber::from_f64(conf as f64))
        {
            root.insert("face_confidence".into(), JsonValue::Number(num));
        }
    }

    if root.is_empty() {
        return None;
    }

    root.insert("generator".into(), JsonValue::String("smartcrop".into()));
    root.insert(
        "generator_version".into(),
        JsonValue::String(env!("CARGO_PKG_VERSION").into()),
    );
    Some(JsonValue::Object(root).to_string())
}

/// Append a suffix to a filename, preserving the existing extension.
pub fn append_suffix_to_filename(name: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(idx) => {
            let (base, ext) = name.split_at(idx);
            format!("{base}{suffix}{ext}")
        }
        None => format!("{name}{suffix}"),
    }
}
