//! Face-photo enhancement pipeline.
//!
//! A fixed, deterministic sequence of pixel filters applied to an RGBA buffer in place.
//! Stages run in this order and only when their setting differs from the no-op default:
//!
//! 1. auto color correction (per-channel 1st/99th percentile stretch)
//! 2. exposure (`2^stops` gain)
//! 3. contrast around mid-gray
//! 4. unsharp-mask style sharpening (interior pixels only)
//! 5. skin smoothing (box blur restricted to a skin-tone mask)
//! 6. red-eye correction
//! 7. background blur (box blur restricted to the outer ring of the raster)
//!
//! Later stages see the output of earlier ones, so the order is part of the contract.
//! Masks are color and distance heuristics rather than segmentation. Alpha is never
//! modified.

use image::{Rgba, RgbaImage};
use log::Level;
use serde::{Deserialize, Serialize};

use crate::telemetry::timing_guard;

const EPSILON: f32 = 1e-6;

/// Background starts at this fraction of the center-to-corner distance.
const BACKGROUND_RADIUS_FRACTION: f32 = 0.4;

/// Settings for the enhancement pipeline. `Default` is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementSettings {
    /// Stretch each color channel's 1st..99th percentile to the full range.
    pub auto_color: bool,
    /// Exposure adjustment in stops (-2.0..=2.0).
    pub exposure_stops: f32,
    /// Contrast multiplier (0.5..=2.0, 1.0 = unchanged).
    pub contrast: f32,
    /// Sharpening amount (0.0..=2.0).
    pub sharpness: f32,
    /// Skin smoothing blur radius (0.0..=5.0, rounded to whole pixels).
    pub skin_smoothing: f32,
    /// Desaturate strongly red pixels.
    pub red_eye_removal: bool,
    /// Background blur radius in pixels (0.0..=10.0, rounded).
    pub background_blur: f32,
}

impl Default for EnhancementSettings {
    fn default() -> Self {
        Self {
            auto_color: false,
            exposure_stops: 0.0,
            contrast: 1.0,
            sharpness: 0.0,
            skin_smoothing: 0.0,
            red_eye_removal: false,
            background_blur: 0.0,
        }
    }
}

impl EnhancementSettings {
    /// Copy with every field clamped to its documented range.
    ///
    /// Non-finite values fall back to the no-op default for that field.
    pub fn sanitized(&self) -> Self {
        fn finite_or(v: f32, fallback: f32) -> f32 {
            if v.is_finite() { v } else { fallback }
        }
        Self {
            auto_color: self.auto_color,
            exposure_stops: finite_or(self.exposure_stops, 0.0).clamp(-2.0, 2.0),
            contrast: finite_or(self.contrast, 1.0).clamp(0.5, 2.0),
            sharpness: finite_or(self.sharpness, 0.0).clamp(0.0, 2.0),
            skin_smoothing: finite_or(self.skin_smoothing, 0.0).clamp(0.0, 5.0),
            red_eye_removal: self.red_eye_removal,
            background_blur: finite_or(self.background_blur, 0.0).clamp(0.0, 10.0),
        }
    }

    /// True when no stage would run.
    pub fn is_noop(&self) -> bool {
        let s = self.sanitized();
        !s.auto_color
            && s.exposure_stops.abs() < EPSILON
            && (s.contrast - 1.0).abs() < EPSILON
            && s.sharpness <= 0.0
            && s.skin_smoothing <= 0.0
            && !s.red_eye_removal
            && s.background_blur <= 0.0
    }
}

fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Value at which the cumulative histogram first reaches `fraction` of `total`.
fn percentile(hist: &[u32; 256], total: u64, fraction: f64) -> u8 {
    let mut running = 0u64;
    for (value, count) in hist.iter().enumerate() {
        running += *count as u64;
        if running as f64 / total as f64 >= fraction {
            return value as u8;
        }
    }
    u8::MAX
}

/// Lookup table mapping `[p1, p99]` onto `[0, 255]`, or `None` for a flat channel.
fn stretch_lut(hist: &[u32; 256], total: u64) -> Option<[u8; 256]> {
    let low = percentile(hist, total, 0.01);
    let high = percentile(hist, total, 0.99);
    if high <= low {
        return None;
    }
    let range = (high - low) as f32;
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = to_channel((i as f32 - low as f32) * 255.0 / range);
    }
    Some(lut)
}

fn apply_auto_color(buf: &mut RgbaImage) {
    let total = buf.width() as u64 * buf.height() as u64;
    if total == 0 {
        return;
    }
    let mut hist = [[0u32; 256]; 3];
    for px in buf.pixels() {
        for (c, channel_hist) in hist.iter_mut().enumerate() {
            channel_hist[px[c] as usize] += 1;
        }
    }
    let luts = hist.map(|channel| stretch_lut(&channel, total));
    for px in buf.pixels_mut() {
        for (c, lut) in luts.iter().enumerate() {
            if let Some(lut) = lut {
                px[c] = lut[px[c] as usize];
            }
        }
    }
}

fn apply_exposure(buf: &mut RgbaImage, stops: f32) {
    let factor = 2f32.powf(stops);
    for px in buf.pixels_mut() {
        for channel in px.0.iter_mut().take(3) {
            *channel = to_channel(*channel as f32 * factor);
        }
    }
}

fn apply_contrast(buf: &mut RgbaImage, multiplier: f32) {
    for px in buf.pixels_mut() {
        for channel in px.0.iter_mut().take(3) {
            *channel = to_channel((*channel as f32 - 128.0) * multiplier + 128.0);
        }
    }
}

/// Five-tap sharpening: center `1 + 4a`, orthogonal neighbours `-a`.
///
/// Border pixels are left untouched.
fn apply_sharpen(buf: &mut RgbaImage, amount: f32) {
    let (w, h) = buf.dimensions();
    if w < 3 || h < 3 {
        return;
    }
    let src = buf.clone();
    let center = 4.0f32.mul_add(amount, 1.0);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let c = src.get_pixel(x, y);
            let up = src.get_pixel(x, y - 1);
            let down = src.get_pixel(x, y + 1);
            let left = src.get_pixel(x - 1, y);
            let right = src.get_pixel(x + 1, y);
            let out = buf.get_pixel_mut(x, y);
            for ch in 0..3 {
                let neighbours =
                    up[ch] as f32 + down[ch] as f32 + left[ch] as f32 + right[ch] as f32;
                out[ch] = to_channel(center * c[ch] as f32 - amount * neighbours);
            }
        }
    }
}

fn is_skin(px: &Rgba<u8>) -> bool {
    let [r, g, b, _] = px.0;
    r > 60
        && g > 40
        && b > 20
        && r > b
        && r as f32 > 0.8 * g as f32
        && r as i16 - g as i16 > 15
}

fn skin_mask(buf: &RgbaImage) -> Vec<bool> {
    buf.pixels().map(is_skin).collect()
}

fn background_mask(w: u32, h: u32) -> Vec<bool> {
    let cx = w as f32 / 2.0;
    let cy = h as f32 / 2.0;
    let threshold = cx.hypot(cy) * BACKGROUND_RADIUS_FRACTION;
    let mut mask = Vec::with_capacity(w as usize * h as usize);
    for y in 0..h {
        for x in 0..w {
            mask.push((x as f32 - cx).hypot(y as f32 - cy) > threshold);
        }
    }
    mask
}

/// Replace every masked pixel with the mean of its `(2r+1)²` neighbourhood.
///
/// The neighbourhood includes unmasked pixels and is clipped at the raster border.
/// Sums come from an integral image of the unblurred input, so results do not depend
/// on traversal order.
fn selective_box_blur(buf: &mut RgbaImage, mask: &[bool], radius: u32) {
    if radius == 0 || !mask.iter().any(|m| *m) {
        return;
    }
    let (w, h) = (buf.width() as usize, buf.height() as usize);
    let stride = w + 1;
    let mut integral = vec![[0u64; 3]; stride * (h + 1)];
    for y in 0..h {
        let mut row = [0u64; 3];
        for x in 0..w {
            let px = buf.get_pixel(x as u32, y as u32);
            for c in 0..3 {
                row[c] += px[c] as u64;
                integral[(y + 1) * stride + x + 1][c] = integral[y * stride + x + 1][c] + row[c];
            }
        }
    }

    let r = radius as usize;
    for y in 0..h {
        for x in 0..w {
            if !mask[y * w + x] {
                continue;
            }
            let (x0, y0) = (x.saturating_sub(r), y.saturating_sub(r));
            let (x1, y1) = ((x + r + 1).min(w), (y + r + 1).min(h));
            let count = ((x1 - x0) * (y1 - y0)) as f64;
            let px = buf.get_pixel_mut(x as u32, y as u32);
            for c in 0..3 {
                let sum = (integral[y1 * stride + x1][c] + integral[y0 * stride + x0][c])
                    - (integral[y0 * stride + x1][c] + integral[y1 * stride + x0][c]);
                px[c] = (sum as f64 / count).round() as u8;
            }
        }
    }
}

fn apply_red_eye(buf: &mut RgbaImage) {
    for px in buf.pixels_mut() {
        let [r, g, b, _] = px.0;
        let (rf, gf, bf) = (r as f32, g as f32, b as f32);
        if r > 150 && rf > 2.0 * gf && rf > 2.0 * bf {
            px[0] = to_channel((0.7 * rf).min(1.2 * gf));
            px[2] = to_channel(bf.max(0.8 * gf));
        }
    }
}

fn blur_radius(amount: f32) -> u32 {
    amount.round().max(0.0) as u32
}

/// Run the enhancement pipeline over `buf` in place.
pub fn apply_enhancements(buf: &mut RgbaImage, settings: &EnhancementSettings) {
    let _guard = timing_guard("smartcrop_utils::apply_enhancements", Level::Debug);
    let s = settings.sanitized();
    if buf.width() == 0 || buf.height() == 0 {
        return;
    }

    if s.auto_color {
        apply_auto_color(buf);
    }
    if s.exposure_stops.abs() >= EPSILON {
        apply_exposure(buf, s.exposure_stops);
    }
    if (s.contrast - 1.0).abs() >= EPSILON {
        apply_contrast(buf, s.contrast);
    }
    if s.sharpness > 0.0 {
        apply_sharpen(buf, s.sharpness);
    }
    if s.skin_smoothing > 0.0 {
        let mask = skin_mask(buf);
        selective_box_blur(buf, &mask, blur_radius(s.skin_smoothing));
    }
    if s.red_eye_removal {
        apply_red_eye(buf);
    }
    if s.background_blur > 0.0 {
        let mask = background_mask(buf.width(), buf.height());
        selective_box_blur(buf, &mask, blur_radius(s.background_blur));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKIN: Rgba<u8> = Rgba([200, 120, 90, 255]);
    const SKIN_LIGHT: Rgba<u8> = Rgba([230, 160, 130, 255]);
    const BLUE: Rgba<u8> = Rgba([30, 60, 200, 255]);

    fn solid(color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba(color))
    }

    fn run(mut img: RgbaImage, settings: EnhancementSettings) -> RgbaImage {
        apply_enhancements(&mut img, &settings);
        img
    }

    #[test]
    fn default_settings_are_a_noop() {
        let img = RgbaImage::from_fn(8, 8, |x, y| Rgba([x as u8 * 20, y as u8 * 30, 77, 200]));
        assert!(EnhancementSettings::default().is_noop());
        assert_eq!(run(img.clone(), EnhancementSettings::default()), img);
    }

    #[test]
    fn auto_color_stretches_percentiles_to_full_range() {
        let mut img = RgbaImage::new(4, 1);
        for x in 0..2 {
            img.put_pixel(x, 0, Rgba([40, 80, 120, 255]));
        }
        for x in 2..4 {
            img.put_pixel(x, 0, Rgba([200, 160, 100, 255]));
        }
        let out = run(
            img,
            EnhancementSettings {
                auto_color: true,
                ..Default::default()
            },
        );
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(3, 0).0, [255, 255, 0, 255]);
    }

    #[test]
    fn auto_color_leaves_flat_channels_alone() {
        let out = run(
            solid([90, 90, 90, 255]),
            EnhancementSettings {
                auto_color: true,
                ..Default::default()
            },
        );
        assert_eq!(out.get_pixel(1, 1).0, [90, 90, 90, 255]);
    }

    #[test]
    fn exposure_scales_by_power_of_two() {
        let brighter = run(
            solid([64, 64, 64, 255]),
            EnhancementSettings {
                exposure_stops: 1.0,
                ..Default::default()
            },
        );
        assert_eq!(brighter.get_pixel(0, 0)[0], 128);

        let darker = run(
            solid([200, 200, 200, 255]),
            EnhancementSettings {
                exposure_stops: -1.0,
                ..Default::default()
            },
        );
        assert_eq!(darker.get_pixel(0, 0)[0], 100);

        let clipped = run(
            solid([200, 200, 200, 255]),
            EnhancementSettings {
                exposure_stops: 2.0,
                ..Default::default()
            },
        );
        assert_eq!(clipped.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn contrast_pivots_on_mid_gray() {
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([128, 128, 128, 255]));
        img.put_pixel(0, 0, Rgba([80, 80, 80, 255]));
        img.put_pixel(2, 0, Rgba([180, 180, 180, 255]));
        let out = run(
            img,
            EnhancementSettings {
                contrast: 1.5,
                ..Default::default()
            },
        );
        assert_eq!(out.get_pixel(0, 0)[0], 56);
        assert_eq!(out.get_pixel(1, 0)[0], 128);
        assert_eq!(out.get_pixel(2, 0)[0], 206);
    }

    #[test]
    fn sharpen_amplifies_edges_and_keeps_border() {
        let img = RgbaImage::from_fn(5, 5, |x, _| {
            if x < 2 {
                Rgba([100, 100, 100, 255])
            } else {
                Rgba([150, 150, 150, 255])
            }
        });
        let out = run(
            img.clone(),
            EnhancementSettings {
                sharpness: 1.0,
                ..Default::default()
            },
        );
        // Dark side of the edge gets darker, bright side brighter.
        assert_eq!(out.get_pixel(1, 2)[0], 50);
        assert_eq!(out.get_pixel(2, 2)[0], 200);
        for x in 0..5 {
            assert_eq!(out.get_pixel(x, 0), img.get_pixel(x, 0));
            assert_eq!(out.get_pixel(x, 4), img.get_pixel(x, 4));
        }
        assert_eq!(out.get_pixel(0, 2), img.get_pixel(0, 2));
    }

    #[test]
    fn skin_smoothing_blurs_only_skin_pixels() {
        let img = RgbaImage::from_fn(6, 6, |x, y| {
            if x >= 4 {
                BLUE
            } else if (x + y) % 2 == 0 {
                SKIN
            } else {
                SKIN_LIGHT
            }
        });
        let out = run(
            img.clone(),
            EnhancementSettings {
                skin_smoothing: 1.0,
                ..Default::default()
            },
        );
        for y in 0..6 {
            for x in 4..6 {
                assert_eq!(out.get_pixel(x, y), &BLUE);
            }
        }
        // Interior skin pixel (1,1): 5 SKIN + 4 SKIN_LIGHT neighbours.
        let expected_r = ((5.0 * 200.0 + 4.0 * 230.0) / 9.0f64).round() as u8;
        assert_eq!(out.get_pixel(1, 1)[0], expected_r);
        assert_eq!(out.get_pixel(1, 1)[3], 255);
    }

    #[test]
    fn is_skin_matches_heuristic() {
        assert!(is_skin(&SKIN));
        assert!(!is_skin(&BLUE));
        // Fails the R - G > 15 rule.
        assert!(!is_skin(&Rgba([120, 110, 90, 255])));
    }

    #[test]
    fn red_eye_reduces_red_channel() {
        let mut img = solid([90, 90, 90, 255]);
        img.put_pixel(1, 1, Rgba([200, 50, 40, 255]));
        let out = run(
            img,
            EnhancementSettings {
                red_eye_removal: true,
                ..Default::default()
            },
        );
        assert_eq!(out.get_pixel(1, 1).0, [60, 50, 40, 255]);
        assert_eq!(out.get_pixel(0, 0).0, [90, 90, 90, 255]);
    }

    #[test]
    fn background_blur_keeps_center_sharp() {
        let img = RgbaImage::from_fn(21, 21, |x, y| {
            let v = if (x + y) % 2 == 0 { 255 } else { 0 };
            Rgba([v, v, v, 255])
        });
        let out = run(
            img.clone(),
            EnhancementSettings {
                background_blur: 2.0,
                ..Default::default()
            },
        );
        assert_eq!(out.get_pixel(10, 10), img.get_pixel(10, 10));
        assert_ne!(out.get_pixel(0, 0), img.get_pixel(0, 0));
        assert_ne!(out.get_pixel(20, 20), img.get_pixel(20, 20));
    }

    #[test]
    fn background_mask_marks_outer_ring() {
        let mask = background_mask(10, 10);
        assert!(mask[0]);
        assert!(!mask[5 * 10 + 5]);
    }

    #[test]
    fn pipeline_is_deterministic() {
        let img = RgbaImage::from_fn(24, 18, |x, y| {
            Rgba([
                (x * 11 % 256) as u8,
                (y * 13 % 256) as u8,
                ((x + y) * 7 % 256) as u8,
                255,
            ])
        });
        let settings = EnhancementSettings {
            auto_color: true,
            exposure_stops: 0.4,
            contrast: 1.2,
            sharpness: 0.8,
            skin_smoothing: 2.0,
            red_eye_removal: true,
            background_blur: 3.0,
        };
        let a = run(img.clone(), settings.clone());
        let b = run(img, settings);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn sanitized_clamps_ranges() {
        let s = EnhancementSettings {
            exposure_stops: 9.0,
            contrast: f32::NAN,
            sharpness: -1.0,
            skin_smoothing: 12.0,
            background_blur: 40.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(s.exposure_stops, 2.0);
        assert_eq!(s.contrast, 1.0);
        assert_eq!(s.sharpness, 0.0);
        assert_eq!(s.skin_smoothing, 5.0);
        assert_eq!(s.background_blur, 10.0);
    }

    #[test]
    fn alpha_is_preserved() {
        let img = RgbaImage::from_fn(6, 6, |x, y| {
            let v = if (x + y) % 2 == 0 { 220 } else { 40 };
            Rgba([v, v / 2, v / 3, 77])
        });
        let out = run(
            img,
            EnhancementSettings {
                auto_color: true,
                sharpness: 1.5,
                background_blur: 1.0,
                ..Default::default()
            },
        );
        assert!(out.pixels().all(|p| p[3] == 77));
    }
}
