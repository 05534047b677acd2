//! Image quality analysis utilities.
//!
//! Sharpness is approximated by the mean squared response of a discrete Laplacian over
//! the luma plane of a face region. Crisp edges produce large responses while blur and
//! motion smearing flatten them. Raw scores are bucketed into three coarse bands:
//! `Low` (≤300), `Medium` (300‒1000) and `High` (>1000). Regions that cannot be scored
//! (zero area, no interior pixels) report `Unknown` with a score of zero; quality is
//! advisory and never fails a crop.
//!
//! Regions whose longer side exceeds [`MAX_SCORING_DIMENSION`] are downscaled before
//! scoring. The thresholds are not adjusted for the downscale, so scores of very large
//! faces are biased toward smoother results.

use image::RgbaImage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::image_utils::downscale_to_fit;

/// Longest side scored at full resolution.
pub const MAX_SCORING_DIMENSION: u32 = 1024;

const HIGH_THRESHOLD: f64 = 1000.0;
const MEDIUM_THRESHOLD: f64 = 300.0;

/// Quality tiers derived from the Laplacian score.
///
/// `Unknown` sorts below every measured tier so automatic selection never prefers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Unknown,
    Low,
    Medium,
    High,
}

impl Quality {
    /// Map a Laplacian score into a tier.
    pub fn from_variance(v: f64) -> Self {
        if v > HIGH_THRESHOLD {
            Quality::High
        } else if v > MEDIUM_THRESHOLD {
            Quality::Medium
        } else {
            Quality::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Unknown => "unknown",
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Quality::Low),
            "medium" | "med" => Ok(Quality::Medium),
            "high" => Ok(Quality::High),
            "unknown" => Ok(Quality::Unknown),
            other => Err(format!(
                "unknown quality '{other}', expected low/medium/high"
            )),
        }
    }
}

/// Score and tier for a scored region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    pub score: f64,
    pub level: Quality,
}

impl QualityResult {
    /// Fallback used for regions that cannot be measured.
    pub const UNKNOWN: QualityResult = QualityResult {
        score: 0.0,
        level: Quality::Unknown,
    };

    pub fn from_score(score: f64) -> Self {
        Self {
            score,
            level: Quality::from_variance(score),
        }
    }
}

/// Quality-driven automation rules applied to a set of faces.
#[derive(Debug, Clone, Default)]
pub struct QualityFilter {
    /// Minimum tier a face must reach to stay selected.
    pub min_quality: Option<Quality>,
    /// Keep only the best face of each image.
    pub auto_select: bool,
    /// Skip an image entirely when none of its faces reaches `High`.
    pub auto_skip_no_high: bool,
    /// Append a quality suffix to exported filenames.
    pub suffix_enabled: bool,
}

impl QualityFilter {
    pub fn new(min_quality: Option<Quality>) -> Self {
        Self {
            min_quality,
            ..Self::default()
        }
    }

    /// Returns true when a face of quality `q` falls below the minimum.
    ///
    /// `Unknown` is never skipped: an unmeasurable region is not evidence of blur.
    pub fn should_skip(&self, q: Quality) -> bool {
        match (self.min_quality, q) {
            (_, Quality::Unknown) => false,
            (Some(min), q) => q < min,
            (None, _) => false,
        }
    }

    /// When `auto_skip_no_high` is set, returns true unless the best face is `High`.
    pub fn should_skip_image(&self, best_quality: Option<Quality>) -> bool {
        self.auto_skip_no_high && best_quality != Some(Quality::High)
    }

    /// Index of the best result: higher tier first, raw score breaks ties.
    pub fn select_best_index(&self, results: &[QualityResult]) -> Option<usize> {
        results
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.level
                    .cmp(&b.level)
                    .then_with(|| a.score.total_cmp(&b.score))
            })
            .map(|(idx, _)| idx)
    }

    /// Filename suffix for `q` when suffixing is enabled.
    pub fn suffix_for(&self, q: Quality) -> Option<&'static str> {
        if !self.suffix_enabled {
            return None;
        }
        Some(match q {
            Quality::High => "_highq",
            Quality::Medium => "_medq",
            Quality::Low => "_lowq",
            Quality::Unknown => "_unknownq",
        })
    }
}

/// Rec. 601 luma plane of an RGBA buffer.
fn luma_plane(img: &RgbaImage) -> Array2<f64> {
    let (w, h) = img.dimensions();
    let mut arr = Array2::<f64>::zeros((h as usize, w as usize));
    for (x, y, px) in img.enumerate_pixels() {
        arr[[y as usize, x as usize]] =
            0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64;
    }
    arr
}

/// Mean squared Laplacian response over the interior pixels of `img`.
///
/// The kernel is `[[0,-1,0],[-1,8,-1],[0,-1,0]]`. Its weights do not sum to zero, so flat
/// non-black regions produce a non-zero response; this matches the scores the thresholds
/// were tuned on. Returns `None` when the region has no interior pixels. Downscaling for
/// large regions never removes the interior of a region that had one.
pub fn laplacian_variance(img: &RgbaImage) -> Option<f64> {
    let (w, h) = img.dimensions();
    if w < 3 || h < 3 {
        return None;
    }
    let scaled = downscale_to_fit(img, MAX_SCORING_DIMENSION, 3);

    let luma = luma_plane(&scaled);
    let (rows, cols) = luma.dim();
    let mut sum = 0.0f64;
    for y in 1..rows - 1 {
        for x in 1..cols - 1 {
            let response = 8.0 * luma[[y, x]]
                - luma[[y - 1, x]]
                - luma[[y + 1, x]]
                - luma[[y, x - 1]]
                - luma[[y, x + 1]];
            sum += response * response;
        }
    }
    let interior = ((rows - 2) * (cols - 2)) as f64;
    Some(sum / interior)
}

/// Score an RGBA region, falling back to [`QualityResult::UNKNOWN`] for degenerate input.
pub fn score_region(img: &RgbaImage) -> QualityResult {
    match laplacian_variance(img) {
        Some(score) if score.is_finite() => QualityResult::from_score(score),
        _ => QualityResult::UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checkerboard(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            let v = if (x + y) % 2 == 0 { 255 } else { 0 };
            Rgba([v, v, v, 255])
        })
    }

    fn box_blur3(src: &RgbaImage) -> RgbaImage {
        let (w, h) = src.dimensions();
        RgbaImage::from_fn(w, h, |x, y| {
            let mut acc = [0u32; 3];
            let mut n = 0u32;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx >= 0 && ny >= 0 && (nx as u32) < w && (ny as u32) < h {
                        let p = src.get_pixel(nx as u32, ny as u32);
                        for c in 0..3 {
                            acc[c] += p[c] as u32;
                        }
                        n += 1;
                    }
                }
            }
            Rgba([
                (acc[0] / n) as u8,
                (acc[1] / n) as u8,
                (acc[2] / n) as u8,
                255,
            ])
        })
    }

    #[test]
    fn quality_from_variance_thresholds() {
        assert_eq!(Quality::from_variance(0.0), Quality::Low);
        assert_eq!(Quality::from_variance(300.0), Quality::Low);
        assert_eq!(Quality::from_variance(300.1), Quality::Medium);
        assert_eq!(Quality::from_variance(1000.0), Quality::Medium);
        assert_eq!(Quality::from_variance(1000.5), Quality::High);
    }

    #[test]
    fn all_black_region_scores_zero_low() {
        let img = RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 255]));
        let result = score_region(&img);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.level, Quality::Low);
    }

    #[test]
    fn zero_area_region_is_unknown() {
        let result = score_region(&RgbaImage::new(0, 12));
        assert_eq!(result, QualityResult::UNKNOWN);
        let result = score_region(&RgbaImage::new(12, 0));
        assert_eq!(result.level, Quality::Unknown);
    }

    #[test]
    fn region_without_interior_is_unknown() {
        let img = RgbaImage::from_pixel(2, 40, Rgba([90, 90, 90, 255]));
        assert_eq!(score_region(&img).level, Quality::Unknown);
    }

    #[test]
    fn flat_gray_region_reports_kernel_bias() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([128, 128, 128, 255]));
        let result = score_region(&img);
        // Center weight 8 with four -1 neighbours leaves 4x the luma.
        assert!((result.score - 512.0 * 512.0).abs() < 1.0);
        assert_eq!(result.level, Quality::High);
    }

    #[test]
    fn checkerboard_scores_higher_than_blurred_copy() {
        let sharp = checkerboard(32);
        let blurred = box_blur3(&sharp);
        let sharp_score = score_region(&sharp).score;
        let blurred_score = score_region(&blurred).score;
        assert!(
            sharp_score > blurred_score,
            "sharp {sharp_score} should exceed blurred {blurred_score}"
        );
    }

    #[test]
    fn large_region_is_downscaled_but_still_scored() {
        let img = checkerboard(1500);
        let result = score_region(&img);
        assert!(result.score > 0.0);
        assert_ne!(result.level, Quality::Unknown);
    }

    #[test]
    fn long_thin_strip_keeps_its_interior() {
        let strip = RgbaImage::from_fn(3000, 4, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        let result = score_region(&strip);
        assert!(result.score > 0.0);
        assert_ne!(result.level, Quality::Unknown);
    }

    #[test]
    fn quality_filter_keeps_unknown_faces() {
        let filter = QualityFilter::new(Some(Quality::High));
        assert!(filter.should_skip(Quality::Low));
        assert!(filter.should_skip(Quality::Medium));
        assert!(!filter.should_skip(Quality::High));
        assert!(!filter.should_skip(Quality::Unknown));
    }

    #[test]
    fn quality_filter_auto_skip_requires_high() {
        let filter = QualityFilter {
            auto_skip_no_high: true,
            ..QualityFilter::default()
        };
        assert!(filter.should_skip_image(None));
        assert!(filter.should_skip_image(Some(Quality::Medium)));
        assert!(!filter.should_skip_image(Some(Quality::High)));
    }

    #[test]
    fn select_best_index_prefers_tier_then_score() {
        let filter = QualityFilter::default();
        let samples = [
            QualityResult::from_score(500.0),
            QualityResult::from_score(1200.0),
            QualityResult::from_score(4000.0),
            QualityResult::UNKNOWN,
        ];
        assert_eq!(filter.select_best_index(&samples), Some(2));
        assert_eq!(filter.select_best_index(&[]), None);
    }

    #[test]
    fn suffix_for_respects_flag() {
        let mut filter = QualityFilter::default();
        assert_eq!(filter.suffix_for(Quality::High), None);
        filter.suffix_enabled = true;
        assert_eq!(filter.suffix_for(Quality::High), Some("_highq"));
        assert_eq!(filter.suffix_for(Quality::Low), Some("_lowq"));
        assert_eq!(filter.suffix_for(Quality::Unknown), Some("_unknownq"));
    }

    #[test]
    fn parses_quality_names() {
        assert_eq!("MED".parse::<Quality>(), Ok(Quality::Medium));
        assert!("blurry".parse::<Quality>().is_err());
    }
}
