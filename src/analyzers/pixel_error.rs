//! Pixel-error analyzer — error-level analysis over a lossy re-encode
//!
//! Splices and pastes recompress differently from the surrounding image.
//! Re-encoding at a fixed JPEG quality and diffing against the original
//! exposes those regions as error-level outliers. The score combines the
//! outlier fraction (weight 0.7) with the edge density of the error map
//! (weight 0.3), scaled by 10 and capped at 1.0.
//!
//! The error map is amplified (×10, clipped at 255) before statistics, so
//! small re-encode differences stay visible against the quantization floor.

use crate::config::ImageConfig;
use crate::signal::{Signal, SignalCategory, SignalKind};
use crate::{PramanaError, PramanaResult};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use rayon::prelude::*;

pub(crate) const MODEL_VERSION: &str = "ela-1.0";

/// Gradient magnitude above this counts as an edge pixel in the error map
const SOBEL_EDGE_THRESHOLD: f64 = 128.0;

/// Error-level analysis over a fixed-quality JPEG re-encode
#[derive(Clone)]
pub struct PixelErrorAnalyzer {
    quality: u8,
}

impl PixelErrorAnalyzer {
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            quality: config.ela_quality,
        }
    }

    /// Produce the pixel-error signal for one image
    pub fn analyze(&self, content: &[u8]) -> PramanaResult<Signal> {
        let original = image::load_from_memory(content)
            .map_err(|e| PramanaError::ImageDecode(e.to_string()))?
            .to_rgb8();
        let (width, height) = original.dimensions();

        let reencoded = self.reencode(&original)?;
        let error_map = amplified_error_map(&original, &reencoded);

        let stats = ErrorStats::compute(&error_map);
        let edge_density = edge_density(&error_map, width as usize, height as usize);
        let raw = 0.7 * stats.outlier_fraction + 0.3 * edge_density;
        let tampering_score = (raw * 10.0).min(1.0);

        let (category, confidence) = map_score(tampering_score);

        tracing::debug!(
            "ELA {}x{}: score={:.3} (outliers={:.4}, edges={:.4}) -> {} ({:.2})",
            width,
            height,
            tampering_score,
            stats.outlier_fraction,
            edge_density,
            category,
            confidence
        );

        let evidence = serde_json::json!({
            "tampering_score": tampering_score,
            "outlier_fraction": stats.outlier_fraction,
            "edge_density": edge_density,
            "mean_error": stats.mean,
            "std_error": stats.std_dev,
            "width": width,
            "height": height,
            "reencode_quality": self.quality,
        });

        Ok(Signal::new(SignalKind::PixelError, category, confidence)
            .with_evidence(evidence)
            .with_model_version(MODEL_VERSION))
    }

    /// Round-trip through JPEG at the configured quality
    fn reencode(&self, original: &RgbImage) -> PramanaResult<RgbImage> {
        let mut encoded = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut encoded, self.quality);
        encoder
            .encode_image(original)
            .map_err(|e| PramanaError::Extraction(format!("JPEG re-encode failed: {}", e)))?;

        Ok(image::load_from_memory(&encoded)
            .map_err(|e| PramanaError::ImageDecode(format!("re-decode failed: {}", e)))?
            .to_rgb8())
    }
}

/// Map tampering score onto (category, confidence)
fn map_score(score: f64) -> (SignalCategory, f64) {
    if score > 0.7 {
        (SignalCategory::Suspicious, (0.6 + score * 0.3).min(0.95))
    } else if score > 0.4 {
        (SignalCategory::Suspicious, (0.5 + score * 0.3).min(0.85))
    } else {
        (SignalCategory::Authentic, (0.9 - score * 0.3).max(0.6))
    }
}

/// Per-pixel grayscale error, amplified ×10 and clipped at 255
fn amplified_error_map(original: &RgbImage, reencoded: &RgbImage) -> Vec<f64> {
    original
        .as_raw()
        .par_chunks_exact(3)
        .zip(reencoded.as_raw().par_chunks_exact(3))
        .map(|(a, b)| {
            let amp = |x: u8, y: u8| ((x as f32 - y as f32).abs() * 10.0).min(255.0);
            let r = amp(a[0], b[0]);
            let g = amp(a[1], b[1]);
            let bl = amp(a[2], b[2]);
            (0.299 * r + 0.587 * g + 0.114 * bl) as f64
        })
        .collect()
}

struct ErrorStats {
    mean: f64,
    std_dev: f64,
    outlier_fraction: f64,
}

impl ErrorStats {
    /// Mean, population σ, and the fraction of pixels above mean + 2σ
    fn compute(error_map: &[f64]) -> Self {
        let total = error_map.len() as f64;
        if error_map.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                outlier_fraction: 0.0,
            };
        }

        let sum: f64 = error_map.par_iter().sum();
        let mean = sum / total;
        let sq_sum: f64 = error_map.par_iter().map(|e| (e - mean) * (e - mean)).sum();
        let std_dev = (sq_sum / total).sqrt();

        let threshold = mean + 2.0 * std_dev;
        let outliers = error_map.par_iter().filter(|&&e| e > threshold).count();

        Self {
            mean,
            std_dev,
            outlier_fraction: outliers as f64 / total,
        }
    }
}

/// Fraction of error-map pixels that are Sobel edges. Normalized by the
/// full pixel count, matching the outlier fraction's denominator.
fn edge_density(error_map: &[f64], width: usize, height: usize) -> f64 {
    if width < 3 || height < 3 {
        return 0.0;
    }
    let idx = |x: usize, y: usize| y * width + x;

    let edge_count: usize = (1..height - 1)
        .into_par_iter()
        .map(|y| {
            let mut row_edges = 0usize;
            for x in 1..width - 1 {
                let gx = error_map[idx(x + 1, y - 1)] + 2.0 * error_map[idx(x + 1, y)]
                    + error_map[idx(x + 1, y + 1)]
                    - error_map[idx(x - 1, y - 1)]
                    - 2.0 * error_map[idx(x - 1, y)]
                    - error_map[idx(x - 1, y + 1)];
                let gy = error_map[idx(x - 1, y + 1)] + 2.0 * error_map[idx(x, y + 1)]
                    + error_map[idx(x + 1, y + 1)]
                    - error_map[idx(x - 1, y - 1)]
                    - 2.0 * error_map[idx(x, y - 1)]
                    - error_map[idx(x + 1, y - 1)];
                if (gx * gx + gy * gy).sqrt() > SOBEL_EDGE_THRESHOLD {
                    row_edges += 1;
                }
            }
            row_edges
        })
        .sum();

    edge_count as f64 / (width * height) as f64
}
