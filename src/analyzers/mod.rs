//! Analyzer set — one extraction path per modality
//!
//! Documents run the structural analyzer, images run pixel-error analysis
//! and the tamper classifier side by side, text runs credibility scoring.
//! Each produced signal carries its wall-clock processing time; analyzers
//! with a degrade path fall back to neutral signals instead of failing
//! the job.

pub mod classifier;
pub mod document;
pub mod pixel_error;
pub mod text;

pub use classifier::TamperClassifier;
pub use document::DocumentAnalyzer;
pub use pixel_error::PixelErrorAnalyzer;
pub use text::{HistoricalBaseline, TextAnalyzer};

use crate::config::EngineConfig;
use crate::ingest::Modality;
use crate::signal::{Signal, SignalKind};
use crate::{PramanaError, PramanaResult};
use std::panic::AssertUnwindSafe;
use std::time::Instant;

/// All analyzers, constructed once per engine and shared across jobs
pub struct AnalyzerSet {
    document: DocumentAnalyzer,
    pixel_error: PixelErrorAnalyzer,
    classifier: TamperClassifier,
    text: TextAnalyzer,
}

impl AnalyzerSet {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            document: DocumentAnalyzer::new(config.document.clone()),
            pixel_error: PixelErrorAnalyzer::new(&config.image),
            classifier: TamperClassifier::new(&config.image),
            text: TextAnalyzer::new(config.text.clone()),
        }
    }

    /// Run every analyzer the modality calls for. The returned order is
    /// significant: the first signal is the primary one when the verdict
    /// combination weighs signals against each other.
    pub async fn extract(
        &self,
        modality: Modality,
        content: &[u8],
        baseline: Option<&HistoricalBaseline>,
    ) -> PramanaResult<Vec<Signal>> {
        match modality {
            Modality::Document => Ok(vec![self.run_structural(content)?]),
            Modality::Image => {
                let (ela, cls) =
                    tokio::join!(self.run_pixel_error(content), self.run_classifier(content));
                Ok(vec![ela, cls])
            }
            Modality::Text => Ok(vec![self.run_textual(content, baseline).await?]),
            Modality::Video | Modality::Audio => {
                Err(PramanaError::UnsupportedModality(modality.to_string()))
            }
        }
    }

    /// Structural analysis with panic containment. The analyzer handles
    /// its own degrade paths; a panic here is a bug, not bad input, and
    /// fails the job.
    fn run_structural(&self, content: &[u8]) -> PramanaResult<Signal> {
        let start = Instant::now();
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| self.document.analyze(content)));
        let elapsed = start.elapsed().as_secs_f64();

        match outcome {
            Ok(result) => result.map(|s| s.with_processing_time(elapsed)),
            Err(_) => Err(PramanaError::Extraction(
                "structural analyzer panicked".to_string(),
            )),
        }
    }

    /// Pixel-error analysis on the blocking pool. Any failure degrades to
    /// a neutral signal so the classifier still carries the image job.
    async fn run_pixel_error(&self, content: &[u8]) -> Signal {
        let start = Instant::now();
        let analyzer = self.pixel_error.clone();
        let owned = content.to_vec();
        let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&owned)).await;
        let elapsed = start.elapsed().as_secs_f64();

        let signal = match outcome {
            Ok(Ok(signal)) => signal,
            Ok(Err(e)) => {
                tracing::warn!("pixel-error analysis degraded: {}", e);
                Signal::neutral(SignalKind::PixelError, &e.to_string())
                    .with_model_version(pixel_error::MODEL_VERSION)
            }
            Err(e) => {
                tracing::warn!("pixel-error task failed: {}", e);
                Signal::neutral(SignalKind::PixelError, "pixel-error analysis panicked")
                    .with_model_version(pixel_error::MODEL_VERSION)
            }
        };
        signal.with_processing_time(elapsed)
    }

    async fn run_classifier(&self, content: &[u8]) -> Signal {
        let start = Instant::now();
        let signal = self.classifier.classify(content).await;
        signal.with_processing_time(start.elapsed().as_secs_f64())
    }

    async fn run_textual(
        &self,
        content: &[u8],
        baseline: Option<&HistoricalBaseline>,
    ) -> PramanaResult<Signal> {
        let start = Instant::now();
        let signal = self.text.analyze(content, baseline).await?;
        Ok(signal.with_processing_time(start.elapsed().as_secs_f64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    fn set() -> AnalyzerSet {
        AnalyzerSet::new(&EngineConfig::default())
    }

    fn small_png() -> Vec<u8> {
        let img = RgbImage::from_pixel(16, 16, Rgb([90, 90, 90]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
            .unwrap();
        out
    }

    #[tokio::test]
    async fn test_document_dispatch() {
        let signals = set()
            .extract(Modality::Document, b"%PDF-1.4 << /JS (x) >>", None)
            .await
            .unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Structural);
        assert!(signals[0].processing_time >= 0.0);
    }

    #[tokio::test]
    async fn test_image_dispatch_is_pixel_error_first() {
        let signals = set()
            .extract(Modality::Image, &small_png(), None)
            .await
            .unwrap();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].kind, SignalKind::PixelError);
        assert_eq!(signals[1].kind, SignalKind::Classifier);
    }

    #[tokio::test]
    async fn test_corrupt_image_degrades_pixel_error() {
        // Magic bytes said PNG at ingest, body is unreadable
        let signals = set()
            .extract(Modality::Image, b"\x89PNG\r\n\x1a\ngarbage", None)
            .await
            .unwrap();
        assert!(signals[0].is_degraded());
        assert_eq!(signals[0].category, crate::signal::SignalCategory::Authentic);
        assert!((signals[0].confidence - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_text_dispatch() {
        let signals = set()
            .extract(Modality::Text, b"Quarterly results were filed.", None)
            .await
            .unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Textual);
    }

    #[tokio::test]
    async fn test_video_is_rejected() {
        let err = set()
            .extract(Modality::Video, b"\x00\x00\x00\x18ftypmp42", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PramanaError::UnsupportedModality(_)));
    }
}
