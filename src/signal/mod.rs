//! Signal model — one extractor's structured output for one job
//!
//! A `Signal` is immutable once written: category, calibrated confidence,
//! an opaque evidence payload, and the wall-clock cost of producing it.
//! Multiple signals may exist per job (images produce a pixel-error signal
//! and a classifier signal).

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Signal Taxonomy ───────────────────────────────────────────────

/// The extractor family that produced a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Document structure + metadata forensics
    Structural,
    /// Error-level analysis over re-encoded pixels
    PixelError,
    /// Learned tamper classifier
    Classifier,
    /// Free-text credibility analysis
    Textual,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Structural => "structural",
            Self::PixelError => "pixel_error",
            Self::Classifier => "classifier",
            Self::Textual => "textual",
        };
        write!(f, "{}", s)
    }
}

/// Categorical outcome of one extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Authentic,
    Suspicious,
    Malicious,
}

impl fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Authentic => "authentic",
            Self::Suspicious => "suspicious",
            Self::Malicious => "malicious",
        };
        write!(f, "{}", s)
    }
}

/// Confidence band for human-facing reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(confidence: f64) -> Self {
        if confidence >= 0.8 {
            Self::High
        } else if confidence >= 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

// ─── Signal ────────────────────────────────────────────────────────

/// One extractor's result for one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub category: SignalCategory,
    /// Calibrated confidence in `[0, 1]`
    pub confidence: f64,
    /// Opaque structured payload: counts, scores, excerpts
    pub evidence: serde_json::Value,
    /// Wall-clock seconds spent producing this signal
    pub processing_time: f64,
    /// Analyzer version tag
    pub model_version: String,
}

impl Signal {
    pub fn new(kind: SignalKind, category: SignalCategory, confidence: f64) -> Self {
        Self {
            kind,
            category,
            confidence: confidence.clamp(0.0, 1.0),
            evidence: serde_json::Value::Null,
            processing_time: 0.0,
            model_version: String::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: serde_json::Value) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_processing_time(mut self, seconds: f64) -> Self {
        self.processing_time = seconds;
        self
    }

    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = version.into();
        self
    }

    /// Neutral placeholder for an extractor that could not complete.
    /// Degradation is recorded in the evidence payload, never hidden.
    pub fn neutral(kind: SignalKind, reason: &str) -> Self {
        Self::new(kind, SignalCategory::Authentic, 0.5).with_evidence(serde_json::json!({
            "degraded": true,
            "reason": reason,
        }))
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.confidence)
    }

    pub fn is_suspicious(&self) -> bool {
        matches!(
            self.category,
            SignalCategory::Suspicious | SignalCategory::Malicious
        )
    }

    pub fn is_degraded(&self) -> bool {
        self.evidence
            .get("degraded")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}
