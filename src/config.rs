//! Engine configuration — `pramana.toml`
//!
//! Tunable limits and analyzer settings. Every field carries a production
//! default, so a missing or partial config file is always usable. Scoring
//! weights and verdict thresholds are intentionally *not* configurable; they
//! are part of the engine's calibrated behavior.

use crate::{PramanaError, PramanaResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration (loaded from `pramana.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub document: DocumentConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub text: TextConfig,
}

/// Ingestion and execution limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum artifact size accepted at ingestion
    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: u64,

    /// Wall-clock bound for one job's extraction + aggregation
    #[serde(default = "default_timeout_secs")]
    pub analysis_timeout_secs: u64,
}

/// Structural/security analyzer settings (documents)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Run the suspicious-construct scan. When disabled the analyzer
    /// degrades to metadata-only evidence.
    #[serde(default = "default_true")]
    pub enable_construct_scan: bool,

    /// Producer strings considered known software (case-insensitive
    /// substring match)
    #[serde(default = "default_producer_allow_list")]
    pub producer_allow_list: Vec<String>,

    /// Creation→modification gap below this is flagged as a rapid edit
    #[serde(default = "default_rapid_edit_window")]
    pub rapid_edit_window_secs: i64,
}

/// Pixel-error analyzer + learned classifier settings (images)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// JPEG quality used for the error-level re-encode
    #[serde(default = "default_ela_quality")]
    pub ela_quality: u8,

    /// Remote tamper-classifier endpoint. None = neutral fallback.
    #[serde(default)]
    pub classifier_endpoint: Option<String>,
}

/// Text credibility analyzer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    /// Remote red-flag classifier endpoint. None = rule-based fallback.
    #[serde(default)]
    pub classifier_endpoint: Option<String>,

    /// Minimum classifier score for a red-flag category to count
    #[serde(default = "default_category_threshold")]
    pub category_threshold: f64,

    /// Sentiment score above which strongly-positive framing is penalized
    #[serde(default = "default_sentiment_high_confidence")]
    pub sentiment_high_confidence: f64,

    /// Claim-vs-baseline deviation (percent) above which a numeric claim
    /// counts as anomalous
    #[serde(default = "default_claim_deviation_pct")]
    pub claim_deviation_pct: f64,
}

fn default_max_artifact_bytes() -> u64 {
    100 * 1024 * 1024
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_true() -> bool {
    true
}
fn default_producer_allow_list() -> Vec<String> {
    [
        "adobe",
        "acrobat",
        "pdf",
        "word",
        "excel",
        "libreoffice",
        "openoffice",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_rapid_edit_window() -> i64 {
    60
}
fn default_ela_quality() -> u8 {
    95
}
fn default_category_threshold() -> f64 {
    0.7
}
fn default_sentiment_high_confidence() -> f64 {
    0.8
}
fn default_claim_deviation_pct() -> f64 {
    50.0
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_artifact_bytes: default_max_artifact_bytes(),
            analysis_timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            enable_construct_scan: true,
            producer_allow_list: default_producer_allow_list(),
            rapid_edit_window_secs: default_rapid_edit_window(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            ela_quality: default_ela_quality(),
            classifier_endpoint: None,
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            classifier_endpoint: None,
            category_threshold: default_category_threshold(),
            sentiment_high_confidence: default_sentiment_high_confidence(),
            claim_deviation_pct: default_claim_deviation_pct(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> PramanaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| PramanaError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Try to load `pramana.toml` from a directory, fall back to defaults
    pub fn from_dir_or_default(dir: &Path) -> Self {
        let path = dir.join("pramana.toml");
        if path.exists() {
            match Self::from_file(&path) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {} — using defaults", path.display(), e);
                }
            }
        }
        Self::default()
    }
}
