//! Learned tamper classifier — optional remote model endpoint
//!
//! The classifier is a black box behind an HTTP endpoint: the image bytes
//! go out, a tamper probability comes back. When no endpoint is configured
//! or the call fails, the signal degrades to a neutral (authentic, 0.5)
//! verdict instead of failing the job, so the pixel-error signal still
//! carries the analysis.

use crate::config::ImageConfig;
use crate::signal::{Signal, SignalCategory, SignalKind};
use serde::Deserialize;
use std::time::Duration;

const MODEL_VERSION: &str = "tamper-cnn-1.0";

/// Response shape from the classifier endpoint
#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    /// Probability that the image is tampered, in [0, 1]
    score: f64,
    #[serde(default)]
    label: Option<String>,
}

/// Remote tamper-probability classifier
pub struct TamperClassifier {
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl TamperClassifier {
    pub fn new(config: &ImageConfig) -> Self {
        if config.classifier_endpoint.is_none() {
            tracing::info!(
                "tamper classifier endpoint not configured — image jobs run on pixel error alone"
            );
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            endpoint: config.classifier_endpoint.clone(),
            client,
        }
    }

    /// Whether a model endpoint is configured
    pub fn is_available(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Classify one image. Never fails: degraded conditions produce a
    /// neutral signal with the reason recorded in its evidence.
    pub async fn classify(&self, content: &[u8]) -> Signal {
        let endpoint = match &self.endpoint {
            Some(url) => url,
            None => {
                return Signal::neutral(SignalKind::Classifier, "no classifier endpoint configured")
                    .with_model_version(MODEL_VERSION);
            }
        };

        match self.call_endpoint(endpoint, content).await {
            Ok(resp) => {
                let probability = resp.score.clamp(0.0, 1.0);
                let (category, confidence) = map_probability(probability);

                tracing::debug!(
                    "classifier scored tamper probability {:.3} -> {} ({:.2})",
                    probability,
                    category,
                    confidence
                );

                Signal::new(SignalKind::Classifier, category, confidence)
                    .with_evidence(serde_json::json!({
                        "tamper_probability": probability,
                        "endpoint_label": resp.label,
                    }))
                    .with_model_version(MODEL_VERSION)
            }
            Err(e) => {
                tracing::warn!("tamper classifier call failed: {}", e);
                Signal::neutral(SignalKind::Classifier, &format!("classifier call failed: {}", e))
                    .with_model_version(MODEL_VERSION)
            }
        }
    }

    async fn call_endpoint(
        &self,
        endpoint: &str,
        content: &[u8],
    ) -> Result<ClassifierResponse, String> {
        let response = self
            .client
            .post(endpoint)
            .header("content-type", "application/octet-stream")
            .body(content.to_vec())
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("endpoint returned {}", status));
        }

        response
            .json::<ClassifierResponse>()
            .await
            .map_err(|e| format!("unparseable response: {}", e))
    }
}

/// Tamper probability above 0.5 flags the image with the raw probability;
/// otherwise the authentic side wins with the complement.
fn map_probability(probability: f64) -> (SignalCategory, f64) {
    if probability > 0.5 {
        (SignalCategory::Suspicious, probability)
    } else {
        (SignalCategory::Authentic, 1.0 - probability)
    }
}
