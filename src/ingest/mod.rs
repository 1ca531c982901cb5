//! Ingestion layer — raw bytes in, identified artifact out
//!
//! Everything the engine accepts goes through one gate: size validation,
//! modality resolution (magic bytes first, filename second, text sniff
//! last), and content fingerprinting. Unsupported modalities are rejected
//! here, before any job exists.

pub mod detector;
pub mod fingerprint;
pub mod source;

pub use detector::{resolve_modality, ContentFormat, Modality};
pub use fingerprint::Fingerprint;
pub use source::{ContentSource, FsContentSource};

use crate::config::LimitsConfig;
use crate::PramanaResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An identified, validated content artifact. Immutable after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub fingerprint: Fingerprint,
    pub modality: Modality,
    pub size_bytes: u64,
    pub submitted_at: DateTime<Utc>,
}

/// Validate and identify raw content. Rejections here (`OversizeArtifact`,
/// `UnsupportedModality`) happen before job creation.
pub fn ingest(
    content: &[u8],
    filename: Option<&str>,
    limits: &LimitsConfig,
) -> PramanaResult<Artifact> {
    let size_bytes = content.len() as u64;
    if size_bytes > limits.max_artifact_bytes {
        return Err(crate::PramanaError::OversizeArtifact {
            actual: size_bytes,
            limit: limits.max_artifact_bytes,
        });
    }

    let modality = resolve_modality(content, filename)?;
    let fingerprint = Fingerprint::identify(content);

    tracing::debug!(
        "ingested artifact {} ({}, {} bytes)",
        fingerprint.short(),
        modality,
        size_bytes
    );

    Ok(Artifact {
        fingerprint,
        modality,
        size_bytes,
        submitted_at: Utc::now(),
    })
}
