//! # pramana — Multi-Signal Content Authenticity Engine
//!
//! Ingests a content artifact (document, image, or free text) and produces a
//! categorical authenticity verdict with a calibrated confidence score, backed
//! by structured per-signal evidence.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        VerdictEngine                         │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │
//! │  │ Ingest    │  │ Dedup     │  │ Job Store │  │ Scheduler │  │
//! │  │ (magic +  │─▶│ Gate      │─▶│ (atomic   │─▶│ (tokio    │  │
//! │  │  SHA-256) │  │           │  │  claim)   │  │  spawn)   │  │
//! │  └───────────┘  └───────────┘  └───────────┘  └─────┬─────┘  │
//! │  ┌──────────────────────────────────────────────────▼─────┐  │
//! │  │  Signal Extractors (per modality, panic-safe)          │  │
//! │  │  Structural │ Pixel-Error │ Classifier │ Text          │  │
//! │  └────────────────────────┬───────────────────────────────┘  │
//! │  ┌────────────────────────▼───────────────────────────────┐  │
//! │  │  Aggregator → Verdict + Confidence → Evidence → Report │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Capabilities
//!
//! - **Content Fingerprinting**: SHA-256 identity; identical bytes are never
//!   analyzed twice (idempotent re-submission)
//! - **Document Forensics**: suspicious-construct taxonomy (JavaScript,
//!   auto-run actions, embedded files, external navigation) plus metadata
//!   anomaly detection over creation/modification timestamps and producer
//!   software
//! - **Image Forensics**: error-level analysis fused with an optional learned
//!   classifier via an explicit agreement/disagreement resolution rule
//! - **Text Intelligence**: red-flag taxonomy, sentiment scoring, and numeric
//!   claim verification against historical baselines
//! - **Job Lifecycle**: atomic pending→processing claim, at-most-once
//!   execution, bounded by a timeout, explicit terminal failure
//! - **Structured Evidence**: per-signal payloads materialized into durable
//!   reports with risk summaries and recommendations

pub mod analyzers;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod job;
pub mod report;
pub mod signal;
pub mod verdict;

// Re-exports for convenience
pub use analyzers::HistoricalBaseline;
pub use config::EngineConfig;
pub use engine::{
    EngineDeps, Scheduler, SpawnScheduler, SubmitOutcome, SubmitRequest, VerdictEngine,
};
pub use ingest::{Artifact, ContentSource, Fingerprint, FsContentSource, Modality};
pub use job::{
    AnalysisJob, CreateOutcome, EvidenceSink, FailureKind, JobStatus, JobStore,
    MemoryEvidenceSink, MemoryJobStore,
};
pub use report::{materialize, Report, ReportSummary, RiskLevel};
pub use signal::{ConfidenceLevel, Signal, SignalCategory, SignalKind};
pub use verdict::{aggregate, Verdict};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PramanaError {
    #[error("Unsupported modality: {0}")]
    UnsupportedModality(String),

    #[error("Artifact too large: {actual} bytes (limit {limit})")]
    OversizeArtifact { actual: u64, limit: u64 },

    #[error("Content retrieval failed: {0}")]
    Retrieval(String),

    #[error("Signal extraction failed: {0}")]
    Extraction(String),

    #[error("Analysis timed out after {0}s")]
    Timeout(u64),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid job state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type PramanaResult<T> = Result<T, PramanaError>;
