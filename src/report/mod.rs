//! Report generation — the evidence-backed verdict document
//!
//! Materializes a terminal job plus its signals into a self-contained
//! report: artifact identity, the overall verdict with a confidence
//! band, one evidence entry per signal, and a summary with risk level
//! and recommendations. Failed jobs produce a report too, with the
//! failure in place of conclusions.

pub mod json;

use crate::ingest::{Fingerprint, Modality};
use crate::job::{AnalysisJob, FailureKind, JobStatus};
use crate::signal::{ConfidenceLevel, Signal, SignalCategory, SignalKind};
use crate::verdict::Verdict;
use crate::PramanaResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

// ─── Report shape ──────────────────────────────────────────────────────

/// Identity of the analyzed artifact
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub fingerprint: Fingerprint,
    pub modality: Modality,
    pub storage_path: String,
    pub submitted_at: DateTime<Utc>,
    pub status: JobStatus,
}

/// One signal's contribution to the verdict
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceEntry {
    pub result: SignalCategory,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub evidence_data: serde_json::Value,
    /// Analyzer wall-clock time in seconds
    pub processing_time: f64,
    pub model_version: String,
}

impl From<&Signal> for EvidenceEntry {
    fn from(signal: &Signal) -> Self {
        Self {
            result: signal.category,
            confidence: signal.confidence,
            confidence_level: signal.confidence_level(),
            evidence_data: signal.evidence.clone(),
            processing_time: signal.processing_time,
            model_version: signal.model_version.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// The analysis never finished, so there is no ruling to rate
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyFinding {
    pub kind: SignalKind,
    pub finding: String,
    pub confidence: f64,
}

/// Human-oriented digest of the analysis
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub total_signals: usize,
    pub signal_kinds: Vec<SignalKind>,
    pub overall_risk_level: RiskLevel,
    pub key_findings: Vec<KeyFinding>,
    pub recommendations: Vec<String>,
}

/// Complete verdict report for one artifact
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub artifact: ArtifactInfo,
    pub verdict: Option<Verdict>,
    pub confidence_score: Option<f64>,
    pub confidence_level: Option<ConfidenceLevel>,
    pub failure: Option<FailureKind>,
    pub evidence: BTreeMap<SignalKind, EvidenceEntry>,
    pub summary: ReportSummary,
    /// When the job reached its terminal state
    pub analysis_date: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
}

// ─── Materialization ───────────────────────────────────────────────────

/// Build the report for a terminal job from its stored signals
pub fn materialize(job: &AnalysisJob, signals: &[Signal]) -> Report {
    let artifact = ArtifactInfo {
        fingerprint: job.fingerprint.clone(),
        modality: job.modality,
        storage_path: job.storage_path.clone(),
        submitted_at: job.created_at,
        status: job.status,
    };

    let summary = match job.status {
        JobStatus::Failed => summarize_failure(job.failure),
        _ => summarize(signals),
    };

    let evidence = signals
        .iter()
        .map(|s| (s.kind, EvidenceEntry::from(s)))
        .collect();

    Report {
        artifact,
        verdict: job.verdict,
        confidence_score: job.confidence,
        confidence_level: job.confidence.map(ConfidenceLevel::from_score),
        failure: job.failure,
        evidence,
        summary,
        analysis_date: job.completed_at,
        generated_at: Utc::now(),
    }
}

/// Risk level, findings, and recommendations over the signal set.
///
/// Any suspicious signal raises the risk: high when at least half the
/// signals are suspicious, medium otherwise.
fn summarize(signals: &[Signal]) -> ReportSummary {
    let suspicious_count = signals.iter().filter(|s| s.is_suspicious()).count();

    let overall_risk_level = if suspicious_count > 0 {
        if suspicious_count as f64 >= signals.len() as f64 * 0.5 {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    } else {
        RiskLevel::Low
    };

    let key_findings = signals
        .iter()
        .filter(|s| s.is_suspicious())
        .map(|s| KeyFinding {
            kind: s.kind,
            finding: format!(
                "Suspicious activity detected with {:.2} confidence",
                s.confidence
            ),
            confidence: s.confidence,
        })
        .collect();

    let recommendations = match overall_risk_level {
        RiskLevel::High => vec![
            "File shows strong signs of manipulation. Do not trust this content.".to_string(),
            "Consider reporting to relevant authorities if this is official documentation."
                .to_string(),
        ],
        RiskLevel::Medium => vec![
            "File shows some suspicious characteristics. Verify from original source.".to_string(),
            "Cross-reference with other sources before using this content.".to_string(),
        ],
        _ => vec![
            "File appears authentic based on forensic analysis.".to_string(),
            "Standard verification practices still recommended.".to_string(),
        ],
    };

    ReportSummary {
        total_signals: signals.len(),
        signal_kinds: signals.iter().map(|s| s.kind).collect(),
        overall_risk_level,
        key_findings,
        recommendations,
    }
}

fn summarize_failure(kind: Option<FailureKind>) -> ReportSummary {
    let cause = kind
        .map(|k| k.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    ReportSummary {
        total_signals: 0,
        signal_kinds: Vec::new(),
        overall_risk_level: RiskLevel::Unknown,
        key_findings: Vec::new(),
        recommendations: vec![
            format!(
                "Analysis did not complete ({}), so no forensic conclusions are available.",
                cause
            ),
            "Resubmit the artifact or trigger a reanalysis.".to_string(),
        ],
    }
}

/// Render and write the report to `output` as pretty-printed JSON
pub fn write_report(report: &Report, output: &Path) -> PramanaResult<()> {
    let content = json::render(report)?;
    std::fs::write(output, content).map_err(crate::PramanaError::Io)?;
    Ok(())
}
