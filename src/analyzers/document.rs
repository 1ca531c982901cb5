//! Structural/security analyzer — document forensics over raw PDF bytes
//!
//! Two independent evidence sources feed one risk score:
//!
//! 1. A **suspicious-construct scan**: a lexical pass over the raw bytes that
//!    extracts PDF name tokens (decoding `#xx` hex escapes, honoring token
//!    boundaries) and matches them against a fixed taxonomy of
//!    security-relevant constructs. Each distinct construct type found
//!    contributes its risk weight once; occurrence counts are evidence only.
//! 2. **Metadata anomaly checks** over the info dictionary: backdated
//!    modification, rapid create→modify edits, missing software metadata,
//!    and producers outside the known-software allow-list.
//!
//! If the construct scan is disabled or fails on the input, the analyzer
//! degrades to metadata-only evidence and marks the scan source absent
//! rather than failing the signal.

use crate::config::DocumentConfig;
use crate::signal::{Signal, SignalCategory, SignalKind};
use crate::{PramanaError, PramanaResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use serde::Serialize;
use std::collections::HashMap;

const MODEL_VERSION: &str = "structural-1.2";

// ─── Construct Taxonomy ────────────────────────────────────────────

/// Risk tier of a suspicious construct type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl RiskTier {
    /// Points contributed by one distinct construct type of this tier
    pub fn weight(&self) -> u32 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

/// Functional group a construct belongs to (for evidence grouping)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructGroup {
    ScriptExecution,
    AutoRunAction,
    EmbeddedFile,
    RichMedia,
    ExternalNavigation,
}

/// Security-relevant PDF constructs the scan looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    Js,
    JavaScript,
    AcroForm,
    Launch,
    SubmitForm,
    ImportData,
    OpenAction,
    AdditionalActions,
    EmbeddedFile,
    FileAttachment,
    RichMedia,
    ThreeD,
    Movie,
    Uri,
    GoTo,
    GoToRemote,
}

impl ConstructKind {
    pub const ALL: [ConstructKind; 16] = [
        Self::Js,
        Self::JavaScript,
        Self::AcroForm,
        Self::Launch,
        Self::SubmitForm,
        Self::ImportData,
        Self::OpenAction,
        Self::AdditionalActions,
        Self::EmbeddedFile,
        Self::FileAttachment,
        Self::RichMedia,
        Self::ThreeD,
        Self::Movie,
        Self::Uri,
        Self::GoTo,
        Self::GoToRemote,
    ];

    /// The name token as it appears in the document (without escapes)
    pub fn token(&self) -> &'static str {
        match self {
            Self::Js => "/JS",
            Self::JavaScript => "/JavaScript",
            Self::AcroForm => "/AcroForm",
            Self::Launch => "/Launch",
            Self::SubmitForm => "/SubmitForm",
            Self::ImportData => "/ImportData",
            Self::OpenAction => "/OpenAction",
            Self::AdditionalActions => "/AA",
            Self::EmbeddedFile => "/EmbeddedFile",
            Self::FileAttachment => "/FileAttachment",
            Self::RichMedia => "/RichMedia",
            Self::ThreeD => "/3D",
            Self::Movie => "/Movie",
            Self::Uri => "/URI",
            Self::GoTo => "/GoTo",
            Self::GoToRemote => "/GoToR",
        }
    }

    pub fn group(&self) -> ConstructGroup {
        match self {
            Self::Js | Self::JavaScript | Self::AcroForm => ConstructGroup::ScriptExecution,
            Self::Launch
            | Self::SubmitForm
            | Self::ImportData
            | Self::OpenAction
            | Self::AdditionalActions => ConstructGroup::AutoRunAction,
            Self::EmbeddedFile | Self::FileAttachment => ConstructGroup::EmbeddedFile,
            Self::RichMedia | Self::ThreeD | Self::Movie => ConstructGroup::RichMedia,
            Self::Uri | Self::GoTo | Self::GoToRemote => ConstructGroup::ExternalNavigation,
        }
    }

    pub fn risk_tier(&self) -> RiskTier {
        match self {
            Self::Js
            | Self::JavaScript
            | Self::Launch
            | Self::SubmitForm
            | Self::OpenAction
            | Self::AdditionalActions
            | Self::Uri => RiskTier::High,
            Self::AcroForm
            | Self::EmbeddedFile
            | Self::FileAttachment
            | Self::ImportData
            | Self::GoTo
            | Self::GoToRemote => RiskTier::Medium,
            Self::RichMedia | Self::ThreeD | Self::Movie => RiskTier::Low,
        }
    }

    /// Why this construct matters, for human-facing evidence
    pub fn explanation(&self) -> &'static str {
        match self {
            Self::Js | Self::JavaScript => "Embedded JavaScript can execute code when the document opens",
            Self::AcroForm => "Interactive form that can carry scripted field actions",
            Self::Launch => "Launch action can start external programs",
            Self::SubmitForm => "Can exfiltrate form data to a remote endpoint",
            Self::ImportData => "Can pull external data into the document",
            Self::OpenAction => "Action that runs automatically on open",
            Self::AdditionalActions => "Trigger-bound actions (page open, close, hover)",
            Self::EmbeddedFile | Self::FileAttachment => "Carries an embedded payload file",
            Self::RichMedia => "Embedded Flash/rich-media content",
            Self::ThreeD => "Embedded 3D content with scriptable views",
            Self::Movie => "Embedded video content",
            Self::Uri => "External link target, a common phishing vector",
            Self::GoTo | Self::GoToRemote => "Navigation to another destination or document",
        }
    }
}

/// One distinct construct type found in a document
#[derive(Debug, Clone, Serialize)]
pub struct ConstructFinding {
    pub token: &'static str,
    pub group: ConstructGroup,
    pub risk_tier: RiskTier,
    pub occurrences: usize,
    pub explanation: &'static str,
}

// ─── Metadata ──────────────────────────────────────────────────────

/// Fields recovered from the document info dictionary
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentMetadata {
    pub producer: Option<String>,
    pub creator: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub modification_date: Option<DateTime<Utc>>,
}

/// Metadata anomaly classes, in severity order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    ModifiedBeforeCreation,
    RapidEdit,
    MissingSoftwareMetadata,
    UnknownProducer,
}

impl AnomalyKind {
    pub fn points(&self) -> u32 {
        match self {
            Self::ModifiedBeforeCreation => 3,
            Self::RapidEdit | Self::MissingSoftwareMetadata | Self::UnknownProducer => 2,
        }
    }
}

/// One fired metadata anomaly
#[derive(Debug, Clone, Serialize)]
pub struct MetadataAnomaly {
    pub kind: AnomalyKind,
    pub points: u32,
    pub detail: String,
}

static PRODUCER_RE: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"/Producer\s*\(([^)]*)\)").unwrap());
static CREATOR_RE: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"/Creator\s*\(([^)]*)\)").unwrap());
static CREATION_DATE_RE: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"/CreationDate\s*\(([^)]*)\)").unwrap());
static MOD_DATE_RE: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"/ModDate\s*\(([^)]*)\)").unwrap());

/// PDF date string: `D:YYYYMMDDHHmmSS` with optional offset suffix
static PDF_DATE_RE: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(
        r"^(?:D:)?(\d{4})(\d{2})?(\d{2})?(\d{2})?(\d{2})?(\d{2})?(Z|[+\-]\d{2}'?(?:\d{2})?'?)?",
    )
    .unwrap()
});

// ─── Analyzer ──────────────────────────────────────────────────────

/// Document structural/security analyzer
pub struct DocumentAnalyzer {
    config: DocumentConfig,
}

impl DocumentAnalyzer {
    pub fn new(config: DocumentConfig) -> Self {
        Self { config }
    }

    /// Produce the structural signal for one document
    pub fn analyze(&self, content: &[u8]) -> PramanaResult<Signal> {
        // Construct scan, degrading to metadata-only when absent
        let (findings, scan_available) = if !self.config.enable_construct_scan {
            tracing::warn!("construct scan disabled by config — metadata-only analysis");
            (Vec::new(), false)
        } else {
            match scan_constructs(content) {
                Ok(findings) => (findings, true),
                Err(e) => {
                    tracing::warn!("construct scan unavailable ({}) — metadata-only analysis", e);
                    (Vec::new(), false)
                }
            }
        };

        let metadata = parse_metadata(content);
        let anomalies = detect_anomalies(&metadata, &self.config);

        let construct_points: u32 = findings.iter().map(|f| f.risk_tier.weight()).sum();
        let anomaly_points: u32 = anomalies.iter().map(|a| a.points).sum();
        let risk_score = construct_points + anomaly_points;
        let indicator_count = findings.len() + anomalies.len();

        let (category, confidence) = map_verdict(risk_score, indicator_count);

        tracing::debug!(
            "document analysis: risk_score={} indicators={} -> {} ({:.2})",
            risk_score,
            indicator_count,
            category,
            confidence
        );

        let structure = observe_structure(content, scan_available);
        let evidence = serde_json::json!({
            "risk_score": risk_score,
            "indicator_count": indicator_count,
            "security_scan_available": scan_available,
            "suspicious_constructs": findings,
            "metadata_anomalies": anomalies,
            "metadata": metadata,
            "structure": structure,
        });

        Ok(Signal::new(SignalKind::Structural, category, confidence)
            .with_evidence(evidence)
            .with_model_version(MODEL_VERSION))
    }
}

/// Map risk score + indicator count onto (category, confidence)
fn map_verdict(risk_score: u32, indicator_count: usize) -> (SignalCategory, f64) {
    let rs = risk_score as f64;
    if risk_score >= 8 || indicator_count >= 5 {
        (SignalCategory::Suspicious, (0.70 + rs * 0.03).min(0.95))
    } else if risk_score >= 4 || indicator_count >= 2 {
        (SignalCategory::Suspicious, (0.60 + rs * 0.04).min(0.85))
    } else if risk_score >= 2 {
        (SignalCategory::Suspicious, (0.50 + rs * 0.05).min(0.75))
    } else {
        (SignalCategory::Authentic, (0.90 - rs * 0.10).max(0.70))
    }
}

// ─── Construct Scan ────────────────────────────────────────────────

/// Scan raw bytes for taxonomy constructs. Fails only when the input is not
/// a PDF at all; the caller degrades to metadata-only in that case.
fn scan_constructs(content: &[u8]) -> PramanaResult<Vec<ConstructFinding>> {
    if !content.starts_with(b"%PDF") {
        return Err(PramanaError::Extraction(
            "not a PDF header, construct scan skipped".into(),
        ));
    }

    let names = scan_name_tokens(content);
    let mut findings = Vec::new();
    for kind in ConstructKind::ALL {
        // token() carries the leading slash; scanned names do not
        let bare = &kind.token()[1..];
        if let Some(&occurrences) = names.get(bare) {
            if occurrences > 0 {
                findings.push(ConstructFinding {
                    token: kind.token(),
                    group: kind.group(),
                    risk_tier: kind.risk_tier(),
                    occurrences,
                    explanation: kind.explanation(),
                });
            }
        }
    }
    Ok(findings)
}

/// Extract every PDF name token with its occurrence count, decoding `#xx`
/// hex escapes. A name runs from `/` to the next delimiter or whitespace,
/// so `/JS` never matches inside `/JSX`.
fn scan_name_tokens(content: &[u8]) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut i = 0;
    while i < content.len() {
        if content[i] != b'/' {
            i += 1;
            continue;
        }
        i += 1;
        let mut name = String::new();
        while i < content.len() && is_regular_char(content[i]) {
            if content[i] == b'#' && i + 2 < content.len() {
                if let (Some(hi), Some(lo)) = (hex_digit(content[i + 1]), hex_digit(content[i + 2]))
                {
                    name.push((hi * 16 + lo) as char);
                    i += 3;
                    continue;
                }
            }
            name.push(content[i] as char);
            i += 1;
        }
        if !name.is_empty() {
            *counts.entry(name).or_insert(0) += 1;
        }
    }
    counts
}

/// PDF regular character: anything that is not whitespace or a delimiter
fn is_regular_char(b: u8) -> bool {
    !matches!(
        b,
        0x00 | b'\t' | b'\n' | 0x0C | b'\r' | b' '
            | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

// ─── Metadata Extraction ───────────────────────────────────────────

fn parse_metadata(content: &[u8]) -> DocumentMetadata {
    let grab = |re: &BytesRegex| -> Option<String> {
        re.captures(content)
            .and_then(|c| c.get(1))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).trim().to_string())
            .filter(|s| !s.is_empty())
    };

    DocumentMetadata {
        producer: grab(&PRODUCER_RE),
        creator: grab(&CREATOR_RE),
        creation_date: grab(&CREATION_DATE_RE).and_then(|s| parse_pdf_date(&s)),
        modification_date: grab(&MOD_DATE_RE).and_then(|s| parse_pdf_date(&s)),
    }
}

/// Parse a PDF date string (`D:20240131120000+05'30'`) into UTC
pub fn parse_pdf_date(raw: &str) -> Option<DateTime<Utc>> {
    let caps = PDF_DATE_RE.captures(raw.trim())?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let get = |i: usize, default: u32| -> u32 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(default)
    };
    let date = NaiveDate::from_ymd_opt(year, get(2, 1), get(3, 1))?;
    let time = NaiveTime::from_hms_opt(get(4, 0), get(5, 0), get(6, 0))?;
    let mut naive = NaiveDateTime::new(date, time);

    if let Some(tz) = caps.get(7).map(|m| m.as_str()) {
        if tz != "Z" {
            let digits: String = tz.chars().filter(|c| c.is_ascii_digit()).collect();
            let hours: i64 = digits.get(..2).and_then(|h| h.parse().ok()).unwrap_or(0);
            let minutes: i64 = digits.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
            let mut offset = chrono::Duration::minutes(hours * 60 + minutes);
            if tz.starts_with('-') {
                offset = -offset;
            }
            // Local time minus offset gives UTC
            naive = naive - offset;
        }
    }

    Some(Utc.from_utc_datetime(&naive))
}

// ─── Anomaly Detection ─────────────────────────────────────────────

fn detect_anomalies(metadata: &DocumentMetadata, config: &DocumentConfig) -> Vec<MetadataAnomaly> {
    let mut anomalies = Vec::new();

    if let (Some(created), Some(modified)) = (metadata.creation_date, metadata.modification_date) {
        if modified < created {
            anomalies.push(MetadataAnomaly {
                kind: AnomalyKind::ModifiedBeforeCreation,
                points: AnomalyKind::ModifiedBeforeCreation.points(),
                detail: format!(
                    "modification date {} precedes creation date {}",
                    modified.to_rfc3339(),
                    created.to_rfc3339()
                ),
            });
        } else if (modified - created).num_seconds() < config.rapid_edit_window_secs {
            anomalies.push(MetadataAnomaly {
                kind: AnomalyKind::RapidEdit,
                points: AnomalyKind::RapidEdit.points(),
                detail: format!(
                    "created and modified within {}s",
                    (modified - created).num_seconds()
                ),
            });
        }
    }

    if metadata.producer.is_none() && metadata.creator.is_none() {
        anomalies.push(MetadataAnomaly {
            kind: AnomalyKind::MissingSoftwareMetadata,
            points: AnomalyKind::MissingSoftwareMetadata.points(),
            detail: "both producer and creator metadata are missing".into(),
        });
    }

    if let Some(producer) = &metadata.producer {
        let lower = producer.to_lowercase();
        let known = config
            .producer_allow_list
            .iter()
            .any(|p| lower.contains(p.as_str()));
        if !known {
            anomalies.push(MetadataAnomaly {
                kind: AnomalyKind::UnknownProducer,
                points: AnomalyKind::UnknownProducer.points(),
                detail: format!("producer '{}' does not match known software", producer),
            });
        }
    }

    anomalies
}

// ─── Structure Observations ────────────────────────────────────────

/// Structure-level observations reported as evidence only; these do not
/// contribute to the risk score.
fn observe_structure(content: &[u8], scan_available: bool) -> serde_json::Value {
    if !scan_available {
        return serde_json::json!({ "observed": false });
    }
    let names = scan_name_tokens(content);
    serde_json::json!({
        "observed": true,
        "acroform_present": names.get("AcroForm").copied().unwrap_or(0) > 0,
        "annotation_entries": names.get("Annot").copied().unwrap_or(0)
            + names.get("Annots").copied().unwrap_or(0),
        "javascript_name_entries": names.get("JS").copied().unwrap_or(0)
            + names.get("JavaScript").copied().unwrap_or(0),
    })
}
