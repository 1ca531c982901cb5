//! Text credibility analyzer — red flags, sentiment, and claim verification
//!
//! Scores disclosure-style text on a 0..10 credibility scale. The score
//! starts at 10 and takes penalties from three directions:
//!
//! - red-flag language (promotional hype, vague wording, pressure tactics),
//!   detected by an optional zero-shot classifier endpoint with a
//!   rule-based regex fallback
//! - sentiment skew: negative tone, or positive tone strong enough to
//!   read as promotion rather than reporting
//! - numerical claims (revenue/profit in ₹ crore) that deviate more than
//!   half from the submitted historical baseline
//!
//! The final score maps onto the signal scale: below 5.0 is suspicious.

use crate::config::TextConfig;
use crate::signal::{Signal, SignalCategory, SignalKind};
use crate::PramanaResult;
use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MODEL_VERSION: &str = "credibility-1.1";

/// Sentiment only reads the opening of the text
const SENTIMENT_SAMPLE_BYTES: usize = 512;

/// Perfect credibility, before penalties
const CREDIBILITY_CEILING: f64 = 10.0;

// ─── Red flags ─────────────────────────────────────────────────────────

/// Categories submitted to the zero-shot classifier endpoint
const CLASSIFIER_CATEGORIES: &[&str] = &[
    "promotional hype",
    "unrealistic projections",
    "vague language",
    "conflicting information",
    "suspicious timing",
    "lack of details",
    "overly optimistic claims",
];

/// Rule-based fallback taxonomy. A category fires at most once no matter
/// how many of its patterns match.
const RULE_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "promotional_hype",
        &[
            r"\b(guaranteed|guarantee|promise|assure|certain|definite)\b",
            r"\b(revolutionary|breakthrough|game-changing|unprecedented)\b",
        ],
    ),
    (
        "vague_language",
        &[
            r"\b(significant|substantial|considerable|major)\s+(increase|growth|improvement)\b",
            r"\b(we expect|anticipated|projected|forecasted)\b",
            r"\b(approximately|around|about|roughly)\b",
        ],
    ),
    (
        "unrealistic_projection",
        &[
            r"\b(double|triple|tenfold)\s+(?:our|the)?\s*(revenue|profit|earnings)\b",
            r"\b\d{3,}\s*%\s*(growth|increase|returns?)\b",
            r"\b(highest|best)[- ]ever\b",
        ],
    ),
    (
        "pressure_tactics",
        &[
            r"\b(limited time|act now|don'?t miss|last chance)\b",
            r"\bexclusive (opportunity|offer)\b",
        ],
    ),
];

static RULE_SET: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    RULE_CATEGORIES
        .iter()
        .map(|(name, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){}", p)).expect("invalid red-flag pattern"))
                .collect();
            (*name, compiled)
        })
        .collect()
});

// ─── Numerical claims ──────────────────────────────────────────────────

/// What a numerical claim asserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimKind {
    Revenue,
    Profit,
}

/// One extracted financial claim with its surrounding phrase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericalClaim {
    pub kind: ClaimKind,
    /// Claimed amount in ₹ crore
    pub value: f64,
    pub context: String,
}

/// Prior-quarter figures to verify claims against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalBaseline {
    /// Company symbol or name the baseline belongs to
    pub entity: String,
    pub last_quarter_revenue_cr: Option<f64>,
    pub last_quarter_profit_cr: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
struct ClaimAnomaly {
    kind: ClaimKind,
    claimed: f64,
    baseline: f64,
    deviation_pct: f64,
}

static REVENUE_CLAIM_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"revenue\s+of\s+₹?\s*(\d+(?:\.\d+)?)\s*crore",
        r"₹?\s*(\d+(?:\.\d+)?)\s*crore\s+revenue",
        r"quarterly\s+revenue\s+₹?\s*(\d+(?:\.\d+)?)\s*crore",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).expect("invalid revenue pattern"))
    .collect()
});

static PROFIT_CLAIM_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"profit\s+of\s+₹?\s*(\d+(?:\.\d+)?)\s*crore",
        r"₹?\s*(\d+(?:\.\d+)?)\s*crore\s+profit",
        r"net\s+profit\s+₹?\s*(\d+(?:\.\d+)?)\s*crore",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).expect("invalid profit pattern"))
    .collect()
});

// ─── Sentiment ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentReading {
    pub label: SentimentLabel,
    /// Dominance of the winning side among matched terms, in [0.5, 1]
    pub score: f64,
}

const POSITIVE_TERMS: &[&str] = &[
    "growth",
    "profit",
    "record",
    "strong",
    "robust",
    "outstanding",
    "exceptional",
    "surge",
    "breakthrough",
    "milestone",
    "momentum",
    "expansion",
    "gain",
    "improved",
    "upbeat",
];

const NEGATIVE_TERMS: &[&str] = &[
    "loss",
    "decline",
    "fraud",
    "investigation",
    "penalty",
    "default",
    "downgrade",
    "weak",
    "lawsuit",
    "scandal",
    "shortfall",
    "erosion",
    "impairment",
    "resigned",
    "delisted",
];

/// Term-counting sentiment over fixed finance lexicons
struct SentimentLexicon {
    automaton: AhoCorasick,
    positive_len: usize,
}

static LEXICON: Lazy<SentimentLexicon> = Lazy::new(|| {
    let automaton = AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(POSITIVE_TERMS.iter().chain(NEGATIVE_TERMS.iter()))
        .expect("Failed to build sentiment lexicon");
    SentimentLexicon {
        automaton,
        positive_len: POSITIVE_TERMS.len(),
    }
});

impl SentimentLexicon {
    /// Count boundary-checked lexicon hits and let the dominant side label
    /// the text. A tie, or no hits at all, reads as neutral.
    fn read(&self, text: &str) -> SentimentReading {
        let bytes = text.as_bytes();
        let mut positive = 0usize;
        let mut negative = 0usize;

        for m in self.automaton.find_iter(text) {
            let starts_clean = m.start() == 0 || !bytes[m.start() - 1].is_ascii_alphanumeric();
            let ends_clean = m.end() == bytes.len() || !bytes[m.end()].is_ascii_alphanumeric();
            if !starts_clean || !ends_clean {
                continue;
            }
            if m.pattern().as_usize() < self.positive_len {
                positive += 1;
            } else {
                negative += 1;
            }
        }

        let total = positive + negative;
        if total == 0 || positive == negative {
            return SentimentReading {
                label: SentimentLabel::Neutral,
                score: 0.5,
            };
        }
        if positive > negative {
            SentimentReading {
                label: SentimentLabel::Positive,
                score: positive as f64 / total as f64,
            }
        } else {
            SentimentReading {
                label: SentimentLabel::Negative,
                score: negative as f64 / total as f64,
            }
        }
    }
}

// ─── Analyzer ──────────────────────────────────────────────────────────

/// Response shape from the zero-shot classifier endpoint
#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    labels: Vec<String>,
    scores: Vec<f64>,
}

/// Credibility scoring over announcement-style text
pub struct TextAnalyzer {
    config: TextConfig,
    client: reqwest::Client,
}

impl TextAnalyzer {
    pub fn new(config: TextConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Produce the textual signal, verifying claims against `baseline`
    /// when one was submitted with the job.
    pub async fn analyze(
        &self,
        content: &[u8],
        baseline: Option<&HistoricalBaseline>,
    ) -> PramanaResult<Signal> {
        let text = String::from_utf8_lossy(content);

        let (red_flags, classifier_used) = self.detect_red_flags(&text).await;
        let sentiment = LEXICON.read(sentiment_sample(&text));
        let claims = extract_claims(&text);
        let anomalies = detect_anomalies(&claims, baseline, self.config.claim_deviation_pct);

        let score = credibility_score(
            &red_flags,
            &sentiment,
            !anomalies.is_empty(),
            self.config.sentiment_high_confidence,
        );
        let (category, confidence) = map_score(score);

        tracing::debug!(
            "credibility {:.1}/10 ({} red flags, sentiment {:?}, {} claim anomalies) -> {} ({:.2})",
            score,
            red_flags.len(),
            sentiment.label,
            anomalies.len(),
            category,
            confidence
        );

        let evidence = serde_json::json!({
            "credibility_score": score,
            "red_flags": red_flags,
            "classifier_used": classifier_used,
            "sentiment": sentiment,
            "claims": claims,
            "claim_anomalies": anomalies,
            "baseline_entity": baseline.map(|b| b.entity.clone()),
        });

        Ok(Signal::new(SignalKind::Textual, category, confidence)
            .with_evidence(evidence)
            .with_model_version(MODEL_VERSION))
    }

    /// Red flags via the remote classifier when configured, with the rule
    /// taxonomy as the fallback path. Returns the flags and whether the
    /// classifier produced them.
    async fn detect_red_flags(&self, text: &str) -> (Vec<String>, bool) {
        let endpoint = match &self.config.classifier_endpoint {
            Some(url) if !text.is_empty() => url,
            _ => return (rule_based_red_flags(text), false),
        };

        match self.call_classifier(endpoint, text).await {
            Ok(flags) => (flags, true),
            Err(e) => {
                tracing::warn!("zero-shot classifier failed, using rule taxonomy: {}", e);
                (rule_based_red_flags(text), false)
            }
        }
    }

    async fn call_classifier(&self, endpoint: &str, text: &str) -> Result<Vec<String>, String> {
        let body = serde_json::json!({
            "text": text,
            "categories": CLASSIFIER_CATEGORIES,
        });

        let response = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("endpoint returned {}", status));
        }

        let parsed: ZeroShotResponse = response
            .json()
            .await
            .map_err(|e| format!("unparseable response: {}", e))?;

        Ok(parsed
            .labels
            .into_iter()
            .zip(parsed.scores)
            .filter(|(_, score)| *score > self.config.category_threshold)
            .map(|(label, _)| label)
            .collect())
    }
}

/// First category pattern that matches flags the category
fn rule_based_red_flags(text: &str) -> Vec<String> {
    let mut flags = Vec::new();
    for (category, patterns) in RULE_SET.iter() {
        if patterns.iter().any(|p| p.is_match(text)) {
            flags.push((*category).to_string());
        }
    }
    flags
}

/// Pull ₹-crore revenue and profit figures out of the text
pub(crate) fn extract_claims(text: &str) -> Vec<NumericalClaim> {
    let mut claims = Vec::new();

    for (kind, patterns) in [
        (ClaimKind::Revenue, &*REVENUE_CLAIM_RES),
        (ClaimKind::Profit, &*PROFIT_CLAIM_RES),
    ] {
        for pattern in patterns {
            for caps in pattern.captures_iter(text) {
                if let Some(value) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
                    claims.push(NumericalClaim {
                        kind,
                        value,
                        context: caps[0].to_string(),
                    });
                }
            }
        }
    }

    claims
}

/// Flag claims that stray more than `max_deviation_pct` from the matching
/// baseline figure
fn detect_anomalies(
    claims: &[NumericalClaim],
    baseline: Option<&HistoricalBaseline>,
    max_deviation_pct: f64,
) -> Vec<ClaimAnomaly> {
    let baseline = match baseline {
        Some(b) => b,
        None => return Vec::new(),
    };

    let mut anomalies = Vec::new();
    for claim in claims {
        let reference = match claim.kind {
            ClaimKind::Revenue => baseline.last_quarter_revenue_cr,
            ClaimKind::Profit => baseline.last_quarter_profit_cr,
        };
        let reference = match reference {
            Some(v) if v > 0.0 => v,
            _ => continue,
        };

        let deviation_pct = (claim.value - reference).abs() / reference * 100.0;
        if deviation_pct > max_deviation_pct {
            anomalies.push(ClaimAnomaly {
                kind: claim.kind,
                claimed: claim.value,
                baseline: reference,
                deviation_pct,
            });
        }
    }
    anomalies
}

/// Start from a perfect 10 and subtract: 1.5 per red-flag category, 2.0
/// for negative tone, 1.0 for positive tone above `strong_positive`, 3.0
/// once if any claim is anomalous. Clamped to [0, 10].
fn credibility_score(
    red_flags: &[String],
    sentiment: &SentimentReading,
    anomaly_detected: bool,
    strong_positive: f64,
) -> f64 {
    let mut score = CREDIBILITY_CEILING;

    score -= red_flags.len() as f64 * 1.5;

    match sentiment.label {
        SentimentLabel::Negative => score -= 2.0,
        SentimentLabel::Positive if sentiment.score > strong_positive => score -= 1.0,
        _ => {}
    }

    if anomaly_detected {
        score -= 3.0;
    }

    score.clamp(0.0, CREDIBILITY_CEILING)
}

/// Credibility below the midpoint flips the signal to suspicious
fn map_score(score: f64) -> (SignalCategory, f64) {
    if score < 5.0 {
        (
            SignalCategory::Suspicious,
            (1.0 - score / CREDIBILITY_CEILING).min(0.95),
        )
    } else {
        (
            SignalCategory::Authentic,
            (score / CREDIBILITY_CEILING).min(0.95),
        )
    }
}

/// Truncate to the sentiment window without splitting a UTF-8 sequence
fn sentiment_sample(text: &str) -> &str {
    let mut end = text.len().min(SENTIMENT_SAMPLE_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
