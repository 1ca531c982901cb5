//! Verdict aggregation — folding a job's signals into one ruling
//!
//! When signals agree on the category, their confidences blend with the
//! primary signal weighted 0.6 against 0.4. When they disagree, the more
//! confident signal's category rules and its confidence is discounted by
//! 0.9 to reflect the conflict. Signal order matters: the analyzer set
//! emits the primary signal first.

use crate::signal::{Signal, SignalCategory};
use crate::{PramanaError, PramanaResult};
use serde::{Deserialize, Serialize};
use std::fmt;

const PRIMARY_WEIGHT: f64 = 0.6;
const SECONDARY_WEIGHT: f64 = 0.4;
const DISAGREEMENT_DISCOUNT: f64 = 0.9;

/// Final ruling over an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Authentic,
    Suspicious,
    Malicious,
    /// The artifact's modality is outside the analyzable set. Produced at
    /// ingest, never by a completed analysis.
    Unsupported,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Authentic => "authentic",
            Verdict::Suspicious => "suspicious",
            Verdict::Malicious => "malicious",
            Verdict::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

impl From<SignalCategory> for Verdict {
    fn from(category: SignalCategory) -> Self {
        match category {
            SignalCategory::Authentic => Verdict::Authentic,
            SignalCategory::Suspicious => Verdict::Suspicious,
            SignalCategory::Malicious => Verdict::Malicious,
        }
    }
}

/// Fold signals into a verdict and an overall confidence.
///
/// A job that produced no signals has nothing to rule on and is an error,
/// not an authentic-by-default verdict.
pub fn aggregate(signals: &[Signal]) -> PramanaResult<(Verdict, f64)> {
    let first = signals
        .first()
        .ok_or_else(|| PramanaError::Extraction("no signals to aggregate".to_string()))?;

    let mut category = first.category;
    let mut confidence = first.confidence;

    for signal in &signals[1..] {
        if signal.category == category {
            confidence = PRIMARY_WEIGHT * confidence + SECONDARY_WEIGHT * signal.confidence;
        } else if confidence > signal.confidence {
            confidence *= DISAGREEMENT_DISCOUNT;
        } else {
            category = signal.category;
            confidence = signal.confidence * DISAGREEMENT_DISCOUNT;
        }
    }

    Ok((Verdict::from(category), confidence))
}
