//! JSON report renderer

use super::Report;
use crate::PramanaResult;

/// Render a report as pretty-printed JSON
pub fn render(report: &Report) -> PramanaResult<String> {
    serde_json::to_string_pretty(report).map_err(crate::PramanaError::Serde)
}

/// Render a report as compact single-line JSON
pub fn render_compact(report: &Report) -> PramanaResult<String> {
    serde_json::to_string(report).map_err(crate::PramanaError::Serde)
}
