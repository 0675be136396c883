//! The trust boundary between model output and the rest of the system.
//!
//! The model service is asked to honor an output schema, but adherence by a
//! generative service is probabilistic, so everything arriving here is
//! treated as untrusted. Each field is narrowed explicitly, the first
//! mismatch is terminal, and nothing is coerced or defaulted.

use serde_json::Value;

use crate::error::{AnalysisError, Result};
use crate::models::{AnalysisResult, SectionSummary};

/// Parse a raw model reply and validate it into an [`AnalysisResult`].
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult> {
    let cleaned = strip_code_fences(raw);
    let payload: Value = serde_json::from_str(cleaned)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
    validate_analysis(&payload)
}

/// Validate an already-parsed payload field by field, failing closed.
///
/// Checks run in declaration order and stop at the first offending field,
/// which is named in the resulting [`AnalysisError::Schema`]. Unknown extra
/// keys are ignored.
pub fn validate_analysis(payload: &Value) -> Result<AnalysisResult> {
    let summary = payload
        .get("summary")
        .and_then(Value::as_str)
        .ok_or(AnalysisError::Schema("summary"))?
        .to_string();

    let risks = string_array(payload.get("risks"), "risks")?;
    let obligations = string_array(payload.get("obligations"), "obligations")?;
    let red_flags = string_array(payload.get("red_flags"), "red_flags")?;
    let section_summaries = section_summaries(payload.get("section_summaries"))?;

    Ok(AnalysisResult {
        summary,
        risks,
        obligations,
        red_flags,
        section_summaries,
    })
}

/// Every element must already be a string; element order is preserved.
fn string_array(value: Option<&Value>, field: &'static str) -> Result<Vec<String>> {
    let items = value
        .and_then(Value::as_array)
        .ok_or(AnalysisError::Schema(field))?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or(AnalysisError::Schema(field))
        })
        .collect()
}

fn section_summaries(value: Option<&Value>) -> Result<Vec<SectionSummary>> {
    const FIELD: &str = "section_summaries";

    let items = value
        .and_then(Value::as_array)
        .ok_or(AnalysisError::Schema(FIELD))?;

    items
        .iter()
        .map(|item| {
            let entry = item.as_object().ok_or(AnalysisError::Schema(FIELD))?;
            let section = entry
                .get("section")
                .and_then(Value::as_str)
                .ok_or(AnalysisError::Schema(FIELD))?;
            let summary = entry
                .get("summary")
                .and_then(Value::as_str)
                .ok_or(AnalysisError::Schema(FIELD))?;

            Ok(SectionSummary {
                section: section.to_string(),
                summary: summary.to_string(),
            })
        })
        .collect()
}

/// Models occasionally wrap their JSON in a Markdown code fence even when
/// told not to; strip one if present. This cleans up transport framing only,
/// the payload itself is never rewritten.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
