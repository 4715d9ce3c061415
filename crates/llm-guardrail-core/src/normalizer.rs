//! Outcome normalizer.
//!
//! Maps whatever a check pipeline returned (complete, partial, absent or
//! arriving as untyped JSON) onto the stable [`ValidationReport`] shape.
//! Nothing in here fails: malformed input yields an empty, failed report.

use crate::report::{CheckStatus, CheckSummary, ErrorSpan, ValidationReport};
use serde::{Deserialize, Serialize};

const UNKNOWN: &str = "Unknown";
const NO_REASON: &str = "No reason provided";

/// Raw pipeline result. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOutcome {
    pub validation_passed: Option<bool>,
    pub error: Option<String>,
    pub validated_output: Option<String>,
    pub reask: Option<bool>,
    pub validation_summaries: Option<Vec<RawSummary>>,
}

/// Raw per-check result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSummary {
    pub validator_name: Option<String>,
    pub validator_status: Option<String>,
    pub failure_reason: Option<String>,
    pub error_spans: Option<Vec<RawSpan>>,
}

/// Raw span, either `{start, end, reason}` or a `[start, end, reason]` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSpan {
    Fields {
        #[serde(default)]
        start: Option<usize>,
        #[serde(default)]
        end: Option<usize>,
        #[serde(default)]
        reason: Option<String>,
    },
    Triple(Option<usize>, Option<usize>, Option<String>),
}

impl RawSpan {
    fn into_span(self) -> ErrorSpan {
        let (start, end, reason) = match self {
            Self::Fields { start, end, reason } => (start, end, reason),
            Self::Triple(start, end, reason) => (start, end, reason),
        };
        ErrorSpan {
            start: start.unwrap_or(0),
            end: end.unwrap_or(0),
            reason: reason.unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

/// Parse a status string; anything unrecognised counts as an unfixed failure.
pub fn parse_status(status: Option<&str>) -> CheckStatus {
    match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("pass") | Some("passed") => CheckStatus::Pass,
        Some("fail-fixed") | Some("fixed") => CheckStatus::FailFixed,
        Some("fail-reasked") | Some("reask") | Some("reasked") => CheckStatus::FailReasked,
        Some("fail-exception") | Some("exception") => CheckStatus::FailException,
        _ => CheckStatus::FailNoop,
    }
}

fn normalize_summary(raw: RawSummary) -> CheckSummary {
    CheckSummary {
        validator_name: raw.validator_name.unwrap_or_else(|| UNKNOWN.to_string()),
        validator_status: parse_status(raw.validator_status.as_deref()),
        failure_reason: raw.failure_reason.unwrap_or_else(|| NO_REASON.to_string()),
        error_spans: raw
            .error_spans
            .unwrap_or_default()
            .into_iter()
            .map(RawSpan::into_span)
            .collect(),
    }
}

/// Normalize a raw pipeline result.
///
/// The report passes only if the raw result claims a pass, carries no error,
/// did not request a reask, and every summary counts as a pass once fixes
/// are applied.
pub fn normalize(raw: Option<&RawOutcome>) -> ValidationReport {
    let Some(raw) = raw else {
        return ValidationReport::empty_failed(None);
    };
    let raw = raw.clone();

    let summaries: Vec<CheckSummary> = raw
        .validation_summaries
        .unwrap_or_default()
        .into_iter()
        .map(normalize_summary)
        .collect();

    let reask = raw.reask.unwrap_or(false)
        || summaries
            .iter()
            .any(|s| s.validator_status == CheckStatus::FailReasked);

    let validation_passed = raw.validation_passed.unwrap_or(false)
        && raw.error.is_none()
        && !reask
        && summaries.iter().all(|s| s.validator_status.counts_as_pass());

    ValidationReport {
        validation_passed,
        error: raw.error,
        validation_summaries: summaries,
        validated_output: raw.validated_output,
        reask,
    }
}

/// Normalize a result that arrived as JSON from an external pipeline.
pub fn normalize_value(value: &serde_json::Value) -> ValidationReport {
    if value.is_null() {
        return normalize(None);
    }
    match serde_json::from_value::<RawOutcome>(value.clone()) {
        Ok(raw) => normalize(Some(&raw)),
        Err(e) => {
            tracing::debug!(error = %e, "discarding malformed pipeline result");
            ValidationReport::empty_failed(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_result() {
        let report = normalize(None);
        assert!(!report.validation_passed);
        assert!(report.validation_summaries.is_empty());
    }

    #[test]
    fn test_empty_raw_result_fails() {
        let report = normalize(Some(&RawOutcome::default()));
        assert!(!report.validation_passed);
        assert!(report.validation_summaries.is_empty());
    }

    #[test]
    fn test_malformed_json() {
        for value in [
            json!(null),
            json!("not an object"),
            json!(42),
            json!({"validation_summaries": "oops"}),
        ] {
            let report = normalize_value(&value);
            assert!(!report.validation_passed, "{value}");
            assert!(report.validation_summaries.is_empty(), "{value}");
        }
    }

    #[test]
    fn test_partial_summary_defaults() {
        let report = normalize_value(&json!({
            "validation_passed": false,
            "validation_summaries": [{}]
        }));
        let summary = &report.validation_summaries[0];
        assert_eq!(summary.validator_name, "Unknown");
        assert_eq!(summary.validator_status, CheckStatus::FailNoop);
        assert_eq!(summary.failure_reason, "No reason provided");
        assert!(summary.error_spans.is_empty());
    }

    #[test]
    fn test_span_triples_and_objects() {
        let report = normalize_value(&json!({
            "validation_passed": false,
            "validation_summaries": [{
                "validator_name": "detect_pii",
                "validator_status": "fail",
                "error_spans": [[10, 21, "SSN"], {"start": 1}]
            }]
        }));
        let spans = &report.validation_summaries[0].error_spans;
        assert_eq!(spans[0], ErrorSpan { start: 10, end: 21, reason: "SSN".into() });
        assert_eq!(spans[1], ErrorSpan { start: 1, end: 0, reason: "Unknown".into() });
    }

    #[test]
    fn test_inconsistent_pass_claim_is_corrected() {
        let raw = RawOutcome {
            validation_passed: Some(true),
            validation_summaries: Some(vec![RawSummary {
                validator_name: Some("profanity_free".into()),
                validator_status: Some("fail-noop".into()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        assert!(!normalize(Some(&raw)).validation_passed);
    }

    #[test]
    fn test_fixed_checks_pass() {
        let raw = RawOutcome {
            validation_passed: Some(true),
            validated_output: Some("My SSN is <SSN>".into()),
            validation_summaries: Some(vec![RawSummary {
                validator_name: Some("detect_pii".into()),
                validator_status: Some("fail-fixed".into()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let report = normalize(Some(&raw));
        assert!(report.validation_passed);
        assert_eq!(report.validated_output.as_deref(), Some("My SSN is <SSN>"));
    }

    #[test]
    fn test_reask_summary_forces_failure() {
        let raw = RawOutcome {
            validation_passed: Some(true),
            validation_summaries: Some(vec![RawSummary {
                validator_status: Some("reask".into()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let report = normalize(Some(&raw));
        assert!(report.reask);
        assert!(!report.validation_passed);
    }
}
