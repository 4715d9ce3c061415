//! Uniform validation report shapes.

use serde::{Deserialize, Serialize};

/// A located substring flagged by a validator.
///
/// Offsets are character offsets into the text the validator saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSpan {
    pub start: usize,
    pub end: usize,
    pub reason: String,
}

/// Per-check status after applying the validator's failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckStatus {
    Pass,
    FailNoop,
    FailFixed,
    FailReasked,
    FailException,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::FailNoop => "fail-noop",
            Self::FailFixed => "fail-fixed",
            Self::FailReasked => "fail-reasked",
            Self::FailException => "fail-exception",
        }
    }

    /// Whether the check counts as passing once fixes are applied.
    pub fn counts_as_pass(&self) -> bool {
        matches!(self, Self::Pass | Self::FailFixed)
    }
}

/// Outcome of one validator within a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub validator_name: String,
    pub validator_status: CheckStatus,
    pub failure_reason: String,
    #[serde(default)]
    pub error_spans: Vec<ErrorSpan>,
}

/// Normalized result of running a pipeline once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub validation_passed: bool,
    pub error: Option<String>,
    pub validation_summaries: Vec<CheckSummary>,
    /// Text after any `fix` rewrites, when it differs from the input.
    pub validated_output: Option<String>,
    /// Set when a `reask` validator failed; regeneration is the caller's job.
    #[serde(default)]
    pub reask: bool,
}

impl ValidationReport {
    /// A failed report with no check summaries.
    pub fn empty_failed(error: Option<String>) -> Self {
        Self {
            validation_passed: false,
            error,
            validation_summaries: Vec::new(),
            validated_output: None,
            reask: false,
        }
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckSummary> {
        self.validation_summaries
            .iter()
            .filter(|s| s.validator_status != CheckStatus::Pass)
    }
}
