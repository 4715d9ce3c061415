//! Pluggable content checks.
//!
//! Every validator in the registry is backed by a [`Check`]: an opaque
//! `run(text, params) -> outcome` capability. The built-in checks in this
//! module are deterministic pattern matchers; hosts can register their own
//! implementations (model-backed classifiers, remote services) through
//! [`crate::registry::ValidatorRegistryBuilder`].
//!
//! A check distinguishes two failure modes:
//! - the text fails the check: `Ok(CheckOutcome { passed: false, .. })`
//! - the check itself could not run: `Err(CheckError)`, surfaced upstream as
//!   [`crate::GuardrailError::CheckUnavailable`] and never treated as a pass.

pub mod content;
pub mod format;
pub mod pii;
pub mod secrets;

use crate::report::ErrorSpan;
use async_trait::async_trait;
use regex::Regex;

pub use content::{DetectJailbreak, RedundantSentences, WebSanitization, WordListCheck};
pub use format::{HasUrl, ValidJson, ValidUrl};
pub use pii::DetectPii;
pub use secrets::SecretsPresent;

/// Check-specific configuration parameters.
pub type CheckParams = serde_json::Map<String, serde_json::Value>;

/// Failure to execute a check.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct CheckError(pub String);

/// Result of running one check against one text.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub reason: Option<String>,
    pub spans: Vec<ErrorSpan>,
    /// Corrected text, applied when the validator's policy is `fix`.
    pub fix_value: Option<String>,
}

impl CheckOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
            spans: Vec::new(),
            fix_value: None,
        }
    }

    pub fn fail(reason: impl Into<String>, spans: Vec<ErrorSpan>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
            spans,
            fix_value: None,
        }
    }

    pub fn with_fix(mut self, fixed: String) -> Self {
        self.fix_value = Some(fixed);
        self
    }
}

/// A named content check.
#[async_trait]
pub trait Check: Send + Sync {
    /// Evaluate `text` using `params` from the validator descriptor.
    async fn run(&self, text: &str, params: &CheckParams) -> Result<CheckOutcome, CheckError>;

    /// Reject `params` this check cannot run with. Called once when
    /// configuration is applied to the registry.
    fn validate_params(&self, _params: &CheckParams) -> Result<(), CheckError> {
        Ok(())
    }
}

/// A located match in byte offsets, before conversion to an [`ErrorSpan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ByteMatch {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// Convert byte offsets to character offsets.
pub(crate) fn error_span(text: &str, m: &ByteMatch, reason: impl Into<String>) -> ErrorSpan {
    let start = text[..m.start].chars().count();
    let len = text[m.start..m.end].chars().count();
    ErrorSpan {
        start,
        end: start + len,
        reason: reason.into(),
    }
}

/// Sort matches by position and drop any that overlap an earlier one.
pub(crate) fn disjoint(mut matches: Vec<ByteMatch>) -> Vec<ByteMatch> {
    matches.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut out: Vec<ByteMatch> = Vec::with_capacity(matches.len());
    for m in matches {
        if out.last().map_or(true, |last| m.start >= last.end) {
            out.push(m);
        }
    }
    out
}

/// Rebuild `text` with each (disjoint, sorted) match replaced by `replace(match)`.
pub(crate) fn rewrite<F>(text: &str, matches: &[ByteMatch], replace: F) -> String
where
    F: Fn(&ByteMatch, &str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for m in matches {
        out.push_str(&text[cursor..m.start]);
        out.push_str(&replace(m, &text[m.start..m.end]));
        cursor = m.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Read a list of strings from `params[key]`, ignoring non-string entries.
pub(crate) fn string_list(params: &CheckParams, key: &str) -> Option<Vec<String>> {
    params.get(key).and_then(|v| v.as_array()).map(|items| {
        items
            .iter()
            .filter_map(|i| i.as_str().map(str::to_string))
            .collect()
    })
}

/// Case-insensitive whole-word alternation over `words`.
pub(crate) fn word_regex(words: &[String]) -> Result<Regex, CheckError> {
    let alternation = words
        .iter()
        .filter(|w| !w.trim().is_empty())
        .map(|w| regex::escape(w.trim()))
        .collect::<Vec<_>>()
        .join("|");
    if alternation.is_empty() {
        // never matches
        return Regex::new(r"[^\s\S]").map_err(|e| CheckError(e.to_string()));
    }
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
        .map_err(|e| CheckError(format!("invalid word list: {}", e)))
}
