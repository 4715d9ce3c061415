//! Credential and secret leakage detection.

use super::{disjoint, error_span, rewrite, ByteMatch, Check, CheckError, CheckOutcome, CheckParams};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

const MASK: &str = "********";

static PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("AWS access key", r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b"),
        ("GitHub token", r"\bgh[pousr]_[A-Za-z0-9]{36,}\b"),
        ("Slack token", r"\bxox[abprs]-[A-Za-z0-9-]{10,}\b"),
        (
            "private key",
            r"-----BEGIN (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----",
        ),
        (
            "credential assignment",
            r#"(?i)\b(?:api[_-]?key|secret|password|passwd|access[_-]?token)\s*[:=]\s*["']?[A-Za-z0-9_\-./+]{8,}["']?"#,
        ),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).unwrap()))
    .collect()
});

/// Flags API keys, tokens and private key material.
///
/// The fix value masks every finding.
#[derive(Debug, Default)]
pub struct SecretsPresent;

#[async_trait]
impl Check for SecretsPresent {
    async fn run(&self, text: &str, _params: &CheckParams) -> Result<CheckOutcome, CheckError> {
        let found: Vec<ByteMatch> = PATTERNS
            .iter()
            .flat_map(|(label, re)| {
                re.find_iter(text).map(move |m| ByteMatch {
                    start: m.start(),
                    end: m.end(),
                    label: label.to_string(),
                })
            })
            .collect();

        let found = disjoint(found);
        if found.is_empty() {
            return Ok(CheckOutcome::pass());
        }

        let spans = found
            .iter()
            .map(|m| error_span(text, m, format!("Possible {}", m.label)))
            .collect();
        let fixed = rewrite(text, &found, |_, _| MASK.to_string());

        Ok(CheckOutcome::fail(
            format!("The text contains {} secret(s)", found.len()),
            spans,
        )
        .with_fix(fixed))
    }
}
