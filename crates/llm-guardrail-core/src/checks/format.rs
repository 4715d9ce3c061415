//! Format validity checks.

use super::{error_span, ByteMatch, Check, CheckError, CheckOutcome, CheckParams};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bhttps?://[^\s<>"']+"#).unwrap());
static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").unwrap());
static ABSOLUTE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*(?::\d{1,5})?(?:[/?#]\S*)?$").unwrap()
});

fn whole_text(text: &str) -> ByteMatch {
    ByteMatch {
        start: 0,
        end: text.len(),
        label: String::new(),
    }
}

/// Requires the text to parse as JSON.
#[derive(Debug, Default)]
pub struct ValidJson;

#[async_trait]
impl Check for ValidJson {
    async fn run(&self, text: &str, _params: &CheckParams) -> Result<CheckOutcome, CheckError> {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(_) => Ok(CheckOutcome::pass()),
            Err(e) => {
                let reason = format!("Invalid JSON: {}", e);
                let span = error_span(text, &whole_text(text), reason.clone());
                Ok(CheckOutcome::fail(reason, vec![span]))
            }
        }
    }
}

/// Requires every whitespace-separated token to be an absolute http(s) URL.
#[derive(Debug, Default)]
pub struct ValidUrl;

#[async_trait]
impl Check for ValidUrl {
    async fn run(&self, text: &str, _params: &CheckParams) -> Result<CheckOutcome, CheckError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(CheckOutcome::fail("Empty text is not a URL", Vec::new()));
        }

        let spans: Vec<_> = TOKEN
            .find_iter(text)
            .filter(|token| !ABSOLUTE_URL.is_match(token.as_str()))
            .map(|token| {
                let m = ByteMatch {
                    start: token.start(),
                    end: token.end(),
                    label: String::new(),
                };
                error_span(text, &m, format!("Not a valid URL: {}", token.as_str()))
            })
            .collect();

        if spans.is_empty() {
            Ok(CheckOutcome::pass())
        } else {
            Ok(CheckOutcome::fail("The text contains invalid URLs", spans))
        }
    }
}

/// Requires the text to contain at least one http(s) URL.
#[derive(Debug, Default)]
pub struct HasUrl;

#[async_trait]
impl Check for HasUrl {
    async fn run(&self, text: &str, _params: &CheckParams) -> Result<CheckOutcome, CheckError> {
        if URL.is_match(text) {
            Ok(CheckOutcome::pass())
        } else {
            Ok(CheckOutcome::fail("The text does not contain a URL", Vec::new()))
        }
    }
}
