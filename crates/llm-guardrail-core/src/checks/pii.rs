//! Personally identifiable information detection.

use super::{disjoint, error_span, rewrite, string_list, ByteMatch, Check, CheckError, CheckOutcome, CheckParams};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static SSN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?(?:\(\d{3}\)|\b\d{3})[-.\s]\d{3}[-.\s]\d{4}\b").unwrap()
});
static CREDIT_CARD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\d[ -]?){12,18}\d\b").unwrap());

/// Entity kinds recognised by [`DetectPii`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiEntity {
    Ssn,
    Email,
    Phone,
    CreditCard,
}

impl PiiEntity {
    const ALL: [PiiEntity; 4] = [Self::Ssn, Self::Email, Self::Phone, Self::CreditCard];

    fn from_param(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ssn" | "us_ssn" => Some(Self::Ssn),
            "email" | "email_address" => Some(Self::Email),
            "phone" | "phone_number" => Some(Self::Phone),
            "credit_card" => Some(Self::CreditCard),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Ssn => "SSN",
            Self::Email => "EMAIL_ADDRESS",
            Self::Phone => "PHONE_NUMBER",
            Self::CreditCard => "CREDIT_CARD",
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            Self::Ssn => &SSN,
            Self::Email => &EMAIL,
            Self::Phone => &PHONE,
            Self::CreditCard => &CREDIT_CARD,
        }
    }
}

/// Flags SSNs, e-mail addresses, phone numbers and card numbers.
///
/// Params: `entities` (list of `ssn`, `email`, `phone`, `credit_card`).
/// The fix value replaces each finding with `<LABEL>`.
#[derive(Debug, Default)]
pub struct DetectPii;

impl DetectPii {
    fn entities(params: &CheckParams) -> Result<Vec<PiiEntity>, CheckError> {
        match string_list(params, "entities") {
            None => Ok(PiiEntity::ALL.to_vec()),
            Some(names) => names
                .iter()
                .map(|n| {
                    PiiEntity::from_param(n)
                        .ok_or_else(|| CheckError(format!("unsupported PII entity: {}", n)))
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Check for DetectPii {
    fn validate_params(&self, params: &CheckParams) -> Result<(), CheckError> {
        Self::entities(params).map(|_| ())
    }

    async fn run(&self, text: &str, params: &CheckParams) -> Result<CheckOutcome, CheckError> {
        let mut found = Vec::new();
        for entity in Self::entities(params)? {
            for m in entity.regex().find_iter(text) {
                if entity == PiiEntity::CreditCard && !luhn_valid(m.as_str()) {
                    continue;
                }
                found.push(ByteMatch {
                    start: m.start(),
                    end: m.end(),
                    label: entity.label().to_string(),
                });
            }
        }

        let found = disjoint(found);
        if found.is_empty() {
            return Ok(CheckOutcome::pass());
        }

        let mut labels: Vec<&str> = Vec::new();
        for m in &found {
            if !labels.contains(&m.label.as_str()) {
                labels.push(&m.label);
            }
        }
        let spans = found
            .iter()
            .map(|m| error_span(text, m, format!("PII detected: {}", m.label)))
            .collect();
        let fixed = rewrite(text, &found, |m, _| format!("<{}>", m.label));

        Ok(CheckOutcome::fail(
            format!("The text contains PII: {}", labels.join(", ")),
            spans,
        )
        .with_fix(fixed))
    }
}

fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> CheckParams {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_detects_ssn_span() {
        let text = "My SSN is 123-45-6789";
        let outcome = DetectPii.run(text, &CheckParams::new()).await.unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.spans.len(), 1);
        assert_eq!(outcome.spans[0].start, 10);
        assert_eq!(outcome.spans[0].end, 21);
        assert_eq!(outcome.fix_value.as_deref(), Some("My SSN is <SSN>"));
    }

    #[tokio::test]
    async fn test_clean_text_passes() {
        let outcome = DetectPii
            .run("The weather is nice today.", &CheckParams::new())
            .await
            .unwrap();
        assert!(outcome.passed);
        assert!(outcome.spans.is_empty());
    }

    #[tokio::test]
    async fn test_entity_filter() {
        let text = "Mail me at jane@example.com, SSN 123-45-6789";
        let outcome = DetectPii
            .run(text, &params(json!({"entities": ["email"]})))
            .await
            .unwrap();
        assert_eq!(outcome.spans.len(), 1);
        assert!(outcome.spans[0].reason.contains("EMAIL_ADDRESS"));
    }

    #[tokio::test]
    async fn test_unknown_entity_is_check_error() {
        let result = DetectPii
            .run("text", &params(json!({"entities": ["passport"]})))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_credit_card_requires_luhn() {
        let valid = DetectPii
            .run("card 4111 1111 1111 1111", &params(json!({"entities": ["credit_card"]})))
            .await
            .unwrap();
        assert!(!valid.passed);

        let invalid = DetectPii
            .run("order 1234 5678 9012 3456", &params(json!({"entities": ["credit_card"]})))
            .await
            .unwrap();
        assert!(invalid.passed);
    }

    #[tokio::test]
    async fn test_phone_number() {
        let outcome = DetectPii
            .run("call (555) 123-4567 now", &params(json!({"entities": ["phone"]})))
            .await
            .unwrap();
        assert!(!outcome.passed);
    }
}
