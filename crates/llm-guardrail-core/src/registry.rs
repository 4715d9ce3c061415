//! Validator registry.
//!
//! Two parallel catalogs, one per [`Direction`], map validator names to a
//! configured [`Check`] and its [`FailurePolicy`]. The registry is built once
//! at startup and shared read-only (`Arc<ValidatorRegistry>`) afterwards.

use crate::checks::{
    Check, CheckParams, DetectJailbreak, DetectPii, HasUrl, RedundantSentences, SecretsPresent,
    ValidJson, ValidUrl, WebSanitization, WordListCheck,
};
use crate::config::{RegistryConfig, ValidatorOverride};
use crate::error::GuardrailError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Whether text is a prompt going in or a completion coming out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pipeline does when a check fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure; leave the text alone and continue.
    #[default]
    Noop,
    /// Substitute the check's corrected text and continue.
    Fix,
    /// Flag the report for regeneration and stop.
    Reask,
    /// Abort the pipeline and fail the report.
    Exception,
}

/// A registry entry.
#[derive(Clone)]
pub struct ValidatorDescriptor {
    pub name: String,
    pub direction: Direction,
    pub on_fail: FailurePolicy,
    pub params: CheckParams,
    check: Arc<dyn Check>,
}

impl ValidatorDescriptor {
    pub fn new(name: impl Into<String>, direction: Direction, check: Arc<dyn Check>) -> Self {
        Self {
            name: name.into(),
            direction,
            on_fail: FailurePolicy::Noop,
            params: CheckParams::new(),
            check,
        }
    }

    pub fn with_policy(mut self, on_fail: FailurePolicy) -> Self {
        self.on_fail = on_fail;
        self
    }

    pub fn with_params(mut self, params: CheckParams) -> Self {
        self.params = params;
        self
    }

    pub fn check(&self) -> &dyn Check {
        self.check.as_ref()
    }

    fn apply(&mut self, overrides: &ValidatorOverride) {
        if let Some(policy) = overrides.on_fail {
            self.on_fail = policy;
        }
        for (key, value) in &overrides.params {
            self.params.insert(key.clone(), value.clone());
        }
    }
}

impl fmt::Debug for ValidatorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorDescriptor")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("on_fail", &self.on_fail)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// One direction's catalog, in registration order.
#[derive(Debug, Default, Clone)]
struct Catalog {
    entries: Vec<ValidatorDescriptor>,
    index: HashMap<String, usize>,
}

impl Catalog {
    fn insert(&mut self, descriptor: ValidatorDescriptor) {
        match self.index.get(&descriptor.name) {
            Some(&i) => self.entries[i] = descriptor,
            None => {
                self.index.insert(descriptor.name.clone(), self.entries.len());
                self.entries.push(descriptor);
            }
        }
    }

    fn get(&self, name: &str) -> Option<&ValidatorDescriptor> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut ValidatorDescriptor> {
        self.index.get(name).map(|&i| &mut self.entries[i])
    }
}

/// Immutable validator catalog for both directions.
#[derive(Debug, Clone)]
pub struct ValidatorRegistry {
    input: Catalog,
    output: Catalog,
}

impl ValidatorRegistry {
    pub fn builder() -> ValidatorRegistryBuilder {
        ValidatorRegistryBuilder::new()
    }

    /// The built-in catalog with default (`noop`) policies.
    pub fn builtin() -> Self {
        Self::builder().with_builtins().build()
    }

    /// The built-in catalog with configuration overrides applied.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, GuardrailError> {
        Ok(Self::builder()
            .with_builtins()
            .apply_config(config)?
            .build())
    }

    fn catalog(&self, direction: Direction) -> &Catalog {
        match direction {
            Direction::Input => &self.input,
            Direction::Output => &self.output,
        }
    }

    /// Resolve `name` for `direction`.
    pub fn lookup(
        &self,
        name: &str,
        direction: Direction,
    ) -> Result<&ValidatorDescriptor, GuardrailError> {
        self.catalog(direction)
            .get(name)
            .ok_or_else(|| GuardrailError::UnknownValidator {
                name: name.to_string(),
                direction,
            })
    }

    /// Fail on the first name that does not resolve.
    pub fn validate_names<S: AsRef<str>>(
        &self,
        direction: Direction,
        names: &[S],
    ) -> Result<(), GuardrailError> {
        for name in names {
            self.lookup(name.as_ref(), direction)?;
        }
        Ok(())
    }

    pub fn names(&self, direction: Direction) -> Vec<&str> {
        self.catalog(direction)
            .entries
            .iter()
            .map(|d| d.name.as_str())
            .collect()
    }

    pub fn descriptors(&self, direction: Direction) -> &[ValidatorDescriptor] {
        &self.catalog(direction).entries
    }
}

/// Builder used at startup; the frozen [`ValidatorRegistry`] has no mutators.
pub struct ValidatorRegistryBuilder {
    input: Catalog,
    output: Catalog,
}

impl ValidatorRegistryBuilder {
    fn new() -> Self {
        Self {
            input: Catalog::default(),
            output: Catalog::default(),
        }
    }

    fn catalog_mut(&mut self, direction: Direction) -> &mut Catalog {
        match direction {
            Direction::Input => &mut self.input,
            Direction::Output => &mut self.output,
        }
    }

    /// Add or replace a validator.
    pub fn register(mut self, descriptor: ValidatorDescriptor) -> Self {
        self.catalog_mut(descriptor.direction).insert(descriptor);
        self
    }

    /// Register `check` under `name` for both directions.
    pub fn register_both(self, name: &str, check: Arc<dyn Check>) -> Self {
        self.register(ValidatorDescriptor::new(name, Direction::Input, check.clone()))
            .register(ValidatorDescriptor::new(name, Direction::Output, check))
    }

    /// Add the built-in catalog.
    pub fn with_builtins(self) -> Self {
        let pii: Arc<dyn Check> = Arc::new(DetectPii);
        let secrets: Arc<dyn Check> = Arc::new(SecretsPresent);
        let jailbreak: Arc<dyn Check> = Arc::new(DetectJailbreak);
        let drugs: Arc<dyn Check> = Arc::new(WordListCheck::drugs());

        self.register_both("detect_pii", pii)
            .register_both("secrets_present", secrets)
            .register_both("detect_jailbreak", jailbreak)
            .register_both("mentions_drugs", drugs)
            .register(output("profanity_free", Arc::new(WordListCheck::profanity())))
            .register(output("web_sanitization", Arc::new(WebSanitization)))
            .register(output("redundant_sentences", Arc::new(RedundantSentences)))
            .register(output("valid_json", Arc::new(ValidJson)))
            .register(output("valid_url", Arc::new(ValidUrl)))
            .register(output("has_url", Arc::new(HasUrl)))
    }

    /// Apply policy and parameter overrides; unknown names and parameters the
    /// check rejects fail here rather than on every later validation.
    pub fn apply_config(mut self, config: &RegistryConfig) -> Result<Self, GuardrailError> {
        for (direction, overrides) in [
            (Direction::Input, &config.input),
            (Direction::Output, &config.output),
        ] {
            for (name, o) in overrides {
                let descriptor = self.catalog_mut(direction).get_mut(name).ok_or_else(|| {
                    GuardrailError::UnknownValidator {
                        name: name.clone(),
                        direction,
                    }
                })?;
                descriptor.apply(o);
                descriptor
                    .check()
                    .validate_params(&descriptor.params)
                    .map_err(|e| GuardrailError::InvalidValidatorParams {
                        name: name.clone(),
                        direction,
                        reason: e.0,
                    })?;
            }
        }
        Ok(self)
    }

    pub fn build(self) -> ValidatorRegistry {
        ValidatorRegistry {
            input: self.input,
            output: self.output,
        }
    }
}

fn output(name: &str, check: Arc<dyn Check>) -> ValidatorDescriptor {
    ValidatorDescriptor::new(name, Direction::Output, check)
}
