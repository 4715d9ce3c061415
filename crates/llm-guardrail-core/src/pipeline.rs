//! Guard composition and pipeline execution.

use crate::config::EmptySelection;
use crate::error::GuardrailError;
use crate::normalizer::{RawOutcome, RawSpan, RawSummary};
use crate::registry::{Direction, FailurePolicy, ValidatorDescriptor, ValidatorRegistry};
use crate::report::CheckStatus;
use std::sync::Arc;

const DEFAULT_FAILURE_REASON: &str = "Validation failed";

/// Builds pipelines from a credential's validator selection.
#[derive(Debug, Clone)]
pub struct GuardComposer {
    registry: Arc<ValidatorRegistry>,
    empty_selection: EmptySelection,
}

impl GuardComposer {
    pub fn new(registry: Arc<ValidatorRegistry>, empty_selection: EmptySelection) -> Self {
        Self {
            registry,
            empty_selection,
        }
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Resolve `names` in order. The first unknown name fails the whole composition.
    pub fn compose<S: AsRef<str>>(
        &self,
        direction: Direction,
        names: &[S],
    ) -> Result<Pipeline, GuardrailError> {
        let steps = if names.is_empty() {
            match self.empty_selection {
                EmptySelection::Reject => return Err(GuardrailError::EmptySelection(direction)),
                EmptySelection::RunAll => self.registry.descriptors(direction).to_vec(),
            }
        } else {
            names
                .iter()
                .map(|name| self.registry.lookup(name.as_ref(), direction).cloned())
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Pipeline { direction, steps })
    }
}

/// An ordered, resolved sequence of validators for one direction.
#[derive(Debug, Clone)]
pub struct Pipeline {
    direction: Direction,
    steps: Vec<ValidatorDescriptor>,
}

impl Pipeline {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every check in order against the current text.
    ///
    /// `fix` rewrites feed downstream checks; `reask` and `exception` stop
    /// the pipeline. A check that cannot execute aborts with
    /// [`GuardrailError::CheckUnavailable`].
    pub async fn run(&self, text: &str) -> Result<RawOutcome, GuardrailError> {
        let mut current = text.to_string();
        let mut summaries = Vec::with_capacity(self.steps.len());
        let mut passed = true;
        let mut reask = false;
        let mut error = None;

        for step in &self.steps {
            let outcome = step
                .check()
                .run(&current, &step.params)
                .await
                .map_err(|e| GuardrailError::CheckUnavailable {
                    validator: step.name.clone(),
                    reason: e.to_string(),
                })?;

            let reason = outcome
                .reason
                .clone()
                .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string());

            let status = if outcome.passed {
                CheckStatus::Pass
            } else {
                match (step.on_fail, outcome.fix_value) {
                    (FailurePolicy::Noop, _) | (FailurePolicy::Fix, None) => {
                        passed = false;
                        CheckStatus::FailNoop
                    }
                    (FailurePolicy::Fix, Some(fixed)) => {
                        current = fixed;
                        CheckStatus::FailFixed
                    }
                    (FailurePolicy::Reask, _) => {
                        passed = false;
                        reask = true;
                        CheckStatus::FailReasked
                    }
                    (FailurePolicy::Exception, _) => {
                        passed = false;
                        error = Some(format!("{}: {}", step.name, reason));
                        CheckStatus::FailException
                    }
                }
            };

            tracing::debug!(
                validator = %step.name,
                direction = %self.direction,
                status = status.as_str(),
                "check completed"
            );

            summaries.push(RawSummary {
                validator_name: Some(step.name.clone()),
                validator_status: Some(status.as_str().to_string()),
                failure_reason: (!outcome.passed).then_some(reason),
                error_spans: Some(
                    outcome
                        .spans
                        .into_iter()
                        .map(|s| RawSpan::Fields {
                            start: Some(s.start),
                            end: Some(s.end),
                            reason: Some(s.reason),
                        })
                        .collect(),
                ),
            });

            if matches!(
                status,
                CheckStatus::FailReasked | CheckStatus::FailException
            ) {
                break;
            }
        }

        let validated_output = (error.is_none() && current != text).then_some(current);

        Ok(RawOutcome {
            validation_passed: Some(passed),
            error,
            validated_output,
            reask: Some(reask),
            validation_summaries: Some(summaries),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{Check, CheckError, CheckOutcome, CheckParams, DetectPii};
    use crate::normalizer::normalize;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the text it was given and fails when it contains `needle`.
    struct Probe {
        needle: &'static str,
        seen: Mutex<Vec<String>>,
    }

    impl Probe {
        fn new(needle: &'static str) -> Arc<Self> {
            Arc::new(Self {
                needle,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Check for Probe {
        async fn run(&self, text: &str, _: &CheckParams) -> Result<CheckOutcome, CheckError> {
            self.seen.lock().unwrap().push(text.to_string());
            if text.contains(self.needle) {
                Ok(CheckOutcome::fail(format!("found {}", self.needle), Vec::new()))
            } else {
                Ok(CheckOutcome::pass())
            }
        }
    }

    struct Broken;

    #[async_trait]
    impl Check for Broken {
        async fn run(&self, _: &str, _: &CheckParams) -> Result<CheckOutcome, CheckError> {
            Err(CheckError("classifier offline".into()))
        }
    }

    fn composer_with(descriptors: Vec<ValidatorDescriptor>) -> GuardComposer {
        let builder = descriptors
            .into_iter()
            .fold(ValidatorRegistry::builder(), |b, d| b.register(d));
        GuardComposer::new(Arc::new(builder.build()), EmptySelection::Reject)
    }

    #[tokio::test]
    async fn test_fix_feeds_downstream_checks() {
        let probe = Probe::new("123-45-6789");
        let composer = composer_with(vec![
            ValidatorDescriptor::new("a", Direction::Input, Arc::new(DetectPii))
                .with_policy(FailurePolicy::Fix),
            ValidatorDescriptor::new("b", Direction::Input, probe.clone()),
        ]);

        let pipeline = composer.compose(Direction::Input, &["a", "b"]).unwrap();
        let raw = pipeline.run("My SSN is 123-45-6789").await.unwrap();

        assert_eq!(
            probe.seen.lock().unwrap().as_slice(),
            &["My SSN is <SSN>".to_string()]
        );
        let report = normalize(Some(&raw));
        assert!(report.validation_passed);
        assert_eq!(report.validation_summaries[0].validator_status, CheckStatus::FailFixed);
        assert_eq!(report.validation_summaries[1].validator_status, CheckStatus::Pass);
        assert_eq!(report.validated_output.as_deref(), Some("My SSN is <SSN>"));
    }

    #[tokio::test]
    async fn test_noop_failure_continues_but_fails_report() {
        let second = Probe::new("never");
        let composer = composer_with(vec![
            ValidatorDescriptor::new("a", Direction::Output, Probe::new("bad")),
            ValidatorDescriptor::new("b", Direction::Output, second.clone()),
        ]);
        let raw = composer
            .compose(Direction::Output, &["a", "b"])
            .unwrap()
            .run("bad text")
            .await
            .unwrap();

        assert_eq!(second.seen.lock().unwrap().len(), 1);
        let report = normalize(Some(&raw));
        assert!(!report.validation_passed);
        assert_eq!(report.validation_summaries.len(), 2);
        assert_eq!(report.validation_summaries[0].failure_reason, "found bad");
        assert!(report.validated_output.is_none());
    }

    #[tokio::test]
    async fn test_exception_short_circuits() {
        let second = Probe::new("never");
        let composer = composer_with(vec![
            ValidatorDescriptor::new("a", Direction::Input, Probe::new("bad"))
                .with_policy(FailurePolicy::Exception),
            ValidatorDescriptor::new("b", Direction::Input, second.clone()),
        ]);
        let raw = composer
            .compose(Direction::Input, &["a", "b"])
            .unwrap()
            .run("bad text")
            .await
            .unwrap();

        assert!(second.seen.lock().unwrap().is_empty());
        let report = normalize(Some(&raw));
        assert!(!report.validation_passed);
        assert_eq!(report.error.as_deref(), Some("a: found bad"));
        assert_eq!(report.validation_summaries.len(), 1);
    }

    #[tokio::test]
    async fn test_reask_flags_and_stops() {
        let second = Probe::new("never");
        let composer = composer_with(vec![
            ValidatorDescriptor::new("a", Direction::Output, Probe::new("bad"))
                .with_policy(FailurePolicy::Reask),
            ValidatorDescriptor::new("b", Direction::Output, second.clone()),
        ]);
        let raw = composer
            .compose(Direction::Output, &["a", "b"])
            .unwrap()
            .run("bad")
            .await
            .unwrap();

        assert!(second.seen.lock().unwrap().is_empty());
        let report = normalize(Some(&raw));
        assert!(report.reask);
        assert!(report.error.is_none());
        assert!(!report.validation_passed);
    }

    #[tokio::test]
    async fn test_fix_without_value_records_noop() {
        let composer = composer_with(vec![ValidatorDescriptor::new(
            "a",
            Direction::Input,
            Probe::new("bad"),
        )
        .with_policy(FailurePolicy::Fix)]);
        let raw = composer
            .compose(Direction::Input, &["a"])
            .unwrap()
            .run("bad")
            .await
            .unwrap();
        let report = normalize(Some(&raw));
        assert_eq!(report.validation_summaries[0].validator_status, CheckStatus::FailNoop);
        assert!(!report.validation_passed);
    }

    #[tokio::test]
    async fn test_broken_check_is_an_error_not_a_pass() {
        let composer = composer_with(vec![ValidatorDescriptor::new(
            "flaky",
            Direction::Input,
            Arc::new(Broken),
        )]);
        let err = composer
            .compose(Direction::Input, &["flaky"])
            .unwrap()
            .run("anything")
            .await
            .unwrap_err();
        assert!(matches!(err, GuardrailError::CheckUnavailable { ref validator, .. } if validator == "flaky"));
    }

    #[test]
    fn test_unknown_name_fails_composition() {
        let composer = GuardComposer::new(Arc::new(ValidatorRegistry::builtin()), EmptySelection::Reject);
        let err = composer
            .compose(Direction::Input, &["detect_pii", "nsfw_text"])
            .unwrap_err();
        assert!(matches!(err, GuardrailError::UnknownValidator { .. }));
    }

    #[test]
    fn test_empty_selection_policies() {
        let registry = Arc::new(ValidatorRegistry::builtin());
        let empty: [&str; 0] = [];

        let reject = GuardComposer::new(registry.clone(), EmptySelection::Reject);
        assert!(matches!(
            reject.compose(Direction::Input, &empty),
            Err(GuardrailError::EmptySelection(Direction::Input))
        ));

        let run_all = GuardComposer::new(registry.clone(), EmptySelection::RunAll);
        let pipeline = run_all.compose(Direction::Output, &empty).unwrap();
        assert_eq!(pipeline.names(), registry.names(Direction::Output));
    }

    #[test]
    fn test_caller_order_is_preserved() {
        let composer = GuardComposer::new(Arc::new(ValidatorRegistry::builtin()), EmptySelection::Reject);
        let pipeline = composer
            .compose(Direction::Output, &["valid_json", "detect_pii", "has_url"])
            .unwrap();
        assert_eq!(pipeline.names(), vec!["valid_json", "detect_pii", "has_url"]);
        assert_eq!(pipeline.direction(), Direction::Output);
    }
}
