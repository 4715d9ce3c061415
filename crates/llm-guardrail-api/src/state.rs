//! Shared application state.

use crate::config::AppConfig;
use llm_guardrail_core::auth::BearerVerifier;
use llm_guardrail_core::{GuardrailEngine, GuardrailError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<GuardrailEngine>,
    /// `None` runs management routes in single-tenant mode.
    pub bearer: Option<Arc<BearerVerifier>>,
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: GuardrailEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            bearer: None,
            metrics: None,
            started_at: Instant::now(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, GuardrailError> {
        let core = config.core();
        let engine = GuardrailEngine::from_config(&core)?;
        let bearer = BearerVerifier::from_config(&core.auth)?;
        if bearer.is_none() {
            tracing::warn!("auth.jwks_url not set; key management runs in single-tenant mode");
        }

        let mut state = Self::new(engine);
        state.bearer = bearer.map(Arc::new);
        Ok(state)
    }

    pub fn with_bearer(mut self, verifier: BearerVerifier) -> Self {
        self.bearer = Some(Arc::new(verifier));
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
