//! Bearer-token (JWT) verification against an issuer key set.

use crate::config::AuthConfig;
use crate::error::GuardrailError;
use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// Claims the management surface relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Owner identity bound to issued credentials.
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Where the issuer's public keys come from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, GuardrailError>;
}

/// Fetches a JWKS document over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpKeySetSource {
    client: reqwest::Client,
    url: String,
}

impl HttpKeySetSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, GuardrailError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GuardrailError::KeySetUnavailable(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, GuardrailError> {
        let unavailable = |e: reqwest::Error| GuardrailError::KeySetUnavailable(e.to_string());
        self.client
            .get(&self.url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json::<JwkSet>()
            .await
            .map_err(unavailable)
    }
}

/// Minimum spacing between forced refreshes triggered by unknown key ids.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// TTL cache in front of a [`KeySetSource`].
///
/// Refreshes are serialised so an expired cache triggers one fetch, not one
/// per concurrent request. Every fetch is bounded by `fetch_timeout`.
/// Forced refreshes are skipped while the cached set is younger than
/// `min_refresh_interval`.
pub struct CachedKeySet {
    source: Arc<dyn KeySetSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    min_refresh_interval: Duration,
    cached: RwLock<Option<(Instant, Arc<JwkSet>)>>,
    refresh: Mutex<()>,
}

impl CachedKeySet {
    pub fn new(source: Arc<dyn KeySetSource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            source,
            ttl,
            fetch_timeout,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            cached: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    async fn fresh(&self) -> Option<Arc<JwkSet>> {
        let cached = self.cached.read().await;
        match cached.as_ref() {
            Some((fetched_at, keys)) if fetched_at.elapsed() < self.ttl => Some(keys.clone()),
            _ => None,
        }
    }

    /// Current key set, fetching when the cache is empty or expired.
    pub async fn get(&self) -> Result<Arc<JwkSet>, GuardrailError> {
        if let Some(keys) = self.fresh().await {
            return Ok(keys);
        }
        let _guard = self.refresh.lock().await;
        if let Some(keys) = self.fresh().await {
            return Ok(keys);
        }
        self.fetch_and_store().await
    }

    /// Fetch after seeing an unknown key id.
    ///
    /// Returns the cached set without fetching if it was fetched less than
    /// `min_refresh_interval` ago.
    pub async fn refresh(&self) -> Result<Arc<JwkSet>, GuardrailError> {
        let _guard = self.refresh.lock().await;
        if let Some((fetched_at, keys)) = self.cached.read().await.as_ref() {
            if fetched_at.elapsed() < self.min_refresh_interval {
                return Ok(keys.clone());
            }
        }
        self.fetch_and_store().await
    }

    async fn fetch_and_store(&self) -> Result<Arc<JwkSet>, GuardrailError> {
        let keys = tokio::time::timeout(self.fetch_timeout, self.source.fetch())
            .await
            .map_err(|_| {
                GuardrailError::KeySetUnavailable(format!(
                    "key set fetch timed out after {:?}",
                    self.fetch_timeout
                ))
            })??;

        let keys = Arc::new(keys);
        *self.cached.write().await = Some((Instant::now(), keys.clone()));
        tracing::debug!(keys = keys.keys.len(), "issuer key set refreshed");
        Ok(keys)
    }
}

/// Verifies signature, issuer, audience and expiry of bearer tokens.
pub struct BearerVerifier {
    keys: CachedKeySet,
    issuer: Option<String>,
    audience: Option<String>,
    leeway_secs: u64,
}

impl BearerVerifier {
    pub fn new(keys: CachedKeySet) -> Self {
        Self {
            keys,
            issuer: None,
            audience: None,
            leeway_secs: 60,
        }
    }

    /// Verifier backed by the HTTP key set in `config`; `None` if no URL is configured.
    pub fn from_config(config: &AuthConfig) -> Result<Option<Self>, GuardrailError> {
        let Some(url) = config.jwks_url.as_deref() else {
            return Ok(None);
        };
        let timeout = Duration::from_secs(config.fetch_timeout_secs);
        let source = HttpKeySetSource::new(url, timeout)?;
        let keys = CachedKeySet::new(
            Arc::new(source),
            Duration::from_secs(config.jwks_ttl_secs),
            timeout,
        );

        let mut verifier = Self::new(keys).with_leeway(config.leeway_secs);
        if let Some(issuer) = &config.issuer {
            verifier = verifier.with_issuer(issuer.clone());
        }
        if let Some(audience) = &config.audience {
            verifier = verifier.with_audience(audience.clone());
        }
        Ok(Some(verifier))
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_secs = seconds;
        self
    }

    /// Verify `token` and return its claims.
    pub async fn verify(&self, token: &str) -> Result<Claims, GuardrailError> {
        let header = decode_header(token)
            .map_err(|e| GuardrailError::TokenInvalid(format!("malformed header: {}", e)))?;
        let kid = header
            .kid
            .ok_or_else(|| GuardrailError::TokenInvalid("missing key id".to_string()))?;

        let mut keys = self.keys.get().await?;
        if keys.find(&kid).is_none() {
            // the issuer may have rotated keys since the last fetch
            keys = self.keys.refresh().await?;
        }
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| GuardrailError::TokenInvalid("unknown key id".to_string()))?;
        let key = DecodingKey::from_jwk(jwk)
            .map_err(|e| GuardrailError::TokenInvalid(format!("unusable key: {}", e)))?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => GuardrailError::TokenExpired,
                _ => GuardrailError::TokenInvalid(e.to_string()),
            })
    }
}
