//! Server configuration.
//!
//! Layering, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file at `GUARDRAIL_CONFIG` (default `config/guardrail.toml`, optional)
//! 3. `GUARDRAIL__<SECTION>__<KEY>` environment variables
//! 4. `PORT` (overrides `server.port`)

use config::{Config, ConfigError, Environment, File};
use llm_guardrail_core::config::{
    AuthConfig, CoreConfig, CredentialsConfig, QuotaConfig, RegistryConfig,
};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/guardrail.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub quota: QuotaConfig,
    pub auth: AuthConfig,
    pub credentials: CredentialsConfig,
    pub validators: RegistryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl AppConfig {
    /// Load from the default locations.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("GUARDRAIL_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let mut config: AppConfig = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("GUARDRAIL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.server.port = port;
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// The engine-facing part of the configuration.
    pub fn core(&self) -> CoreConfig {
        CoreConfig {
            quota: self.quota.clone(),
            auth: self.auth.clone(),
            credentials: self.credentials.clone(),
            validators: self.validators.clone(),
        }
    }
}
