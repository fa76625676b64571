//! Centralized server configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables, e.g. `DATABASE_URL`, `AUTH__JWT_SECRET`,
//! `LLM__MODEL`, `SESSION__IDLE_MINUTES`.

use serde::Deserialize;
use storefront_ai::OpenAiConfig;

/// Server configuration composed from section configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Origin allowed by the CORS layer.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Authentication configuration.
    pub auth: AuthConfig,

    /// Model gateway configuration.
    pub llm: LlmConfig,

    /// Assistant session configuration.
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Token issuance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing bearer tokens.
    pub jwt_secret: String,

    /// Token lifetime in minutes.
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

fn default_token_ttl_minutes() -> i64 {
    480
}

/// Model gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API root.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Bearer token for the provider.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Phrase tool results through a second model call instead of using
    /// the templated result text.
    #[serde(default)]
    pub narrate_with_model: bool,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

impl LlmConfig {
    /// Builds the backend configuration.
    #[must_use]
    pub fn backend_config(&self) -> OpenAiConfig {
        let mut config = OpenAiConfig::new(self.base_url.clone(), self.model.clone());
        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key.clone());
        }
        config
    }
}

/// Assistant session housekeeping.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle longer than this are evicted.
    #[serde(default = "default_idle_minutes")]
    pub idle_minutes: i64,

    /// Interval between eviction sweeps, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,
}

fn default_idle_minutes() -> i64 {
    60
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_minutes: default_idle_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.idle_minutes, 60);
        assert_eq!(config.cleanup_interval_seconds, 300);
    }

    #[test]
    fn llm_config_builds_backend_config() {
        let config = LlmConfig {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3".to_string(),
            api_key: Some("key".to_string()),
            narrate_with_model: false,
        };
        let backend = config.backend_config();
        assert_eq!(backend.base_url, "http://localhost:11434/v1");
        assert_eq!(backend.model, "llama3");
        assert_eq!(backend.api_key.as_deref(), Some("key"));
    }
}
