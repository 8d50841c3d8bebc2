//! Configuration management for the ECM gateway
//!
//! A [`Config`] is loaded once (from `~/.ecm-gateway/config.json` or an
//! explicit path) and passed into the gateway. JSON, YAML and TOML files are
//! accepted, chosen by extension. Environment variables override file values
//! using the pattern `ECM_GATEWAY_SECTION_KEY`.

mod types;
pub mod validate;

pub use types::*;
pub use validate::{validate_config, validate_settings, Diagnostic, DiagnosticLevel};

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::backend::BackendProfile;
use crate::error::{GatewayError, Result};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "ECM_GATEWAY_";

/// Serialization format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Format implied by the file extension. Unknown extensions read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }

    /// Parse `content` into a generic document.
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self {
            Self::Json => serde_json::from_str(content)
                .map_err(|e| GatewayError::Config(format!("invalid JSON config: {}", e))),
            Self::Yaml => serde_yaml::from_str(content)
                .map_err(|e| GatewayError::Config(format!("invalid YAML config: {}", e))),
            Self::Toml => toml::from_str(content)
                .map_err(|e| GatewayError::Config(format!("invalid TOML config: {}", e))),
        }
    }
}

impl Config {
    /// Returns the gateway configuration directory path (~/.ecm-gateway)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ecm-gateway")
    }

    /// Returns the path to the default config file (~/.ecm-gateway/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = Self::read_raw(path)?;
            Self::from_value(raw)?
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Read a config file into a generic document, for validation.
    pub fn read_raw(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        ConfigFormat::from_path(path).parse(&content)
    }

    pub fn from_value(raw: Value) -> Result<Self> {
        serde_json::from_value(raw).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Diagnostics for the loaded values. Key-level checks need the raw
    /// document; see [`validate_config`].
    pub fn validate(&self) -> Vec<Diagnostic> {
        validate_settings(self)
    }

    /// Fail with the first error-level settings diagnostic, if any.
    pub fn check(&self) -> Result<()> {
        match self.validate().into_iter().find(Diagnostic::is_error) {
            Some(d) => Err(GatewayError::Config(d.to_string())),
            None => Ok(()),
        }
    }

    /// Apply `ECM_GATEWAY_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok());
    }

    /// Apply overrides from `lookup`, which maps a key without the prefix
    /// (e.g. `BACKEND_BASE_URL`) to its value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Backend
        if let Some(val) = lookup("BACKEND_BASE_URL") {
            self.backend.base_url = val;
        }
        if let Some(val) = lookup("BACKEND_PROFILE") {
            match val.parse::<BackendProfile>() {
                Ok(profile) => self.backend.profile = profile,
                Err(e) => tracing::warn!(error = %e, "Ignoring ECM_GATEWAY_BACKEND_PROFILE"),
            }
        }

        // HTTP, retry, rate limit, cache
        parse_into(&lookup, "HTTP_TIMEOUT_SECS", &mut self.http.timeout_secs);
        parse_into(&lookup, "HTTP_MAX_CONNECTIONS", &mut self.http.max_connections);
        parse_into(&lookup, "RETRY_MAX_ATTEMPTS", &mut self.retry.max_attempts);
        parse_into(&lookup, "RATE_LIMIT_CAPACITY", &mut self.rate_limit.capacity);
        parse_into(
            &lookup,
            "RATE_LIMIT_REFILL_PER_MINUTE",
            &mut self.rate_limit.refill_per_minute,
        );
        parse_into(&lookup, "CACHE_ENABLED", &mut self.cache.enabled);
        parse_into(&lookup, "CACHE_TTL_SECS", &mut self.cache.ttl_secs);
        parse_into(&lookup, "LIMITS_MAX_SEARCH_RESULTS", &mut self.limits.max_search_results);

        // Logging
        if let Some(val) = lookup("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("LOG_FORMAT") {
            match val.to_ascii_lowercase().as_str() {
                "json" => self.logging.format = LogFormat::Json,
                "pretty" => self.logging.format = LogFormat::Pretty,
                "component" => self.logging.format = LogFormat::Component,
                _ => {}
            }
        }

        self.apply_auth_overrides(&lookup);
    }

    fn apply_auth_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let (Some(client_id), Some(client_secret), Some(token_url)) = (
            lookup("AUTH_CLIENT_ID"),
            lookup("AUTH_CLIENT_SECRET"),
            lookup("AUTH_TOKEN_URL"),
        ) {
            let scopes = lookup("AUTH_SCOPES")
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            self.auth = AuthConfig::OAuth2 {
                client_id,
                client_secret,
                token_url,
                scopes,
                refresh_margin_secs: crate::auth::oauth::DEFAULT_REFRESH_MARGIN_SECS,
            };
        } else if let (Some(username), Some(password)) =
            (lookup("AUTH_USERNAME"), lookup("AUTH_PASSWORD"))
        {
            self.auth = AuthConfig::Basic { username, password };
        } else if let Some(key) = lookup("AUTH_API_KEY") {
            let header_name = match &self.auth {
                AuthConfig::ApiKey { header_name, .. } => header_name.clone(),
                _ => crate::auth::DEFAULT_API_KEY_HEADER.to_string(),
            };
            self.auth = AuthConfig::ApiKey {
                key,
                header_name: lookup("AUTH_HEADER_NAME").unwrap_or(header_name),
            };
        } else if let AuthConfig::OAuth2 { client_secret, .. } = &mut self.auth {
            if let Some(secret) = lookup("AUTH_CLIENT_SECRET") {
                *client_secret = secret;
            }
        }
    }
}

fn parse_into<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.parse() {
            Ok(v) => *target = v,
            Err(_) => tracing::warn!(key = key, value = %raw, "Ignoring unparsable override"),
        }
    }
}
