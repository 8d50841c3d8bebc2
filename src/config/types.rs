//! Configuration types for the ECM gateway.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::auth::DEFAULT_API_KEY_HEADER;
use crate::backend::BackendProfile;
use crate::client::RetryPolicy;

/// Main configuration struct for the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend location and REST dialect
    pub backend: BackendConfig,
    /// How outgoing requests authenticate
    pub auth: AuthConfig,
    /// HTTP client timeouts and pool sizes
    pub http: HttpConfig,
    /// Retry budget and backoff
    pub retry: RetryPolicy,
    /// Outbound token bucket
    pub rate_limit: RateLimitConfig,
    /// Response cache
    pub cache: CacheConfig,
    /// Caller-facing limits
    pub limits: LimitsConfig,
    /// Logging subscriber setup
    pub logging: LoggingConfig,
    /// Audit events for mutating operations
    pub audit: AuditConfig,
}

// ============================================================================
// Backend
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the ECM REST API, e.g. `https://ecm.example.com/api/v1`.
    pub base_url: String,
    pub profile: BackendProfile,
    /// Static headers sent with every backend request.
    pub headers: BTreeMap<String, String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".to_string(),
            profile: BackendProfile::default(),
            headers: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

fn default_refresh_margin() -> u64 {
    crate::auth::oauth::DEFAULT_REFRESH_MARGIN_SECS
}

/// Authentication scheme and its parameters.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// OAuth2 client-credentials grant.
    #[serde(rename = "oauth2")]
    OAuth2 {
        client_id: String,
        client_secret: String,
        token_url: String,
        #[serde(default)]
        scopes: Vec<String>,
        /// Refresh this many seconds before the token expires.
        #[serde(default = "default_refresh_margin")]
        refresh_margin_secs: u64,
    },
    /// Static key sent in a header.
    ApiKey {
        key: String,
        #[serde(default = "default_api_key_header")]
        header_name: String,
    },
    /// HTTP basic auth.
    Basic { username: String, password: String },
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::ApiKey {
            key: String::new(),
            header_name: default_api_key_header(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OAuth2 {
                client_id,
                token_url,
                scopes,
                refresh_margin_secs,
                ..
            } => f
                .debug_struct("OAuth2")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .field("token_url", token_url)
                .field("scopes", scopes)
                .field("refresh_margin_secs", refresh_margin_secs)
                .finish(),
            Self::ApiKey { header_name, .. } => f
                .debug_struct("ApiKey")
                .field("key", &"[REDACTED]")
                .field("header_name", header_name)
                .finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

// ============================================================================
// HTTP
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-attempt deadline.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Concurrent in-flight backend requests.
    pub max_connections: usize,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_connections: 32,
            pool_max_idle_per_host: 8,
            pool_idle_timeout_secs: 90,
            user_agent: format!("ecm-gateway/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

// ============================================================================
// Rate limit, cache, limits
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Burst size. 0 disables rate limiting.
    pub capacity: u32,
    pub refill_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            refill_per_minute: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// TTL for document reads and metadata schemas.
    pub ttl_secs: u64,
    /// TTL for folder trees.
    pub folder_tree_ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            folder_tree_ttl_secs: 30,
            max_entries: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Ceiling for any search result count.
    pub max_search_results: u32,
    /// Result count when the caller does not give one.
    pub default_page_size: u32,
    /// Ceiling for folder tree depth.
    pub max_folder_depth: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_search_results: 100,
            default_page_size: 20,
            max_folder_depth: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    Pretty,
    /// Compact single-line output with a `component` field.
    #[default]
    Component,
    /// JSON lines.
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
    /// Append to this file instead of stderr.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}
