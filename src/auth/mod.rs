//! Authentication for outgoing backend requests.
//!
//! An [`AuthProvider`] hands out a [`Credential`] per request. Static schemes
//! (API key, HTTP Basic) return a fixed value with no network call; the OAuth2
//! client-credentials scheme exchanges and caches bearer tokens.

pub mod oauth;

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose, Engine as _};

use crate::client::transport::Transport;
use crate::config::AuthConfig;
use crate::error::Result;

pub use oauth::OAuth2ClientCredentials;

/// Default header carrying a static API key.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

// ============================================================================
// Credential
// ============================================================================

/// Authentication material attached to one request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// OAuth bearer token with its expiry.
    Bearer { token: String, expires_at: Instant },
    /// Static key sent in a named header.
    ApiKey { header: String, key: String },
    /// HTTP Basic username and password.
    Basic { username: String, password: String },
}

impl Credential {
    /// The `(header name, header value)` pair to send.
    pub fn header(&self) -> (String, String) {
        match self {
            Self::Bearer { token, .. } => ("Authorization".to_string(), format!("Bearer {}", token)),
            Self::ApiKey { header, key } => (header.clone(), key.clone()),
            Self::Basic { username, password } => {
                let encoded =
                    general_purpose::STANDARD.encode(format!("{}:{}", username, password));
                ("Authorization".to_string(), format!("Basic {}", encoded))
            }
        }
    }

    /// Expiry instant, absent for non-expiring schemes.
    pub fn expires_at(&self) -> Option<Instant> {
        match self {
            Self::Bearer { expires_at, .. } => Some(*expires_at),
            _ => None,
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Bearer { .. } => "bearer",
            Self::ApiKey { .. } => "api_key",
            Self::Basic { .. } => "basic",
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer { expires_at, .. } => f
                .debug_struct("Bearer")
                .field("token", &"[REDACTED]")
                .field(
                    "expires_in",
                    &expires_at.saturating_duration_since(Instant::now()),
                )
                .finish(),
            Self::ApiKey { header, .. } => f
                .debug_struct("ApiKey")
                .field("header", header)
                .field("key", &"[REDACTED]")
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
// Auth Provider
// ============================================================================

/// Produces credentials for outgoing requests.
#[derive(Debug)]
pub enum AuthProvider {
    OAuth2(OAuth2ClientCredentials),
    ApiKey { header: String, key: String },
    Basic { username: String, password: String },
}

impl AuthProvider {
    /// Build the provider described by `config`.
    ///
    /// The OAuth2 variant sends its token exchanges through `transport`.
    pub fn from_config(config: &AuthConfig, transport: Arc<dyn Transport>) -> Self {
        match config {
            AuthConfig::OAuth2 {
                client_id,
                client_secret,
                token_url,
                scopes,
                refresh_margin_secs,
            } => Self::OAuth2(
                OAuth2ClientCredentials::new(
                    client_id.clone(),
                    client_secret.clone(),
                    token_url.clone(),
                    scopes.clone(),
                    transport,
                )
                .with_refresh_margin(Duration::from_secs(*refresh_margin_secs)),
            ),
            AuthConfig::ApiKey { key, header_name } => Self::ApiKey {
                header: header_name.clone(),
                key: key.clone(),
            },
            AuthConfig::Basic { username, password } => Self::Basic {
                username: username.clone(),
                password: password.clone(),
            },
        }
    }

    /// A credential valid for `scope` (OAuth2 only; ignored otherwise).
    pub async fn credential(&self, scope: Option<&str>) -> Result<Credential> {
        match self {
            Self::OAuth2(oauth) => {
                let (token, expires_at) = oauth.token(scope).await?;
                Ok(Credential::Bearer { token, expires_at })
            }
            Self::ApiKey { header, key } => Ok(Credential::ApiKey {
                header: header.clone(),
                key: key.clone(),
            }),
            Self::Basic { username, password } => Ok(Credential::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
        }
    }

    /// Forget `rejected` so the next `credential` call re-derives it.
    ///
    /// Static credentials cannot be re-derived; this is a no-op for them.
    pub async fn invalidate(&self, rejected: &Credential) {
        if let (Self::OAuth2(oauth), Credential::Bearer { token, .. }) = (self, rejected) {
            oauth.invalidate(token).await;
        }
    }

    /// Token exchanges performed so far (always 0 for static schemes).
    pub fn exchange_count(&self) -> u64 {
        match self {
            Self::OAuth2(oauth) => oauth.exchange_count(),
            _ => 0,
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::OAuth2(_) => "oauth2",
            Self::ApiKey { .. } => "api_key",
            Self::Basic { .. } => "basic",
        }
    }
}
