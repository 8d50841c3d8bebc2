//! OAuth 2.0 client-credentials token source.
//!
//! Tokens are cached per scope set. The cache lock is held across the token
//! exchange, so concurrent callers that find the token stale queue behind the
//! one caller doing the exchange and then read its result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::classify::{classify_transport, extract_message};
use crate::client::transport::{OutboundRequest, Transport};
use crate::client::types::{Method, RequestBody};
use crate::error::{Failure, GatewayError, Result};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Default refresh margin before the reported expiry.
pub const DEFAULT_REFRESH_MARGIN_SECS: u64 = 300;

/// Token endpoint response. Deserialize-only so tokens never get serialized into logs.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    /// Instant the token is considered stale (expiry minus margin).
    refresh_at: Instant,
    expires_at: Instant,
}

/// Client-credentials grant against a token endpoint.
pub struct OAuth2ClientCredentials {
    client_id: String,
    client_secret: String,
    token_url: String,
    scopes: Vec<String>,
    refresh_margin: Duration,
    transport: Arc<dyn Transport>,
    tokens: Mutex<HashMap<String, CachedToken>>,
    exchanges: AtomicU64,
}

impl std::fmt::Debug for OAuth2ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2ClientCredentials")
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url)
            .field("scopes", &self.scopes)
            .field("refresh_margin", &self.refresh_margin)
            .finish_non_exhaustive()
    }
}

impl OAuth2ClientCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
        scopes: Vec<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: token_url.into(),
            scopes,
            refresh_margin: Duration::from_secs(DEFAULT_REFRESH_MARGIN_SECS),
            transport,
            tokens: Mutex::new(HashMap::new()),
            exchanges: AtomicU64::new(0),
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Number of token exchanges performed so far.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::SeqCst)
    }

    /// Return a valid access token and its expiry for `scope` (or the configured scopes).
    pub async fn token(&self, scope: Option<&str>) -> Result<(String, Instant)> {
        let scope_key = self.scope_key(scope);
        let mut tokens = self.tokens.lock().await;

        if let Some(cached) = tokens.get(&scope_key) {
            if Instant::now() < cached.refresh_at {
                return Ok((cached.access_token.clone(), cached.expires_at));
            }
            debug!(scope = %scope_key, "Cached OAuth token is stale, refreshing");
        }

        let fresh = self.exchange(&scope_key).await?;
        let result = (fresh.access_token.clone(), fresh.expires_at);
        tokens.insert(scope_key, fresh);
        Ok(result)
    }

    /// Drop the cached token if it is still `rejected`.
    ///
    /// A token refreshed by another caller in the meantime is left alone.
    pub async fn invalidate(&self, rejected: &str) {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, cached| cached.access_token != rejected);
        if tokens.len() != before {
            info!("Invalidated OAuth token rejected by backend");
        }
    }

    fn scope_key(&self, scope: Option<&str>) -> String {
        match scope {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => self.scopes.join(" "),
        }
    }

    async fn exchange(&self, scope: &str) -> Result<CachedToken> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);

        let mut fields = vec![
            ("grant_type".to_string(), "client_credentials".to_string()),
            ("client_id".to_string(), self.client_id.clone()),
            ("client_secret".to_string(), self.client_secret.clone()),
        ];
        if !scope.is_empty() {
            fields.push(("scope".to_string(), scope.to_string()));
        }

        let request = OutboundRequest {
            method: Method::Post,
            url: self.token_url.clone(),
            query: Vec::new(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: Some(RequestBody::Form(fields)),
        };

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| classify_transport(&e).with_operation("token_exchange"))?;

        if !(200..300).contains(&response.status) {
            let message = extract_message(&response.body)
                .unwrap_or_else(|| format!("token endpoint returned HTTP {}", response.status));
            warn!(status = response.status, "OAuth token exchange rejected");
            return Err(GatewayError::Auth(
                Failure::new(format!("token exchange rejected: {}", message))
                    .operation("token_exchange")
                    .status(response.status),
            ));
        }

        let parsed: TokenResponse = serde_json::from_slice(&response.body).map_err(|e| {
            GatewayError::Auth(
                Failure::new(format!("malformed token response: {}", e))
                    .operation("token_exchange"),
            )
        })?;

        if let Some(tt) = &parsed.token_type {
            if !tt.eq_ignore_ascii_case("bearer") {
                return Err(GatewayError::Auth(
                    Failure::new(format!("unsupported token type '{}'", tt))
                        .operation("token_exchange"),
                ));
            }
        }

        let lifetime =
            Duration::from_secs(parsed.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        let now = Instant::now();
        info!(
            lifetime_secs = lifetime.as_secs(),
            scope = %scope,
            "Obtained OAuth access token"
        );
        Ok(CachedToken {
            access_token: parsed.access_token,
            refresh_at: now + lifetime.saturating_sub(effective_margin(lifetime, self.refresh_margin)),
            expires_at: now + lifetime,
        })
    }
}

/// Refresh margin applied to a token of the given lifetime.
///
/// Short-lived tokens (lifetime not above the margin) go stale at half their
/// lifetime instead of immediately.
fn effective_margin(lifetime: Duration, margin: Duration) -> Duration {
    if margin < lifetime {
        margin
    } else {
        lifetime / 2
    }
}
