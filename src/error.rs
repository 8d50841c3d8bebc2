//! Error types for the ECM gateway
//!
//! Every failure the gateway can surface to a caller is a [`GatewayError`].
//! Each variant maps onto a stable [`ErrorKind`] tag so the tool-dispatch
//! front end can act on the category without string matching. Uses
//! `thiserror` for the `Display` and `Error` implementations.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

// ============================================================================
// Error Kind
// ============================================================================

/// Stable classification of a gateway failure.
///
/// This is the tag callers see; it never changes for a given variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller input violates a stated constraint. Never retried.
    InvalidArgument,
    /// Referenced entity does not exist on the backend. Never retried.
    NotFound,
    /// Credential invalid or refresh failed.
    AuthError,
    /// Backend rejected the call because of its own rate limits.
    RateLimited,
    /// Network failure, timeout or 5xx.
    TransientBackendError,
    /// Operation not valid for the entity's current state.
    ConflictOrInvalidState,
    /// Backend could not be reached at all.
    Unreachable,
    /// Transient failures persisted past the retry budget.
    RetriesExhausted,
    /// Non-transient backend rejection surfaced verbatim (400, 422, ...).
    BackendRejected,
    /// Gateway configuration is invalid.
    Config,
    /// Backend payload could not be decoded into the entity model.
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::AuthError => "auth_error",
            Self::RateLimited => "rate_limited",
            Self::TransientBackendError => "transient_backend_error",
            Self::ConflictOrInvalidState => "conflict_or_invalid_state",
            Self::Unreachable => "unreachable",
            Self::RetriesExhausted => "retries_exhausted",
            Self::BackendRejected => "backend_rejected",
            Self::Config => "config",
            Self::Decode => "decode",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Failure context
// ============================================================================

/// Context attached to a backend-originated failure.
///
/// Carries enough information for a caller to act on the failure: which
/// operation failed, against which entity, and what the backend said.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Failure {
    /// Human-readable description (backend message when one was provided).
    pub message: String,
    /// Operation name, e.g. `get_document`.
    pub operation: Option<String>,
    /// Entity the operation targeted.
    pub entity_id: Option<String>,
    /// HTTP status returned by the backend, if any response was received.
    pub status: Option<u16>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        let mut parts = Vec::new();
        if let Some(op) = &self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(id) = &self.entity_id {
            parts.push(format!("entity={}", id));
        }
        if let Some(status) = self.status {
            parts.push(format!("status={}", status));
        }
        if !parts.is_empty() {
            write!(f, " ({})", parts.join(", "))?;
        }
        Ok(())
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for gateway operations.
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// Caller input violates a stated constraint.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(Failure),

    /// Credential rejected, or the token exchange failed.
    #[error("Authentication error: {0}")]
    Auth(Failure),

    /// Backend answered 429.
    #[error("Rate limited: {0}")]
    RateLimited(Failure),

    /// Timeout, dropped connection or 5xx.
    #[error("Transient backend error: {0}")]
    Transient(Failure),

    /// Connection could not be established.
    #[error("Backend unreachable: {0}")]
    Unreachable(Failure),

    /// Entity is not in a state that permits the operation.
    #[error("Invalid state: {0}")]
    InvalidState(Failure),

    /// Non-recursive delete of a folder that still has children.
    #[error("Folder not empty: {0}")]
    FolderNotEmpty(Failure),

    /// Backend reported a conflicting concurrent change (409).
    #[error("Conflict: {0}")]
    Conflict(Failure),

    /// Non-transient backend rejection, surfaced verbatim.
    #[error("Backend rejected request: {0}")]
    BackendRejected(Failure),

    /// Transient failures persisted for the whole retry budget.
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<GatewayError>,
    },

    /// A multi-step operation failed after some steps were applied.
    #[error("Partially completed ({completed}): {source}")]
    PartialCompletion {
        completed: String,
        source: Box<GatewayError>,
    },

    /// Configuration errors (invalid values, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend payload did not match the expected entity shape.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// The stable tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Auth(_) => ErrorKind::AuthError,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::Transient(_) => ErrorKind::TransientBackendError,
            Self::Unreachable(_) => ErrorKind::Unreachable,
            Self::InvalidState(_) | Self::FolderNotEmpty(_) | Self::Conflict(_) => {
                ErrorKind::ConflictOrInvalidState
            }
            Self::BackendRejected(_) => ErrorKind::BackendRejected,
            Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            Self::PartialCompletion { source, .. } => source.kind(),
            Self::Config(_) => ErrorKind::Config,
            Self::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Finer-grained code under [`ErrorKind::ConflictOrInvalidState`] and friends.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidState(_) => "invalid_state",
            Self::FolderNotEmpty(_) => "folder_not_empty",
            Self::Conflict(_) => "conflict",
            Self::PartialCompletion { .. } => "partial_completion",
            Self::RetriesExhausted { last, .. } => last.code(),
            _ => "",
        }
    }

    /// Returns `true` for failures the retry policy may retry.
    ///
    /// Retryable errors: RateLimited, Transient, Unreachable.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Transient(_) | Self::Unreachable(_)
        )
    }

    /// HTTP status associated with this error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RetriesExhausted { last, .. } => last.status(),
            Self::PartialCompletion { source, .. } => source.status(),
            other => other.failure().and_then(|f| f.status),
        }
    }

    /// The backend failure context, when this error carries one.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::NotFound(f)
            | Self::Auth(f)
            | Self::RateLimited(f)
            | Self::Transient(f)
            | Self::Unreachable(f)
            | Self::InvalidState(f)
            | Self::FolderNotEmpty(f)
            | Self::Conflict(f)
            | Self::BackendRejected(f) => Some(f),
            Self::RetriesExhausted { last, .. } => last.failure(),
            Self::PartialCompletion { source, .. } => source.failure(),
            _ => None,
        }
    }

    fn failure_mut(&mut self) -> Option<&mut Failure> {
        match self {
            Self::NotFound(f)
            | Self::Auth(f)
            | Self::RateLimited(f)
            | Self::Transient(f)
            | Self::Unreachable(f)
            | Self::InvalidState(f)
            | Self::FolderNotEmpty(f)
            | Self::Conflict(f)
            | Self::BackendRejected(f) => Some(f),
            Self::RetriesExhausted { last, .. } => last.failure_mut(),
            Self::PartialCompletion { source, .. } => source.failure_mut(),
            _ => None,
        }
    }

    /// Fill in the operation name if the error does not carry one yet.
    pub fn with_operation(mut self, operation: &str) -> Self {
        if let Some(f) = self.failure_mut() {
            if f.operation.is_none() {
                f.operation = Some(operation.to_string());
            }
        }
        self
    }

    /// Fill in the entity id if the error does not carry one yet.
    pub fn with_entity(mut self, entity_id: &str) -> Self {
        if let Some(f) = self.failure_mut() {
            if f.entity_id.is_none() {
                f.entity_id = Some(entity_id.to_string());
            }
        }
        self
    }

    /// Tagged representation handed back across the front-end boundary.
    pub fn to_tagged(&self) -> Value {
        let failure = self.failure();
        let attempts = match self {
            Self::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        };
        json!({
            "error": {
                "kind": self.kind(),
                "code": self.code(),
                "message": self.to_string(),
                "operation": failure.and_then(|f| f.operation.clone()),
                "entity_id": failure.and_then(|f| f.entity_id.clone()),
                "status": self.status(),
                "attempts": attempts,
            }
        })
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

/// A specialized `Result` type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
