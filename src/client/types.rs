//! Request and response types for the request pipeline.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// HTTP method of a backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether a call with this method is idempotent unless told otherwise.
    ///
    /// PATCH is treated as idempotent because every update the gateway issues
    /// sets fields to absolute values.
    pub fn idempotent_by_default(&self) -> bool {
        !matches!(self, Self::Post)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of an outbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
    Bytes {
        content_type: String,
        data: Vec<u8>,
    },
}

/// An immutable description of one logical backend call.
///
/// Built once by the operation mapper and handed to
/// [`RequestPipeline::execute`](super::RequestPipeline::execute), which may
/// send it several times.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    operation: String,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<RequestBody>,
    scope: Option<String>,
    idempotent: bool,
    entity_id: Option<String>,
    idempotency_key: Option<String>,
}

impl RequestSpec {
    /// Create a request for `operation` against `path` (relative to the backend base URL).
    pub fn new(operation: &str, method: Method, path: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            scope: None,
            idempotent: method.idempotent_by_default(),
            entity_id: None,
            idempotency_key: None,
        }
    }

    pub fn get(operation: &str, path: impl Into<String>) -> Self {
        Self::new(operation, Method::Get, path)
    }

    pub fn post(operation: &str, path: impl Into<String>) -> Self {
        Self::new(operation, Method::Post, path)
    }

    pub fn put(operation: &str, path: impl Into<String>) -> Self {
        Self::new(operation, Method::Put, path)
    }

    pub fn patch(operation: &str, path: impl Into<String>) -> Self {
        Self::new(operation, Method::Patch, path)
    }

    pub fn delete(operation: &str, path: impl Into<String>) -> Self {
        Self::new(operation, Method::Delete, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn bytes(mut self, content_type: &str, data: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Bytes {
            content_type: content_type.to_string(),
            data,
        });
        self
    }

    /// Require a specific OAuth scope for this call.
    pub fn scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    /// Override the method's default idempotency.
    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    /// Entity this call targets, for error context and events.
    pub fn entity(mut self, entity_id: &str) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    /// Mark this call as a non-idempotent create carrying a fresh `Idempotency-Key`.
    pub fn create(mut self) -> Self {
        self.idempotent = false;
        self.idempotency_key = Some(uuid::Uuid::new_v4().to_string());
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn required_scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }
}

/// Coarse classification of a backend attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Success,
    ClientError,
    ServerError,
    TransportFailure,
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=399 => Self::Success,
            400..=499 => Self::ClientError,
            _ => Self::ServerError,
        }
    }
}

/// Decoded outcome of a successful [`RequestSpec`] execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub class: StatusClass,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Total time across all attempts.
    pub latency: Duration,
    pub attempts: u32,
}

impl ResponseEnvelope {
    /// Parse the body as JSON. An empty body decodes to `Value::Null`.
    pub fn json(&self) -> Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| GatewayError::Decode(format!("invalid JSON from backend: {}", e)))
    }

    /// Whether the response advertises a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("json"))
    }
}
