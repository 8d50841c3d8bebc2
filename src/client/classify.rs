//! Maps backend responses and transport failures onto the error taxonomy.
//!
//! Status codes decide the variant; the body only refines it (409 bodies that
//! talk about non-empty folders become [`GatewayError::FolderNotEmpty`]) and
//! supplies the human-readable message.

use serde_json::Value;

use crate::error::{Failure, GatewayError};

use super::transport::{RawResponse, TransportError, TransportErrorKind};

/// Longest backend message carried into an error before truncation.
const MAX_MESSAGE_CHARS: usize = 500;

/// Classify a non-success response.
///
/// Returns `None` for 2xx/3xx statuses.
pub fn classify_response(response: &RawResponse) -> Option<GatewayError> {
    let status = response.status;
    if status < 400 {
        return None;
    }

    let message = extract_message(&response.body)
        .unwrap_or_else(|| format!("backend returned HTTP {}", status));
    let failure = Failure::new(message.clone()).status(status);

    let err = match status {
        401 | 403 => GatewayError::Auth(failure),
        404 | 410 => GatewayError::NotFound(failure),
        409 => {
            let lower = message.to_lowercase();
            if contains_any(
                &lower,
                &[
                    "not empty",
                    "not_empty",
                    "notempty",
                    "has children",
                    "contains documents",
                    "contains children",
                ],
            ) {
                GatewayError::FolderNotEmpty(failure)
            } else {
                GatewayError::Conflict(failure)
            }
        }
        429 => GatewayError::RateLimited(failure),
        500..=599 => GatewayError::Transient(failure),
        _ => GatewayError::BackendRejected(failure),
    };
    Some(err)
}

/// Classify a failure where no HTTP status was observed.
pub fn classify_transport(err: &TransportError) -> GatewayError {
    let failure = Failure::new(err.message.clone());
    match err.kind {
        TransportErrorKind::Connect => GatewayError::Unreachable(failure),
        TransportErrorKind::Timeout | TransportErrorKind::Other => {
            GatewayError::Transient(failure)
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"error": "..."}`, `{"message": "..."}`,
/// `{"error": {"message": "..."}}` and `{"error": {"briefSummary": "..."}}`;
/// falls back to the raw text when the body is not JSON.
pub fn extract_message(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let message = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => message_from_json(&value).unwrap_or_else(|| trimmed.to_string()),
        Err(_) => trimmed.to_string(),
    };
    Some(truncate(&message))
}

fn message_from_json(value: &Value) -> Option<String> {
    match value.get("error") {
        Some(Value::String(s)) => return Some(s.clone()),
        Some(obj @ Value::Object(_)) => {
            for key in ["message", "briefSummary", "errorKey"] {
                if let Some(s) = obj.get(key).and_then(Value::as_str) {
                    return Some(s.to_string());
                }
            }
        }
        _ => {}
    }
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message.to_string();
    }
    let mut out: String = message.chars().take(MAX_MESSAGE_CHARS).collect();
    out.push_str("...");
    out
}

fn contains_any(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| haystack.contains(p))
}
