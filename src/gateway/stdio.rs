//! Newline-delimited JSON protocol over a byte stream.
//!
//! Each input line is one request:
//!
//! ```text
//! {"id": 1, "operation": "get_document", "arguments": {"document_id": "DOC-1"}}
//! {"id": 2, "resource": "ecm://folders/FLD-1/tree"}
//! ```
//!
//! Each request produces exactly one output line, `{"id": .., "result": ..}`
//! or `{"id": .., "error": {..}}`. Requests run concurrently and replies are
//! written as they complete, so callers match them by `id`.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use super::Gateway;
use crate::error::{GatewayError, Result};

/// One protocol request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdioRequest {
    /// Echoed back in the response.
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub operation: Option<String>,
    /// `ecm://` URI to read instead of running an operation.
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub arguments: Value,
}

/// One protocol response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdioResponse {
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl StdioResponse {
    fn from_result(id: Value, result: Result<Value>) -> Self {
        match result {
            Ok(value) => Self {
                id,
                result: Some(value),
                error: None,
            },
            Err(e) => {
                let mut tagged = e.to_tagged();
                Self {
                    id,
                    result: None,
                    error: Some(tagged["error"].take()),
                }
            }
        }
    }
}

/// Handle one request line.
pub async fn handle_line(gateway: &Gateway, line: &str) -> StdioResponse {
    let request: StdioRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            warn!(component = "stdio", error = %e, "Malformed request line");
            return StdioResponse::from_result(
                Value::Null,
                Err(GatewayError::InvalidArgument(format!(
                    "malformed request: {}",
                    e
                ))),
            );
        }
    };

    let result = match (&request.operation, &request.resource) {
        (Some(operation), None) => gateway.call(operation, request.arguments).await,
        (None, Some(uri)) => gateway.read_resource(uri).await,
        _ => Err(GatewayError::InvalidArgument(
            "request needs exactly one of 'operation' or 'resource'".into(),
        )),
    };
    StdioResponse::from_result(request.id, result)
}

/// Requests read ahead of the slowest outstanding reply.
pub const MAX_IN_FLIGHT: usize = 64;

/// Serve requests from `reader` until end of input and every reply is
/// written. Returns the number of requests answered. Blank lines are skipped.
pub async fn serve<R, W>(gateway: &Gateway, reader: R, mut writer: W) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut pending = FuturesUnordered::new();
    let mut input_open = true;
    let mut answered = 0;

    while input_open || !pending.is_empty() {
        tokio::select! {
            line = lines.next_line(), if input_open && pending.len() < MAX_IN_FLIGHT => {
                match line? {
                    Some(line) => {
                        let line = line.trim().to_string();
                        if !line.is_empty() {
                            pending.push(async move { handle_line(gateway, &line).await });
                        }
                    }
                    None => input_open = false,
                }
            }
            Some(response) = pending.next(), if !pending.is_empty() => {
                write_response(&mut writer, &response).await?;
                answered += 1;
            }
            else => break,
        }
    }

    crate::log_component!(debug, "stdio", "Input closed", answered = answered);
    Ok(answered)
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &StdioResponse,
) -> std::io::Result<()> {
    let mut out = serde_json::to_string(response)?;
    out.push('\n');
    writer.write_all(out.as_bytes()).await?;
    writer.flush().await
}
