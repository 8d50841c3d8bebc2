//! Caller-supplied inputs for mutating and query operations.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ContentEncoding, MetadataMap};
use crate::error::{GatewayError, Result};

fn default_mime_type() -> String {
    "text/plain".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: ContentEncoding,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default)]
    pub metadata: MetadataMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    /// Replacement text content.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: Option<MetadataMap>,
}

impl DocumentUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.metadata.as_ref().is_none_or(|m| m.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUpload {
    pub content: String,
    #[serde(default)]
    pub encoding: ContentEncoding,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Record the upload as a new version rather than overwriting in place.
    #[serde(default = "default_true")]
    pub create_version: bool,
}

impl ContentUpload {
    /// Raw bytes of the upload.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        decode_content(&self.content, self.encoding)
    }
}

/// Decode caller content according to `encoding`.
pub fn decode_content(content: &str, encoding: ContentEncoding) -> Result<Vec<u8>> {
    use base64::{engine::general_purpose, Engine as _};
    match encoding {
        ContentEncoding::Text => Ok(content.as_bytes().to_vec()),
        ContentEncoding::Base64 => general_purpose::STANDARD
            .decode(content.trim())
            .map_err(|e| GatewayError::InvalidArgument(format!("content is not valid base64: {}", e))),
    }
}

/// Structured search criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub mime_types: Vec<String>,
    #[serde(default)]
    pub created_after: Option<String>,
    #[serde(default)]
    pub created_before: Option<String>,
    #[serde(default)]
    pub modified_after: Option<String>,
    #[serde(default)]
    pub modified_before: Option<String>,
    #[serde(default)]
    pub metadata: MetadataMap,
    #[serde(default)]
    pub max_results: Option<u32>,
}

impl SearchFilters {
    /// True when no criterion would narrow the search.
    pub fn is_empty(&self) -> bool {
        self.query.as_deref().is_none_or(|q| q.trim().is_empty())
            && self.folder_id.as_deref().is_none_or(|f| f.trim().is_empty())
            && self.mime_types.is_empty()
            && self.created_after.is_none()
            && self.created_before.is_none()
            && self.modified_after.is_none()
            && self.modified_before.is_none()
            && self.metadata.is_empty()
    }

    /// Check date bounds are RFC 3339 timestamps or `YYYY-MM-DD` dates.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("created_after", &self.created_after),
            ("created_before", &self.created_before),
            ("modified_after", &self.modified_after),
            ("modified_before", &self.modified_before),
        ] {
            if let Some(raw) = value {
                if !is_valid_date(raw) {
                    return Err(GatewayError::InvalidArgument(format!(
                        "{} must be an RFC 3339 timestamp or YYYY-MM-DD date, got '{}'",
                        name, raw
                    )));
                }
            }
        }
        Ok(())
    }
}

fn is_valid_date(raw: &str) -> bool {
    DateTime::parse_from_rfc3339(raw).is_ok() || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFolder {
    pub name: String,
    #[serde(default, alias = "parent_folder_id")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Which children `list_folder_contents` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentsFilter {
    #[serde(default = "default_true")]
    pub include_documents: bool,
    #[serde(default = "default_true")]
    pub include_subfolders: bool,
}

impl Default for ContentsFilter {
    fn default() -> Self {
        Self {
            include_documents: true,
            include_subfolders: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVersion {
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub major: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkflow {
    pub document_id: String,
    pub workflow_name: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, Value>,
}

/// A decision on an in-progress workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorkflowAction {
    Approve { comment: Option<String> },
    Reject { reason: String },
}

impl WorkflowAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
        }
    }

    /// Backend request body for this decision.
    pub fn to_body(&self) -> Value {
        match self {
            Self::Approve { comment } => {
                let mut body = serde_json::json!({ "action": "approve" });
                if let Some(c) = comment {
                    body["comment"] = Value::String(c.clone());
                }
                body
            }
            Self::Reject { reason } => serde_json::json!({ "action": "reject", "reason": reason }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_document_defaults() {
        let doc: NewDocument = serde_json::from_value(json!({"title": "Q3 Report"})).unwrap();
        assert_eq!(doc.mime_type, "text/plain");
        assert_eq!(doc.encoding, ContentEncoding::Text);
        assert!(doc.content.is_none());
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn test_upload_defaults_to_new_version() {
        let up: ContentUpload = serde_json::from_value(json!({"content": "hello"})).unwrap();
        assert!(up.create_version);
        assert_eq!(up.bytes().unwrap(), b"hello");
    }

    #[test]
    fn test_base64_content() {
        let up: ContentUpload =
            serde_json::from_value(json!({"content": "aGVsbG8=", "encoding": "base64"})).unwrap();
        assert_eq!(up.bytes().unwrap(), b"hello");

        let bad = ContentUpload {
            content: "***".into(),
            ..up
        };
        assert!(matches!(bad.bytes(), Err(GatewayError::InvalidArgument(_))));
    }

    #[test]
    fn test_search_filters_empty() {
        assert!(SearchFilters::default().is_empty());
        let blank = SearchFilters {
            query: Some("   ".into()),
            ..Default::default()
        };
        assert!(blank.is_empty());
        let typed = SearchFilters {
            mime_types: vec!["application/pdf".into()],
            ..Default::default()
        };
        assert!(!typed.is_empty());
    }

    #[test]
    fn test_search_filter_dates() {
        let ok = SearchFilters {
            created_after: Some("2024-01-01".into()),
            modified_before: Some("2024-06-30T12:00:00Z".into()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad = SearchFilters {
            created_after: Some("last tuesday".into()),
            ..Default::default()
        };
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("created_after"));
    }

    #[test]
    fn test_contents_filter_defaults() {
        let f: ContentsFilter = serde_json::from_value(json!({})).unwrap();
        assert!(f.include_documents && f.include_subfolders);
        let f: ContentsFilter =
            serde_json::from_value(json!({"include_documents": false})).unwrap();
        assert!(!f.include_documents && f.include_subfolders);
    }

    #[test]
    fn test_workflow_action_bodies() {
        let approve = WorkflowAction::Approve { comment: None };
        assert_eq!(approve.to_body(), json!({"action": "approve"}));
        let reject = WorkflowAction::Reject {
            reason: "missing signature".into(),
        };
        assert_eq!(
            reject.to_body(),
            json!({"action": "reject", "reason": "missing signature"})
        );
        assert_eq!(reject.name(), "reject");
    }

    #[test]
    fn test_document_update_empty() {
        assert!(DocumentUpdate::default().is_empty());
        let update = DocumentUpdate {
            title: Some("New".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
