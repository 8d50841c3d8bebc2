//! Entity model returned by gateway operations.
//!
//! Every value here is a decoded snapshot of backend state. The gateway never
//! mutates one in place; a change is a new backend request followed by a new
//! snapshot.

pub mod requests;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, Result};

pub use requests::{
    ContentUpload, ContentsFilter, DocumentUpdate, NewDocument, NewFolder, NewVersion,
    NewWorkflow, SearchFilters, WorkflowAction,
};

/// Free-form metadata values keyed by field name.
pub type MetadataMap = BTreeMap<String, Value>;

// ============================================================================
// Documents
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    #[serde(default)]
    pub metadata: MetadataMap,
    pub current_version: Option<String>,
    pub folder_id: Option<String>,
}

/// How [`DocumentContent::content`] is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentEncoding {
    #[default]
    Text,
    Base64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentContent {
    pub document_id: String,
    pub content_type: Option<String>,
    pub encoding: ContentEncoding,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub documents: Vec<Document>,
    /// Total matches reported by the backend, which may exceed `documents.len()`.
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub id: String,
    pub deleted: bool,
}

// ============================================================================
// Folders
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    /// `None` for a root folder.
    pub parent_id: Option<String>,
    pub description: Option<String>,
    /// Child ids, only present when the backend materialized them.
    pub document_ids: Option<Vec<String>>,
    pub folder_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderContents {
    pub folder_id: String,
    pub documents: Vec<Document>,
    pub folders: Vec<Folder>,
}

impl FolderContents {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.folders.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderTree {
    pub folder: Folder,
    #[serde(default)]
    pub children: Vec<FolderTree>,
}

impl FolderTree {
    /// Depth of the tree, counting the root as 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(FolderTree::depth).max().unwrap_or(0)
    }

    /// Total folders in the tree, root included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(FolderTree::count).sum::<usize>()
    }
}

// ============================================================================
// Metadata
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Backend type tag, e.g. `string`, `date`, `d:text`.
    pub field_type: String,
    pub required: bool,
    pub validation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSchema {
    pub document_type: String,
    pub fields: Vec<FieldDescriptor>,
}

impl MetadataSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Names in `fields` that this schema does not define, sorted.
    pub fn unknown_fields<'a>(&self, fields: impl IntoIterator<Item = &'a String>) -> Vec<String> {
        let mut unknown: Vec<String> = fields
            .into_iter()
            .filter(|name| !self.has_field(name))
            .cloned()
            .collect();
        unknown.sort();
        unknown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub document_id: String,
    pub document_type: Option<String>,
    pub fields: MetadataMap,
}

// ============================================================================
// Versions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub document_id: String,
    pub version_id: String,
    pub major: bool,
    pub author: Option<String>,
    pub comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionHistory {
    pub document_id: String,
    pub current_version: Option<String>,
    /// Oldest first.
    pub versions: Vec<Version>,
}

impl VersionHistory {
    pub fn contains(&self, version_id: &str) -> bool {
        self.versions.iter().any(|v| v.version_id == version_id)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

// ============================================================================
// Workflows
// ============================================================================

/// Current step of a workflow, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Pending,
    InProgress,
    Approved,
    Rejected,
    Completed,
}

impl WorkflowStep {
    /// Parse a backend status string. Case, spaces, dashes and underscores are ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "pending" | "notstarted" | "created" | "new" => Ok(Self::Pending),
            "inprogress" | "active" | "running" | "started" | "open" => Ok(Self::InProgress),
            "approved" => Ok(Self::Approved),
            "rejected" | "declined" => Ok(Self::Rejected),
            "completed" | "complete" | "done" | "finished" | "closed" => Ok(Self::Completed),
            _ => Err(GatewayError::Decode(format!(
                "unknown workflow status '{}'",
                raw
            ))),
        }
    }

    pub fn accepts_decision(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTransition {
    pub actor: Option<String>,
    pub action: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// Comment for approvals, reason for rejections.
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub document_id: Option<String>,
    pub name: Option<String>,
    pub step: WorkflowStep,
    #[serde(default)]
    pub history: Vec<WorkflowTransition>,
}
