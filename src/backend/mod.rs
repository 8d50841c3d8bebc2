//! Backend adapters: per-product translation of domain operations.
//!
//! Each ECM product exposes the same capabilities under a different REST
//! shape. An [`EcmBackend`] turns one domain operation into one or more
//! pipeline calls and decodes the replies into the entity model. Input
//! validation, caching and state checks live above this layer, in
//! [`crate::ops`].

pub mod alfresco;
pub mod decode;
pub mod generic;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{RequestPipeline, RequestSpec, ResponseEnvelope};
use crate::domain::{
    ContentEncoding, ContentUpload, ContentsFilter, Document, DocumentContent, DocumentMetadata,
    DocumentUpdate, Folder, FolderContents, FolderTree, MetadataMap, MetadataSchema, NewDocument,
    NewFolder, NewVersion, NewWorkflow, SearchFilters, SearchResults, Version, VersionHistory,
    Workflow, WorkflowAction,
};
use crate::error::{GatewayError, Result};

pub use alfresco::AlfrescoBackend;
pub use generic::GenericRestBackend;

// ============================================================================
// Backend profile
// ============================================================================

/// Which REST dialect the backend speaks. Selected in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendProfile {
    /// Plain `/documents`, `/folders`, `/workflows` resource API.
    #[default]
    Generic,
    /// Alfresco Content Services public REST API (v1).
    Alfresco,
}

impl fmt::Display for BackendProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => f.write_str("generic"),
            Self::Alfresco => f.write_str("alfresco"),
        }
    }
}

impl FromStr for BackendProfile {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" | "rest" => Ok(Self::Generic),
            "alfresco" => Ok(Self::Alfresco),
            other => Err(GatewayError::Config(format!(
                "unknown backend profile '{}' (expected generic or alfresco)",
                other
            ))),
        }
    }
}

/// Build the adapter for `profile` on top of `pipeline`.
pub fn build_backend(
    profile: BackendProfile,
    pipeline: Arc<RequestPipeline>,
) -> Arc<dyn EcmBackend> {
    match profile {
        BackendProfile::Generic => Arc::new(GenericRestBackend::new(pipeline)),
        BackendProfile::Alfresco => Arc::new(AlfrescoBackend::new(pipeline)),
    }
}

// ============================================================================
// Backend trait
// ============================================================================

/// Translation of domain operations into backend calls.
#[async_trait]
pub trait EcmBackend: Send + Sync {
    fn profile(&self) -> BackendProfile;

    // Documents
    async fn create_document(&self, doc: &NewDocument) -> Result<Document>;
    async fn get_document(&self, id: &str) -> Result<Document>;
    async fn update_document(&self, id: &str, update: &DocumentUpdate) -> Result<Document>;
    async fn delete_document(&self, id: &str) -> Result<()>;
    async fn upload_content(&self, id: &str, upload: &ContentUpload) -> Result<Document>;
    async fn download_content(&self, id: &str) -> Result<DocumentContent>;

    // Search
    async fn search(&self, query: &str, limit: u32, offset: u32) -> Result<SearchResults>;
    async fn advanced_search(&self, filters: &SearchFilters, limit: u32) -> Result<SearchResults>;
    async fn recent_documents(&self, limit: u32, folder_id: Option<&str>)
        -> Result<Vec<Document>>;

    // Folders
    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder>;
    async fn get_folder(&self, id: &str) -> Result<Folder>;
    async fn folder_contents(&self, id: &str, filter: ContentsFilter) -> Result<FolderContents>;
    async fn move_document(&self, id: &str, target_folder_id: &str) -> Result<Document>;
    async fn folder_tree(&self, root: Option<&str>, max_depth: u32) -> Result<FolderTree>;
    async fn delete_folder(&self, id: &str, recursive: bool) -> Result<()>;

    // Metadata
    async fn get_metadata(&self, id: &str) -> Result<DocumentMetadata>;
    async fn update_metadata(&self, id: &str, fields: &MetadataMap) -> Result<DocumentMetadata>;
    async fn metadata_schema(&self, document_type: &str) -> Result<MetadataSchema>;

    // Versions
    async fn versions(&self, id: &str) -> Result<VersionHistory>;
    async fn create_version(&self, id: &str, version: &NewVersion) -> Result<Version>;
    async fn restore_version(&self, id: &str, version_id: &str) -> Result<()>;

    // Workflows
    async fn start_workflow(&self, workflow: &NewWorkflow) -> Result<Workflow>;
    async fn workflow(&self, id: &str) -> Result<Workflow>;
    async fn workflow_action(&self, id: &str, action: &WorkflowAction) -> Result<()>;
}

// ============================================================================
// Shared helpers
// ============================================================================

/// `id` as a single URL path segment. Everything outside the unreserved set is escaped.
pub(crate) fn segment(id: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(id)
}

/// Execute `spec` and parse the body as JSON.
pub(crate) async fn fetch_json(pipeline: &RequestPipeline, spec: RequestSpec) -> Result<Value> {
    let envelope = pipeline.execute(&spec).await?;
    envelope
        .json()
        .map_err(|e| GatewayError::Decode(format!("{}: {}", spec.operation(), e)))
}

/// Execute `spec`, discarding the body.
pub(crate) async fn fetch_unit(pipeline: &RequestPipeline, spec: RequestSpec) -> Result<()> {
    pipeline.execute(&spec).await.map(|_| ())
}

/// Execute `spec` and return the raw envelope.
pub(crate) async fn fetch_raw(
    pipeline: &RequestPipeline,
    spec: RequestSpec,
) -> Result<ResponseEnvelope> {
    pipeline.execute(&spec).await
}

/// Turn downloaded bytes into [`DocumentContent`].
///
/// Text-like content types that are valid UTF-8 come back as text; anything
/// else is base64-encoded.
pub(crate) fn content_from_bytes(
    document_id: &str,
    content_type: Option<String>,
    bytes: Vec<u8>,
) -> DocumentContent {
    let textual = content_type.as_deref().is_none_or(is_textual);
    match (textual, String::from_utf8(bytes)) {
        (true, Ok(text)) => DocumentContent {
            document_id: document_id.to_string(),
            content_type,
            encoding: ContentEncoding::Text,
            content: text,
        },
        (_, Ok(text)) => DocumentContent {
            document_id: document_id.to_string(),
            content_type,
            encoding: ContentEncoding::Base64,
            content: general_purpose::STANDARD.encode(text.as_bytes()),
        },
        (_, Err(e)) => DocumentContent {
            document_id: document_id.to_string(),
            content_type,
            encoding: ContentEncoding::Base64,
            content: general_purpose::STANDARD.encode(e.into_bytes()),
        },
    }
}

fn is_textual(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.starts_with("text/") || ct.contains("json") || ct.contains("xml") || ct.contains("yaml")
}

/// Drop tree levels below `max_depth` (root is depth 1).
pub(crate) fn prune_tree(mut tree: FolderTree, max_depth: u32) -> FolderTree {
    if max_depth <= 1 {
        tree.children.clear();
    } else {
        tree.children = tree
            .children
            .into_iter()
            .map(|child| prune_tree(child, max_depth - 1))
            .collect();
    }
    tree
}
