//! Adapter for the plain resource-style ECM REST API.
//!
//! Paths: `/documents`, `/documents/{id}/content`, `/search`,
//! `/search/advanced`, `/folders`, `/folders/tree`, `/metadata/schemas/{type}`,
//! `/documents/{id}/versions`, `/workflows`. Bodies use camelCase keys.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::decode::{
    bool_field, id_list_field, list_field, map_field, parse_time, required_str, str_field,
    time_field, u64_field, user_field,
};
use super::{
    content_from_bytes, fetch_json, fetch_raw, fetch_unit, prune_tree, segment, BackendProfile,
    EcmBackend,
};
use crate::client::{RequestPipeline, RequestSpec};
use crate::domain::{
    ContentEncoding, ContentUpload, ContentsFilter, Document, DocumentContent, DocumentMetadata,
    DocumentUpdate, FieldDescriptor, Folder, FolderContents, FolderTree, MetadataMap,
    MetadataSchema, NewDocument, NewFolder, NewVersion, NewWorkflow, SearchFilters,
    SearchResults, Version, VersionHistory, Workflow, WorkflowAction, WorkflowStep,
    WorkflowTransition,
};
use crate::error::{GatewayError, Result};

/// Resource-style REST adapter.
#[derive(Debug, Clone)]
pub struct GenericRestBackend {
    pipeline: Arc<RequestPipeline>,
}

impl GenericRestBackend {
    pub fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }

    /// Decode a document from a mutation reply, or re-read it when the reply is only an ack.
    async fn document_or_refetch(&self, reply: Value, id: &str) -> Result<Document> {
        if str_field(&reply, &["id", "documentId"]).is_some() {
            decode_document(&reply)
        } else {
            self.get_document(id).await
        }
    }
}

// ============================================================================
// Decoders
// ============================================================================

/// Unwrap `{"document": {...}}`-style envelopes.
fn unwrap<'a>(value: &'a Value, key: &str) -> &'a Value {
    match value.get(key) {
        Some(inner @ Value::Object(_)) => inner,
        _ => value,
    }
}

pub(crate) fn decode_document(value: &Value) -> Result<Document> {
    let value = unwrap(value, "document");
    Ok(Document {
        id: required_str(value, &["id", "documentId"], "document")?,
        title: str_field(value, &["title", "name"]).unwrap_or_default(),
        size: u64_field(value, &["size", "sizeInBytes", "contentLength"]),
        content_type: str_field(value, &["mimeType", "contentType", "mime_type"]),
        created_at: time_field(value, &["createdDate", "createdAt", "created"]),
        modified_at: time_field(value, &["modifiedDate", "modifiedAt", "modified"]),
        author: user_field(value, &["author", "createdBy", "owner"]),
        metadata: map_field(value, &["metadata", "properties"]),
        current_version: str_field(value, &["currentVersion", "versionId", "version"]),
        folder_id: str_field(value, &["folderId", "parentId"]),
    })
}

pub(crate) fn decode_documents(items: &[Value]) -> Result<Vec<Document>> {
    items.iter().map(decode_document).collect()
}

pub(crate) fn decode_folder(value: &Value) -> Result<Folder> {
    let value = unwrap(value, "folder");
    Ok(Folder {
        id: required_str(value, &["id", "folderId"], "folder")?,
        name: str_field(value, &["name", "title"]).unwrap_or_default(),
        parent_id: str_field(value, &["parentId", "parentFolderId"]),
        description: str_field(value, &["description"]),
        document_ids: id_list_field(value, &["documentIds", "documents"]),
        folder_ids: id_list_field(value, &["folderIds", "subfolderIds"]),
    })
}

fn decode_tree(value: &Value) -> Result<FolderTree> {
    let value = unwrap(value, "tree");
    let folder = decode_folder(value)?;
    let children = list_field_strict(value, &["children", "subfolders", "folders"])
        .iter()
        .map(decode_tree)
        .collect::<Result<Vec<_>>>()?;
    Ok(FolderTree { folder, children })
}

/// Like [`list_field`] but never treats the value itself as the list.
fn list_field_strict<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    if value.is_array() {
        return &[];
    }
    list_field(value, keys)
}

fn decode_search(value: &Value) -> Result<SearchResults> {
    let documents = decode_documents(list_field(value, &["results", "documents", "items"]))?;
    let total = u64_field(value, &["total", "totalCount", "totalResults"])
        .unwrap_or(documents.len() as u64);
    Ok(SearchResults { documents, total })
}

fn decode_metadata(value: &Value, document_id: &str) -> DocumentMetadata {
    let mut fields = map_field(value, &["metadata", "fields", "properties"]);
    if fields.is_empty() {
        if let Value::Object(obj) = value {
            fields = obj
                .iter()
                .filter(|(k, _)| !matches!(k.as_str(), "documentId" | "documentType" | "type"))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
    }
    DocumentMetadata {
        document_id: str_field(value, &["documentId", "id"]).unwrap_or_else(|| document_id.to_string()),
        document_type: str_field(value, &["documentType", "type"]),
        fields,
    }
}

fn decode_field(name: Option<&str>, value: &Value) -> Option<FieldDescriptor> {
    let name = name
        .map(str::to_string)
        .or_else(|| str_field(value, &["name", "id"]))?;
    Some(FieldDescriptor {
        name,
        field_type: str_field(value, &["type", "dataType", "fieldType"])
            .unwrap_or_else(|| "string".to_string()),
        required: bool_field(value, &["required", "mandatory", "isMandatory"]).unwrap_or(false),
        validation: str_field(value, &["validation", "pattern", "constraint"]),
    })
}

fn decode_schema(value: &Value, document_type: &str) -> MetadataSchema {
    let fields = match value.get("fields") {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(name, spec)| decode_field(Some(name), spec))
            .collect(),
        _ => list_field(value, &["fields", "properties"])
            .iter()
            .filter_map(|spec| decode_field(None, spec))
            .collect(),
    };
    MetadataSchema {
        document_type: str_field(value, &["documentType", "type", "id"])
            .unwrap_or_else(|| document_type.to_string()),
        fields,
    }
}

pub(crate) fn decode_version(value: &Value, document_id: &str) -> Result<Version> {
    let value = unwrap(value, "version");
    let version_id = required_str(value, &["versionId", "id", "version", "label"], "version")?;
    let major = bool_field(value, &["major", "isMajor", "majorVersion"])
        .unwrap_or_else(|| version_id.ends_with(".0"));
    Ok(Version {
        document_id: str_field(value, &["documentId"]).unwrap_or_else(|| document_id.to_string()),
        version_id,
        major,
        author: user_field(value, &["author", "createdBy", "modifiedByUser"]),
        comment: str_field(value, &["comment", "versionComment"]),
        created_at: time_field(value, &["createdDate", "createdAt", "modifiedAt"]),
    })
}

/// Versions ordered oldest first.
///
/// When every version carries a timestamp the list is sorted by it;
/// otherwise the backend order is kept.
pub(crate) fn order_versions(mut versions: Vec<Version>) -> Vec<Version> {
    if versions.iter().all(|v| v.created_at.is_some()) {
        versions.sort_by_key(|v| v.created_at);
    }
    versions
}

fn decode_history(value: &Value, document_id: &str) -> Result<VersionHistory> {
    let versions = list_field(value, &["versions", "items", "results"])
        .iter()
        .map(|v| decode_version(v, document_id))
        .collect::<Result<Vec<_>>>()?;
    let versions = order_versions(versions);
    let current_version = str_field(value, &["currentVersion", "currentVersionId"])
        .or_else(|| versions.last().map(|v| v.version_id.clone()));
    Ok(VersionHistory {
        document_id: document_id.to_string(),
        current_version,
        versions,
    })
}

fn decode_transition(value: &Value) -> Option<WorkflowTransition> {
    Some(WorkflowTransition {
        actor: user_field(value, &["actor", "user", "performedBy"]),
        action: str_field(value, &["action", "type", "event"])?,
        timestamp: ["timestamp", "date", "createdAt"]
            .iter()
            .find_map(|k| value.get(*k).and_then(parse_time)),
        comment: str_field(value, &["comment", "reason"]),
    })
}

pub(crate) fn decode_workflow(value: &Value) -> Result<Workflow> {
    let value = unwrap(value, "workflow");
    let raw_step = required_str(value, &["status", "state", "step", "currentStep"], "workflow")?;
    Ok(Workflow {
        id: required_str(value, &["id", "workflowId", "processId"], "workflow")?,
        document_id: str_field(value, &["documentId"]),
        name: str_field(value, &["workflowName", "name"]),
        step: WorkflowStep::parse(&raw_step)?,
        history: list_field_strict(value, &["history", "transitions", "events"])
            .iter()
            .filter_map(decode_transition)
            .collect(),
    })
}

fn encoding_name(encoding: ContentEncoding) -> &'static str {
    match encoding {
        ContentEncoding::Text => "text",
        ContentEncoding::Base64 => "base64",
    }
}

// ============================================================================
// Adapter
// ============================================================================

#[async_trait]
impl EcmBackend for GenericRestBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile::Generic
    }

    async fn create_document(&self, doc: &NewDocument) -> Result<Document> {
        let mut body = json!({
            "title": doc.title,
            "content": doc.content.clone().unwrap_or_default(),
            "mimeType": doc.mime_type,
        });
        if doc.encoding == ContentEncoding::Base64 {
            body["encoding"] = json!("base64");
        }
        if let Some(folder) = &doc.folder_id {
            body["folderId"] = json!(folder);
        }
        if !doc.metadata.is_empty() {
            body["metadata"] = json!(doc.metadata);
        }
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::post("create_document", "/documents")
                .json(body)
                .create(),
        )
        .await?;
        decode_document(&reply)
    }

    async fn get_document(&self, id: &str) -> Result<Document> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("get_document", format!("/documents/{}", segment(id))).entity(id),
        )
        .await?;
        decode_document(&reply)
    }

    async fn update_document(&self, id: &str, update: &DocumentUpdate) -> Result<Document> {
        let mut body = Map::new();
        if let Some(title) = &update.title {
            body.insert("title".into(), json!(title));
        }
        if let Some(content) = &update.content {
            body.insert("content".into(), json!(content));
        }
        if let Some(metadata) = &update.metadata {
            body.insert("metadata".into(), json!(metadata));
        }
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::patch("update_document", format!("/documents/{}", segment(id)))
                .json(Value::Object(body))
                .entity(id),
        )
        .await?;
        self.document_or_refetch(reply, id).await
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        fetch_unit(
            &self.pipeline,
            RequestSpec::delete("delete_document", format!("/documents/{}", segment(id))).entity(id),
        )
        .await
    }

    async fn upload_content(&self, id: &str, upload: &ContentUpload) -> Result<Document> {
        let mut body = json!({
            "content": upload.content,
            "createVersion": upload.create_version,
            "encoding": encoding_name(upload.encoding),
        });
        if let Some(mime) = &upload.mime_type {
            body["mimeType"] = json!(mime);
        }
        let spec = RequestSpec::post("upload_document", format!("/documents/{}/content", segment(id)))
            .json(body)
            .entity(id);
        // Overwriting in place can be repeated; a new version cannot.
        let spec = if upload.create_version {
            spec.create()
        } else {
            spec.idempotent(true)
        };
        let reply = fetch_json(&self.pipeline, spec).await?;
        self.document_or_refetch(reply, id).await
    }

    async fn download_content(&self, id: &str) -> Result<DocumentContent> {
        let envelope = fetch_raw(
            &self.pipeline,
            RequestSpec::get("download_document", format!("/documents/{}/content", segment(id)))
                .entity(id),
        )
        .await?;

        if envelope.is_json() {
            let value = envelope.json()?;
            if let Some(content) = value.get("content").and_then(Value::as_str) {
                let encoding = match str_field(&value, &["encoding"]).as_deref() {
                    Some("base64") => ContentEncoding::Base64,
                    _ => ContentEncoding::Text,
                };
                return Ok(DocumentContent {
                    document_id: id.to_string(),
                    content_type: str_field(&value, &["mimeType", "contentType"]),
                    encoding,
                    content: content.to_string(),
                });
            }
        }
        Ok(content_from_bytes(id, envelope.content_type, envelope.body))
    }

    async fn search(&self, query: &str, limit: u32, offset: u32) -> Result<SearchResults> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("search_documents", "/search")
                .query("q", query)
                .query("limit", limit)
                .query("offset", offset),
        )
        .await?;
        decode_search(&reply)
    }

    async fn advanced_search(&self, filters: &SearchFilters, limit: u32) -> Result<SearchResults> {
        let mut body = json!({ "limit": limit, "offset": 0 });
        let optional = [
            ("query", &filters.query),
            ("folderId", &filters.folder_id),
            ("createdAfter", &filters.created_after),
            ("createdBefore", &filters.created_before),
            ("modifiedAfter", &filters.modified_after),
            ("modifiedBefore", &filters.modified_before),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                body[key] = json!(v);
            }
        }
        if !filters.mime_types.is_empty() {
            body["mimeTypes"] = json!(filters.mime_types);
        }
        if !filters.metadata.is_empty() {
            body["metadata"] = json!(filters.metadata);
        }
        // A query POST has no side effects.
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::post("advanced_search", "/search/advanced")
                .json(body)
                .idempotent(true),
        )
        .await?;
        decode_search(&reply)
    }

    async fn recent_documents(
        &self,
        limit: u32,
        folder_id: Option<&str>,
    ) -> Result<Vec<Document>> {
        let mut spec = RequestSpec::get("get_recent_documents", "/documents/recent")
            .query("limit", limit)
            .query("sortBy", "modifiedDate")
            .query("sortOrder", "desc");
        if let Some(folder) = folder_id {
            spec = spec.query("folderId", folder);
        }
        let reply = fetch_json(&self.pipeline, spec).await?;
        decode_documents(list_field(&reply, &["documents", "results", "items"]))
    }

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder> {
        let mut body = json!({ "name": folder.name });
        if let Some(parent) = &folder.parent_id {
            body["parentId"] = json!(parent);
        }
        if let Some(description) = &folder.description {
            body["description"] = json!(description);
        }
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::post("create_folder", "/folders").json(body).create(),
        )
        .await?;
        decode_folder(&reply)
    }

    async fn get_folder(&self, id: &str) -> Result<Folder> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("get_folder", format!("/folders/{}", segment(id))).entity(id),
        )
        .await?;
        decode_folder(&reply)
    }

    async fn folder_contents(&self, id: &str, filter: ContentsFilter) -> Result<FolderContents> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("list_folder_contents", format!("/folders/{}/contents", segment(id)))
                .query("includeDocuments", filter.include_documents)
                .query("includeSubfolders", filter.include_subfolders)
                .entity(id),
        )
        .await?;
        let documents = if filter.include_documents {
            decode_documents(list_field_strict(&reply, &["documents"]))?
        } else {
            Vec::new()
        };
        let folders = if filter.include_subfolders {
            list_field_strict(&reply, &["folders", "subfolders"])
                .iter()
                .map(decode_folder)
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };
        Ok(FolderContents {
            folder_id: id.to_string(),
            documents,
            folders,
        })
    }

    async fn move_document(&self, id: &str, target_folder_id: &str) -> Result<Document> {
        // Moving to the same target twice lands in the same place.
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::post("move_document", format!("/documents/{}/move", segment(id)))
                .json(json!({ "folderId": target_folder_id }))
                .idempotent(true)
                .entity(id),
        )
        .await?;
        self.document_or_refetch(reply, id).await
    }

    async fn folder_tree(&self, root: Option<&str>, max_depth: u32) -> Result<FolderTree> {
        let mut spec = RequestSpec::get("get_folder_tree", "/folders/tree").query("maxDepth", max_depth);
        if let Some(root) = root {
            spec = spec.query("folderId", root).entity(root);
        }
        let reply = fetch_json(&self.pipeline, spec).await?;
        Ok(prune_tree(decode_tree(&reply)?, max_depth))
    }

    async fn delete_folder(&self, id: &str, recursive: bool) -> Result<()> {
        fetch_unit(
            &self.pipeline,
            RequestSpec::delete("delete_folder", format!("/folders/{}", segment(id)))
                .query("recursive", recursive)
                .entity(id),
        )
        .await
    }

    async fn get_metadata(&self, id: &str) -> Result<DocumentMetadata> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("get_metadata", format!("/documents/{}/metadata", segment(id))).entity(id),
        )
        .await?;
        Ok(decode_metadata(&reply, id))
    }

    async fn update_metadata(&self, id: &str, fields: &MetadataMap) -> Result<DocumentMetadata> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::patch("update_metadata", format!("/documents/{}/metadata", segment(id)))
                .json(json!({ "metadata": fields }))
                .entity(id),
        )
        .await?;
        if reply.is_null() {
            return self.get_metadata(id).await;
        }
        Ok(decode_metadata(&reply, id))
    }

    async fn metadata_schema(&self, document_type: &str) -> Result<MetadataSchema> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get(
                "get_metadata_schema",
                format!("/metadata/schemas/{}", segment(document_type)),
            )
            .entity(document_type),
        )
        .await?;
        Ok(decode_schema(&reply, document_type))
    }

    async fn versions(&self, id: &str) -> Result<VersionHistory> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("get_versions", format!("/documents/{}/versions", segment(id))).entity(id),
        )
        .await?;
        decode_history(&reply, id)
    }

    async fn create_version(&self, id: &str, version: &NewVersion) -> Result<Version> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::post("create_version", format!("/documents/{}/versions", segment(id)))
                .json(json!({
                    "comment": version.comment.clone().unwrap_or_default(),
                    "major": version.major,
                }))
                .create()
                .entity(id),
        )
        .await?;
        decode_version(&reply, id)
    }

    async fn restore_version(&self, id: &str, version_id: &str) -> Result<()> {
        // Restoring the same version twice leaves the same current pointer.
        fetch_unit(
            &self.pipeline,
            RequestSpec::post("restore_version", format!("/documents/{}/restore", segment(id)))
                .json(json!({ "versionId": version_id }))
                .idempotent(true)
                .entity(id),
        )
        .await
    }

    async fn start_workflow(&self, workflow: &NewWorkflow) -> Result<Workflow> {
        let mut body = json!({
            "workflowName": workflow.workflow_name,
            "documentId": workflow.document_id,
        });
        if !workflow.parameters.is_empty() {
            body["parameters"] = Value::Object(workflow.parameters.clone());
        }
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::post("start_workflow", "/workflows")
                .json(body)
                .create()
                .entity(&workflow.document_id),
        )
        .await?;
        decode_workflow(&reply)
    }

    async fn workflow(&self, id: &str) -> Result<Workflow> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("get_workflow_status", format!("/workflows/{}", segment(id))).entity(id),
        )
        .await?;
        decode_workflow(&reply)
    }

    async fn workflow_action(&self, id: &str, action: &WorkflowAction) -> Result<()> {
        let operation = match action {
            WorkflowAction::Approve { .. } => "approve_workflow",
            WorkflowAction::Reject { .. } => "reject_workflow",
        };
        // A decision is a state transition; replaying it after a response would
        // hit a workflow that has already moved on.
        fetch_unit(
            &self.pipeline,
            RequestSpec::post(operation, format!("/workflows/{}/action", segment(id)))
                .json(action.to_body())
                .idempotent(false)
                .entity(id),
        )
        .await
        .map_err(|e| match e {
            GatewayError::Conflict(f) => GatewayError::InvalidState(f),
            other => other,
        })
    }
}
