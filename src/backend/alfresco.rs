//! Adapter for the Alfresco Content Services public REST API (v1).
//!
//! Documents and folders are both nodes under `/nodes`. Single replies wrap
//! the entity in `entry`; lists wrap entries in `list.entries` with a
//! `list.pagination` block. Search goes through the AFTS search API.
//! Workflow calls use the resource-style `/workflows` endpoints, which a
//! workflow bridge serves next to Alfresco.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Map, Value};

use super::decode::{bool_field, map_field, required_str, str_field, time_field, u64_field, user_field};
use super::generic::{decode_version, order_versions, GenericRestBackend};
use super::{
    content_from_bytes, fetch_json, fetch_raw, fetch_unit, segment, BackendProfile, EcmBackend,
};
use crate::client::{RequestPipeline, RequestSpec};
use crate::domain::requests::decode_content;
use crate::domain::{
    ContentUpload, ContentsFilter, Document, DocumentContent, DocumentMetadata, DocumentUpdate,
    FieldDescriptor, Folder, FolderContents, FolderTree, MetadataMap, MetadataSchema,
    NewDocument, NewFolder, NewVersion, NewWorkflow, SearchFilters, SearchResults, Version,
    VersionHistory, Workflow, WorkflowAction,
};
use crate::error::{GatewayError, Result};

/// Core API prefix.
pub const CORE_API: &str = "/alfresco/api/-default-/public/alfresco/versions/1";

/// Search API endpoint.
pub const SEARCH_API: &str = "/alfresco/api/-default-/public/search/versions/1/search";

/// Alias for the repository root node.
pub const ROOT_NODE: &str = "-root-";

/// Page size used when listing folder children.
const CHILDREN_PAGE: u32 = 1000;

/// Alfresco node adapter.
#[derive(Debug, Clone)]
pub struct AlfrescoBackend {
    pipeline: Arc<RequestPipeline>,
    workflows: GenericRestBackend,
}

impl AlfrescoBackend {
    pub fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self {
            workflows: GenericRestBackend::new(pipeline.clone()),
            pipeline,
        }
    }

    fn node_path(id: &str) -> String {
        format!("{}/nodes/{}", CORE_API, segment(id))
    }

    async fn put_content(
        &self,
        operation: &str,
        id: &str,
        mime_type: &str,
        data: Vec<u8>,
        version: Option<&NewVersion>,
    ) -> Result<Value> {
        let mut spec = RequestSpec::put(operation, format!("{}/content", Self::node_path(id)))
            .query("include", "properties")
            .bytes(mime_type, data)
            .entity(id);
        if let Some(version) = version {
            spec = spec.create().query("majorVersion", version.major);
            if let Some(comment) = &version.comment {
                spec = spec.query("comment", comment);
            }
        }
        fetch_json(&self.pipeline, spec).await
    }

    async fn children(&self, id: &str, filter: Option<&str>) -> Result<Vec<Value>> {
        let mut spec = RequestSpec::get("list_folder_contents", format!("{}/children", Self::node_path(id)))
            .query("include", "properties")
            .query("maxItems", CHILDREN_PAGE)
            .entity(id);
        if let Some(filter) = filter {
            spec = spec.query("where", filter);
        }
        let reply = fetch_json(&self.pipeline, spec).await?;
        Ok(entries(&reply).into_iter().cloned().collect())
    }

    async fn run_search(&self, operation: &str, body: Value) -> Result<SearchResults> {
        // A query POST has no side effects.
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::post(operation, SEARCH_API)
                .json(body)
                .idempotent(true),
        )
        .await?;
        let documents = entries(&reply)
            .into_iter()
            .map(decode_document)
            .collect::<Result<Vec<_>>>()?;
        let total = reply
            .pointer("/list/pagination/totalItems")
            .and_then(Value::as_u64)
            .unwrap_or(documents.len() as u64);
        Ok(SearchResults { documents, total })
    }

    fn walk<'a>(&'a self, folder: Folder, remaining: u32) -> BoxFuture<'a, Result<FolderTree>> {
        async move {
            if remaining <= 1 {
                return Ok(FolderTree {
                    folder,
                    children: Vec::new(),
                });
            }
            let mut children = Vec::new();
            for child in self.children(&folder.id, Some("(isFolder=true)")).await? {
                children.push(self.walk(decode_folder(&child)?, remaining - 1).await?);
            }
            Ok(FolderTree { folder, children })
        }
        .boxed()
    }
}

// ============================================================================
// Decoders
// ============================================================================

fn entry(value: &Value) -> &Value {
    value.get("entry").unwrap_or(value)
}

fn entries(value: &Value) -> Vec<&Value> {
    value
        .pointer("/list/entries")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(entry).collect())
        .unwrap_or_default()
}

fn decode_document(value: &Value) -> Result<Document> {
    let node = entry(value);
    let content = node.get("content").cloned().unwrap_or(Value::Null);
    let properties = map_field(node, &["properties"]);
    Ok(Document {
        id: required_str(node, &["id"], "node")?,
        title: str_field(node, &["name"]).unwrap_or_default(),
        size: u64_field(&content, &["sizeInBytes"]),
        content_type: str_field(&content, &["mimeType"]),
        created_at: time_field(node, &["createdAt"]),
        modified_at: time_field(node, &["modifiedAt"]),
        author: user_field(node, &["createdByUser"]),
        current_version: properties
            .get("cm:versionLabel")
            .and_then(Value::as_str)
            .map(str::to_string),
        metadata: properties,
        folder_id: str_field(node, &["parentId"]),
    })
}

fn decode_folder(value: &Value) -> Result<Folder> {
    let node = entry(value);
    let properties = map_field(node, &["properties"]);
    Ok(Folder {
        id: required_str(node, &["id"], "node")?,
        name: str_field(node, &["name"]).unwrap_or_default(),
        parent_id: str_field(node, &["parentId"]),
        description: properties
            .get("cm:description")
            .and_then(Value::as_str)
            .map(str::to_string),
        document_ids: None,
        folder_ids: None,
    })
}

fn is_folder(node: &Value) -> bool {
    bool_field(node, &["isFolder"]).unwrap_or(false)
}

fn decode_type_schema(value: &Value, document_type: &str) -> MetadataSchema {
    let node = entry(value);
    let fields = node
        .get("properties")
        .and_then(Value::as_array)
        .map(|props| {
            props
                .iter()
                .filter_map(|p| {
                    Some(FieldDescriptor {
                        name: str_field(p, &["id", "name"])?,
                        field_type: str_field(p, &["dataType"]).unwrap_or_else(|| "d:text".into()),
                        required: bool_field(p, &["isMandatory"]).unwrap_or(false),
                        validation: p
                            .get("constraints")
                            .and_then(Value::as_array)
                            .and_then(|c| c.first())
                            .and_then(|c| str_field(c, &["type", "id"])),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    MetadataSchema {
        document_type: str_field(node, &["id"]).unwrap_or_else(|| document_type.to_string()),
        fields,
    }
}

// ============================================================================
// AFTS query building
// ============================================================================

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn afts_value(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        other => quote(&other.to_string()),
    }
}

fn range(field: &str, after: Option<&str>, before: Option<&str>) -> Option<String> {
    if after.is_none() && before.is_none() {
        return None;
    }
    Some(format!(
        "{}:[{} TO {}]",
        field,
        after.map(quote).unwrap_or_else(|| "MIN".into()),
        before.map(quote).unwrap_or_else(|| "MAX".into())
    ))
}

/// AFTS query for `filters`, always restricted to content nodes.
pub(crate) fn afts_query(filters: &SearchFilters) -> String {
    let mut clauses = vec!["TYPE:\"cm:content\"".to_string()];
    if let Some(q) = filters.query.as_deref().filter(|q| !q.trim().is_empty()) {
        clauses.push(format!("({})", q.trim()));
    }
    if let Some(folder) = filters.folder_id.as_deref().filter(|f| !f.trim().is_empty()) {
        clauses.push(format!("ANCESTOR:{}", quote(&format!("workspace://SpacesStore/{}", folder))));
    }
    if !filters.mime_types.is_empty() {
        let alternatives: Vec<String> = filters
            .mime_types
            .iter()
            .map(|m| format!("content.mimetype:{}", quote(m)))
            .collect();
        clauses.push(format!("({})", alternatives.join(" OR ")));
    }
    clauses.extend(range(
        "cm:created",
        filters.created_after.as_deref(),
        filters.created_before.as_deref(),
    ));
    clauses.extend(range(
        "cm:modified",
        filters.modified_after.as_deref(),
        filters.modified_before.as_deref(),
    ));
    for (field, value) in &filters.metadata {
        clauses.push(format!("{}:{}", field, afts_value(value)));
    }
    clauses.join(" AND ")
}

fn search_body(query: String, limit: u32, offset: u32) -> Value {
    json!({
        "query": { "query": query, "language": "afts" },
        "include": ["properties"],
        "paging": { "maxItems": limit, "skipCount": offset },
    })
}

// ============================================================================
// Adapter
// ============================================================================

#[async_trait]
impl EcmBackend for AlfrescoBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile::Alfresco
    }

    async fn create_document(&self, doc: &NewDocument) -> Result<Document> {
        let parent = doc.folder_id.as_deref().unwrap_or(ROOT_NODE);
        let mut properties: Map<String, Value> = doc
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        properties
            .entry("cm:title")
            .or_insert_with(|| json!(doc.title));

        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::post("create_document", format!("{}/children", Self::node_path(parent)))
                .json(json!({
                    "name": doc.title,
                    "nodeType": "cm:content",
                    "properties": properties,
                }))
                .create()
                .entity(parent),
        )
        .await?;
        let created = decode_document(&reply)?;

        let Some(content) = &doc.content else {
            return Ok(created);
        };
        let data = decode_content(content, doc.encoding)?;
        match self
            .put_content("create_document", &created.id, &doc.mime_type, data, None)
            .await
        {
            Ok(reply) => decode_document(&reply),
            Err(e) => Err(GatewayError::PartialCompletion {
                completed: format!("node {} created without content", created.id),
                source: Box::new(e),
            }),
        }
    }

    async fn get_document(&self, id: &str) -> Result<Document> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("get_document", Self::node_path(id))
                .query("include", "properties")
                .entity(id),
        )
        .await?;
        decode_document(&reply)
    }

    async fn update_document(&self, id: &str, update: &DocumentUpdate) -> Result<Document> {
        let mut body = Map::new();
        if let Some(title) = &update.title {
            body.insert("name".into(), json!(title));
        }
        if let Some(metadata) = update.metadata.as_ref().filter(|m| !m.is_empty()) {
            body.insert("properties".into(), json!(metadata));
        }

        let mut latest = None;
        if !body.is_empty() {
            let reply = fetch_json(
                &self.pipeline,
                RequestSpec::put("update_document", Self::node_path(id))
                    .query("include", "properties")
                    .json(Value::Object(body))
                    .entity(id),
            )
            .await?;
            latest = Some(decode_document(&reply)?);
        }

        if let Some(content) = &update.content {
            let mime = latest
                .as_ref()
                .and_then(|d| d.content_type.clone())
                .unwrap_or_else(|| "text/plain".to_string());
            match self
                .put_content("update_document", id, &mime, content.as_bytes().to_vec(), None)
                .await
            {
                Ok(reply) => latest = Some(decode_document(&reply)?),
                Err(e) if latest.is_some() => {
                    return Err(GatewayError::PartialCompletion {
                        completed: format!("node {} properties updated, content unchanged", id),
                        source: Box::new(e),
                    })
                }
                Err(e) => return Err(e),
            }
        }

        match latest {
            Some(doc) => Ok(doc),
            None => self.get_document(id).await,
        }
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        fetch_unit(
            &self.pipeline,
            RequestSpec::delete("delete_document", Self::node_path(id)).entity(id),
        )
        .await
    }

    async fn upload_content(&self, id: &str, upload: &ContentUpload) -> Result<Document> {
        let data = upload.bytes()?;
        let mime = upload.mime_type.as_deref().unwrap_or("application/octet-stream");
        let version = upload.create_version.then(NewVersion::default);
        let reply = self
            .put_content("upload_document", id, mime, data, version.as_ref())
            .await?;
        decode_document(&reply)
    }

    async fn download_content(&self, id: &str) -> Result<DocumentContent> {
        let envelope = fetch_raw(
            &self.pipeline,
            RequestSpec::get("download_document", format!("{}/content", Self::node_path(id)))
                .entity(id),
        )
        .await?;
        Ok(content_from_bytes(id, envelope.content_type, envelope.body))
    }

    async fn search(&self, query: &str, limit: u32, offset: u32) -> Result<SearchResults> {
        let filters = SearchFilters {
            query: Some(query.to_string()),
            ..Default::default()
        };
        self.run_search("search_documents", search_body(afts_query(&filters), limit, offset))
            .await
    }

    async fn advanced_search(&self, filters: &SearchFilters, limit: u32) -> Result<SearchResults> {
        self.run_search("advanced_search", search_body(afts_query(filters), limit, 0))
            .await
    }

    async fn recent_documents(
        &self,
        limit: u32,
        folder_id: Option<&str>,
    ) -> Result<Vec<Document>> {
        let filters = SearchFilters {
            folder_id: folder_id.map(str::to_string),
            ..Default::default()
        };
        let mut body = search_body(afts_query(&filters), limit, 0);
        body["sort"] = json!([{ "type": "FIELD", "field": "cm:modified", "ascending": false }]);
        Ok(self.run_search("get_recent_documents", body).await?.documents)
    }

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder> {
        let parent = folder.parent_id.as_deref().unwrap_or(ROOT_NODE);
        let mut body = json!({ "name": folder.name, "nodeType": "cm:folder" });
        if let Some(description) = &folder.description {
            body["properties"] = json!({ "cm:description": description });
        }
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::post("create_folder", format!("{}/children", Self::node_path(parent)))
                .json(body)
                .create()
                .entity(parent),
        )
        .await?;
        decode_folder(&reply)
    }

    async fn get_folder(&self, id: &str) -> Result<Folder> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("get_folder", Self::node_path(id))
                .query("include", "properties")
                .entity(id),
        )
        .await?;
        decode_folder(&reply)
    }

    async fn folder_contents(&self, id: &str, filter: ContentsFilter) -> Result<FolderContents> {
        let where_clause = match (filter.include_documents, filter.include_subfolders) {
            (true, true) => None,
            (true, false) => Some("(isFile=true)"),
            (false, true) => Some("(isFolder=true)"),
            (false, false) => {
                return Ok(FolderContents {
                    folder_id: id.to_string(),
                    documents: Vec::new(),
                    folders: Vec::new(),
                })
            }
        };
        let mut documents = Vec::new();
        let mut folders = Vec::new();
        for child in self.children(id, where_clause).await? {
            if is_folder(&child) {
                folders.push(decode_folder(&child)?);
            } else if bool_field(&child, &["isFile"]).unwrap_or(true) {
                documents.push(decode_document(&child)?);
            }
        }
        Ok(FolderContents {
            folder_id: id.to_string(),
            documents,
            folders,
        })
    }

    async fn move_document(&self, id: &str, target_folder_id: &str) -> Result<Document> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::post("move_document", format!("{}/move", Self::node_path(id)))
                .json(json!({ "targetParentId": target_folder_id }))
                .idempotent(true)
                .entity(id),
        )
        .await?;
        decode_document(&reply)
    }

    async fn folder_tree(&self, root: Option<&str>, max_depth: u32) -> Result<FolderTree> {
        let root = self.get_folder(root.unwrap_or(ROOT_NODE)).await?;
        self.walk(root, max_depth).await
    }

    async fn delete_folder(&self, id: &str, _recursive: bool) -> Result<()> {
        // Alfresco always deletes a folder node with its children.
        fetch_unit(
            &self.pipeline,
            RequestSpec::delete("delete_folder", Self::node_path(id)).entity(id),
        )
        .await
    }

    async fn get_metadata(&self, id: &str) -> Result<DocumentMetadata> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("get_metadata", Self::node_path(id))
                .query("include", "properties")
                .entity(id),
        )
        .await?;
        let node = entry(&reply);
        Ok(DocumentMetadata {
            document_id: id.to_string(),
            document_type: str_field(node, &["nodeType"]),
            fields: map_field(node, &["properties"]),
        })
    }

    async fn update_metadata(&self, id: &str, fields: &MetadataMap) -> Result<DocumentMetadata> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::put("update_metadata", Self::node_path(id))
                .query("include", "properties")
                .json(json!({ "properties": fields }))
                .entity(id),
        )
        .await?;
        let node = entry(&reply);
        Ok(DocumentMetadata {
            document_id: id.to_string(),
            document_type: str_field(node, &["nodeType"]),
            fields: map_field(node, &["properties"]),
        })
    }

    async fn metadata_schema(&self, document_type: &str) -> Result<MetadataSchema> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("get_metadata_schema", format!("{}/types/{}", CORE_API, segment(document_type)))
                .entity(document_type),
        )
        .await?;
        Ok(decode_type_schema(&reply, document_type))
    }

    async fn versions(&self, id: &str) -> Result<VersionHistory> {
        let reply = fetch_json(
            &self.pipeline,
            RequestSpec::get("get_versions", format!("{}/versions", Self::node_path(id)))
                .entity(id),
        )
        .await?;
        // Alfresco lists newest first.
        let mut versions = entries(&reply)
            .into_iter()
            .map(|v| decode_version(v, id))
            .collect::<Result<Vec<_>>>()?;
        versions.reverse();
        let versions = order_versions(versions);
        Ok(VersionHistory {
            document_id: id.to_string(),
            current_version: versions.last().map(|v| v.version_id.clone()),
            versions,
        })
    }

    async fn create_version(&self, id: &str, version: &NewVersion) -> Result<Version> {
        // Alfresco versions on content writes, so re-write the current content.
        let current = fetch_raw(
            &self.pipeline,
            RequestSpec::get("create_version", format!("{}/content", Self::node_path(id)))
                .entity(id),
        )
        .await?;
        let mime = current
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let reply = self
            .put_content("create_version", id, &mime, current.body, Some(version))
            .await?;
        let node = entry(&reply);
        let label = node
            .pointer("/properties/cm:versionLabel")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Decode("node reply is missing cm:versionLabel".into()))?;
        Ok(Version {
            document_id: id.to_string(),
            version_id: label.to_string(),
            major: version.major,
            author: user_field(node, &["modifiedByUser"]),
            comment: version.comment.clone(),
            created_at: time_field(node, &["modifiedAt"]),
        })
    }

    async fn restore_version(&self, id: &str, version_id: &str) -> Result<()> {
        fetch_unit(
            &self.pipeline,
            RequestSpec::post(
                "restore_version",
                format!("{}/versions/{}/revert", Self::node_path(id), segment(version_id)),
            )
            .json(json!({ "majorVersion": false, "comment": format!("restored {}", version_id) }))
            .idempotent(true)
            .entity(id),
        )
        .await
    }

    async fn start_workflow(&self, workflow: &NewWorkflow) -> Result<Workflow> {
        self.workflows.start_workflow(workflow).await
    }

    async fn workflow(&self, id: &str) -> Result<Workflow> {
        self.workflows.workflow(id).await
    }

    async fn workflow_action(&self, id: &str, action: &WorkflowAction) -> Result<()> {
        self.workflows.workflow_action(id, action).await
    }
}
