//! Operation table: the catalog of callable operations.
//!
//! Each entry pairs a JSON-schema description of its arguments with a typed
//! handler. The table is built once; [`OperationTable::check_args`] enforces
//! the schema (required keys, unknown keys, primitive types) before a handler
//! deserializes its typed arguments.

use std::collections::BTreeMap;
use std::fmt;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::validate::suggest_field;
use crate::domain::{
    ContentUpload, ContentsFilter, DocumentUpdate, MetadataMap, NewDocument, NewFolder,
    NewVersion, NewWorkflow, SearchFilters,
};
use crate::error::{GatewayError, Result};
use crate::ops::EcmOperations;

/// Typed handler behind one operation name.
pub type Handler = for<'a> fn(&'a EcmOperations, Value) -> BoxFuture<'a, Result<Value>>;

/// Effect class of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationCategory {
    /// No backend state changes.
    Read,
    /// Creates or modifies backend state.
    Write,
    /// Removes backend state.
    Destructive,
}

impl fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Destructive => write!(f, "destructive"),
        }
    }
}

/// One registered operation.
#[derive(Clone)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub category: OperationCategory,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
    pub handler: Handler,
}

impl fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSpec")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish()
    }
}

/// Catalog entry as shown to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    pub category: OperationCategory,
    pub parameters: Value,
}

/// Name-keyed operation registry.
#[derive(Debug, Clone)]
pub struct OperationTable {
    operations: BTreeMap<&'static str, OperationSpec>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self {
            operations: BTreeMap::new(),
        }
    }

    /// Every gateway operation.
    pub fn standard() -> Self {
        let mut table = Self::new();
        register_documents(&mut table);
        register_search(&mut table);
        register_folders(&mut table);
        register_metadata(&mut table);
        register_versions(&mut table);
        register_workflows(&mut table);
        table
    }

    /// Register an operation. A later registration under the same name wins.
    pub fn register(&mut self, spec: OperationSpec) {
        self.operations.insert(spec.name, spec);
    }

    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Operation names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.operations.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn descriptors(&self) -> Vec<OperationDescriptor> {
        self.operations
            .values()
            .map(|spec| OperationDescriptor {
                name: spec.name.to_string(),
                description: spec.description.to_string(),
                category: spec.category,
                parameters: spec.parameters.clone(),
            })
            .collect()
    }

    /// Look up `name`, suggesting the closest operation when it is unknown.
    pub fn resolve(&self, name: &str) -> Result<&OperationSpec> {
        self.get(name).ok_or_else(|| {
            let names = self.names();
            let hint = suggest_field(name, &names)
                .map(|s| format!(" (did you mean '{}'?)", s))
                .unwrap_or_default();
            GatewayError::InvalidArgument(format!("unknown operation '{}'{}", name, hint))
        })
    }

    /// Check `args` against the operation's parameter schema.
    ///
    /// `null` is read as an empty object. Returns the arguments object to
    /// hand to the handler.
    pub fn check_args(spec: &OperationSpec, args: Value) -> Result<Value> {
        let args = match args {
            Value::Null => Value::Object(Default::default()),
            Value::Object(_) => args,
            other => {
                return Err(GatewayError::InvalidArgument(format!(
                    "{}: arguments must be a JSON object, got {}",
                    spec.name,
                    json_type(&other)
                )))
            }
        };
        let Some(obj) = args.as_object() else {
            return Ok(args);
        };

        let properties = spec.parameters.get("properties").and_then(Value::as_object);
        let known: Vec<&str> = properties
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default();

        for key in obj.keys() {
            if !known.contains(&key.as_str()) {
                let hint = suggest_field(key, &known)
                    .map(|s| format!(" (did you mean '{}'?)", s))
                    .unwrap_or_default();
                return Err(GatewayError::InvalidArgument(format!(
                    "{}: unknown parameter '{}'{}",
                    spec.name, key, hint
                )));
            }
        }

        if let Some(required) = spec.parameters.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if obj.get(name).is_none_or(Value::is_null) {
                    return Err(GatewayError::InvalidArgument(format!(
                        "{}: missing required parameter '{}'",
                        spec.name, name
                    )));
                }
            }
        }

        if let Some(properties) = properties {
            for (key, value) in obj {
                if value.is_null() {
                    continue;
                }
                let expected = properties
                    .get(key)
                    .and_then(|p| p.get("type"))
                    .and_then(Value::as_str);
                if let Some(expected) = expected {
                    if !type_matches(expected, value) {
                        return Err(GatewayError::InvalidArgument(format!(
                            "{}: parameter '{}' must be {}, got {}",
                            spec.name,
                            key,
                            expected,
                            json_type(value)
                        )));
                    }
                }
            }
        }

        Ok(args)
    }
}

impl Default for OperationTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_u64() || value.is_i64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Handler helpers
// ============================================================================

fn parse<T: DeserializeOwned>(operation: &str, args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| GatewayError::InvalidArgument(format!("{}: {}", operation, e)))
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn spec(
    name: &'static str,
    description: &'static str,
    category: OperationCategory,
    parameters: Value,
    handler: Handler,
) -> OperationSpec {
    OperationSpec {
        name,
        description,
        category,
        parameters,
        handler,
    }
}

#[derive(Deserialize)]
struct DocumentIdArgs {
    document_id: String,
}

#[derive(Deserialize)]
struct FolderIdArgs {
    folder_id: String,
}

#[derive(Deserialize)]
struct WorkflowIdArgs {
    workflow_id: String,
}

// ============================================================================
// Documents
// ============================================================================

#[derive(Deserialize)]
struct UpdateDocumentArgs {
    document_id: String,
    #[serde(flatten)]
    update: DocumentUpdate,
}

#[derive(Deserialize)]
struct UploadArgs {
    document_id: String,
    #[serde(flatten)]
    upload: ContentUpload,
}

fn create_document(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let new: NewDocument = parse("create_document", args)?;
        to_json(ops.create_document(new).await?)
    })
}

fn get_document(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: DocumentIdArgs = parse("get_document", args)?;
        to_json(ops.get_document(&a.document_id).await?)
    })
}

fn update_document(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: UpdateDocumentArgs = parse("update_document", args)?;
        to_json(ops.update_document(&a.document_id, a.update).await?)
    })
}

fn delete_document(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: DocumentIdArgs = parse("delete_document", args)?;
        to_json(ops.delete_document(&a.document_id).await?)
    })
}

fn upload_document(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: UploadArgs = parse("upload_document", args)?;
        to_json(ops.upload_document(&a.document_id, a.upload).await?)
    })
}

fn download_document(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: DocumentIdArgs = parse("download_document", args)?;
        to_json(ops.download_document(&a.document_id).await?)
    })
}

fn register_documents(table: &mut OperationTable) {
    use OperationCategory::*;

    let document_id = json!({"type": "string", "description": "Document identifier"});
    let metadata = json!({"type": "object", "description": "Metadata fields keyed by name"});
    let encoding = json!({"type": "string", "enum": ["text", "base64"], "description": "Encoding of `content` (default text)"});

    table.register(spec(
        "create_document",
        "Create a document, optionally with initial content, folder and metadata",
        Write,
        schema(
            json!({
                "title": {"type": "string", "description": "Document title"},
                "content": {"type": "string", "description": "Initial content"},
                "encoding": encoding,
                "folder_id": {"type": "string", "description": "Parent folder (repository root when absent)"},
                "mime_type": {"type": "string", "description": "Content MIME type (default text/plain)"},
                "metadata": metadata,
            }),
            &["title"],
        ),
        create_document,
    ));
    table.register(spec(
        "get_document",
        "Fetch a document's properties and metadata",
        Read,
        schema(json!({ "document_id": document_id }), &["document_id"]),
        get_document,
    ));
    table.register(spec(
        "update_document",
        "Change a document's title, content or metadata",
        Write,
        schema(
            json!({
                "document_id": document_id,
                "title": {"type": "string"},
                "content": {"type": "string", "description": "Replacement text content"},
                "metadata": metadata,
            }),
            &["document_id"],
        ),
        update_document,
    ));
    table.register(spec(
        "delete_document",
        "Delete a document",
        Destructive,
        schema(json!({ "document_id": document_id }), &["document_id"]),
        delete_document,
    ));
    table.register(spec(
        "upload_document",
        "Replace a document's content, by default as a new version",
        Write,
        schema(
            json!({
                "document_id": document_id,
                "content": {"type": "string"},
                "encoding": encoding,
                "mime_type": {"type": "string"},
                "create_version": {"type": "boolean", "description": "Record a new version (default true)"},
            }),
            &["document_id", "content"],
        ),
        upload_document,
    ));
    table.register(spec(
        "download_document",
        "Fetch a document's content; binary content is base64-encoded",
        Read,
        schema(json!({ "document_id": document_id }), &["document_id"]),
        download_document,
    ));
}

// ============================================================================
// Search
// ============================================================================

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    max_results: Option<u32>,
    #[serde(default)]
    offset: Option<u32>,
}

#[derive(Deserialize)]
struct RecentArgs {
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    folder_id: Option<String>,
}

fn search_documents(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: SearchArgs = parse("search_documents", args)?;
        to_json(ops.search(&a.query, a.max_results, a.offset).await?)
    })
}

fn advanced_search(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let filters: SearchFilters = parse("advanced_search", args)?;
        to_json(ops.advanced_search(filters).await?)
    })
}

fn get_recent_documents(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: RecentArgs = parse("get_recent_documents", args)?;
        to_json(ops.get_recent_documents(a.limit, a.folder_id.as_deref()).await?)
    })
}

fn register_search(table: &mut OperationTable) {
    use OperationCategory::*;

    let max_results = json!({"type": "integer", "minimum": 1, "description": "Result count, capped at the configured ceiling"});
    let date = json!({"type": "string", "description": "RFC 3339 timestamp or YYYY-MM-DD"});

    table.register(spec(
        "search_documents",
        "Full-text search over documents",
        Read,
        schema(
            json!({
                "query": {"type": "string"},
                "max_results": max_results,
                "offset": {"type": "integer", "minimum": 0},
            }),
            &["query"],
        ),
        search_documents,
    ));
    table.register(spec(
        "advanced_search",
        "Search by query, folder, MIME type, date ranges and metadata values",
        Read,
        schema(
            json!({
                "query": {"type": "string"},
                "folder_id": {"type": "string"},
                "mime_types": {"type": "array", "items": {"type": "string"}},
                "created_after": date,
                "created_before": date,
                "modified_after": date,
                "modified_before": date,
                "metadata": {"type": "object"},
                "max_results": max_results,
            }),
            &[],
        ),
        advanced_search,
    ));
    table.register(spec(
        "get_recent_documents",
        "Most recently modified documents, newest first",
        Read,
        schema(
            json!({
                "limit": max_results,
                "folder_id": {"type": "string", "description": "Restrict to this folder"},
            }),
            &[],
        ),
        get_recent_documents,
    ));
}

// ============================================================================
// Folders
// ============================================================================

#[derive(Deserialize)]
struct ListContentsArgs {
    folder_id: String,
    #[serde(flatten)]
    filter: ContentsFilter,
}

#[derive(Deserialize)]
struct MoveArgs {
    document_id: String,
    target_folder_id: String,
}

#[derive(Deserialize)]
struct TreeArgs {
    #[serde(default)]
    folder_id: Option<String>,
    #[serde(default)]
    max_depth: Option<u32>,
}

#[derive(Deserialize)]
struct DeleteFolderArgs {
    folder_id: String,
    #[serde(default)]
    recursive: bool,
}

fn create_folder(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let new: NewFolder = parse("create_folder", args)?;
        to_json(ops.create_folder(new).await?)
    })
}

fn get_folder(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: FolderIdArgs = parse("get_folder", args)?;
        to_json(ops.get_folder(&a.folder_id).await?)
    })
}

fn list_folder_contents(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: ListContentsArgs = parse("list_folder_contents", args)?;
        to_json(ops.list_folder_contents(&a.folder_id, a.filter).await?)
    })
}

fn move_document(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: MoveArgs = parse("move_document", args)?;
        to_json(ops.move_document(&a.document_id, &a.target_folder_id).await?)
    })
}

fn get_folder_tree(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: TreeArgs = parse("get_folder_tree", args)?;
        to_json(ops.get_folder_tree(a.folder_id.as_deref(), a.max_depth).await?)
    })
}

fn delete_folder(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: DeleteFolderArgs = parse("delete_folder", args)?;
        ops.delete_folder(&a.folder_id, a.recursive).await?;
        Ok(json!({
            "id": a.folder_id,
            "deleted": true,
            "recursive": a.recursive,
        }))
    })
}

fn register_folders(table: &mut OperationTable) {
    use OperationCategory::*;

    let folder_id = json!({"type": "string", "description": "Folder identifier"});

    table.register(spec(
        "create_folder",
        "Create a folder under a parent (repository root when absent)",
        Write,
        schema(
            json!({
                "name": {"type": "string"},
                "parent_id": {"type": "string"},
                "description": {"type": "string"},
            }),
            &["name"],
        ),
        create_folder,
    ));
    table.register(spec(
        "get_folder",
        "Fetch a folder's properties",
        Read,
        schema(json!({ "folder_id": folder_id }), &["folder_id"]),
        get_folder,
    ));
    table.register(spec(
        "list_folder_contents",
        "List the documents and subfolders directly inside a folder",
        Read,
        schema(
            json!({
                "folder_id": folder_id,
                "include_documents": {"type": "boolean", "description": "Default true"},
                "include_subfolders": {"type": "boolean", "description": "Default true"},
            }),
            &["folder_id"],
        ),
        list_folder_contents,
    ));
    table.register(spec(
        "move_document",
        "Move a document into another folder",
        Write,
        schema(
            json!({
                "document_id": {"type": "string"},
                "target_folder_id": folder_id,
            }),
            &["document_id", "target_folder_id"],
        ),
        move_document,
    ));
    table.register(spec(
        "get_folder_tree",
        "Folder hierarchy under a folder, bounded by depth",
        Read,
        schema(
            json!({
                "folder_id": {"type": "string", "description": "Tree root (repository root when absent)"},
                "max_depth": {"type": "integer", "minimum": 1, "description": "Default 3"},
            }),
            &[],
        ),
        get_folder_tree,
    ));
    table.register(spec(
        "delete_folder",
        "Delete a folder; non-empty folders need recursive=true",
        Destructive,
        schema(
            json!({
                "folder_id": folder_id,
                "recursive": {"type": "boolean", "description": "Delete contents too (default false)"},
            }),
            &["folder_id"],
        ),
        delete_folder,
    ));
}

// ============================================================================
// Metadata
// ============================================================================

#[derive(Deserialize)]
struct UpdateMetadataArgs {
    document_id: String,
    metadata: MetadataMap,
    #[serde(default)]
    document_type: Option<String>,
}

#[derive(Deserialize)]
struct SchemaArgs {
    document_type: String,
}

fn get_metadata(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: DocumentIdArgs = parse("get_metadata", args)?;
        to_json(ops.get_metadata(&a.document_id).await?)
    })
}

fn update_metadata(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: UpdateMetadataArgs = parse("update_metadata", args)?;
        to_json(
            ops.update_metadata(&a.document_id, a.metadata, a.document_type.as_deref())
                .await?,
        )
    })
}

fn get_metadata_schema(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: SchemaArgs = parse("get_metadata_schema", args)?;
        to_json(ops.get_metadata_schema(&a.document_type).await?)
    })
}

fn register_metadata(table: &mut OperationTable) {
    use OperationCategory::*;

    table.register(spec(
        "get_metadata",
        "Fetch a document's type and metadata fields",
        Read,
        schema(json!({ "document_id": {"type": "string"} }), &["document_id"]),
        get_metadata,
    ));
    table.register(spec(
        "update_metadata",
        "Update metadata fields, checked against the document type's schema",
        Write,
        schema(
            json!({
                "document_id": {"type": "string"},
                "metadata": {"type": "object", "description": "Fields to set"},
                "document_type": {"type": "string", "description": "Schema to check against (read from the document when absent)"},
            }),
            &["document_id", "metadata"],
        ),
        update_metadata,
    ));
    table.register(spec(
        "get_metadata_schema",
        "Field definitions for a document type",
        Read,
        schema(json!({ "document_type": {"type": "string"} }), &["document_type"]),
        get_metadata_schema,
    ));
}

// ============================================================================
// Versions
// ============================================================================

#[derive(Deserialize)]
struct CreateVersionArgs {
    document_id: String,
    #[serde(flatten)]
    version: NewVersion,
}

#[derive(Deserialize)]
struct RestoreArgs {
    document_id: String,
    version_id: String,
}

fn get_versions(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: DocumentIdArgs = parse("get_versions", args)?;
        to_json(ops.get_versions(&a.document_id).await?)
    })
}

fn create_version(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: CreateVersionArgs = parse("create_version", args)?;
        to_json(ops.create_version(&a.document_id, a.version).await?)
    })
}

fn restore_version(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: RestoreArgs = parse("restore_version", args)?;
        to_json(ops.restore_version(&a.document_id, &a.version_id).await?)
    })
}

fn register_versions(table: &mut OperationTable) {
    use OperationCategory::*;

    table.register(spec(
        "get_versions",
        "Version history of a document, oldest first",
        Read,
        schema(json!({ "document_id": {"type": "string"} }), &["document_id"]),
        get_versions,
    ));
    table.register(spec(
        "create_version",
        "Record a new version of a document's current content",
        Write,
        schema(
            json!({
                "document_id": {"type": "string"},
                "comment": {"type": "string"},
                "major": {"type": "boolean", "description": "Major version bump (default false)"},
            }),
            &["document_id"],
        ),
        create_version,
    ));
    table.register(spec(
        "restore_version",
        "Make an earlier version current; history is kept",
        Write,
        schema(
            json!({
                "document_id": {"type": "string"},
                "version_id": {"type": "string"},
            }),
            &["document_id", "version_id"],
        ),
        restore_version,
    ));
}

// ============================================================================
// Workflows
// ============================================================================

#[derive(Deserialize)]
struct ApproveArgs {
    workflow_id: String,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Deserialize)]
struct RejectArgs {
    workflow_id: String,
    reason: String,
}

fn start_workflow(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let new: NewWorkflow = parse("start_workflow", args)?;
        to_json(ops.start_workflow(new).await?)
    })
}

fn get_workflow_status(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: WorkflowIdArgs = parse("get_workflow_status", args)?;
        to_json(ops.get_workflow_status(&a.workflow_id).await?)
    })
}

fn approve_workflow(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: ApproveArgs = parse("approve_workflow", args)?;
        to_json(ops.approve_workflow(&a.workflow_id, a.comment).await?)
    })
}

fn reject_workflow(ops: &EcmOperations, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let a: RejectArgs = parse("reject_workflow", args)?;
        to_json(ops.reject_workflow(&a.workflow_id, &a.reason).await?)
    })
}

fn register_workflows(table: &mut OperationTable) {
    use OperationCategory::*;

    let workflow_id = json!({"type": "string", "description": "Workflow instance identifier"});

    table.register(spec(
        "start_workflow",
        "Start a named workflow on a document",
        Write,
        schema(
            json!({
                "document_id": {"type": "string"},
                "workflow_name": {"type": "string"},
                "parameters": {"type": "object", "description": "Free-form workflow parameters"},
            }),
            &["document_id", "workflow_name"],
        ),
        start_workflow,
    ));
    table.register(spec(
        "get_workflow_status",
        "Current step and transition history of a workflow",
        Read,
        schema(json!({ "workflow_id": workflow_id }), &["workflow_id"]),
        get_workflow_status,
    ));
    table.register(spec(
        "approve_workflow",
        "Approve an in-progress workflow",
        Write,
        schema(
            json!({
                "workflow_id": workflow_id,
                "comment": {"type": "string"},
            }),
            &["workflow_id"],
        ),
        approve_workflow,
    ));
    table.register(spec(
        "reject_workflow",
        "Reject an in-progress workflow with a reason",
        Write,
        schema(
            json!({
                "workflow_id": workflow_id,
                "reason": {"type": "string"},
            }),
            &["workflow_id", "reason"],
        ),
        reject_workflow,
    ));
}
