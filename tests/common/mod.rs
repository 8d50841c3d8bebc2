//! In-memory ECM backend speaking the generic REST dialect.
//!
//! Implements `Transport`, so a real `Gateway` (pipeline, auth, retry, cache)
//! runs against it unchanged. Faults can be injected per route.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use ecm_gateway::client::{
    Method, OutboundRequest, RawResponse, RequestBody, Transport, TransportError,
    TransportErrorKind,
};
use ecm_gateway::client::RetryPolicy;
use ecm_gateway::config::{AuthConfig, Config};
use ecm_gateway::Gateway;

pub const TOKEN_PATH: &str = "/oauth/token";

/// What an injected fault does to a matching request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fault {
    /// Reply with this status without touching state.
    Status(u16),
    /// Fail before the request reaches the backend.
    Unreachable,
    /// Apply the request, then lose the response.
    LoseResponse,
    /// Apply the request, then reply with this status anyway.
    ApplyThenStatus(u16),
}

#[derive(Debug)]
struct Injected {
    method: Method,
    path: String,
    fault: Fault,
    remaining: u32,
}

#[derive(Default)]
struct State {
    documents: BTreeMap<String, Value>,
    content: HashMap<String, String>,
    folders: BTreeMap<String, Value>,
    versions: HashMap<String, Vec<Value>>,
    schemas: HashMap<String, Value>,
    workflows: BTreeMap<String, Value>,
    idempotency: HashMap<String, Value>,
    faults: Vec<Injected>,
    requests: Vec<OutboundRequest>,
    token_exchanges: u32,
    next_id: u32,
    clock: i64,
}

impl State {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }

    fn tick(&mut self) -> String {
        self.clock += 60;
        chrono::DateTime::from_timestamp(1_700_000_000 + self.clock, 0)
            .unwrap()
            .to_rfc3339()
    }
}

pub struct FakeEcm {
    state: Mutex<State>,
    token_delay: Duration,
}

impl Default for FakeEcm {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEcm {
    pub fn new() -> Self {
        let mut state = State::default();
        state.folders.insert(
            "root".into(),
            json!({"id": "root", "name": "Repository", "parentId": null}),
        );
        Self {
            state: Mutex::new(state),
            token_delay: Duration::from_millis(50),
        }
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    pub fn add_folder(&self, name: &str, parent: &str) -> String {
        let mut s = self.state.lock().unwrap();
        let id = s.next("FLD");
        s.folders.insert(
            id.clone(),
            json!({"id": id, "name": name, "parentId": parent}),
        );
        id
    }

    pub fn add_document(&self, title: &str, folder: &str) -> String {
        self.add_typed_document(title, folder, None)
    }

    pub fn add_typed_document(&self, title: &str, folder: &str, doc_type: Option<&str>) -> String {
        let mut s = self.state.lock().unwrap();
        let id = s.next("DOC");
        let now = s.tick();
        s.documents.insert(
            id.clone(),
            json!({
                "id": id,
                "title": title,
                "mimeType": "text/plain",
                "size": 0,
                "createdDate": now,
                "modifiedDate": now,
                "author": "seed",
                "folderId": folder,
                "documentType": doc_type,
                "metadata": {},
                "currentVersion": "1.0",
            }),
        );
        s.content.insert(id.clone(), String::new());
        s.versions
            .insert(id.clone(), vec![version_json("1.0", true, None, &now)]);
        id
    }

    pub fn add_schema(&self, document_type: &str, fields: &[&str]) {
        let fields: Vec<Value> = fields
            .iter()
            .map(|f| json!({"name": f, "type": "string", "required": false}))
            .collect();
        self.state.lock().unwrap().schemas.insert(
            document_type.into(),
            json!({"documentType": document_type, "fields": fields}),
        );
    }

    pub fn add_workflow(&self, document_id: &str, status: &str) -> String {
        let mut s = self.state.lock().unwrap();
        let id = s.next("WF");
        let now = s.tick();
        s.workflows.insert(
            id.clone(),
            json!({
                "id": id,
                "workflowName": "review",
                "documentId": document_id,
                "status": status,
                "history": [{"action": "start", "actor": "seed", "timestamp": now}],
            }),
        );
        id
    }

    // ------------------------------------------------------------------
    // Fault injection and inspection
    // ------------------------------------------------------------------

    /// Apply `fault` to the next `times` requests matching `method` and `path`.
    pub fn inject(&self, method: Method, path: &str, fault: Fault, times: u32) {
        self.state.lock().unwrap().faults.push(Injected {
            method,
            path: path.to_string(),
            fault,
            remaining: times,
        });
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.url == path)
            .count()
    }

    pub fn token_exchanges(&self) -> u32 {
        self.state.lock().unwrap().token_exchanges
    }

    pub fn document_count(&self) -> usize {
        self.state.lock().unwrap().documents.len()
    }

    pub fn has_folder(&self, id: &str) -> bool {
        self.state.lock().unwrap().folders.contains_key(id)
    }

    pub fn has_document(&self, id: &str) -> bool {
        self.state.lock().unwrap().documents.contains_key(id)
    }

    fn take_fault(&self, request: &OutboundRequest) -> Option<Fault> {
        let mut s = self.state.lock().unwrap();
        let injected = s.faults.iter_mut().find(|f| {
            f.remaining > 0 && f.method == request.method && f.path == request.url
        })?;
        injected.remaining -= 1;
        Some(injected.fault)
    }

    async fn token(&self, request: &OutboundRequest) -> RawResponse {
        tokio::time::sleep(self.token_delay).await;
        let grant = match &request.body {
            Some(RequestBody::Form(fields)) => fields
                .iter()
                .find(|(k, _)| k == "grant_type")
                .map(|(_, v)| v.clone()),
            _ => None,
        };
        if grant.as_deref() != Some("client_credentials") {
            return RawResponse::json(400, &json!({"error": "unsupported_grant_type"}));
        }
        let mut s = self.state.lock().unwrap();
        s.token_exchanges += 1;
        let n = s.token_exchanges;
        RawResponse::json(
            200,
            &json!({"access_token": format!("token-{}", n), "expires_in": 3600}),
        )
    }
}

#[async_trait]
impl Transport for FakeEcm {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        self.state.lock().unwrap().requests.push(request.clone());

        if request.url.ends_with(TOKEN_PATH) {
            return Ok(self.token(&request).await);
        }

        match self.take_fault(&request) {
            Some(Fault::Status(status)) => {
                return Ok(RawResponse::json(
                    status,
                    &json!({"message": format!("injected HTTP {}", status)}),
                ))
            }
            Some(Fault::Unreachable) => {
                return Err(TransportError::new(
                    TransportErrorKind::Connect,
                    "connection refused",
                ))
            }
            Some(Fault::ApplyThenStatus(status)) => {
                let _ = self.route(&request);
                return Ok(RawResponse::json(
                    status,
                    &json!({"message": format!("injected HTTP {} after apply", status)}),
                ));
            }
            Some(Fault::LoseResponse) => {
                let _ = self.route(&request);
                return Err(TransportError::new(
                    TransportErrorKind::Other,
                    "connection reset after request was sent",
                ));
            }
            None => {}
        }

        Ok(self.route(&request))
    }
}

// ============================================================================
// Routing
// ============================================================================

fn body(request: &OutboundRequest) -> Value {
    match &request.body {
        Some(RequestBody::Json(v)) => v.clone(),
        _ => Value::Null,
    }
}

fn not_found(what: &str, id: &str) -> RawResponse {
    RawResponse::json(404, &json!({"message": format!("{} {} not found", what, id)}))
}

fn ok(value: Value) -> RawResponse {
    RawResponse::json(200, &value)
}

fn no_content() -> RawResponse {
    RawResponse::new(204, Vec::new())
}

fn version_json(id: &str, major: bool, comment: Option<&str>, at: &str) -> Value {
    json!({"versionId": id, "major": major, "comment": comment, "author": "fake", "createdDate": at})
}

fn next_label(last: &str, major: bool) -> String {
    let (maj, min) = last.split_once('.').unwrap_or((last, "0"));
    let maj: u32 = maj.parse().unwrap_or(1);
    let min: u32 = min.parse().unwrap_or(0);
    if major {
        format!("{}.0", maj + 1)
    } else {
        format!("{}.{}", maj, min + 1)
    }
}

impl FakeEcm {
    fn route(&self, request: &OutboundRequest) -> RawResponse {
        let path = request.url.trim_start_matches('/').to_string();
        let segments: Vec<&str> = path.split('/').collect();
        let mut s = self.state.lock().unwrap();

        match (request.method, segments.as_slice()) {
            // Documents
            (Method::Post, ["documents"]) => {
                if let Some(key) = request.header("Idempotency-Key") {
                    if let Some(previous) = s.idempotency.get(key) {
                        return ok(previous.clone());
                    }
                }
                let b = body(request);
                let id = s.next("DOC");
                let now = s.tick();
                let content = b["content"].as_str().unwrap_or_default().to_string();
                let doc = json!({
                    "id": id,
                    "title": b["title"],
                    "mimeType": b["mimeType"],
                    "size": content.len(),
                    "createdDate": now,
                    "modifiedDate": now,
                    "author": "gateway",
                    "folderId": b.get("folderId").cloned().unwrap_or(json!("root")),
                    "metadata": b.get("metadata").cloned().unwrap_or(json!({})),
                    "currentVersion": "1.0",
                });
                s.documents.insert(id.clone(), doc.clone());
                s.content.insert(id.clone(), content);
                s.versions
                    .insert(id.clone(), vec![version_json("1.0", true, None, &now)]);
                if let Some(key) = request.header("Idempotency-Key") {
                    s.idempotency.insert(key.to_string(), doc.clone());
                }
                RawResponse::json(201, &doc)
            }
            (Method::Get, ["documents", "recent"]) => {
                let limit: usize = request
                    .query_param("limit")
                    .and_then(|l| l.parse().ok())
                    .unwrap_or(20);
                let folder = request.query_param("folderId");
                let mut docs: Vec<Value> = s
                    .documents
                    .values()
                    .filter(|d| folder.is_none_or(|f| d["folderId"] == f))
                    .cloned()
                    .collect();
                docs.sort_by(|a, b| {
                    b["modifiedDate"]
                        .as_str()
                        .cmp(&a["modifiedDate"].as_str())
                });
                docs.truncate(limit);
                ok(json!({ "documents": docs }))
            }
            (Method::Get, ["documents", id]) => match s.documents.get(*id) {
                Some(doc) => ok(doc.clone()),
                None => not_found("document", id),
            },
            (Method::Patch, ["documents", id]) => {
                let b = body(request);
                let now = s.tick();
                let Some(doc) = s.documents.get_mut(*id) else {
                    return not_found("document", id);
                };
                if let Some(title) = b.get("title") {
                    doc["title"] = title.clone();
                }
                if let Some(Value::Object(fields)) = b.get("metadata") {
                    for (k, v) in fields {
                        doc["metadata"][k] = v.clone();
                    }
                }
                doc["modifiedDate"] = json!(now);
                let doc = doc.clone();
                if let Some(content) = b.get("content").and_then(Value::as_str) {
                    s.content.insert(id.to_string(), content.to_string());
                }
                ok(doc)
            }
            (Method::Delete, ["documents", id]) => match s.documents.remove(*id) {
                Some(_) => {
                    s.content.remove(*id);
                    no_content()
                }
                None => not_found("document", id),
            },
            (Method::Get, ["documents", id, "content"]) => match s.documents.get(*id) {
                Some(doc) => ok(json!({
                    "content": s.content.get(*id).cloned().unwrap_or_default(),
                    "mimeType": doc["mimeType"],
                })),
                None => not_found("document", id),
            },
            (Method::Post, ["documents", id, "content"]) => {
                let b = body(request);
                if !s.documents.contains_key(*id) {
                    return not_found("document", id);
                }
                let now = s.tick();
                let content = b["content"].as_str().unwrap_or_default().to_string();
                if b["createVersion"].as_bool().unwrap_or(true) {
                    let label = push_version(&mut s, id, false, Some("upload"), &now);
                    if let Some(doc) = s.documents.get_mut(*id) {
                        doc["currentVersion"] = json!(label);
                    }
                }
                let doc = s.documents.get_mut(*id).unwrap();
                doc["size"] = json!(content.len());
                doc["modifiedDate"] = json!(now);
                let doc = doc.clone();
                s.content.insert(id.to_string(), content);
                ok(doc)
            }
            (Method::Post, ["documents", id, "move"]) => {
                let target = body(request)["folderId"].clone();
                let target_id = target.as_str().unwrap_or_default().to_string();
                if !s.folders.contains_key(&target_id) {
                    return not_found("folder", &target_id);
                }
                let now = s.tick();
                match s.documents.get_mut(*id) {
                    Some(doc) => {
                        doc["folderId"] = target;
                        doc["modifiedDate"] = json!(now);
                        ok(doc.clone())
                    }
                    None => not_found("document", id),
                }
            }
            (Method::Get, ["documents", id, "metadata"]) => match s.documents.get(*id) {
                Some(doc) => ok(metadata_json(doc)),
                None => not_found("document", id),
            },
            (Method::Patch, ["documents", id, "metadata"]) => {
                let b = body(request);
                let Some(doc) = s.documents.get(*id).cloned() else {
                    return not_found("document", id);
                };
                let fields = b["metadata"].as_object().cloned().unwrap_or_default();
                if let Some(schema) = doc["documentType"].as_str().and_then(|t| s.schemas.get(t)) {
                    let known: Vec<&str> = schema["fields"]
                        .as_array()
                        .map(|f| f.iter().filter_map(|f| f["name"].as_str()).collect())
                        .unwrap_or_default();
                    if let Some(unknown) = fields.keys().find(|k| !known.contains(&k.as_str())) {
                        return RawResponse::json(
                            422,
                            &json!({"message": format!("unknown metadata field '{}'", unknown)}),
                        );
                    }
                }
                let now = s.tick();
                let doc = s.documents.get_mut(*id).unwrap();
                for (k, v) in fields {
                    doc["metadata"][k] = v;
                }
                doc["modifiedDate"] = json!(now);
                ok(metadata_json(doc))
            }
            (Method::Get, ["documents", id, "versions"]) => {
                let Some(doc) = s.documents.get(*id) else {
                    return not_found("document", id);
                };
                ok(json!({
                    "versions": s.versions.get(*id).cloned().unwrap_or_default(),
                    "currentVersion": doc["currentVersion"],
                }))
            }
            (Method::Post, ["documents", id, "versions"]) => {
                if !s.documents.contains_key(*id) {
                    return not_found("document", id);
                }
                let b = body(request);
                let now = s.tick();
                let major = b["major"].as_bool().unwrap_or(false);
                let comment = b["comment"].as_str().map(str::to_string);
                let label = push_version(&mut s, id, major, comment.as_deref(), &now);
                if let Some(doc) = s.documents.get_mut(*id) {
                    doc["currentVersion"] = json!(label);
                }
                let created = s.versions[*id].last().cloned().unwrap();
                RawResponse::json(201, &created)
            }
            (Method::Post, ["documents", id, "restore"]) => {
                let version_id = body(request)["versionId"].clone();
                let exists = s
                    .versions
                    .get(*id)
                    .is_some_and(|v| v.iter().any(|v| v["versionId"] == version_id));
                if !exists {
                    return not_found("version", version_id.as_str().unwrap_or_default());
                }
                if let Some(doc) = s.documents.get_mut(*id) {
                    doc["currentVersion"] = version_id;
                }
                no_content()
            }

            // Search
            (Method::Get, ["search"]) => {
                let q = request.query_param("q").unwrap_or_default().to_lowercase();
                let limit: usize = request
                    .query_param("limit")
                    .and_then(|l| l.parse().ok())
                    .unwrap_or(20);
                let hits: Vec<Value> = s
                    .documents
                    .values()
                    .filter(|d| {
                        d["title"]
                            .as_str()
                            .is_some_and(|t| t.to_lowercase().contains(&q))
                    })
                    .cloned()
                    .collect();
                let total = hits.len();
                let page: Vec<Value> = hits.into_iter().take(limit).collect();
                ok(json!({"results": page, "total": total}))
            }
            (Method::Post, ["search", "advanced"]) => {
                let b = body(request);
                let q = b["query"].as_str().map(str::to_lowercase);
                let folder = b["folderId"].as_str();
                let mimes: Vec<&str> = b["mimeTypes"]
                    .as_array()
                    .map(|m| m.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                let limit = b["limit"].as_u64().unwrap_or(20) as usize;
                let hits: Vec<Value> = s
                    .documents
                    .values()
                    .filter(|d| {
                        q.as_deref().is_none_or(|q| {
                            d["title"]
                                .as_str()
                                .is_some_and(|t| t.to_lowercase().contains(q))
                        })
                    })
                    .filter(|d| folder.is_none_or(|f| d["folderId"] == f))
                    .filter(|d| {
                        mimes.is_empty()
                            || d["mimeType"].as_str().is_some_and(|m| mimes.contains(&m))
                    })
                    .cloned()
                    .collect();
                let total = hits.len();
                ok(json!({"results": hits.into_iter().take(limit).collect::<Vec<_>>(), "total": total}))
            }

            // Folders
            (Method::Post, ["folders"]) => {
                let b = body(request);
                let parent = b["parentId"].as_str().unwrap_or("root").to_string();
                if !s.folders.contains_key(&parent) {
                    return not_found("folder", &parent);
                }
                let id = s.next("FLD");
                let folder = json!({
                    "id": id,
                    "name": b["name"],
                    "parentId": parent,
                    "description": b["description"],
                });
                s.folders.insert(id, folder.clone());
                RawResponse::json(201, &folder)
            }
            (Method::Get, ["folders", "tree"]) => {
                let root = request.query_param("folderId").unwrap_or("root");
                let depth: u32 = request
                    .query_param("maxDepth")
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(3);
                if !s.folders.contains_key(root) {
                    return not_found("folder", root);
                }
                ok(tree_json(&s, root, depth))
            }
            (Method::Get, ["folders", id]) => match s.folders.get(*id) {
                Some(folder) => ok(folder.clone()),
                None => not_found("folder", id),
            },
            (Method::Get, ["folders", id, "contents"]) => {
                if !s.folders.contains_key(*id) {
                    return not_found("folder", id);
                }
                let documents: Vec<Value> = s
                    .documents
                    .values()
                    .filter(|d| d["folderId"] == *id)
                    .cloned()
                    .collect();
                let folders: Vec<Value> = s
                    .folders
                    .values()
                    .filter(|f| f["parentId"] == *id)
                    .cloned()
                    .collect();
                ok(json!({"documents": documents, "folders": folders}))
            }
            (Method::Delete, ["folders", id]) => {
                if !s.folders.contains_key(*id) {
                    return not_found("folder", id);
                }
                let recursive = request.query_param("recursive") == Some("true");
                let doomed = subtree(&s, id);
                let has_children = s.documents.values().any(|d| d["folderId"] == *id)
                    || doomed.len() > 1;
                if has_children && !recursive {
                    return RawResponse::json(409, &json!({"message": "Folder is not empty"}));
                }
                for folder in &doomed {
                    s.folders.remove(folder);
                }
                s.documents
                    .retain(|_, d| !doomed.iter().any(|f| d["folderId"] == f.as_str()));
                no_content()
            }

            // Metadata schemas
            (Method::Get, ["metadata", "schemas", document_type]) => {
                match s.schemas.get(*document_type) {
                    Some(schema) => ok(schema.clone()),
                    None => not_found("schema", document_type),
                }
            }

            // Workflows
            (Method::Post, ["workflows"]) => {
                let b = body(request);
                let document_id = b["documentId"].as_str().unwrap_or_default().to_string();
                if !s.documents.contains_key(&document_id) {
                    return not_found("document", &document_id);
                }
                let id = s.next("WF");
                let now = s.tick();
                let workflow = json!({
                    "id": id,
                    "workflowName": b["workflowName"],
                    "documentId": document_id,
                    "status": "in_progress",
                    "parameters": b.get("parameters").cloned().unwrap_or(json!({})),
                    "history": [{"action": "start", "actor": "gateway", "timestamp": now}],
                });
                s.workflows.insert(id, workflow.clone());
                RawResponse::json(201, &workflow)
            }
            (Method::Get, ["workflows", id]) => match s.workflows.get(*id) {
                Some(wf) => ok(wf.clone()),
                None => not_found("workflow", id),
            },
            (Method::Post, ["workflows", id, "action"]) => {
                let b = body(request);
                let now = s.tick();
                let Some(wf) = s.workflows.get_mut(*id) else {
                    return not_found("workflow", id);
                };
                if wf["status"] != "in_progress" {
                    return RawResponse::json(
                        409,
                        &json!({"message": format!("workflow is {}", wf["status"])}),
                    );
                }
                let (status, comment) = match b["action"].as_str() {
                    Some("approve") => ("approved", b["comment"].clone()),
                    Some("reject") => ("rejected", b["reason"].clone()),
                    _ => return RawResponse::json(400, &json!({"message": "unknown action"})),
                };
                wf["status"] = json!(status);
                if let Some(history) = wf["history"].as_array_mut() {
                    history.push(json!({
                        "action": b["action"],
                        "actor": "gateway",
                        "timestamp": now,
                        "comment": comment,
                    }));
                }
                no_content()
            }

            _ => RawResponse::json(404, &json!({"message": format!("no route for {}", request.url)})),
        }
    }
}

fn push_version(s: &mut State, id: &str, major: bool, comment: Option<&str>, at: &str) -> String {
    let history = s.versions.entry(id.to_string()).or_default();
    let last = history
        .last()
        .and_then(|v| v["versionId"].as_str())
        .unwrap_or("0.0")
        .to_string();
    let label = next_label(&last, major);
    history.push(version_json(&label, major, comment, at));
    label
}

fn metadata_json(doc: &Value) -> Value {
    json!({
        "documentId": doc["id"],
        "documentType": doc["documentType"],
        "metadata": doc["metadata"],
    })
}

fn subtree(s: &State, root: &str) -> Vec<String> {
    let mut out = vec![root.to_string()];
    let mut i = 0;
    while i < out.len() {
        let current = out[i].clone();
        out.extend(
            s.folders
                .values()
                .filter(|f| f["parentId"] == current.as_str())
                .filter_map(|f| f["id"].as_str().map(str::to_string)),
        );
        i += 1;
    }
    out
}

fn tree_json(s: &State, id: &str, depth: u32) -> Value {
    let mut node = s.folders.get(id).cloned().unwrap_or(json!({"id": id}));
    let children: Vec<Value> = if depth > 1 {
        s.folders
            .values()
            .filter(|f| f["parentId"] == id)
            .filter_map(|f| f["id"].as_str())
            .map(|child| tree_json(s, child, depth - 1))
            .collect()
    } else {
        Vec::new()
    };
    if let Value::Object(map) = &mut node {
        map.insert("children".into(), Value::Array(children));
    }
    node
}

// ============================================================================
// Gateway construction
// ============================================================================

/// Config with an API key, fast retries and caching on.
pub fn config() -> Config {
    let mut config = Config {
        auth: AuthConfig::ApiKey {
            key: "test-key".into(),
            header_name: "X-API-Key".into(),
        },
        ..Default::default()
    };
    config.retry = RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 1,
        max_delay_ms: 5,
    };
    config
}

pub fn oauth_config() -> Config {
    let mut config = config();
    config.auth = AuthConfig::OAuth2 {
        client_id: "gateway".into(),
        client_secret: "s3cret".into(),
        token_url: format!("https://idp.example.com{}", TOKEN_PATH),
        scopes: vec!["ecm".into()],
        refresh_margin_secs: 300,
    };
    config
}

pub fn gateway_with(config: &Config, ecm: &Arc<FakeEcm>) -> Gateway {
    Gateway::with_transport(config, ecm.clone(), None).unwrap()
}

pub fn gateway(ecm: &Arc<FakeEcm>) -> Gateway {
    gateway_with(&config(), ecm)
}

