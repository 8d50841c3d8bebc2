//! Domain operation mapper.
//!
//! [`EcmOperations`] is the layer between the gateway facade and a backend
//! adapter. Every operation validates its input before any backend call,
//! consults and invalidates the response cache, enforces state preconditions
//! (empty folders, existing versions, in-progress workflows) and emits an
//! audit event for every change it attempts.
//!
//! Operations are grouped by entity:
//!
//! - [`documents`]: create, read, update, delete, upload, download
//! - [`search`]: free-text, structured and recent-documents queries
//! - [`folders`]: create, read, list, move, tree, delete
//! - [`metadata`]: read, schema-validated update, schema lookup
//! - [`versions`]: list, create, restore
//! - [`workflows`]: start, status, approve, reject

pub mod documents;
pub mod folders;
pub mod metadata;
pub mod search;
pub mod versions;
pub mod workflows;

use std::sync::Arc;
use std::time::Duration;

use crate::audit::{log_audit_event, AuditCategory, AuditRecord};
use crate::backend::EcmBackend;
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::domain::{Document, FolderTree, MetadataSchema};
use crate::error::{GatewayError, Result};

/// Depth used by `get_folder_tree` when the caller does not give one.
pub const DEFAULT_TREE_DEPTH: u32 = 3;

/// Cache key prefix for document snapshots.
pub(crate) const DOCUMENT_PREFIX: &str = "document:";

/// Cache key prefix for folder trees.
pub(crate) const TREE_PREFIX: &str = "folder_tree:";

/// Tunables for the operation mapper, derived from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct OpsSettings {
    /// TTL for cached document reads and schemas.
    pub cache_ttl: Duration,
    /// TTL for cached folder trees.
    pub folder_tree_ttl: Duration,
    /// Capacity of the response cache; 0 disables caching.
    pub cache_max_entries: usize,
    /// Ceiling applied to every search result count.
    pub max_search_results: u32,
    /// Result count when the caller gives none.
    pub default_page_size: u32,
    /// Ceiling applied to folder tree depth.
    pub max_folder_depth: u32,
    /// Emit audit events for mutating operations.
    pub audit: bool,
}

impl Default for OpsSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            folder_tree_ttl: Duration::from_secs(30),
            cache_max_entries: 1000,
            max_search_results: 100,
            default_page_size: 20,
            max_folder_depth: 10,
            audit: true,
        }
    }
}

impl OpsSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
            folder_tree_ttl: Duration::from_secs(config.cache.folder_tree_ttl_secs),
            cache_max_entries: if config.cache.enabled {
                config.cache.max_entries
            } else {
                0
            },
            max_search_results: config.limits.max_search_results,
            default_page_size: config.limits.default_page_size,
            max_folder_depth: config.limits.max_folder_depth,
            audit: config.audit.enabled,
        }
    }
}

/// A snapshot held in the response cache.
#[derive(Debug, Clone)]
pub enum CachedEntity {
    Document(Document),
    Schema(MetadataSchema),
    Tree(FolderTree),
}

/// Validated, cached, audited access to an [`EcmBackend`].
pub struct EcmOperations {
    backend: Arc<dyn EcmBackend>,
    cache: ResponseCache<CachedEntity>,
    settings: OpsSettings,
}

impl std::fmt::Debug for EcmOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcmOperations")
            .field("profile", &self.backend.profile())
            .field("cache_entries", &self.cache.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl EcmOperations {
    pub fn new(backend: Arc<dyn EcmBackend>, settings: OpsSettings) -> Self {
        Self {
            cache: ResponseCache::new(settings.cache_max_entries),
            backend,
            settings,
        }
    }

    pub fn backend(&self) -> &dyn EcmBackend {
        self.backend.as_ref()
    }

    pub fn settings(&self) -> &OpsSettings {
        &self.settings
    }

    /// Live entries in the response cache.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached snapshot mentioning `entity_id`, plus all folder trees.
    fn invalidate(&self, entity_id: &str) {
        let removed = self.cache.invalidate_entity(entity_id) + self.cache.invalidate_prefix(TREE_PREFIX);
        if removed > 0 {
            tracing::debug!(entity_id = entity_id, removed = removed, "Invalidated cached snapshots");
        }
    }

    /// Record the outcome of a mutating operation.
    fn audit<T>(
        &self,
        category: AuditCategory,
        operation: &str,
        entity_id: &str,
        result: &Result<T>,
    ) {
        if !self.settings.audit {
            return;
        }
        let detail = match result {
            Ok(_) => String::new(),
            Err(e) => e.to_string(),
        };
        log_audit_event(&AuditRecord {
            category,
            operation,
            entity_id,
            detail: &detail,
            succeeded: result.is_ok(),
        });
    }
}

/// Trimmed, non-empty identifier or `InvalidArgument` naming `field`.
///
/// `.` and `..` are refused: URL parsers collapse them as dot segments even
/// when escaped, so they could never address a single entity.
pub(crate) fn require_id<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = require_text(field, value)?;
    if trimmed == "." || trimmed == ".." {
        return Err(GatewayError::InvalidArgument(format!(
            "{} '{}' is not a valid identifier",
            field, trimmed
        )));
    }
    Ok(trimmed)
}

/// Non-empty text or `InvalidArgument` naming `field`.
pub(crate) fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::InvalidArgument(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(trimmed)
}
