//! Version history operations.

use super::{require_id, EcmOperations};
use crate::audit::AuditCategory;
use crate::domain::{NewVersion, Version, VersionHistory};
use crate::error::{Failure, GatewayError, Result};

impl EcmOperations {
    /// Version history, oldest first.
    pub async fn get_versions(&self, id: &str) -> Result<VersionHistory> {
        let id = require_id("document_id", id)?;
        self.backend.versions(id).await
    }

    pub async fn create_version(&self, id: &str, version: NewVersion) -> Result<Version> {
        let id = require_id("document_id", id)?;
        let result = self.backend.create_version(id, &version).await;
        self.invalidate(id);
        self.audit(AuditCategory::VersionChange, "create_version", id, &result);
        result
    }

    /// Make `version_id` current. History is kept; the version must exist.
    pub async fn restore_version(&self, id: &str, version_id: &str) -> Result<VersionHistory> {
        let id = require_id("document_id", id)?;
        let version_id = require_id("version_id", version_id)?;

        let history = self.backend.versions(id).await?;
        if !history.contains(version_id) {
            return Err(GatewayError::NotFound(
                Failure::new(format!("version {} of document {} does not exist", version_id, id))
                    .operation("restore_version")
                    .entity(id),
            ));
        }

        let result = self.backend.restore_version(id, version_id).await;
        self.invalidate(id);
        self.audit(AuditCategory::VersionChange, "restore_version", id, &result);
        result?;
        self.backend.versions(id).await
    }
}
