//! Document operations.

use tracing::debug;

use super::{require_id, require_text, CachedEntity, EcmOperations, DOCUMENT_PREFIX};
use crate::audit::AuditCategory;
use crate::domain::requests::decode_content;
use crate::domain::{ContentUpload, DeleteOutcome, Document, DocumentContent, DocumentUpdate, NewDocument};
use crate::error::{GatewayError, Result};

pub(crate) fn document_key(id: &str) -> String {
    format!("{}{}", DOCUMENT_PREFIX, id)
}

impl EcmOperations {
    pub async fn create_document(&self, new: NewDocument) -> Result<Document> {
        require_text("title", &new.title)?;
        if let Some(folder) = &new.folder_id {
            require_id("folder_id", folder)?;
        }
        if let Some(content) = &new.content {
            decode_content(content, new.encoding)?;
        }

        let result = self.backend.create_document(&new).await;
        let entity = result.as_ref().map(|d| d.id.as_str()).unwrap_or("");
        self.audit(AuditCategory::DocumentChange, "create_document", entity, &result);
        let doc = result?;
        if let Some(folder) = &doc.folder_id {
            self.invalidate(folder);
        }
        Ok(doc)
    }

    /// Read a document, served from cache while its snapshot is fresh.
    pub async fn get_document(&self, id: &str) -> Result<Document> {
        let id = require_id("document_id", id)?;
        let key = document_key(id);
        if let Some(CachedEntity::Document(doc)) = self.cache.get(&key) {
            debug!(document_id = id, "Document served from cache");
            return Ok(doc);
        }
        let doc = self.backend.get_document(id).await?;
        self.cache
            .put_entity(&key, id, CachedEntity::Document(doc.clone()), self.settings.cache_ttl);
        Ok(doc)
    }

    pub async fn update_document(&self, id: &str, update: DocumentUpdate) -> Result<Document> {
        let id = require_id("document_id", id)?;
        if update.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "update_document needs at least one of title, content or metadata".into(),
            ));
        }
        if let Some(title) = &update.title {
            require_text("title", title)?;
        }

        let result = self.backend.update_document(id, &update).await;
        self.invalidate(id);
        self.audit(AuditCategory::DocumentChange, "update_document", id, &result);
        result
    }

    /// Delete a document. An absent id fails with `NotFound`.
    pub async fn delete_document(&self, id: &str) -> Result<DeleteOutcome> {
        let id = require_id("document_id", id)?;
        let result = self.backend.delete_document(id).await;
        self.invalidate(id);
        self.audit(AuditCategory::DocumentChange, "delete_document", id, &result);
        result?;
        Ok(DeleteOutcome {
            id: id.to_string(),
            deleted: true,
        })
    }

    pub async fn upload_document(&self, id: &str, upload: ContentUpload) -> Result<Document> {
        let id = require_id("document_id", id)?;
        upload.bytes()?;

        let result = self.backend.upload_content(id, &upload).await;
        self.invalidate(id);
        self.audit(AuditCategory::DocumentChange, "upload_document", id, &result);
        result
    }

    pub async fn download_document(&self, id: &str) -> Result<DocumentContent> {
        let id = require_id("document_id", id)?;
        self.backend.download_content(id).await
    }
}
