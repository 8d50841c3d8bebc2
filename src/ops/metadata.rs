//! Metadata operations with schema validation.

use tracing::{debug, warn};

use super::{require_id, CachedEntity, EcmOperations};
use crate::audit::AuditCategory;
use crate::domain::{DocumentMetadata, MetadataMap, MetadataSchema};
use crate::error::{ErrorKind, GatewayError, Result};

pub(crate) fn schema_key(document_type: &str) -> String {
    format!("schema:{}", document_type)
}

/// Schema lookup failures that let an update proceed un-validated.
fn schema_unavailable(err: &GatewayError) -> bool {
    err.is_transient() || err.kind() == ErrorKind::RetriesExhausted
}

impl EcmOperations {
    pub async fn get_metadata(&self, id: &str) -> Result<DocumentMetadata> {
        let id = require_id("document_id", id)?;
        self.backend.get_metadata(id).await
    }

    /// Field descriptors for `document_type`, cached for the configured TTL.
    pub async fn get_metadata_schema(&self, document_type: &str) -> Result<MetadataSchema> {
        let document_type = require_id("document_type", document_type)?;
        let key = schema_key(document_type);
        if let Some(CachedEntity::Schema(schema)) = self.cache.get(&key) {
            debug!(document_type = document_type, "Schema served from cache");
            return Ok(schema);
        }
        let schema = self.backend.metadata_schema(document_type).await?;
        self.cache
            .put(&key, CachedEntity::Schema(schema.clone()), self.settings.cache_ttl);
        Ok(schema)
    }

    /// Write metadata fields after checking them against the document type's schema.
    ///
    /// The type comes from `document_type` or, when absent, from the
    /// document's current metadata. Unknown fields fail with
    /// `InvalidArgument` before any write. When the schema cannot be fetched
    /// (transient failure or exhausted retries) the update is sent
    /// un-validated and the backend has the final say. A missing schema is
    /// returned as `NotFound`.
    pub async fn update_metadata(
        &self,
        id: &str,
        fields: MetadataMap,
        document_type: Option<&str>,
    ) -> Result<DocumentMetadata> {
        let id = require_id("document_id", id)?;
        if fields.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "metadata must contain at least one field".into(),
            ));
        }

        let document_type = match document_type {
            Some(t) => Some(require_id("document_type", t)?.to_string()),
            None => self.backend.get_metadata(id).await?.document_type,
        };

        match document_type {
            Some(document_type) => match self.get_metadata_schema(&document_type).await {
                Ok(schema) => {
                    let unknown = schema.unknown_fields(fields.keys());
                    if !unknown.is_empty() {
                        return Err(GatewayError::InvalidArgument(format!(
                            "fields not defined for document type '{}': {}",
                            document_type,
                            unknown.join(", ")
                        )));
                    }
                }
                Err(e) if schema_unavailable(&e) => {
                    warn!(
                        document_id = id,
                        document_type = %document_type,
                        error = %e,
                        "Schema unavailable, sending metadata update un-validated"
                    );
                }
                Err(e) => return Err(e),
            },
            None => debug!(document_id = id, "Document has no type, skipping schema validation"),
        }

        let result = self.backend.update_metadata(id, &fields).await;
        self.invalidate(id);
        self.audit(AuditCategory::MetadataChange, "update_metadata", id, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::domain::FieldDescriptor;
    use crate::error::Failure;
    use crate::ops::fake::{doc, ops, FakeBackend};

    fn invoice_schema() -> MetadataSchema {
        MetadataSchema {
            document_type: "invoice".into(),
            fields: ["amount", "vendor"]
                .iter()
                .map(|name| FieldDescriptor {
                    name: name.to_string(),
                    field_type: "string".into(),
                    required: false,
                    validation: None,
                })
                .collect(),
        }
    }

    fn backend(schema_error: Option<GatewayError>) -> Arc<FakeBackend> {
        Arc::new(FakeBackend::with(|s| {
            s.documents.insert("DOC-1".into(), doc("DOC-1", "Invoice", None));
            s.schemas.insert("invoice".into(), invoice_schema());
            s.schema_error = schema_error;
        }))
    }

    fn fields(pairs: &[(&str, serde_json::Value)]) -> MetadataMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn test_unknown_field_rejected_before_write() {
        let backend = backend(None);
        let ops = ops(backend.clone());
        let err = ops
            .update_metadata("DOC-1", fields(&[("color", json!("red"))]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
        assert!(err.to_string().contains("color"));
        assert_eq!(backend.count("update_metadata"), 0);
    }

    #[tokio::test]
    async fn test_known_fields_written() {
        let backend = backend(None);
        let ops = ops(backend.clone());
        let meta = ops
            .update_metadata("DOC-1", fields(&[("amount", json!(120))]), Some("invoice"))
            .await
            .unwrap();
        assert_eq!(meta.fields["amount"], json!(120));
        assert_eq!(backend.count("get_metadata"), 0);
    }

    #[tokio::test]
    async fn test_transient_schema_failure_sends_unvalidated() {
        let backend = backend(Some(GatewayError::Transient(Failure::new("503").status(503))));
        let ops = ops(backend.clone());
        ops.update_metadata("DOC-1", fields(&[("color", json!("red"))]), None)
            .await
            .unwrap();
        assert_eq!(backend.count("update_metadata"), 1);
    }

    #[tokio::test]
    async fn test_auth_schema_failure_propagates() {
        let backend = backend(Some(GatewayError::Auth(Failure::new("denied").status(403))));
        let ops = ops(backend.clone());
        let err = ops
            .update_metadata("DOC-1", fields(&[("amount", json!(1))]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Auth(_)));
        assert_eq!(backend.count("update_metadata"), 0);
    }

    #[tokio::test]
    async fn test_missing_schema_is_not_found() {
        let backend = backend(None);
        let ops = ops(backend.clone());
        let err = ops
            .update_metadata("DOC-1", fields(&[("amount", json!(1))]), Some("contract"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(backend.count("update_metadata"), 0);
    }

    #[tokio::test]
    async fn test_schema_cached() {
        let backend = backend(None);
        let ops = ops(backend.clone());
        ops.get_metadata_schema("invoice").await.unwrap();
        ops.get_metadata_schema("invoice").await.unwrap();
        assert_eq!(backend.count("metadata_schema"), 1);
    }

    #[tokio::test]
    async fn test_empty_update_rejected() {
        let ops = ops(backend(None));
        assert!(matches!(
            ops.update_metadata("DOC-1", MetadataMap::new(), None).await,
            Err(GatewayError::InvalidArgument(_))
        ));
    }
}
