//! Search operations. Results are never cached.

use super::{require_id, EcmOperations};
use crate::domain::{Document, SearchFilters, SearchResults};
use crate::error::{GatewayError, Result};

impl EcmOperations {
    /// Clamp a requested result count to `[1, max_search_results]`.
    pub(crate) fn clamp_results(&self, requested: Option<u32>) -> u32 {
        let ceiling = self.settings.max_search_results.max(1);
        requested
            .unwrap_or(self.settings.default_page_size)
            .clamp(1, ceiling)
    }

    /// Free-text search.
    pub async fn search(
        &self,
        query: &str,
        max_results: Option<u32>,
        offset: Option<u32>,
    ) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "query must not be empty".into(),
            ));
        }
        let limit = self.clamp_results(max_results);
        let mut results = self.backend.search(query, limit, offset.unwrap_or(0)).await?;
        results.documents.truncate(limit as usize);
        Ok(results)
    }

    /// Structured search. At least one criterion is required.
    pub async fn advanced_search(&self, filters: SearchFilters) -> Result<SearchResults> {
        if filters.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "advanced_search needs a query or at least one filter".into(),
            ));
        }
        filters.validate()?;
        let limit = self.clamp_results(filters.max_results);
        let mut results = self.backend.advanced_search(&filters, limit).await?;
        results.documents.truncate(limit as usize);
        Ok(results)
    }

    /// Most recently modified documents, newest first.
    pub async fn get_recent_documents(
        &self,
        limit: Option<u32>,
        folder_id: Option<&str>,
    ) -> Result<Vec<Document>> {
        let folder_id = folder_id.map(|f| require_id("folder_id", f)).transpose()?;
        let limit = self.clamp_results(limit);
        let mut documents = self.backend.recent_documents(limit, folder_id).await?;
        documents.truncate(limit as usize);
        Ok(documents)
    }
}
