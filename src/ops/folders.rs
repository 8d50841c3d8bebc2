//! Folder operations.

use tracing::debug;

use super::{
    require_id, require_text, CachedEntity, EcmOperations, DEFAULT_TREE_DEPTH, DOCUMENT_PREFIX,
    TREE_PREFIX,
};
use crate::audit::AuditCategory;
use crate::domain::{ContentsFilter, Document, Folder, FolderContents, FolderTree, NewFolder};
use crate::error::{Failure, GatewayError, Result};

/// Root segment used in tree cache keys when no root folder is given.
const ROOT_SEGMENT: &str = "-root-";

pub(crate) fn tree_key(root: Option<&str>, depth: u32) -> String {
    format!("{}{}:{}", TREE_PREFIX, root.unwrap_or(ROOT_SEGMENT), depth)
}

impl EcmOperations {
    pub async fn create_folder(&self, new: NewFolder) -> Result<Folder> {
        require_text("name", &new.name)?;
        if let Some(parent) = &new.parent_id {
            require_id("parent_id", parent)?;
        }
        let result = self.backend.create_folder(&new).await;
        let entity = result.as_ref().map(|f| f.id.as_str()).unwrap_or("");
        self.audit(AuditCategory::FolderChange, "create_folder", entity, &result);
        let folder = result?;
        self.invalidate(new.parent_id.as_deref().unwrap_or(ROOT_SEGMENT));
        Ok(folder)
    }

    pub async fn get_folder(&self, id: &str) -> Result<Folder> {
        let id = require_id("folder_id", id)?;
        self.backend.get_folder(id).await
    }

    pub async fn list_folder_contents(
        &self,
        id: &str,
        filter: ContentsFilter,
    ) -> Result<FolderContents> {
        let id = require_id("folder_id", id)?;
        self.backend.folder_contents(id, filter).await
    }

    pub async fn move_document(&self, id: &str, target_folder_id: &str) -> Result<Document> {
        let id = require_id("document_id", id)?;
        let target = require_id("target_folder_id", target_folder_id)?;
        let result = self.backend.move_document(id, target).await;
        self.invalidate(id);
        self.invalidate(target);
        self.audit(AuditCategory::DocumentChange, "move_document", id, &result);
        result
    }

    /// Folder hierarchy under `root` (the repository root when `None`).
    ///
    /// `max_depth` defaults to 3 and is capped at the configured ceiling.
    pub async fn get_folder_tree(
        &self,
        root: Option<&str>,
        max_depth: Option<u32>,
    ) -> Result<FolderTree> {
        let root = root.map(|r| require_id("folder_id", r)).transpose()?;
        let depth = max_depth.unwrap_or(DEFAULT_TREE_DEPTH);
        if depth == 0 {
            return Err(GatewayError::InvalidArgument(
                "max_depth must be at least 1".into(),
            ));
        }
        let depth = depth.min(self.settings.max_folder_depth.max(1));

        let key = tree_key(root, depth);
        if let Some(CachedEntity::Tree(tree)) = self.cache.get(&key) {
            debug!(key = %key, "Folder tree served from cache");
            return Ok(tree);
        }
        let tree = self.backend.folder_tree(root, depth).await?;
        let ttl = self.settings.folder_tree_ttl;
        match root {
            Some(root) => self.cache.put_entity(&key, root, CachedEntity::Tree(tree.clone()), ttl),
            None => self.cache.put(&key, CachedEntity::Tree(tree.clone()), ttl),
        }
        Ok(tree)
    }

    /// Delete a folder.
    ///
    /// Without `recursive` the folder must be empty, otherwise the call fails
    /// with `FolderNotEmpty` and nothing is deleted. A recursive delete drops
    /// every cached document snapshot, since any of them may have been inside.
    pub async fn delete_folder(&self, id: &str, recursive: bool) -> Result<()> {
        let id = require_id("folder_id", id)?;
        if !recursive {
            let contents = self
                .backend
                .folder_contents(id, ContentsFilter::default())
                .await?;
            if !contents.is_empty() {
                let err = GatewayError::FolderNotEmpty(
                    Failure::new(format!(
                        "folder {} contains {} documents and {} subfolders; pass recursive=true to delete them",
                        id,
                        contents.documents.len(),
                        contents.folders.len()
                    ))
                    .operation("delete_folder")
                    .entity(id),
                );
                let refused: Result<()> = Err(err.clone());
                self.audit(AuditCategory::FolderChange, "delete_folder", id, &refused);
                return Err(err);
            }
        }
        let result = self.backend.delete_folder(id, recursive).await;
        self.invalidate(id);
        if recursive {
            let dropped = self.cache.invalidate_prefix(DOCUMENT_PREFIX);
            debug!(folder_id = id, dropped = dropped, "Dropped document snapshots after recursive delete");
        }
        self.audit(AuditCategory::FolderChange, "delete_folder", id, &result);
        result
    }
}
