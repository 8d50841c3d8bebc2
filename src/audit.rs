//! Structured audit logging for mutating gateway operations.
//!
//! Emits structured `tracing` events with consistent field names so that
//! downstream log aggregators can filter on `audit=true` and query by
//! `category`, `operation`, `entity_id` and `outcome`.

use tracing::{error, info, warn};

/// Broad category of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditCategory {
    /// Document created, updated, moved, deleted or its content replaced.
    DocumentChange,
    /// Folder created or deleted.
    FolderChange,
    /// Metadata fields written.
    MetadataChange,
    /// Version created or restored.
    VersionChange,
    /// Workflow started, approved or rejected.
    WorkflowDecision,
}

impl std::fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentChange => write!(f, "document_change"),
            Self::FolderChange => write!(f, "folder_change"),
            Self::MetadataChange => write!(f, "metadata_change"),
            Self::VersionChange => write!(f, "version_change"),
            Self::WorkflowDecision => write!(f, "workflow_decision"),
        }
    }
}

/// Severity level for audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSeverity {
    /// The change was applied.
    Info,
    /// The change was refused or only partly applied.
    Warning,
    /// The change destroyed data (deletes).
    Critical,
}

impl std::fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One audited change.
#[derive(Debug, Clone, Copy)]
pub struct AuditRecord<'a> {
    pub category: AuditCategory,
    pub operation: &'a str,
    pub entity_id: &'a str,
    pub detail: &'a str,
    pub succeeded: bool,
}

impl AuditRecord<'_> {
    /// Severity derived from the outcome; successful deletes are critical.
    pub fn severity(&self) -> AuditSeverity {
        if !self.succeeded {
            AuditSeverity::Warning
        } else if self.operation.starts_with("delete_") {
            AuditSeverity::Critical
        } else {
            AuditSeverity::Info
        }
    }
}

/// Emit a structured audit event via `tracing`.
///
/// All audit events carry `audit = true` so log pipelines can filter on them.
pub fn log_audit_event(record: &AuditRecord<'_>) {
    let severity = record.severity();
    let outcome = if record.succeeded { "applied" } else { "failed" };
    match severity {
        AuditSeverity::Info => {
            info!(
                audit = true,
                category = %record.category,
                severity = %severity,
                operation = record.operation,
                entity_id = record.entity_id,
                detail = record.detail,
                outcome = outcome,
                "audit event"
            );
        }
        AuditSeverity::Warning => {
            warn!(
                audit = true,
                category = %record.category,
                severity = %severity,
                operation = record.operation,
                entity_id = record.entity_id,
                detail = record.detail,
                outcome = outcome,
                "audit event"
            );
        }
        AuditSeverity::Critical => {
            error!(
                audit = true,
                category = %record.category,
                severity = %severity,
                operation = record.operation,
                entity_id = record.entity_id,
                detail = record.detail,
                outcome = outcome,
                "audit event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(operation: &str, succeeded: bool) -> AuditRecord<'_> {
        AuditRecord {
            category: AuditCategory::DocumentChange,
            operation,
            entity_id: "DOC-1",
            detail: "",
            succeeded,
        }
    }

    #[test]
    fn test_audit_category_display() {
        assert_eq!(AuditCategory::DocumentChange.to_string(), "document_change");
        assert_eq!(AuditCategory::FolderChange.to_string(), "folder_change");
        assert_eq!(AuditCategory::MetadataChange.to_string(), "metadata_change");
        assert_eq!(AuditCategory::VersionChange.to_string(), "version_change");
        assert_eq!(
            AuditCategory::WorkflowDecision.to_string(),
            "workflow_decision"
        );
    }

    #[test]
    fn test_audit_severity_display() {
        assert_eq!(AuditSeverity::Info.to_string(), "info");
        assert_eq!(AuditSeverity::Warning.to_string(), "warning");
        assert_eq!(AuditSeverity::Critical.to_string(), "critical");
    }

    #[test]
    fn test_severity_from_outcome() {
        assert_eq!(record("update_document", true).severity(), AuditSeverity::Info);
        assert_eq!(record("delete_document", true).severity(), AuditSeverity::Critical);
        assert_eq!(record("delete_document", false).severity(), AuditSeverity::Warning);
    }

    #[test]
    fn test_log_audit_event_each_severity() {
        // Should not panic at any level.
        log_audit_event(&record("create_document", true));
        log_audit_event(&record("delete_folder", true));
        log_audit_event(&record("approve_workflow", false));
    }
}
