//! Workflow operations. Workflow state is owned by the backend and polled.

use super::{require_id, require_text, EcmOperations};
use crate::audit::AuditCategory;
use crate::domain::{NewWorkflow, Workflow, WorkflowAction};
use crate::error::{Failure, GatewayError, Result};

impl EcmOperations {
    pub async fn start_workflow(&self, new: NewWorkflow) -> Result<Workflow> {
        require_id("document_id", &new.document_id)?;
        require_text("workflow_name", &new.workflow_name)?;
        let result = self.backend.start_workflow(&new).await;
        let entity = result.as_ref().map(|w| w.id.as_str()).unwrap_or(new.document_id.as_str());
        self.audit(AuditCategory::WorkflowDecision, "start_workflow", entity, &result);
        result
    }

    pub async fn get_workflow_status(&self, id: &str) -> Result<Workflow> {
        let id = require_id("workflow_id", id)?;
        self.backend.workflow(id).await
    }

    pub async fn approve_workflow(&self, id: &str, comment: Option<String>) -> Result<Workflow> {
        self.decide("approve_workflow", id, WorkflowAction::Approve { comment })
            .await
    }

    pub async fn reject_workflow(&self, id: &str, reason: &str) -> Result<Workflow> {
        let reason = require_text("reason", reason)?;
        self.decide(
            "reject_workflow",
            id,
            WorkflowAction::Reject {
                reason: reason.to_string(),
            },
        )
        .await
    }

    /// Apply a decision to an in-progress workflow and return its new state.
    ///
    /// Any other step fails with `InvalidState` and no action is sent.
    async fn decide(&self, operation: &str, id: &str, action: WorkflowAction) -> Result<Workflow> {
        let id = require_id("workflow_id", id)?;
        let current = self.backend.workflow(id).await?;
        if !current.step.accepts_decision() {
            return Err(GatewayError::InvalidState(
                Failure::new(format!(
                    "workflow {} is {}; only in_progress workflows accept {}",
                    id,
                    current.step,
                    action.name()
                ))
                .operation(operation)
                .entity(id),
            ));
        }

        let result = self.backend.workflow_action(id, &action).await;
        self.audit(AuditCategory::WorkflowDecision, operation, id, &result);
        result?;
        self.backend.workflow(id).await
    }
}
