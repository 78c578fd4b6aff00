//! Checklist errors
//!
//! `ValidationError` and `DependencyConflict` reject a single toggle and
//! leave state untouched. `InconsistentState` is fatal: the checklist stays
//! halted until it is repaired from its workflow.

use docplan_extract::{ChecklistId, ItemId, WorkflowId};

/// Checklist operation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChecklistError {
    /// Completing an item whose dependencies are not all completed
    #[error("item {item_id} has unmet dependencies: {unmet:?}")]
    ValidationError {
        /// Item the caller tried to complete
        item_id: ItemId,
        /// Dependency items still pending
        unmet: Vec<ItemId>,
    },

    /// Reopening an item while a dependent is completed
    #[error("item {item_id} cannot be reopened while {blocking_item_ids:?} are completed")]
    DependencyConflict {
        /// Item the caller tried to reopen
        item_id: ItemId,
        /// Completed items that depend on it
        blocking_item_ids: Vec<ItemId>,
    },

    /// Checklist no longer mirrors its workflow
    #[error("checklist {checklist_id} is inconsistent: {items} items for {steps} workflow steps")]
    InconsistentState {
        /// Halted checklist
        checklist_id: ChecklistId,
        /// Items in the checklist
        items: usize,
        /// Steps in the workflow
        steps: usize,
    },

    /// A checklist already exists for the workflow
    #[error("workflow {workflow_id} already has checklist {checklist_id}")]
    AlreadyExists {
        /// Workflow
        workflow_id: WorkflowId,
        /// Existing checklist
        checklist_id: ChecklistId,
    },

    /// Unknown checklist
    #[error("checklist {0} not found")]
    NotFound(ChecklistId),

    /// Unknown item
    #[error("item {item_id} not found in checklist {checklist_id}")]
    ItemNotFound {
        /// Checklist searched
        checklist_id: ChecklistId,
        /// Missing item
        item_id: ItemId,
    },
}

impl ChecklistError {
    /// Rejection of one requested mutation; existing state is untouched
    #[inline]
    #[must_use]
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::ValidationError { .. } | Self::DependencyConflict { .. })
    }

    /// Halts the checklist pending manual repair
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InconsistentState { .. })
    }
}
