//! Checklist state machine
//!
//! Each item is either `Pending` or `Completed`. Both transitions are legal
//! but guarded so that, after every mutation, an item is completed only if
//! all of its dependencies are:
//! - `Pending -> Completed` requires every dependency to be completed
//! - `Completed -> Pending` requires no dependent to be completed
//!
//! [`Checklist::toggle`] is the only mutation. `can_complete` is never stored;
//! it is derived from the dependency items every time it is read.

use crate::error::ChecklistError;
use chrono::{DateTime, NaiveDate, Utc};
use docplan_extract::{ChecklistId, DocumentId, ItemId, UserId, WorkflowId};
use docplan_workflow::{StepDeadline, Workflow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Completion state of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Not done yet
    Pending,
    /// Done
    Completed,
}

impl ItemState {
    #[inline]
    #[must_use]
    pub fn from_completed(completed: bool) -> Self {
        if completed {
            Self::Completed
        } else {
            Self::Pending
        }
    }
}

/// One checklist entry, mirroring one workflow step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item_id: ItemId,
    pub step_number: u32,
    pub description: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// Items that must be completed first
    pub dependencies: Vec<ItemId>,
    /// Earliest deadline of the step
    pub deadline: Option<StepDeadline>,
}

impl ChecklistItem {
    #[inline]
    #[must_use]
    pub fn state(&self) -> ItemState {
        ItemState::from_completed(self.completed)
    }

    /// Resolved due date, if the step has a deadline
    #[inline]
    #[must_use]
    pub fn due(&self) -> Option<NaiveDate> {
        self.deadline.as_ref().map(|d| d.due)
    }
}

/// Read model of an item with its derived `can_complete` flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItemView {
    #[serde(flatten)]
    pub item: ChecklistItem,
    pub can_complete: bool,
}

/// Read model of a whole checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistView {
    pub checklist_id: ChecklistId,
    pub workflow_id: WorkflowId,
    pub document_id: DocumentId,
    pub user_id: UserId,
    pub items: Vec<ChecklistItemView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-user tracking structure derived 1:1 from a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    checklist_id: ChecklistId,
    workflow_id: WorkflowId,
    document_id: DocumentId,
    user_id: UserId,
    items: Vec<ChecklistItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Checklist {
    /// One pending item per workflow step, in step order
    #[must_use]
    pub fn create(workflow: &Workflow, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self::create_with_id(ChecklistId::new(), workflow, user_id, now)
    }

    pub(crate) fn create_with_id(
        checklist_id: ChecklistId,
        workflow: &Workflow,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        let ids: HashMap<u32, ItemId> = workflow.steps.iter().map(|s| (s.number, ItemId::new())).collect();

        let items = workflow
            .steps
            .iter()
            .filter_map(|step| {
                let item_id = *ids.get(&step.number)?;
                Some(ChecklistItem {
                    item_id,
                    step_number: step.number,
                    description: step
                        .simplified_description
                        .clone()
                        .unwrap_or_else(|| step.description.clone()),
                    completed: false,
                    completed_at: None,
                    dependencies: step.dependencies.iter().filter_map(|d| ids.get(d).copied()).collect(),
                    deadline: step.due.clone(),
                })
            })
            .collect();

        Self {
            checklist_id,
            workflow_id: workflow.workflow_id,
            document_id: workflow.document_id,
            user_id,
            items,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    #[must_use]
    pub fn checklist_id(&self) -> ChecklistId {
        self.checklist_id
    }

    #[inline]
    #[must_use]
    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    #[inline]
    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    #[inline]
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Items in step order
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn item(&self, item_id: ItemId) -> Option<&ChecklistItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }

    /// Item for a workflow step number
    #[must_use]
    pub fn item_for_step(&self, step_number: u32) -> Option<&ChecklistItem> {
        self.items.iter().find(|i| i.step_number == step_number)
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|i| i.completed).count()
    }

    fn is_completed(&self, item_id: ItemId) -> bool {
        self.item(item_id).is_some_and(|i| i.completed)
    }

    /// Whether every dependency of `item` is completed
    #[must_use]
    pub fn can_complete(&self, item: &ChecklistItem) -> bool {
        item.dependencies.iter().all(|&d| self.is_completed(d))
    }

    /// Completed items that depend on `item_id`
    #[must_use]
    pub fn completed_dependents(&self, item_id: ItemId) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|i| i.completed && i.dependencies.contains(&item_id))
            .map(|i| i.item_id)
            .collect()
    }

    /// Read model with derived flags
    #[must_use]
    pub fn view(&self) -> ChecklistView {
        ChecklistView {
            checklist_id: self.checklist_id,
            workflow_id: self.workflow_id,
            document_id: self.document_id,
            user_id: self.user_id,
            items: self
                .items
                .iter()
                .map(|item| ChecklistItemView {
                    can_complete: self.can_complete(item),
                    item: item.clone(),
                })
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Set an item's completion state.
    ///
    /// Returns `true` if the state changed; toggling to the current state is
    /// an accepted no-op that leaves every timestamp untouched.
    ///
    /// # Errors
    /// - `ItemNotFound` for an unknown item
    /// - `ValidationError` when completing with pending dependencies
    /// - `DependencyConflict` when reopening with completed dependents
    pub fn toggle(&mut self, item_id: ItemId, completed: bool, now: DateTime<Utc>) -> Result<bool, ChecklistError> {
        let index = self
            .items
            .iter()
            .position(|i| i.item_id == item_id)
            .ok_or(ChecklistError::ItemNotFound {
                checklist_id: self.checklist_id,
                item_id,
            })?;

        let from = self.items[index].state();
        let to = ItemState::from_completed(completed);
        if from == to {
            return Ok(false);
        }

        match to {
            ItemState::Completed => {
                let unmet: Vec<ItemId> = self.items[index]
                    .dependencies
                    .iter()
                    .copied()
                    .filter(|&d| !self.is_completed(d))
                    .collect();
                if !unmet.is_empty() {
                    return Err(ChecklistError::ValidationError { item_id, unmet });
                }
            }
            ItemState::Pending => {
                let blocking_item_ids = self.completed_dependents(item_id);
                if !blocking_item_ids.is_empty() {
                    return Err(ChecklistError::DependencyConflict {
                        item_id,
                        blocking_item_ids,
                    });
                }
            }
        }

        let item = &mut self.items[index];
        item.completed = completed;
        item.completed_at = completed.then_some(now);
        self.updated_at = now;
        Ok(true)
    }

    /// Check that the checklist still mirrors `workflow`.
    ///
    /// # Errors
    /// `InconsistentState` if the item count or step numbers diverge.
    pub fn check_consistency(&self, workflow: &Workflow) -> Result<(), ChecklistError> {
        let same_steps = self.items.len() == workflow.len()
            && self
                .items
                .iter()
                .zip(&workflow.steps)
                .all(|(item, step)| item.step_number == step.number);
        if same_steps {
            Ok(())
        } else {
            Err(ChecklistError::InconsistentState {
                checklist_id: self.checklist_id,
                items: self.items.len(),
                steps: workflow.len(),
            })
        }
    }

    /// Every completed item has only completed dependencies
    #[must_use]
    pub fn is_dependency_consistent(&self) -> bool {
        self.items.iter().filter(|i| i.completed).all(|i| self.can_complete(i))
    }

    #[cfg(test)]
    pub(crate) fn items_mut(&mut self) -> &mut Vec<ChecklistItem> {
        &mut self.items
    }
}
