//! Checklist store
//!
//! Holds live checklists and serializes their mutations:
//! - One `parking_lot::Mutex` per checklist; unrelated checklists never contend
//! - Map shards are only held long enough to clone the checklist's `Arc`
//! - Reads clone a snapshot inside a short critical section
//! - A checklist found inconsistent with its workflow is halted until repaired

use crate::checklist::Checklist;
use crate::error::ChecklistError;
use crate::progress::{ProgressCalculator, ProgressView};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docplan_extract::{ChecklistId, DocumentId, ItemId, UserId, WorkflowId};
use docplan_workflow::Workflow;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
struct Slot {
    checklist: Checklist,
    /// Set once an inconsistency is detected; every operation reports it
    halted: Option<ChecklistError>,
}

impl Slot {
    fn ensure_live(&self) -> Result<(), ChecklistError> {
        match &self.halted {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Concurrent home of all live checklists
#[derive(Debug, Default)]
pub struct ChecklistStore {
    checklists: DashMap<ChecklistId, Arc<Mutex<Slot>>>,
    by_workflow: DashMap<WorkflowId, ChecklistId>,
    calculator: ProgressCalculator,
}

impl ChecklistStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live checklists
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.checklists.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checklists.is_empty()
    }

    fn slot(&self, checklist_id: ChecklistId) -> Result<Arc<Mutex<Slot>>, ChecklistError> {
        self.checklists
            .get(&checklist_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ChecklistError::NotFound(checklist_id))
    }

    /// Create the checklist for `workflow`.
    ///
    /// # Errors
    /// `AlreadyExists` if the workflow already has one.
    pub fn create(&self, workflow: &Workflow, user_id: UserId, now: DateTime<Utc>) -> Result<Checklist, ChecklistError> {
        match self.by_workflow.entry(workflow.workflow_id) {
            Entry::Occupied(existing) => Err(ChecklistError::AlreadyExists {
                workflow_id: workflow.workflow_id,
                checklist_id: *existing.get(),
            }),
            Entry::Vacant(vacant) => {
                let checklist = Checklist::create(workflow, user_id, now);
                let checklist_id = checklist.checklist_id();
                self.checklists.insert(
                    checklist_id,
                    Arc::new(Mutex::new(Slot {
                        checklist: checklist.clone(),
                        halted: None,
                    })),
                );
                vacant.insert(checklist_id);

                tracing::info!(
                    checklist_id = %checklist_id,
                    workflow_id = %workflow.workflow_id,
                    document_id = %workflow.document_id,
                    items = checklist.items().len(),
                    "checklist created"
                );
                Ok(checklist)
            }
        }
    }

    /// Checklist belonging to a workflow
    #[must_use]
    pub fn for_workflow(&self, workflow_id: WorkflowId) -> Option<ChecklistId> {
        self.by_workflow.get(&workflow_id).map(|entry| *entry.value())
    }

    /// Serialized toggle; see [`Checklist::toggle`].
    ///
    /// # Errors
    /// `NotFound`, `InconsistentState` for a halted checklist, or any toggle rejection.
    pub fn toggle(
        &self,
        checklist_id: ChecklistId,
        item_id: ItemId,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<bool, ChecklistError> {
        let slot = self.slot(checklist_id)?;
        let mut guard = slot.lock();
        guard.ensure_live()?;

        match guard.checklist.toggle(item_id, completed, now) {
            Ok(changed) => {
                tracing::debug!(checklist_id = %checklist_id, item_id = %item_id, completed, changed, "toggle accepted");
                Ok(changed)
            }
            Err(err) => {
                tracing::info!(checklist_id = %checklist_id, item_id = %item_id, completed, error = %err, "toggle rejected");
                Err(err)
            }
        }
    }

    /// Consistent copy of a checklist
    ///
    /// # Errors
    /// `NotFound` or `InconsistentState`.
    pub fn snapshot(&self, checklist_id: ChecklistId) -> Result<Checklist, ChecklistError> {
        let slot = self.slot(checklist_id)?;
        let guard = slot.lock();
        guard.ensure_live()?;
        Ok(guard.checklist.clone())
    }

    /// Progress view of a checklist
    ///
    /// # Errors
    /// `NotFound` or `InconsistentState`.
    pub fn progress(&self, checklist_id: ChecklistId) -> Result<ProgressView, ChecklistError> {
        let slot = self.slot(checklist_id)?;
        let guard = slot.lock();
        guard.ensure_live()?;
        Ok(self.calculator.progress(&guard.checklist))
    }

    /// Compare a checklist with its workflow, halting it on divergence.
    ///
    /// # Errors
    /// `NotFound`, or `InconsistentState` (now and for every later operation).
    pub fn verify(&self, checklist_id: ChecklistId, workflow: &Workflow) -> Result<(), ChecklistError> {
        let slot = self.slot(checklist_id)?;
        let mut guard = slot.lock();
        guard.ensure_live()?;

        if let Err(err) = guard.checklist.check_consistency(workflow) {
            tracing::error!(
                checklist_id = %checklist_id,
                workflow_id = %workflow.workflow_id,
                error = %err,
                "checklist halted"
            );
            guard.halted = Some(err.clone());
            return Err(err);
        }
        Ok(())
    }

    /// Whether a checklist is halted
    #[must_use]
    pub fn is_halted(&self, checklist_id: ChecklistId) -> bool {
        match self.slot(checklist_id) {
            Ok(slot) => {
                let halted = slot.lock().halted.is_some();
                halted
            }
            Err(_) => false,
        }
    }

    /// Rebuild a checklist from `workflow`, keeping its id and owner.
    ///
    /// Completion state is reset; the workflow may have been reassembled.
    ///
    /// # Errors
    /// `NotFound` for an unknown checklist.
    pub fn repair(&self, checklist_id: ChecklistId, workflow: &Workflow, now: DateTime<Utc>) -> Result<Checklist, ChecklistError> {
        let slot = self.slot(checklist_id)?;
        let mut guard = slot.lock();

        let previous_workflow = guard.checklist.workflow_id();
        let rebuilt = Checklist::create_with_id(checklist_id, workflow, guard.checklist.user_id(), now);
        guard.checklist = rebuilt.clone();
        guard.halted = None;
        drop(guard);

        if previous_workflow != workflow.workflow_id {
            self.by_workflow.remove(&previous_workflow);
            self.by_workflow.insert(workflow.workflow_id, checklist_id);
        }
        tracing::warn!(checklist_id = %checklist_id, workflow_id = %workflow.workflow_id, "checklist repaired");
        Ok(rebuilt)
    }

    /// Delete every checklist of a document; returns how many were removed
    pub fn remove_document(&self, document_id: DocumentId) -> usize {
        let doomed: Vec<(ChecklistId, WorkflowId)> = self
            .checklists
            .iter()
            .filter_map(|entry| {
                let slot = entry.value().lock();
                let owned = slot.checklist.document_id() == document_id;
                let workflow_id = slot.checklist.workflow_id();
                drop(slot);
                owned.then_some((*entry.key(), workflow_id))
            })
            .collect();

        for (checklist_id, workflow_id) in &doomed {
            self.checklists.remove(checklist_id);
            self.by_workflow.remove(workflow_id);
        }
        if !doomed.is_empty() {
            tracing::info!(document_id = %document_id, removed = doomed.len(), "checklists deleted");
        }
        doomed.len()
    }
}
