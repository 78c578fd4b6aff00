//! Document planner
//!
//! Ties the pipeline to the stores:
//! - `ingest`: reconcile, commit the workflow, then create or rebuild its checklist
//! - `toggle` / `progress`: checklist mutations and reads
//! - `verify`: compare a checklist with its document's current workflow
//! - `delete_document`: drop the workflow and cascade to checklists
//!
//! Commit and checklist bookkeeping for one document run under that
//! document's lock; reconciliation itself runs outside it.

use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::pipeline::{ExtractionInput, ReconcileReport, Reconciler};
use crate::registry::WorkflowRegistry;
use chrono::{DateTime, Utc};
use docplan_checklist::{Checklist, ChecklistError, ChecklistStore, ProgressView};
use docplan_extract::{ChecklistId, DocumentId, ItemId, UserId};
use dashmap::DashMap;
use docplan_workflow::Workflow;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of ingesting one document version
#[derive(Debug, Clone)]
pub struct PlannedDocument {
    pub workflow: Arc<Workflow>,
    pub report: ReconcileReport,
    pub checklist: Checklist,
}

/// Owns the reconciler, the committed workflows and the live checklists
#[derive(Debug, Default)]
pub struct DocumentPlanner {
    reconciler: Reconciler,
    workflows: WorkflowRegistry,
    checklists: ChecklistStore,
    locks: DashMap<DocumentId, Arc<Mutex<()>>>,
}

impl DocumentPlanner {
    /// Create planner
    #[must_use]
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            reconciler: Reconciler::new(config),
            workflows: WorkflowRegistry::new(),
            checklists: ChecklistStore::new(),
            locks: DashMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[inline]
    #[must_use]
    pub fn workflows(&self) -> &WorkflowRegistry {
        &self.workflows
    }

    #[inline]
    #[must_use]
    pub fn checklists(&self) -> &ChecklistStore {
        &self.checklists
    }

    /// Reconcile a document version and publish it.
    ///
    /// A first version gets a new checklist owned by `user_id`. A superseding
    /// version rebuilds the previous version's checklist in place, keeping its
    /// id and owner and resetting completion.
    ///
    /// # Errors
    /// Any pipeline error, `StaleVersion`, or a checklist error.
    pub fn ingest(
        &self,
        input: ExtractionInput,
        user_id: UserId,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<PlannedDocument, ReconcileError> {
        let document_id = input.document_id();
        let outcome = self.reconciler.reconcile(input, cancel)?;

        let lock = self.document_lock(document_id);
        let _guard = lock.lock();
        let previous = self.workflows.get(document_id);
        let workflow = self.workflows.commit(outcome.workflow)?;

        let existing = previous.and_then(|p| self.checklists.for_workflow(p.workflow_id));
        let checklist = match existing {
            Some(checklist_id) => self.checklists.repair(checklist_id, &workflow, now)?,
            None => self.checklists.create(&workflow, user_id, now)?,
        };

        Ok(PlannedDocument {
            workflow,
            report: outcome.report,
            checklist,
        })
    }

    fn document_lock(&self, document_id: DocumentId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(document_id).or_default().value())
    }

    /// Toggle an item and return the updated progress.
    ///
    /// # Errors
    /// Any `ChecklistError` from the store.
    pub fn toggle(
        &self,
        checklist_id: ChecklistId,
        item_id: ItemId,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<ProgressView, ReconcileError> {
        self.checklists.toggle(checklist_id, item_id, completed, now)?;
        Ok(self.checklists.progress(checklist_id)?)
    }

    /// Progress of a checklist
    ///
    /// # Errors
    /// `NotFound` or `InconsistentState`.
    pub fn progress(&self, checklist_id: ChecklistId) -> Result<ProgressView, ReconcileError> {
        Ok(self.checklists.progress(checklist_id)?)
    }

    /// Check a checklist against its document's committed workflow.
    ///
    /// # Errors
    /// `NotFound` if the checklist or its workflow is gone, `InconsistentState`
    /// if they diverged (the checklist is then halted).
    pub fn verify(&self, checklist_id: ChecklistId) -> Result<(), ReconcileError> {
        let document_id = self.checklists.snapshot(checklist_id)?.document_id();
        let workflow = self
            .workflows
            .get(document_id)
            .ok_or(ChecklistError::NotFound(checklist_id))?;
        Ok(self.checklists.verify(checklist_id, &workflow)?)
    }

    /// Drop a document's workflow and checklists; returns the checklists removed
    pub fn delete_document(&self, document_id: DocumentId) -> usize {
        let lock = self.document_lock(document_id);
        let removed = {
            let _guard = lock.lock();
            self.workflows.remove_document(document_id);
            self.checklists.remove_document(document_id)
        };
        self.locks.remove(&document_id);
        tracing::info!(document_id = %document_id, checklists = removed, "document deleted");
        removed
    }
}
