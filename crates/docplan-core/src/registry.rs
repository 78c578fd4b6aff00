//! Committed workflows, one per document
//!
//! A commit publishes a complete, validated workflow or nothing. Versions only
//! move forward: a pass older than or equal to the committed one is refused.

use crate::error::ReconcileError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docplan_extract::DocumentId;
use docplan_workflow::Workflow;
use std::sync::Arc;

/// Concurrent map of the current workflow per document
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    workflows: DashMap<DocumentId, Arc<Workflow>>,
}

impl WorkflowRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    /// Publish a workflow as its document's current one.
    ///
    /// # Errors
    /// - `Assembly` if the workflow fails validation
    /// - `StaleVersion` if an equal or newer version is committed
    pub fn commit(&self, workflow: Workflow) -> Result<Arc<Workflow>, ReconcileError> {
        workflow.validate()?;
        let document_id = workflow.document_id;
        let offered = workflow.document_version;

        match self.workflows.entry(document_id) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get().document_version;
                if offered <= current {
                    tracing::warn!(document_id = %document_id, offered, current, "stale workflow refused");
                    return Err(ReconcileError::StaleVersion {
                        document_id,
                        offered,
                        current,
                    });
                }
                let workflow = Arc::new(workflow);
                occupied.insert(Arc::clone(&workflow));
                tracing::info!(document_id = %document_id, version = offered, previous = current, "workflow superseded");
                Ok(workflow)
            }
            Entry::Vacant(vacant) => {
                let workflow = Arc::new(workflow);
                vacant.insert(Arc::clone(&workflow));
                tracing::info!(document_id = %document_id, version = offered, "workflow committed");
                Ok(workflow)
            }
        }
    }

    /// Current workflow of a document
    #[must_use]
    pub fn get(&self, document_id: DocumentId) -> Option<Arc<Workflow>> {
        self.workflows.get(&document_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Committed version of a document
    #[must_use]
    pub fn current_version(&self, document_id: DocumentId) -> Option<u32> {
        self.workflows.get(&document_id).map(|entry| entry.document_version)
    }

    /// Forget a document's workflow
    pub fn remove_document(&self, document_id: DocumentId) -> Option<Arc<Workflow>> {
        self.workflows.remove(&document_id).map(|(_, workflow)| workflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ExtractionInput, Reconciler};
    use docplan_test_utils::{create_registry, create_sample_entities, reference};
    use pretty_assertions::assert_eq;
    use tokio_util::sync::CancellationToken;

    fn workflow(document_id: DocumentId, version: u32) -> Workflow {
        let input = ExtractionInput::new(create_registry(document_id), reference(), create_sample_entities())
            .with_version(version);
        Reconciler::default()
            .reconcile(input, &CancellationToken::new())
            .unwrap()
            .workflow
    }

    #[test]
    fn newer_versions_supersede() {
        let registry = WorkflowRegistry::new();
        let doc = DocumentId::new();
        registry.commit(workflow(doc, 1)).unwrap();
        let second = registry.commit(workflow(doc, 2)).unwrap();

        assert_eq!(registry.current_version(doc), Some(2));
        assert_eq!(registry.get(doc).unwrap().workflow_id, second.workflow_id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn stale_versions_are_refused() {
        let registry = WorkflowRegistry::new();
        let doc = DocumentId::new();
        let committed = registry.commit(workflow(doc, 3)).unwrap();

        for version in [2, 3] {
            let err = registry.commit(workflow(doc, version)).unwrap_err();
            assert!(matches!(err, ReconcileError::StaleVersion { offered, current: 3, .. } if offered == version));
        }
        assert_eq!(registry.get(doc).unwrap().workflow_id, committed.workflow_id);
    }

    #[test]
    fn invalid_workflows_are_never_published() {
        let registry = WorkflowRegistry::new();
        let doc = DocumentId::new();
        let mut broken = workflow(doc, 1);
        broken.steps[0].number = 7;

        assert!(matches!(registry.commit(broken), Err(ReconcileError::Assembly(_))));
        assert!(registry.get(doc).is_none());
    }

    #[test]
    fn removal() {
        let registry = WorkflowRegistry::new();
        let doc = DocumentId::new();
        registry.commit(workflow(doc, 1)).unwrap();
        assert!(registry.remove_document(doc).is_some());
        assert!(registry.is_empty());
        assert!(registry.remove_document(doc).is_none());
    }
}
