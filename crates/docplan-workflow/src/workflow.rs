//! Assembled workflow
//!
//! A [`Workflow`] is immutable once assembled. A re-extraction produces a new
//! workflow that supersedes the old one wholesale.

use crate::error::AssemblyError;
use chrono::{DateTime, NaiveDate, Utc};
use docplan_extract::{Citation, Confidence, DocumentId, EntityId, ExtractedEntity, VerificationFlag, WorkflowId};
use docplan_graph::DependencyGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Earliest resolved deadline attached to a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDeadline {
    /// Deadline entity
    pub entity_id: EntityId,
    /// Its description
    pub description: String,
    /// Resolved calendar date
    pub due: NaiveDate,
}

/// One numbered step of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Position in the workflow, 1-based and contiguous
    pub number: u32,
    /// Number the extractor gave the step
    pub original_number: u32,
    /// Source step entity
    pub entity_id: EntityId,
    /// Step text
    pub description: String,
    /// Plain-language rendering
    pub simplified_description: Option<String>,
    /// Associated deadlines
    pub deadlines: Vec<ExtractedEntity>,
    /// Associated fees
    pub fees: Vec<ExtractedEntity>,
    /// Associated required documents
    pub required_documents: Vec<ExtractedEntity>,
    /// Workflow numbers of the steps that must complete first
    pub dependencies: BTreeSet<u32>,
    /// Estimated duration in days
    pub estimated_days: Option<u32>,
    /// Has an associated deadline inside the time-sensitivity window
    pub time_sensitive: bool,
    /// Earliest associated deadline
    pub due: Option<StepDeadline>,
    /// Citations of the step entity
    pub citations: Vec<Citation>,
    /// Confidence of the step entity
    pub confidence: Confidence,
    /// Verification flags of the step entity
    pub verification: Vec<VerificationFlag>,
}

impl WorkflowStep {
    /// Every entity attached to this step
    pub fn attached(&self) -> impl Iterator<Item = &ExtractedEntity> {
        self.deadlines
            .iter()
            .chain(&self.fees)
            .chain(&self.required_documents)
    }

    /// Whether the step itself or anything attached needs a human check
    #[must_use]
    pub fn needs_verification(&self) -> bool {
        !self.verification.is_empty() || self.attached().any(ExtractedEntity::needs_verification)
    }
}

/// Numbered, dependency-validated plan for one document version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow identifier
    pub workflow_id: WorkflowId,
    /// Source document
    pub document_id: DocumentId,
    /// Extraction pass this workflow was assembled from
    pub document_version: u32,
    /// Steps in workflow order
    pub steps: Vec<WorkflowStep>,
    /// Dependency graph over workflow numbers
    pub graph: DependencyGraph,
    /// Schedule-determining sequence of workflow numbers
    pub critical_path: Vec<u32>,
    /// Contacts found in the document
    pub contacts: Vec<ExtractedEntity>,
    /// Non-step entities that matched no step
    pub unplaced: Vec<ExtractedEntity>,
    /// Extraction completion time deadlines were resolved against
    pub reference_timestamp: DateTime<Utc>,
    /// Process anchor used for relative deadlines
    pub anchor: Option<NaiveDate>,
}

impl Workflow {
    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the workflow has no steps
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step by workflow number
    #[must_use]
    pub fn step(&self, number: u32) -> Option<&WorkflowStep> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.steps.get(index).filter(|s| s.number == number)
    }

    /// Workflow numbers of time-sensitive steps
    #[must_use]
    pub fn time_sensitive_steps(&self) -> Vec<u32> {
        self.steps
            .iter()
            .filter(|s| s.time_sensitive)
            .map(|s| s.number)
            .collect()
    }

    /// Every entity carried by the workflow, attached or not.
    ///
    /// Entities attached to several steps are yielded once per step.
    pub fn entities(&self) -> impl Iterator<Item = &ExtractedEntity> {
        self.steps
            .iter()
            .flat_map(WorkflowStep::attached)
            .chain(&self.contacts)
            .chain(&self.unplaced)
    }

    /// Check that steps are numbered exactly 1..=N and agree with the graph.
    ///
    /// # Errors
    /// - `AssemblyError::Numbering` at the first out-of-place number
    /// - `AssemblyError::GraphMismatch` if a step and the graph disagree
    pub fn validate(&self) -> Result<(), AssemblyError> {
        for (expected, step) in (1u32..).zip(&self.steps) {
            if step.number != expected {
                return Err(AssemblyError::Numbering {
                    expected,
                    found: step.number,
                });
            }
            let prerequisites = self.graph.prerequisites_of(step.number);
            if !self.graph.contains(step.number) || !prerequisites.iter().eq(&step.dependencies) {
                return Err(AssemblyError::GraphMismatch(step.number));
            }
        }
        if let Some(extra) = self.graph.nodes().find(|&n| self.step(n).is_none()) {
            return Err(AssemblyError::GraphMismatch(extra));
        }
        Ok(())
    }
}
