//! Reconciliation pipeline
//!
//! One document flows through:
//! 1. Cross-validation over all entities
//! 2. Scoring and citation grounding per entity (fan-out on rayon)
//! 3. Barrier: dependency graph over every process step
//! 4. Workflow assembly
//!
//! Cancellation is observed between stages. A cancelled document yields
//! `ReconcileError::Cancelled` and no workflow; nothing is committed here.

use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use chrono::{DateTime, Utc};
use docplan_extract::{
    cross_validate, ground_entity, AdjustmentCause, ChunkRegistry, ConfidenceScorer, DocumentId,
    EntityId, ExtractedEntity,
};
use docplan_workflow::{partition_steps, step_specs, AssemblyContext, Workflow, WorkflowAssembler};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

/// What the extraction collaborator delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Extraction {
    /// Typed entity candidates
    Available {
        /// Candidates with raw signals
        entities: Vec<ExtractedEntity>,
    },
    /// The collaborator gave up after its own retries
    Unavailable {
        /// Reason it reported
        reason: String,
    },
}

/// Everything needed to reconcile one document version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionInput {
    /// Extraction pass number; later passes supersede earlier ones
    #[serde(default = "first_version")]
    pub document_version: u32,
    /// Chunks of the document, which also names it
    pub registry: ChunkRegistry,
    /// Extraction completion time
    pub reference: DateTime<Utc>,
    /// Extraction result
    pub extraction: Extraction,
}

fn first_version() -> u32 {
    1
}

impl ExtractionInput {
    /// Input for version 1 of a document
    #[must_use]
    pub fn new(registry: ChunkRegistry, reference: DateTime<Utc>, entities: Vec<ExtractedEntity>) -> Self {
        Self {
            document_version: first_version(),
            registry,
            reference,
            extraction: Extraction::Available { entities },
        }
    }

    /// Input for a document whose extraction failed
    #[must_use]
    pub fn unavailable(registry: ChunkRegistry, reference: DateTime<Utc>, reason: impl Into<String>) -> Self {
        Self {
            document_version: first_version(),
            registry,
            reference,
            extraction: Extraction::Unavailable { reason: reason.into() },
        }
    }

    /// With document version
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.document_version = version;
        self
    }

    #[inline]
    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        self.registry.document_id
    }
}

/// Summary of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub entities: usize,
    pub steps: usize,
    pub cross_validated: usize,
    pub invalid_citations: usize,
    /// Entities whose confidence was lowered after scoring
    pub downgraded: BTreeSet<EntityId>,
    /// Entities needing manual verification
    pub flagged: BTreeSet<EntityId>,
    pub time_sensitive_steps: Vec<u32>,
    pub unplaced: usize,
}

/// Successful reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub workflow: Workflow,
    pub report: ReconcileReport,
}

/// Runs the pipeline with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
    scorer: ConfidenceScorer,
    assembler: WorkflowAssembler,
}

impl Reconciler {
    /// Create reconciler
    #[must_use]
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            config,
            scorer: ConfidenceScorer::new(config.scoring),
            assembler: WorkflowAssembler::new(config.assembly),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Reconcile one document.
    ///
    /// # Errors
    /// - `ExtractionUnavailable` if extraction failed upstream
    /// - `Cycle` / `Validation` if step dependencies are invalid
    /// - `Assembly` if steps and graph disagree
    /// - `Cancelled` if `cancel` fired before the workflow was complete
    pub fn reconcile(
        &self,
        input: ExtractionInput,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let document_id = input.document_id();
        let span = tracing::info_span!("reconcile", document_id = %document_id, version = input.document_version);
        let _enter = span.enter();

        let entities = match input.extraction {
            Extraction::Available { entities } => entities,
            Extraction::Unavailable { reason } => {
                tracing::warn!(%reason, "extraction unavailable, falling back");
                return Err(ReconcileError::ExtractionUnavailable { document_id, reason });
            }
        };
        checkpoint(cancel, document_id)?;

        let entity_count = entities.len();
        let confirmed = cross_validate(&entities, &input.registry);
        let cross_validated = confirmed.iter().filter(|&&c| c).count();

        let graded: Vec<(ExtractedEntity, usize)> = if self.config.pipeline.parallel_scoring {
            entities
                .into_par_iter()
                .zip(confirmed)
                .map(|(entity, confirmed)| self.grade(entity, confirmed, &input.registry))
                .collect()
        } else {
            entities
                .into_iter()
                .zip(confirmed)
                .map(|(entity, confirmed)| self.grade(entity, confirmed, &input.registry))
                .collect()
        };
        let invalid_citations: usize = graded.iter().map(|(_, n)| n).sum();
        let entities: Vec<ExtractedEntity> = graded.into_iter().map(|(e, _)| e).collect();
        tracing::debug!(entities = entity_count, cross_validated, invalid_citations, "entities graded");
        checkpoint(cancel, document_id)?;

        // barrier: the graph needs every step
        let (steps, others) = partition_steps(entities);
        let graph = docplan_graph::build(step_specs(&steps))?;
        checkpoint(cancel, document_id)?;

        let ctx = AssemblyContext::new(document_id, input.document_version, input.reference);
        let workflow = self.assembler.assemble(ctx, &steps, &graph, others)?;
        checkpoint(cancel, document_id)?;

        let report = report(&workflow, entity_count, cross_validated, invalid_citations);
        tracing::info!(
            steps = report.steps,
            flagged = report.flagged.len(),
            downgraded = report.downgraded.len(),
            "document reconciled"
        );
        Ok(ReconcileOutcome { workflow, report })
    }

    /// Reconcile independent documents in parallel, results in input order
    #[must_use]
    pub fn reconcile_many(
        &self,
        inputs: Vec<ExtractionInput>,
        cancel: &CancellationToken,
    ) -> Vec<Result<ReconcileOutcome, ReconcileError>> {
        inputs
            .into_par_iter()
            .map(|input| self.reconcile(input, cancel))
            .collect()
    }

    /// Score one entity, then ground its citations; returns the invalid citation count
    fn grade(&self, mut entity: ExtractedEntity, cross_validated: bool, registry: &ChunkRegistry) -> (ExtractedEntity, usize) {
        let signals = &entity.signals;
        let score = self.scorer.score(
            &signals.retrieval_scores,
            signals.model_likelihood,
            signals.explicit,
            cross_validated,
        );
        entity.confidence.recompute(AdjustmentCause::Scored, score);
        let failures = ground_entity(&mut entity, registry, &self.config.grounding);
        (entity, failures.len())
    }
}

fn checkpoint(cancel: &CancellationToken, document_id: DocumentId) -> Result<(), ReconcileError> {
    if cancel.is_cancelled() {
        tracing::info!("reconciliation cancelled");
        return Err(ReconcileError::Cancelled(document_id));
    }
    Ok(())
}

fn report(workflow: &Workflow, entities: usize, cross_validated: usize, invalid_citations: usize) -> ReconcileReport {
    let mut downgraded = BTreeSet::new();
    let mut flagged = BTreeSet::new();

    for step in &workflow.steps {
        if step.confidence.was_downgraded() {
            downgraded.insert(step.entity_id.clone());
        }
        if !step.verification.is_empty() {
            flagged.insert(step.entity_id.clone());
        }
    }
    for entity in workflow.entities() {
        if entity.confidence.was_downgraded() {
            downgraded.insert(entity.id.clone());
        }
        if entity.needs_verification() {
            flagged.insert(entity.id.clone());
        }
    }

    ReconcileReport {
        entities,
        steps: workflow.len(),
        cross_validated,
        invalid_citations,
        downgraded,
        flagged,
        time_sensitive_steps: workflow.time_sensitive_steps(),
        unplaced: workflow.unplaced.len(),
    }
}
