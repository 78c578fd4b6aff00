//! Workflow Assembler
//!
//! Merges scored entities and the validated dependency graph into a
//! [`Workflow`]:
//! - Steps are renumbered 1..=N along the topological order and every
//!   dependency reference is rewritten to the new numbers
//! - Deadlines, fees and required documents attach to every step whose
//!   citations overlap theirs; multi-step matches are discounted and flagged
//! - Steps with an associated deadline inside the window are time-sensitive
//! - The critical path is recomputed on the renumbered graph, breaking ties
//!   on the earliest associated deadline

use crate::error::AssemblyError;
use crate::timing::{process_anchor, DeadlineClock};
use crate::workflow::{StepDeadline, Workflow, WorkflowStep};
use chrono::{DateTime, Utc};
use docplan_extract::{
    AdjustmentCause, DocumentId, EntityKind, ExtractedEntity, ProcessStep, VerificationFlag,
    WorkflowId,
};
use docplan_graph::{DependencyGraph, DependencyGraphBuilder, StepSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Assembly tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyPolicy {
    /// Confidence multiplier for entities attached to more than one step
    pub ambiguity_factor: f64,
    /// Deadlines this many days out or fewer make a step time-sensitive
    pub time_sensitive_window_days: u32,
}

impl Default for AssemblyPolicy {
    fn default() -> Self {
        Self {
            ambiguity_factor: 0.9,
            time_sensitive_window_days: 30,
        }
    }
}

/// Per-document assembly inputs besides the entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyContext {
    /// Document being assembled
    pub document_id: DocumentId,
    /// Extraction pass number
    pub document_version: u32,
    /// Extraction completion time
    pub reference: DateTime<Utc>,
}

impl AssemblyContext {
    /// Create context
    #[inline]
    #[must_use]
    pub fn new(document_id: DocumentId, document_version: u32, reference: DateTime<Utc>) -> Self {
        Self {
            document_id,
            document_version,
            reference,
        }
    }
}

/// Split entities into process steps and everything else
#[must_use]
pub fn partition_steps(entities: Vec<ExtractedEntity>) -> (Vec<ExtractedEntity>, Vec<ExtractedEntity>) {
    entities.into_iter().partition(|e| e.as_step().is_some())
}

/// Graph input for a set of step entities, in extractor numbering
#[must_use]
pub fn step_specs(steps: &[ExtractedEntity]) -> Vec<StepSpec> {
    steps
        .iter()
        .filter_map(ExtractedEntity::as_step)
        .map(|step| {
            let spec = StepSpec::new(step.step_number).depends_on(step.dependencies.iter().copied());
            match step.estimated_days {
                Some(days) => spec.with_estimated_days(days),
                None => spec,
            }
        })
        .collect()
}

/// Builds workflows
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowAssembler {
    policy: AssemblyPolicy,
}

/// A step entity paired with its payload
struct Source<'a> {
    entity: &'a ExtractedEntity,
    step: &'a ProcessStep,
}

impl WorkflowAssembler {
    /// Create assembler with policy
    #[inline]
    #[must_use]
    pub fn new(policy: AssemblyPolicy) -> Self {
        Self { policy }
    }

    /// Policy in effect
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &AssemblyPolicy {
        &self.policy
    }

    /// Assemble a workflow.
    ///
    /// `steps` are the process-step entities `graph` was built from, in any
    /// order; `entities` are all other scored entities of the document.
    ///
    /// # Errors
    /// - `MisplacedEntity` if a non-step is in `steps` or a step in `entities`
    /// - `DuplicateStep`, `UnknownStep`, `MissingStep` if `steps` and `graph` disagree
    pub fn assemble(
        &self,
        ctx: AssemblyContext,
        steps: &[ExtractedEntity],
        graph: &DependencyGraph,
        entities: Vec<ExtractedEntity>,
    ) -> Result<Workflow, AssemblyError> {
        let mut by_number = index_steps(steps, graph)?;
        if let Some(stray) = entities.iter().find(|e| e.as_step().is_some()) {
            return Err(AssemblyError::MisplacedEntity(stray.id.clone()));
        }

        // old number -> new number, following the topological order
        let order = graph.topological_order();
        let renumber: HashMap<u32, u32> = order.iter().copied().zip(1u32..).collect();
        let sources: Vec<Source<'_>> = order
            .iter()
            .map(|old| by_number.remove(old).ok_or(AssemblyError::MissingStep(*old)))
            .collect::<Result<_, _>>()?;

        let clock = DeadlineClock::new(ctx.reference, self.policy.time_sensitive_window_days)
            .with_anchor(process_anchor(&entities));

        let mut workflow_steps: Vec<WorkflowStep> = sources
            .iter()
            .zip(1u32..)
            .map(|(source, number)| new_step(source, number, &renumber))
            .collect();

        let (contacts, unplaced) = self.associate(entities, &sources, &mut workflow_steps);

        for step in &mut workflow_steps {
            mark_time_sensitivity(step, &clock);
        }

        let graph = DependencyGraphBuilder::from_steps(
            workflow_steps
                .iter()
                .map(|s| {
                    let spec = StepSpec::new(s.number).depends_on(s.dependencies.iter().copied());
                    let spec = match s.estimated_days {
                        Some(days) => spec.with_estimated_days(days),
                        None => spec,
                    };
                    match &s.due {
                        Some(due) => spec.with_deadline(due.due),
                        None => spec,
                    }
                })
                .collect(),
        )
        .build()?;
        let critical_path = graph.critical_path().to_vec();

        let workflow = Workflow {
            workflow_id: WorkflowId::new(),
            document_id: ctx.document_id,
            document_version: ctx.document_version,
            steps: workflow_steps,
            graph,
            critical_path,
            contacts,
            unplaced,
            reference_timestamp: ctx.reference,
            anchor: clock.anchor(),
        };
        workflow.validate()?;

        tracing::info!(
            document_id = %workflow.document_id,
            version = workflow.document_version,
            steps = workflow.len(),
            time_sensitive = workflow.time_sensitive_steps().len(),
            unplaced = workflow.unplaced.len(),
            critical_path = ?workflow.critical_path,
            "workflow assembled"
        );
        Ok(workflow)
    }

    /// Attach entities to overlapping steps; returns (contacts, unplaced)
    fn associate(
        &self,
        entities: Vec<ExtractedEntity>,
        sources: &[Source<'_>],
        steps: &mut [WorkflowStep],
    ) -> (Vec<ExtractedEntity>, Vec<ExtractedEntity>) {
        let mut contacts = Vec::new();
        let mut unplaced = Vec::new();

        for mut entity in entities {
            if matches!(entity.kind, EntityKind::ContactInfo(_)) {
                contacts.push(entity);
                continue;
            }

            let matches: Vec<usize> = sources
                .iter()
                .enumerate()
                .filter(|(_, s)| entity.overlaps(&s.entity.citations))
                .map(|(i, _)| i)
                .collect();

            match matches.as_slice() {
                [] => {
                    tracing::debug!(entity = %entity.id, kind = entity.kind.name(), "entity matches no step");
                    entity.flag(VerificationFlag::Unplaced);
                    unplaced.push(entity);
                }
                [only] => attach(&mut steps[*only], entity),
                several => {
                    let numbers: Vec<u32> = several.iter().map(|&i| steps[i].number).collect();
                    let after = entity
                        .confidence
                        .discount(AdjustmentCause::AmbiguousAssociation, self.policy.ambiguity_factor);
                    tracing::debug!(
                        entity = %entity.id,
                        steps = ?numbers,
                        confidence = after,
                        "entity attached to several steps"
                    );
                    entity.flag(VerificationFlag::AmbiguousAssociation { steps: numbers });
                    for &i in several {
                        attach(&mut steps[i], entity.clone());
                    }
                }
            }
        }

        (contacts, unplaced)
    }
}

fn index_steps<'a>(
    steps: &'a [ExtractedEntity],
    graph: &DependencyGraph,
) -> Result<HashMap<u32, Source<'a>>, AssemblyError> {
    let mut by_number = HashMap::with_capacity(steps.len());
    for entity in steps {
        let step = entity
            .as_step()
            .ok_or_else(|| AssemblyError::MisplacedEntity(entity.id.clone()))?;
        if !graph.contains(step.step_number) {
            return Err(AssemblyError::UnknownStep {
                entity: entity.id.clone(),
                step: step.step_number,
            });
        }
        if by_number.insert(step.step_number, Source { entity, step }).is_some() {
            return Err(AssemblyError::DuplicateStep(step.step_number));
        }
    }
    if let Some(missing) = graph.nodes().find(|n| !by_number.contains_key(n)) {
        return Err(AssemblyError::MissingStep(missing));
    }
    Ok(by_number)
}

fn new_step(source: &Source<'_>, number: u32, renumber: &HashMap<u32, u32>) -> WorkflowStep {
    WorkflowStep {
        number,
        original_number: source.step.step_number,
        entity_id: source.entity.id.clone(),
        description: source.entity.description.clone(),
        simplified_description: source.step.simplified_description.clone(),
        deadlines: Vec::new(),
        fees: Vec::new(),
        required_documents: Vec::new(),
        // graph validation guarantees every dependency was renumbered
        dependencies: source
            .step
            .dependencies
            .iter()
            .filter_map(|old| renumber.get(old).copied())
            .collect::<BTreeSet<u32>>(),
        estimated_days: source.step.estimated_days,
        time_sensitive: false,
        due: None,
        citations: source.entity.citations.clone(),
        confidence: source.entity.confidence.clone(),
        verification: source.entity.verification.clone(),
    }
}

fn attach(step: &mut WorkflowStep, entity: ExtractedEntity) {
    match entity.kind {
        EntityKind::Deadline(_) => step.deadlines.push(entity),
        EntityKind::Fee(_) => step.fees.push(entity),
        EntityKind::RequiredDocument(_) => step.required_documents.push(entity),
        EntityKind::ProcessStep(_) | EntityKind::ContactInfo(_) => {}
    }
}

fn mark_time_sensitivity(step: &mut WorkflowStep, clock: &DeadlineClock) {
    let mut earliest: Option<StepDeadline> = None;
    for entity in &step.deadlines {
        let Some(deadline) = entity.as_deadline() else {
            continue;
        };
        let Some(due) = clock.resolve(deadline) else {
            tracing::warn!(entity = %entity.id, step = step.number, "deadline does not resolve to a calendar date");
            continue;
        };
        if clock.is_time_sensitive(due) {
            step.time_sensitive = true;
        }
        if earliest.as_ref().map_or(true, |e| due < e.due) {
            earliest = Some(StepDeadline {
                entity_id: entity.id.clone(),
                description: entity.description.clone(),
                due,
            });
        }
    }
    step.due = earliest;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use docplan_extract::{Citation, Deadline, Fee, RequiredDocument};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
    }

    fn step(id: &str, number: u32, deps: &[u32], chunk: &str) -> ExtractedEntity {
        ExtractedEntity::new(
            id,
            format!("step {number}"),
            EntityKind::ProcessStep(ProcessStep::new(number).depends_on(deps.iter().copied())),
        )
        .with_citation(Citation::new(chunk, vec![]))
        .with_confidence(0.8)
    }

    fn deadline(id: &str, date: NaiveDate, chunk: &str) -> ExtractedEntity {
        ExtractedEntity::new(id, "due", EntityKind::Deadline(Deadline::absolute(date)))
            .with_citation(Citation::new(chunk, vec![]))
            .with_confidence(0.8)
    }

    fn assemble(steps: &[ExtractedEntity], others: Vec<ExtractedEntity>) -> Result<Workflow, AssemblyError> {
        let graph = docplan_graph::build(step_specs(steps))?;
        WorkflowAssembler::default().assemble(
            AssemblyContext::new(DocumentId::new(), 1, reference()),
            steps,
            &graph,
            others,
        )
    }

    #[test]
    fn renumbers_along_topological_order() {
        // extractor numbering: 10 needs 30, 30 needs 20
        let steps = [step("a", 10, &[30], "c1"), step("b", 20, &[], "c2"), step("c", 30, &[20], "c3")];
        let workflow = assemble(&steps, Vec::new()).unwrap();

        let numbers: Vec<(u32, u32)> = workflow.steps.iter().map(|s| (s.number, s.original_number)).collect();
        assert_eq!(numbers, vec![(1, 20), (2, 30), (3, 10)]);
        assert_eq!(workflow.step(3).unwrap().dependencies, BTreeSet::from([2]));
        assert_eq!(workflow.graph.edges(), vec![(1, 2), (2, 3)]);
        assert_eq!(workflow.critical_path, vec![1, 2, 3]);
        workflow.validate().unwrap();
    }

    #[test]
    fn single_overlap_attaches_without_discount() {
        let steps = [step("a", 1, &[], "c1"), step("b", 2, &[1], "c2")];
        let fee = ExtractedEntity::new(
            "f",
            "fee",
            EntityKind::Fee(Fee {
                amount: Decimal::new(1500, 2),
                currency: "EUR".into(),
                variable: false,
            }),
        )
        .with_citation(Citation::new("c2", vec![]))
        .with_confidence(0.5);

        let workflow = assemble(&steps, vec![fee]).unwrap();
        let attached = &workflow.step(2).unwrap().fees[0];
        assert_eq!(attached.confidence.value(), 0.5);
        assert!(!attached.needs_verification());
        assert!(workflow.step(1).unwrap().fees.is_empty());
    }

    #[test]
    fn multi_overlap_attaches_everywhere_with_discount() {
        let steps = [step("a", 1, &[], "c1"), step("b", 2, &[1], "c2")];
        let doc = ExtractedEntity::new("d", "passport", EntityKind::RequiredDocument(RequiredDocument { mandatory: true }))
            .with_citation(Citation::new("c1", vec![]))
            .with_citation(Citation::new("c2", vec![]))
            .with_confidence(0.5);

        let workflow = assemble(&steps, vec![doc]).unwrap();
        for number in [1, 2] {
            let attached = &workflow.step(number).unwrap().required_documents[0];
            assert!((attached.confidence.value() - 0.45).abs() < 1e-12);
            assert_eq!(
                attached.verification,
                vec![VerificationFlag::AmbiguousAssociation { steps: vec![1, 2] }]
            );
        }
    }

    #[test]
    fn unmatched_entity_is_kept_as_unplaced() {
        let steps = [step("a", 1, &[], "c1")];
        let orphan = deadline("x", NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), "c9");
        let workflow = assemble(&steps, vec![orphan]).unwrap();

        assert_eq!(workflow.unplaced.len(), 1);
        assert_eq!(workflow.unplaced[0].verification, vec![VerificationFlag::Unplaced]);
        assert!(workflow.step(1).unwrap().deadlines.is_empty());
    }

    #[test]
    fn time_sensitivity_boundary() {
        let steps = [step("a", 1, &[], "c1"), step("b", 2, &[], "c2")];
        let workflow = assemble(
            &steps,
            vec![
                deadline("d30", NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(), "c1"),
                deadline("d31", NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), "c2"),
            ],
        )
        .unwrap();

        assert!(workflow.step(1).unwrap().time_sensitive);
        assert!(!workflow.step(2).unwrap().time_sensitive);
        assert_eq!(workflow.time_sensitive_steps(), vec![1]);
    }

    #[test]
    fn relative_deadline_uses_process_anchor() {
        let steps = [step("a", 1, &[], "c1")];
        let anchor = ExtractedEntity::new(
            "start",
            "process starts",
            EntityKind::Deadline(Deadline::anchor(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap())),
        )
        .with_citation(Citation::new("c9", vec![]));
        let relative = ExtractedEntity::new("r", "within 10 days", EntityKind::Deadline(Deadline::relative(10)))
            .with_citation(Citation::new("c1", vec![]));

        let workflow = assemble(&steps, vec![anchor, relative]).unwrap();
        let first = workflow.step(1).unwrap();
        assert_eq!(first.due.as_ref().unwrap().due, NaiveDate::from_ymd_opt(2025, 5, 11).unwrap());
        assert!(!first.time_sensitive);
        assert_eq!(workflow.anchor, NaiveDate::from_ymd_opt(2025, 5, 1));
    }

    #[test]
    fn critical_path_tie_uses_associated_deadline() {
        let steps = [step("a", 1, &[], "c1"), step("b", 2, &[1], "c2"), step("c", 3, &[1], "c3")];
        let workflow = assemble(
            &steps,
            vec![deadline("late", NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), "c3")],
        )
        .unwrap();
        assert_eq!(workflow.critical_path, vec![1, 3]);
    }

    #[test]
    fn contacts_bypass_association() {
        let steps = [step("a", 1, &[], "c1")];
        let contact = ExtractedEntity::new(
            "k",
            "help desk",
            EntityKind::ContactInfo(docplan_extract::ContactInfo {
                channel: "phone".into(),
                value: "555-0100".into(),
            }),
        )
        .with_citation(Citation::new("c1", vec![]));

        let workflow = assemble(&steps, vec![contact]).unwrap();
        assert_eq!(workflow.contacts.len(), 1);
        assert!(workflow.step(1).unwrap().attached().next().is_none());
    }

    #[test]
    fn misplaced_inputs_are_rejected() {
        let steps = [step("a", 1, &[], "c1")];
        let err = assemble(&steps, vec![step("b", 2, &[], "c2")]).unwrap_err();
        assert_eq!(err, AssemblyError::MisplacedEntity("b".into()));
    }

    #[test]
    fn steps_must_match_graph() {
        let steps = [step("a", 1, &[], "c1"), step("b", 2, &[], "c2")];
        let graph = docplan_graph::build(vec![StepSpec::new(1)]).unwrap();
        let err = WorkflowAssembler::default()
            .assemble(AssemblyContext::new(DocumentId::new(), 1, reference()), &steps, &graph, Vec::new())
            .unwrap_err();
        assert_eq!(err, AssemblyError::UnknownStep { entity: "b".into(), step: 2 });
    }
}
