use docplan_extract::{DocumentId, ExtractedEntity};
use docplan_test_utils::{create_sample_entities, create_step, reference};
use docplan_workflow::{partition_steps, step_specs, AssemblyContext, Workflow, WorkflowAssembler};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn assemble_all(entities: Vec<ExtractedEntity>) -> Workflow {
    let (steps, others) = partition_steps(entities);
    let graph = docplan_graph::build(step_specs(&steps)).unwrap();
    WorkflowAssembler::default()
        .assemble(AssemblyContext::new(DocumentId::new(), 1, reference()), &steps, &graph, others)
        .unwrap()
}

#[test]
fn sample_document_assembles() {
    let workflow = assemble_all(create_sample_entities());

    assert_eq!(workflow.len(), 4);
    assert_eq!(workflow.graph.topological_order(), vec![1, 2, 3, 4]);
    assert_eq!(workflow.critical_path, vec![1, 2, 4]);
    assert_eq!(workflow.time_sensitive_steps(), vec![2]);

    let second = workflow.step(2).unwrap();
    assert_eq!(second.fees.len(), 1);
    assert_eq!(second.deadlines.len(), 1);
    assert_eq!(second.due.as_ref().unwrap().entity_id.0, "d-early");

    assert_eq!(workflow.step(1).unwrap().required_documents.len(), 1);
    assert_eq!(workflow.contacts.len(), 1);
    assert!(workflow.unplaced.is_empty());
}

#[test]
fn workflow_survives_json_round_trip() {
    let workflow = assemble_all(create_sample_entities());
    let json = serde_json::to_string(&workflow).unwrap();
    let back: Workflow = serde_json::from_str(&json).unwrap();
    assert_eq!(back, workflow);
    back.validate().unwrap();
}

/// Random DAG over arbitrary, sparse extractor numbers
fn sparse_steps() -> impl Strategy<Value = Vec<ExtractedEntity>> {
    (1..15usize)
        .prop_flat_map(|n| {
            (
                proptest::collection::btree_set(1..1000u32, n..=n),
                proptest::collection::vec(proptest::collection::vec(any::<prop::sample::Index>(), 0..3), n),
            )
        })
        .prop_map(|(numbers, deps)| {
            let numbers: Vec<u32> = numbers.into_iter().collect();
            numbers
                .iter()
                .zip(deps)
                .enumerate()
                .map(|(i, (&number, picks))| {
                    // only earlier numbers, so the graph stays acyclic
                    let deps: Vec<u32> = if i == 0 {
                        Vec::new()
                    } else {
                        picks.iter().map(|p| numbers[p.index(i)]).collect()
                    };
                    let page = u32::try_from(i % 10).unwrap() + 1;
                    create_step(&format!("s{number}"), number, &deps, page)
                })
                .collect()
        })
}

proptest! {
    #[test]
    fn prop_step_numbers_are_contiguous(mut steps in sparse_steps()) {
        steps.reverse();
        let n = steps.len();
        let workflow = assemble_all(steps);

        let numbers: Vec<u32> = workflow.steps.iter().map(|s| s.number).collect();
        let expected: Vec<u32> = (1..=u32::try_from(n).unwrap()).collect();
        prop_assert_eq!(numbers, expected.clone());
        prop_assert_eq!(workflow.graph.nodes().collect::<Vec<_>>(), expected.clone());
        // renumbering along the topological order makes it the identity order
        prop_assert_eq!(workflow.graph.topological_order(), expected);
        for step in &workflow.steps {
            prop_assert!(step.dependencies.iter().all(|&d| d < step.number));
        }
        prop_assert!(workflow.validate().is_ok());
    }
}
