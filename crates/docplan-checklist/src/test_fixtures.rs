use docplan_extract::DocumentId;
use docplan_test_utils::{create_deadline, create_step, date, reference};
use docplan_workflow::{step_specs, AssemblyContext, Workflow, WorkflowAssembler};

fn assemble(steps: Vec<docplan_extract::ExtractedEntity>, others: Vec<docplan_extract::ExtractedEntity>) -> Workflow {
    let graph = docplan_graph::build(step_specs(&steps)).unwrap();
    WorkflowAssembler::default()
        .assemble(AssemblyContext::new(DocumentId::new(), 1, reference()), &steps, &graph, others)
        .unwrap()
}

/// 1 -> {2, 3}
pub(crate) fn fork_workflow() -> Workflow {
    assemble(
        vec![
            create_step("a", 1, &[], 1),
            create_step("b", 2, &[1], 2),
            create_step("c", 3, &[1], 3),
        ],
        Vec::new(),
    )
}

/// Seven independent steps; steps 2, 4 and 6 carry deadlines on
/// 2025-03-01, 2025-01-20 and 2025-02-10
pub(crate) fn seven_step_workflow() -> Workflow {
    let steps = (1..=7u32)
        .map(|n| create_step(&format!("s{n}"), n, &[], n))
        .collect();
    assemble(
        steps,
        vec![
            create_deadline("d2", date(2025, 3, 1), 2),
            create_deadline("d4", date(2025, 1, 20), 4),
            create_deadline("d6", date(2025, 2, 10), 6),
        ],
    )
}
