use docplan_checklist::{Checklist, ChecklistError, ChecklistStore};
use docplan_extract::{DocumentId, ExtractedEntity, ItemId, UserId};
use docplan_test_utils::{create_step, reference};
use docplan_workflow::{step_specs, AssemblyContext, Workflow, WorkflowAssembler};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

fn workflow_from(steps: Vec<ExtractedEntity>) -> Workflow {
    let graph = docplan_graph::build(step_specs(&steps)).unwrap();
    WorkflowAssembler::default()
        .assemble(AssemblyContext::new(DocumentId::new(), 1, reference()), &steps, &graph, Vec::new())
        .unwrap()
}

/// Chain 1 -> 2 -> ... -> n
fn chain(n: u32) -> Workflow {
    workflow_from(
        (1..=n)
            .map(|i| {
                let deps: Vec<u32> = if i == 1 { Vec::new() } else { vec![i - 1] };
                create_step(&format!("s{i}"), i, &deps, (i - 1) % 10 + 1)
            })
            .collect(),
    )
}

fn item_ids(checklist: &Checklist) -> Vec<ItemId> {
    checklist.items().iter().map(|i| i.item_id).collect()
}

#[test]
fn concurrent_toggles_on_one_checklist_keep_the_invariant() {
    let store = Arc::new(ChecklistStore::new());
    let workflow = chain(12);
    let checklist = store.create(&workflow, UserId::new(), reference()).unwrap();
    let id = checklist.checklist_id();
    let items = Arc::new(item_ids(&checklist));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = Arc::clone(&store);
            let items = Arc::clone(&items);
            thread::spawn(move || {
                for round in 0..200usize {
                    let item = items[(worker * 7 + round * 3) % items.len()];
                    let _ = store.toggle(id, item, (round + worker) % 3 != 0, reference());
                    let snapshot = store.snapshot(id).unwrap();
                    assert!(snapshot.is_dependency_consistent());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(store.snapshot(id).unwrap().is_dependency_consistent());
}

#[test]
fn unrelated_checklists_progress_independently() {
    let store = Arc::new(ChecklistStore::new());
    let workflows: Vec<Workflow> = (0..4).map(|_| chain(5)).collect();
    let ids: Vec<_> = workflows
        .iter()
        .map(|w| store.create(w, UserId::new(), reference()).unwrap().checklist_id())
        .collect();

    let handles: Vec<_> = ids
        .iter()
        .copied()
        .map(|id| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let items = item_ids(&store.snapshot(id).unwrap());
                for item in items {
                    assert!(store.toggle(id, item, true, reference()).unwrap());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for id in ids {
        assert_eq!(store.progress(id).unwrap().percent, 100);
    }
}

#[test]
fn checklist_survives_json_and_view_flattens_items() {
    let mut checklist = Checklist::create(&chain(3), UserId::new(), reference());
    let first = checklist.items()[0].item_id;
    assert!(checklist.toggle(first, true, reference()).unwrap());

    let json = serde_json::to_string(&checklist).unwrap();
    let restored: Checklist = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, checklist);

    let view = serde_json::to_value(checklist.view()).unwrap();
    let items = view["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["completed"], serde_json::json!(true));
    assert_eq!(items[1]["step_number"], serde_json::json!(2));
    assert_eq!(items[1]["can_complete"], serde_json::json!(true));
    assert_eq!(items[2]["can_complete"], serde_json::json!(false));
    assert!(items[0].get("item").is_none());
}

#[derive(Debug, Clone)]
enum Op {
    Toggle { index: usize, completed: bool },
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        (0..8usize, any::<bool>()).prop_map(|(index, completed)| Op::Toggle { index, completed }),
        0..60,
    )
}

/// 1 -> {2, 3}, {2, 3} -> 4, 4 -> {5, 6}, 7 and 8 free
fn diamond() -> Workflow {
    workflow_from(vec![
        create_step("a", 1, &[], 1),
        create_step("b", 2, &[1], 2),
        create_step("c", 3, &[1], 3),
        create_step("d", 4, &[2, 3], 4),
        create_step("e", 5, &[4], 5),
        create_step("f", 6, &[4], 6),
        create_step("g", 7, &[], 7),
        create_step("h", 8, &[], 8),
    ])
}

proptest! {
    #[test]
    fn prop_random_toggles_keep_invariant(ops in ops()) {
        let workflow = diamond();
        let mut checklist = Checklist::create(&workflow, UserId::new(), reference());
        let ids = item_ids(&checklist);

        for Op::Toggle { index, completed } in ops {
            let before = checklist.clone();
            match checklist.toggle(ids[index], completed, reference()) {
                Ok(_) => {
                    let item = checklist.item(ids[index]).unwrap();
                    prop_assert_eq!(item.completed, completed);
                    prop_assert_eq!(item.completed_at.is_some(), completed);
                }
                Err(ChecklistError::ValidationError { .. } | ChecklistError::DependencyConflict { .. }) => {
                    prop_assert_eq!(&checklist, &before);
                }
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
            prop_assert!(checklist.is_dependency_consistent());
        }
    }

    #[test]
    fn prop_percent_is_bounded_and_exact_at_edges(done in 0..=8usize) {
        let workflow = diamond();
        let mut checklist = Checklist::create(&workflow, UserId::new(), reference());
        // items are in topological order, so completing a prefix always succeeds
        for id in item_ids(&checklist).into_iter().take(done) {
            checklist.toggle(id, true, reference()).unwrap();
        }
        let view = docplan_checklist::ProgressCalculator::new().progress(&checklist);
        prop_assert!(view.percent <= 100);
        prop_assert_eq!(view.completed, done);
        if done == 8 {
            prop_assert_eq!(view.percent, 100);
            prop_assert!(view.next_actions.is_empty());
        }
    }
}
