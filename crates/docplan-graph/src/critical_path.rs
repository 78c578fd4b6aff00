//! Critical path: longest duration-weighted path through the DAG
//!
//! Ties between equally heavy paths go to the path whose terminal step has
//! the earliest deadline (steps without one sort last), then to the path
//! that is lexicographically smallest by step number.

use crate::graph::DependencyGraph;
use chrono::NaiveDate;
use std::cmp::Ordering;

fn deadline_key(deadline: Option<NaiveDate>) -> (u8, NaiveDate) {
    deadline.map_or((1, NaiveDate::MAX), |d| (0, d))
}

/// Arena indices from the root of `end`'s heaviest path to `end`
fn trace(predecessor: &[Option<usize>], end: usize) -> Vec<usize> {
    let mut path = vec![end];
    let mut cursor = end;
    while let Some(prev) = predecessor[cursor] {
        path.push(prev);
        cursor = prev;
    }
    path.reverse();
    path
}

pub(crate) fn longest_path(graph: &DependencyGraph, deadlines: &[Option<NaiveDate>]) -> Vec<u32> {
    let n = graph.steps.len();
    // Heaviest path ending at each node, kept as a weight and a predecessor.
    // Indices are ordered like step numbers, so comparing index paths
    // compares step paths.
    let mut weight = vec![0u64; n];
    let mut predecessor: Vec<Option<usize>> = vec![None; n];

    for &node in &graph.order {
        let mut chosen: Option<usize> = None;
        for &candidate in &graph.prerequisites[node] {
            chosen = Some(match chosen {
                None => candidate,
                Some(current) => match weight[candidate].cmp(&weight[current]) {
                    Ordering::Greater => candidate,
                    Ordering::Less => current,
                    // equal prefixes: compare the paths extended by `node`,
                    // a proper prefix must not win on length alone
                    Ordering::Equal => {
                        let mut via_candidate = trace(&predecessor, candidate);
                        via_candidate.push(node);
                        let mut via_current = trace(&predecessor, current);
                        via_current.push(node);
                        if via_candidate < via_current {
                            candidate
                        } else {
                            current
                        }
                    }
                },
            });
        }

        predecessor[node] = chosen;
        let base = chosen.map_or(0, |p| weight[p]);
        weight[node] = base.saturating_add(graph.steps[node].weight());
    }

    (0..n)
        .max_by(|&a, &b| {
            weight[a]
                .cmp(&weight[b])
                .then_with(|| deadline_key(deadlines[b]).cmp(&deadline_key(deadlines[a])))
                .then_with(|| trace(&predecessor, b).cmp(&trace(&predecessor, a)))
        })
        .map(|end| trace(&predecessor, end).into_iter().map(|i| graph.steps[i].id).collect())
        .unwrap_or_default()
}

/// Total weight of a path of step numbers; unknown steps weigh nothing
#[must_use]
pub fn path_weight(graph: &DependencyGraph, path: &[u32]) -> u64 {
    path.iter()
        .filter_map(|&id| graph.step(id))
        .map(crate::StepSpec::weight)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build, StepSpec};
    use pretty_assertions::assert_eq;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn unit_weights_pick_longest_chain() {
        let graph = build(vec![
            StepSpec::new(1),
            StepSpec::new(2).depends_on([1]),
            StepSpec::new(3).depends_on([2]),
            StepSpec::new(4).depends_on([1]),
        ])
        .unwrap();
        assert_eq!(graph.critical_path(), &[1, 2, 3]);
        assert_eq!(path_weight(&graph, graph.critical_path()), 3);
    }

    #[test]
    fn durations_outweigh_step_count() {
        let graph = build(vec![
            StepSpec::new(1),
            StepSpec::new(2).depends_on([1]),
            StepSpec::new(3).depends_on([2]),
            StepSpec::new(4).depends_on([1]).with_estimated_days(10),
        ])
        .unwrap();
        assert_eq!(graph.critical_path(), &[1, 4]);
    }

    #[test]
    fn equal_weight_prefers_earliest_terminal_deadline() {
        let graph = build(vec![
            StepSpec::new(1),
            StepSpec::new(2).depends_on([1]).with_deadline(date(20)),
            StepSpec::new(3).depends_on([1]).with_deadline(date(10)),
        ])
        .unwrap();
        assert_eq!(graph.critical_path(), &[1, 3]);
    }

    #[test]
    fn deadline_beats_missing_deadline() {
        let graph = build(vec![
            StepSpec::new(1),
            StepSpec::new(2).depends_on([1]),
            StepSpec::new(3).depends_on([1]).with_deadline(date(31)),
        ])
        .unwrap();
        assert_eq!(graph.critical_path(), &[1, 3]);
    }

    #[test]
    fn full_tie_prefers_lower_step_numbers() {
        let graph = build(vec![
            StepSpec::new(1),
            StepSpec::new(2),
            StepSpec::new(3).depends_on([1, 2]),
            StepSpec::new(4).depends_on([1, 2]),
        ])
        .unwrap();
        assert_eq!(graph.critical_path(), &[1, 3]);
    }

    #[test]
    fn recompute_with_external_deadlines() {
        let graph = build(vec![
            StepSpec::new(1),
            StepSpec::new(2).depends_on([1]),
            StepSpec::new(3).depends_on([1]),
        ])
        .unwrap();
        assert_eq!(graph.critical_path(), &[1, 2]);
        let path = graph.critical_path_with(|id| (id == 3).then(|| date(5)));
        assert_eq!(path, vec![1, 3]);
    }

    #[test]
    fn zero_duration_step_extends_the_tied_path() {
        // [1, 3] and [1, 2, 3] weigh the same; the longer one is smaller by step number
        let graph = build(vec![
            StepSpec::new(1),
            StepSpec::new(2).depends_on([1]).with_estimated_days(0),
            StepSpec::new(3).depends_on([1, 2]),
        ])
        .unwrap();
        assert_eq!(graph.critical_path(), &[1, 2, 3]);
        assert_eq!(path_weight(&graph, graph.critical_path()), 2);
    }

    #[test]
    fn zero_duration_prefix_loses_to_lower_step() {
        // via 3 (zero days) or directly from 1; [1, 2, 4] < [1, 3, 4]
        let graph = build(vec![
            StepSpec::new(1),
            StepSpec::new(2).depends_on([1]).with_estimated_days(0),
            StepSpec::new(3).depends_on([1]).with_estimated_days(0),
            StepSpec::new(4).depends_on([2, 3]),
        ])
        .unwrap();
        assert_eq!(graph.critical_path(), &[1, 2, 4]);
    }
}
