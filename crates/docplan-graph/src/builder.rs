//! Dependency Graph Builder
//!
//! Construction runs in four passes and either yields a fully valid
//! [`DependencyGraph`] or nothing:
//! 1. Referential integrity: every dependency names an existing step
//! 2. Cycle detection: three-colour depth-first search, reporting the full cycle
//! 3. Topological order: Kahn's algorithm, lowest step number first among ready steps
//! 4. Critical path: longest duration-weighted path

use crate::critical_path;
use crate::error::GraphError;
use crate::graph::{DependencyGraph, StepSpec};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Builder for validated dependency graphs
///
/// Usage:
/// ```rust
/// use docplan_graph::{DependencyGraphBuilder, StepSpec};
///
/// let graph = DependencyGraphBuilder::new()
///     .add_step(StepSpec::new(1))
///     .add_step(StepSpec::new(2).depends_on([1]))
///     .add_step(StepSpec::new(3).depends_on([1]))
///     .build()
///     .unwrap();
/// assert_eq!(graph.topological_order(), vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraphBuilder {
    steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    Unvisited,
    InProgress,
    Done,
}

impl DependencyGraphBuilder {
    /// Create an empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder seeded with steps
    #[inline]
    #[must_use]
    pub fn from_steps(steps: Vec<StepSpec>) -> Self {
        Self { steps }
    }

    /// Add a step
    #[must_use]
    pub fn add_step(mut self, step: StepSpec) -> Self {
        self.steps.push(step);
        self
    }

    /// Number of steps added so far
    #[inline]
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Validate and build the graph.
    ///
    /// # Errors
    /// - `GraphError::DuplicateStep` if two steps share a number
    /// - `GraphError::MissingDependency` if a dependency names no step
    /// - `GraphError::Cycle` naming the full cycle if dependencies are circular
    pub fn build(self) -> Result<DependencyGraph, GraphError> {
        let mut steps = self.steps;
        steps.sort_by_key(|s| s.id);

        let mut index = HashMap::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            if index.insert(step.id, i).is_some() {
                return Err(GraphError::DuplicateStep(step.id));
            }
        }

        let mut prerequisites = vec![Vec::new(); steps.len()];
        let mut dependents = vec![Vec::new(); steps.len()];
        for (to, step) in steps.iter().enumerate() {
            // BTreeSet iteration keeps adjacency lists ascending
            for dep in &step.dependencies {
                let from = *index.get(dep).ok_or(GraphError::MissingDependency {
                    step: step.id,
                    missing_id: *dep,
                })?;
                prerequisites[to].push(from);
                dependents[from].push(to);
            }
        }
        for list in &mut dependents {
            list.sort_unstable();
        }

        if let Some(cycle) = find_cycle(&dependents) {
            let cycle_path: Vec<u32> = cycle.iter().map(|&i| steps[i].id).collect();
            tracing::warn!(cycle = ?cycle_path, "dependency cycle rejected");
            return Err(GraphError::Cycle { cycle_path });
        }

        let order = kahn_order(&prerequisites, &dependents);
        debug_assert_eq!(order.len(), steps.len());

        let mut graph = DependencyGraph {
            steps,
            index,
            prerequisites,
            order,
            critical_path: Vec::new(),
        };
        let hints: Vec<_> = graph.steps.iter().map(|s| s.deadline).collect();
        graph.critical_path = critical_path::longest_path(&graph, &hints);

        tracing::debug!(
            steps = graph.len(),
            edges = graph.edges().len(),
            critical_path = ?graph.critical_path,
            "dependency graph built"
        );
        Ok(graph)
    }
}

/// Build a graph directly from step specs
///
/// # Errors
/// See [`DependencyGraphBuilder::build`].
pub fn build(steps: Vec<StepSpec>) -> Result<DependencyGraph, GraphError> {
    DependencyGraphBuilder::from_steps(steps).build()
}

/// Three-colour DFS over prerequisite -> dependent edges.
///
/// Iterative, with an explicit `(node, next child)` stack, so chain length is
/// bounded by the heap rather than the thread stack. Returns the first cycle
/// found, rotated to start at its lowest index and closed by repeating that
/// index.
fn find_cycle(dependents: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut colour = vec![Colour::Unvisited; dependents.len()];
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..dependents.len() {
        if colour[root] != Colour::Unvisited {
            continue;
        }
        colour[root] = Colour::InProgress;
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let Some(&next) = dependents[node].get(top.1) else {
                colour[node] = Colour::Done;
                stack.pop();
                continue;
            };
            top.1 += 1;

            match colour[next] {
                Colour::InProgress => {
                    let start = stack.iter().position(|&(n, _)| n == next).unwrap_or(0);
                    let mut cycle: Vec<usize> = stack[start..].iter().map(|&(n, _)| n).collect();
                    let lowest = cycle
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, &n)| n)
                        .map_or(0, |(i, _)| i);
                    cycle.rotate_left(lowest);
                    cycle.push(cycle[0]);
                    return Some(cycle);
                }
                Colour::Unvisited => {
                    colour[next] = Colour::InProgress;
                    stack.push((next, 0));
                }
                Colour::Done => {}
            }
        }
    }
    None
}

/// Kahn's algorithm; among ready nodes the lowest index (= lowest step number) goes first
fn kahn_order(prerequisites: &[Vec<usize>], dependents: &[Vec<usize>]) -> Vec<usize> {
    let mut indegree: Vec<usize> = prerequisites.iter().map(Vec::len).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(prerequisites.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &next in &dependents[node] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }
    order
}
