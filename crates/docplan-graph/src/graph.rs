//! Validated dependency graph
//!
//! Nodes live in a flat arena indexed by position; step numbers map to
//! positions in ascending order, so the lowest position is always the lowest
//! step number. Edges point from prerequisite to dependent.

use crate::builder::DependencyGraphBuilder;
use crate::critical_path;
use crate::error::GraphError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Graph input for one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Step number
    pub id: u32,
    /// Step numbers that must complete first
    #[serde(default)]
    pub dependencies: BTreeSet<u32>,
    /// Estimated duration in days; missing durations weigh 1
    #[serde(default)]
    pub estimated_days: Option<u32>,
    /// Earliest deadline known for the step, used to break critical-path ties
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

impl StepSpec {
    /// Step without dependencies
    #[inline]
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self {
            id,
            dependencies: BTreeSet::new(),
            estimated_days: None,
            deadline: None,
        }
    }

    /// With dependencies
    #[must_use]
    pub fn depends_on(mut self, deps: impl IntoIterator<Item = u32>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    /// With estimated duration
    #[inline]
    #[must_use]
    pub fn with_estimated_days(mut self, days: u32) -> Self {
        self.estimated_days = Some(days);
        self
    }

    /// With deadline hint
    #[inline]
    #[must_use]
    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Critical-path weight
    #[inline]
    #[must_use]
    pub fn weight(&self) -> u64 {
        self.estimated_days.map_or(1, u64::from)
    }
}

/// Acyclic, referentially intact step dependency graph.
///
/// Only constructed by [`DependencyGraphBuilder::build`]; deserialization
/// re-runs the builder so an invalid graph can never be materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "GraphRecord", try_from = "GraphRecord")]
pub struct DependencyGraph {
    pub(crate) steps: Vec<StepSpec>,
    pub(crate) index: HashMap<u32, usize>,
    pub(crate) prerequisites: Vec<Vec<usize>>,
    pub(crate) order: Vec<usize>,
    pub(crate) critical_path: Vec<u32>,
}

impl DependencyGraph {
    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the graph has no steps
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether `id` names a step
    #[inline]
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    /// Step numbers in ascending order
    pub fn nodes(&self) -> impl Iterator<Item = u32> + '_ {
        self.steps.iter().map(|s| s.id)
    }

    /// Input spec of a step
    #[must_use]
    pub fn step(&self, id: u32) -> Option<&StepSpec> {
        self.index.get(&id).map(|&i| &self.steps[i])
    }

    /// All edges as (prerequisite, dependent), sorted
    #[must_use]
    pub fn edges(&self) -> Vec<(u32, u32)> {
        let mut edges: Vec<(u32, u32)> = self
            .prerequisites
            .iter()
            .enumerate()
            .flat_map(|(to, froms)| froms.iter().map(move |&from| (from, to)))
            .map(|(from, to)| (self.steps[from].id, self.steps[to].id))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Steps that must complete before `id`, ascending
    #[must_use]
    pub fn prerequisites_of(&self, id: u32) -> Vec<u32> {
        self.index
            .get(&id)
            .map(|&i| self.prerequisites[i].iter().map(|&j| self.steps[j].id).collect())
            .unwrap_or_default()
    }

    /// Steps with no prerequisites, ascending
    #[must_use]
    pub fn entry_steps(&self) -> Vec<u32> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(i, _)| self.prerequisites[*i].is_empty())
            .map(|(_, s)| s.id)
            .collect()
    }

    /// Topological order, lowest-numbered ready step first
    #[must_use]
    pub fn topological_order(&self) -> Vec<u32> {
        self.order.iter().map(|&i| self.steps[i].id).collect()
    }

    /// Longest duration-weighted path, using the deadline hints given at build time
    #[inline]
    #[must_use]
    pub fn critical_path(&self) -> &[u32] {
        &self.critical_path
    }

    /// Recompute the critical path with externally known deadlines per step
    pub fn critical_path_with<F>(&self, deadline_of: F) -> Vec<u32>
    where
        F: Fn(u32) -> Option<NaiveDate>,
    {
        let deadlines: Vec<Option<NaiveDate>> = self.steps.iter().map(|s| deadline_of(s.id)).collect();
        critical_path::longest_path(self, &deadlines)
    }

    /// Input specs in ascending step order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }
}

/// Serialized form of a [`DependencyGraph`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRecord {
    /// Steps with their dependencies
    pub steps: Vec<StepSpec>,
}

impl From<DependencyGraph> for GraphRecord {
    fn from(graph: DependencyGraph) -> Self {
        Self { steps: graph.steps }
    }
}

impl TryFrom<GraphRecord> for DependencyGraph {
    type Error = GraphError;

    fn try_from(record: GraphRecord) -> Result<Self, Self::Error> {
        DependencyGraphBuilder::from_steps(record.steps).build()
    }
}
