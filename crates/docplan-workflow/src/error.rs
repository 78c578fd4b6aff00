//! Assembly errors

use docplan_extract::EntityId;
use docplan_graph::GraphError;

/// Workflow assembly errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    /// A graph node has no step entity
    #[error("graph step {0} has no step entity")]
    MissingStep(u32),

    /// A step entity is not a node of the graph
    #[error("step entity {entity} (step {step}) is not in the dependency graph")]
    UnknownStep {
        /// Offending entity
        entity: EntityId,
        /// Its extractor step number
        step: u32,
    },

    /// Two step entities claim the same step number
    #[error("step {0} is claimed by more than one entity")]
    DuplicateStep(u32),

    /// An entity in the step list is not a process step, or a process step was
    /// passed among the associated entities
    #[error("entity {0} is in the wrong assembly input")]
    MisplacedEntity(EntityId),

    /// Renumbered graph failed to rebuild
    #[error("renumbered graph is invalid: {0}")]
    Graph(#[from] GraphError),

    /// A workflow step and the dependency graph disagree
    #[error("step {0} does not match the dependency graph")]
    GraphMismatch(u32),

    /// Step numbers are not exactly 1..=N in order
    #[error("workflow step numbering is not contiguous: expected {expected}, found {found}")]
    Numbering {
        /// Expected number at this position
        expected: u32,
        /// Number actually found
        found: u32,
    },
}
