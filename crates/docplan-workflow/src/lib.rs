//! docplan Workflow
//!
//! Turns a validated dependency graph plus scored entities into a numbered
//! [`Workflow`]:
//! - Steps renumbered 1..=N in topological order
//! - Deadlines, fees and required documents associated by citation overlap
//! - Time-sensitive steps flagged against the reference timestamp
//! - Critical path recomputed with each step's earliest deadline
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use docplan_extract::{Citation, DocumentId, EntityKind, ExtractedEntity, ProcessStep};
//! use docplan_workflow::{step_specs, AssemblyContext, WorkflowAssembler};
//!
//! let steps = vec![
//!     ExtractedEntity::new("s1", "Fill in the form", EntityKind::ProcessStep(ProcessStep::new(1)))
//!         .with_citation(Citation::new("c1", vec![1])),
//!     ExtractedEntity::new("s2", "Submit it", EntityKind::ProcessStep(ProcessStep::new(2).depends_on([1])))
//!         .with_citation(Citation::new("c2", vec![2])),
//! ];
//! let graph = docplan_graph::build(step_specs(&steps)).unwrap();
//! let ctx = AssemblyContext::new(DocumentId::new(), 1, Utc::now());
//!
//! let workflow = WorkflowAssembler::default().assemble(ctx, &steps, &graph, Vec::new()).unwrap();
//! assert_eq!(workflow.len(), 2);
//! assert_eq!(workflow.critical_path, vec![1, 2]);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod assembler;
mod error;
mod timing;
mod workflow;

pub use assembler::{partition_steps, step_specs, AssemblyContext, AssemblyPolicy, WorkflowAssembler};
pub use error::AssemblyError;
pub use timing::{process_anchor, DeadlineClock};
pub use workflow::{StepDeadline, Workflow, WorkflowStep};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
