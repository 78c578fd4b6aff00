//! docplan Checklist
//!
//! Per-user tracking of a workflow:
//! - [`Checklist`]: one item per workflow step, mutated only by `toggle`
//! - [`ChecklistStore`]: live checklists, one writer at a time per checklist
//! - [`ProgressCalculator`]: percent complete, next actions, upcoming deadlines
//!
//! The invariant kept after every mutation: an item is completed only if all
//! of its dependency items are completed.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use docplan_checklist::{ChecklistError, ChecklistStore};
//! use docplan_extract::{Citation, DocumentId, EntityKind, ExtractedEntity, ProcessStep, UserId};
//! use docplan_workflow::{step_specs, AssemblyContext, WorkflowAssembler};
//!
//! let steps = vec![
//!     ExtractedEntity::new("s1", "Book appointment", EntityKind::ProcessStep(ProcessStep::new(1)))
//!         .with_citation(Citation::new("c1", vec![1])),
//!     ExtractedEntity::new("s2", "Attend", EntityKind::ProcessStep(ProcessStep::new(2).depends_on([1])))
//!         .with_citation(Citation::new("c2", vec![2])),
//! ];
//! let graph = docplan_graph::build(step_specs(&steps)).unwrap();
//! let workflow = WorkflowAssembler::default()
//!     .assemble(AssemblyContext::new(DocumentId::new(), 1, Utc::now()), &steps, &graph, Vec::new())
//!     .unwrap();
//!
//! let store = ChecklistStore::new();
//! let checklist = store.create(&workflow, UserId::new(), Utc::now()).unwrap();
//! let attend = checklist.item_for_step(2).unwrap().item_id;
//!
//! let err = store.toggle(checklist.checklist_id(), attend, true, Utc::now()).unwrap_err();
//! assert!(matches!(err, ChecklistError::ValidationError { .. }));
//! assert_eq!(store.progress(checklist.checklist_id()).unwrap().percent, 0);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod checklist;
mod error;
mod progress;
mod store;

#[cfg(test)]
mod test_fixtures;

pub use checklist::{Checklist, ChecklistItem, ChecklistItemView, ChecklistView, ItemState};
pub use error::ChecklistError;
pub use progress::{NextAction, ProgressCalculator, ProgressView, UpcomingDeadline};
pub use store::ChecklistStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
