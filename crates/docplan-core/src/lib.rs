//! docplan Core - document-to-workflow reconciliation
//!
//! Turns an extraction pass over one document into a committed workflow and
//! a checklist:
//! - [`Reconciler`]: scoring, grounding, dependency graph and assembly, with
//!   cancellation between stages
//! - [`WorkflowRegistry`]: one current workflow per document, versions only
//!   move forward
//! - [`DocumentPlanner`]: pipeline plus stores, the entry point for callers
//! - [`ReconcileError`]: every failure, classified as fallback, user
//!   rejection or fatal
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use docplan_core::prelude::*;
//! use docplan_extract::{Citation, ChunkRegistry, EntityKind, ExtractedEntity, ProcessStep};
//! use tokio_util::sync::CancellationToken;
//!
//! let document_id = DocumentId::new();
//! let registry = ChunkRegistry::new(document_id, 2).with_chunk("c1", 1, 1).with_chunk("c2", 2, 2);
//! let entities = vec![
//!     ExtractedEntity::new("s1", "Fill in the form", EntityKind::ProcessStep(ProcessStep::new(1)))
//!         .with_citation(Citation::new("c1", vec![1])),
//!     ExtractedEntity::new("s2", "Submit the form", EntityKind::ProcessStep(ProcessStep::new(2).depends_on([1])))
//!         .with_citation(Citation::new("c2", vec![2])),
//! ];
//!
//! let planner = DocumentPlanner::new(ReconcileConfig::new());
//! let planned = planner
//!     .ingest(ExtractionInput::new(registry, Utc::now(), entities), UserId::new(), Utc::now(), &CancellationToken::new())
//!     .unwrap();
//! assert_eq!(planned.workflow.critical_path, vec![1, 2]);
//! assert_eq!(planned.checklist.items().len(), 2);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod planner;
pub mod registry;

pub use config::{ConfigError, PipelineConfig, ReconcileConfig};
pub use error::{FallbackCause, FallbackDecision, ReconcileError};
pub use pipeline::{Extraction, ExtractionInput, ReconcileOutcome, ReconcileReport, Reconciler};
pub use planner::{DocumentPlanner, PlannedDocument};
pub use registry::WorkflowRegistry;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with docplan Core
    pub use crate::{
        DocumentPlanner, ExtractionInput, FallbackDecision, ReconcileConfig, ReconcileError, Reconciler,
        WorkflowRegistry,
    };
    pub use docplan_checklist::{Checklist, ChecklistStore, ProgressView};
    pub use docplan_extract::{DocumentId, UserId};
    pub use docplan_workflow::Workflow;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
