//! docplan Extract
//!
//! The entity-level half of reconciliation. Everything here is pure and
//! per-entity, so it can fan out across any number of threads.
//!
//! # Core Concepts
//!
//! - [`ExtractedEntity`]: tagged sum type over deadlines, fees, required
//!   documents, process steps and contacts, sharing citations and confidence
//! - [`ConfidenceScorer`]: bounded, monotonic confidence from raw signals
//! - [`CitationValidator`]: does a citation resolve against the [`ChunkRegistry`]
//! - [`ground_entity`]: downgrade and flag entities whose citations do not
//! - [`cross_validate`]: detect facts confirmed by independent extractions
//!
//! # Example
//!
//! ```rust
//! use docplan_extract::{Citation, ChunkRegistry, ConfidenceScorer, CitationValidator, DocumentId};
//!
//! let registry = ChunkRegistry::new(DocumentId::new(), 4).with_chunk("c1", 1, 2);
//! assert!(CitationValidator::new().validate(&Citation::new("c1", vec![2]), &registry).is_ok());
//!
//! let score = ConfidenceScorer::default().score(&[0.9], Some(0.8), true, false);
//! assert!(score > 0.7 && score <= 1.0);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod citation;
mod confidence;
mod cross_check;
mod entity;
mod error;
mod grounding;
mod ids;

pub use citation::{ChunkInfo, ChunkRegistry, Citation};
pub use confidence::{AdjustmentCause, Confidence, ConfidenceAdjustment, ConfidenceScorer, ScoringWeights};
pub use cross_check::cross_validate;
pub use entity::{
    ContactInfo, Deadline, DeadlineTiming, EntityKind, ExtractedEntity, ExtractionSignals, Fee,
    ProcessStep, RequiredDocument, VerificationFlag,
};
pub use error::{CitationDefect, InvalidCitation};
pub use grounding::{ground_entity, CitationValidator, GroundingPolicy};
pub use ids::{ChecklistId, ChunkId, DocumentId, EntityId, ItemId, UserId, WorkflowId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
