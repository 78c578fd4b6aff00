//! Error types for the reconciliation core
//!
//! [`ReconcileError`] aggregates every stage's errors and classifies them for
//! the surrounding pipeline:
//! - Fallback: invalid extractor output or unavailable extraction; render the
//!   unstructured summary instead of a workflow
//! - User rejection: one requested checklist mutation refused, state untouched
//! - Fatal: a checklist diverged from its workflow and is halted

use crate::config::ConfigError;
use docplan_checklist::ChecklistError;
use docplan_extract::DocumentId;
use docplan_graph::GraphError;
use docplan_workflow::AssemblyError;
use serde::Serialize;

/// Main reconciliation error type
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Dangling dependency or duplicate step in the extracted steps
    #[error("validation failed: {0}")]
    Validation(GraphError),

    /// Circular step dependency
    #[error("{0}")]
    Cycle(GraphError),

    /// Assembly inputs disagree
    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    /// Checklist operation failed
    #[error(transparent)]
    Checklist(#[from] ChecklistError),

    /// The extraction collaborator gave up
    #[error("extraction unavailable for document {document_id}: {reason}")]
    ExtractionUnavailable {
        /// Document being processed
        document_id: DocumentId,
        /// Reason reported by the caller
        reason: String,
    },

    /// A newer or equal version of the document's workflow is already committed
    #[error("stale version {offered} for document {document_id}; version {current} is committed")]
    StaleVersion {
        /// Document
        document_id: DocumentId,
        /// Version offered
        offered: u32,
        /// Version already committed
        current: u32,
    },

    /// Processing was cancelled; nothing was committed
    #[error("processing of document {0} was cancelled")]
    Cancelled(DocumentId),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<GraphError> for ReconcileError {
    fn from(err: GraphError) -> Self {
        if err.is_cycle() {
            Self::Cycle(err)
        } else {
            Self::Validation(err)
        }
    }
}

impl ReconcileError {
    /// The caller should render the unstructured summary instead of a workflow
    #[inline]
    #[must_use]
    pub fn requires_fallback(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Cycle(_) | Self::Assembly(_) | Self::ExtractionUnavailable { .. }
        )
    }

    /// A single checklist mutation was refused
    #[inline]
    #[must_use]
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::Checklist(err) if err.is_user_rejection())
    }

    /// Halts operations pending manual repair
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Checklist(err) if err.is_fatal())
    }

    /// Steps on the rejected cycle, if this is a cycle error
    #[must_use]
    pub fn cycle_path(&self) -> Option<&[u32]> {
        match self {
            Self::Cycle(GraphError::Cycle { cycle_path }) => Some(cycle_path),
            _ => None,
        }
    }
}

/// Why the structured workflow was abandoned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum FallbackCause {
    /// Step dependencies are circular
    CircularDependencies {
        /// The cycle, first step repeated at the end
        cycle_path: Vec<u32>,
    },
    /// Step dependencies reference unknown or duplicate steps
    InvalidSteps,
    /// The extractor's steps could not be assembled
    AssemblyFailed,
    /// The extraction collaborator gave up
    ExtractionUnavailable,
}

/// Instruction to the surrounding system to show the simplified summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackDecision {
    #[serde(flatten)]
    pub cause: FallbackCause,
    /// Human-readable detail
    pub detail: String,
}

impl FallbackDecision {
    /// Fallback for `err`, or `None` if it is not a fallback-class error
    #[must_use]
    pub fn from_error(err: &ReconcileError) -> Option<Self> {
        let cause = match err {
            ReconcileError::Cycle(GraphError::Cycle { cycle_path }) => FallbackCause::CircularDependencies {
                cycle_path: cycle_path.clone(),
            },
            ReconcileError::Cycle(_) | ReconcileError::Validation(_) => FallbackCause::InvalidSteps,
            ReconcileError::Assembly(_) => FallbackCause::AssemblyFailed,
            ReconcileError::ExtractionUnavailable { .. } => FallbackCause::ExtractionUnavailable,
            _ => return None,
        };
        Some(Self {
            cause,
            detail: err.to_string(),
        })
    }
}
