//! Citation grounding
//!
//! [`CitationValidator`] only answers "is this citation grounded". What to do
//! about an ungrounded one is decided by [`ground_entity`]: downgrade the
//! owning entity's confidence and flag it for manual verification. Neither
//! aborts the pipeline.

use crate::citation::{Citation, ChunkRegistry};
use crate::confidence::AdjustmentCause;
use crate::entity::{ExtractedEntity, VerificationFlag};
use crate::error::{CitationDefect, InvalidCitation};
use serde::{Deserialize, Serialize};

/// Consequence applied to entities with ungrounded citations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingPolicy {
    /// Multiplier applied to confidence once per invalid citation
    pub invalid_citation_factor: f64,
}

impl Default for GroundingPolicy {
    fn default() -> Self {
        Self {
            invalid_citation_factor: 0.2,
        }
    }
}

/// Checks citations against a document's chunk registry
#[derive(Debug, Clone, Copy, Default)]
pub struct CitationValidator;

impl CitationValidator {
    /// Create validator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate one citation.
    ///
    /// # Errors
    /// - `UnknownChunk` if the chunk is absent from the registry
    /// - `ForeignChunk` if the chunk belongs to another document
    /// - `PageOutOfRange` if a page lies outside the document
    pub fn validate(&self, citation: &Citation, registry: &ChunkRegistry) -> Result<(), InvalidCitation> {
        let info = registry
            .get(&citation.chunk_id)
            .ok_or_else(|| CitationDefect::UnknownChunk(citation.chunk_id.clone()))?;

        if info.document_id != registry.document_id {
            return Err(CitationDefect::ForeignChunk {
                chunk_id: citation.chunk_id.clone(),
                owner: info.document_id,
            }
            .into());
        }

        let pages = registry.page_range();
        if let Some(&page) = citation.pages.iter().find(|p| !pages.contains(p)) {
            return Err(CitationDefect::PageOutOfRange {
                page,
                page_count: registry.page_count,
            }
            .into());
        }

        Ok(())
    }
}

/// Validate every citation of `entity`, downgrading and flagging it per failure.
///
/// Returns the failures so the caller can log or report them.
pub fn ground_entity(
    entity: &mut ExtractedEntity,
    registry: &ChunkRegistry,
    policy: &GroundingPolicy,
) -> Vec<InvalidCitation> {
    let validator = CitationValidator::new();
    let failures: Vec<(usize, InvalidCitation)> = entity
        .citations
        .iter()
        .enumerate()
        .filter_map(|(i, c)| validator.validate(c, registry).err().map(|e| (i, e)))
        .collect();

    for (index, failure) in &failures {
        let before = entity.confidence.value();
        let after = entity
            .confidence
            .discount(AdjustmentCause::InvalidCitation, policy.invalid_citation_factor);
        let chunk_id = entity.citations[*index].chunk_id.clone();
        tracing::warn!(
            entity = %entity.id,
            chunk = %chunk_id,
            before,
            after,
            "citation not grounded: {}",
            failure.reason
        );
        entity.flag(VerificationFlag::InvalidCitation {
            chunk_id,
            reason: failure.reason.to_string(),
        });
    }

    failures.into_iter().map(|(_, e)| e).collect()
}
