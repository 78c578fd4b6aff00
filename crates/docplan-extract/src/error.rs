//! Error types for entity grounding

use crate::ids::{ChunkId, DocumentId};

/// Why a citation failed to resolve
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CitationDefect {
    /// The chunk identifier is not in the registry
    #[error("chunk {0} is not in the chunk registry")]
    UnknownChunk(ChunkId),

    /// A page number lies outside the document
    #[error("page {page} is outside pages 1..={page_count}")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// The chunk exists but belongs to a different document
    #[error("chunk {chunk_id} belongs to document {owner}")]
    ForeignChunk { chunk_id: ChunkId, owner: DocumentId },
}

/// Citation does not resolve against the chunk registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid citation: {reason}")]
pub struct InvalidCitation {
    /// What was wrong with it
    pub reason: CitationDefect,
}

impl From<CitationDefect> for InvalidCitation {
    fn from(reason: CitationDefect) -> Self {
        Self { reason }
    }
}
