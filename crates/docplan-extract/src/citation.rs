//! Citations and the chunk registry they must resolve against

use crate::ids::{ChunkId, DocumentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Pointer from an extracted fact back to the source text it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk the quote was taken from
    pub chunk_id: ChunkId,
    /// 1-based page numbers covered by the quote
    #[serde(default)]
    pub pages: Vec<u32>,
    /// Quoted span of source text
    #[serde(default)]
    pub quote: String,
}

impl Citation {
    /// Create a citation for a chunk
    #[inline]
    pub fn new(chunk_id: impl Into<ChunkId>, pages: Vec<u32>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            pages,
            quote: String::new(),
        }
    }

    /// With quoted span
    #[inline]
    #[must_use]
    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        self.quote = quote.into();
        self
    }

    /// Inclusive page span (min..=max), or `None` without pages
    #[must_use]
    pub fn page_span(&self) -> Option<RangeInclusive<u32>> {
        let min = self.pages.iter().min()?;
        let max = self.pages.iter().max()?;
        Some(*min..=*max)
    }

    /// Two citations overlap when they share a chunk or their page spans intersect
    #[must_use]
    pub fn overlaps(&self, other: &Citation) -> bool {
        if self.chunk_id == other.chunk_id {
            return true;
        }
        match (self.page_span(), other.page_span()) {
            (Some(a), Some(b)) => a.start() <= b.end() && b.start() <= a.end(),
            _ => false,
        }
    }
}

/// Known chunk metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    /// Document the chunk belongs to
    pub document_id: DocumentId,
    /// First page covered by the chunk
    pub first_page: u32,
    /// Last page covered by the chunk
    pub last_page: u32,
}

/// Registry of the chunks produced for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRegistry {
    /// Owning document
    pub document_id: DocumentId,
    /// Number of pages in the document
    pub page_count: u32,
    #[serde(default)]
    chunks: HashMap<ChunkId, ChunkInfo>,
}

impl ChunkRegistry {
    /// Create an empty registry for a document
    #[inline]
    #[must_use]
    pub fn new(document_id: DocumentId, page_count: u32) -> Self {
        Self {
            document_id,
            page_count,
            chunks: HashMap::new(),
        }
    }

    /// Register a chunk of this document
    pub fn insert(&mut self, chunk_id: impl Into<ChunkId>, first_page: u32, last_page: u32) {
        self.chunks.insert(
            chunk_id.into(),
            ChunkInfo {
                document_id: self.document_id,
                first_page,
                last_page,
            },
        );
    }

    /// Register a chunk with explicit metadata (possibly from another document)
    pub fn insert_info(&mut self, chunk_id: impl Into<ChunkId>, info: ChunkInfo) {
        self.chunks.insert(chunk_id.into(), info);
    }

    /// Builder-style chunk registration
    #[must_use]
    pub fn with_chunk(mut self, chunk_id: impl Into<ChunkId>, first_page: u32, last_page: u32) -> Self {
        self.insert(chunk_id, first_page, last_page);
        self
    }

    /// Look up a chunk
    #[inline]
    #[must_use]
    pub fn get(&self, chunk_id: &ChunkId) -> Option<&ChunkInfo> {
        self.chunks.get(chunk_id)
    }

    /// Whether the chunk is known
    #[inline]
    #[must_use]
    pub fn contains(&self, chunk_id: &ChunkId) -> bool {
        self.chunks.contains_key(chunk_id)
    }

    /// Valid page numbers of the document
    #[inline]
    #[must_use]
    pub fn page_range(&self) -> RangeInclusive<u32> {
        1..=self.page_count
    }

    /// Number of registered chunks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunks are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
