//! Extracted entity model
//!
//! Entities are a tagged sum type sharing base fields (citations, confidence),
//! so scoring and grounding never need to know which variant they handle.

use crate::citation::{Citation, ChunkRegistry};
use crate::confidence::Confidence;
use crate::grounding::CitationValidator;
use crate::ids::{ChunkId, EntityId};
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One fact produced by the extraction collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    /// Extractor-assigned identifier
    pub id: EntityId,
    /// Human-readable statement of the fact
    pub description: String,
    /// Variant-specific payload
    #[serde(flatten)]
    pub kind: EntityKind,
    /// Source pointers backing the fact
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Trust in the fact; only changes through recorded adjustments
    #[serde(default)]
    pub confidence: Confidence,
    /// Raw signals the confidence is computed from
    #[serde(default)]
    pub signals: ExtractionSignals,
    /// Reasons this fact needs a human to check it
    #[serde(default)]
    pub verification: Vec<VerificationFlag>,
}

impl ExtractedEntity {
    /// Create an entity with no citations and zero confidence
    pub fn new(id: impl Into<EntityId>, description: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            kind,
            citations: Vec::new(),
            confidence: Confidence::default(),
            signals: ExtractionSignals::default(),
            verification: Vec::new(),
        }
    }

    /// With citation
    #[must_use]
    pub fn with_citation(mut self, citation: Citation) -> Self {
        self.citations.push(citation);
        self
    }

    /// With extraction signals
    #[must_use]
    pub fn with_signals(mut self, signals: ExtractionSignals) -> Self {
        self.signals = signals;
        self
    }

    /// With initial (extractor-reported) confidence
    #[must_use]
    pub fn with_confidence(mut self, value: f64) -> Self {
        self.confidence = Confidence::new(value);
        self
    }

    /// Whether any verification flag is raised
    #[inline]
    #[must_use]
    pub fn needs_verification(&self) -> bool {
        !self.verification.is_empty()
    }

    /// Raise a verification flag
    pub fn flag(&mut self, flag: VerificationFlag) {
        self.verification.push(flag);
    }

    /// Step payload, if this is a process step
    #[inline]
    #[must_use]
    pub fn as_step(&self) -> Option<&ProcessStep> {
        match &self.kind {
            EntityKind::ProcessStep(step) => Some(step),
            _ => None,
        }
    }

    /// Deadline payload, if this is a deadline
    #[inline]
    #[must_use]
    pub fn as_deadline(&self) -> Option<&Deadline> {
        match &self.kind {
            EntityKind::Deadline(deadline) => Some(deadline),
            _ => None,
        }
    }

    /// Whether any citation shares a chunk or page span with any of `other`'s
    #[must_use]
    pub fn overlaps(&self, other: &[Citation]) -> bool {
        self.citations
            .iter()
            .any(|mine| other.iter().any(|theirs| mine.overlaps(theirs)))
    }

    /// Distinct chunks this entity is cited from, counting only citations
    /// that resolve against `registry`
    #[must_use]
    pub fn grounded_chunks(&self, registry: &ChunkRegistry) -> BTreeSet<&ChunkId> {
        let validator = CitationValidator::new();
        self.citations
            .iter()
            .filter(|c| validator.validate(c, registry).is_ok())
            .map(|c| &c.chunk_id)
            .collect()
    }
}

/// Variant payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKind {
    /// Something must happen by a date
    Deadline(Deadline),
    /// Something must be paid
    Fee(Fee),
    /// Something must be supplied
    RequiredDocument(RequiredDocument),
    /// Something must be done
    ProcessStep(ProcessStep),
    /// Someone can be contacted
    ContactInfo(ContactInfo),
}

impl EntityKind {
    /// Short variant name for logs and reports
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Deadline(_) => "deadline",
            EntityKind::Fee(_) => "fee",
            EntityKind::RequiredDocument(_) => "required_document",
            EntityKind::ProcessStep(_) => "process_step",
            EntityKind::ContactInfo(_) => "contact_info",
        }
    }
}

/// When a deadline falls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeadlineTiming {
    /// A calendar date stated in the document
    Absolute {
        /// The stated date
        date: NaiveDate,
    },
    /// An offset from the start of the process
    Relative {
        /// Days after the process starts
        days_from_start: i64,
    },
}

/// Deadline payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    /// Absolute date or relative offset
    pub timing: DeadlineTiming,
    /// This absolute date marks the start of the process and anchors relative deadlines
    #[serde(default)]
    pub anchors_process: bool,
}

impl Deadline {
    /// Absolute deadline
    #[inline]
    #[must_use]
    pub fn absolute(date: NaiveDate) -> Self {
        Self {
            timing: DeadlineTiming::Absolute { date },
            anchors_process: false,
        }
    }

    /// Relative deadline
    #[inline]
    #[must_use]
    pub fn relative(days_from_start: i64) -> Self {
        Self {
            timing: DeadlineTiming::Relative { days_from_start },
            anchors_process: false,
        }
    }

    /// Process start anchor
    #[inline]
    #[must_use]
    pub fn anchor(date: NaiveDate) -> Self {
        Self {
            timing: DeadlineTiming::Absolute { date },
            anchors_process: true,
        }
    }

    /// Resolve to a calendar date.
    ///
    /// Relative offsets count from `anchor` when one was extracted for the
    /// process, otherwise from the reference timestamp's date.
    #[must_use]
    pub fn resolve(&self, reference: DateTime<Utc>, anchor: Option<NaiveDate>) -> Option<NaiveDate> {
        match self.timing {
            DeadlineTiming::Absolute { date } => Some(date),
            DeadlineTiming::Relative { days_from_start } => {
                let start = anchor.unwrap_or_else(|| reference.date_naive());
                let offset = Days::new(days_from_start.unsigned_abs());
                if days_from_start >= 0 {
                    start.checked_add_days(offset)
                } else {
                    start.checked_sub_days(offset)
                }
            }
        }
    }
}

/// Fee payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// Amount due
    pub amount: Decimal,
    /// ISO currency code
    pub currency: String,
    /// The amount depends on circumstances
    #[serde(default)]
    pub variable: bool,
}

/// Required document payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredDocument {
    /// Must be supplied (as opposed to recommended)
    #[serde(default = "default_true")]
    pub mandatory: bool,
}

fn default_true() -> bool {
    true
}

/// Process step payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStep {
    /// Step number as numbered by the extractor
    pub step_number: u32,
    /// Extractor step numbers that must complete first
    #[serde(default)]
    pub dependencies: BTreeSet<u32>,
    /// Estimated duration in days
    #[serde(default)]
    pub estimated_days: Option<u32>,
    /// Plain-language rendering of the description
    #[serde(default)]
    pub simplified_description: Option<String>,
}

impl ProcessStep {
    /// Step without dependencies
    #[inline]
    #[must_use]
    pub fn new(step_number: u32) -> Self {
        Self {
            step_number,
            dependencies: BTreeSet::new(),
            estimated_days: None,
            simplified_description: None,
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
}

/// Contact payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Channel, e.g. phone, email, address
    pub channel: String,
    /// Channel-specific value
    pub value: String,
}

/// Raw signals reported alongside an entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSignals {
    /// Retrieval relevance of each supporting chunk
    #[serde(default)]
    pub retrieval_scores: Vec<f64>,
    /// Model token likelihood, when the model reported one
    #[serde(default)]
    pub model_likelihood: Option<f64>,
    /// The source states the fact outright
    #[serde(default)]
    pub explicit: bool,
}

/// Why an entity needs manual verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "flag", rename_all = "snake_case")]
pub enum VerificationFlag {
    /// A citation did not resolve against the chunk registry
    InvalidCitation {
        /// Chunk the citation named
        chunk_id: ChunkId,
        /// Why it failed
        reason: String,
    },
    /// The entity overlaps several steps and was attached to all of them
    AmbiguousAssociation {
        /// Final step numbers it was attached to
        steps: Vec<u32>,
    },
    /// The entity overlaps no step
    Unplaced,
}
