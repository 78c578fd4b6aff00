//! Testing utilities for docplan workspace
//!
//! Shared fixtures: a fixed reference timestamp, a small chunk registry and
//! entity constructors with sensible signals.

#![allow(missing_docs)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use docplan_extract::{
    ChunkRegistry, Citation, ContactInfo, Deadline, DocumentId, EntityKind, ExtractedEntity,
    ExtractionSignals, Fee, ProcessStep, RequiredDocument,
};
use rust_decimal::Decimal;

/// Pages in the fixture document
pub const PAGE_COUNT: u32 = 10;

/// Extraction completion time used by every fixture: 2025-01-01 09:00 UTC
pub fn reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Registry with chunks `c1`..=`c10`, chunk `cN` covering page N
pub fn create_registry(document_id: DocumentId) -> ChunkRegistry {
    let mut registry = ChunkRegistry::new(document_id, PAGE_COUNT);
    for page in 1..=PAGE_COUNT {
        registry.insert(format!("c{page}"), page, page);
    }
    registry
}

/// Citation of chunk `cN` on page N
pub fn cite(page: u32) -> Citation {
    Citation::new(format!("c{page}"), vec![page])
}

pub fn strong_signals() -> ExtractionSignals {
    ExtractionSignals {
        retrieval_scores: vec![0.6, 0.9],
        model_likelihood: Some(0.8),
        explicit: true,
    }
}

pub fn create_step(id: &str, number: u32, deps: &[u32], page: u32) -> ExtractedEntity {
    ExtractedEntity::new(
        id,
        format!("Step {number}"),
        EntityKind::ProcessStep(ProcessStep::new(number).depends_on(deps.iter().copied())),
    )
    .with_citation(cite(page))
    .with_signals(strong_signals())
}

pub fn create_deadline(id: &str, due: NaiveDate, page: u32) -> ExtractedEntity {
    ExtractedEntity::new(id, format!("Due {due}"), EntityKind::Deadline(Deadline::absolute(due)))
        .with_citation(cite(page))
        .with_signals(strong_signals())
}

pub fn create_fee(id: &str, cents: i64, page: u32) -> ExtractedEntity {
    ExtractedEntity::new(
        id,
        "Processing fee",
        EntityKind::Fee(Fee {
            amount: Decimal::new(cents, 2),
            currency: "EUR".to_string(),
            variable: false,
        }),
    )
    .with_citation(cite(page))
    .with_signals(strong_signals())
}

pub fn create_required_document(id: &str, name: &str, page: u32) -> ExtractedEntity {
    ExtractedEntity::new(id, name, EntityKind::RequiredDocument(RequiredDocument { mandatory: true }))
        .with_citation(cite(page))
        .with_signals(strong_signals())
}

pub fn create_contact(id: &str, value: &str, page: u32) -> ExtractedEntity {
    ExtractedEntity::new(
        id,
        "Help desk",
        EntityKind::ContactInfo(ContactInfo {
            channel: "phone".to_string(),
            value: value.to_string(),
        }),
    )
    .with_citation(cite(page))
}

/// Residence permit renewal: four steps, a diamond on step 1, with deadlines,
/// a fee, a document and a contact.
///
/// Extractor numbering: 1 -> {2, 3} -> 4. Step 2 carries the fee and a
/// deadline 20 days out; step 4 a deadline 45 days out.
pub fn create_sample_entities() -> Vec<ExtractedEntity> {
    vec![
        create_step("s1", 1, &[], 1),
        create_step("s2", 2, &[1], 2),
        create_step("s3", 3, &[1], 3),
        create_step("s4", 4, &[2, 3], 4),
        create_fee("fee", 8000, 2),
        create_deadline("d-early", date(2025, 1, 21), 2),
        create_deadline("d-late", date(2025, 2, 15), 4),
        create_required_document("passport", "Valid passport", 1),
        create_contact("desk", "+49 30 0000", 9),
    ]
}
