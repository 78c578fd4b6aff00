//! Cross-validation between extracted entities
//!
//! A fact is cross-validated when another entity of the same kind states the
//! same fact from a different set of chunks. Only chunks a citation actually
//! resolves to count, so an ungrounded citation never confirms anything.

use crate::citation::ChunkRegistry;
use crate::entity::{DeadlineTiming, EntityKind, ExtractedEntity};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FactKey {
    Deadline(DeadlineTiming),
    Fee(Decimal, String),
    Document(String),
    Step(String),
    Contact(String, String),
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn fact_key(entity: &ExtractedEntity) -> FactKey {
    match &entity.kind {
        EntityKind::Deadline(d) => FactKey::Deadline(d.timing),
        EntityKind::Fee(f) => FactKey::Fee(f.amount.normalize(), f.currency.to_uppercase()),
        EntityKind::RequiredDocument(_) => FactKey::Document(normalize(&entity.description)),
        EntityKind::ProcessStep(_) => FactKey::Step(normalize(&entity.description)),
        EntityKind::ContactInfo(c) => FactKey::Contact(normalize(&c.channel), normalize(&c.value)),
    }
}

/// For each entity (same order as input), whether it is cross-validated
#[must_use]
pub fn cross_validate(entities: &[ExtractedEntity], registry: &ChunkRegistry) -> Vec<bool> {
    let mut groups: HashMap<FactKey, Vec<usize>> = HashMap::new();
    for (i, entity) in entities.iter().enumerate() {
        groups.entry(fact_key(entity)).or_default().push(i);
    }

    let chunks: Vec<BTreeSet<_>> = entities.iter().map(|e| e.grounded_chunks(registry)).collect();

    let mut confirmed = vec![false; entities.len()];
    for members in groups.values().filter(|m| m.len() > 1) {
        for &i in members {
            confirmed[i] = members
                .iter()
                .any(|&j| j != i && !chunks[j].is_empty() && chunks[j] != chunks[i]);
        }
    }
    confirmed
}
