use std::collections::HashMap;

use crate::{
    card::{SourceRecord, StoredRecord},
    text_manipulators::normalize_name,
};

/// `(lowercased trimmed name, card number)`.
pub type IdentityKey = (String, Option<String>);

pub fn key_for(name: &str, number: Option<&str>) -> IdentityKey {
    (normalize_name(name), number.map(str::to_string))
}

/// Lookup from identity key to a record's position in the dataset.
///
/// Built once per run and never changed afterwards. When two stored records
/// share a key only the first is reachable; the other is never enriched.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    positions: HashMap<IdentityKey, usize>,
    collisions: usize,
}

impl IdentityIndex {
    pub fn build(records: &[StoredRecord]) -> Self {
        let mut index = Self::default();
        for (i, record) in records.iter().enumerate() {
            let key = key_for(record.name().unwrap_or(""), record.set_number().as_deref());
            if index.positions.contains_key(&key) {
                index.collisions += 1;
                continue;
            }
            index.positions.insert(key, i);
        }
        index
    }

    /// Exact lookup, no fuzzy fallback.
    pub fn resolve(&self, source: &SourceRecord) -> Option<usize> {
        let key = key_for(&source.name, source.number.as_deref());
        self.positions.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Stored records shadowed by an earlier record with the same key.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}
