use crate::models::PropertyRecord;
use std::collections::HashSet;

/// In-memory mirror of the remote property registry.
///
/// The remote store is the source of truth: the store is replaced wholesale by
/// [`RecordStore::load`] after every confirmed mutation. Each mutating call
/// bumps [`RecordStore::revision`] so cached renders can be discarded.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<PropertyRecord>,
    last_search: Option<Vec<PropertyRecord>>,
    revision: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every record with the given list.
    ///
    /// Records repeating an id already seen are dropped; the first occurrence wins.
    pub fn load(&mut self, records: Vec<PropertyRecord>) {
        let mut seen = HashSet::with_capacity(records.len());
        let mut unique = Vec::with_capacity(records.len());
        for record in records {
            if seen.insert(record.id) {
                unique.push(record);
            } else {
                tracing::warn!("Dropping duplicate record id {} on load", record.id);
            }
        }

        tracing::debug!("Record store loaded {} records", unique.len());
        self.records = unique;
        self.touch();
    }

    /// Inserts or replaces a record confirmed by the remote store.
    pub fn upsert_local(&mut self, record: PropertyRecord) {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        self.touch();
    }

    /// Removes a record; returns whether it was present.
    pub fn remove_local(&mut self, id: i64) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        let removed = self.records.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn find_by_id(&self, id: i64) -> Option<&PropertyRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// First record whose owner equals `owner` (trimmed, case-insensitive) or
    /// whose id equals `id`.
    pub fn find_by_owner_or_id(&self, owner: Option<&str>, id: Option<i64>) -> Option<&PropertyRecord> {
        let owner = owner
            .map(|o| o.trim().to_lowercase())
            .filter(|o| !o.is_empty());
        if owner.is_none() && id.is_none() {
            return None;
        }

        self.records.iter().find(|r| {
            let owner_match = owner
                .as_deref()
                .is_some_and(|o| r.owner().trim().to_lowercase() == o);
            let id_match = id.is_some_and(|id| r.id == id);
            owner_match || id_match
        })
    }

    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remembers the records returned by the latest search.
    pub fn set_search_results(&mut self, results: Vec<PropertyRecord>) {
        self.last_search = Some(results);
        self.touch();
    }

    pub fn clear_search_results(&mut self) {
        if self.last_search.take().is_some() {
            self.touch();
        }
    }

    pub fn last_search(&self) -> Option<&[PropertyRecord]> {
        self.last_search.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
