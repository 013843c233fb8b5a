use crate::model::{PlayerRecord, SeasonKey};
use crate::normalize::{fold, normalize_name};

/// A record together with its precomputed search key.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) record: PlayerRecord,
    pub(crate) folded: String,
}

/// All players of one season table, in source order.
///
/// Built once from a full scrape (or snapshot) and never mutated afterwards;
/// a refresh replaces the whole index. Records that share a name are all
/// kept so lookups can report them as candidates.
#[derive(Debug, Clone)]
pub struct SeasonIndex {
    key: SeasonKey,
    entries: Vec<Entry>,
}

impl SeasonIndex {
    pub fn new(key: SeasonKey, records: impl IntoIterator<Item = PlayerRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|mut record| {
                record.name = normalize_name(&record.name);
                let folded = fold(&record.name);
                Entry { record, folded }
            })
            .collect();
        Self { key, entries }
    }

    pub fn key(&self) -> SeasonKey {
        self.key
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub(crate) fn entries(&self) -> &[Entry] {
        &self.entries
    }
}
