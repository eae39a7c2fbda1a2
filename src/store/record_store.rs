//! Record store: ordered records plus an id lookup.

use std::collections::HashMap;

use crate::types::{FacetError, FacetResult, Record, RecordId, MAX_RECORDS};

/// The current working set of records. Positions are stable for the lifetime
/// of the store and are the members of every index bitmap.
#[derive(Debug, Default)]
pub struct RecordStore {
    /// All records, in load order.
    records: Vec<Record>,
    /// id -> position of the first record carrying that id.
    positions: HashMap<RecordId, u32>,
    /// Records whose id repeated an earlier one.
    duplicate_ids: usize,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a loaded record set.
    pub fn from_records(records: Vec<Record>) -> FacetResult<Self> {
        if records.len() > MAX_RECORDS {
            return Err(FacetError::TooManyRecords(records.len()));
        }

        let mut positions = HashMap::with_capacity(records.len());
        let mut duplicate_ids = 0;
        for (pos, record) in records.iter().enumerate() {
            if positions.contains_key(&record.id) {
                duplicate_ids += 1;
            } else {
                positions.insert(record.id.clone(), pos as u32);
            }
        }
        if duplicate_ids > 0 {
            log::warn!(
                "{} record(s) repeat an earlier id; lookups resolve to the first",
                duplicate_ids
            );
        }

        Ok(Self {
            records,
            positions,
            duplicate_ids,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in position order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Record at a bitmap position.
    pub fn get(&self, position: u32) -> Option<&Record> {
        self.records.get(position as usize)
    }

    /// Position of a record by id.
    pub fn position(&self, id: &RecordId) -> Option<u32> {
        self.positions.get(id).copied()
    }

    /// Record by id.
    pub fn get_by_id(&self, id: &RecordId) -> Option<&Record> {
        self.position(id).and_then(|pos| self.get(pos))
    }

    /// Number of records whose id repeated an earlier record's id.
    pub fn duplicate_ids(&self) -> usize {
        self.duplicate_ids
    }

    /// Number of records carrying a positional (synthesized) id.
    pub fn positional_ids(&self) -> usize {
        self.records.iter().filter(|r| r.id.is_positional()).count()
    }
}
