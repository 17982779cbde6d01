use bson::Document;
use std::collections::{BTreeMap, HashMap};

use crate::storage::record::*;

/// The in-memory table backing a collection.
///
/// Records are kept in insertion order (by a monotonically increasing
/// sequence number) alongside a key index from `_id` to sequence. An
/// update keeps a record's position; a delete frees the key so the same
/// `_id` may be inserted again later.
#[derive(Default, Debug, Clone)]
pub struct MemTable {
    /// The records in the MemTable, ordered by insertion sequence.
    records: BTreeMap<u64, Record>,

    /// Maps each record's key to its insertion sequence.
    index: HashMap<DocKey, u64>,

    /// The sequence number handed to the next inserted record.
    next_seq: u64,
}

impl MemTable {
    /// Creates a new, empty MemTable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether a record with the given key exists.
    pub fn contains_key(&self, key: &DocKey) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts a record at the end of the table.
    ///
    /// Returns the record back if its key is already taken.
    pub fn insert(&mut self, record: Record) -> Result<(), Record> {
        if self.contains_key(&record.key) {
            return Err(record);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(record.key.clone(), seq);
        self.records.insert(seq, record);
        Ok(())
    }

    /// Gets a document by key.
    pub fn get(&self, key: &DocKey) -> Option<&Document> {
        let seq = self.index.get(key)?;
        self.records.get(seq).map(|r| &r.value)
    }

    /// Gets a mutable reference to a document by key.
    ///
    /// Callers must not change the document's `_id`.
    pub fn get_mut(&mut self, key: &DocKey) -> Option<&mut Document> {
        let seq = self.index.get(key)?;
        self.records.get_mut(seq).map(|r| &mut r.value)
    }

    /// Removes a record by key, returning its document.
    pub fn remove(&mut self, key: &DocKey) -> Option<Document> {
        let seq = self.index.remove(key)?;
        self.records.remove(&seq).map(|r| r.value)
    }

    /// Iterates over the records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    /// Check the size of the MemTable.
    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
