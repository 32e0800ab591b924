use std::collections::BTreeMap;

use crate::contracts::{InsertStatement, Value};

/// Internal key tagging each pooled row with its table. Callers may not use
/// it as a column name.
pub const RESERVED_TABLE_KEY: &str = "__table_name";

/// One row waiting in the pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub id: u64,
    pub table: String,
    pub columns: BTreeMap<String, Value>,
}

impl PoolEntry {
    /// The parameterized insert for this row. Columns come out in name order.
    pub fn to_insert(&self) -> InsertStatement {
        let (columns, values) = self
            .columns
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .unzip();
        InsertStatement {
            table: self.table.clone(),
            columns,
            values,
        }
    }
}

/// Append-only buffer drained from the front.
///
/// Only one commit runs at a time and enqueue only appends, so a commit
/// that captured the first `n` entries can remove exactly those by
/// draining `..n` afterwards.
#[derive(Debug, Default)]
pub(crate) struct Pool {
    entries: Vec<PoolEntry>,
}

impl Pool {
    pub(crate) fn push(&mut self, entry: PoolEntry) -> usize {
        self.entries.push(entry);
        self.entries.len()
    }

    pub(crate) fn snapshot(&self) -> Vec<PoolEntry> {
        self.entries.clone()
    }

    /// Removes the first `batch.len()` entries, which must be `batch`.
    pub(crate) fn drain_committed(&mut self, batch: &[PoolEntry]) -> usize {
        debug_assert!(self
            .entries
            .iter()
            .zip(batch)
            .all(|(pooled, committed)| pooled.id == committed.id));
        let n = batch.len().min(self.entries.len());
        self.entries.drain(..n);
        self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
