use std::collections::BTreeMap;

use crate::contracts::error::SinkError;
use crate::contracts::storage::Value;

/// Accepts rows into an in-memory pool awaiting a batch commit.
///
/// Object safe so attempt records can hold a sink without knowing its engine.
pub trait PoolSink: Send + Sync {
    /// Queues one row for `table`. Returns the pool entry id.
    fn enqueue(&self, table: &str, columns: BTreeMap<String, Value>) -> Result<u64, SinkError>;
}
