//! Follow a record table as rows are committed.

use std::sync::Arc;

use crate::contracts::{SinkError, StorageEngine};
use crate::sink::{DurableSink, StoredAttempt};

/// Default number of rows returned per poll.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Cursor over `attempt_id`.
///
/// The first poll replays the table from the start; later polls return
/// only rows committed since. Ids come from `AUTOINCREMENT`, so they never
/// go backwards and the watermark never skips a committed row.
pub struct Tail<E: StorageEngine> {
    sink: Arc<DurableSink<E>>,
    table: String,
    watermark: i64,
    batch_size: usize,
    successful: Option<bool>,
}

impl<E: StorageEngine> Tail<E> {
    pub fn new(sink: Arc<DurableSink<E>>, table: impl Into<String>) -> Self {
        Self {
            sink,
            table: table.into(),
            watermark: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            successful: None,
        }
    }

    /// Rows returned per poll, at least 1.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Only rows with this outcome.
    pub fn only(mut self, successful: bool) -> Self {
        self.successful = Some(successful);
        self
    }

    /// Starts after `attempt_id`, skipping everything up to and including it.
    pub fn starting_after(mut self, attempt_id: i64) -> Self {
        self.watermark = attempt_id;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    /// Next rows past the watermark, ascending by id.
    pub fn poll(&mut self) -> Result<Vec<StoredAttempt>, SinkError> {
        let rows = self
            .sink
            .read_rows(&self.table, self.watermark, self.batch_size, self.successful)?;
        if let Some(last) = rows.last() {
            self.watermark = last.attempt_id;
            tracing::debug!(table = %self.table, rows = rows.len(), watermark = self.watermark, "Tail advanced");
        }
        Ok(rows)
    }
}
