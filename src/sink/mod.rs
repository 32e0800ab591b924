//! Batched, cache-accelerated persistence for attempt records.
//!
//! Marked records are appended to an in-memory pool. [`DurableSink::commit_pool`]
//! writes a snapshot of the pool in one transaction and only then removes
//! exactly the committed entries, so rows enqueued while a commit is in
//! flight wait for the next one.

mod entry_id;
mod pool;
mod stored;
mod table_cache;

pub use entry_id::EntryIds;
pub use pool::{PoolEntry, RESERVED_TABLE_KEY};
pub use stored::{OutcomeCounts, StoredAttempt};
pub use table_cache::TableCache;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::contracts::schema::{validate_identifier, ATTEMPT_ID, SUCCESSFUL};
use crate::contracts::{
    attempt_columns, quote_identifier, ColumnDef, CommitResult, LockResultExt, PoolSink,
    SinkError, StorageEngine, StorageError, Value,
};
use crate::metrics::SinkMetrics;
use crate::storage::SqliteEngine;

use pool::Pool;

const RECORD_COLUMNS: &str =
    "\"attempt_id\", \"attempted\", \"prohibited\", \"successful\", \"created_at\", \"updated_at\"";

/// Sink behavior switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Serve table existence from memory instead of querying per commit.
    pub cache_table_names: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            cache_table_names: true,
        }
    }
}

/// Pool-and-commit writer in front of a [`StorageEngine`].
///
/// Shareable across threads. `enqueue` holds the pool lock only for the
/// append; storage I/O in `commit_pool` runs with the pool unlocked.
pub struct DurableSink<E: StorageEngine = SqliteEngine> {
    engine: Arc<E>,
    tables: TableCache,
    pool: Mutex<Pool>,
    /// Serializes commits so a snapshot is always a prefix of the pool
    commit_gate: Mutex<()>,
    /// Serializes table creation against its own existence check
    ddl_gate: Mutex<()>,
    ids: EntryIds,
    metrics: Arc<SinkMetrics>,
    depth_watch: RwLock<Option<DepthWatch>>,
}

/// Wakes a waiter once the pool reaches a depth.
struct DepthWatch {
    threshold: usize,
    notify: Arc<Notify>,
}

impl DurableSink<SqliteEngine> {
    /// Opens a SQLite database file (or `:memory:`) behind a new sink.
    pub fn open(path: impl AsRef<Path>, config: SinkConfig) -> Result<Self, SinkError> {
        let engine = SqliteEngine::open(path)?;
        Self::new(Arc::new(engine), config)
    }
}

impl<E: StorageEngine> DurableSink<E> {
    /// Creates a sink, populating the table cache from the engine when enabled.
    pub fn new(engine: Arc<E>, config: SinkConfig) -> Result<Self, SinkError> {
        let sink = Self {
            engine,
            tables: TableCache::new(config.cache_table_names),
            pool: Mutex::new(Pool::default()),
            commit_gate: Mutex::new(()),
            ddl_gate: Mutex::new(()),
            ids: EntryIds::new(),
            metrics: Arc::new(SinkMetrics::default()),
            depth_watch: RwLock::new(None),
        };
        if sink.tables.is_enabled() {
            let cached = sink.refresh_table_cache()?;
            tracing::debug!(tables = cached, "Populated table cache");
        }
        Ok(sink)
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn metrics(&self) -> Arc<SinkMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Signals `notify` from `enqueue` whenever the pool holds at least
    /// `threshold` entries. Replaces any previous watch.
    pub fn watch_depth(&self, threshold: usize, notify: Arc<Notify>) -> Result<(), SinkError> {
        *self.depth_watch.write().map_lock_err()? = Some(DepthWatch {
            threshold: threshold.max(1),
            notify,
        });
        Ok(())
    }

    pub fn clear_depth_watch(&self) -> Result<(), SinkError> {
        self.depth_watch.write().map_lock_err()?.take();
        Ok(())
    }

    /// Creates `name` with the given columns.
    ///
    /// Fails with [`SinkError::TableAlreadyExists`] when the table is known,
    /// which callers treat as "already initialized".
    pub fn create_table(&self, name: &str, columns: &[ColumnDef]) -> Result<(), SinkError> {
        validate_identifier(name)?;
        if columns.is_empty() {
            return Err(StorageError::InvalidInput(format!(
                "table `{}` needs at least one column",
                name
            ))
            .into());
        }
        let body = columns
            .iter()
            .map(ColumnDef::to_sql)
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");

        let _ddl = self.ddl_gate.lock().map_lock_err()?;
        if self.table_known(name)? {
            return Err(SinkError::TableAlreadyExists(name.to_string()));
        }

        let statement = format!("CREATE TABLE {} ({})", quote_identifier(name), body);
        self.engine.execute_ddl(&statement)?;
        self.tables.insert(name)?;
        self.metrics.record_table_created();

        tracing::info!(table = %name, columns = columns.len(), "Created table");
        Ok(())
    }

    /// Creates `name` with the attempt record schema.
    pub fn create_record_table(&self, name: &str) -> Result<(), SinkError> {
        self.create_table(name, &attempt_columns())
    }

    /// Appends one row for `table` to the pool and returns its entry id.
    ///
    /// The table is not checked here; an unknown table fails the commit.
    pub fn enqueue(&self, table: &str, columns: BTreeMap<String, Value>) -> Result<u64, SinkError> {
        if columns.contains_key(RESERVED_TABLE_KEY) {
            return Err(SinkError::ReservedKey(RESERVED_TABLE_KEY.to_string()));
        }
        validate_identifier(table)?;
        for name in columns.keys() {
            validate_identifier(name)?;
        }

        let id = self.ids.next();
        let entry = PoolEntry {
            id,
            table: table.to_string(),
            columns,
        };
        let depth = self.pool.lock().map_lock_err()?.push(entry);
        self.metrics.record_enqueue(depth);

        if let Some(watch) = self.depth_watch.read().map_lock_err()?.as_ref() {
            if depth >= watch.threshold {
                watch.notify.notify_one();
            }
        }

        tracing::trace!(table = %table, id, depth, "Enqueued pool entry");
        Ok(id)
    }

    /// Writes the current pool to storage as one transaction.
    ///
    /// Any unknown table aborts the whole batch and leaves the pool as it
    /// was. On success exactly the captured entries leave the pool.
    pub fn commit_pool(&self) -> Result<CommitResult, SinkError> {
        let _gate = self.commit_gate.lock().map_lock_err()?;

        let batch = self.pool.lock().map_lock_err()?.snapshot();
        if batch.is_empty() {
            return Ok(CommitResult::default());
        }

        let started = Instant::now();
        let mut per_table: BTreeMap<&str, u64> = BTreeMap::new();
        for entry in &batch {
            *per_table.entry(entry.table.as_str()).or_default() += 1;
        }

        for table in per_table.keys() {
            if !self.table_known(table)? {
                self.metrics.record_commit_failure();
                tracing::warn!(table = %table, entries = batch.len(), "Commit aborted, unknown table");
                return Err(SinkError::UnknownTable(table.to_string()));
            }
        }

        let inserts: Vec<_> = batch.iter().map(PoolEntry::to_insert).collect();
        if let Err(e) = self.engine.execute_insert_batch(&inserts) {
            self.metrics.record_commit_failure();
            tracing::error!(entries = batch.len(), error = %e, "Commit failed, pool kept");
            return Err(e.into());
        }

        let remaining = self.pool.lock().map_lock_err()?.drain_committed(&batch);
        let elapsed_us = started.elapsed().as_micros() as u64;
        self.metrics
            .record_commit(per_table.iter().map(|(t, n)| (*t, *n)), remaining, elapsed_us);

        tracing::info!(
            entries = batch.len(),
            tables = per_table.len(),
            remaining,
            elapsed_us,
            "Committed pool"
        );

        Ok(CommitResult {
            entries_committed: batch.len(),
            tables_touched: per_table.len(),
            pool_remaining: remaining,
        })
    }

    /// Entries waiting for the next commit.
    pub fn pool_len(&self) -> Result<usize, SinkError> {
        Ok(self.pool.lock().map_lock_err()?.len())
    }

    /// Live existence check against the engine.
    pub fn table_exists(&self, name: &str) -> Result<bool, SinkError> {
        Ok(self.engine.table_exists(name)?)
    }

    /// Every table in the database.
    pub fn list_tables(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.engine.list_tables()?)
    }

    /// Reloads the table cache from the database. Returns how many names it
    /// now holds (0 when caching is off).
    pub fn refresh_table_cache(&self) -> Result<usize, SinkError> {
        if !self.tables.is_enabled() {
            return Ok(0);
        }
        let names = self.engine.list_tables()?;
        let count = names.len();
        self.tables.replace(names)?;
        Ok(count)
    }

    /// Names currently cached, sorted.
    pub fn cached_tables(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.tables.names()?)
    }

    /// Committed attempt rows with `attempt_id > after_id`, ascending, at most
    /// `limit`, optionally only those with the given outcome.
    pub fn read_rows(
        &self,
        table: &str,
        after_id: i64,
        limit: usize,
        successful: Option<bool>,
    ) -> Result<Vec<StoredAttempt>, SinkError> {
        if !self.table_known(table)? {
            return Err(SinkError::UnknownTable(table.to_string()));
        }

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let id = quote_identifier(ATTEMPT_ID);
        let (sql, params) = match successful {
            Some(flag) => (
                format!(
                    "SELECT {} FROM {} WHERE {} > ?1 AND {} = ?2 ORDER BY {} LIMIT ?3",
                    RECORD_COLUMNS,
                    quote_identifier(table),
                    id,
                    quote_identifier(SUCCESSFUL),
                    id
                ),
                vec![Value::Integer(after_id), Value::Bool(flag), Value::Integer(limit)],
            ),
            None => (
                format!(
                    "SELECT {} FROM {} WHERE {} > ?1 ORDER BY {} LIMIT ?2",
                    RECORD_COLUMNS,
                    quote_identifier(table),
                    id,
                    id
                ),
                vec![Value::Integer(after_id), Value::Integer(limit)],
            ),
        };

        let rows = self.engine.execute_query(&sql, &params)?;
        let stored = rows
            .into_iter()
            .map(StoredAttempt::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stored)
    }

    /// Committed rows of `table` grouped by outcome.
    pub fn outcome_counts(&self, table: &str) -> Result<OutcomeCounts, SinkError> {
        if !self.table_known(table)? {
            return Err(SinkError::UnknownTable(table.to_string()));
        }

        let sql = format!(
            "SELECT {}, COUNT(*) FROM {} GROUP BY {}",
            quote_identifier(SUCCESSFUL),
            quote_identifier(table),
            quote_identifier(SUCCESSFUL)
        );
        let mut counts = OutcomeCounts::default();
        for row in self.engine.execute_query(&sql, &[])? {
            let n = row.get(1).and_then(Value::as_i64).unwrap_or(0).max(0) as u64;
            match row.first().and_then(Value::as_bool) {
                Some(true) => counts.success += n,
                Some(false) => counts.failure += n,
                None => counts.unset += n,
            }
        }
        Ok(counts)
    }

    /// Cache hit, else one live check. A live hit is cached so a stale
    /// cache heals instead of failing.
    fn table_known(&self, name: &str) -> Result<bool, SinkError> {
        if self.tables.contains(name)? {
            return Ok(true);
        }
        let exists = self.engine.table_exists(name)?;
        if exists {
            self.tables.insert(name)?;
        }
        Ok(exists)
    }
}

impl<E: StorageEngine> PoolSink for DurableSink<E> {
    fn enqueue(&self, table: &str, columns: BTreeMap<String, Value>) -> Result<u64, SinkError> {
        DurableSink::enqueue(self, table, columns)
    }
}
