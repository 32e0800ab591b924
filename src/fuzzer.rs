//! One-stop wiring of a sink, a record table and generation.

use std::sync::Arc;

use crate::attempt::RecordTarget;
use crate::contracts::{CommitResult, SinkError, StorageEngine, StrandError};
use crate::generator::{self, AttemptSpec, RandomAttempts, SequentialAttempts};
use crate::sink::{DurableSink, SinkConfig};
use crate::storage::SqliteEngine;
use crate::tail::Tail;

/// A sink bound to one record table.
///
/// ```
/// use strand::fuzzer::Fuzzer;
/// use strand::generator::AttemptSpec;
///
/// let fuzzer = Fuzzer::open(":memory:", "attempts").unwrap();
/// assert!(fuzzer.initialize().unwrap());
/// assert!(!fuzzer.initialize().unwrap());
///
/// let spec = AttemptSpec::builder().length(1).range(97, 98).build().unwrap();
/// for record in fuzzer.sequential(&spec).unwrap() {
///     record.mark_success().unwrap();
/// }
/// assert_eq!(fuzzer.commit().unwrap().entries_committed, 2);
/// ```
pub struct Fuzzer<E: StorageEngine + 'static = SqliteEngine> {
    sink: Arc<DurableSink<E>>,
    table: Arc<str>,
}

impl Fuzzer<SqliteEngine> {
    /// Opens `database` with the default sink config.
    pub fn open(database: impl AsRef<std::path::Path>, table: &str) -> Result<Self, StrandError> {
        let sink = DurableSink::open(database, SinkConfig::default())?;
        Ok(Self::new(Arc::new(sink), table))
    }
}

impl<E: StorageEngine + 'static> Fuzzer<E> {
    pub fn new(sink: Arc<DurableSink<E>>, table: &str) -> Self {
        Self {
            sink,
            table: Arc::from(table),
        }
    }

    pub fn sink(&self) -> &Arc<DurableSink<E>> {
        &self.sink
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates the record table. Returns `false` when it already existed.
    pub fn initialize(&self) -> Result<bool, StrandError> {
        match self.sink.create_record_table(&self.table) {
            Ok(()) => Ok(true),
            Err(SinkError::TableAlreadyExists(_)) => {
                tracing::debug!(table = %self.table, "Record table already initialized");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every allowed combination, each recordable into this fuzzer's table.
    pub fn sequential(&self, spec: &AttemptSpec) -> Result<SequentialAttempts, StrandError> {
        Ok(generator::sequential_into(spec, self.target())?)
    }

    /// Endless random attempts recordable into this fuzzer's table.
    pub fn random(&self, spec: &AttemptSpec) -> Result<RandomAttempts, StrandError> {
        Ok(generator::random_into(spec, self.target())?)
    }

    /// Writes every marked attempt to the database.
    pub fn commit(&self) -> Result<CommitResult, StrandError> {
        Ok(self.sink.commit_pool()?)
    }

    /// A tail over this fuzzer's table.
    pub fn tail(&self) -> Tail<E> {
        Tail::new(Arc::clone(&self.sink), self.table.to_string())
    }

    fn target(&self) -> RecordTarget {
        let sink: Arc<dyn crate::contracts::PoolSink> = self.sink.clone();
        RecordTarget::new(sink, Arc::clone(&self.table))
    }
}
