//! Generated attempts and their success/failure outcome.
//!
//! An [`AttemptRecord`] is produced per yielded string. Marking it consumes
//! the record and hands a row to the sink it was generated for, so the
//! outcome can be set at most once:
//!
//! ```compile_fail
//! use strand::attempt::AttemptRecord;
//!
//! let record = AttemptRecord::detached("abc", "");
//! let _ = record.mark_success();
//! let _ = record.mark_failure(); // use of moved value
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::contracts::schema::{ATTEMPTED, CREATED_AT, PROHIBITED, SUCCESSFUL, UPDATED_AT};
use crate::contracts::{PoolSink, SinkError, Value};

/// Outcome of an attempt against the external target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Unset,
    Success,
    Failure,
}

impl Outcome {
    /// Value stored in the `successful` column. `Unset` is never persisted.
    pub fn as_successful(self) -> Option<bool> {
        match self {
            Outcome::Unset => None,
            Outcome::Success => Some(true),
            Outcome::Failure => Some(false),
        }
    }
}

/// Where a record goes once its outcome is known.
#[derive(Clone)]
pub struct RecordTarget {
    sink: Arc<dyn PoolSink>,
    table: Arc<str>,
}

impl RecordTarget {
    pub fn new(sink: Arc<dyn PoolSink>, table: impl Into<Arc<str>>) -> Self {
        Self {
            sink,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl fmt::Debug for RecordTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordTarget")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// One generated attempt.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    value: String,
    prohibited: Arc<str>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    outcome: Outcome,
    target: Option<RecordTarget>,
}

impl AttemptRecord {
    pub(crate) fn new(value: String, prohibited: Arc<str>, target: Option<RecordTarget>) -> Self {
        let now = Utc::now();
        Self {
            value,
            prohibited,
            created_at: now,
            updated_at: now,
            outcome: Outcome::Unset,
            target,
        }
    }

    /// A record with no sink. Marking it fails with [`SinkError::Detached`].
    pub fn detached(value: impl Into<String>, prohibited: impl Into<Arc<str>>) -> Self {
        Self::new(value.into(), prohibited.into(), None)
    }

    /// The rendered attempt, output template applied.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Prohibited characters of the run that produced this attempt.
    pub fn prohibited(&self) -> &str {
        &self.prohibited
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    pub fn into_value(self) -> String {
        self.value
    }

    /// Records the attempt as successful and queues it for the next commit.
    /// Returns the pool entry id.
    pub fn mark_success(self) -> Result<u64, SinkError> {
        self.mark(Outcome::Success)
    }

    /// Records the attempt as failed and queues it for the next commit.
    /// Returns the pool entry id.
    pub fn mark_failure(self) -> Result<u64, SinkError> {
        self.mark(Outcome::Failure)
    }

    fn mark(mut self, outcome: Outcome) -> Result<u64, SinkError> {
        let target = self.target.take().ok_or(SinkError::Detached)?;
        self.outcome = outcome;
        self.updated_at = Utc::now();
        target.sink.enqueue(&target.table, self.to_columns())
    }

    /// Column map persisted for this attempt. `attempt_id` is left to storage.
    pub fn to_columns(&self) -> BTreeMap<String, Value> {
        let mut columns = BTreeMap::new();
        columns.insert(ATTEMPTED.to_string(), Value::Text(self.value.clone()));
        columns.insert(PROHIBITED.to_string(), Value::Text(self.prohibited.to_string()));
        columns.insert(
            SUCCESSFUL.to_string(),
            self.outcome
                .as_successful()
                .map(Value::Bool)
                .unwrap_or(Value::Null),
        );
        columns.insert(CREATED_AT.to_string(), Value::Text(timestamp(self.created_at)));
        columns.insert(UPDATED_AT.to_string(), Value::Text(timestamp(self.updated_at)));
        columns
    }
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}
