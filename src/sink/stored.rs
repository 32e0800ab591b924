use serde::{Deserialize, Serialize};

use crate::contracts::{Row, StorageError, Value};

/// An attempt row as read back from a record table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAttempt {
    pub attempt_id: i64,
    pub attempted: String,
    pub prohibited: String,
    /// `None` for rows recorded without an outcome
    pub successful: Option<bool>,
    pub created_at: String,
    pub updated_at: String,
}

impl StoredAttempt {
    /// Decodes a row selected in schema column order.
    pub(crate) fn from_row(row: Row) -> Result<Self, StorageError> {
        let [attempt_id, attempted, prohibited, successful, created_at, updated_at]: [Value; 6] =
            row.try_into().map_err(|row: Row| {
                StorageError::InvalidInput(format!("expected 6 columns, got {}", row.len()))
            })?;

        Ok(Self {
            attempt_id: attempt_id
                .as_i64()
                .ok_or_else(|| StorageError::InvalidInput("attempt_id is not an integer".into()))?,
            attempted: text(attempted),
            prohibited: text(prohibited),
            successful: successful.as_bool(),
            created_at: text(created_at),
            updated_at: text(updated_at),
        })
    }
}

fn text(value: Value) -> String {
    match value {
        Value::Text(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Integer(v) => v.to_string(),
        Value::Real(v) => v.to_string(),
    }
}

/// Row counts of one table grouped by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub success: u64,
    pub failure: u64,
    pub unset: u64,
}

impl OutcomeCounts {
    pub fn total(&self) -> u64 {
        self.success + self.failure + self.unset
    }
}
