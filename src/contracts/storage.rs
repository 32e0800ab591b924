use serde::{Deserialize, Serialize};

use crate::contracts::error::StorageError;

/// Relational storage behind the durable sink.
///
/// # Invariants
/// - Every value reaches the engine as a bound parameter, never spliced into SQL
/// - `execute_insert_batch` is all-or-nothing
/// - Identifiers arrive as plain strings and are quoted by the engine
pub trait StorageEngine: Send + Sync {
    /// Executes a schema statement and commits it immediately.
    fn execute_ddl(&self, statement: &str) -> Result<(), StorageError>;

    /// Executes a read statement with positional parameters.
    fn execute_query(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>, StorageError>;

    /// Inserts a single row in its own transaction.
    /// Returns the rowid assigned by the engine.
    fn execute_insert(&self, insert: &InsertStatement) -> Result<i64, StorageError>;

    /// Inserts every row inside one deferred transaction.
    /// On error nothing is written. Returns the number of rows inserted.
    fn execute_insert_batch(&self, inserts: &[InsertStatement]) -> Result<usize, StorageError>;

    /// Lists the names of all user tables.
    fn list_tables(&self) -> Result<Vec<String>, StorageError>;

    /// Returns true if a table with this exact name exists.
    fn table_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.list_tables()?.iter().any(|t| t == name))
    }
}

/// A single SQL value, used both as a bound parameter and as a result cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// SQLite has no boolean storage class; integers stand in for them.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(v) => Some(*v != 0),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// One result row, cells in select-list order.
pub type Row = Vec<Value>;

/// A parameterized single-row insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl InsertStatement {
    /// Renders `INSERT INTO "t" ("a", "b") VALUES (?1, ?2)`.
    pub fn to_sql(&self) -> Result<String, StorageError> {
        if self.columns.len() != self.values.len() {
            return Err(StorageError::InvalidInput(format!(
                "{} columns but {} values for table {}",
                self.columns.len(),
                self.values.len(),
                self.table
            )));
        }
        if self.columns.is_empty() {
            return Ok(format!("INSERT INTO {} DEFAULT VALUES", quote_identifier(&self.table)));
        }

        let columns = self
            .columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=self.values.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&self.table),
            columns,
            placeholders
        ))
    }
}

/// Quotes an identifier for SQL, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
