use serde::{Deserialize, Serialize};

use crate::contracts::error::SinkError;
use crate::contracts::storage::quote_identifier;

/// Column holding the auto-increment primary key of an attempt row.
pub const ATTEMPT_ID: &str = "attempt_id";
pub const ATTEMPTED: &str = "attempted";
pub const PROHIBITED: &str = "prohibited";
pub const SUCCESSFUL: &str = "successful";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// A column in a `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// Declared SQL type, e.g. `TEXT` or `INTEGER PRIMARY KEY`.
    pub sql_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }

    /// Renders the column for a `CREATE TABLE` body.
    ///
    /// The type is spliced verbatim, so it is restricted to words made of
    /// ASCII letters, digits and underscores.
    pub fn to_sql(&self) -> Result<String, SinkError> {
        validate_identifier(&self.name)?;
        let type_ok = !self.sql_type.trim().is_empty()
            && self
                .sql_type
                .split_whitespace()
                .all(|word| word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        if !type_ok {
            return Err(SinkError::InvalidIdentifier(self.sql_type.clone()));
        }
        Ok(format!("{} {}", quote_identifier(&self.name), self.sql_type.trim()))
    }
}

/// The schema every attempt table is created with.
pub fn attempt_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new(ATTEMPT_ID, "INTEGER PRIMARY KEY AUTOINCREMENT"),
        ColumnDef::new(ATTEMPTED, "TEXT"),
        ColumnDef::new(PROHIBITED, "TEXT"),
        ColumnDef::new(SUCCESSFUL, "BOOLEAN"),
        ColumnDef::new(CREATED_AT, "TEXT"),
        ColumnDef::new(UPDATED_AT, "TEXT"),
    ]
}

/// Rejects empty identifiers and identifiers containing NUL.
/// Anything else is representable once quoted.
pub fn validate_identifier(name: &str) -> Result<(), SinkError> {
    if name.is_empty() || name.contains('\0') {
        return Err(SinkError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_schema_starts_with_primary_key() {
        let columns = attempt_columns();
        assert_eq!(columns.len(), 6);
        assert_eq!(columns[0].name, ATTEMPT_ID);
        assert!(columns[0].sql_type.contains("PRIMARY KEY"));
    }

    #[test]
    fn column_sql_quotes_name() {
        let col = ColumnDef::new("attempted", "TEXT");
        assert_eq!(col.to_sql().unwrap(), "\"attempted\" TEXT");
    }

    #[test]
    fn column_type_cannot_smuggle_sql() {
        let col = ColumnDef::new("x", "TEXT); DROP TABLE t; --");
        assert!(matches!(col.to_sql(), Err(SinkError::InvalidIdentifier(_))));
    }

    #[test]
    fn empty_identifier_is_rejected() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("a\0b").is_err());
        assert!(validate_identifier("attempts101826").is_ok());
    }
}
