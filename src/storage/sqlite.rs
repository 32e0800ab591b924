use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, ToSql};

use crate::contracts::{InsertStatement, LockResultExt, Row, StorageEngine, StorageError, Value};

const LIST_TABLES_SQL: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";
// SQLite resolves table names case-insensitively (ASCII only), so the check must too.
const TABLE_EXISTS_SQL: &str =
    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE";

/// SQLite-backed storage engine.
///
/// A single connection guarded by a mutex. File databases run in WAL mode so
/// a tail reader on a second connection does not block commits.
pub struct SqliteEngine {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteEngine {
    /// Opens or creates a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if path == Path::new(":memory:") {
            return Self::in_memory();
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        tracing::debug!(path = %path.display(), "Opened SQLite database");

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates a private in-memory database.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Database file path, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl StorageEngine for SqliteEngine {
    fn execute_ddl(&self, statement: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_lock_err()?;
        conn.execute_batch(statement)?;
        Ok(())
    }

    fn execute_query(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>, StorageError> {
        let conn = self.conn.lock().map_lock_err()?;
        let mut stmt = conn.prepare(statement)?;
        let width = stmt.column_count();

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(from_sql))
                    .collect::<Result<Row, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn execute_insert(&self, insert: &InsertStatement) -> Result<i64, StorageError> {
        let sql = insert.to_sql()?;
        let conn = self.conn.lock().map_lock_err()?;
        conn.execute(&sql, params_from_iter(insert.values.iter()))?;
        Ok(conn.last_insert_rowid())
    }

    fn execute_insert_batch(&self, inserts: &[InsertStatement]) -> Result<usize, StorageError> {
        if inserts.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock().map_lock_err()?;
        let tx = conn.transaction()?;
        for insert in inserts {
            let sql = insert.to_sql()?;
            // Pool entries for one table share a column set, so the cache hits.
            let mut stmt = tx.prepare_cached(&sql)?;
            stmt.execute(params_from_iter(insert.values.iter()))?;
        }
        tx.commit()?;

        Ok(inserts.len())
    }

    fn list_tables(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.conn.lock().map_lock_err()?;
        let mut stmt = conn.prepare(LIST_TABLES_SQL)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn table_exists(&self, name: &str) -> Result<bool, StorageError> {
        let conn = self.conn.lock().map_lock_err()?;
        let mut stmt = conn.prepare_cached(TABLE_EXISTS_SQL)?;
        Ok(stmt.exists([name])?)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Integer(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        // Attempts are text; a blob only shows up if something else wrote the table.
        ValueRef::Blob(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_table() -> SqliteEngine {
        let engine = SqliteEngine::in_memory().unwrap();
        engine
            .execute_ddl("CREATE TABLE t (id INTEGER PRIMARY KEY, body TEXT, ok BOOLEAN)")
            .unwrap();
        engine
    }

    fn insert(body: &str) -> InsertStatement {
        InsertStatement {
            table: "t".into(),
            columns: vec!["body".into(), "ok".into()],
            values: vec![Value::from(body), Value::from(true)],
        }
    }

    #[test]
    fn list_and_exists() {
        let engine = engine_with_table();
        assert_eq!(engine.list_tables().unwrap(), vec!["t".to_string()]);
        assert!(engine.table_exists("t").unwrap());
        assert!(!engine.table_exists("missing").unwrap());
    }

    #[test]
    fn exists_ignores_ascii_case() {
        let engine = engine_with_table();
        assert!(engine.table_exists("T").unwrap());
        engine.execute_ddl("CREATE TABLE Attempts (body TEXT)").unwrap();
        assert!(engine.table_exists("attempts").unwrap());
        assert!(engine.table_exists("ATTEMPTS").unwrap());
    }

    #[test]
    fn insert_returns_rowid() {
        let engine = engine_with_table();
        assert_eq!(engine.execute_insert(&insert("a")).unwrap(), 1);
        assert_eq!(engine.execute_insert(&insert("b")).unwrap(), 2);
    }

    #[test]
    fn arbitrary_characters_round_trip_as_parameters() {
        let engine = engine_with_table();
        let nasty = "'); DROP TABLE t; --\0\u{1}\u{ff}";
        engine.execute_insert(&insert(nasty)).unwrap();

        let rows = engine
            .execute_query("SELECT body, ok FROM t WHERE body = ?1", &[Value::from(nasty)])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Value::Text(nasty.to_string()));
        assert_eq!(rows[0][1].as_bool(), Some(true));
        assert!(engine.table_exists("t").unwrap());
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let engine = engine_with_table();
        let bad = InsertStatement {
            table: "t".into(),
            columns: vec!["no_such_column".into()],
            values: vec![Value::Null],
        };
        let err = engine.execute_insert_batch(&[insert("a"), bad, insert("b")]);
        assert!(err.is_err());

        let rows = engine.execute_query("SELECT COUNT(*) FROM t", &[]).unwrap();
        assert_eq!(rows[0][0], Value::Integer(0));
    }

    #[test]
    fn batch_commits_every_row() {
        let engine = engine_with_table();
        let n = engine
            .execute_insert_batch(&[insert("a"), insert("b"), insert("c")])
            .unwrap();
        assert_eq!(n, 3);
        let rows = engine.execute_query("SELECT body FROM t ORDER BY id", &[]).unwrap();
        let bodies: Vec<_> = rows.iter().filter_map(|r| r[0].as_str()).collect();
        assert_eq!(bodies, vec!["a", "b", "c"]);
    }

    #[test]
    fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attempts.db");
        {
            let engine = SqliteEngine::open(&path).unwrap();
            engine.execute_ddl("CREATE TABLE t (body TEXT)").unwrap();
        }
        let engine = SqliteEngine::open(&path).unwrap();
        assert_eq!(engine.path(), Some(path.as_path()));
        assert!(engine.table_exists("t").unwrap());
    }
}
