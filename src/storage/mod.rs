mod sqlite;

pub use sqlite::SqliteEngine;
