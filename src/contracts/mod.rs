pub mod committer;
pub mod error;
pub mod pool;
pub mod schema;
pub mod storage;

pub use committer::{CommitResult, Committer};
pub use error::{
    LockPoisoned, LockResultExt, SinkError, StorageError, StrandError, ValidationError,
};
pub use pool::PoolSink;
pub use schema::{attempt_columns, ColumnDef};
pub use storage::{quote_identifier, InsertStatement, Row, StorageEngine, Value};
