use std::sync::{MutexGuard, PoisonError, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrandError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Extension trait for converting lock errors into [`LockPoisoned`], which
/// `?` then lifts into `SinkError` or `StorageError`.
pub trait LockResultExt<T> {
    fn map_lock_err(self) -> Result<T, LockPoisoned>;
}

/// A lock was poisoned by a panicking holder.
#[derive(Error, Debug)]
#[error("Lock poisoned: {0}")]
pub struct LockPoisoned(pub String);

impl<'a, T> LockResultExt<RwLockReadGuard<'a, T>>
    for Result<RwLockReadGuard<'a, T>, PoisonError<RwLockReadGuard<'a, T>>>
{
    #[inline]
    fn map_lock_err(self) -> Result<RwLockReadGuard<'a, T>, LockPoisoned> {
        self.map_err(|e| LockPoisoned(e.to_string()))
    }
}

impl<'a, T> LockResultExt<RwLockWriteGuard<'a, T>>
    for Result<RwLockWriteGuard<'a, T>, PoisonError<RwLockWriteGuard<'a, T>>>
{
    #[inline]
    fn map_lock_err(self) -> Result<RwLockWriteGuard<'a, T>, LockPoisoned> {
        self.map_err(|e| LockPoisoned(e.to_string()))
    }
}

impl<'a, T> LockResultExt<MutexGuard<'a, T>>
    for Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>
{
    #[inline]
    fn map_lock_err(self) -> Result<MutexGuard<'a, T>, LockPoisoned> {
        self.map_err(|e| LockPoisoned(e.to_string()))
    }
}

impl From<LockPoisoned> for StorageError {
    fn from(e: LockPoisoned) -> Self {
        StorageError::LockPoisoned(e.0)
    }
}

impl From<LockPoisoned> for SinkError {
    fn from(e: LockPoisoned) -> Self {
        SinkError::LockPoisoned(e.0)
    }
}

/// A rejected generation request. Raised before the first attempt is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("`length` must be at least 1")]
    ZeroLength,

    #[error("`minimum` ({minimum}) must not exceed `maximum` ({maximum})")]
    InvertedRange { minimum: u32, maximum: u32 },

    #[error("`maximum` ({maximum}) is too large for the {renderer} renderer (limit {limit})")]
    RendererRange {
        renderer: &'static str,
        maximum: u32,
        limit: u32,
    },

    #[error("the {renderer} renderer cannot render values in {minimum}..={maximum}")]
    UnrenderableRange {
        renderer: &'static str,
        minimum: u32,
        maximum: u32,
    },

    #[error("prohibited entries must be exactly one character, got {0:?}")]
    ProhibitedEntry(String),

    #[error("output format {0:?} is missing the `{{fuzzed_string}}` placeholder")]
    MissingPlaceholder(String),

    #[error("output format {0:?} contains the `{{fuzzed_string}}` placeholder more than once")]
    RepeatedPlaceholder(String),

    #[error("every value in {minimum}..{maximum} renders to a prohibited character")]
    UnsatisfiableSampling { minimum: u32, maximum: u32 },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Table `{0}` already exists")]
    TableAlreadyExists(String),

    #[error("Table `{0}` does not exist")]
    UnknownTable(String),

    #[error("`{0}` is a reserved column name")]
    ReservedKey(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Attempt is not attached to a sink")]
    Detached,

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Sqlite(e.to_string())
    }
}
