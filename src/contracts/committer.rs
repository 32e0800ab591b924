use std::future::Future;

use crate::contracts::error::SinkError;

/// Background task that drains a sink's pool into storage.
///
/// # Behavior
/// - Commits every N milliseconds OR once the pool holds M entries (whichever comes first)
/// - A failed commit leaves the pool untouched and is retried on the next tick
/// - Stopping performs one final commit
pub trait Committer: Send + Sync {
    /// Starts the committer background task.
    fn start(&self) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Stops the committer and commits whatever is still pooled.
    fn stop(&self) -> impl Future<Output = Result<CommitResult, SinkError>> + Send;

    /// Forces an immediate commit.
    fn commit_now(&self) -> impl Future<Output = Result<CommitResult, SinkError>> + Send;
}

/// Result of a pool commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitResult {
    /// Number of pool entries written
    pub entries_committed: usize,
    /// Number of distinct tables written to
    pub tables_touched: usize,
    /// Entries still pooled after the commit (enqueued while it ran)
    pub pool_remaining: usize,
}

impl CommitResult {
    pub fn is_empty(&self) -> bool {
        self.entries_committed == 0
    }
}
