use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free source of pool entry ids.
///
/// Ids are unique and increasing within one sink. They identify entries
/// in logs and in commit bookkeeping; they are never written to storage.
#[derive(Debug)]
pub struct EntryIds {
    counter: AtomicU64,
}

impl EntryIds {
    pub fn new() -> Self {
        Self::starting_from(0)
    }

    /// Generator whose first id is `value + 1`.
    pub fn starting_from(value: u64) -> Self {
        Self {
            counter: AtomicU64::new(value),
        }
    }

    /// Next id. Relaxed ordering is enough, only atomicity matters.
    #[inline]
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Last id handed out, 0 before the first call.
    #[inline]
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for EntryIds {
    fn default() -> Self {
        Self::new()
    }
}
