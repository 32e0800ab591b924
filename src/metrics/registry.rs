//! Counters for the durable sink and the background committer.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::Histogram;

/// Every metric the crate exports.
#[derive(Default)]
pub struct MetricsRegistry {
    pub sink: Arc<SinkMetrics>,
    pub committer: Arc<CommitterMetrics>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry reusing an existing sink's counters.
    pub fn with_sink(sink: Arc<SinkMetrics>) -> Self {
        Self {
            sink,
            committer: Arc::new(CommitterMetrics::default()),
        }
    }

    pub fn format_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);
        output.push_str(&self.sink.format_prometheus());
        output.push_str(&self.committer.format_prometheus());
        output
    }
}

/// Pool and commit metrics for one sink.
#[derive(Default)]
pub struct SinkMetrics {
    pub entries_enqueued_total: AtomicU64,
    pub entries_committed_total: AtomicU64,
    pub commits_total: AtomicU64,
    pub commit_failures_total: AtomicU64,
    pub tables_created_total: AtomicU64,
    /// Entries currently pooled
    pub pool_depth: AtomicU64,
    /// Committed entries per table
    pub committed_by_table: DashMap<String, u64>,
    pub commit_duration_us: Histogram,
}

impl SinkMetrics {
    #[inline]
    pub fn record_enqueue(&self, pool_depth: usize) {
        self.entries_enqueued_total.fetch_add(1, Ordering::Relaxed);
        self.pool_depth.store(pool_depth as u64, Ordering::Relaxed);
    }

    pub fn record_commit<'a>(
        &self,
        per_table: impl IntoIterator<Item = (&'a str, u64)>,
        pool_depth: usize,
        duration_us: u64,
    ) {
        let mut entries = 0;
        for (table, n) in per_table {
            entries += n;
            self.committed_by_table
                .entry(table.to_string())
                .and_modify(|v| *v += n)
                .or_insert(n);
        }
        self.commits_total.fetch_add(1, Ordering::Relaxed);
        self.entries_committed_total.fetch_add(entries, Ordering::Relaxed);
        self.pool_depth.store(pool_depth as u64, Ordering::Relaxed);
        self.commit_duration_us.observe(duration_us);
    }

    #[inline]
    pub fn record_commit_failure(&self) {
        self.commit_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_table_created(&self) {
        self.tables_created_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn committed_for(&self, table: &str) -> u64 {
        self.committed_by_table.get(table).map(|v| *v).unwrap_or(0)
    }

    pub fn format_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        write_counter(
            &mut output,
            "strand_entries_enqueued_total",
            "Attempts added to the pool",
            self.entries_enqueued_total.load(Ordering::Relaxed),
        );
        write_counter(
            &mut output,
            "strand_entries_committed_total",
            "Attempts written to storage",
            self.entries_committed_total.load(Ordering::Relaxed),
        );
        write_counter(
            &mut output,
            "strand_commits_total",
            "Successful pool commits",
            self.commits_total.load(Ordering::Relaxed),
        );
        write_counter(
            &mut output,
            "strand_commit_failures_total",
            "Pool commits that were aborted",
            self.commit_failures_total.load(Ordering::Relaxed),
        );
        write_counter(
            &mut output,
            "strand_tables_created_total",
            "Tables created through the sink",
            self.tables_created_total.load(Ordering::Relaxed),
        );

        let _ = writeln!(output, "# HELP strand_pool_depth Entries awaiting commit");
        let _ = writeln!(output, "# TYPE strand_pool_depth gauge");
        let _ = writeln!(output, "strand_pool_depth {}", self.pool_depth.load(Ordering::Relaxed));
        output.push('\n');

        if !self.committed_by_table.is_empty() {
            let _ = writeln!(
                output,
                "# HELP strand_table_committed_total Attempts written per table"
            );
            let _ = writeln!(output, "# TYPE strand_table_committed_total counter");
            let mut tables: Vec<_> = self
                .committed_by_table
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect();
            tables.sort();
            for (table, n) in tables {
                let _ = writeln!(output, "strand_table_committed_total{{table=\"{}\"}} {}", table, n);
            }
            output.push('\n');
        }

        output.push_str(
            &self
                .commit_duration_us
                .format_prometheus("strand_commit_duration_us", "Pool commit latency in microseconds"),
        );
        output.push('\n');

        output
    }
}

/// Background committer activity.
#[derive(Default)]
pub struct CommitterMetrics {
    /// Wake-ups, whether or not anything was committed
    pub ticks_total: AtomicU64,
    /// Wake-ups caused by the pool reaching the threshold
    pub threshold_triggers_total: AtomicU64,
    pub failed_ticks_total: AtomicU64,
}

impl CommitterMetrics {
    #[inline]
    pub fn record_tick(&self, by_threshold: bool, failed: bool) {
        self.ticks_total.fetch_add(1, Ordering::Relaxed);
        if by_threshold {
            self.threshold_triggers_total.fetch_add(1, Ordering::Relaxed);
        }
        if failed {
            self.failed_ticks_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn format_prometheus(&self) -> String {
        let mut output = String::with_capacity(512);
        write_counter(
            &mut output,
            "strand_committer_ticks_total",
            "Background committer wake-ups",
            self.ticks_total.load(Ordering::Relaxed),
        );
        write_counter(
            &mut output,
            "strand_committer_threshold_triggers_total",
            "Wake-ups caused by pool depth",
            self.threshold_triggers_total.load(Ordering::Relaxed),
        );
        write_counter(
            &mut output,
            "strand_committer_failed_ticks_total",
            "Wake-ups whose commit failed",
            self.failed_ticks_total.load(Ordering::Relaxed),
        );
        output
    }
}

fn write_counter(output: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(output, "# HELP {} {}", name, help);
    let _ = writeln!(output, "# TYPE {} counter", name);
    let _ = writeln!(output, "{} {}", name, value);
    output.push('\n');
}
