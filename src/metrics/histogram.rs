//! Lock-free latency histogram for commit timings.
//!
//! Fixed buckets from 50μs to 5s, cumulative, in the shape Prometheus'
//! `histogram_quantile()` expects.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bucket upper bounds in microseconds.
pub const HISTOGRAM_BUCKETS: [u64; 12] = [
    50,        // 50μs
    100,       // 100μs
    250,       // 250μs
    500,       // 500μs
    1_000,     // 1ms
    5_000,     // 5ms
    10_000,    // 10ms
    50_000,    // 50ms
    100_000,   // 100ms
    500_000,   // 500ms
    1_000_000, // 1s
    5_000_000, // 5s
];

const BUCKET_COUNT: usize = HISTOGRAM_BUCKETS.len();

/// Thread-safe latency histogram.
///
/// # Example
///
/// ```
/// use strand::metrics::Histogram;
///
/// let histogram = Histogram::new();
/// histogram.observe(750); // a 750μs commit
///
/// let (sum, count, buckets) = histogram.snapshot();
/// assert_eq!((sum, count), (750, 1));
/// assert_eq!(buckets[3], 0); // <= 500μs
/// assert_eq!(buckets[4], 1); // <= 1ms
/// ```
pub struct Histogram {
    sum: AtomicU64,
    count: AtomicU64,
    buckets: [AtomicU64; BUCKET_COUNT],
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Records one observation in microseconds.
    #[inline]
    pub fn observe(&self, value_us: u64) {
        self.sum.fetch_add(value_us, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        // Buckets are sorted, so only the first fitting index is searched for.
        if let Some(first) = HISTOGRAM_BUCKETS.iter().position(|&b| value_us <= b) {
            for bucket in &self.buckets[first..] {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Returns `(sum, count, cumulative_buckets)`.
    pub fn snapshot(&self) -> (u64, u64, [u64; BUCKET_COUNT]) {
        let sum = self.sum.load(Ordering::Relaxed);
        let count = self.count.load(Ordering::Relaxed);
        let buckets = std::array::from_fn(|i| self.buckets[i].load(Ordering::Relaxed));
        (sum, count, buckets)
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    /// Mean observation, 0 when empty.
    pub fn mean(&self) -> u64 {
        let count = self.count();
        if count == 0 {
            0
        } else {
            self.sum() / count
        }
    }

    /// Formats the histogram in Prometheus exposition format.
    pub fn format_prometheus(&self, name: &str, help: &str) -> String {
        let (sum, count, buckets) = self.snapshot();
        let mut output = String::with_capacity(1024);

        let _ = writeln!(output, "# HELP {} {}", name, help);
        let _ = writeln!(output, "# TYPE {} histogram", name);
        for (boundary, bucket) in HISTOGRAM_BUCKETS.iter().zip(buckets) {
            let _ = writeln!(output, "{}_bucket{{le=\"{}\"}} {}", name, boundary, bucket);
        }
        let _ = writeln!(output, "{}_bucket{{le=\"+Inf\"}} {}", name, count);
        let _ = writeln!(output, "{}_sum {}", name, sum);
        let _ = writeln!(output, "{}_count {}", name, count);

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_accumulates_sum_and_count() {
        let h = Histogram::new();
        h.observe(40);
        h.observe(2_000);
        h.observe(60);

        let (sum, count, _) = h.snapshot();
        assert_eq!(sum, 2_100);
        assert_eq!(count, 3);
        assert_eq!(h.mean(), 700);
    }

    #[test]
    fn buckets_are_cumulative() {
        let h = Histogram::new();
        h.observe(10); // <= 50
        h.observe(75); // <= 100
        h.observe(20_000); // <= 50ms
        h.observe(9_000_000); // beyond every bucket

        let (_, count, buckets) = h.snapshot();
        assert_eq!(count, 4);
        assert_eq!(buckets[0], 1);
        assert_eq!(buckets[1], 2);
        assert_eq!(buckets[6], 2);
        assert_eq!(buckets[7], 3);
        assert_eq!(buckets[BUCKET_COUNT - 1], 3);
    }

    #[test]
    fn prometheus_format() {
        let h = Histogram::new();
        h.observe(100);
        h.observe(200);

        let output = h.format_prometheus("strand_commit_duration_us", "Commit latency");
        assert!(output.contains("# TYPE strand_commit_duration_us histogram"));
        assert!(output.contains("strand_commit_duration_us_bucket{le=\"100\"} 1"));
        assert!(output.contains("strand_commit_duration_us_bucket{le=\"+Inf\"} 2"));
        assert!(output.contains("strand_commit_duration_us_sum 300"));
    }

    #[test]
    fn empty_mean_is_zero() {
        assert_eq!(Histogram::new().mean(), 0);
    }
}
