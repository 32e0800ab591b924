//! Observability metrics for the attempt sink.
//!
//! All counters are lock-free atomics so enqueue and commit pay almost
//! nothing for them.

pub mod histogram;
pub mod registry;

pub use histogram::Histogram;
pub use registry::{CommitterMetrics, MetricsRegistry, SinkMetrics};
