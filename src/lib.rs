//! Fixed-length fuzz string generation with durable, batched recording of
//! each attempt's outcome.

pub mod attempt;
pub mod committer;
pub mod config;
pub mod contracts;
pub mod fuzzer;
pub mod generator;
pub mod metrics;
pub mod sink;
pub mod storage;
pub mod tail;
