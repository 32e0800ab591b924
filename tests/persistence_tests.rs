//! Persistence tests: committed attempts survive closing and reopening the
//! database; pooled ones do not.
//! Run with: cargo test --test persistence_tests

use std::path::Path;

use strand::contracts::SinkError;
use strand::fuzzer::Fuzzer;
use strand::generator::AttemptSpec;
use strand::sink::{DurableSink, SinkConfig};
use tempfile::TempDir;

fn open_at(path: &Path) -> Fuzzer {
    Fuzzer::open(path, "attempts").expect("Failed to open database")
}

fn spec() -> AttemptSpec {
    AttemptSpec::builder().length(2).range(48, 57).build().unwrap()
}

/// Committed rows are readable after a restart, in commit order.
#[test]
fn committed_attempts_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fuzz.db");

    let written: Vec<String> = {
        let fuzzer = open_at(&path);
        assert!(fuzzer.initialize().unwrap());
        let mut written = Vec::new();
        for record in fuzzer.sequential(&spec()).unwrap().take(25) {
            written.push(record.value().to_string());
            record.mark_success().unwrap();
        }
        fuzzer.commit().unwrap();
        written
    };

    let fuzzer = open_at(&path);
    let stored: Vec<String> = fuzzer
        .tail()
        .batch_size(100)
        .poll()
        .unwrap()
        .into_iter()
        .map(|r| r.attempted)
        .collect();
    assert_eq!(stored, written);
}

/// The pool lives in memory; dropping the sink before a commit loses it.
#[test]
fn uncommitted_pool_is_not_persisted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fuzz.db");

    {
        let fuzzer = open_at(&path);
        fuzzer.initialize().unwrap();
        let mut attempts = fuzzer.sequential(&spec()).unwrap();
        attempts.next().unwrap().mark_success().unwrap();
        attempts.next().unwrap().mark_failure().unwrap();
        fuzzer.commit().unwrap();
        attempts.next().unwrap().mark_failure().unwrap();
        assert_eq!(fuzzer.sink().pool_len().unwrap(), 1);
    }

    let fuzzer = open_at(&path);
    let counts = fuzzer.sink().outcome_counts("attempts").unwrap();
    assert_eq!(counts.total(), 2);
    assert_eq!(counts.success, 1);
    assert_eq!(counts.failure, 1);
}

/// A reopened sink loads existing tables into its cache, so re-creating
/// the table is reported as already existing.
#[test]
fn reopened_sink_knows_existing_tables() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fuzz.db");

    {
        let sink = DurableSink::open(&path, SinkConfig::default()).unwrap();
        sink.create_record_table("a").unwrap();
        sink.create_record_table("b").unwrap();
    }

    let sink = DurableSink::open(&path, SinkConfig::default()).unwrap();
    assert_eq!(sink.cached_tables().unwrap(), vec!["a", "b"]);
    assert!(matches!(
        sink.create_record_table("a"),
        Err(SinkError::TableAlreadyExists(_))
    ));
    assert_eq!(sink.list_tables().unwrap(), vec!["a", "b"]);
}

/// Attempt ids keep increasing across restarts, so a tail watermark taken
/// before a restart stays valid after it.
#[test]
fn attempt_ids_continue_after_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fuzz.db");

    let watermark = {
        let fuzzer = open_at(&path);
        fuzzer.initialize().unwrap();
        for record in fuzzer.sequential(&spec()).unwrap().take(3) {
            record.mark_success().unwrap();
        }
        fuzzer.commit().unwrap();
        let mut tail = fuzzer.tail();
        tail.poll().unwrap();
        tail.watermark()
    };
    assert_eq!(watermark, 3);

    let fuzzer = open_at(&path);
    assert!(!fuzzer.initialize().unwrap());
    for record in fuzzer.sequential(&spec()).unwrap().skip(3).take(2) {
        record.mark_failure().unwrap();
    }
    fuzzer.commit().unwrap();

    let rows = fuzzer.tail().starting_after(watermark).poll().unwrap();
    let ids: Vec<i64> = rows.iter().map(|r| r.attempt_id).collect();
    assert_eq!(ids, vec![4, 5]);
    assert!(rows.iter().all(|r| r.successful == Some(false)));
}

/// Timestamps are stored as RFC 3339 strings in UTC.
#[test]
fn timestamps_are_rfc3339() {
    let dir = TempDir::new().unwrap();
    let fuzzer = open_at(&dir.path().join("fuzz.db"));
    fuzzer.initialize().unwrap();
    fuzzer
        .sequential(&spec())
        .unwrap()
        .next()
        .unwrap()
        .mark_success()
        .unwrap();
    fuzzer.commit().unwrap();

    let row = fuzzer.tail().poll().unwrap().remove(0);
    let created = chrono::DateTime::parse_from_rfc3339(&row.created_at).unwrap();
    let updated = chrono::DateTime::parse_from_rfc3339(&row.updated_at).unwrap();
    assert!(updated >= created);
    assert!(row.created_at.ends_with('Z'));
}
