#![no_main]

use libfuzzer_sys::fuzz_target;
use strand::attempt::AttemptRecord;
use strand::sink::{DurableSink, SinkConfig};

fuzz_target!(|data: &[u8]| {
    // Table names and attempt values with quotes, NULs and unicode must be
    // rejected or stored, never spliced into SQL.
    let Ok(sink) = DurableSink::open(":memory:", SinkConfig::default()) else {
        return;
    };
    let text = String::from_utf8_lossy(data);

    if sink.create_record_table(&text).is_ok() {
        let _ = sink.enqueue(&text, AttemptRecord::detached(text.to_string(), "").to_columns());
        let _ = sink.commit_pool();
        if let Ok(rows) = sink.read_rows(&text, 0, 10, None) {
            assert!(rows.iter().all(|r| r.attempted == text));
        }
    }
    let _ = sink.table_exists(&text);
});
