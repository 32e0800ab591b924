#![no_main]

use libfuzzer_sys::fuzz_target;
use strand::generator::{generate_random, generate_sequential, AttemptSpec};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bounds, lengths and prohibitions: building may fail, but
    // generation from a valid spec must never panic or spin forever.
    if data.len() < 6 {
        return;
    }
    let length = usize::from(data[0] % 4) + 1;
    let minimum = u32::from(u16::from_le_bytes([data[1], data[2]]));
    let maximum = minimum + u32::from(data[3] % 8);
    let prohibited: Vec<String> = String::from_utf8_lossy(&data[4..])
        .chars()
        .map(String::from)
        .collect();

    let Ok(spec) = AttemptSpec::builder()
        .length(length)
        .range(minimum, maximum)
        .prohibit(prohibited)
        .renderer_kind(strand::generator::RendererKind::Unicode)
        .build()
    else {
        return;
    };

    for record in generate_sequential(&spec).unwrap().take(4096) {
        assert!(record.value().chars().all(|c| !spec.is_prohibited(c)));
    }
    if let Ok(stream) = generate_random(&spec) {
        for record in stream.take(64) {
            assert!(record.value().chars().all(|c| !spec.is_prohibited(c)));
        }
    }
});
