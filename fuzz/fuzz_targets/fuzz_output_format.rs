#![no_main]

use libfuzzer_sys::fuzz_target;
use strand::generator::OutputFormat;

fuzz_target!(|data: &[u8]| {
    let template = String::from_utf8_lossy(data);
    if let Ok(format) = OutputFormat::parse(&template) {
        let rendered = format.render("\u{0}X\u{0}");
        assert!(rendered.contains("\u{0}X\u{0}"));
        assert_eq!(rendered.len(), template.len() - "{fuzzed_string}".len() + 3);
    }
});
