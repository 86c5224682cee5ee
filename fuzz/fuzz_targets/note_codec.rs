#![no_main]

use libfuzzer_sys::fuzz_target;
use shortlog_core::note::{self, PREAMBLE};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Arbitrary input must never panic the decoder.
    let _ = note::decode::<serde_json::Value>(text);

    let stripped = note::remove_notes(text);
    assert!(stripped.len() <= text.len());
    if !text.as_bytes().windows(PREAMBLE.len()).any(|w| w == PREAMBLE) {
        assert_eq!(stripped, text);
    }

    let encoded = note::encode(text).expect("strings always serialize");
    let decoded: String = note::decode(&encoded).expect("own encoding decodes");
    assert_eq!(decoded, text);
    assert!(note::remove_notes(&encoded).is_empty());
});
