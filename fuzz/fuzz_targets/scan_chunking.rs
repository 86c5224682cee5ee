#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use shortlog_core::{MarkerSet, ScanConfig, find_shortlog_start};

fn at_sign(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?.iter().position(|&b| b == b'@').map(|i| i + from)
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // Header picks the window, chunk size and terminator; the rest is the log.
    let (header, log) = data.split_at(3);
    let tail_kb = u32::from(header[0] % 4);
    let chunk_size = usize::from(header[1] % 64) + 1;
    let eol = if header[2] % 2 == 0 { "\n" } else { "\r\n" };
    let candidates = MarkerSet::new(["@a", "@ab", "@b", "@abc"]);

    let scan = |chunk_size| {
        let config = ScanConfig {
            tail_kb,
            chunk_size,
            line_terminator: eol.to_string(),
            bridge_chunk_boundaries: true,
        };
        find_shortlog_start(Cursor::new(log), log.len() as u64, &candidates, &at_sign, &config)
            .expect("in-memory scan cannot fail")
    };

    let whole = scan(log.len().max(1));
    let chunked = scan(chunk_size);
    assert_eq!(whole, chunked, "chunk size {chunk_size} changed the result");

    if let Some(found) = &whole {
        assert!(found.line.ends_with(eol.as_bytes()));
        if let Some(marker) = &found.marker {
            assert!(candidates.contains(marker));
        }
    }
});
