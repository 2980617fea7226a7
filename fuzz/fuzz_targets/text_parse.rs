//! Fuzz target for delimited coordinate text parsing.
//!
//! This fuzzer feeds arbitrary UTF-8 text to the line parser, checking for
//! panics, crashes, hangs, and non-finite points slipping through.

#![no_main]

use coordshift::dataset::parse_delimited_text;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let batch = parse_delimited_text(text);
    assert!(batch.points.iter().all(|p| p.is_finite()));
});
