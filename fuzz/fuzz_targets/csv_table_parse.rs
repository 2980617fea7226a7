//! Fuzz target for CSV spreadsheet decoding and column-pair extraction.
//!
//! This fuzzer feeds arbitrary byte sequences to the CSV decoder,
//! checking for panics, crashes, or hangs.

#![no_main]

use coordshift::dataset::io_table::points_from_rows;
use coordshift::dataset::{CsvDecoder, SpreadsheetDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(rows) = CsvDecoder::new().parse(data) {
        let _ = points_from_rows(&rows);
    }
});
