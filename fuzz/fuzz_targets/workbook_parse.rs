//! Fuzz target for workbook decoding.
//!
//! Arbitrary bytes go through calamine's format probing and the header/cell
//! mapping; decoding may fail but must not panic.

#![no_main]

use coordshift::dataset::io_table::points_from_rows;
use coordshift::dataset::{SpreadsheetDecoder, XlsxDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(rows) = XlsxDecoder::new().parse(data) {
        let _ = points_from_rows(&rows);
    }
});
