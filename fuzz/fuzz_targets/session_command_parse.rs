//! Fuzz target for session script command parsing.
//!
//! This fuzzer feeds arbitrary UTF-8 scripts to the command parser,
//! checking for panics, crashes, or hangs.

#![no_main]

use coordshift::session::fuzz_parse_command;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(script) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_command(script);
});
