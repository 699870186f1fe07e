//! Fuzz target: host line framing and command parsing
//!
//! Streams arbitrary bytes through `LineReceiver` and parses every line it
//! emits.  Invariants checked:
//! - No panics under any byte sequence
//! - No emitted line is empty, over the cap, or carries a terminator
//! - A successfully parsed line always starts with `MODEL=` (any case)
//!
//! cargo fuzz run fuzz_command_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use pneujig::app::commands::{parse_command, LineReceiver};
use pneujig::config::COMMAND_LINE_CAP;

fuzz_target!(|data: &[u8]| {
    let mut rx = LineReceiver::new();
    for &byte in data {
        let Some(line) = rx.push(byte) else {
            continue;
        };
        assert!(!line.is_empty());
        assert!(line.len() <= COMMAND_LINE_CAP);
        assert!(!line.iter().any(|&b| b == b'\r' || b == b'\n'));

        if parse_command(&line).is_ok() {
            let text = core::str::from_utf8(&line).unwrap().trim();
            assert!(text.len() >= 6 && text[..6].eq_ignore_ascii_case("MODEL="));
        }
    }
});
