//! Fuzz target: `records_from_json`
//!
//! Feeds arbitrary text through the record parser the write commands use.
//! It must reject garbage with an error, never a panic, and records it
//! accepts must survive a trip back through the structural form.
//!
//! cargo fuzz run fuzz_records_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use nfcbridge::ndef::json::{record_to_json, records_from_json};
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(records) = records_from_json(&Value::String(text.to_owned())) else {
        return;
    };
    let json = Value::Array(records.iter().map(record_to_json).collect());
    let again = records_from_json(&json).expect("emitted records must parse");
    assert_eq!(again, records);
});
