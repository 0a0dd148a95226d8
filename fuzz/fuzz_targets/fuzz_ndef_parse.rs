//! Fuzz target: `NdefMessage::from_bytes`
//!
//! Arbitrary bytes must never panic the parser.  Anything it accepts must
//! re-encode to a message that parses back to the same records.
//!
//! cargo fuzz run fuzz_ndef_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use nfcbridge::NdefMessage;

fuzz_target!(|data: &[u8]| {
    let Ok(message) = NdefMessage::from_bytes(data) else {
        return;
    };
    // Chunked input re-encodes unchunked, so compare records, not bytes.
    let bytes = message.to_bytes();
    assert_eq!(bytes.len(), message.byte_len());
    let again = NdefMessage::from_bytes(&bytes).expect("re-encoded message must parse");
    assert_eq!(again, message);
});
