//! Fuzz target: inbound command path
//!
//! Drives arbitrary bytes through the length guard and the `;`-separated
//! decoder, then encodes a response for whatever decoded.  Neither side
//! may panic, and an encoded response must respect the payload bound.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use iobridge::protocol::{self, SEPARATOR};

const MAX_COMMAND_LEN: usize = 100;
const MAX_PAYLOAD_LEN: usize = 150;

fuzz_target!(|data: &[u8]| {
    let Ok(request) = protocol::decode_message(data, MAX_COMMAND_LEN) else {
        return;
    };
    assert!(data.len() < MAX_COMMAND_LEN);
    // Three non-empty fields need at least two separators.
    assert!(data.iter().filter(|&&b| b == SEPARATOR as u8).count() >= 2);

    let message = core::str::from_utf8(data).unwrap_or("");
    if let Ok(json) =
        protocol::encode_response(0, &request, false, message, MAX_PAYLOAD_LEN)
    {
        assert!(json.len() <= MAX_PAYLOAD_LEN);
    }
});
