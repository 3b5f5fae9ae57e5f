//! Fuzz target: `decode_command`
//!
//! Drives arbitrary byte sequences through the command decoder and the
//! bus link, and asserts that every accepted frame re-encodes to itself
//! and that the status reply stays well-formed.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use clocksync::protocol::{BusLink, checksum, decode_command, encode_command};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(cmd) = decode_command(data) {
        // Only canonical frames decode, except for the clamped PollTime
        // fields and a non-zero enable byte.
        let again = decode_command(&encode_command(&cmd));
        assert_eq!(again, Ok(cmd), "re-encoded frame must decode identically");
        assert_eq!(checksum(&data[..data.len() - 1]), data[data.len() - 1]);
    }

    let link = BusLink::new();
    let _ = link.on_receive(data);
    let status = link.on_request();
    assert_eq!(status[4], checksum(&status[..4]));
});
