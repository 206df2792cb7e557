//! Fuzz target: serial line framing + `codec::decode`
//!
//! Feeds arbitrary bytes through the serial line decoder and decodes every
//! line it yields as a command batch.  The whole input is also decoded
//! directly, as a remote transport would hand it over.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use ossm_bridge::link::codec;
use ossm_bridge::link::framing::LineDecoder;
use ossm_bridge::link::mailbox::MAX_MESSAGE_LEN;

fuzz_target!(|data: &[u8]| {
    let mut decoder = LineDecoder::new();
    decoder.feed(data, |line| {
        assert!(line.len() <= MAX_MESSAGE_LEN, "line exceeds mailbox slot");
        if let Ok(batch) = codec::decode(line) {
            assert!(batch.commands.len() + batch.dropped <= line.len());
        }
    });
    assert!(decoder.pending() <= MAX_MESSAGE_LEN);

    let text = String::from_utf8_lossy(data);
    let _ = codec::decode(&text);
});
