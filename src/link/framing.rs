//! Newline-delimited framing for the serial console.
//!
//! The console delivers an unstructured byte stream; a command batch ends
//! at `\n` (an optional preceding `\r` is stripped).  The decoder
//! accumulates bytes and yields complete lines.  This handles partial
//! reads gracefully: a single read may return part of a line or several
//! lines concatenated.
//!
//! A line longer than [`MAX_MESSAGE_LEN`] is discarded up to and including
//! its terminating newline.

use log::warn;

use crate::error::BridgeError;

use super::mailbox::MAX_MESSAGE_LEN;

/// Streaming line decoder.
pub struct LineDecoder {
    buf: heapless::Vec<u8, MAX_MESSAGE_LEN>,
    /// Set while discarding the tail of an oversized line.
    overflowed: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
            overflowed: false,
        }
    }

    /// Feed bytes into the decoder, calling `on_line` for every complete,
    /// non-blank line.  Lines that are not UTF-8 are dropped.
    pub fn feed(&mut self, data: &[u8], mut on_line: impl FnMut(&str)) {
        for &byte in data {
            if byte == b'\n' {
                if self.overflowed {
                    self.overflowed = false;
                } else {
                    self.emit(&mut on_line);
                }
                self.buf.clear();
                continue;
            }

            if self.overflowed {
                continue;
            }

            if self.buf.push(byte).is_err() {
                warn!(
                    "{}: serial line exceeds {} bytes — discarding",
                    BridgeError::MalformedInput,
                    MAX_MESSAGE_LEN
                );
                self.buf.clear();
                self.overflowed = true;
            }
        }
    }

    fn emit(&self, on_line: &mut impl FnMut(&str)) {
        let line = self.buf.strip_suffix(b"\r").unwrap_or(&self.buf[..]);
        match core::str::from_utf8(line) {
            Ok(text) if !text.trim().is_empty() => on_line(text),
            Ok(_) => {}
            Err(_) => warn!("{}: serial line is not UTF-8", BridgeError::MalformedInput),
        }
    }

    /// Reset decoder state (e.g. after a console reconnect).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }

    /// Bytes of the current partial line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
