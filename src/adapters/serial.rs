//! Serial console adapter.
//!
//! Outbound: [`SerialConsole`] implements [`ConsoleSink`] by writing one
//! line per notification to stdout (UART0 on the device, next to the log
//! output).
//!
//! Inbound: [`spawn_serial_reader`] runs a reader thread that splits the
//! byte stream into lines with a [`LineDecoder`] and posts each line to the
//! [`Mailbox`] as a serial command batch.  When the mailbox is full the
//! reader stops pulling bytes until the control loop catches up, leaving
//! the backlog in the UART buffer.

use std::io::{self, ErrorKind, Read, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};

use crate::app::ports::ConsoleSink;
use crate::link::framing::LineDecoder;
use crate::link::mailbox::{Mailbox, Source};

/// Reader thread stack.  Line assembly is heapless, so 4 KiB suffices.
const READER_STACK_SIZE: usize = 4096;

/// Back-off when the UART has nothing buffered.
const IDLE_POLL: Duration = Duration::from_millis(10);

// ───────────────────────────────────────────────────────────────
// Console sink
// ───────────────────────────────────────────────────────────────

pub struct SerialConsole<W: Write> {
    out: W,
}

impl SerialConsole<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> SerialConsole<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ConsoleSink for SerialConsole<W> {
    fn write_line(&mut self, line: &str) {
        // Nowhere left to report a failing console.
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();
    }
}

// ───────────────────────────────────────────────────────────────
// Reader thread
// ───────────────────────────────────────────────────────────────

/// Start the serial reader on its own thread.
///
/// On the device stdin never reaches end-of-file; a zero-length read means
/// the UART FIFO is empty.  On the host end-of-file ends the thread.
pub fn spawn_serial_reader<R>(reader: R, mailbox: Arc<Mailbox>) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("serial-rx".into())
        .stack_size(READER_STACK_SIZE)
        .spawn(move || read_lines(reader, &mailbox))
}

fn read_lines<R: Read>(mut reader: R, mailbox: &Mailbox) {
    let mut decoder = LineDecoder::new();
    let mut chunk = [0u8; 64];
    info!("Serial: reader started");

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => {
                if cfg!(target_os = "espidf") {
                    thread::sleep(IDLE_POLL);
                    continue;
                }
                break;
            }
            Ok(n) => decoder.feed(&chunk[..n], |line| {
                mailbox.post_text_wait(Source::Serial, line);
            }),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                thread::sleep(IDLE_POLL);
            }
            Err(e) => {
                warn!("Serial: read failed: {}", e);
                if !cfg!(target_os = "espidf") {
                    break;
                }
                thread::sleep(IDLE_POLL);
            }
        }
    }
    info!("Serial: reader stopped");
}
