//! Bridge mailbox: the single queue into the control loop.
//!
//! Uses an `embassy-sync` bounded channel to hand work from the transport
//! callbacks and the serial reader thread to the synchronous control loop.
//! Homing completions bypass the channel through a one-entry slot that
//! keeps the newest attempt, so a burst of commands can never push a
//! completion out.  The control loop is the only consumer, so command
//! handling is never re-entered.
//!
//! ```text
//! ┌──────────────┐
//! │ BLE / WS rx  │──┐
//! ├──────────────┤  │  BridgeMsg   ┌──────────────┐
//! │ serial rx    │──┼────────────▶│ Control Loop │
//! ├──────────────┤  │              │ (sync)       │
//! │ homing done  │──┘  (slot)      └──────────────┘
//! └──────────────┘
//! ```

use core::cell::Cell;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::warn;

use crate::error::BridgeError;

use super::transport::TransportKind;

/// Largest inbound or outbound message, in bytes.
pub const MAX_MESSAGE_LEN: usize = 512;

/// Channel depth for inbound work.
pub const MAILBOX_DEPTH: usize = 8;

/// Back-off between attempts while a blocking producer waits for room.
const FULL_RETRY: Duration = Duration::from_millis(2);

/// Where an inbound message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Serial,
    Remote(TransportKind),
}

/// Work item for the control loop.
#[derive(Debug)]
pub enum BridgeMsg {
    /// Raw command text from a transport.
    Inbound {
        source: Source,
        text: heapless::String<MAX_MESSAGE_LEN>,
    },
    /// The motion controller finished homing attempt `attempt`.
    HomingFinished { attempt: u32, success: bool },
}

/// Bounded MPSC queue shared between producers and the control loop.
pub struct Mailbox {
    channel: Channel<CriticalSectionRawMutex, BridgeMsg, MAILBOX_DEPTH>,
    homing: Mutex<CriticalSectionRawMutex, Cell<Option<(u32, bool)>>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            channel: Channel::new(),
            homing: Mutex::new(Cell::new(None)),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Enqueue without blocking.  Returns `false` if the mailbox was full
    /// and the message was dropped.
    pub fn post(&self, msg: BridgeMsg) -> bool {
        match self.channel.try_send(msg) {
            Ok(()) => true,
            Err(_) => {
                warn!("Mailbox full, message dropped");
                false
            }
        }
    }

    /// Enqueue inbound text.  Oversized messages are dropped here, before
    /// they cost a mailbox slot.
    pub fn post_text(&self, source: Source, text: &str) -> bool {
        let Ok(text) = heapless::String::try_from(text) else {
            warn!(
                "{}: {:?} message of {} bytes exceeds {} — dropped",
                BridgeError::MalformedInput,
                source,
                text.len(),
                MAX_MESSAGE_LEN
            );
            return false;
        };
        self.post(BridgeMsg::Inbound { source, text })
    }

    /// Enqueue inbound text, sleeping until the control loop makes room.
    /// For producers on their own thread that must not lose input.
    /// Returns `false` only for oversized text.
    pub fn post_text_wait(&self, source: Source, text: &str) -> bool {
        let Ok(text) = heapless::String::<MAX_MESSAGE_LEN>::try_from(text) else {
            return self.post_text(source, text);
        };
        let mut msg = BridgeMsg::Inbound { source, text };
        loop {
            match self.channel.try_send(msg) {
                Ok(()) => return true,
                Err(TrySendError::Full(back)) => {
                    msg = back;
                    thread::sleep(FULL_RETRY);
                }
            }
        }
    }

    /// Record a homing outcome.  Never fails: the slot holds one report
    /// and a newer attempt replaces an older one still waiting.
    pub fn complete_homing(&self, attempt: u32, success: bool) {
        self.homing.lock(|slot| match slot.get() {
            Some((waiting, _)) if waiting > attempt => {
                warn!("Mailbox: homing report {} older than {} ignored", attempt, waiting);
            }
            _ => slot.set(Some((attempt, success))),
        });
    }

    /// Dequeue the next work item, if any.  A waiting homing report is
    /// handed out before queued commands.
    pub fn take(&self) -> Option<BridgeMsg> {
        if let Some((attempt, success)) = self.homing.lock(|slot| slot.take()) {
            return Some(BridgeMsg::HomingFinished { attempt, success });
        }
        self.channel.try_receive().ok()
    }

    fn homing_waiting(&self) -> bool {
        self.homing.lock(|slot| slot.get().is_some())
    }

    pub fn len(&self) -> usize {
        self.channel.len() + usize::from(self.homing_waiting())
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty() && !self.homing_waiting()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
