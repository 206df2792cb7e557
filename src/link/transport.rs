//! Remote transport abstraction: a message-oriented link to one peer app.
//!
//! Concrete implementations:
//! - BLE GATT control characteristic (write + notify)
//! - WebSocket text frames (over WiFi)
//!
//! Inbound messages are posted to the [`Mailbox`] handed over in
//! [`RemoteTransport::start`]; the control loop never calls into a radio
//! stack to receive.  Outbound notifications go through
//! [`RemoteTransport::send`].  The serial console is not a remote
//! transport: it is always present and handled separately.

use std::sync::Arc;

use super::mailbox::Mailbox;

/// Remote transport family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Ble,
    WebSocket,
}

impl core::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Ble => write!(f, "BLE"),
            Self::WebSocket => write!(f, "WebSocket"),
        }
    }
}

/// Snapshot of the remote link, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    /// Active transport, `None` in serial-only mode.
    pub active: Option<TransportKind>,
    pub peer_connected: bool,
}

impl ConnectionState {
    pub const SERIAL_ONLY: Self = Self {
        active: None,
        peer_connected: false,
    };
}

/// Errors from [`RemoteTransport`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No peer attached.
    NotConnected,
    /// The stack refused the outbound message.
    SendFailed,
    /// The radio stack or server failed to come up.
    StackInitFailed,
    /// Outbound message exceeds the transport's payload limit.
    MessageTooLong,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "no peer connected"),
            Self::SendFailed => write!(f, "send failed"),
            Self::StackInitFailed => write!(f, "stack init failed"),
            Self::MessageTooLong => write!(f, "message too long"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Message-oriented link to a remote peer.
pub trait RemoteTransport {
    fn kind(&self) -> TransportKind;

    /// Bring the stack up and start delivering inbound text to `inbound`.
    fn start(&mut self, inbound: Arc<Mailbox>) -> Result<(), TransportError>;

    /// Tear the stack down.  Idempotent.
    fn stop(&mut self);

    fn is_connected(&self) -> bool;

    /// Deliver one outbound text message to the attached peer.
    fn send(&mut self, text: &str) -> Result<(), TransportError>;

    /// Periodic housekeeping from the control loop (re-advertising,
    /// reaping closed sessions).
    fn poll(&mut self) {}

    fn connection(&self) -> ConnectionState {
        ConnectionState {
            active: Some(self.kind()),
            peer_connected: self.is_connected(),
        }
    }
}
