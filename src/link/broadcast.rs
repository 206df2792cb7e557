//! Notification fan-out.
//!
//! Every outbound notification is encoded once, mirrored to the serial
//! console unconditionally, and sent to the active remote transport if a
//! peer is attached.  A missing peer is [`BridgeError::TransportUnavailable`]
//! and is silently skipped; a failed send is logged and never retried.

use log::{debug, warn};

use crate::app::events::Notification;
use crate::app::ports::{ConsoleSink, NotificationSink};
use crate::error::BridgeError;

use super::codec;
use super::transport::{ConnectionState, RemoteTransport};

/// Result of one broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// The remote peer accepted the message.
    pub remote: bool,
}

pub struct Broadcaster<C: ConsoleSink> {
    remote: Option<Box<dyn RemoteTransport>>,
    console: C,
    sent: u32,
    skipped: u32,
}

impl<C: ConsoleSink> Broadcaster<C> {
    /// `remote` is `None` in serial-only mode.
    pub fn new(remote: Option<Box<dyn RemoteTransport>>, console: C) -> Self {
        Self {
            remote,
            console,
            sent: 0,
            skipped: 0,
        }
    }

    pub fn broadcast(&mut self, notification: &Notification) -> Delivery {
        let text = codec::encode(notification);
        let mut delivery = Delivery { remote: false };

        if let Some(remote) = self.remote.as_mut() {
            if remote.is_connected() {
                match remote.send(&text) {
                    Ok(()) => {
                        delivery.remote = true;
                        self.sent = self.sent.wrapping_add(1);
                    }
                    Err(e) => {
                        warn!("{} send failed: {}", remote.kind(), e);
                        self.skipped = self.skipped.wrapping_add(1);
                    }
                }
            } else {
                debug!("{}: {} has no peer", BridgeError::TransportUnavailable, remote.kind());
                self.skipped = self.skipped.wrapping_add(1);
            }
        }

        self.console.write_line(&text);
        delivery
    }

    /// Housekeeping for the remote transport.
    pub fn poll(&mut self) {
        if let Some(remote) = self.remote.as_mut() {
            remote.poll();
        }
    }

    /// Stop the remote transport ahead of a restart.
    pub fn shutdown(&mut self) {
        if let Some(remote) = self.remote.as_mut() {
            remote.stop();
        }
    }

    pub fn connection(&self) -> ConnectionState {
        self.remote
            .as_ref()
            .map_or(ConnectionState::SERIAL_ONLY, |r| r.connection())
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Notifications the remote peer accepted.
    pub fn sent(&self) -> u32 {
        self.sent
    }

    /// Notifications the remote peer did not receive.
    pub fn skipped(&self) -> u32 {
        self.skipped
    }
}

impl<C: ConsoleSink> NotificationSink for Broadcaster<C> {
    fn emit(&mut self, notification: &Notification) {
        self.broadcast(notification);
    }
}
