//! Transport mode selection and peer-link tracking.
//!
//! The remote transport is chosen exactly once, at boot, from the stored
//! [`RemoteSelection`] and the transport family compiled into the image.
//! There is no runtime switching; a reconfiguration restarts the device.
//!
//! ```text
//!            ┌──────────── boot ────────────┐
//!            ▼                ▼             ▼
//!       BleActive     WebSocketActive   SerialOnly
//!        │    ▲          │    ▲
//!   conn │    │ disc+    │    │ disc+
//!        ▼    │ relisten ▼    │ relisten
//!       Attached         Attached
//! ```

use log::info;

use crate::config::{CompiledRemote, RemoteSelection};

use super::transport::TransportKind;

/// Remote transport mode, fixed for the lifetime of one boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    BleActive,
    WebSocketActive,
    SerialOnly,
}

impl TransportMode {
    /// Resolve the boot mode.
    ///
    /// BLE starts only when the stored `useBluetooth` flag is set (an
    /// explicit `Ble` selection or the first-boot `Bootstrap` state).  The
    /// WebSocket server starts when `useWebsocket` is set or `auto_start`
    /// is on; `auto_start` never forces BLE.
    pub fn select(selection: RemoteSelection, compiled: CompiledRemote, auto_start: bool) -> Self {
        let (use_websocket, use_bluetooth) = selection.flags();
        let mode = match compiled {
            CompiledRemote::Ble if use_bluetooth => Self::BleActive,
            CompiledRemote::WebSocket if use_websocket || auto_start => Self::WebSocketActive,
            _ => Self::SerialOnly,
        };
        info!(
            "Transport mode: {:?} (stored {:?}, compiled {:?})",
            mode, selection, compiled
        );
        mode
    }

    pub fn remote(self) -> Option<TransportKind> {
        match self {
            Self::BleActive => Some(TransportKind::Ble),
            Self::WebSocketActive => Some(TransportKind::WebSocket),
            Self::SerialOnly => None,
        }
    }
}

/// Peer attachment within an active remote mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Advertising / listening for a peer.
    Waiting,
    Attached,
}

/// Tracks whether a peer is attached and whether the stack must resume
/// advertising after a disconnect.
#[derive(Debug)]
pub struct PeerLink {
    state: PeerState,
    relisten_pending: bool,
    sessions: u32,
}

impl PeerLink {
    pub fn new() -> Self {
        Self {
            state: PeerState::Waiting,
            relisten_pending: false,
            sessions: 0,
        }
    }

    pub fn on_connect(&mut self) {
        self.state = PeerState::Attached;
        self.relisten_pending = false;
        self.sessions = self.sessions.wrapping_add(1);
    }

    pub fn on_disconnect(&mut self) {
        if self.state == PeerState::Attached {
            self.state = PeerState::Waiting;
            self.relisten_pending = true;
        }
    }

    /// Returns `true` once per disconnect: the caller must restart
    /// advertising / listening.
    pub fn take_relisten(&mut self) -> bool {
        core::mem::take(&mut self.relisten_pending)
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.state == PeerState::Attached
    }

    /// Peers attached since boot.
    pub fn sessions(&self) -> u32 {
        self.sessions
    }
}

impl Default for PeerLink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_starts_compiled_family() {
        assert_eq!(
            TransportMode::select(RemoteSelection::Bootstrap, CompiledRemote::Ble, true),
            TransportMode::BleActive
        );
        assert_eq!(
            TransportMode::select(RemoteSelection::Bootstrap, CompiledRemote::WebSocket, false),
            TransportMode::WebSocketActive
        );
    }

    #[test]
    fn explicit_selection_is_honoured() {
        assert_eq!(
            TransportMode::select(RemoteSelection::Ble, CompiledRemote::Ble, false),
            TransportMode::BleActive
        );
        assert_eq!(
            TransportMode::select(RemoteSelection::WebSocket, CompiledRemote::WebSocket, false),
            TransportMode::WebSocketActive
        );
    }

    #[test]
    fn none_selection_is_serial_only_without_auto_start() {
        for compiled in [CompiledRemote::Ble, CompiledRemote::WebSocket, CompiledRemote::None] {
            assert_eq!(
                TransportMode::select(RemoteSelection::None, compiled, false),
                TransportMode::SerialOnly
            );
        }
    }

    #[test]
    fn auto_start_never_forces_ble() {
        for selection in [RemoteSelection::None, RemoteSelection::WebSocket] {
            assert_eq!(
                TransportMode::select(selection, CompiledRemote::Ble, true),
                TransportMode::SerialOnly
            );
        }
    }

    #[test]
    fn auto_start_forces_websocket() {
        for selection in [RemoteSelection::None, RemoteSelection::Ble] {
            assert_eq!(
                TransportMode::select(selection, CompiledRemote::WebSocket, true),
                TransportMode::WebSocketActive
            );
            assert_eq!(
                TransportMode::select(selection, CompiledRemote::WebSocket, false),
                TransportMode::SerialOnly
            );
        }
    }

    #[test]
    fn serial_only_build_never_starts_remote() {
        assert_eq!(
            TransportMode::select(RemoteSelection::Bootstrap, CompiledRemote::None, true),
            TransportMode::SerialOnly
        );
        assert_eq!(TransportMode::SerialOnly.remote(), None);
    }

    #[test]
    fn disconnect_requests_relisten_once() {
        let mut link = PeerLink::new();
        assert!(!link.take_relisten());
        link.on_connect();
        assert!(link.is_attached());
        link.on_disconnect();
        assert_eq!(link.state(), PeerState::Waiting);
        assert!(link.take_relisten());
        assert!(!link.take_relisten());
    }

    #[test]
    fn spurious_disconnect_is_ignored() {
        let mut link = PeerLink::new();
        link.on_disconnect();
        assert!(!link.take_relisten());
        assert_eq!(link.sessions(), 0);
    }
}
