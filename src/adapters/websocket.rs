//! WebSocket remote transport.
//!
//! Implements [`RemoteTransport`] as an HTTP server on the station
//! interface: the WebSocket endpoint lives at `/`, a plain status page at
//! `/status`.  Each inbound text frame is one command batch; notifications
//! go out as text frames to every attached peer.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspHttpServer` with a WebSocket handler and
//!   detached senders for outbound frames.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ```text
//!  peer ──ws text──▶ handler (httpd task) ──post──▶ Mailbox
//!  Broadcaster ──send──▶ detached sender ──ws text──▶ peer
//! ```

use std::sync::Arc;

use log::{info, warn};

use crate::config::{FIRMWARE_VERSION, MAX_WS_CLIENTS};
use crate::link::mailbox::{MAX_MESSAGE_LEN, Mailbox, Source};
use crate::link::mode::PeerLink;
use crate::link::transport::{RemoteTransport, TransportError, TransportKind};

use super::wifi::{BOOT_CONNECT_ATTEMPTS, WifiAdapter};

#[cfg(target_os = "espidf")]
use std::sync::Mutex;

#[cfg(target_os = "espidf")]
use esp_idf_svc::http::server::{
    Configuration as HttpConfiguration, EspHttpServer, ws::EspHttpWsDetachedSender,
};

/// Inbound frames larger than this are refused without being read.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_FRAME_LEN: usize = 4 * MAX_MESSAGE_LEN;

/// Hand one inbound frame to the control loop.  Text frames from the IDF
/// server carry a trailing NUL.
fn deliver(mailbox: &Mailbox, frame: &[u8]) -> bool {
    let end = frame.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    match core::str::from_utf8(&frame[..end]) {
        Ok("") => false,
        Ok(text) => mailbox.post_text(Source::Remote(TransportKind::WebSocket), text),
        Err(_) => {
            warn!("WebSocket: frame is not UTF-8 ({} bytes) — dropped", frame.len());
            false
        }
    }
}

fn status_page(peers: usize, station: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>OSSM</title></head><body>\
         <h1>OSSM bridge</h1>\
         <p>Firmware {FIRMWARE_VERSION}</p>\
         <p>Network: {station}</p>\
         <p>WebSocket peers: {peers}/{MAX_WS_CLIENTS}</p>\
         </body></html>"
    )
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF peer table
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
struct Peer {
    session: i32,
    sender: EspHttpWsDetachedSender,
}

#[cfg(target_os = "espidf")]
type PeerTable = Arc<Mutex<Vec<Peer>>>;

// ───────────────────────────────────────────────────────────────
// WebSocket link
// ───────────────────────────────────────────────────────────────

pub struct WebSocketLink {
    wifi: WifiAdapter,
    link: PeerLink,
    inbound: Option<Arc<Mailbox>>,
    running: bool,
    #[cfg(target_os = "espidf")]
    server: Option<EspHttpServer<'static>>,
    #[cfg(target_os = "espidf")]
    peers: PeerTable,
    /// Simulation: attached session ids.
    #[cfg(not(target_os = "espidf"))]
    sim_sessions: Vec<i32>,
    #[cfg(not(target_os = "espidf"))]
    sim_next_session: i32,
    /// Simulation: frames sent, one entry per peer per notification.
    #[cfg(not(target_os = "espidf"))]
    sim_sent: Vec<(i32, String)>,
}

impl WebSocketLink {
    /// `wifi` must already carry the station credentials.
    pub fn new(wifi: WifiAdapter) -> Self {
        Self {
            wifi,
            link: PeerLink::new(),
            inbound: None,
            running: false,
            #[cfg(target_os = "espidf")]
            server: None,
            #[cfg(target_os = "espidf")]
            peers: Arc::new(Mutex::new(Vec::new())),
            #[cfg(not(target_os = "espidf"))]
            sim_sessions: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_next_session: 1,
            #[cfg(not(target_os = "espidf"))]
            sim_sent: Vec::new(),
        }
    }

    pub fn wifi(&self) -> &WifiAdapter {
        &self.wifi
    }

    pub fn peer_count(&self) -> usize {
        self.platform_peer_count()
    }

    /// Simulation: a peer completes the WebSocket handshake.  Returns its
    /// session id, or `None` when the peer table is full.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_attach_peer(&mut self) -> Option<i32> {
        if !self.running || self.sim_sessions.len() >= MAX_WS_CLIENTS {
            warn!("WebSocket(sim): peer refused");
            return None;
        }
        let session = self.sim_next_session;
        self.sim_next_session += 1;
        self.sim_sessions.push(session);
        info!("WebSocket(sim): peer {} attached", session);
        Some(session)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_detach_peer(&mut self, session: i32) {
        self.sim_sessions.retain(|&s| s != session);
        info!("WebSocket(sim): peer {} detached", session);
    }

    /// Simulation: a text frame arrives from `session`.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_on_frame(&mut self, session: i32, frame: &[u8]) -> bool {
        if !self.sim_sessions.contains(&session) {
            return false;
        }
        match self.inbound.as_deref() {
            Some(mailbox) => deliver(mailbox, frame),
            None => false,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_sent(&self) -> &[(i32, String)] {
        &self.sim_sent
    }

    /// Simulation: mutable access to the station for link-loss scenarios.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_wifi_mut(&mut self) -> &mut WifiAdapter {
        &mut self.wifi
    }

    /// Status page as currently rendered.
    pub fn render_status(&self) -> String {
        status_page(self.peer_count(), self.wifi.ssid())
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self, mailbox: Arc<Mailbox>) -> Result<(), TransportError> {
        use esp_idf_svc::http::Method;
        use esp_idf_svc::io::Write;
        use esp_idf_svc::ws::FrameType;

        let config = HttpConfiguration {
            max_open_sockets: MAX_WS_CLIENTS + 2,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&config).map_err(|e| {
            log::error!("WebSocket: HTTP server failed to start: {}", e);
            TransportError::StackInitFailed
        })?;

        let peers = self.peers.clone();
        let station: String = self.wifi.ssid().into();
        server
            .fn_handler("/status", Method::Get, move |req| -> anyhow::Result<()> {
                let count = peers.lock().map_or(0, |p| p.len());
                let page = status_page(count, &station);
                req.into_ok_response()?.write_all(page.as_bytes())?;
                Ok(())
            })
            .map_err(|_| TransportError::StackInitFailed)?;

        let peers = self.peers.clone();
        server
            .ws_handler("/", move |ws| -> anyhow::Result<()> {
                let session = ws.session();
                if ws.is_new() {
                    let mut table = peers.lock().map_err(|_| anyhow::anyhow!("peer table poisoned"))?;
                    if table.len() >= MAX_WS_CLIENTS {
                        warn!("WebSocket: peer limit reached, refusing session {}", session);
                        anyhow::bail!("peer limit reached");
                    }
                    table.push(Peer {
                        session,
                        sender: ws.create_detached_sender()?,
                    });
                    info!("WebSocket: peer {} attached", session);
                    return Ok(());
                }
                if ws.is_closed() {
                    if let Ok(mut table) = peers.lock() {
                        table.retain(|p| p.session != session);
                    }
                    info!("WebSocket: peer {} closed", session);
                    return Ok(());
                }

                let (frame_type, len) = ws.recv(&mut [])?;
                if len > MAX_FRAME_LEN {
                    warn!("WebSocket: {} byte frame refused", len);
                    anyhow::bail!("frame too large");
                }
                let mut buf = vec![0u8; len];
                ws.recv(&mut buf)?;
                match frame_type {
                    FrameType::Text(false) => {
                        deliver(&mailbox, &buf);
                    }
                    FrameType::Text(true) | FrameType::Continue(_) => {
                        warn!("WebSocket: fragmented frame — dropped");
                    }
                    _ => {}
                }
                Ok(())
            })
            .map_err(|_| TransportError::StackInitFailed)?;

        self.server = Some(server);
        info!("WebSocket(espidf): listening on / (status at /status)");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self, _mailbox: Arc<Mailbox>) -> Result<(), TransportError> {
        info!("WebSocket(sim): listening on / (status at /status)");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&mut self) {
        if let Ok(mut table) = self.peers.lock() {
            table.clear();
        }
        self.server = None;
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&mut self) {
        self.sim_sessions.clear();
    }

    #[cfg(target_os = "espidf")]
    fn platform_peer_count(&self) -> usize {
        self.peers.lock().map_or(0, |p| p.len())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_peer_count(&self) -> usize {
        self.sim_sessions.len()
    }

    /// Send to every attached peer; succeeds if at least one accepted.
    #[cfg(target_os = "espidf")]
    fn platform_send(&mut self, text: &str) -> Result<(), TransportError> {
        use esp_idf_svc::ws::FrameType;

        let mut table = self.peers.lock().map_err(|_| TransportError::SendFailed)?;
        let mut delivered = false;
        table.retain_mut(|peer| match peer.sender.send(FrameType::Text(false), text.as_bytes()) {
            Ok(()) => {
                delivered = true;
                true
            }
            Err(e) => {
                warn!("WebSocket: send to peer {} failed ({}), dropping it", peer.session, e);
                false
            }
        });
        if delivered { Ok(()) } else { Err(TransportError::SendFailed) }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_send(&mut self, text: &str) -> Result<(), TransportError> {
        for &session in &self.sim_sessions {
            self.sim_sent.push((session, text.to_owned()));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// RemoteTransport implementation
// ───────────────────────────────────────────────────────────────

impl RemoteTransport for WebSocketLink {
    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    fn start(&mut self, inbound: Arc<Mailbox>) -> Result<(), TransportError> {
        if let Err(e) = self.wifi.connect_blocking(BOOT_CONNECT_ATTEMPTS) {
            warn!("WebSocket: station never came up: {}", e);
            return Err(TransportError::StackInitFailed);
        }
        self.platform_start(inbound.clone())?;
        self.inbound = Some(inbound);
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.platform_stop();
        self.wifi.disconnect();
        self.running = false;
        self.inbound = None;
        info!("WebSocket: stopped");
    }

    fn is_connected(&self) -> bool {
        self.running && self.platform_peer_count() > 0
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if text.len() > MAX_MESSAGE_LEN {
            return Err(TransportError::MessageTooLong);
        }
        self.platform_send(text)
    }

    fn poll(&mut self) {
        if !self.running {
            return;
        }
        self.wifi.poll();

        let attached = self.platform_peer_count() > 0;
        if attached && !self.link.is_attached() {
            self.link.on_connect();
        } else if !attached && self.link.is_attached() {
            self.link.on_disconnect();
        }
        // The server keeps listening across sessions.
        if self.link.take_relisten() {
            info!("WebSocket: peer gone, waiting for the next one");
        }
    }
}
