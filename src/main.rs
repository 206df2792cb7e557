//! OSSM Bridge Firmware: Main Entry Point
//!
//! Boots the one remote transport the stored preferences select, then runs
//! a single cooperative control loop that owns all bridge state.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BleLink / WebSocketLink   serial reader    StrokerFacade      │
//! │  (RemoteTransport)         (stdin thread)   (MotionPort)       │
//! │  NvsAdapter                SerialConsole    SystemRestart      │
//! │  (StoragePort)             (ConsoleSink)    (RestartPort)      │
//! │                                                                │
//! │  ──────────────── Mailbox / Port Trait Boundary ─────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          BridgeService (pure logic)                    │    │
//! │  │  codec · dispatch · homing · reconfigure               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};

use ossm_bridge::adapters::nvs::NvsAdapter;
use ossm_bridge::adapters::serial::{SerialConsole, spawn_serial_reader};
use ossm_bridge::adapters::stroker::StrokerFacade;
use ossm_bridge::adapters::system::SystemRestart;
use ossm_bridge::app::ports::{MotionPort, RestartPort};
use ossm_bridge::app::service::{BridgeService, Flow};
use ossm_bridge::config::{
    API_VERSION, AUTO_START_REMOTE, COMPILED_REMOTE, MAX_DEPTH_MM, MachineLimits, ModeConfig,
};
use ossm_bridge::link::broadcast::Broadcaster;
use ossm_bridge::link::mailbox::Mailbox;
use ossm_bridge::link::mode::TransportMode;
use ossm_bridge::link::transport::{RemoteTransport, TransportKind};

#[cfg(any(feature = "ble", not(target_os = "espidf")))]
use ossm_bridge::adapters::ble::BleLink;
#[cfg(any(feature = "websocket", not(target_os = "espidf")))]
use ossm_bridge::adapters::{websocket::WebSocketLink, wifi::WifiAdapter};

const LOOP_INTERVAL: Duration = Duration::from_millis(5);

// ── Remote transport construction ─────────────────────────────

/// Board resources shared between the storage and radio adapters.
struct Board {
    #[cfg(target_os = "espidf")]
    nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
}

impl Board {
    #[cfg(target_os = "espidf")]
    fn take() -> Result<Self> {
        Ok(Self {
            nvs: esp_idf_svc::nvs::EspDefaultNvsPartition::take()?,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn take() -> Result<Self> {
        Ok(Self {})
    }

    #[cfg(target_os = "espidf")]
    fn store(&self) -> NvsAdapter {
        NvsAdapter::new(self.nvs.clone())
    }

    #[cfg(not(target_os = "espidf"))]
    fn store(&self) -> NvsAdapter {
        NvsAdapter::new()
    }

    #[cfg(all(target_os = "espidf", feature = "websocket"))]
    fn station(&self) -> Result<WifiAdapter> {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::hal::peripherals::Peripherals;

        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        WifiAdapter::new(peripherals.modem, sysloop, Some(self.nvs.clone()))
    }

    #[cfg(not(target_os = "espidf"))]
    fn station(&self) -> Result<WifiAdapter> {
        Ok(WifiAdapter::new())
    }
}

#[cfg_attr(
    all(target_os = "espidf", not(feature = "websocket")),
    allow(unused_variables)
)]
fn build_remote(
    kind: TransportKind,
    prefs: &ModeConfig,
    board: &Board,
) -> Result<Box<dyn RemoteTransport>> {
    match kind {
        #[cfg(any(feature = "ble", not(target_os = "espidf")))]
        TransportKind::Ble => Ok(Box::new(BleLink::new(&prefs.ble_name))),
        #[cfg(any(feature = "websocket", not(target_os = "espidf")))]
        TransportKind::WebSocket => {
            let mut wifi = board.station()?;
            if let Err(e) = wifi.set_credentials(&prefs.wifi_ssid, &prefs.wifi_password) {
                warn!("Stored WiFi credentials rejected: {}", e);
            }
            Ok(Box::new(WebSocketLink::new(wifi)))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("{} is not compiled into this image", other),
    }
}

/// Start the selected remote.  A remote that fails to come up leaves the
/// bridge serial-only for this boot.
fn start_remote(
    mode: TransportMode,
    prefs: &ModeConfig,
    board: &Board,
    mailbox: &Arc<Mailbox>,
) -> Result<Option<Box<dyn RemoteTransport>>> {
    let Some(kind) = mode.remote() else {
        info!("Serial-only mode: no remote transport");
        return Ok(None);
    };

    let mut remote = build_remote(kind, prefs, board)?;
    match remote.start(mailbox.clone()) {
        Ok(()) => {
            info!("{} remote active", kind);
            Ok(Some(remote))
        }
        Err(e) => {
            error!("{} failed to start ({}), continuing serial-only", kind, e);
            Ok(None)
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    info!("╔══════════════════════════════════════╗");
    info!("║  OSSM bridge v{} (API {})          ║", env!("CARGO_PKG_VERSION"), API_VERSION);
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load preferences from NVS (or defaults) ────────────
    let board = Board::take()?;
    let mut store = board.store();
    let prefs = ModeConfig::load(&store);
    info!("Preferences: {:?}", prefs);

    // ── 3. Remote transport, fixed for this boot ──────────────
    let mode = TransportMode::select(prefs.remote, COMPILED_REMOTE, AUTO_START_REMOTE);
    let mailbox = Mailbox::shared();
    let remote = start_remote(mode, &prefs, &board, &mailbox)?;

    // ── 4. Serial, motion, dispatcher ─────────────────────────
    #[cfg_attr(target_os = "espidf", allow(unused_variables))]
    let serial_rx = spawn_serial_reader(std::io::stdin(), mailbox.clone())?;
    let mut motion = StrokerFacade::new(MAX_DEPTH_MM);
    let mut broadcaster = Broadcaster::new(remote, SerialConsole::stdout());
    let mut restart = SystemRestart::new();
    let mut bridge = BridgeService::new(MachineLimits::default(), prefs, mailbox.clone());

    info!("Bridge ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        while let Some(msg) = mailbox.take() {
            if let Flow::Restart(req) = bridge.handle(msg, &mut motion, &mut broadcaster, &mut store) {
                info!("Remote set to {:?}, restarting to apply", req.selection);
                motion.disable();
                broadcaster.shutdown();
                restart.restart(req.settle);
                return Ok(());
            }
        }

        motion.poll();
        broadcaster.poll();

        // The host simulation ends with its input.
        #[cfg(not(target_os = "espidf"))]
        if serial_rx.is_finished() && mailbox.is_empty() && !motion.homing_pending() {
            info!("Serial input closed after {} message(s)", bridge.handled());
            return Ok(());
        }

        std::thread::sleep(LOOP_INTERVAL);
    }
}
