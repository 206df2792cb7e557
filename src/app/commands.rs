//! Inbound commands to the bridge.
//!
//! These are the actions requested by a remote peer or the serial console
//! after the [`codec`](crate::link::codec) has decoded them.  The
//! [`BridgeService`](super::service::BridgeService) interprets them and
//! drives the motion controller.

use crate::config::{MAX_BLE_NAME_LEN, MAX_PASSWORD_LEN, MAX_SSID_LEN, is_printable_ascii};
use crate::error::BridgeError;
use crate::link::transport::TransportKind;

/// Commands that transports can send into the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Queue a streaming waypoint (`position` 0–100, `time_ms` to reach it).
    Move { position: i32, time_ms: i32, replace: bool },

    StartStreaming,

    /// Disable the motor, then home with the requested method.
    Home(HomeKind),

    /// Persist a new remote transport selection and restart to apply it.
    ConfigureRemote(RemoteConfig),

    Stop,

    SetPattern(i32),

    /// Speed as a percentage of the machine's stroke-rate range.
    SetSpeed(f32),

    /// Stroke length as a percentage of the maximum depth.
    SetStroke(f32),

    /// Depth as a percentage of the maximum depth.
    SetDepth(f32),

    SetSensation(f32),

    /// Guided depth setup.  `None` selects the default move speed.
    Setup { speed: Option<f32> },

    Retract { speed: Option<f32> },

    Extend { speed: Option<f32> },

    /// A peer announced itself.  Treated as a safety disable.
    Connected,

    Disable,

    /// Report API and firmware versions.
    Version,

    /// Reserved; accepted and ignored.
    GetPatternList,
}

impl Command {
    /// Wire name of the action, used for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::StartStreaming => "startStreaming",
            Self::Home(_) => "home",
            Self::ConfigureRemote(RemoteConfig::WebSocket { .. }) => "configureWebsocket",
            Self::ConfigureRemote(RemoteConfig::Ble { .. }) => "configureBluetooth",
            Self::Stop => "stop",
            Self::SetPattern(_) => "setPattern",
            Self::SetSpeed(_) => "setSpeed",
            Self::SetStroke(_) => "setStroke",
            Self::SetDepth(_) => "setDepth",
            Self::SetSensation(_) => "setSensation",
            Self::Setup { .. } => "setup",
            Self::Retract { .. } => "retract",
            Self::Extend { .. } => "extend",
            Self::Connected => "connected",
            Self::Disable => "disable",
            Self::Version => "version",
            Self::GetPatternList => "getPatternList",
        }
    }
}

/// Homing method carried by a `home` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeKind {
    /// Drive towards the endstop.
    Auto,
    /// Accept the current position as home.
    Manual,
    /// Current-sensing homing without an endstop.
    Sensorless,
    /// Any other type string.  The motor is disabled and nothing else happens.
    Unsupported,
}

/// Target of a `configureWebsocket` / `configureBluetooth` command.
#[derive(Clone, PartialEq, Eq)]
pub enum RemoteConfig {
    WebSocket { ssid: String, password: String },
    Ble { name: String },
}

impl RemoteConfig {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::WebSocket { .. } => TransportKind::WebSocket,
            Self::Ble { .. } => TransportKind::Ble,
        }
    }

    /// Reject parameters that would leave the device unreachable after the
    /// restart (empty BLE name, SSID that can never associate).
    pub fn validate(&self) -> Result<(), BridgeError> {
        match self {
            Self::Ble { name } => {
                if name.is_empty() || name.len() > MAX_BLE_NAME_LEN || !is_printable_ascii(name) {
                    return Err(BridgeError::OutOfRangeValue);
                }
            }
            Self::WebSocket { ssid, password } => {
                if ssid.is_empty() || ssid.len() > MAX_SSID_LEN || !is_printable_ascii(ssid) {
                    return Err(BridgeError::OutOfRangeValue);
                }
                // Open networks use an empty password.
                if password.len() > MAX_PASSWORD_LEN || !is_printable_ascii(password) {
                    return Err(BridgeError::OutOfRangeValue);
                }
            }
        }
        Ok(())
    }
}

// Manual impl so the WiFi password never reaches the log.
impl core::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WebSocket { ssid, .. } => f
                .debug_struct("WebSocket")
                .field("ssid", ssid)
                .field("password", &"<redacted>")
                .finish(),
            Self::Ble { name } => f.debug_struct("Ble").field("name", name).finish(),
        }
    }
}
