//! Bridge configuration parameters
//!
//! Build-time constants for the OSSM machine and the remote transports, plus
//! the persisted remote-mode preferences ([`ModeConfig`]).  The preferences
//! are read once at boot; a change is only ever applied by restarting.

use core::time::Duration;

use log::warn;

use crate::app::commands::RemoteConfig;
use crate::app::ports::{StorageError, StoragePort};

// ───────────────────────────────────────────────────────────────
// Versions
// ───────────────────────────────────────────────────────────────

pub const API_VERSION: &str = "2.0";
pub const FIRMWARE_VERSION: &str = "2.0";

// ───────────────────────────────────────────────────────────────
// Machine geometry
// ───────────────────────────────────────────────────────────────

pub const MOTOR_STEPS_PER_REV: f32 = 2000.0;
pub const MAX_RPM: f32 = 3000.0;
pub const PULLEY_TEETH: f32 = 20.0;
pub const BELT_PITCH_MM: f32 = 2.0;

pub const STEPS_PER_MM: f32 = MOTOR_STEPS_PER_REV / (PULLEY_TEETH * BELT_PITCH_MM);
/// Linear speed ceiling in mm/s.
pub const MAX_SPEED_MM_S: f32 = (MAX_RPM / 60.0) * PULLEY_TEETH * BELT_PITCH_MM;

pub const PHYSICAL_TRAVEL_MM: f32 = 100.0;
/// Soft endstop margin kept clear at both ends of the rail.
pub const KEEPOUT_MM: f32 = 5.0;
/// Usable depth, rounded to whole millimetres.
pub const MAX_DEPTH_MM: f32 = ((PHYSICAL_TRAVEL_MM - 2.0 * KEEPOUT_MM) + 0.5) as i32 as f32;

// ───────────────────────────────────────────────────────────────
// Motion defaults
// ───────────────────────────────────────────────────────────────

pub const HOMING_SPEED: f32 = 25.0;
/// Stroke-rate range (strokes per minute) that `setSpeed` percentages map onto.
pub const SPEED_UPPER_LIMIT: f32 = 200.0;
pub const SPEED_LOWER_LIMIT: f32 = 0.5;
/// Used by `setup` / `retract` / `extend` when no speed is given.
pub const DEFAULT_MOVE_SPEED: f32 = 10.0;

/// Motion limits consumed by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachineLimits {
    pub speed_lower: f32,
    pub speed_upper: f32,
    pub homing_speed: f32,
    pub default_move_speed: f32,
}

impl Default for MachineLimits {
    fn default() -> Self {
        Self {
            speed_lower: SPEED_LOWER_LIMIT,
            speed_upper: SPEED_UPPER_LIMIT,
            homing_speed: HOMING_SPEED,
            default_move_speed: DEFAULT_MOVE_SPEED,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Remote transports
// ───────────────────────────────────────────────────────────────

#[cfg(all(feature = "ble", feature = "websocket"))]
compile_error!("features `ble` and `websocket` are mutually exclusive");

pub const DEFAULT_BLE_NAME: &str = "OSSM";
pub const DEFAULT_WIFI_SSID: &str = "";
pub const DEFAULT_WIFI_PASSWORD: &str = "";
/// Concurrent WebSocket peers accepted by the server.
pub const MAX_WS_CLIENTS: usize = 1;
/// Start the compiled-in remote transport when no preference was ever stored.
pub const AUTO_START_REMOTE: bool = true;
/// Delay between persisting a new remote selection and the restart.
pub const RESTART_SETTLE: Duration = Duration::from_millis(1000);

pub const MAX_BLE_NAME_LEN: usize = 29;
pub const MAX_SSID_LEN: usize = 32;
pub const MAX_PASSWORD_LEN: usize = 64;

/// Remote transport family compiled into this image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompiledRemote {
    Ble,
    WebSocket,
    /// Serial-only build.
    None,
}

pub const COMPILED_REMOTE: CompiledRemote = if cfg!(feature = "ble") {
    CompiledRemote::Ble
} else if cfg!(feature = "websocket") {
    CompiledRemote::WebSocket
} else {
    CompiledRemote::None
};

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
///
/// Used to validate WiFi credentials and BLE device names.
pub(crate) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

// ───────────────────────────────────────────────────────────────
// Persisted remote-mode preferences
// ───────────────────────────────────────────────────────────────

pub const PREFS_NAMESPACE: &str = "ossm";
pub const KEY_USE_WEBSOCKET: &str = "useWebsocket";
pub const KEY_USE_BLUETOOTH: &str = "useBluetooth";
pub const KEY_SSID: &str = "ssid";
pub const KEY_PASSWORD: &str = "password";
pub const KEY_BLE_NAME: &str = "bleName";

/// Which remote transport the stored preferences select.
///
/// `Bootstrap` is the first-boot state where both flags default to set; it
/// is never written by a reconfiguration, which always selects exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteSelection {
    None,
    Ble,
    WebSocket,
    Bootstrap,
}

impl RemoteSelection {
    pub fn from_flags(use_websocket: bool, use_bluetooth: bool) -> Self {
        match (use_websocket, use_bluetooth) {
            (true, true) => Self::Bootstrap,
            (true, false) => Self::WebSocket,
            (false, true) => Self::Ble,
            (false, false) => Self::None,
        }
    }

    /// `(useWebsocket, useBluetooth)`.
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::Bootstrap => (true, true),
            Self::WebSocket => (true, false),
            Self::Ble => (false, true),
            Self::None => (false, false),
        }
    }
}

/// Remote-mode preferences as stored in NVS.
#[derive(Clone, PartialEq, Eq)]
pub struct ModeConfig {
    pub remote: RemoteSelection,
    pub ble_name: String,
    pub wifi_ssid: String,
    pub wifi_password: String,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            remote: RemoteSelection::from_flags(AUTO_START_REMOTE, AUTO_START_REMOTE),
            ble_name: DEFAULT_BLE_NAME.to_owned(),
            wifi_ssid: DEFAULT_WIFI_SSID.to_owned(),
            wifi_password: DEFAULT_WIFI_PASSWORD.to_owned(),
        }
    }
}

impl core::fmt::Debug for ModeConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModeConfig")
            .field("remote", &self.remote)
            .field("ble_name", &self.ble_name)
            .field("wifi_ssid", &self.wifi_ssid)
            .field("wifi_password", &"<redacted>")
            .finish()
    }
}

impl ModeConfig {
    /// Load the preferences.  Missing keys take their defaults; unreadable
    /// keys are logged and also take their defaults, so boot never fails
    /// on a damaged store.
    pub fn load(store: &dyn StoragePort) -> Self {
        let defaults = Self::default();
        let (default_ws, default_bt) = defaults.remote.flags();

        let use_websocket = read_or(store, KEY_USE_WEBSOCKET, default_ws, |s, k| {
            s.read_bool(PREFS_NAMESPACE, k)
        });
        let use_bluetooth = read_or(store, KEY_USE_BLUETOOTH, default_bt, |s, k| {
            s.read_bool(PREFS_NAMESPACE, k)
        });

        Self {
            remote: RemoteSelection::from_flags(use_websocket, use_bluetooth),
            ble_name: read_or(store, KEY_BLE_NAME, defaults.ble_name, |s, k| {
                s.read_string(PREFS_NAMESPACE, k)
            }),
            wifi_ssid: read_or(store, KEY_SSID, defaults.wifi_ssid, |s, k| {
                s.read_string(PREFS_NAMESPACE, k)
            }),
            wifi_password: read_or(store, KEY_PASSWORD, defaults.wifi_password, |s, k| {
                s.read_string(PREFS_NAMESPACE, k)
            }),
        }
    }

    /// Copy of `self` with `remote` selected exclusively.
    pub fn with_remote(&self, remote: &RemoteConfig) -> Self {
        let mut next = self.clone();
        match remote {
            RemoteConfig::Ble { name } => {
                next.remote = RemoteSelection::Ble;
                next.ble_name.clone_from(name);
            }
            RemoteConfig::WebSocket { ssid, password } => {
                next.remote = RemoteSelection::WebSocket;
                next.wifi_ssid.clone_from(ssid);
                next.wifi_password.clone_from(password);
            }
        }
        next
    }

    /// Persist every key and commit.
    ///
    /// Flags being cleared are written before flags being set, so a write
    /// that fails part-way never leaves both flags set when they were not
    /// both set before.
    pub fn save(&self, store: &mut dyn StoragePort) -> Result<(), StorageError> {
        store.write_string(PREFS_NAMESPACE, KEY_BLE_NAME, &self.ble_name)?;
        store.write_string(PREFS_NAMESPACE, KEY_SSID, &self.wifi_ssid)?;
        store.write_string(PREFS_NAMESPACE, KEY_PASSWORD, &self.wifi_password)?;

        let (use_websocket, use_bluetooth) = self.remote.flags();
        let mut flags = [
            (KEY_USE_WEBSOCKET, use_websocket),
            (KEY_USE_BLUETOOTH, use_bluetooth),
        ];
        flags.sort_by_key(|&(_, set)| set);
        for (key, value) in flags {
            store.write_bool(PREFS_NAMESPACE, key, value)?;
        }

        store.commit()
    }
}

fn read_or<T>(
    store: &dyn StoragePort,
    key: &str,
    default: T,
    read: impl FnOnce(&dyn StoragePort, &str) -> Result<T, StorageError>,
) -> T {
    match read(store, key) {
        Ok(value) => value,
        Err(StorageError::NotFound) => default,
        Err(e) => {
            warn!("Prefs: {}::{} unreadable ({}), using default", PREFS_NAMESPACE, key, e);
            default
        }
    }
}
