//! Port traits: the hexagonal boundary between the bridge and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BridgeService (dispatcher)
//! ```
//!
//! Driven adapters (motion controller, persistent store, notification
//! fan-out, console, restart) implement these traits.  The
//! [`BridgeService`](super::service::BridgeService) consumes them via
//! generics, so the dispatcher never touches ESP-IDF directly.
//!
//! ## Contracts
//!
//! - **MotionPort** calls are fire-and-forget.  Only homing reports back,
//!   and it does so through a one-shot [`HomingCompletion`].
//! - **StoragePort** writes become durable at [`StoragePort::commit`].
//! - All port errors are typed: callers must handle every variant explicitly.

use core::time::Duration;

use super::events::Notification;
use super::homing::HomingCompletion;

// ───────────────────────────────────────────────────────────────
// Motion port (driven adapter: bridge → stroke engine)
// ───────────────────────────────────────────────────────────────

/// Command surface of the motion controller.
///
/// Lengths are millimetres, speeds are strokes per minute (or mm/s for the
/// positioning moves), sensation is `-100..=100`.  `apply_now` asks the
/// controller to apply the value to the running pattern immediately.
pub trait MotionPort {
    /// Queue a streaming waypoint.  `replace` discards queued waypoints first.
    fn append_to_streaming(&mut self, position: i32, time_ms: i32, replace: bool);

    /// Start executing queued streaming waypoints.
    fn start_streaming(&mut self);

    /// Release the motor.  Aborts any motion and any homing in flight.
    fn disable(&mut self);

    /// Begin endstop homing.  `done` is invoked exactly once unless the
    /// attempt is aborted by [`disable`](Self::disable).
    fn home_with_endstop(&mut self, done: HomingCompletion);

    /// Begin sensorless (current-sensing) homing at `speed`.
    fn home_sensorless(&mut self, speed: f32, done: HomingCompletion);

    /// Declare the current carriage position to be home.
    fn this_is_home(&mut self, speed: f32);

    /// Move to the fully extended position.
    fn move_to_max(&mut self, speed: f32);

    /// Move to the fully retracted position.
    fn move_to_min(&mut self, speed: f32);

    /// Stop the running pattern or stream, keeping the motor energised.
    fn stop_motion(&mut self);

    fn set_pattern(&mut self, index: i32, apply_now: bool);

    fn start_pattern(&mut self);

    fn set_speed(&mut self, speed: f32, apply_now: bool);

    fn set_stroke(&mut self, stroke_mm: f32, apply_now: bool);

    fn set_depth(&mut self, depth_mm: f32, apply_now: bool);

    fn set_sensation(&mut self, sensation: f32, apply_now: bool);

    /// Interactive depth setup at `speed`; `fancy` enables the guided mode.
    fn setup_depth(&mut self, speed: f32, fancy: bool);

    /// Current stroke length in millimetres.
    fn stroke(&self) -> f32;

    /// Maximum usable depth in millimetres.
    fn max_depth(&self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Notification port (driven adapter: bridge → remote/console)
// ───────────────────────────────────────────────────────────────

/// The dispatcher emits outbound [`Notification`]s through this port.
/// Adapters decide where they go (active remote transport, serial console).
pub trait NotificationSink {
    fn emit(&mut self, notification: &Notification);
}

/// Line-oriented serial console.  Always present, never fails.
pub trait ConsoleSink {
    fn write_line(&mut self, line: &str);
}

// ───────────────────────────────────────────────────────────────
// Restart port (driven adapter: bridge → SoC reset)
// ───────────────────────────────────────────────────────────────

/// Restarts the device after a settle delay so pending writes and the final
/// log lines drain.  On the device this does not return.
pub trait RestartPort {
    fn restart(&mut self, settle: Duration);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: bridge ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for the remote-mode preferences.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Writes are staged until [`commit`](Self::commit); the ESP-IDF NVS API
///   only guarantees durability after `nvs_commit`.
/// - Typed helpers have byte-level default implementations so simple
///   in-memory stores only implement the two primitives.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Flush staged writes to flash.
    fn commit(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Read a boolean stored as a single byte (`0` = false).
    fn read_bool(&self, namespace: &str, key: &str) -> Result<bool, StorageError> {
        let mut buf = [0u8; 1];
        match self.read(namespace, key, &mut buf)? {
            1 => Ok(buf[0] != 0),
            _ => Err(StorageError::InvalidData),
        }
    }

    fn write_bool(&mut self, namespace: &str, key: &str, value: bool) -> Result<(), StorageError> {
        self.write(namespace, key, &[u8::from(value)])
    }

    /// Read a UTF-8 string of at most [`MAX_STORED_STR_LEN`] bytes.
    fn read_string(&self, namespace: &str, key: &str) -> Result<String, StorageError> {
        let mut buf = [0u8; MAX_STORED_STR_LEN];
        let len = self.read(namespace, key, &mut buf)?;
        core::str::from_utf8(&buf[..len])
            .map(str::to_owned)
            .map_err(|_| StorageError::InvalidData)
    }

    fn write_string(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError> {
        if value.len() > MAX_STORED_STR_LEN {
            return Err(StorageError::Full);
        }
        self.write(namespace, key, value.as_bytes())
    }
}

/// Upper bound on a stored string value (WPA2 passphrases top out at 64).
pub const MAX_STORED_STR_LEN: usize = 96;

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full, or the value exceeds the slot size.
    Full,
    /// Generic I/O error.
    IoError,
    /// Stored bytes do not decode as the requested type.
    InvalidData,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::InvalidData => write!(f, "invalid stored data"),
        }
    }
}
