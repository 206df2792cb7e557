//! JSON command codec.
//!
//! Wire format (every transport, both directions):
//! ```text
//! [ {"action":"<name>", ...fields}, {"action":"<name>", ...}, ... ]
//! ```
//!
//! A message is a batch.  Decoding is two-level: the envelope must be a
//! JSON array of objects or the whole batch is rejected; each element is
//! then decoded on its own, and an element that does not decode is dropped
//! without affecting its neighbours.  The codec checks shape and types
//! only; numeric ranges are the dispatcher's business.

use log::{debug, error, warn};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::app::commands::{Command, HomeKind, RemoteConfig};
use crate::app::events::Notification;
use crate::error::BridgeError;

/// Commands decoded from one inbound message, in arrival order.
#[derive(Debug, Default, PartialEq)]
pub struct Batch {
    pub commands: Vec<Command>,
    /// Elements dropped as [`BridgeError::UnknownAction`].
    pub dropped: usize,
}

/// Decode one inbound message.
pub fn decode(text: &str) -> Result<Batch, BridgeError> {
    let elements = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(elements)) => elements,
        Ok(_) => {
            warn!("{}: top level is not an array", BridgeError::MalformedInput);
            return Err(BridgeError::MalformedInput);
        }
        Err(e) => {
            warn!("{}: {}", BridgeError::MalformedInput, e);
            return Err(BridgeError::MalformedInput);
        }
    };

    if let Some(idx) = elements.iter().position(|e| !e.is_object()) {
        warn!("{}: element {} is not an object", BridgeError::MalformedInput, idx);
        return Err(BridgeError::MalformedInput);
    }

    let mut batch = Batch {
        commands: Vec::with_capacity(elements.len()),
        dropped: 0,
    };

    for (idx, element) in elements.into_iter().enumerate() {
        let action = element
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or("<none>")
            .to_owned();

        match serde_json::from_value::<WireCommand>(element) {
            Ok(WireCommand::Unknown) => {
                debug!("Ignoring unknown action '{}' (element {})", action, idx);
                batch.dropped += 1;
            }
            Ok(wire) => batch.commands.push(wire.into()),
            Err(e) => {
                warn!("{}: '{}' element {} ({})", BridgeError::UnknownAction, action, idx, e);
                batch.dropped += 1;
            }
        }
    }

    Ok(batch)
}

/// Encode a notification as a single-element batch.
pub fn encode(notification: &Notification) -> String {
    match serde_json::to_string(core::slice::from_ref(notification)) {
        Ok(text) => text,
        Err(e) => {
            error!("Notification encode failed: {}", e);
            String::from("[]")
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Wire representation
// ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum WireCommand {
    Move {
        position: WireInt,
        time: WireInt,
        #[serde(default)]
        replace: bool,
    },
    StartStreaming,
    Home {
        #[serde(rename = "type", default)]
        kind: Option<Value>,
    },
    ConfigureWebsocket {
        ssid: String,
        password: String,
    },
    ConfigureBluetooth {
        name: String,
    },
    Stop,
    SetPattern {
        pattern: WireInt,
    },
    SetSpeed {
        speed: f32,
    },
    SetStroke {
        stroke: f32,
    },
    SetDepth {
        depth: f32,
    },
    SetSensation {
        sensation: f32,
    },
    Setup {
        #[serde(default)]
        speed: Option<f32>,
    },
    Retract {
        #[serde(default)]
        speed: Option<f32>,
    },
    Extend {
        #[serde(default)]
        speed: Option<f32>,
    },
    Connected,
    Disable,
    Version,
    GetPatternList,
    #[serde(other)]
    Unknown,
}

/// Integer field that also accepts JSON floats, truncating toward zero and
/// saturating at the `i32` bounds.
struct WireInt(i32);

impl<'de> Deserialize<'de> for WireInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Self(value as i32))
    }
}

fn home_kind(kind: Option<&Value>) -> HomeKind {
    match kind.and_then(Value::as_str) {
        Some("auto") => HomeKind::Auto,
        Some("manual") => HomeKind::Manual,
        Some("sensorless") => HomeKind::Sensorless,
        _ => HomeKind::Unsupported,
    }
}

impl From<WireCommand> for Command {
    fn from(wire: WireCommand) -> Self {
        match wire {
            WireCommand::Move {
                position,
                time,
                replace,
            } => Self::Move {
                position: position.0,
                time_ms: time.0,
                replace,
            },
            WireCommand::StartStreaming => Self::StartStreaming,
            WireCommand::Home { kind } => Self::Home(home_kind(kind.as_ref())),
            WireCommand::ConfigureWebsocket { ssid, password } => {
                Self::ConfigureRemote(RemoteConfig::WebSocket { ssid, password })
            }
            WireCommand::ConfigureBluetooth { name } => {
                Self::ConfigureRemote(RemoteConfig::Ble { name })
            }
            WireCommand::Stop => Self::Stop,
            WireCommand::SetPattern { pattern } => Self::SetPattern(pattern.0),
            WireCommand::SetSpeed { speed } => Self::SetSpeed(speed),
            WireCommand::SetStroke { stroke } => Self::SetStroke(stroke),
            WireCommand::SetDepth { depth } => Self::SetDepth(depth),
            WireCommand::SetSensation { sensation } => Self::SetSensation(sensation),
            WireCommand::Setup { speed } => Self::Setup { speed },
            WireCommand::Retract { speed } => Self::Retract { speed },
            WireCommand::Extend { speed } => Self::Extend { speed },
            WireCommand::Connected => Self::Connected,
            WireCommand::Disable => Self::Disable,
            WireCommand::Version => Self::Version,
            // Unknown is filtered out by `decode` before conversion.
            WireCommand::GetPatternList | WireCommand::Unknown => Self::GetPatternList,
        }
    }
}
