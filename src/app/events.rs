//! Outbound notifications.
//!
//! The [`BridgeService`](super::service::BridgeService) emits these through
//! the [`NotificationSink`](super::ports::NotificationSink) port.  Each one
//! goes out as a single-element JSON array so peers parse outbound and
//! inbound traffic with the same code:
//!
//! ```text
//! [{"action":"home","success":true}]
//! [{"action":"version","api":"2.0","firmware":"2.0"}]
//! ```

use serde::Serialize;

use crate::config::{API_VERSION, FIRMWARE_VERSION};

/// Structured notifications emitted by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Notification {
    /// Outcome of a homing attempt.
    Home { success: bool },

    /// Reply to a `version` command.
    Version {
        api: &'static str,
        firmware: &'static str,
    },
}

impl Notification {
    pub fn version() -> Self {
        Self::Version {
            api: API_VERSION,
            firmware: FIRMWARE_VERSION,
        }
    }
}
