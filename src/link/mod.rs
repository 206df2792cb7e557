//! Link layer: everything between a transport's bytes and the dispatcher.
//!
//! ```text
//!  Serial bytes ─▶ framing ─┐
//!  BLE write ───────────────┼─▶ mailbox ─▶ codec::decode ─▶ BridgeService
//!  WebSocket frame ─────────┘
//!
//!  BridgeService ─▶ Notification ─▶ broadcast ─▶ codec::encode ─▶ remote + serial
//! ```

pub mod broadcast;
pub mod codec;
pub mod framing;
pub mod mailbox;
pub mod mode;
pub mod transport;
