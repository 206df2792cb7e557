//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements       | Connects to                    |
//! |-------------|------------------|--------------------------------|
//! | `ble`       | RemoteTransport  | Bluedroid GATT server          |
//! | `websocket` | RemoteTransport  | ESP-IDF HTTP / WebSocket server|
//! | `wifi`      | —                | ESP-IDF WiFi STA               |
//! | `nvs`       | StoragePort      | NVS / in-memory store          |
//! | `serial`    | ConsoleSink      | UART0 (stdin / stdout)         |
//! | `stroker`   | MotionPort       | Stroke engine parameter model  |
//! | `system`    | RestartPort      | `esp_restart()`                |
//!
//! On the device only the remote family selected by the `ble` /
//! `websocket` feature is built; host builds carry both simulations.

#[cfg(any(feature = "ble", not(target_os = "espidf")))]
pub mod ble;
pub mod nvs;
pub mod serial;
pub mod stroker;
pub mod system;
#[cfg(any(feature = "websocket", not(target_os = "espidf")))]
pub mod websocket;
#[cfg(any(feature = "websocket", not(target_os = "espidf")))]
pub mod wifi;
