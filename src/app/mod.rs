//! Application core: command dispatch and homing bookkeeping, zero I/O.
//!
//! This module contains the bridge's rules: how each inbound command maps
//! onto the motion controller, how homing attempts are tracked and
//! reported, and how a remote reconfiguration is persisted.  All
//! interaction with hardware and radios happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable on the host.

pub mod commands;
pub mod events;
pub mod homing;
pub mod ports;
pub mod service;
