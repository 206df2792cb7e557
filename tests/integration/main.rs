//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host (x86_64) with no
//! radio stack or stepper required.

mod broadcast_tests;
mod dispatcher_tests;
mod homing_tests;
mod mock_ports;
mod reconfigure_tests;
