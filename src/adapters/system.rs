//! SoC restart adapter.
//!
//! On the device [`SystemRestart::restart`] waits out the settle delay so
//! NVS commits and the final log lines drain, then calls `esp_restart()`,
//! which does not return.  On the host it records the request so tests and
//! the simulated control loop can observe it.

use core::time::Duration;

use log::info;

use crate::app::ports::RestartPort;

pub struct SystemRestart {
    #[cfg(not(target_os = "espidf"))]
    requested: Option<Duration>,
}

impl SystemRestart {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            requested: None,
        }
    }

    /// Settle delay of the last restart request.
    #[cfg(not(target_os = "espidf"))]
    pub fn requested(&self) -> Option<Duration> {
        self.requested
    }
}

impl Default for SystemRestart {
    fn default() -> Self {
        Self::new()
    }
}

impl RestartPort for SystemRestart {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self, settle: Duration) {
        info!("Restarting in {} ms", settle.as_millis());
        std::thread::sleep(settle);
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self, settle: Duration) {
        info!("Restart requested (settle {} ms)", settle.as_millis());
        self.requested = Some(settle);
    }
}
