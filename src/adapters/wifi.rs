//! WiFi station for the WebSocket remote.
//!
//! The station joins the access point named by the stored preferences.
//! At boot [`WifiAdapter::connect_blocking`] makes a bounded number of
//! attempts, so bad credentials leave the bridge serial-only instead of
//! blocking the console.  Once up, [`WifiAdapter::poll`] notices a dropped
//! link and rejoins on a doubling delay:
//!
//! ```text
//!   Idle ──connect──▶ Joining ──ok──▶ Up ──link lost──▶ Retrying{0}
//!                        │                                  │  ▲
//!                        └──fail──▶ Retrying{0} ◀───────────┘  │ fail: delay ×2 (≤ 60 s)
//!                                        └──────────────────────┘
//! ```
//!
//! On the host the driver is replaced by a link flag and a failure counter.

use core::fmt;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::config::{MAX_PASSWORD_LEN, MAX_SSID_LEN, is_printable_ascii};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

/// Join attempts made at boot before the remote is abandoned.
pub const BOOT_CONNECT_ATTEMPTS: u32 = 10;
const BOOT_ATTEMPT_GAP: Duration = Duration::from_millis(500);

const FIRST_RETRY_DELAY: Duration = Duration::from_secs(2);
const LONGEST_RETRY_DELAY: Duration = Duration::from_secs(60);

/// WPA2 passphrases are 8..=63 characters, or 64 hex digits.
const MIN_PASSPHRASE_LEN: usize = 8;

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    /// No SSID has been stored yet.
    Unconfigured,
    BadSsid,
    BadPassphrase,
    /// The driver refused to start or the AP did not accept the station.
    JoinFailed,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "no network configured"),
            Self::BadSsid => write!(f, "SSID must be 1-{} printable ASCII bytes", MAX_SSID_LEN),
            Self::BadPassphrase => write!(
                f,
                "passphrase must be empty (open network) or {}-{} bytes",
                MIN_PASSPHRASE_LEN, MAX_PASSWORD_LEN
            ),
            Self::JoinFailed => write!(f, "could not join the access point"),
        }
    }
}

impl std::error::Error for WifiError {}

// ── Credentials ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct Credentials {
    ssid: heapless::String<MAX_SSID_LEN>,
    passphrase: heapless::String<MAX_PASSWORD_LEN>,
}

impl Credentials {
    fn parse(ssid: &str, passphrase: &str) -> Result<Self, WifiError> {
        if ssid.is_empty() || !is_printable_ascii(ssid) {
            return Err(WifiError::BadSsid);
        }
        if !passphrase.is_empty() && passphrase.len() < MIN_PASSPHRASE_LEN {
            return Err(WifiError::BadPassphrase);
        }
        Ok(Self {
            ssid: ssid.try_into().map_err(|_| WifiError::BadSsid)?,
            passphrase: passphrase.try_into().map_err(|_| WifiError::BadPassphrase)?,
        })
    }

    fn is_open(&self) -> bool {
        self.passphrase.is_empty()
    }
}

// ── Retry schedule ────────────────────────────────────────────

#[derive(Debug)]
struct Backoff {
    delay: Duration,
    due: Option<Instant>,
}

impl Backoff {
    fn new() -> Self {
        Self {
            delay: FIRST_RETRY_DELAY,
            due: None,
        }
    }

    /// Schedule the next attempt one delay from now.
    fn arm(&mut self) {
        self.due = Some(Instant::now() + self.delay);
    }

    fn grow(&mut self) {
        self.delay = (self.delay * 2).min(LONGEST_RETRY_DELAY);
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn ready(&self) -> bool {
        self.due.is_none_or(|at| Instant::now() >= at)
    }
}

// ── Station ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationState {
    Idle,
    Joining,
    Up,
    Retrying { attempt: u32 },
    /// Boot attempts exhausted; nothing further is tried this boot.
    GaveUp,
}

pub struct WifiAdapter {
    state: StationState,
    credentials: Option<Credentials>,
    backoff: Backoff,
    #[cfg(target_os = "espidf")]
    driver: BlockingWifi<EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim_refusals: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_link: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> anyhow::Result<Self> {
        let wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        Ok(Self {
            state: StationState::Idle,
            credentials: None,
            backoff: Backoff::new(),
            driver: BlockingWifi::wrap(wifi, sysloop)?,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: StationState::Idle,
            credentials: None,
            backoff: Backoff::new(),
            sim_refusals: 0,
            sim_link: false,
        }
    }

    pub fn state(&self) -> StationState {
        self.state
    }

    /// Configured network name, empty before [`set_credentials`](Self::set_credentials).
    pub fn ssid(&self) -> &str {
        self.credentials.as_ref().map_or("", |c| c.ssid.as_str())
    }

    pub fn set_credentials(&mut self, ssid: &str, passphrase: &str) -> Result<(), WifiError> {
        let credentials = Credentials::parse(ssid, passphrase)?;
        info!("WiFi: network set to '{}'", credentials.ssid);
        self.credentials = Some(credentials);
        Ok(())
    }

    /// One join attempt.  A failure leaves the station retrying from
    /// [`poll`](Self::poll).
    pub fn connect(&mut self) -> Result<(), WifiError> {
        let Some(credentials) = self.credentials.clone() else {
            return Err(WifiError::Unconfigured);
        };
        if self.state == StationState::Up {
            return Ok(());
        }

        info!("WiFi: joining '{}'", credentials.ssid);
        self.state = StationState::Joining;
        match self.platform_join(&credentials) {
            Ok(()) => {
                self.mark_up();
                Ok(())
            }
            Err(e) => {
                warn!("WiFi: join failed: {}", e);
                self.state = StationState::Retrying { attempt: 0 };
                self.backoff.arm();
                Err(e)
            }
        }
    }

    /// Boot-time join: up to `attempts` tries, a short gap apart.
    pub fn connect_blocking(&mut self, attempts: u32) -> Result<(), WifiError> {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            match self.connect() {
                Ok(()) => return Ok(()),
                Err(WifiError::JoinFailed) if attempt < attempts => {
                    warn!("WiFi: boot attempt {}/{} failed", attempt, attempts);
                    std::thread::sleep(BOOT_ATTEMPT_GAP);
                }
                Err(e) => {
                    self.state = StationState::GaveUp;
                    return Err(e);
                }
            }
        }
        self.state = StationState::GaveUp;
        Err(WifiError::JoinFailed)
    }

    pub fn disconnect(&mut self) {
        self.platform_leave();
        self.state = StationState::Idle;
        self.backoff.reset();
        info!("WiFi: left network");
    }

    pub fn is_connected(&self) -> bool {
        self.state == StationState::Up && self.platform_link_up()
    }

    /// Link supervision, called from the control loop.
    pub fn poll(&mut self) {
        match self.state {
            StationState::Up if !self.platform_link_up() => {
                warn!("WiFi: link lost");
                self.state = StationState::Retrying { attempt: 0 };
                self.backoff.due = None;
            }
            StationState::Retrying { attempt } if self.backoff.ready() => {
                let Some(credentials) = self.credentials.clone() else {
                    return;
                };
                info!("WiFi: rejoin attempt {} after {:?}", attempt + 1, self.backoff.delay);
                if self.platform_join(&credentials).is_ok() {
                    self.mark_up();
                } else {
                    self.backoff.grow();
                    self.backoff.arm();
                    self.state = StationState::Retrying { attempt: attempt + 1 };
                }
            }
            _ => {}
        }
    }

    fn mark_up(&mut self) {
        self.state = StationState::Up;
        self.backoff.reset();
        info!("WiFi: up on '{}'", self.ssid());
    }

    /// Simulation: refuse the next `n` join attempts.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_refuse_next(&mut self, n: u32) {
        self.sim_refusals = n;
    }

    /// Simulation: the access point drops the station.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim_link = false;
    }

    /// Simulation: let the pending retry fire on the next poll.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_skip_delay(&mut self) {
        self.backoff.due = None;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_join(&mut self, credentials: &Credentials) -> Result<(), WifiError> {
        let config = Configuration::Client(ClientConfiguration {
            ssid: credentials.ssid.as_str().try_into().map_err(|_| WifiError::BadSsid)?,
            password: credentials
                .passphrase
                .as_str()
                .try_into()
                .map_err(|_| WifiError::BadPassphrase)?,
            auth_method: if credentials.is_open() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });

        let driver = &mut self.driver;
        let joined = driver
            .set_configuration(&config)
            .and_then(|()| {
                if driver.is_started()? {
                    Ok(())
                } else {
                    driver.start()
                }
            })
            .and_then(|()| driver.connect())
            .and_then(|()| driver.wait_netif_up());
        if let Err(e) = joined {
            warn!("WiFi(espidf): {}", e);
            return Err(WifiError::JoinFailed);
        }

        if let Ok(ip) = self.driver.wifi().sta_netif().get_ip_info() {
            info!("WiFi(espidf): address {}", ip.ip);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_join(&mut self, credentials: &Credentials) -> Result<(), WifiError> {
        if self.sim_refusals > 0 {
            self.sim_refusals -= 1;
            return Err(WifiError::JoinFailed);
        }
        info!(
            "WiFi(sim): joined '{}' ({})",
            credentials.ssid,
            if credentials.is_open() { "open" } else { "WPA2" }
        );
        self.sim_link = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_leave(&mut self) {
        if let Err(e) = self.driver.disconnect().and_then(|()| self.driver.stop()) {
            warn!("WiFi(espidf): shutdown: {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_leave(&mut self) {
        self.sim_link = false;
    }

    #[cfg(target_os = "espidf")]
    fn platform_link_up(&self) -> bool {
        self.driver.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_link_up(&self) -> bool {
        self.sim_link
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}
