//! Bridge service: the command dispatcher.
//!
//! [`BridgeService`] owns the bridge state (current speed percentage,
//! homing bookkeeping, the boot-time mode preferences).  It maps every
//! decoded [`Command`] onto the motion controller, persists remote
//! reconfigurations, and reports homing outcomes.  All I/O flows through
//! port traits injected at call sites, making the dispatcher testable with
//! mock adapters.
//!
//! ```text
//!  Mailbox ──▶ ┌─────────────────────────┐ ──▶ MotionPort
//!              │      BridgeService      │ ──▶ NotificationSink
//!              │  dispatch · homing      │ ──▶ StoragePort
//!              └─────────────────────────┘
//! ```
//!
//! Commands in a batch run strictly in order.  A reconfiguration that
//! persisted successfully ends the batch: the remaining commands are not
//! run because the device is about to restart.

use std::sync::Arc;

use core::time::Duration;

use log::{debug, error, info, warn};

use crate::config::{MachineLimits, ModeConfig, RESTART_SETTLE, RemoteSelection};
use crate::error::BridgeError;
use crate::link::codec;
use crate::link::mailbox::{BridgeMsg, Mailbox};

use super::commands::{Command, HomeKind, RemoteConfig};
use super::events::Notification;
use super::homing::{Completion, HomingCompletion, HomingPhase, HomingTracker};
use super::ports::{MotionPort, NotificationSink, StoragePort};

// ───────────────────────────────────────────────────────────────
// Outcome types
// ───────────────────────────────────────────────────────────────

/// What the control loop should do after handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The new remote selection is durable; restart to apply it.
    Restart(RestartRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartRequest {
    pub settle: Duration,
    pub selection: RemoteSelection,
}

// ───────────────────────────────────────────────────────────────
// BridgeState
// ───────────────────────────────────────────────────────────────

/// Mutable bridge state that outlives individual commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeState {
    /// Last requested speed, `0..=100`.  Starts at 0.
    speed_percent: f32,
}

impl BridgeState {
    pub fn speed_percent(&self) -> f32 {
        self.speed_percent
    }
}

/// Clamp a percentage to `0..=100`, logging when the input was out of range.
fn clamp_percent(field: &str, value: f32) -> f32 {
    clamp_logged(field, value, 0.0, 100.0)
}

fn clamp_logged(field: &str, value: f32, lo: f32, hi: f32) -> f32 {
    if value.is_nan() {
        debug!("{}: {} is NaN, using {}", BridgeError::OutOfRangeValue, field, lo);
        return lo;
    }
    if value < lo || value > hi {
        let clamped = value.clamp(lo, hi);
        debug!(
            "{}: {}={} clamped to {}",
            BridgeError::OutOfRangeValue,
            field,
            value,
            clamped
        );
        return clamped;
    }
    value
}

// ───────────────────────────────────────────────────────────────
// BridgeService
// ───────────────────────────────────────────────────────────────

pub struct BridgeService {
    state: BridgeState,
    homing: HomingTracker,
    limits: MachineLimits,
    /// Preferences as loaded at boot.  Never modified at runtime; a
    /// reconfiguration persists a new copy and restarts.
    mode: ModeConfig,
    mailbox: Arc<Mailbox>,
    handled: u32,
}

impl BridgeService {
    pub fn new(limits: MachineLimits, mode: ModeConfig, mailbox: Arc<Mailbox>) -> Self {
        Self {
            state: BridgeState { speed_percent: 0.0 },
            homing: HomingTracker::new(),
            limits,
            mode,
            mailbox,
            handled: 0,
        }
    }

    // ── Mailbox entry point ───────────────────────────────────

    /// Handle one mailbox item.
    pub fn handle(
        &mut self,
        msg: BridgeMsg,
        motion: &mut impl MotionPort,
        sink: &mut impl NotificationSink,
        store: &mut impl StoragePort,
    ) -> Flow {
        match msg {
            BridgeMsg::Inbound { source, text } => {
                debug!("Inbound from {:?}: {}", source, text);
                self.handle_text(&text, motion, sink, store)
            }
            BridgeMsg::HomingFinished { attempt, success } => {
                self.on_homing_finished(attempt, success, motion, sink);
                Flow::Continue
            }
        }
    }

    /// Decode a message and dispatch its commands in order.
    pub fn handle_text(
        &mut self,
        text: &str,
        motion: &mut impl MotionPort,
        sink: &mut impl NotificationSink,
        store: &mut impl StoragePort,
    ) -> Flow {
        let Ok(batch) = codec::decode(text) else {
            // Already logged by the codec.
            return Flow::Continue;
        };

        let total = batch.commands.len();
        for (idx, cmd) in batch.commands.into_iter().enumerate() {
            if let Flow::Restart(req) = self.handle_command(cmd, motion, sink, store) {
                let skipped = total - idx - 1;
                if skipped > 0 {
                    info!("Restart pending — {} remaining command(s) not run", skipped);
                }
                return Flow::Restart(req);
            }
        }
        Flow::Continue
    }

    // ── Command dispatch ──────────────────────────────────────

    /// Execute one command.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        motion: &mut impl MotionPort,
        sink: &mut impl NotificationSink,
        store: &mut impl StoragePort,
    ) -> Flow {
        info!("Action: {}", cmd.action());
        self.handled = self.handled.wrapping_add(1);

        match cmd {
            Command::Move {
                position,
                time_ms,
                replace,
            } => motion.append_to_streaming(position, time_ms, replace),
            Command::StartStreaming => motion.start_streaming(),
            Command::Home(kind) => self.home(kind, motion, sink),
            Command::ConfigureRemote(remote) => return self.configure_remote(&remote, store),
            Command::Stop => motion.stop_motion(),
            Command::SetPattern(index) => {
                motion.set_pattern(index, true);
                motion.start_pattern();
            }
            Command::SetSpeed(percent) => {
                self.state.speed_percent = clamp_percent("speed", percent);
                self.update_speed(motion);
            }
            Command::SetStroke(percent) => {
                let stroke = clamp_percent("stroke", percent) / 100.0 * motion.max_depth();
                motion.set_stroke(stroke, true);
                self.update_speed(motion);
            }
            Command::SetDepth(percent) => {
                let depth = clamp_percent("depth", percent) / 100.0 * motion.max_depth();
                motion.set_depth(depth, true);
            }
            Command::SetSensation(value) => {
                motion.set_sensation(clamp_logged("sensation", value, -100.0, 100.0), true);
            }
            Command::Setup { speed } => motion.setup_depth(self.move_speed(speed), true),
            Command::Retract { speed } => motion.move_to_min(self.move_speed(speed)),
            Command::Extend { speed } => motion.move_to_max(self.move_speed(speed)),
            Command::Connected | Command::Disable => self.disable(motion),
            Command::Version => sink.emit(&Notification::version()),
            Command::GetPatternList => debug!("getPatternList: no pattern catalogue to report"),
        }
        Flow::Continue
    }

    /// Map the speed percentage onto the stroke-rate range, compensating
    /// for stroke length so a shorter stroke does not run slower per mm.
    fn update_speed(&self, motion: &mut impl MotionPort) {
        let span = self.limits.speed_upper - self.limits.speed_lower;
        let base = self.state.speed_percent * span / 100.0 + self.limits.speed_lower;

        let stroke = motion.stroke();
        let max_depth = motion.max_depth();
        let ratio = if stroke > 0.0 && max_depth > 0.0 {
            stroke / max_depth
        } else {
            1.0
        };

        motion.set_speed(base / ratio, true);
    }

    fn move_speed(&self, requested: Option<f32>) -> f32 {
        match requested {
            Some(speed) if speed.is_finite() && speed > 0.0 => speed,
            Some(speed) => {
                debug!(
                    "{}: move speed {} replaced by default",
                    BridgeError::OutOfRangeValue,
                    speed
                );
                self.limits.default_move_speed
            }
            None => self.limits.default_move_speed,
        }
    }

    /// Disable the motor and abandon any homing attempt in flight.
    fn disable(&mut self, motion: &mut impl MotionPort) {
        if let Some(attempt) = self.homing.cancel() {
            info!("Homing attempt {} cancelled", attempt);
        }
        motion.disable();
    }

    // ── Homing ────────────────────────────────────────────────

    fn home(&mut self, kind: HomeKind, motion: &mut impl MotionPort, sink: &mut impl NotificationSink) {
        self.disable(motion);

        match kind {
            HomeKind::Auto => {
                let attempt = self.homing.begin(kind);
                info!("Homing attempt {} (endstop)", attempt);
                motion.home_with_endstop(HomingCompletion::new(attempt, self.mailbox.clone()));
            }
            HomeKind::Sensorless => {
                let attempt = self.homing.begin(kind);
                info!("Homing attempt {} (sensorless)", attempt);
                motion.home_sensorless(
                    self.limits.homing_speed,
                    HomingCompletion::new(attempt, self.mailbox.clone()),
                );
            }
            HomeKind::Manual => {
                let attempt = self.homing.begin(kind);
                motion.this_is_home(self.limits.homing_speed);
                self.on_homing_finished(attempt, true, motion, sink);
            }
            HomeKind::Unsupported => {
                warn!("home: unsupported type — motor left disabled");
            }
        }
    }

    /// Handle a homing completion report.
    pub fn on_homing_finished(
        &mut self,
        attempt: u32,
        success: bool,
        motion: &mut impl MotionPort,
        sink: &mut impl NotificationSink,
    ) {
        match self.homing.complete(attempt, success) {
            Completion::Succeeded => {
                info!("Found home - ready to rumble");
                motion.move_to_max(self.limits.homing_speed);
                self.homing.extend_issued();
                sink.emit(&Notification::Home { success: true });
            }
            Completion::Failed => {
                warn!("Homing attempt {} failed", attempt);
                sink.emit(&Notification::Home { success: false });
            }
            Completion::Stale => {
                warn!("Discarding stale homing report for attempt {}", attempt);
            }
        }
    }

    // ── Reconfiguration ───────────────────────────────────────

    fn configure_remote(&mut self, remote: &RemoteConfig, store: &mut impl StoragePort) -> Flow {
        if let Err(e) = remote.validate() {
            warn!("{}: rejected {:?} — keeping current transport", e, remote);
            return Flow::Continue;
        }

        let next = self.mode.with_remote(remote);
        match next.save(store) {
            Ok(()) => {
                info!("Remote set to {}; restarting to apply", remote.kind());
                Flow::Restart(RestartRequest {
                    settle: RESTART_SETTLE,
                    selection: next.remote,
                })
            }
            Err(e) => {
                error!(
                    "{}: {} — reconfiguration to {} aborted",
                    BridgeError::PersistenceFailure,
                    e,
                    remote.kind()
                );
                Flow::Continue
            }
        }
    }

    // ── Read-only accessors (for tests and status) ────────────

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn homing_phase(&self) -> HomingPhase {
        self.homing.phase()
    }

    pub fn mode(&self) -> &ModeConfig {
        &self.mode
    }

    /// Commands dispatched since boot.
    pub fn handled(&self) -> u32 {
        self.handled
    }
}
