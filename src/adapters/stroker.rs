//! Motion controller facade.
//!
//! Implements [`MotionPort`] as a parameter model of the stroke engine:
//! it holds depth, stroke, speed, sensation, pattern and the streaming
//! queue, clamps every value to the machine geometry the way the engine
//! does, and gates motion on the homed flag.  Motion-profile generation
//! itself is not modelled.
//!
//! ## Engine states
//!
//! ```text
//!   Undefined ──home ok──▶ Ready ──start_pattern──▶ Pattern
//!       ▲                   │  ▲                       │
//!       │                   │  └──────stop_motion──────┤
//!    disable                ├──start_streaming──▶ Streaming
//!       │                   └──setup_depth──────▶ SetupDepth
//!   (any state)
//! ```
//!
//! Homing runs asynchronously: the request parks its [`HomingCompletion`]
//! and [`StrokerFacade::poll`] reports the outcome a few polls later.
//! [`MotionPort::disable`] drops a parked completion unreported.

use heapless::Deque;
use log::{debug, info, warn};

use crate::app::homing::HomingCompletion;
use crate::app::ports::MotionPort;
use crate::config::{MAX_DEPTH_MM, MAX_SPEED_MM_S};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

/// Stroke rate bounds, strokes per minute.
pub const MIN_STROKE_RATE: f32 = 0.5;
pub const MAX_STROKE_RATE: f32 = 6000.0;

pub const SENSATION_LIMIT: f32 = 100.0;

/// Built-in patterns, indexed `0..PATTERN_COUNT`.
pub const PATTERN_NAMES: [&str; 7] = [
    "Simple Stroke",
    "Teasing or Pounding",
    "Robo Stroke",
    "Half'n'Half",
    "Deeper",
    "Stop'n'Go",
    "Insist",
];
pub const PATTERN_COUNT: usize = PATTERN_NAMES.len();

/// Waypoints the streaming queue holds before dropping new ones.
pub const STREAM_QUEUE_LEN: usize = 32;

/// Polls a homing run takes to report.
pub const HOMING_POLLS: u32 = 3;

// ───────────────────────────────────────────────────────────────
// Types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not homed, or disabled.
    Undefined,
    Ready,
    Pattern,
    Streaming,
    SetupDepth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingMethod {
    Endstop,
    Sensorless,
}

/// One streaming target: position on the `0..=100` scale, reached in `time_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waypoint {
    pub position: i32,
    pub time_ms: i32,
}

struct PendingHoming {
    method: HomingMethod,
    polls_left: u32,
    done: HomingCompletion,
}

// ───────────────────────────────────────────────────────────────
// Facade
// ───────────────────────────────────────────────────────────────

pub struct StrokerFacade {
    state: EngineState,
    homed: bool,
    max_depth: f32,
    depth: f32,
    stroke: f32,
    speed: f32,
    sensation: f32,
    pattern: usize,
    /// Carriage position in millimetres from home.
    position: f32,
    queue: Deque<Waypoint, STREAM_QUEUE_LEN>,
    pending: Option<PendingHoming>,
    homing_outcome: bool,
}

impl StrokerFacade {
    pub fn new(max_depth: f32) -> Self {
        let max_depth = if max_depth.is_finite() && max_depth > 0.0 {
            max_depth
        } else {
            warn!("Stroker: invalid max depth {}, using {}", max_depth, MAX_DEPTH_MM);
            MAX_DEPTH_MM
        };
        Self {
            state: EngineState::Undefined,
            homed: false,
            max_depth,
            depth: max_depth,
            stroke: max_depth / 3.0,
            speed: 20.0,
            sensation: 0.0,
            pattern: 0,
            position: 0.0,
            queue: Deque::new(),
            pending: None,
            homing_outcome: true,
        }
    }

    /// Advance asynchronous work: homing runs and the streaming queue.
    pub fn poll(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            pending.polls_left = pending.polls_left.saturating_sub(1);
            if pending.polls_left == 0 {
                if let Some(done) = self.pending.take() {
                    self.finish_homing(done);
                }
            }
        }

        if self.state == EngineState::Streaming {
            if let Some(wp) = self.queue.pop_front() {
                self.position = wp.position as f32 / 100.0 * self.max_depth;
                debug!("Stroker: streamed to {:.1} mm in {} ms", self.position, wp.time_ms);
            }
        }
    }

    fn finish_homing(&mut self, pending: PendingHoming) {
        let success = self.homing_outcome;
        if success {
            self.homed = true;
            self.position = 0.0;
            self.state = EngineState::Ready;
            info!("Stroker: {:?} homing found home", pending.method);
        } else {
            self.homed = false;
            self.state = EngineState::Undefined;
            warn!("Stroker: {:?} homing failed", pending.method);
        }
        pending.done.finish(success);
    }

    fn begin_homing(&mut self, method: HomingMethod, done: HomingCompletion) {
        if let Some(old) = self.pending.take() {
            debug!("Stroker: superseding homing attempt {}", old.done.attempt());
        }
        self.homed = false;
        self.state = EngineState::Undefined;
        self.pending = Some(PendingHoming {
            method,
            polls_left: HOMING_POLLS,
            done,
        });
    }

    fn require_homed(&self, what: &str) -> bool {
        if !self.homed {
            warn!("Stroker: {} ignored, machine not homed", what);
        }
        self.homed
    }

    fn clamp_move_speed(speed: f32) -> f32 {
        if speed.is_finite() {
            speed.clamp(0.0, MAX_SPEED_MM_S)
        } else {
            0.0
        }
    }

    // ── Introspection ─────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_homed(&self) -> bool {
        self.homed
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn sensation(&self) -> f32 {
        self.sensation
    }

    pub fn pattern(&self) -> usize {
        self.pattern
    }

    pub fn pattern_name(&self) -> &'static str {
        PATTERN_NAMES[self.pattern]
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn queued_waypoints(&self) -> usize {
        self.queue.len()
    }

    pub fn homing_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Outcome reported by subsequent homing runs.
    pub fn set_homing_outcome(&mut self, success: bool) {
        self.homing_outcome = success;
    }
}

// ───────────────────────────────────────────────────────────────
// MotionPort implementation
// ───────────────────────────────────────────────────────────────

impl MotionPort for StrokerFacade {
    fn append_to_streaming(&mut self, position: i32, time_ms: i32, replace: bool) {
        if replace {
            self.queue.clear();
        }
        let wp = Waypoint {
            position: position.clamp(0, 100),
            time_ms: time_ms.max(0),
        };
        if self.queue.push_back(wp).is_err() {
            warn!("Stroker: streaming queue full, waypoint dropped");
        }
    }

    fn start_streaming(&mut self) {
        if self.require_homed("startStreaming") {
            self.state = EngineState::Streaming;
        }
    }

    fn disable(&mut self) {
        if let Some(pending) = self.pending.take() {
            info!("Stroker: homing attempt {} aborted", pending.done.attempt());
        }
        self.queue.clear();
        self.homed = false;
        self.state = EngineState::Undefined;
    }

    fn home_with_endstop(&mut self, done: HomingCompletion) {
        self.begin_homing(HomingMethod::Endstop, done);
    }

    fn home_sensorless(&mut self, speed: f32, done: HomingCompletion) {
        debug!("Stroker: sensorless homing at {:.1} mm/s", Self::clamp_move_speed(speed));
        self.begin_homing(HomingMethod::Sensorless, done);
    }

    fn this_is_home(&mut self, speed: f32) {
        debug!("Stroker: home set here (speed {:.1})", speed);
        self.pending = None;
        self.homed = true;
        self.position = 0.0;
        self.state = EngineState::Ready;
    }

    fn move_to_max(&mut self, speed: f32) {
        if self.require_homed("moveToMax") {
            debug!("Stroker: to max at {:.1} mm/s", Self::clamp_move_speed(speed));
            self.position = self.max_depth;
            self.state = EngineState::Ready;
        }
    }

    fn move_to_min(&mut self, speed: f32) {
        if self.require_homed("moveToMin") {
            debug!("Stroker: to min at {:.1} mm/s", Self::clamp_move_speed(speed));
            self.position = 0.0;
            self.state = EngineState::Ready;
        }
    }

    fn stop_motion(&mut self) {
        if matches!(self.state, EngineState::Pattern | EngineState::Streaming | EngineState::SetupDepth) {
            self.state = EngineState::Ready;
        }
        self.queue.clear();
    }

    fn set_pattern(&mut self, index: i32, _apply_now: bool) {
        match usize::try_from(index) {
            Ok(i) if i < PATTERN_COUNT => {
                self.pattern = i;
                info!("Stroker: pattern {} ({})", i, PATTERN_NAMES[i]);
            }
            _ => warn!("Stroker: pattern {} out of range (0..{})", index, PATTERN_COUNT),
        }
    }

    fn start_pattern(&mut self) {
        if self.require_homed("startPattern") {
            self.state = EngineState::Pattern;
        }
    }

    fn set_speed(&mut self, speed: f32, _apply_now: bool) {
        self.speed = if speed.is_finite() {
            speed.clamp(MIN_STROKE_RATE, MAX_STROKE_RATE)
        } else {
            MIN_STROKE_RATE
        };
    }

    fn set_stroke(&mut self, stroke_mm: f32, _apply_now: bool) {
        self.stroke = if stroke_mm.is_finite() {
            stroke_mm.clamp(0.0, self.max_depth)
        } else {
            0.0
        };
    }

    fn set_depth(&mut self, depth_mm: f32, _apply_now: bool) {
        self.depth = if depth_mm.is_finite() {
            depth_mm.clamp(0.0, self.max_depth)
        } else {
            0.0
        };
    }

    fn set_sensation(&mut self, sensation: f32, _apply_now: bool) {
        self.sensation = if sensation.is_finite() {
            sensation.clamp(-SENSATION_LIMIT, SENSATION_LIMIT)
        } else {
            0.0
        };
    }

    fn setup_depth(&mut self, speed: f32, fancy: bool) {
        if self.require_homed("setupDepth") {
            debug!(
                "Stroker: depth setup at {:.1} mm/s (fancy={})",
                Self::clamp_move_speed(speed),
                fancy
            );
            self.position = self.depth;
            self.state = EngineState::SetupDepth;
        }
    }

    fn stroke(&self) -> f32 {
        self.stroke
    }

    fn max_depth(&self) -> f32 {
        self.max_depth
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
