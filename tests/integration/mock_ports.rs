//! Mock port adapters for integration tests.
//!
//! Records every motion-controller call and every outbound message so tests
//! can assert on the full history without a radio stack or a stepper.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use ossm_bridge::app::events::Notification;
use ossm_bridge::app::homing::HomingCompletion;
use ossm_bridge::app::ports::{ConsoleSink, MotionPort, NotificationSink, StorageError, StoragePort};
use ossm_bridge::app::service::BridgeService;
use ossm_bridge::config::{MachineLimits, ModeConfig};
use ossm_bridge::link::mailbox::Mailbox;
use ossm_bridge::link::transport::{RemoteTransport, TransportError, TransportKind};

// ── Motion call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum MotionCall {
    Append { position: i32, time_ms: i32, replace: bool },
    StartStreaming,
    Disable,
    HomeEndstop { attempt: u32 },
    HomeSensorless { speed: f32, attempt: u32 },
    ThisIsHome(f32),
    MoveToMax(f32),
    MoveToMin(f32),
    StopMotion,
    SetPattern(i32),
    StartPattern,
    SetSpeed(f32),
    SetStroke(f32),
    SetDepth(f32),
    SetSensation(f32),
    SetupDepth(f32),
}

// ── MockMotion ────────────────────────────────────────────────

pub struct MockMotion {
    pub calls: Vec<MotionCall>,
    /// Completion handles of homing runs still in progress.
    pub pending: Vec<HomingCompletion>,
    pub stroke: f32,
    pub max_depth: f32,
}

#[allow(dead_code)]
impl MockMotion {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            pending: Vec::new(),
            stroke: 30.0,
            max_depth: 90.0,
        }
    }

    pub fn last_call(&self) -> Option<&MotionCall> {
        self.calls.last()
    }

    /// Finish the most recent homing run still in progress.
    pub fn finish_homing(&mut self, success: bool) {
        if let Some(done) = self.pending.pop() {
            done.finish(success);
        }
    }

    pub fn speeds(&self) -> Vec<f32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                MotionCall::SetSpeed(s) => Some(*s),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockMotion {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionPort for MockMotion {
    fn append_to_streaming(&mut self, position: i32, time_ms: i32, replace: bool) {
        self.calls.push(MotionCall::Append {
            position,
            time_ms,
            replace,
        });
    }

    fn start_streaming(&mut self) {
        self.calls.push(MotionCall::StartStreaming);
    }

    fn disable(&mut self) {
        self.pending.clear();
        self.calls.push(MotionCall::Disable);
    }

    fn home_with_endstop(&mut self, done: HomingCompletion) {
        self.calls.push(MotionCall::HomeEndstop {
            attempt: done.attempt(),
        });
        self.pending.push(done);
    }

    fn home_sensorless(&mut self, speed: f32, done: HomingCompletion) {
        self.calls.push(MotionCall::HomeSensorless {
            speed,
            attempt: done.attempt(),
        });
        self.pending.push(done);
    }

    fn this_is_home(&mut self, speed: f32) {
        self.calls.push(MotionCall::ThisIsHome(speed));
    }

    fn move_to_max(&mut self, speed: f32) {
        self.calls.push(MotionCall::MoveToMax(speed));
    }

    fn move_to_min(&mut self, speed: f32) {
        self.calls.push(MotionCall::MoveToMin(speed));
    }

    fn stop_motion(&mut self) {
        self.calls.push(MotionCall::StopMotion);
    }

    fn set_pattern(&mut self, index: i32, _apply_now: bool) {
        self.calls.push(MotionCall::SetPattern(index));
    }

    fn start_pattern(&mut self) {
        self.calls.push(MotionCall::StartPattern);
    }

    fn set_speed(&mut self, speed: f32, _apply_now: bool) {
        self.calls.push(MotionCall::SetSpeed(speed));
    }

    fn set_stroke(&mut self, stroke_mm: f32, _apply_now: bool) {
        self.stroke = stroke_mm;
        self.calls.push(MotionCall::SetStroke(stroke_mm));
    }

    fn set_depth(&mut self, depth_mm: f32, _apply_now: bool) {
        self.calls.push(MotionCall::SetDepth(depth_mm));
    }

    fn set_sensation(&mut self, sensation: f32, _apply_now: bool) {
        self.calls.push(MotionCall::SetSensation(sensation));
    }

    fn setup_depth(&mut self, speed: f32, _fancy: bool) {
        self.calls.push(MotionCall::SetupDepth(speed));
    }

    fn stroke(&self) -> f32 {
        self.stroke
    }

    fn max_depth(&self) -> f32 {
        self.max_depth
    }
}

// ── MemStore ──────────────────────────────────────────────────

/// In-memory [`StoragePort`] with an injectable write failure.
pub struct MemStore {
    pub entries: HashMap<String, Vec<u8>>,
    /// Fail every write after this many have succeeded.
    pub fail_after: Option<usize>,
    pub writes: usize,
    pub commits: u32,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            fail_after: None,
            writes: 0,
            commits: 0,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_after: Some(0),
            ..Self::new()
        }
    }

    fn key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.entries
            .get(&Self::key("ossm", key))
            .and_then(|v| v.first())
            .map(|&b| b != 0)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.entries
            .get(&Self::key("ossm", key))
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoragePort for MemStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let value = self
            .entries
            .get(&Self::key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        if value.len() > buf.len() {
            return Err(StorageError::Full);
        }
        buf[..value.len()].copy_from_slice(value);
        Ok(value.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_after.is_some_and(|n| self.writes >= n) {
            return Err(StorageError::IoError);
        }
        self.writes += 1;
        self.entries.insert(Self::key(namespace, key), data.to_vec());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.commits += 1;
        Ok(())
    }
}

// ── CollectSink ───────────────────────────────────────────────

#[derive(Default)]
pub struct CollectSink {
    pub notifications: Vec<Notification>,
}

impl NotificationSink for CollectSink {
    fn emit(&mut self, notification: &Notification) {
        self.notifications.push(notification.clone());
    }
}

// ── RecordingRemote ───────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RemoteLog {
    pub connected: bool,
    pub fail_sends: bool,
    pub sent: Vec<String>,
    pub started: bool,
    pub stopped: bool,
    pub polls: u32,
}

/// Remote transport whose state the test keeps a handle to after the
/// broadcaster takes ownership.
pub struct RecordingRemote {
    pub kind: TransportKind,
    pub log: Rc<RefCell<RemoteLog>>,
}

#[allow(dead_code)]
impl RecordingRemote {
    pub fn new(kind: TransportKind) -> (Self, Rc<RefCell<RemoteLog>>) {
        let log = Rc::new(RefCell::new(RemoteLog::default()));
        (
            Self {
                kind,
                log: log.clone(),
            },
            log,
        )
    }
}

impl RemoteTransport for RecordingRemote {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn start(&mut self, _inbound: Arc<Mailbox>) -> Result<(), TransportError> {
        self.log.borrow_mut().started = true;
        Ok(())
    }

    fn stop(&mut self) {
        let mut log = self.log.borrow_mut();
        log.stopped = true;
        log.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.log.borrow().connected
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        let mut log = self.log.borrow_mut();
        if !log.connected {
            return Err(TransportError::NotConnected);
        }
        if log.fail_sends {
            return Err(TransportError::SendFailed);
        }
        log.sent.push(text.to_owned());
        Ok(())
    }

    fn poll(&mut self) {
        self.log.borrow_mut().polls += 1;
    }
}

// ── CaptureConsole ────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct CaptureConsole {
    pub lines: Rc<RefCell<Vec<String>>>,
}

impl ConsoleSink for CaptureConsole {
    fn write_line(&mut self, line: &str) {
        self.lines.borrow_mut().push(line.to_owned());
    }
}

// ── Fixture ───────────────────────────────────────────────────

pub struct Bench {
    pub bridge: BridgeService,
    pub motion: MockMotion,
    pub sink: CollectSink,
    pub store: MemStore,
    pub mailbox: Arc<Mailbox>,
}

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        Self::with_mode(ModeConfig::default())
    }

    pub fn with_mode(mode: ModeConfig) -> Self {
        let mailbox = Mailbox::shared();
        Self {
            bridge: BridgeService::new(MachineLimits::default(), mode, mailbox.clone()),
            motion: MockMotion::new(),
            sink: CollectSink::default(),
            store: MemStore::new(),
            mailbox,
        }
    }

    pub fn send(&mut self, text: &str) -> ossm_bridge::app::service::Flow {
        self.bridge
            .handle_text(text, &mut self.motion, &mut self.sink, &mut self.store)
    }

    /// Drain the mailbox the way the control loop does.
    pub fn run_loop(&mut self) {
        while let Some(msg) = self.mailbox.take() {
            self.bridge
                .handle(msg, &mut self.motion, &mut self.sink, &mut self.store);
        }
    }
}
