//! Notification fan-out tests: remote + serial mirror, disconnected peers,
//! and the full inbound → dispatcher → broadcaster path.

use std::sync::Arc;

use ossm_bridge::app::events::Notification;
use ossm_bridge::app::service::{BridgeService, Flow};
use ossm_bridge::config::{MachineLimits, ModeConfig};
use ossm_bridge::link::broadcast::Broadcaster;
use ossm_bridge::link::mailbox::{Mailbox, Source};
use ossm_bridge::link::transport::{ConnectionState, RemoteTransport, TransportKind};

use crate::mock_ports::{CaptureConsole, MemStore, MockMotion, RecordingRemote};

const HOME_OK: &str = r#"[{"action":"home","success":true}]"#;
const VERSION: &str = r#"[{"action":"version","api":"2.0","firmware":"2.0"}]"#;

#[test]
fn connected_remote_and_console_both_receive() {
    let (remote, log) = RecordingRemote::new(TransportKind::Ble);
    log.borrow_mut().connected = true;
    let console = CaptureConsole::default();
    let mut bc = Broadcaster::new(Some(Box::new(remote)), console.clone());

    let delivery = bc.broadcast(&Notification::Home { success: true });

    assert!(delivery.remote);
    assert_eq!(log.borrow().sent, vec![HOME_OK.to_owned()]);
    assert_eq!(*console.lines.borrow(), vec![HOME_OK.to_owned()]);
    assert_eq!(bc.sent(), 1);
}

#[test]
fn disconnected_remote_is_skipped_silently() {
    let (remote, log) = RecordingRemote::new(TransportKind::WebSocket);
    let console = CaptureConsole::default();
    let mut bc = Broadcaster::new(Some(Box::new(remote)), console.clone());

    let delivery = bc.broadcast(&Notification::version());

    assert!(!delivery.remote);
    assert!(log.borrow().sent.is_empty());
    assert_eq!(*console.lines.borrow(), vec![VERSION.to_owned()]);
    assert_eq!(bc.skipped(), 1);
}

#[test]
fn failed_send_is_not_retried() {
    let (remote, log) = RecordingRemote::new(TransportKind::Ble);
    {
        let mut log = log.borrow_mut();
        log.connected = true;
        log.fail_sends = true;
    }
    let console = CaptureConsole::default();
    let mut bc = Broadcaster::new(Some(Box::new(remote)), console.clone());

    bc.broadcast(&Notification::Home { success: false });
    log.borrow_mut().fail_sends = false;
    bc.poll();

    assert!(log.borrow().sent.is_empty());
    assert_eq!(console.lines.borrow().len(), 1);
}

#[test]
fn serial_only_mirrors_to_console() {
    let console = CaptureConsole::default();
    let mut bc = Broadcaster::new(None, console.clone());
    bc.broadcast(&Notification::version());
    assert_eq!(bc.connection(), ConnectionState::SERIAL_ONLY);
    assert_eq!(console.lines.borrow().len(), 1);
}

#[test]
fn connection_reflects_remote() {
    let (remote, log) = RecordingRemote::new(TransportKind::WebSocket);
    let bc = Broadcaster::new(Some(Box::new(remote)), CaptureConsole::default());
    assert_eq!(
        bc.connection(),
        ConnectionState {
            active: Some(TransportKind::WebSocket),
            peer_connected: false,
        }
    );
    log.borrow_mut().connected = true;
    assert!(bc.connection().peer_connected);
}

#[test]
fn shutdown_stops_remote() {
    let (remote, log) = RecordingRemote::new(TransportKind::Ble);
    let mut bc = Broadcaster::new(Some(Box::new(remote)), CaptureConsole::default());
    bc.shutdown();
    assert!(log.borrow().stopped);
}

#[test]
fn serial_version_request_reaches_connected_peer() {
    let mailbox = Mailbox::shared();
    let (mut remote, log) = RecordingRemote::new(TransportKind::Ble);
    remote.start(mailbox.clone()).unwrap();
    log.borrow_mut().connected = true;

    let console = CaptureConsole::default();
    let mut bc = Broadcaster::new(Some(Box::new(remote)), console.clone());
    let mut bridge = BridgeService::new(MachineLimits::default(), ModeConfig::default(), Arc::clone(&mailbox));
    let mut motion = MockMotion::new();
    let mut store = MemStore::new();

    assert!(mailbox.post_text(Source::Serial, r#"[{"action":"version"}]"#));
    while let Some(msg) = mailbox.take() {
        assert_eq!(bridge.handle(msg, &mut motion, &mut bc, &mut store), Flow::Continue);
    }

    assert_eq!(log.borrow().sent, vec![VERSION.to_owned()]);
    assert_eq!(*console.lines.borrow(), vec![VERSION.to_owned()]);
}

#[test]
fn homing_outcome_is_broadcast_from_the_loop() {
    let mailbox = Mailbox::shared();
    let (remote, log) = RecordingRemote::new(TransportKind::WebSocket);
    log.borrow_mut().connected = true;
    let console = CaptureConsole::default();
    let mut bc = Broadcaster::new(Some(Box::new(remote)), console.clone());
    let mut bridge = BridgeService::new(MachineLimits::default(), ModeConfig::default(), mailbox.clone());
    let mut motion = MockMotion::new();
    let mut store = MemStore::new();

    mailbox.post_text(
        Source::Remote(TransportKind::WebSocket),
        r#"[{"action":"home","type":"auto"}]"#,
    );
    for _ in 0..2 {
        while let Some(msg) = mailbox.take() {
            bridge.handle(msg, &mut motion, &mut bc, &mut store);
        }
        motion.finish_homing(true);
    }

    assert_eq!(log.borrow().sent, vec![HOME_OK.to_owned()]);
}
