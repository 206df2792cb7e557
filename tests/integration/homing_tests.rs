//! Homing integration tests: asynchronous completion through the mailbox,
//! auto-extend, failure reporting and stale-report rejection.

use ossm_bridge::app::commands::HomeKind;
use ossm_bridge::app::events::Notification;
use ossm_bridge::app::homing::HomingPhase;
use ossm_bridge::config::HOMING_SPEED;
use ossm_bridge::link::mailbox::{MAILBOX_DEPTH, Source};

use crate::mock_ports::{Bench, MotionCall};

fn extends(b: &Bench) -> usize {
    b.motion
        .calls
        .iter()
        .filter(|c| **c == MotionCall::MoveToMax(HOMING_SPEED))
        .count()
}

#[test]
fn auto_home_success_extends_and_notifies() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"home","type":"auto"}]"#);
    assert_eq!(
        b.motion.calls,
        vec![MotionCall::Disable, MotionCall::HomeEndstop { attempt: 1 }]
    );
    assert_eq!(
        b.bridge.homing_phase(),
        HomingPhase::Homing { kind: HomeKind::Auto, attempt: 1 }
    );
    // The dispatcher does not wait for homing.
    assert!(b.sink.notifications.is_empty());

    b.motion.finish_homing(true);
    b.run_loop();

    assert_eq!(b.motion.last_call(), Some(&MotionCall::MoveToMax(HOMING_SPEED)));
    assert_eq!(extends(&b), 1);
    assert_eq!(b.sink.notifications, vec![Notification::Home { success: true }]);
    assert_eq!(b.bridge.homing_phase(), HomingPhase::Idle);
}

#[test]
fn duplicate_report_extends_once() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"home","type":"auto"}]"#);
    b.motion.finish_homing(true);
    b.mailbox.complete_homing(1, true);
    b.run_loop();

    b.mailbox.complete_homing(1, true);
    b.run_loop();

    assert_eq!(extends(&b), 1);
    assert_eq!(b.sink.notifications, vec![Notification::Home { success: true }]);
}

#[test]
fn completion_survives_a_command_burst() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"home","type":"auto"}]"#);
    for _ in 0..MAILBOX_DEPTH {
        assert!(b.mailbox.post_text(Source::Serial, r#"[{"action":"setSpeed","speed":20}]"#));
    }
    b.motion.finish_homing(true);
    b.run_loop();

    assert_eq!(b.sink.notifications, vec![Notification::Home { success: true }]);
    assert_eq!(extends(&b), 1);
    assert_eq!(b.bridge.homing_phase(), HomingPhase::Idle);
    assert_eq!(b.motion.speeds().len(), MAILBOX_DEPTH);
}

#[test]
fn failed_home_notifies_without_motion() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"home","type":"sensorless"}]"#);
    assert_eq!(
        b.motion.last_call(),
        Some(&MotionCall::HomeSensorless { speed: HOMING_SPEED, attempt: 1 })
    );
    let calls_before = b.motion.calls.len();

    b.motion.finish_homing(false);
    b.run_loop();

    assert_eq!(b.motion.calls.len(), calls_before);
    assert_eq!(b.sink.notifications, vec![Notification::Home { success: false }]);
}

#[test]
fn manual_home_completes_synchronously() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"home","type":"manual"}]"#);
    assert_eq!(
        b.motion.calls,
        vec![
            MotionCall::Disable,
            MotionCall::ThisIsHome(HOMING_SPEED),
            MotionCall::MoveToMax(HOMING_SPEED),
        ]
    );
    assert_eq!(b.sink.notifications, vec![Notification::Home { success: true }]);
    assert!(b.mailbox.is_empty());
}

#[test]
fn unsupported_type_only_disables() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"home","type":"spiral"},{"action":"home"}]"#);
    assert_eq!(b.motion.calls, vec![MotionCall::Disable, MotionCall::Disable]);
    assert!(b.sink.notifications.is_empty());
    assert_eq!(b.bridge.homing_phase(), HomingPhase::Idle);
}

#[test]
fn second_home_supersedes_the_first() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"home","type":"auto"}]"#);
    let first = b.motion.pending.pop().unwrap();
    b.send(r#"[{"action":"home","type":"auto"}]"#);

    // The first controller run reports late.
    first.finish(true);
    b.run_loop();
    assert!(b.sink.notifications.is_empty());
    assert!(!b.motion.calls.contains(&MotionCall::MoveToMax(HOMING_SPEED)));

    b.motion.finish_homing(true);
    b.run_loop();
    assert_eq!(b.sink.notifications, vec![Notification::Home { success: true }]);
}

#[test]
fn disable_cancels_homing_in_flight() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"home","type":"auto"}]"#);
    let run = b.motion.pending.pop().unwrap();
    b.send(r#"[{"action":"disable"}]"#);
    assert_eq!(b.bridge.homing_phase(), HomingPhase::Idle);

    run.finish(true);
    b.run_loop();
    assert!(b.sink.notifications.is_empty());
    assert_eq!(b.motion.last_call(), Some(&MotionCall::Disable));
}

#[test]
fn stop_leaves_homing_running() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"home","type":"auto"},{"action":"stop"}]"#);
    b.motion.finish_homing(true);
    b.run_loop();
    assert_eq!(b.sink.notifications, vec![Notification::Home { success: true }]);
}

#[test]
fn commands_after_home_run_before_completion() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"home","type":"auto"},{"action":"setDepth","depth":50}]"#);
    assert_eq!(b.motion.last_call(), Some(&MotionCall::SetDepth(45.0)));
    assert!(b.sink.notifications.is_empty());
}
