//! Dispatcher integration tests: wire text in, motion-controller calls out.

use ossm_bridge::app::events::Notification;
use ossm_bridge::app::service::Flow;

use crate::mock_ports::{Bench, MotionCall};

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}

// ── Ordering and isolation ────────────────────────────────────

#[test]
fn batch_runs_in_order() {
    let mut b = Bench::new();
    let flow = b.send(
        r#"[{"action":"move","position":10,"time":200},
            {"action":"move","position":90,"time":300,"replace":true},
            {"action":"startStreaming"}]"#,
    );
    assert_eq!(flow, Flow::Continue);
    assert_eq!(
        b.motion.calls,
        vec![
            MotionCall::Append { position: 10, time_ms: 200, replace: false },
            MotionCall::Append { position: 90, time_ms: 300, replace: true },
            MotionCall::StartStreaming,
        ]
    );
}

#[test]
fn unknown_action_does_not_stop_the_batch() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"dance"},{"action":"stop"},{"speed":3},{"action":"disable"}]"#);
    assert_eq!(b.motion.calls, vec![MotionCall::StopMotion, MotionCall::Disable]);
    assert_eq!(b.bridge.handled(), 2);
}

#[test]
fn malformed_batch_runs_nothing() {
    let mut b = Bench::new();
    for text in [
        "not json",
        r#"{"action":"stop"}"#,
        r#"[{"action":"stop"}, 5]"#,
        r#"[{"action":"stop"}"#,
    ] {
        assert_eq!(b.send(text), Flow::Continue);
    }
    assert!(b.motion.calls.is_empty());
    assert!(b.sink.notifications.is_empty());
}

#[test]
fn wrongly_typed_field_drops_only_that_element() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"setPattern","pattern":"two"},{"action":"setPattern","pattern":2}]"#);
    assert_eq!(
        b.motion.calls,
        vec![MotionCall::SetPattern(2), MotionCall::StartPattern]
    );
}

#[test]
fn empty_batch_is_a_no_op() {
    let mut b = Bench::new();
    assert_eq!(b.send("[]"), Flow::Continue);
    assert!(b.motion.calls.is_empty());
}

// ── Parameters ────────────────────────────────────────────────

#[test]
fn set_speed_scales_by_stroke_ratio() {
    let mut b = Bench::new();
    b.motion.stroke = 30.0;
    b.send(r#"[{"action":"setSpeed","speed":50}]"#);
    assert_close(b.bridge.state().speed_percent(), 50.0);
    // 50 % of 0.5..200 is 100.25 spm; a third of the depth triples it.
    assert_close(b.motion.speeds()[0], 300.75);
}

#[test]
fn set_speed_clamps_percentage() {
    let mut b = Bench::new();
    b.motion.stroke = 90.0;
    b.send(r#"[{"action":"setSpeed","speed":250},{"action":"setSpeed","speed":-4}]"#);
    let speeds = b.motion.speeds();
    assert_close(speeds[0], 200.0);
    assert_close(speeds[1], 0.5);
    assert_close(b.bridge.state().speed_percent(), 0.0);
}

#[test]
fn set_stroke_converts_percent_and_recomputes_speed() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"setSpeed","speed":100},{"action":"setStroke","stroke":50}]"#);
    assert!(b.motion.calls.contains(&MotionCall::SetStroke(45.0)));
    // Full speed on half the depth doubles the stroke rate.
    assert_close(*b.motion.speeds().last().unwrap(), 400.0);
}

#[test]
fn zero_stroke_keeps_speed_finite() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"setStroke","stroke":0},{"action":"setSpeed","speed":10}]"#);
    let speed = *b.motion.speeds().last().unwrap();
    assert!(speed.is_finite());
    assert_close(speed, 20.45);
}

#[test]
fn set_depth_converts_percent() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"setDepth","depth":25},{"action":"setDepth","depth":130}]"#);
    assert_eq!(
        b.motion.calls,
        vec![MotionCall::SetDepth(22.5), MotionCall::SetDepth(90.0)]
    );
}

#[test]
fn depth_then_speed_on_a_short_machine() {
    let mut b = Bench::new();
    b.motion.max_depth = 45.0;
    b.motion.stroke = 30.0;
    b.send(r#"[{"action":"setDepth","depth":50},{"action":"setSpeed","speed":20}]"#);
    assert_eq!(b.motion.calls[0], MotionCall::SetDepth(22.5));
    // 20 % of 0.5..200 is 40.4 spm, scaled by 45 / 30.
    assert_close(b.motion.speeds()[0], 60.6);
}

#[test]
fn sensation_is_clamped() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"setSensation","sensation":-140},{"action":"setSensation","sensation":35.5}]"#);
    assert_eq!(
        b.motion.calls,
        vec![MotionCall::SetSensation(-100.0), MotionCall::SetSensation(35.5)]
    );
}

#[test]
fn fractional_integers_truncate() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"move","position":42.9,"time":99.99}]"#);
    assert_eq!(
        b.motion.calls,
        vec![MotionCall::Append { position: 42, time_ms: 99, replace: false }]
    );
}

// ── Positioning ───────────────────────────────────────────────

#[test]
fn positioning_moves_use_default_speed() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"setup"},{"action":"retract"},{"action":"extend","speed":0}]"#);
    assert_eq!(
        b.motion.calls,
        vec![
            MotionCall::SetupDepth(10.0),
            MotionCall::MoveToMin(10.0),
            MotionCall::MoveToMax(10.0),
        ]
    );
}

#[test]
fn positioning_moves_honour_speed() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"extend","speed":42.5}]"#);
    assert_eq!(b.motion.calls, vec![MotionCall::MoveToMax(42.5)]);
}

// ── Misc ──────────────────────────────────────────────────────

#[test]
fn connected_disables_motor() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"connected"}]"#);
    assert_eq!(b.motion.calls, vec![MotionCall::Disable]);
}

#[test]
fn version_emits_notification() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"version"}]"#);
    assert_eq!(b.sink.notifications, vec![Notification::version()]);
    assert!(b.motion.calls.is_empty());
}

#[test]
fn get_pattern_list_has_no_effect() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"getPatternList"}]"#);
    assert!(b.motion.calls.is_empty());
    assert!(b.sink.notifications.is_empty());
    assert_eq!(b.bridge.handled(), 1);
}
