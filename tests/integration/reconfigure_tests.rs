//! Reconfiguration integration tests: persisted remote selection,
//! restart-to-apply, and the mutual exclusion of the two remote flags.

use ossm_bridge::app::service::{Flow, RestartRequest};
use ossm_bridge::config::{
    CompiledRemote, KEY_BLE_NAME, KEY_PASSWORD, KEY_SSID, KEY_USE_BLUETOOTH, KEY_USE_WEBSOCKET,
    ModeConfig, PREFS_NAMESPACE, RESTART_SETTLE, RemoteSelection,
};
use ossm_bridge::app::ports::StoragePort;
use ossm_bridge::link::mode::TransportMode;

use crate::mock_ports::{Bench, MemStore};

fn flags(store: &MemStore) -> (Option<bool>, Option<bool>) {
    (store.flag(KEY_USE_WEBSOCKET), store.flag(KEY_USE_BLUETOOTH))
}

#[test]
fn configure_bluetooth_persists_and_requests_restart() {
    let mut b = Bench::new();
    let flow = b.send(r#"[{"action":"configureBluetooth","name":"Stroker"}]"#);
    assert_eq!(
        flow,
        Flow::Restart(RestartRequest {
            settle: RESTART_SETTLE,
            selection: RemoteSelection::Ble,
        })
    );
    assert_eq!(flags(&b.store), (Some(false), Some(true)));
    assert_eq!(b.store.text(KEY_BLE_NAME).as_deref(), Some("Stroker"));
    assert_eq!(b.store.commits, 1);
    // No acknowledgement: the restart is the acknowledgement.
    assert!(b.sink.notifications.is_empty());
}

#[test]
fn configure_websocket_persists_credentials() {
    let mut b = Bench::new();
    let flow = b.send(r#"[{"action":"configureWebsocket","ssid":"HomeNet","password":"hunter22"}]"#);
    assert!(matches!(
        flow,
        Flow::Restart(RestartRequest { selection: RemoteSelection::WebSocket, .. })
    ));
    assert_eq!(flags(&b.store), (Some(true), Some(false)));
    assert_eq!(b.store.text(KEY_SSID).as_deref(), Some("HomeNet"));
    assert_eq!(b.store.text(KEY_PASSWORD).as_deref(), Some("hunter22"));
}

#[test]
fn switching_family_clears_the_other_flag() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"configureWebsocket","ssid":"HomeNet","password":""}]"#);
    b.send(r#"[{"action":"configureBluetooth","name":"OSSM"}]"#);
    assert_eq!(flags(&b.store), (Some(false), Some(true)));
}

#[test]
fn restart_ends_the_batch() {
    let mut b = Bench::new();
    let flow = b.send(
        r#"[{"action":"stop"},{"action":"configureBluetooth","name":"OSSM"},{"action":"disable"}]"#,
    );
    assert!(matches!(flow, Flow::Restart(_)));
    assert_eq!(b.bridge.handled(), 2);
    assert_eq!(b.motion.calls.len(), 1);
}

#[test]
fn storage_failure_aborts_reconfiguration() {
    let mut b = Bench::new();
    b.store = MemStore::failing();
    let flow = b.send(r#"[{"action":"configureBluetooth","name":"OSSM"},{"action":"stop"}]"#);
    assert_eq!(flow, Flow::Continue);
    assert_eq!(b.store.commits, 0);
    // The batch carries on after an aborted reconfiguration.
    assert_eq!(b.bridge.handled(), 2);
}

#[test]
fn partial_write_never_sets_both_flags() {
    let mut b = Bench::new();
    b.store
        .write_bool(PREFS_NAMESPACE, KEY_USE_WEBSOCKET, true)
        .unwrap();
    b.store
        .write_bool(PREFS_NAMESPACE, KEY_USE_BLUETOOTH, false)
        .unwrap();
    // Strings and the first flag land, the second flag write fails.
    b.store.fail_after = Some(b.store.writes + 4);

    let flow = b.send(r#"[{"action":"configureBluetooth","name":"OSSM"}]"#);
    assert_eq!(flow, Flow::Continue);
    assert_ne!(flags(&b.store), (Some(true), Some(true)));
}

#[test]
fn invalid_parameters_are_rejected_before_any_write() {
    let mut b = Bench::new();
    for text in [
        r#"[{"action":"configureBluetooth","name":""}]"#,
        r#"[{"action":"configureBluetooth","name":"this name is far too long for adverts"}]"#,
        r#"[{"action":"configureWebsocket","ssid":"","password":"x"}]"#,
        r#"[{"action":"configureWebsocket","ssid":"Net\u0007","password":""}]"#,
    ] {
        assert_eq!(b.send(text), Flow::Continue);
    }
    assert_eq!(b.store.writes, 0);
}

#[test]
fn next_boot_selects_the_configured_family() {
    let mut b = Bench::new();
    b.send(r#"[{"action":"configureBluetooth","name":"Stroker"}]"#);

    let prefs = ModeConfig::load(&b.store);
    assert_eq!(prefs.remote, RemoteSelection::Ble);
    assert_eq!(prefs.ble_name, "Stroker");
    assert_eq!(
        TransportMode::select(prefs.remote, CompiledRemote::Ble, true),
        TransportMode::BleActive
    );
}

#[test]
fn running_mode_is_unchanged_until_restart() {
    let mut b = Bench::new();
    let before = b.bridge.mode().clone();
    b.send(r#"[{"action":"configureBluetooth","name":"Stroker"}]"#);
    assert_eq!(b.bridge.mode(), &before);
    assert_eq!(b.bridge.mode().remote, RemoteSelection::Bootstrap);
}
