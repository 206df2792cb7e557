//! BLE remote transport.
//!
//! Implements [`RemoteTransport`] over a single GATT control characteristic:
//! peers write command batches to it and receive notifications from it.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via raw `esp_idf_svc::sys` calls.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## GATT Layout
//!
//! | Service / Characteristic | UUID                                   | Props              |
//! |--------------------------|----------------------------------------|--------------------|
//! | OSSM service             | `e5560000-6a2d-436f-a43d-82eab88dcefd` |                    |
//! | Control                  | `e5560001-6a2d-436f-a43d-82eab88dcefd` | Read+Write+Notify  |
//! | Device Information       | `0x180A`                               |                    |
//! | Software revision (API)  | `0x2A28`                               | Read               |
//! | Firmware revision        | `0x2A26`                               | Read               |
//!
//! After a peer disconnects the server resumes advertising so the next
//! peer can connect without a reboot.

use std::sync::Arc;

use log::{info, warn};

use crate::config::{MAX_BLE_NAME_LEN, is_printable_ascii};
use crate::link::mailbox::{MAX_MESSAGE_LEN, Mailbox, Source};
use crate::link::mode::PeerLink;
use crate::link::transport::{RemoteTransport, TransportError, TransportKind};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0xe5560000_6a2d_436f_a43d_82eab88dcefd;
pub const CHAR_CONTROL: u128 = 0xe5560001_6a2d_436f_a43d_82eab88dcefd;
pub const SERVICE_DEVICE_INFO: u16 = 0x180A;
pub const CHAR_SOFTWARE_REVISION: u16 = 0x2A28;
pub const CHAR_FIRMWARE_REVISION: u16 = 0x2A26;

/// Default ATT MTU before the peer negotiates a larger one.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const DEFAULT_ATT_MTU: u16 = 23;

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Connected,
    Failed,
}

/// Hand a control-characteristic write to the control loop.
fn deliver(mailbox: &Mailbox, raw: &[u8]) -> bool {
    match core::str::from_utf8(raw) {
        Ok(text) => mailbox.post_text(Source::Remote(TransportKind::Ble), text),
        Err(_) => {
            warn!("BLE: control write is not UTF-8 ({} bytes) — dropped", raw.len());
            false
        }
    }
}

// ── ESP-IDF BLE static state ──────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These statics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
mod stack {
    use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::ffi::CString;
    use std::sync::{Arc, Mutex};

    use esp_idf_svc::sys::*;
    use log::{info, warn};

    use super::{CHAR_CONTROL, CHAR_FIRMWARE_REVISION, CHAR_SOFTWARE_REVISION, SERVICE_DEVICE_INFO, SERVICE_UUID};
    use crate::config::{API_VERSION, FIRMWARE_VERSION};
    use crate::link::mailbox::{MAX_MESSAGE_LEN, Mailbox};

    pub static GATTS_IF: AtomicU32 = AtomicU32::new(0);
    pub static CONN_ID: AtomicU32 = AtomicU32::new(0);
    pub static CONNECTED: AtomicBool = AtomicBool::new(false);
    pub static MTU: AtomicU32 = AtomicU32::new(super::DEFAULT_ATT_MTU as u32);
    pub static CONTROL_HANDLE: AtomicU32 = AtomicU32::new(0);
    static CONTROL_SVC: AtomicU32 = AtomicU32::new(0);
    static INFO_SVC: AtomicU32 = AtomicU32::new(0);
    static STEP: AtomicU32 = AtomicU32::new(0);
    /// Bit 0: adv data pending, bit 1: scan response pending.
    static ADV_PENDING: AtomicU32 = AtomicU32::new(0);

    // GATTS callbacks run in the Bluedroid task (not ISR), so std Mutex is safe.
    pub static INBOUND: Mutex<Option<Arc<Mailbox>>> = Mutex::new(None);
    static PREP_BUF: Mutex<heapless::Vec<u8, MAX_MESSAGE_LEN>> = Mutex::new(heapless::Vec::new());

    static SERVICE_UUID_LE: [u8; 16] = SERVICE_UUID.to_le_bytes();
    static EMPTY_VALUE: [u8; 1] = [0];

    fn uuid128(uuid: u128) -> esp_bt_uuid_t {
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 16;
        t.uuid.uuid128 = uuid.to_le_bytes();
        t
    }

    fn uuid16(uuid: u16) -> esp_bt_uuid_t {
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 2;
        t.uuid.uuid16 = uuid;
        t
    }

    fn auto_rsp() -> esp_attr_control_t {
        esp_attr_control_t {
            auto_rsp: ESP_GATT_AUTO_RSP as u8,
        }
    }

    unsafe fn create_service(gatts_if: esp_gatt_if_t, uuid: esp_bt_uuid_t, handles: u16) {
        let mut svc_id = esp_gatt_srvc_id_t {
            id: esp_gatt_id_t { uuid, inst_id: 0 },
            is_primary: true,
        };
        unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, handles) };
    }

    unsafe fn add_char(svc: u16, mut uuid: esp_bt_uuid_t, perm: u32, prop: u32, value: &[u8], max_len: usize) {
        let mut val = esp_attr_value_t {
            attr_max_len: max_len as u16,
            attr_len: value.len() as u16,
            attr_value: value.as_ptr() as *mut u8,
        };
        let mut control = auto_rsp();
        unsafe {
            esp_ble_gatts_add_char(
                svc,
                &mut uuid,
                perm as esp_gatt_perm_t,
                prop as esp_gatt_char_prop_t,
                &mut val,
                &mut control,
            )
        };
    }

    fn adv_params() -> esp_ble_adv_params_t {
        esp_ble_adv_params_t {
            adv_int_min: 0x20,
            adv_int_max: 0x40,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..unsafe { core::mem::zeroed() }
        }
    }

    pub fn start_advertising() {
        let mut params = adv_params();
        unsafe { esp_ble_gap_start_advertising(&mut params) };
    }

    /// Service UUID in the advertising packet, device name in the scan
    /// response (a 128-bit UUID plus a long name overflows 31 bytes).
    unsafe fn configure_advertising() {
        ADV_PENDING.store(0b11, Ordering::Relaxed);
        let mut adv: esp_ble_adv_data_t = unsafe { core::mem::zeroed() };
        adv.set_scan_rsp = false;
        adv.include_name = false;
        adv.min_interval = 0x0006;
        adv.max_interval = 0x0012;
        adv.service_uuid_len = SERVICE_UUID_LE.len() as u16;
        adv.p_service_uuid = SERVICE_UUID_LE.as_ptr() as *mut u8;
        adv.flag = (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8;
        unsafe { esp_ble_gap_config_adv_data(&mut adv) };

        let mut rsp: esp_ble_adv_data_t = unsafe { core::mem::zeroed() };
        rsp.set_scan_rsp = true;
        rsp.include_name = true;
        unsafe { esp_ble_gap_config_adv_data(&mut rsp) };
    }

    fn adv_config_done(bit: u32) {
        let before = ADV_PENDING.fetch_and(!bit, Ordering::Relaxed);
        if before & !bit == 0 {
            start_advertising();
        }
    }

    pub unsafe fn set_device_name(name: &str) {
        match CString::new(name) {
            Ok(c_name) => unsafe {
                esp_ble_gap_set_device_name(c_name.as_ptr());
            },
            Err(_) => warn!("BLE: device name contains NUL — keeping stack default"),
        }
    }

    fn post(raw: &[u8]) {
        if let Ok(guard) = INBOUND.lock() {
            if let Some(mailbox) = guard.as_ref() {
                super::deliver(mailbox, raw);
            }
        }
    }

    pub unsafe extern "C" fn gap_event_handler(
        event: esp_gap_ble_cb_event_t,
        _param: *mut esp_ble_gap_cb_param_t,
    ) {
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => adv_config_done(0b01),
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => adv_config_done(0b10),
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                info!("BLE GAP: advertising started");
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
                info!("BLE GAP: advertising stopped");
            }
            _ => {}
        }
    }

    pub unsafe extern "C" fn gatts_event_handler(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        GATTS_IF.store(gatts_if as u32, Ordering::Relaxed);

        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                info!("BLE GATTS: app registered (if={})", gatts_if);
                STEP.store(0, Ordering::Relaxed);
                unsafe { create_service(gatts_if, uuid128(SERVICE_UUID), 6) };
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let svc = unsafe { (*param).create.service_handle };
                unsafe { esp_ble_gatts_start_service(svc) };
                match STEP.load(Ordering::Relaxed) {
                    0 => {
                        CONTROL_SVC.store(svc as u32, Ordering::Relaxed);
                        info!("BLE GATTS: control service created (handle={})", svc);
                        STEP.store(1, Ordering::Relaxed);
                        unsafe {
                            add_char(
                                svc,
                                uuid128(CHAR_CONTROL),
                                ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE,
                                ESP_GATT_CHAR_PROP_BIT_READ
                                    | ESP_GATT_CHAR_PROP_BIT_WRITE
                                    | ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                                &EMPTY_VALUE[..0],
                                MAX_MESSAGE_LEN,
                            )
                        };
                    }
                    3 => {
                        INFO_SVC.store(svc as u32, Ordering::Relaxed);
                        info!("BLE GATTS: device info service created (handle={})", svc);
                        STEP.store(4, Ordering::Relaxed);
                        unsafe {
                            add_char(
                                svc,
                                uuid16(CHAR_SOFTWARE_REVISION),
                                ESP_GATT_PERM_READ,
                                ESP_GATT_CHAR_PROP_BIT_READ,
                                API_VERSION.as_bytes(),
                                API_VERSION.len(),
                            )
                        };
                    }
                    step => warn!("BLE GATTS: unexpected service create at step {}", step),
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                let handle = unsafe { (*param).add_char.attr_handle };
                match STEP.load(Ordering::Relaxed) {
                    1 => {
                        CONTROL_HANDLE.store(handle as u32, Ordering::Relaxed);
                        info!("BLE GATTS: control char (handle={})", handle);
                        STEP.store(2, Ordering::Relaxed);
                        let mut cccd = uuid16(ESP_GATT_UUID_CHAR_CLIENT_CONFIG as u16);
                        let mut control = auto_rsp();
                        unsafe {
                            esp_ble_gatts_add_char_descr(
                                CONTROL_SVC.load(Ordering::Relaxed) as u16,
                                &mut cccd,
                                (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                                core::ptr::null_mut(),
                                &mut control,
                            )
                        };
                    }
                    4 => {
                        STEP.store(5, Ordering::Relaxed);
                        unsafe {
                            add_char(
                                INFO_SVC.load(Ordering::Relaxed) as u16,
                                uuid16(CHAR_FIRMWARE_REVISION),
                                ESP_GATT_PERM_READ,
                                ESP_GATT_CHAR_PROP_BIT_READ,
                                FIRMWARE_VERSION.as_bytes(),
                                FIRMWARE_VERSION.len(),
                            )
                        };
                    }
                    5 => {
                        STEP.store(6, Ordering::Relaxed);
                        info!("BLE GATTS: all attributes registered");
                        unsafe { configure_advertising() };
                    }
                    _ => {}
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
                if STEP.load(Ordering::Relaxed) == 2 {
                    STEP.store(3, Ordering::Relaxed);
                    unsafe { create_service(gatts_if, uuid16(SERVICE_DEVICE_INFO), 6) };
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let p = unsafe { &(*param).connect };
                CONN_ID.store(p.conn_id as u32, Ordering::Relaxed);
                MTU.store(super::DEFAULT_ATT_MTU as u32, Ordering::Relaxed);
                CONNECTED.store(true, Ordering::Release);
                info!("BLE Connected (conn_id={})", p.conn_id);
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                CONNECTED.store(false, Ordering::Release);
                info!("BLE Disconnected");
                start_advertising();
            }
            esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => {
                let mtu = unsafe { (*param).mtu.mtu };
                MTU.store(mtu as u32, Ordering::Relaxed);
                info!("BLE GATTS: MTU {}", mtu);
            }
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let p = unsafe { &(*param).write };
                if p.handle as u32 != CONTROL_HANDLE.load(Ordering::Relaxed) {
                    return;
                }
                let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
                if p.is_prep {
                    if let Ok(mut buf) = PREP_BUF.lock() {
                        if buf.extend_from_slice(data).is_err() {
                            warn!("BLE: long write exceeds {} bytes — dropped", MAX_MESSAGE_LEN);
                            buf.clear();
                        }
                    }
                } else {
                    post(data);
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_EXEC_WRITE_EVT => {
                let exec = unsafe { (*param).exec_write.exec_write_flag } as u32;
                if let Ok(mut buf) = PREP_BUF.lock() {
                    if exec == ESP_GATT_PREP_WRITE_EXEC && !buf.is_empty() {
                        post(&buf);
                    }
                    buf.clear();
                }
            }
            _ => {}
        }
    }

    pub fn notify(payload: &str) -> Result<(), i32> {
        let handle = CONTROL_HANDLE.load(Ordering::Relaxed) as u16;
        let gatts_if = GATTS_IF.load(Ordering::Relaxed) as esp_gatt_if_t;
        let conn = CONN_ID.load(Ordering::Relaxed) as u16;
        unsafe {
            esp_ble_gatts_set_attr_value(handle, payload.len() as u16, payload.as_ptr());
            let ret = esp_ble_gatts_send_indicate(
                gatts_if,
                conn,
                handle,
                payload.len() as u16,
                payload.as_ptr() as *mut u8,
                false,
            );
            if ret != ESP_OK {
                return Err(ret);
            }
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// BLE link
// ───────────────────────────────────────────────────────────────

pub struct BleLink {
    state: BleState,
    device_name: heapless::String<MAX_BLE_NAME_LEN>,
    link: PeerLink,
    /// Times advertising resumed after a central left.
    readvertised: u32,
    inbound: Option<Arc<Mailbox>>,
    /// Simulation: notifications sent to the peer, oldest first.
    #[cfg(not(target_os = "espidf"))]
    sim_sent: Vec<String>,
}

impl BleLink {
    /// Advertise as `device_name`.  Names that do not fit the advertising
    /// payload fall back to [`DEFAULT_BLE_NAME`](crate::config::DEFAULT_BLE_NAME).
    pub fn new(device_name: &str) -> Self {
        let device_name = if !device_name.is_empty() && is_printable_ascii(device_name) {
            heapless::String::try_from(device_name).ok()
        } else {
            None
        };
        let device_name = device_name.unwrap_or_else(|| {
            warn!("BLE: stored name unusable, advertising as default");
            let mut name = heapless::String::new();
            let _ = name.push_str(crate::config::DEFAULT_BLE_NAME);
            name
        });

        Self {
            state: BleState::Idle,
            device_name,
            link: PeerLink::new(),
            readvertised: 0,
            inbound: None,
            #[cfg(not(target_os = "espidf"))]
            sim_sent: Vec::new(),
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn readvertised(&self) -> u32 {
        self.readvertised
    }

    pub fn on_central_connected(&mut self) {
        info!("BLE: central connected");
        self.link.on_connect();
        self.state = BleState::Connected;
    }

    pub fn on_central_disconnected(&mut self) {
        info!("BLE: central disconnected");
        self.link.on_disconnect();
        if self.state != BleState::Idle {
            self.state = BleState::Advertising;
        }
    }

    /// A peer wrote to the control characteristic.
    pub fn on_control_write(&mut self, raw: &[u8]) -> bool {
        match self.inbound.as_deref() {
            Some(mailbox) => deliver(mailbox, raw),
            None => {
                warn!("BLE: write before start — dropped");
                false
            }
        }
    }

    /// Simulation: notifications delivered to the peer.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_sent(&self) -> &[String] {
        &self.sim_sent
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> Result<(), TransportError> {
        use esp_idf_svc::sys::*;
        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK {
                log::error!("BLE: bt_controller_init failed ({})", ret);
                return Err(TransportError::StackInitFailed);
            }

            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK {
                log::error!("BLE: bt_controller_enable failed ({})", ret);
                return Err(TransportError::StackInitFailed);
            }

            let ret = esp_bluedroid_init();
            if ret != ESP_OK {
                log::error!("BLE: bluedroid_init failed ({})", ret);
                return Err(TransportError::StackInitFailed);
            }

            let ret = esp_bluedroid_enable();
            if ret != ESP_OK {
                log::error!("BLE: bluedroid_enable failed ({})", ret);
                return Err(TransportError::StackInitFailed);
            }

            stack::set_device_name(&self.device_name);
            esp_ble_gap_register_callback(Some(stack::gap_event_handler));
            esp_ble_gatts_register_callback(Some(stack::gatts_event_handler));
            // Attribute table creation continues in the GATTS callback chain
            // and ends by starting advertising.
            esp_ble_gatts_app_register(0);
            esp_ble_gatt_set_local_mtu(MAX_MESSAGE_LEN as u16);
        }
        info!("BLE(espidf): Bluedroid stack initialised as '{}'", self.device_name);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> Result<(), TransportError> {
        info!(
            "BLE(sim): advertising '{}' (service {:032x})",
            self.device_name, SERVICE_UUID
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&mut self) {
        use esp_idf_svc::sys::*;
        unsafe {
            esp_ble_gap_stop_advertising();
            esp_bluedroid_disable();
            esp_bluedroid_deinit();
            esp_bt_controller_disable();
            esp_bt_controller_deinit();
        }
        if let Ok(mut inbound) = stack::INBOUND.lock() {
            *inbound = None;
        }
        info!("BLE(espidf): stack shut down");
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&mut self) {
        info!("BLE(sim): stopped");
    }

    #[cfg(target_os = "espidf")]
    fn platform_notify(&mut self, payload: &str) -> Result<(), TransportError> {
        use core::sync::atomic::Ordering;
        let mtu = stack::MTU.load(Ordering::Relaxed) as usize;
        if payload.len() + 3 > mtu {
            warn!("BLE: notification of {} bytes exceeds MTU {} — peer sees a truncated value", payload.len(), mtu);
        }
        stack::notify(payload).map_err(|ret| {
            warn!("BLE: send_indicate failed ({})", ret);
            TransportError::SendFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_notify(&mut self, payload: &str) -> Result<(), TransportError> {
        self.sim_sent.push(payload.to_owned());
        Ok(())
    }

    /// Mirror the stack's connection flag into the peer link.
    #[cfg(target_os = "espidf")]
    fn platform_sync(&mut self) {
        use core::sync::atomic::Ordering;
        let connected = stack::CONNECTED.load(Ordering::Acquire);
        if connected && !self.link.is_attached() {
            self.on_central_connected();
        } else if !connected && self.link.is_attached() {
            self.on_central_disconnected();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_sync(&mut self) {}

    /// The GATTS disconnect callback restarts advertising on the device;
    /// this only records it once per disconnect.
    fn note_readvertise(&mut self) {
        if self.link.take_relisten() {
            self.readvertised = self.readvertised.wrapping_add(1);
            info!(
                "BLE: advertising '{}' again ({} since boot)",
                self.device_name, self.readvertised
            );
        }
    }
}

// ───────────────────────────────────────────────────────────────
// RemoteTransport implementation
// ───────────────────────────────────────────────────────────────

impl RemoteTransport for BleLink {
    fn kind(&self) -> TransportKind {
        TransportKind::Ble
    }

    fn start(&mut self, inbound: Arc<Mailbox>) -> Result<(), TransportError> {
        info!("BLE: starting advertising as '{}'", self.device_name);

        #[cfg(target_os = "espidf")]
        if let Ok(mut slot) = stack::INBOUND.lock() {
            *slot = Some(inbound.clone());
        }
        self.inbound = Some(inbound);

        if let Err(e) = self.platform_start() {
            self.state = BleState::Failed;
            return Err(e);
        }
        self.state = BleState::Advertising;
        Ok(())
    }

    fn stop(&mut self) {
        if self.state == BleState::Idle {
            return;
        }
        self.platform_stop();
        self.state = BleState::Idle;
        self.inbound = None;
        info!("BLE: stopped");
    }

    fn is_connected(&self) -> bool {
        self.state == BleState::Connected
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if text.len() > MAX_MESSAGE_LEN {
            return Err(TransportError::MessageTooLong);
        }
        self.platform_notify(text)
    }

    fn poll(&mut self) {
        self.platform_sync();
        self.note_readvertise();
    }
}
