//! BLE peripheral adapter.
//!
//! Implements [`RadioPort`]: advertising, live PM2.5 notifications, the
//! time-sync characteristic, and the status LED.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                        | Perms       | Payload            |
//! |----------------|-----------------------------|-------------|--------------------|
//! | PM2.5          | `7e1a0002-…-c3d2a9f05b11`   | Read+Notify | `u16` LE, µg/m³    |
//! | Time sync      | `7e1a0003-…-c3d2a9f05b11`   | Write       | `u32` LE, Unix s   |
//!
//! Stack callbacks never call into the scheduler.  They queue
//! [`RadioEvent`]s, which the main loop moves into the
//! [`RunLoop`](crate::run_loop::RunLoop) with [`BleRadio::forward_events`].

use log::info;

use crate::app::ports::{PeerHandle, RadioPort};
use crate::error::RadioError;
use crate::radio_event::RadioEvent;
use crate::run_loop::RunLoop;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x7e1a0001_5c2e_4f0b_9d47_c3d2a9f05b11;
pub const CHAR_PM25: u128 = 0x7e1a0002_5c2e_4f0b_9d47_c3d2a9f05b11;
pub const CHAR_TIME_SYNC: u128 = 0x7e1a0003_5c2e_4f0b_9d47_c3d2a9f05b11;

/// Largest time-sync write kept; longer writes are rejected downstream.
pub const MAX_TIME_WRITE: usize = 8;

const RAW_EVENT_CAP: usize = 16;

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Connected,
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF callback bridge
// ───────────────────────────────────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures.  These statics bridge the callback context to the adapter.
// GATTS callbacks run in the Bluedroid task (not ISR), so std Mutex is safe.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_PM25_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_TIME_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);

#[cfg(target_os = "espidf")]
static BLE_RAW_EVENTS: std::sync::Mutex<heapless::Deque<RadioEvent, RAW_EVENT_CAP>> =
    std::sync::Mutex::new(heapless::Deque::new());
#[cfg(target_os = "espidf")]
static BLE_TIME_BUF: std::sync::Mutex<Option<heapless::Vec<u8, MAX_TIME_WRITE>>> =
    std::sync::Mutex::new(None);

#[cfg(target_os = "espidf")]
fn queue_raw_event(event: RadioEvent) {
    if let Ok(mut q) = BLE_RAW_EVENTS.lock() {
        if q.push_back(event).is_err() {
            log::warn!("BLE: raw event queue full, dropped {:?}", event);
        }
    }
}

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    unsafe {
        t.uuid.uuid128 = uuid.to_le_bytes();
    }
    t
}

#[cfg(target_os = "espidf")]
unsafe fn add_gatt_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32) {
    use esp_idf_svc::sys::*;
    let mut char_uuid = uuid128_to_esp(uuid);
    unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            perm as esp_gatt_perm_t,
            prop as esp_gatt_char_prop_t,
            core::ptr::null_mut(),
            core::ptr::null_mut(),
        );
    }
}

#[cfg(target_os = "espidf")]
fn adv_params() -> esp_idf_svc::sys::esp_ble_adv_params_t {
    use esp_idf_svc::sys::*;
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

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            log::debug!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::debug!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use crate::radio_event::{LeSubevent, StackState};
    use esp_idf_svc::sys::*;

    BLE_GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid128_to_esp(SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, 8) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc_handle = unsafe { (*param).create.service_handle };
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            BLE_CHAR_STEP.store(1, AtomicOrdering::Relaxed);
            unsafe {
                esp_ble_gatts_start_service(svc_handle);
                add_gatt_char(
                    svc_handle,
                    CHAR_PM25,
                    ESP_GATT_PERM_READ,
                    ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = unsafe { (*param).add_char.attr_handle };
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) {
                1 => {
                    BLE_PM25_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    BLE_CHAR_STEP.store(2, AtomicOrdering::Relaxed);
                    unsafe {
                        add_gatt_char(
                            svc_handle,
                            CHAR_TIME_SYNC,
                            ESP_GATT_PERM_WRITE,
                            ESP_GATT_CHAR_PROP_BIT_WRITE,
                        );
                    }
                }
                2 => {
                    BLE_TIME_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    BLE_CHAR_STEP.store(3, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: all characteristics registered");
                    queue_raw_event(RadioEvent::StackState(StackState::Working));
                }
                _ => {}
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let conn_id = unsafe { (*param).connect.conn_id };
            queue_raw_event(RadioEvent::LeMeta(LeSubevent::ConnectionComplete {
                status: 0,
                handle: conn_id,
            }));
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            let p = unsafe { &(*param).disconnect };
            queue_raw_event(RadioEvent::DisconnectionComplete {
                handle: p.conn_id,
                reason: p.reason as u8,
            });
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            if u32::from(p.handle) == BLE_TIME_CHAR_HANDLE.load(AtomicOrdering::Relaxed) {
                let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
                if let Ok(mut slot) = BLE_TIME_BUF.lock() {
                    let mut buf = heapless::Vec::new();
                    // Truncated writes still fail the length check.
                    let keep = data.len().min(MAX_TIME_WRITE);
                    let _ = buf.extend_from_slice(&data[..keep]);
                    *slot = Some(buf);
                }
            }
            if p.need_rsp {
                unsafe {
                    esp_ble_gatts_send_response(
                        gatts_if,
                        p.conn_id,
                        p.trans_id,
                        esp_gatt_status_t_ESP_GATT_OK,
                        core::ptr::null_mut(),
                    );
                }
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleRadio {
    state: BleState,
    device_name: heapless::String<24>,
    peer: Option<PeerHandle>,
    time_synchronized: bool,
    led_on: bool,
    last_pm25: Option<u16>,
    #[cfg(not(target_os = "espidf"))]
    sim_events: heapless::Deque<RadioEvent, RAW_EVENT_CAP>,
    #[cfg(not(target_os = "espidf"))]
    sim_time_write: Option<heapless::Vec<u8, MAX_TIME_WRITE>>,
}

impl BleRadio {
    pub fn new(device_name: heapless::String<24>) -> Self {
        Self {
            state: BleState::Idle,
            device_name,
            peer: None,
            time_synchronized: false,
            led_on: false,
            last_pm25: None,
            #[cfg(not(target_os = "espidf"))]
            sim_events: heapless::Deque::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_time_write: None,
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    pub fn peer(&self) -> Option<PeerHandle> {
        self.peer
    }

    pub fn led_on(&self) -> bool {
        self.led_on
    }

    /// Last PM2.5 value pushed to the peer.
    pub fn last_pm25(&self) -> Option<u16> {
        self.last_pm25
    }

    /// Bring up controller, host stack and GATT service.  The stack
    /// reports readiness later through the event feed.
    pub fn bring_up(&mut self) -> Result<(), RadioError> {
        self.platform_bring_up()?;
        info!("BLE: stack up, device name '{}'", self.device_name);
        Ok(())
    }

    /// Raise the sync flag after the clock accepted a time write.
    pub fn confirm_time_sync(&mut self) {
        if !self.time_synchronized {
            info!("BLE: wall-clock time synchronized by peer");
        }
        self.time_synchronized = true;
    }

    /// Move queued stack events into the run loop, oldest first.
    pub fn forward_events<const N: usize>(&mut self, run_loop: &mut RunLoop<N>) {
        while let Some(event) = self.pop_raw_event() {
            run_loop.post(event);
        }
    }

    /// Consume the latest time-sync write, if any.
    #[cfg(target_os = "espidf")]
    pub fn take_time_write(&mut self) -> Option<heapless::Vec<u8, MAX_TIME_WRITE>> {
        BLE_TIME_BUF.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Consume the latest time-sync write, if any.
    #[cfg(not(target_os = "espidf"))]
    pub fn take_time_write(&mut self) -> Option<heapless::Vec<u8, MAX_TIME_WRITE>> {
        self.sim_time_write.take()
    }

    /// Simulation: a peer wrote the time characteristic.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_write_time(&mut self, raw: &[u8]) {
        let mut buf = heapless::Vec::new();
        let keep = raw.len().min(MAX_TIME_WRITE);
        let _ = buf.extend_from_slice(&raw[..keep]);
        self.sim_time_write = Some(buf);
    }

    /// Simulation: the stack delivered a raw event.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_push_event(&mut self, event: RadioEvent) -> bool {
        self.sim_events.push_back(event).is_ok()
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn pop_raw_event(&mut self) -> Option<RadioEvent> {
        BLE_RAW_EVENTS.lock().ok().and_then(|mut q| q.pop_front())
    }

    #[cfg(not(target_os = "espidf"))]
    fn pop_raw_event(&mut self) -> Option<RadioEvent> {
        self.sim_events.pop_front()
    }

    #[cfg(target_os = "espidf")]
    fn platform_bring_up(&mut self) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK as i32 {
                return Err(RadioError::Controller(ret));
            }
            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK as i32 {
                return Err(RadioError::Controller(ret));
            }
            let ret = esp_bluedroid_init();
            if ret != ESP_OK as i32 {
                return Err(RadioError::HostStack(ret));
            }
            let ret = esp_bluedroid_enable();
            if ret != ESP_OK as i32 {
                return Err(RadioError::HostStack(ret));
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            let ret = esp_ble_gatts_app_register(0);
            if ret != ESP_OK as i32 {
                return Err(RadioError::GattRegistration(ret));
            }

            let mut name = [0u8; 25];
            name[..self.device_name.len()].copy_from_slice(self.device_name.as_bytes());
            esp_ble_gap_set_device_name(name.as_ptr() as *const _);

            gpio_reset_pin(crate::pins::STATUS_LED_GPIO);
            gpio_set_direction(
                crate::pins::STATUS_LED_GPIO,
                gpio_mode_t_GPIO_MODE_OUTPUT,
            );
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_bring_up(&mut self) -> Result<(), RadioError> {
        info!(
            "BLE(sim): GATT service {:032x} registered",
            SERVICE_UUID
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_advertise(&mut self, on: bool) {
        use esp_idf_svc::sys::*;
        unsafe {
            if on {
                let mut params = adv_params();
                esp_ble_gap_start_advertising(&mut params);
            } else {
                esp_ble_gap_stop_advertising();
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_advertise(&mut self, on: bool) {
        log::debug!("BLE(sim): advertising {}", if on { "on" } else { "off" });
    }

    #[cfg(target_os = "espidf")]
    fn platform_notify(&mut self, peer: PeerHandle, payload: &[u8; 2]) {
        use esp_idf_svc::sys::*;
        let handle = BLE_PM25_CHAR_HANDLE.load(AtomicOrdering::Relaxed);
        if handle == 0 {
            return;
        }
        let mut bytes = *payload;
        unsafe {
            esp_ble_gatts_send_indicate(
                BLE_GATTS_IF.load(AtomicOrdering::Relaxed) as esp_gatt_if_t,
                peer.raw(),
                handle as u16,
                bytes.len() as u16,
                bytes.as_mut_ptr(),
                false,
            );
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_notify(&mut self, peer: PeerHandle, payload: &[u8; 2]) {
        log::debug!("BLE(sim): notify {} <- {:02x?}", peer, payload);
    }

    #[cfg(target_os = "espidf")]
    fn platform_led(&mut self, on: bool) {
        unsafe {
            esp_idf_svc::sys::gpio_set_level(crate::pins::STATUS_LED_GPIO, u32::from(on));
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_led(&mut self, _on: bool) {}
}

// ───────────────────────────────────────────────────────────────
// RadioPort implementation
// ───────────────────────────────────────────────────────────────

impl RadioPort for BleRadio {
    fn is_time_synchronized(&self) -> bool {
        self.time_synchronized
    }

    fn set_peer(&mut self, peer: Option<PeerHandle>) {
        self.peer = peer;
        self.state = match (peer, self.state) {
            (Some(_), _) => BleState::Connected,
            (None, BleState::Connected) => BleState::Idle,
            (None, s) => s,
        };
    }

    fn start_advertising(&mut self) {
        if self.state == BleState::Advertising {
            return;
        }
        self.platform_advertise(true);
        self.state = BleState::Advertising;
    }

    fn stop_advertising(&mut self) {
        if self.state != BleState::Advertising {
            return;
        }
        self.platform_advertise(false);
        self.state = BleState::Idle;
    }

    fn notify_pm25(&mut self, value: u16) {
        let Some(peer) = self.peer else {
            return;
        };
        self.platform_notify(peer, &value.to_le_bytes());
        self.last_pm25 = Some(value);
    }

    fn set_status_led(&mut self, on: bool) {
        self.platform_led(on);
        self.led_on = on;
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
