//! Mock collaborators for integration tests.
//!
//! `MockHardware` implements every collaborator port and records each call
//! so tests can assert on the full radio history.  It also models a
//! network that may or may not be in range and a time server, driven by
//! [`MockHardware::advance`].  `MemStore` is an EEPROM image with a
//! separate durable copy, so tests can power-cycle it.

use std::collections::VecDeque;

use clocksync::app::events::AppEvent;
use clocksync::app::ports::{
    AccessPointPort, ClockPort, ConnectivityError, EventSink, NetworkJoinPort, PersistentStore,
    StorageError, TimeFetchPort,
};
use clocksync::app::service::AppService;
use clocksync::config::SystemConfig;
use clocksync::feedback::FeedbackState;
use clocksync::protocol::BusLink;
use clocksync::provisioning::{CredentialSubmission, ProvisioningError, parse_form};
use clocksync::settings::SettingsStore;

/// 2024-07-01 12:00:00 UTC.
pub const SERVER_EPOCH: i64 = 1_719_835_200;

// ── Radio call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    ApStart,
    ApStop,
    JoinStart {
        ssid: String,
        passphrase: Option<String>,
    },
    JoinStop,
    FetchStart,
    FetchStop,
    ClockAdjust(i64),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<RadioCall>,
    pub ap_active: bool,
    pub station_active: bool,
    pub fetch_running: bool,
    /// Set if the AP and the station were ever up at the same time.
    pub overlap_seen: bool,
    pub wall_epoch: i64,
    pub uptime: u64,
    /// Network in range: ssid and passphrase (`None` = open).
    pub reachable: Option<(String, Option<String>)>,
    /// Seconds between starting a join and the link coming up.
    pub join_delay_secs: u64,
    /// What the time server answers; `None` = it never answers.
    pub server_epoch: Option<i64>,
    pub submissions: VecDeque<CredentialSubmission>,
    pub reports: Vec<Result<(), ProvisioningError>>,
    pub published: Option<FeedbackState>,
    join_started_at: Option<u64>,
    joined_with: Option<(String, Option<String>)>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            ap_active: false,
            station_active: false,
            fetch_running: false,
            overlap_seen: false,
            wall_epoch: 0,
            uptime: 100,
            reachable: None,
            join_delay_secs: 2,
            server_epoch: Some(SERVER_EPOCH),
            submissions: VecDeque::new(),
            reports: Vec::new(),
            published: None,
            join_started_at: None,
            joined_with: None,
        }
    }

    /// Network `ssid` in range, open or protected by `passphrase`.
    pub fn with_network(mut self, ssid: &str, passphrase: Option<&str>) -> Self {
        self.reachable = Some((ssid.to_string(), passphrase.map(str::to_string)));
        self
    }

    /// Let `secs` seconds pass.  A running fetch over an established link
    /// sets the wall clock from the server.
    pub fn advance(&mut self, secs: u64) {
        self.uptime += secs;
        self.wall_epoch += secs as i64;
        if let Some(server) = self.server_epoch.as_mut() {
            *server += secs as i64;
        }
        if self.fetch_running && self.is_joined() {
            if let Some(server) = self.server_epoch {
                self.wall_epoch = server;
            }
        }
    }

    /// Queue a form post from the provisioning page.
    pub fn post_form(&mut self, body: &str) {
        let submission = parse_form(body).expect("test form must parse");
        self.submissions.push_back(submission);
    }

    pub fn count(&self, call: &RadioCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn join_attempts(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RadioCall::JoinStart { .. }))
            .count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessPointPort for MockHardware {
    fn start(&mut self) -> Result<(), ConnectivityError> {
        self.calls.push(RadioCall::ApStart);
        if self.station_active {
            self.overlap_seen = true;
        }
        self.ap_active = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.push(RadioCall::ApStop);
        self.ap_active = false;
    }

    fn is_active(&self) -> bool {
        self.ap_active
    }

    fn take_submission(&mut self) -> Option<CredentialSubmission> {
        self.submissions.pop_front()
    }

    fn report_submission(&mut self, result: Result<(), ProvisioningError>) {
        self.reports.push(result);
    }

    fn publish_feedback(&mut self, feedback: &FeedbackState) {
        self.published = Some(*feedback);
    }
}

impl NetworkJoinPort for MockHardware {
    fn start(&mut self, ssid: &str, passphrase: Option<&str>) -> Result<(), ConnectivityError> {
        self.calls.push(RadioCall::JoinStart {
            ssid: ssid.to_string(),
            passphrase: passphrase.map(str::to_string),
        });
        if self.ap_active {
            self.overlap_seen = true;
        }
        self.station_active = true;
        self.join_started_at = Some(self.uptime);
        self.joined_with = Some((ssid.to_string(), passphrase.map(str::to_string)));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.calls.push(RadioCall::JoinStop);
        self.station_active = false;
        self.join_started_at = None;
        self.joined_with = None;
    }

    fn is_joined(&self) -> bool {
        let Some(started) = self.join_started_at else {
            return false;
        };
        self.station_active
            && self.reachable.is_some()
            && self.reachable == self.joined_with
            && self.uptime >= started + self.join_delay_secs
    }
}

impl TimeFetchPort for MockHardware {
    fn start(&mut self, servers: &[&str]) -> Result<(), ConnectivityError> {
        assert!(!servers.is_empty(), "fetch needs at least one server");
        self.calls.push(RadioCall::FetchStart);
        self.fetch_running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.push(RadioCall::FetchStop);
        self.fetch_running = false;
    }

    fn is_running(&self) -> bool {
        self.fetch_running
    }
}

impl ClockPort for MockHardware {
    fn read_utc_epoch(&self) -> i64 {
        self.wall_epoch
    }

    fn adjust(&mut self, epoch: i64) {
        self.calls.push(RadioCall::ClockAdjust(epoch));
        self.wall_epoch = epoch;
    }

    fn uptime_secs(&self) -> u64 {
        self.uptime
    }
}

// ── MemStore ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct MemStore {
    pub staged: Vec<u8>,
    pub durable: Vec<u8>,
    pub fail_commit: bool,
    pub commits: usize,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self {
            staged: vec![0xFF; 256],
            durable: vec![0xFF; 256],
            fail_commit: false,
            commits: 0,
        }
    }

    /// What a power cycle would read back.
    pub fn reboot(&self) -> Self {
        Self {
            staged: self.durable.clone(),
            durable: self.durable.clone(),
            fail_commit: false,
            commits: 0,
        }
    }
}

impl PersistentStore for MemStore {
    fn capacity(&self) -> usize {
        self.staged.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let src = self
            .staged
            .get(offset..offset + buf.len())
            .ok_or(StorageError::OutOfBounds)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let dst = self
            .staged
            .get_mut(offset..offset + data.len())
            .ok_or(StorageError::OutOfBounds)?;
        dst.copy_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if self.fail_commit {
            self.staged = self.durable.clone();
            return Err(StorageError::CommitFailed);
        }
        self.durable = self.staged.clone();
        self.commits += 1;
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig: service + collaborators + bus link ───────────────────

pub struct Rig {
    pub app: AppService<MemStore>,
    pub hw: MockHardware,
    pub link: BusLink,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(hw: MockHardware) -> Self {
        Self::with_store(hw, MemStore::new())
    }

    pub fn with_store(mut hw: MockHardware, store: MemStore) -> Self {
        let mut app = AppService::new(SystemConfig::default(), SettingsStore::new(store));
        let mut sink = RecordingSink::new();
        app.start(&mut hw, &mut sink);
        Self {
            app,
            hw,
            link: BusLink::new(),
            sink,
        }
    }

    /// Host writes a raw frame.
    pub fn send(&mut self, frame: &[u8]) {
        let _ = self.link.on_receive(frame);
    }

    /// Host writes a frame and the module runs one tick.
    pub fn send_and_tick(&mut self, frame: &[u8]) {
        self.send(frame);
        self.tick();
    }

    pub fn tick(&mut self) {
        self.app.tick(&mut self.hw, &self.link, &mut self.sink);
    }

    /// One tick per simulated second.
    pub fn run_secs(&mut self, secs: u64) {
        for _ in 0..secs {
            self.hw.advance(1);
            self.tick();
        }
    }

    /// Host reads the 5-byte status reply.
    pub fn read_status(&self) -> [u8; 5] {
        self.link.on_request()
    }

    pub fn store(&self) -> &MemStore {
        self.app.settings_store().store()
    }
}
