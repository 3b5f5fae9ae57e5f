//! Integration tests for the bus → AppService → FSM → collaborator chain.
//!
//! Frames go in through a real [`BusLink`], status comes back out of it,
//! and every radio call lands on the recording mock.

use crate::mock_hw::{MemStore, MockHardware, RadioCall, Rig, SERVER_EPOCH};

use clocksync::app::events::AppEvent;
use clocksync::feedback::{FeedbackState, Outcome};
use clocksync::fsm::StateId;

const ENABLE_PROVISIONING: [u8; 3] = [0, 1, 1];
const DISABLE_PROVISIONING: [u8; 3] = [0, 0, 0];
const RESET_SETTINGS: [u8; 2] = [2, 2];
/// PollTime, timeout 10 s, validity 10 s.
const POLL_10_10: [u8; 6] = [1, 10, 0, 10, 0, 21];
/// PollTime, timeout 60 s, validity 60 s.
const POLL_60_60: [u8; 6] = [1, 60, 0, 60, 0, 121];

const BOOT_EPOCH: i64 = 1_262_304_000;

fn reachable_default_network() -> MockHardware {
    // Factory settings name an open network called "Wifi".
    MockHardware::new().with_network("Wifi", None)
}

// ── Startup ──────────────────────────────────────────────────

#[test]
fn boots_idle_with_clock_at_boot_epoch() {
    let rig = Rig::new(MockHardware::new());
    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.hw.calls, vec![RadioCall::ClockAdjust(BOOT_EPOCH)]);
    assert!(!rig.app.time_valid());
    assert_eq!(rig.app.feedback(), FeedbackState::default());
}

// ── Provisioning ─────────────────────────────────────────────

#[test]
fn enable_provisioning_is_idempotent() {
    let mut rig = Rig::new(MockHardware::new());
    rig.send_and_tick(&ENABLE_PROVISIONING);
    rig.send_and_tick(&ENABLE_PROVISIONING);

    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert_eq!(rig.hw.count(&RadioCall::ApStart), 1);
    assert_eq!(rig.hw.count(&RadioCall::ApStop), 0);
    assert!(rig.hw.ap_active);
}

#[test]
fn disable_provisioning_tears_down_access_point() {
    let mut rig = Rig::new(MockHardware::new());
    rig.send_and_tick(&ENABLE_PROVISIONING);
    rig.send_and_tick(&DISABLE_PROVISIONING);

    assert_eq!(rig.app.state(), StateId::Idle);
    assert!(!rig.hw.ap_active);
    assert!(rig.sink.events.contains(&AppEvent::StateChanged {
        from: StateId::Provisioning,
        to: StateId::Idle,
    }));
}

#[test]
fn disable_provisioning_while_idle_is_a_no_op() {
    let mut rig = Rig::new(MockHardware::new());
    rig.hw.clear_calls();
    rig.send_and_tick(&DISABLE_PROVISIONING);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert!(rig.hw.calls.is_empty());
}

#[test]
fn poll_time_from_provisioning_stops_access_point_first() {
    let mut rig = Rig::new(reachable_default_network());
    rig.send_and_tick(&ENABLE_PROVISIONING);
    rig.hw.clear_calls();

    rig.send_and_tick(&POLL_60_60);

    assert_eq!(rig.app.state(), StateId::Syncing);
    let ap_stop = rig.hw.calls.iter().position(|c| *c == RadioCall::ApStop);
    let join = rig
        .hw
        .calls
        .iter()
        .position(|c| matches!(c, RadioCall::JoinStart { .. }));
    assert!(ap_stop.is_some() && join.is_some());
    assert!(ap_stop < join, "teardown must precede join: {:?}", rig.hw.calls);
    assert!(!rig.hw.overlap_seen);
}

#[test]
fn enable_provisioning_cancels_sync_without_feedback() {
    let mut rig = Rig::new(reachable_default_network());
    rig.send_and_tick(&POLL_60_60);
    rig.run_secs(1);
    assert_eq!(rig.app.state(), StateId::Syncing);

    rig.send_and_tick(&ENABLE_PROVISIONING);

    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert!(rig.app.session().is_none());
    assert!(!rig.hw.station_active);
    assert!(!rig.hw.fetch_running);
    assert!(rig.hw.ap_active);
    assert!(!rig.hw.overlap_seen);
    assert_eq!(rig.app.feedback(), FeedbackState::default());
}

// ── Sync sessions ────────────────────────────────────────────

#[test]
fn successful_sync_sets_validity_and_returns_to_idle() {
    let mut rig = Rig::new(reachable_default_network());
    rig.send_and_tick(&POLL_60_60);
    assert_eq!(rig.app.state(), StateId::Syncing);
    assert_eq!(rig.read_status()[0] & 0b10, 0b10, "syncing flag set");

    // Link comes up after 2 s, the fetch lands one second later.
    rig.run_secs(3);

    assert_eq!(rig.app.state(), StateId::Idle);
    assert!(rig.app.time_valid());
    assert_eq!(rig.app.feedback().network_join, Outcome::Success);
    assert_eq!(rig.app.feedback().time_fetch, Outcome::Success);
    assert!(!rig.hw.station_active);
    assert!(!rig.hw.fetch_running);
    assert!(
        rig.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::SyncSucceeded { valid_for_secs: 60, .. }))
    );

    let status = rig.read_status();
    assert_eq!(status[0], 0b01, "valid, not syncing");
    assert_eq!(status[4], clocksync::protocol::checksum(&status[..4]));
}

#[test]
fn status_reports_projected_local_time() {
    let mut rig = Rig::new(reachable_default_network());
    rig.send_and_tick(&POLL_60_60);
    rig.run_secs(3);

    // Default zone is Central European; July is summer time (UTC+2).
    let utc = rig.hw.wall_epoch;
    assert!(utc >= SERVER_EPOCH);
    let secs_of_day = (utc + 2 * 3600).rem_euclid(86_400);
    let status = rig.read_status();
    assert_eq!(status[1] as i64, secs_of_day / 3600);
    assert_eq!(status[2] as i64, (secs_of_day % 3600) / 60);
    assert_eq!(status[3] as i64, secs_of_day % 60);
}

#[test]
fn validity_window_expires_on_uptime() {
    let mut rig = Rig::new(reachable_default_network());
    rig.send_and_tick(&POLL_60_60);
    rig.run_secs(3);
    assert!(rig.app.time_valid());

    rig.run_secs(60);
    assert!(rig.app.time_valid(), "window end is inclusive");

    rig.run_secs(1);
    assert!(!rig.app.time_valid());
    assert_eq!(rig.read_status()[0], 0);
    assert!(rig.sink.events.contains(&AppEvent::TimeValidityExpired));
}

#[test]
fn unreachable_network_times_out_after_deadline() {
    let mut rig = Rig::new(MockHardware::new());
    rig.send_and_tick(&POLL_10_10);

    rig.run_secs(10);
    assert_eq!(rig.app.state(), StateId::Syncing, "deadline not yet passed");

    rig.run_secs(1);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(
        rig.app.feedback(),
        FeedbackState {
            network_join: Outcome::Failure,
            time_fetch: Outcome::Failure,
            settings_commit: Outcome::NotAttempted,
        }
    );
    assert!(!rig.app.time_valid());
    assert!(rig.sink.events.contains(&AppEvent::SyncTimedOut { joined: false }));
    assert_eq!(rig.read_status()[0], 0);
    assert!(!rig.hw.station_active);
}

#[test]
fn silent_time_server_records_join_success_fetch_failure() {
    let mut hw = reachable_default_network();
    hw.server_epoch = None;
    let mut rig = Rig::new(hw);
    rig.send_and_tick(&POLL_10_10);
    rig.run_secs(11);

    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.app.feedback().network_join, Outcome::Success);
    assert_eq!(rig.app.feedback().time_fetch, Outcome::Failure);
    assert_eq!(rig.hw.count(&RadioCall::FetchStart), 1);
}

#[test]
fn sync_start_resets_clock_and_validity() {
    let mut rig = Rig::new(reachable_default_network());
    rig.send_and_tick(&POLL_60_60);
    rig.run_secs(3);
    assert!(rig.app.time_valid());

    rig.hw.server_epoch = None;
    rig.hw.clear_calls();
    rig.send_and_tick(&POLL_60_60);

    assert!(!rig.app.time_valid());
    assert_eq!(rig.hw.calls.first(), Some(&RadioCall::ClockAdjust(BOOT_EPOCH)));
    assert_eq!(rig.hw.wall_epoch, BOOT_EPOCH);
}

#[test]
fn poll_time_while_syncing_restarts_session() {
    let mut rig = Rig::new(MockHardware::new());
    rig.send_and_tick(&POLL_10_10);
    rig.run_secs(8);

    rig.send_and_tick(&POLL_10_10);
    assert_eq!(rig.hw.join_attempts(), 2);

    // The old deadline would have passed by now.
    rig.run_secs(5);
    assert_eq!(rig.app.state(), StateId::Syncing);
    rig.run_secs(6);
    assert_eq!(rig.app.state(), StateId::Idle);
}

#[test]
fn poll_time_values_are_clamped() {
    let mut rig = Rig::new(MockHardware::new());
    // timeout 5000, validity 9000
    rig.send_and_tick(&[1, 0x88, 0x13, 0x28, 0x23, 231]);

    let session = rig.app.session().expect("syncing");
    assert_eq!(session.timeout_secs, 1800);
    assert_eq!(session.validity_secs, 3600);
}

#[test]
fn zero_poll_values_clamp_to_one_second() {
    let mut rig = Rig::new(MockHardware::new());
    rig.send_and_tick(&[1, 0, 0, 0, 0, 1]);

    let session = rig.app.session().expect("syncing");
    assert_eq!(session.timeout_secs, 1);
    assert_eq!(session.validity_secs, 1);
    rig.run_secs(2);
    assert_eq!(rig.app.state(), StateId::Idle);
}

#[test]
fn protected_network_joins_with_passphrase() {
    let mut rig = Rig::new(MockHardware::new().with_network("Home", Some("password1")));
    rig.send_and_tick(&ENABLE_PROVISIONING);
    rig.hw
        .post_form("wifissid=Home&wifipass=password1&is_protected=on");
    rig.tick();
    rig.send_and_tick(&POLL_60_60);

    assert!(rig.hw.calls.contains(&RadioCall::JoinStart {
        ssid: "Home".into(),
        passphrase: Some("password1".into()),
    }));
    rig.run_secs(3);
    assert!(rig.app.time_valid());
}

#[test]
fn open_network_joins_without_passphrase() {
    let mut rig = Rig::new(MockHardware::new());
    rig.send_and_tick(&ENABLE_PROVISIONING);
    rig.hw.post_form("wifissid=Cafe&wifipass=ignored123");
    rig.tick();
    rig.send_and_tick(&POLL_60_60);

    assert!(rig.hw.calls.contains(&RadioCall::JoinStart {
        ssid: "Cafe".into(),
        passphrase: None,
    }));
}

// ── Bus errors ───────────────────────────────────────────────

#[test]
fn corrupted_frame_changes_nothing() {
    let mut rig = Rig::new(MockHardware::new());
    rig.hw.clear_calls();
    rig.send_and_tick(&[1, 10, 0, 10, 0, 22]);
    rig.send_and_tick(&[9, 9]);
    rig.send_and_tick(&[0, 1]);

    assert_eq!(rig.app.state(), StateId::Idle);
    assert!(rig.hw.calls.is_empty());
    assert_eq!(rig.link.rejected_frames(), 3);
}

#[test]
fn only_latest_frame_between_ticks_applies() {
    let mut rig = Rig::new(MockHardware::new());
    rig.send(&ENABLE_PROVISIONING);
    rig.send(&POLL_10_10);
    rig.tick();

    assert_eq!(rig.app.state(), StateId::Syncing);
    assert_eq!(rig.hw.count(&RadioCall::ApStart), 0);
}

// ── Radio exclusivity ────────────────────────────────────────

#[test]
fn access_point_and_station_never_overlap() {
    let mut rig = Rig::with_store(reachable_default_network(), MemStore::new());
    let script: [&[u8]; 8] = [
        &ENABLE_PROVISIONING,
        &POLL_10_10,
        &ENABLE_PROVISIONING,
        &RESET_SETTINGS,
        &POLL_60_60,
        &POLL_60_60,
        &DISABLE_PROVISIONING,
        &ENABLE_PROVISIONING,
    ];
    for frame in script {
        rig.send_and_tick(frame);
        rig.run_secs(1);
        assert!(!(rig.hw.ap_active && rig.hw.station_active));
    }
    assert!(!rig.hw.overlap_seen, "calls: {:?}", rig.hw.calls);
}
