//! Integration tests for credential submission, reset and persistence.

use crate::mock_hw::{MemStore, MockHardware, RadioCall, Rig};

use clocksync::app::events::AppEvent;
use clocksync::error::Error;
use clocksync::feedback::Outcome;
use clocksync::fsm::StateId;
use clocksync::provisioning::ProvisioningError;
use clocksync::settings::Settings;
use clocksync::timezone::TimezoneSelection;

const ENABLE_PROVISIONING: [u8; 3] = [0, 1, 1];
const RESET_SETTINGS: [u8; 2] = [2, 2];
const POLL_60_60: [u8; 6] = [1, 60, 0, 60, 0, 121];

const HOME_FORM: &str = "wifissid=Home&wifipass=password1&is_protected=on&tz=3";

fn provisioned(hw: MockHardware, store: MemStore) -> Rig {
    let mut rig = Rig::with_store(hw, store);
    rig.send_and_tick(&ENABLE_PROVISIONING);
    rig.hw.post_form(HOME_FORM);
    rig.tick();
    rig
}

#[test]
fn valid_submission_is_persisted_in_full() {
    let rig = provisioned(MockHardware::new(), MemStore::new());

    let s = rig.app.settings();
    assert_eq!(s.ssid.as_str(), "Home");
    assert_eq!(s.passphrase.as_str(), "password1");
    assert!(s.is_protected);
    assert_eq!(s.timezone, TimezoneSelection::NamedZone(3));
    assert_eq!(rig.hw.reports, vec![Ok(())]);
    assert_eq!(rig.app.feedback().settings_commit, Outcome::Success);
    assert!(rig.sink.events.contains(&AppEvent::SettingsSaved));
    assert_eq!(rig.app.state(), StateId::Provisioning, "page stays up");
}

#[test]
fn persisted_settings_survive_power_cycle() {
    let rig = provisioned(MockHardware::new(), MemStore::new());
    let rebooted = Rig::with_store(MockHardware::new(), rig.store().reboot());

    assert_eq!(rebooted.app.settings(), rig.app.settings());
    assert_eq!(rebooted.app.state(), StateId::Idle);
}

#[test]
fn short_protected_passphrase_is_rejected() {
    let mut rig = Rig::new(MockHardware::new());
    rig.send_and_tick(&ENABLE_PROVISIONING);
    rig.hw.post_form("wifissid=Home&wifipass=short&is_protected=on");
    rig.tick();

    assert_eq!(rig.hw.reports, vec![Err(ProvisioningError::PassphraseTooShort)]);
    assert_eq!(*rig.app.settings(), Settings::default());
    assert_eq!(rig.store().commits, 0);
    assert_eq!(rig.app.feedback().settings_commit, Outcome::NotAttempted);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::SubmissionRejected(ProvisioningError::PassphraseTooShort))
    );
}

#[test]
fn short_passphrase_is_fine_for_open_networks() {
    let mut rig = Rig::new(MockHardware::new());
    rig.send_and_tick(&ENABLE_PROVISIONING);
    rig.hw.post_form("wifissid=Cafe&wifipass=abc");
    rig.tick();

    assert_eq!(rig.hw.reports, vec![Ok(())]);
    assert_eq!(rig.app.settings().ssid.as_str(), "Cafe");
    assert!(!rig.app.settings().is_protected);
}

#[test]
fn submissions_wait_for_provisioning() {
    let mut rig = Rig::new(MockHardware::new());
    rig.hw.post_form(HOME_FORM);
    rig.tick();
    assert_eq!(rig.hw.submissions.len(), 1, "not consumed while Idle");
    assert_eq!(*rig.app.settings(), Settings::default());

    rig.send_and_tick(&ENABLE_PROVISIONING);
    assert!(rig.hw.submissions.is_empty());
    assert_eq!(rig.app.settings().ssid.as_str(), "Home");
}

#[test]
fn commit_failure_keeps_previous_settings() {
    let mut store = MemStore::new();
    store.fail_commit = true;
    let rig = provisioned(MockHardware::new(), store);

    assert_eq!(*rig.app.settings(), Settings::default());
    assert_eq!(rig.hw.reports, vec![Err(ProvisioningError::StoreFailed)]);
    assert_eq!(rig.app.feedback().settings_commit, Outcome::Failure);
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::SettingsCommitFailed(Error::Storage(_))
    )));
    assert!(rig.store().durable.iter().all(|b| *b == 0xFF));
}

#[test]
fn reset_restores_and_persists_defaults() {
    let mut rig = provisioned(MockHardware::new(), MemStore::new());
    rig.send_and_tick(&[0, 0, 0]);
    rig.send_and_tick(&RESET_SETTINGS);

    assert_eq!(*rig.app.settings(), Settings::default());
    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.app.feedback().settings_commit, Outcome::Success);

    let rebooted = Rig::with_store(MockHardware::new(), rig.store().reboot());
    assert_eq!(*rebooted.app.settings(), Settings::default());
}

#[test]
fn reset_while_provisioning_restarts_access_point() {
    let mut rig = provisioned(MockHardware::new(), MemStore::new());
    rig.hw.clear_calls();
    rig.send_and_tick(&RESET_SETTINGS);

    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert_eq!(rig.hw.calls, vec![RadioCall::ApStop, RadioCall::ApStart]);
    assert!(rig.hw.ap_active);
    assert_eq!(*rig.app.settings(), Settings::default());
}

#[test]
fn reset_while_syncing_restarts_with_defaults() {
    let mut rig = provisioned(MockHardware::new(), MemStore::new());
    rig.send_and_tick(&POLL_60_60);
    rig.hw.clear_calls();
    rig.send_and_tick(&RESET_SETTINGS);

    assert_eq!(rig.app.state(), StateId::Syncing);
    assert!(rig.hw.calls.contains(&RadioCall::JoinStart {
        ssid: "Wifi".into(),
        passphrase: None,
    }));
}

#[test]
fn manual_offset_overrides_named_zone() {
    let mut rig = Rig::new(MockHardware::new());
    rig.send_and_tick(&ENABLE_PROVISIONING);
    rig.hw.post_form("wifissid=Home&tz=2&tzoffset=%2B5");
    rig.tick();

    assert_eq!(rig.app.settings().timezone, TimezoneSelection::ManualOffset(5));
}

#[test]
fn utc_zone_projects_unchanged() {
    let mut rig = Rig::new(MockHardware::new().with_network("Home", None));
    rig.send_and_tick(&ENABLE_PROVISIONING);
    rig.hw.post_form("wifissid=Home&tzoffset=0");
    rig.tick();
    rig.send_and_tick(&POLL_60_60);
    rig.run_secs(3);
    assert!(rig.app.time_valid());

    let secs_of_day = rig.hw.wall_epoch.rem_euclid(86_400);
    let status = rig.read_status();
    assert_eq!(status[1] as i64, secs_of_day / 3600);
    assert_eq!(status[2] as i64, (secs_of_day % 3600) / 60);
    assert_eq!(status[3] as i64, secs_of_day % 60);
}
