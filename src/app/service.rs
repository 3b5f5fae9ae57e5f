//! Application service, the hexagonal core.
//!
//! [`AppService`] owns the FSM, its shared context and the settings store.
//! All I/O flows through port traits passed in at each call, so the
//! integration tests drive it with mock hardware.
//!
//! ```text
//!       BusLink ──▶ ┌────────────────────────────┐ ──▶ EventSink
//!                   │         AppService         │
//!  AccessPointPort ◀│  FSM · Settings · Feedback │
//!  NetworkJoinPort ◀│                            │──▶ BusLink (status)
//!    TimeFetchPort ◀│                            │
//!        ClockPort ◀└────────────────────────────┘
//! ```
//!
//! Everything here runs in the polling context.  The only thing shared
//! with the frame-arrival context is the [`BusLink`].

use log::{info, warn};

use crate::config::{SystemConfig, TIME_SERVERS};
use crate::feedback::FeedbackState;
use crate::fsm::context::{FsmContext, RadioAction, SyncCompletion, SyncRequest, SyncSession};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::protocol::{BusLink, StatusSnapshot};
use crate::provisioning::ProvisioningError;
use crate::settings::{Settings, SettingsStore};
use crate::timezone;

use super::commands::{Command, MAX_TIMEOUT_SECS, MAX_VALIDITY_SECS, MIN_SYNC_SECS};
use super::events::AppEvent;
use super::ports::{
    AccessPointPort, ClockPort, EventSink, NetworkJoinPort, PersistentStore, TimeFetchPort,
};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService<S: PersistentStore> {
    fsm: Fsm,
    ctx: FsmContext,
    settings: SettingsStore<S>,
    tick_count: u64,
}

impl<S: PersistentStore> AppService<S> {
    /// Construct the service from configuration and the loaded settings.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, settings: SettingsStore<S>) -> Self {
        let ctx = FsmContext::new(config, settings.get().clone());
        let fsm = Fsm::new(build_state_table(), StateId::Idle);
        Self {
            fsm,
            ctx,
            settings,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Set the clock to the boot epoch and start the FSM in Idle.
    pub fn start(&mut self, clock: &mut impl ClockPort, sink: &mut impl EventSink) {
        clock.adjust(self.ctx.config.boot_epoch);
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("AppService started in {:?}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle:
    /// inputs → pending command → submissions → FSM → expiry → publish.
    ///
    /// `hw` implements every collaborator port.
    pub fn tick<H>(&mut self, hw: &mut H, link: &BusLink, sink: &mut impl EventSink)
    where
        H: AccessPointPort + NetworkJoinPort + TimeFetchPort + ClockPort,
    {
        self.tick_count += 1;

        // 1. Inputs, so a session started by the command sees this tick's uptime
        self.read_inputs(hw);

        // 2. At most one command per tick
        if let Some(cmd) = link.take_command() {
            self.handle_command(cmd, hw, sink);
            self.read_inputs(hw);
        }

        // 3. Credential submissions, only while the page is being served
        if self.fsm.current_state() == StateId::Provisioning {
            self.handle_submission(hw, sink);
        }

        // 4. FSM tick (pure state logic) and its collaborator actions
        let prev_state = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);
        self.apply_actions(hw, sink);
        if let Some(completion) = self.ctx.completion.take() {
            sink.emit(&match completion {
                SyncCompletion::Succeeded {
                    local,
                    valid_for_secs,
                } => AppEvent::SyncSucceeded {
                    local,
                    valid_for_secs,
                },
                SyncCompletion::TimedOut { joined } => AppEvent::SyncTimedOut { joined },
            });
        }
        self.emit_state_change(prev_state, sink);

        // 5. Validity decays regardless of state
        if self.ctx.expire_time_validity() {
            sink.emit(&AppEvent::TimeValidityExpired);
        }

        // 6. Publish for the frame-arrival context and the status page
        link.publish(self.status());
        AccessPointPort::publish_feedback(hw, &self.feedback());
    }

    // ── Command handling ──────────────────────────────────────

    /// The single transition operation for host commands.
    pub fn handle_command<H>(&mut self, cmd: Command, hw: &mut H, sink: &mut impl EventSink)
    where
        H: AccessPointPort + NetworkJoinPort + TimeFetchPort + ClockPort,
    {
        let prev_state = self.fsm.current_state();
        match cmd {
            Command::EnableProvisioning { enable: true } => {
                self.fsm.force_transition(StateId::Provisioning, &mut self.ctx);
            }
            Command::EnableProvisioning { enable: false } => {
                self.fsm.force_transition(StateId::Idle, &mut self.ctx);
            }
            Command::PollTime {
                timeout_secs,
                validity_secs,
            } => {
                self.ctx.request = SyncRequest {
                    timeout_secs: timeout_secs.clamp(MIN_SYNC_SECS, MAX_TIMEOUT_SECS),
                    validity_secs: validity_secs.clamp(MIN_SYNC_SECS, MAX_VALIDITY_SECS),
                };
                if prev_state == StateId::Syncing {
                    self.fsm.reenter(&mut self.ctx);
                } else {
                    self.fsm.force_transition(StateId::Syncing, &mut self.ctx);
                }
            }
            Command::ResetSettings => {
                self.reset_settings(sink);
                self.fsm.reenter(&mut self.ctx);
            }
        }
        sink.emit(&AppEvent::CommandApplied(cmd));
        self.apply_actions(hw, sink);
        self.emit_state_change(prev_state, sink);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Settings in force.
    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    pub fn settings_store(&self) -> &SettingsStore<S> {
        &self.settings
    }

    pub fn feedback(&self) -> FeedbackState {
        self.ctx.feedback.snapshot()
    }

    pub fn time_valid(&self) -> bool {
        self.ctx.time_valid()
    }

    pub fn session(&self) -> Option<SyncSession> {
        self.ctx.session
    }

    /// What a status read would report right now.
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            time_valid: self.ctx.time_valid(),
            syncing: self.fsm.current_state() == StateId::Syncing,
            local: timezone::project(self.ctx.inputs.now_utc, self.ctx.settings.timezone),
        }
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &SystemConfig {
        &self.ctx.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn read_inputs<H>(&mut self, hw: &H)
    where
        H: NetworkJoinPort + TimeFetchPort + ClockPort,
    {
        self.ctx.inputs.now_utc = hw.read_utc_epoch();
        self.ctx.inputs.uptime_secs = hw.uptime_secs();
        self.ctx.inputs.joined = hw.is_joined();
        self.ctx.inputs.fetch_running = hw.is_running();
    }

    /// Translate queued FSM actions into port calls, in order.
    fn apply_actions<H>(&mut self, hw: &mut H, sink: &mut impl EventSink)
    where
        H: AccessPointPort + NetworkJoinPort + TimeFetchPort + ClockPort,
    {
        let actions = core::mem::take(&mut self.ctx.actions);
        for action in actions {
            let result = match action {
                RadioAction::StartAccessPoint => AccessPointPort::start(hw),
                RadioAction::StopAccessPoint => {
                    AccessPointPort::stop(hw);
                    Ok(())
                }
                RadioAction::StartJoin => NetworkJoinPort::start(
                    hw,
                    &self.ctx.settings.ssid,
                    self.ctx.settings.join_passphrase(),
                ),
                RadioAction::StopJoin => {
                    hw.disconnect();
                    Ok(())
                }
                RadioAction::StartTimeFetch => TimeFetchPort::start(hw, &TIME_SERVERS),
                RadioAction::StopTimeFetch => {
                    TimeFetchPort::stop(hw);
                    Ok(())
                }
                RadioAction::ResetClock => {
                    hw.adjust(self.ctx.config.boot_epoch);
                    Ok(())
                }
            };
            if let Err(e) = result {
                warn!("{:?} failed: {}", action, e);
                sink.emit(&AppEvent::RadioFailed(e));
            }
        }
    }

    fn handle_submission(&mut self, hw: &mut impl AccessPointPort, sink: &mut impl EventSink) {
        let Some(submission) = hw.take_submission() else {
            return;
        };
        if let Err(e) = submission.validate() {
            sink.emit(&AppEvent::SubmissionRejected(e));
            hw.report_submission(Err(e));
            return;
        }

        let next = submission.into_settings(self.settings.get());
        let result = match self.settings.put(next) {
            Ok(()) => {
                self.ctx.settings = self.settings.get().clone();
                self.ctx.feedback.record_settings_commit(true);
                sink.emit(&AppEvent::SettingsSaved);
                Ok(())
            }
            Err(e) => {
                self.ctx.feedback.record_settings_commit(false);
                sink.emit(&AppEvent::SettingsCommitFailed(e));
                Err(ProvisioningError::StoreFailed)
            }
        };
        hw.report_submission(result);
    }

    fn reset_settings(&mut self, sink: &mut impl EventSink) {
        match self.settings.reset() {
            Ok(()) => {
                self.ctx.feedback.record_settings_commit(true);
                sink.emit(&AppEvent::SettingsSaved);
            }
            Err(e) => {
                self.ctx.feedback.record_settings_commit(false);
                sink.emit(&AppEvent::SettingsCommitFailed(e));
            }
        }
        self.ctx.settings = self.settings.get().clone();
    }

    fn emit_state_change(&self, prev_state: StateId, sink: &mut impl EventSink) {
        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }
    }
}
