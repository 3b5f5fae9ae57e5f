//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  It holds the latest collaborator readings, the settings in
//! force, the sync session, the time-validity window, feedback outcomes
//! and the ordered list of collaborator actions the service applies after
//! each handler run.  Think of it as the "blackboard" in a blackboard
//! architecture.

use heapless::Vec;
use log::warn;

use crate::config::SystemConfig;
use crate::feedback::FeedbackTracker;
use crate::settings::Settings;
use crate::timezone::LocalTime;

// ---------------------------------------------------------------------------
// Input snapshot (read-only to state handlers; written by the service)
// ---------------------------------------------------------------------------

/// Collaborator readings taken once per tick, before the FSM runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncInputs {
    /// Hardware clock, UTC epoch seconds.
    pub now_utc: i64,
    /// Monotonic seconds since boot.
    pub uptime_secs: u64,
    /// Station reports an established link.
    pub joined: bool,
    /// Time-fetch client is running.
    pub fetch_running: bool,
}

// ---------------------------------------------------------------------------
// Collaborator actions (written by state handlers; applied by the service)
// ---------------------------------------------------------------------------

/// Start/stop requests for the radio, time fetch and clock.
///
/// Applied strictly in push order, so an exit handler's teardown always
/// lands before the next state's setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioAction {
    StartAccessPoint,
    StopAccessPoint,
    /// Join the network named in the current settings.
    StartJoin,
    StopJoin,
    StartTimeFetch,
    StopTimeFetch,
    /// Set the hardware clock back to the boot epoch.
    ResetClock,
}

/// Worst case per phase is an exit plus an enter: 2 + 3.
pub const MAX_PENDING_ACTIONS: usize = 8;

// ---------------------------------------------------------------------------
// Sync bookkeeping
// ---------------------------------------------------------------------------

/// Parameters of the most recent `PollTime`, already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRequest {
    pub timeout_secs: u16,
    pub validity_secs: u16,
}

impl Default for SyncRequest {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            validity_secs: 60,
        }
    }
}

/// Exists only while Syncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSession {
    /// Uptime at session start.
    pub started_at: u64,
    pub timeout_secs: u16,
    pub validity_secs: u16,
    pub joined_this_session: bool,
    pub fetch_started: bool,
}

impl SyncSession {
    pub fn elapsed_secs(&self, uptime_secs: u64) -> u64 {
        uptime_secs.saturating_sub(self.started_at)
    }
}

/// How a session ended when the device ended it itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCompletion {
    Succeeded { local: LocalTime, valid_for_secs: u16 },
    TimedOut { joined: bool },
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,

    // -- Inputs --
    /// Latest collaborator readings.  Updated before each FSM tick.
    pub inputs: SyncInputs,

    // -- Domain state --
    /// Settings currently in force (mirror of the store's record).
    pub settings: Settings,
    /// Applied when Syncing is (re-)entered.
    pub request: SyncRequest,
    pub session: Option<SyncSession>,
    /// Uptime after which the fetched time is no longer trusted.
    pub time_valid_until: Option<u64>,
    pub feedback: FeedbackTracker,
    /// Set by the Syncing handler when it ends a session on its own;
    /// drained by the service.
    pub completion: Option<SyncCompletion>,

    // -- Outputs --
    /// Collaborator actions to apply after the handler returns.
    pub actions: Vec<RadioAction, MAX_PENDING_ACTIONS>,

    // -- Configuration --
    pub config: SystemConfig,
}

impl FsmContext {
    /// Create a new context with the given configuration and the settings
    /// loaded at boot.
    pub fn new(config: SystemConfig, settings: Settings) -> Self {
        Self {
            ticks_in_state: 0,
            inputs: SyncInputs::default(),
            settings,
            request: SyncRequest::default(),
            session: None,
            time_valid_until: None,
            feedback: FeedbackTracker::new(),
            completion: None,
            actions: Vec::new(),
            config,
        }
    }

    /// Queue a collaborator action.
    pub fn push_action(&mut self, action: RadioAction) {
        if self.actions.push(action).is_err() {
            warn!("FSM: action queue full, dropping {:?}", action);
        }
    }

    /// Whether fetched time is currently trusted, judged against the
    /// uptime of the last input snapshot.
    pub fn time_valid(&self) -> bool {
        self.time_valid_until
            .is_some_and(|until| self.inputs.uptime_secs <= until)
    }

    /// Clear the validity window once it has passed.  Returns `true` if it
    /// was cleared by this call.
    pub fn expire_time_validity(&mut self) -> bool {
        match self.time_valid_until {
            Some(until) if self.inputs.uptime_secs > until => {
                self.time_valid_until = None;
                true
            }
            _ => false,
        }
    }
}
