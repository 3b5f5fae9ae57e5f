//! Outcome tracking for the asynchronous attempts the device makes.
//!
//! The tracker remembers how the last network join and the last time fetch
//! ended, plus whether the last settings commit reached flash.  It is only
//! written at the end of a sync session (success or timeout) or after a
//! settings write; a manually cancelled sync leaves it untouched.

use serde::Serialize;

/// Last-known result of an asynchronous attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Outcome {
    Success,
    Failure,
    #[default]
    NotAttempted,
}

impl Outcome {
    pub fn from_bool(ok: bool) -> Self {
        if ok { Self::Success } else { Self::Failure }
    }
}

/// Snapshot handed read-only to the provisioning UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FeedbackState {
    pub network_join: Outcome,
    pub time_fetch: Outcome,
    pub settings_commit: Outcome,
}

/// Owner of the feedback outcomes.  Only the polling context holds one.
#[derive(Debug, Default)]
pub struct FeedbackTracker {
    state: FeedbackState,
}

impl FeedbackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sync session ended on its own: the fetch succeeded.
    ///
    /// The join is marked too, since a server answer implies the link came up.
    pub fn record_sync_success(&mut self) {
        self.state.network_join = Outcome::Success;
        self.state.time_fetch = Outcome::Success;
    }

    /// Sync session ended on its own: the deadline passed.
    pub fn record_sync_timeout(&mut self, joined_this_session: bool) {
        self.state.network_join = Outcome::from_bool(joined_this_session);
        self.state.time_fetch = Outcome::Failure;
    }

    pub fn record_settings_commit(&mut self, ok: bool) {
        self.state.settings_commit = Outcome::from_bool(ok);
    }

    pub fn snapshot(&self) -> FeedbackState {
        self.state
    }
}
