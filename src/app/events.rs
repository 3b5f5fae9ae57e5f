//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; the firmware logs them to serial.

use crate::app::commands::Command;
use crate::app::ports::ConnectivityError;
use crate::error::Error;
use crate::fsm::StateId;
use crate::provisioning::ProvisioningError;
use crate::timezone::LocalTime;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// A host command was drained from the mailbox and applied.
    CommandApplied(Command),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// The clock passed the known-valid threshold within the session.
    SyncSucceeded { local: LocalTime, valid_for_secs: u16 },

    /// The session deadline passed first.
    SyncTimedOut { joined: bool },

    /// The validity window of the last fetch has run out.
    TimeValidityExpired,

    /// A settings record was committed.
    SettingsSaved,

    /// A settings write did not reach the store.
    SettingsCommitFailed(Error),

    /// A credential submission failed validation.
    SubmissionRejected(ProvisioningError),

    /// A collaborator refused to start.
    RadioFailed(ConnectivityError),
}
