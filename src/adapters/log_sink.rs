//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::CommandApplied(cmd) => {
                info!("CMD | {:?}", cmd);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::SyncSucceeded {
                local,
                valid_for_secs,
            } => {
                info!("SYNC | success, local time {} (valid {}s)", local, valid_for_secs);
            }
            AppEvent::SyncTimedOut { joined } => {
                warn!(
                    "SYNC | timed out ({})",
                    if *joined { "joined, no time" } else { "network not reached" }
                );
            }
            AppEvent::TimeValidityExpired => {
                info!("SYNC | time validity expired");
            }
            AppEvent::SettingsSaved => {
                info!("SETTINGS | committed");
            }
            AppEvent::SettingsCommitFailed(e) => {
                warn!("SETTINGS | commit failed: {}", e);
            }
            AppEvent::SubmissionRejected(e) => {
                warn!("SETTINGS | submission rejected: {}", e);
            }
            AppEvent::RadioFailed(e) => {
                warn!("RADIO | {}", e);
            }
        }
    }
}
