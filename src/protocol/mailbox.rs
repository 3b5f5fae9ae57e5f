//! The frame-arrival context's entire view of the device.
//!
//! ```text
//! ┌───────────────────┐ Command (last write wins) ┌────────────────┐
//! │ frame-arrival ctx │──────────────────────────▶│  control loop  │
//! │ (bus callback)    │◀──────────────────────────│  (AppService)  │
//! └───────────────────┘   StatusSnapshot (copy)   └────────────────┘
//! ```
//!
//! The callback side only decodes into the command slot and encodes the
//! last published snapshot.  It never reads or writes settings, feedback
//! or the device state.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::debug;

use super::codec::{STATUS_FRAME_LEN, StatusSnapshot, decode_command, encode_status};
use crate::app::commands::Command;
use crate::error::FrameError;
use crate::timezone::LocalTime;

const IDLE_STATUS: StatusSnapshot = StatusSnapshot {
    time_valid: false,
    syncing: false,
    local: LocalTime {
        hour: 0,
        minute: 0,
        second: 0,
    },
};

/// Shared by the bus callback and the control loop.
pub struct BusLink {
    pending: Signal<CriticalSectionRawMutex, Command>,
    status: Mutex<CriticalSectionRawMutex, Cell<StatusSnapshot>>,
    rejected: AtomicU32,
}

/// The link the firmware binary wires between the bus adapter and the
/// service.
pub static BUS_LINK: BusLink = BusLink::new();

impl BusLink {
    pub const fn new() -> Self {
        Self {
            pending: Signal::new(),
            status: Mutex::new(Cell::new(IDLE_STATUS)),
            rejected: AtomicU32::new(0),
        }
    }

    // -- frame-arrival context --

    /// A command frame arrived.  Valid commands replace any undrained one;
    /// invalid frames are counted and otherwise ignored.
    pub fn on_receive(&self, frame: &[u8]) -> Result<(), FrameError> {
        match decode_command(frame) {
            Ok(command) => {
                self.pending.signal(command);
                Ok(())
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                debug!("BUS | dropped frame {:02x?}: {}", frame, e);
                Err(e)
            }
        }
    }

    /// The host is reading status.
    pub fn on_request(&self) -> [u8; STATUS_FRAME_LEN] {
        encode_status(&self.status())
    }

    // -- polling context --

    /// Drain the command slot.
    pub fn take_command(&self) -> Option<Command> {
        self.pending.try_take()
    }

    /// Replace the snapshot status reads are rendered from.
    pub fn publish(&self, status: StatusSnapshot) {
        self.status.lock(|cell| cell.set(status));
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.lock(Cell::get)
    }

    /// Frames dropped since boot.
    pub fn rejected_frames(&self) -> u32 {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl Default for BusLink {
    fn default() -> Self {
        Self::new()
    }
}
