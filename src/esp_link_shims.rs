//! `critical-section` 1.x implementation for ESP-IDF.
//!
//! `embassy-sync` guards [`crate::protocol::BusLink`] with a critical
//! section, and the link is shared between the `i2c-pump` thread and the
//! control loop.  Here the section is one process-wide mutex, re-entrant
//! per thread: only the outermost acquire locks and only the matching
//! release unlocks.

use core::cell::RefCell;
use std::sync::{Mutex, MutexGuard, PoisonError};

static BUS_SECTION: Mutex<()> = Mutex::new(());

/// Nesting depth plus the guard held while depth > 0.
struct Held {
    depth: u8,
    guard: Option<MutexGuard<'static, ()>>,
}

thread_local! {
    static HELD: RefCell<Held> = const { RefCell::new(Held { depth: 0, guard: None }) };
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    HELD.with(|held| {
        let mut held = held.borrow_mut();
        if held.depth == 0 {
            held.guard = Some(BUS_SECTION.lock().unwrap_or_else(PoisonError::into_inner));
        }
        held.depth = held.depth.saturating_add(1);
        held.depth
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    HELD.with(|held| {
        let mut held = held.borrow_mut();
        match held.depth {
            0 => {}
            1 => {
                held.depth = 0;
                held.guard = None;
            }
            _ => held.depth -= 1,
        }
    })
}
