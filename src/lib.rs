//! ClockClock sync module firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod feedback;
pub mod fsm;
pub mod protocol;
pub mod provisioning;
pub mod settings;
pub mod timezone;

pub mod pins;

// The adapters carry their own simulation backends, so host builds get
// the full tree.
pub mod adapters;
pub mod drivers;

#[cfg(target_os = "espidf")]
mod esp_link_shims;
