//! Application core: domain logic with no I/O of its own.
//!
//! This module contains the business rules for the sync module: command
//! handling, mode arbitration between provisioning and time sync, settings
//! persistence and status publication.  All interaction with the radio,
//! clock and flash happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
