//! Host bus protocol.
//!
//! ```text
//!  host ──frame──▶ BusTransport ──▶ BusLink::on_receive ──▶ command slot
//!                                                              │
//!                                         AppService::tick ◀───┘
//!                                                │
//!  host ◀─status── BusTransport ◀── BusLink::on_request ◀── published snapshot
//! ```
//!
//! [`codec`] is pure byte work.  [`mailbox`] is the only state the
//! frame-arrival context touches.  [`transport`] abstracts the physical
//! bus so the link can be driven from tests.

pub mod codec;
pub mod mailbox;
pub mod transport;

pub use codec::{StatusSnapshot, checksum, decode_command, encode_command, encode_status};
pub use mailbox::{BUS_LINK, BusLink};
pub use transport::{BusTransport, NullTransport, pump};
