//! Command and status frame codec.
//!
//! Command frame (host → module):
//! ```text
//! ┌────────┬──────────────────┬──────────┐
//! │ cmd id │ payload (0..4 B) │ checksum │
//! └────────┴──────────────────┴──────────┘
//! ```
//!
//! | id | command            | payload                         | total |
//! |----|--------------------|---------------------------------|-------|
//! | 0  | EnableProvisioning | enable (0 / non-zero)           | 3     |
//! | 1  | PollTime           | timeout u16 LE, validity u16 LE | 6     |
//! | 2  | ResetSettings      | none                            | 2     |
//!
//! Status frame (module → host), always 5 bytes:
//! `[flags, hour, minute, second, checksum]` with flags bit0 = time valid,
//! bit1 = syncing.
//!
//! The checksum is the 8-bit sum of every preceding byte.

use crate::app::commands::Command;
use crate::error::FrameError;
use crate::timezone::LocalTime;

pub const MIN_FRAME_LEN: usize = 2;
pub const MAX_FRAME_LEN: usize = 6;
pub const STATUS_FRAME_LEN: usize = 5;

pub const CMD_ENABLE_PROVISIONING: u8 = 0;
pub const CMD_POLL_TIME: u8 = 1;
pub const CMD_RESET_SETTINGS: u8 = 2;

const FLAG_TIME_VALID: u8 = 1 << 0;
const FLAG_SYNCING: u8 = 1 << 1;

/// Additive 8-bit checksum.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Validate and decode one command frame.
///
/// Out-of-range `PollTime` values are clamped, not rejected.
pub fn decode_command(frame: &[u8]) -> Result<Command, FrameError> {
    if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&frame.len()) {
        return Err(FrameError::BadLength(frame.len()));
    }
    let (body, trailer) = frame.split_at(frame.len() - 1);
    let expected = checksum(body);
    if trailer[0] != expected {
        return Err(FrameError::BadChecksum {
            expected,
            found: trailer[0],
        });
    }

    let id = body[0];
    let payload = &body[1..];
    let mismatch = FrameError::PayloadMismatch {
        id,
        len: frame.len(),
    };
    match id {
        CMD_ENABLE_PROVISIONING => match payload {
            [enable] => Ok(Command::EnableProvisioning { enable: *enable != 0 }),
            _ => Err(mismatch),
        },
        CMD_POLL_TIME => match payload {
            [t0, t1, v0, v1] => Ok(Command::poll_time(
                u16::from_le_bytes([*t0, *t1]),
                u16::from_le_bytes([*v0, *v1]),
            )),
            _ => Err(mismatch),
        },
        CMD_RESET_SETTINGS => match payload {
            [] => Ok(Command::ResetSettings),
            _ => Err(mismatch),
        },
        other => Err(FrameError::UnknownCommand(other)),
    }
}

/// Host-side encoding of a command, checksum included.
pub fn encode_command(command: &Command) -> heapless::Vec<u8, MAX_FRAME_LEN> {
    let mut body = [0u8; MAX_FRAME_LEN - 1];
    let len = match *command {
        Command::EnableProvisioning { enable } => {
            body[..2].copy_from_slice(&[CMD_ENABLE_PROVISIONING, enable as u8]);
            2
        }
        Command::PollTime {
            timeout_secs,
            validity_secs,
        } => {
            body[0] = CMD_POLL_TIME;
            body[1..3].copy_from_slice(&timeout_secs.to_le_bytes());
            body[3..5].copy_from_slice(&validity_secs.to_le_bytes());
            5
        }
        Command::ResetSettings => {
            body[0] = CMD_RESET_SETTINGS;
            1
        }
    };
    let cs = checksum(&body[..len]);
    // `body` is one byte shorter than the longest frame, so the checksum
    // always fits.
    let mut frame: heapless::Vec<u8, MAX_FRAME_LEN> = body[..len].iter().copied().collect();
    let pushed = frame.push(cs);
    debug_assert!(pushed.is_ok(), "command frame longer than MAX_FRAME_LEN");
    frame
}

/// Everything the status reply is rendered from.  Published by the
/// polling context; the frame-arrival context only encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    pub time_valid: bool,
    pub syncing: bool,
    pub local: LocalTime,
}

pub fn encode_status(status: &StatusSnapshot) -> [u8; STATUS_FRAME_LEN] {
    let mut flags = 0;
    if status.time_valid {
        flags |= FLAG_TIME_VALID;
    }
    if status.syncing {
        flags |= FLAG_SYNCING;
    }
    let mut frame = [
        flags,
        status.local.hour,
        status.local.minute,
        status.local.second,
        0,
    ];
    frame[4] = checksum(&frame[..4]);
    frame
}
