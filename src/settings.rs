//! Persisted device settings: network credentials and timezone choice.
//!
//! # Layout
//!
//! The record lives in a byte-addressable store as two fixed-size shadow
//! slots.  A write always goes to the slot that does *not* hold the
//! current record, so a power loss mid-write leaves the previous record
//! intact.
//!
//! ```text
//!  slot (128 B)
//!  ┌───────┬─────┬──────────┬─────┬──────────────────┬──────────────┐
//!  │ magic │ ver │ seq (LE) │ len │ payload (≤ 80 B) │ SHA-256 (32) │
//!  │ 2 B   │ 1 B │ 4 B      │ 1 B │ postcard         │ over 0..88   │
//!  └───────┴─────┴──────────┴─────┴──────────────────┴──────────────┘
//! ```
//!
//! On load both slots are checked (magic, version, digest, decode, field
//! plausibility) and the valid one with the newer sequence number wins.
//! If neither is valid the compiled-in defaults are used.

use heapless::String;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::PersistentStore;
use crate::config::{DEFAULT_PASSPHRASE, DEFAULT_PROTECTED, DEFAULT_SSID};
use crate::error::{Error, Result};
use crate::timezone::TimezoneSelection;

/// Maximum SSID / passphrase length in bytes.
pub const MAX_CREDENTIAL_LEN: usize = 32;

const SLOT_COUNT: usize = 2;
const SLOT_SIZE: usize = 128;
const MAGIC: [u8; 2] = [0xC1, 0x0C];
const LAYOUT_VERSION: u8 = 1;

const HEADER_LEN: usize = 8;
const PAYLOAD_MAX: usize = 80;
const DIGEST_OFFSET: usize = HEADER_LEN + PAYLOAD_MAX;
const DIGEST_LEN: usize = 32;
const RECORD_LEN: usize = DIGEST_OFFSET + DIGEST_LEN;

/// Bytes of persistent store the settings need.
pub const STORE_FOOTPRINT: usize = SLOT_COUNT * SLOT_SIZE;

// ---------------------------------------------------------------------------
// Settings record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub ssid: String<MAX_CREDENTIAL_LEN>,
    pub passphrase: String<MAX_CREDENTIAL_LEN>,
    pub is_protected: bool,
    pub timezone: TimezoneSelection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ssid: bounded(DEFAULT_SSID),
            passphrase: bounded(DEFAULT_PASSPHRASE),
            is_protected: DEFAULT_PROTECTED,
            timezone: TimezoneSelection::default(),
        }
    }
}

impl Settings {
    /// Field plausibility.  Lengths are bounded by the string type; the
    /// timezone must point into the table.
    pub fn is_plausible(&self) -> bool {
        self.ssid.len() <= MAX_CREDENTIAL_LEN
            && self.passphrase.len() <= MAX_CREDENTIAL_LEN
            && self.timezone.is_valid()
    }

    /// Passphrase to hand the join driver: only for protected networks.
    pub fn join_passphrase(&self) -> Option<&str> {
        self.is_protected.then_some(self.passphrase.as_str())
    }
}

/// Copy `s` into a bounded string, truncating at a char boundary.
pub fn bounded(s: &str) -> String<MAX_CREDENTIAL_LEN> {
    let mut out = String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Shadow-copy settings store over a [`PersistentStore`].
pub struct SettingsStore<S: PersistentStore> {
    store: S,
    current: Settings,
    active_slot: Option<usize>,
    sequence: u32,
}

impl<S: PersistentStore> SettingsStore<S> {
    /// Load settings from `store`, falling back to defaults if it is
    /// empty or both slots are corrupt.
    pub fn new(store: S) -> Self {
        let mut this = Self {
            store,
            current: Settings::default(),
            active_slot: None,
            sequence: 0,
        };
        this.reload();
        this
    }

    /// Re-read both slots from the backing store.
    pub fn reload(&mut self) {
        let mut newest: Option<(usize, u32, Settings)> = None;
        for slot in 0..SLOT_COUNT {
            let Some((seq, settings)) = self.read_slot(slot) else {
                continue;
            };
            let newer = match &newest {
                None => true,
                Some((_, best, _)) => is_newer(seq, *best),
            };
            if newer {
                newest = Some((slot, seq, settings));
            }
        }

        match newest {
            Some((slot, seq, settings)) => {
                info!(
                    "Settings: loaded slot {} (seq {}, ssid '{}', protected={}, tz={:?})",
                    slot, seq, settings.ssid, settings.is_protected, settings.timezone
                );
                self.current = settings;
                self.active_slot = Some(slot);
                self.sequence = seq;
            }
            None => {
                info!("Settings: no valid record, using defaults");
                self.current = Settings::default();
                self.active_slot = None;
                self.sequence = 0;
            }
        }
    }

    /// The last successfully persisted settings (or the defaults).
    pub fn get(&self) -> &Settings {
        &self.current
    }

    /// Persist `settings` to the inactive slot and commit.
    ///
    /// On failure the previous record stays current, both in memory and
    /// on the store.
    pub fn put(&mut self, settings: Settings) -> Result<()> {
        if !settings.is_plausible() {
            return Err(Error::Config("settings failed plausibility check"));
        }

        let target = match self.active_slot {
            Some(slot) => (slot + 1) % SLOT_COUNT,
            None => 0,
        };
        let sequence = self.sequence.wrapping_add(1);
        let record = encode_record(&settings, sequence)?;

        self.store.write(target * SLOT_SIZE, &record)?;
        if let Err(e) = self.store.commit() {
            warn!("Settings: commit to slot {} failed: {}", target, e);
            return Err(e.into());
        }

        info!(
            "Settings: saved slot {} (seq {}, ssid '{}', passphrase {} bytes, protected={})",
            target,
            sequence,
            settings.ssid,
            settings.passphrase.len(),
            settings.is_protected
        );
        self.current = settings;
        self.active_slot = Some(target);
        self.sequence = sequence;
        Ok(())
    }

    /// Restore and persist the compiled-in defaults.
    pub fn reset(&mut self) -> Result<()> {
        self.put(Settings::default())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn read_slot(&self, slot: usize) -> Option<(u32, Settings)> {
        let mut buf = [0u8; RECORD_LEN];
        if let Err(e) = self.store.read(slot * SLOT_SIZE, &mut buf) {
            warn!("Settings: slot {} unreadable: {}", slot, e);
            return None;
        }
        decode_record(&buf)
    }
}

/// Serial-number comparison so the sequence may wrap.
fn is_newer(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

fn encode_record(settings: &Settings, sequence: u32) -> Result<[u8; RECORD_LEN]> {
    let mut record = [0u8; RECORD_LEN];
    let payload_len = postcard::to_slice(settings, &mut record[HEADER_LEN..DIGEST_OFFSET])
        .map_err(|_| Error::Config("settings payload exceeds slot"))?
        .len();

    record[0..2].copy_from_slice(&MAGIC);
    record[2] = LAYOUT_VERSION;
    record[3..7].copy_from_slice(&sequence.to_le_bytes());
    record[7] = payload_len as u8;

    let digest = hmac_sha256::Hash::hash(&record[..DIGEST_OFFSET]);
    record[DIGEST_OFFSET..].copy_from_slice(&digest);
    Ok(record)
}

fn decode_record(record: &[u8; RECORD_LEN]) -> Option<(u32, Settings)> {
    if record[0..2] != MAGIC || record[2] != LAYOUT_VERSION {
        return None;
    }
    let digest = hmac_sha256::Hash::hash(&record[..DIGEST_OFFSET]);
    if record[DIGEST_OFFSET..] != digest {
        return None;
    }

    let payload_len = record[7] as usize;
    if payload_len > PAYLOAD_MAX {
        return None;
    }
    let settings: Settings =
        postcard::from_bytes(&record[HEADER_LEN..HEADER_LEN + payload_len]).ok()?;
    if !settings.is_plausible() {
        return None;
    }

    let sequence = u32::from_le_bytes([record[3], record[4], record[5], record[6]]);
    Some((sequence, settings))
}
