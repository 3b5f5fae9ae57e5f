//! Credential submissions from the provisioning page.
//!
//! The request server hands over the raw `application/x-www-form-urlencoded`
//! body of a `POST /credentials`.  [`parse_form`] decodes it into a
//! [`CredentialSubmission`], [`CredentialSubmission::validate`] applies the
//! acceptance rules, and [`CredentialSubmission::into_settings`] produces the
//! complete record the settings store persists.
//!
//! Form fields:
//!
//! | field          | meaning                                         |
//! |----------------|-------------------------------------------------|
//! | `wifissid`     | network name, 1..=32 printable ASCII bytes      |
//! | `wifipass`     | passphrase, ≤ 32 bytes, ≥ 8 when protected     |
//! | `is_protected` | checkbox; present (and not `0`/`off`) = true    |
//! | `tz`           | optional named-zone index                       |
//! | `tzoffset`     | optional manual UTC offset in hours (wins)      |

use core::fmt;

use heapless::{String, Vec};

use crate::settings::{MAX_CREDENTIAL_LEN, Settings};
use crate::timezone::TimezoneSelection;

/// WPA2 minimum passphrase length.
pub const MIN_PROTECTED_PASSPHRASE_LEN: usize = 8;

/// Why a submission was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningError {
    MalformedForm,
    MissingSsid,
    SsidTooLong,
    SsidNotPrintable,
    PassphraseTooLong,
    PassphraseTooShort,
    InvalidTimezone,
    /// Validated but the settings store could not commit it.
    StoreFailed,
}

impl fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedForm => write!(f, "form body could not be decoded"),
            Self::MissingSsid => write!(f, "network name is required"),
            Self::SsidTooLong => write!(f, "network name longer than 32 bytes"),
            Self::SsidNotPrintable => write!(f, "network name must be printable ASCII"),
            Self::PassphraseTooLong => write!(f, "passphrase longer than 32 bytes"),
            Self::PassphraseTooShort => {
                write!(f, "protected networks need a passphrase of at least 8 characters")
            }
            Self::InvalidTimezone => write!(f, "timezone selection out of range"),
            Self::StoreFailed => write!(f, "settings could not be saved"),
        }
    }
}

/// Credentials as submitted, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSubmission {
    pub ssid: String<MAX_CREDENTIAL_LEN>,
    pub passphrase: String<MAX_CREDENTIAL_LEN>,
    pub is_protected: bool,
    /// `None` keeps the current timezone.
    pub timezone: Option<TimezoneSelection>,
}

impl CredentialSubmission {
    pub fn validate(&self) -> Result<(), ProvisioningError> {
        if self.ssid.is_empty() {
            return Err(ProvisioningError::MissingSsid);
        }
        if !is_printable_ascii(&self.ssid) {
            return Err(ProvisioningError::SsidNotPrintable);
        }
        if self.is_protected && self.passphrase.len() < MIN_PROTECTED_PASSPHRASE_LEN {
            return Err(ProvisioningError::PassphraseTooShort);
        }
        match self.timezone {
            Some(tz) if !tz.is_valid() => Err(ProvisioningError::InvalidTimezone),
            _ => Ok(()),
        }
    }

    /// Full record to persist; fields not carried by the form come from
    /// `current`.
    pub fn into_settings(self, current: &Settings) -> Settings {
        Settings {
            ssid: self.ssid,
            passphrase: self.passphrase,
            is_protected: self.is_protected,
            timezone: self.timezone.unwrap_or(current.timezone),
        }
    }
}

/// Decode a urlencoded `POST /credentials` body.
///
/// Length limits are enforced here since the bounded strings cannot hold
/// an over-long value.  Unknown fields are ignored.
pub fn parse_form(body: &str) -> Result<CredentialSubmission, ProvisioningError> {
    let mut ssid = None;
    let mut passphrase = String::new();
    let mut is_protected = false;
    let mut zone = None;
    let mut offset = None;

    for pair in body.split('&').filter(|p| !p.is_empty()) {
        let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "wifissid" => {
                ssid = Some(decode_field(raw).map_err(|e| e.or(ProvisioningError::SsidTooLong))?);
            }
            "wifipass" => {
                passphrase =
                    decode_field(raw).map_err(|e| e.or(ProvisioningError::PassphraseTooLong))?;
            }
            "is_protected" => {
                is_protected = !matches!(raw, "0" | "off" | "false");
            }
            "tz" if !raw.is_empty() => {
                let idx = raw.parse::<u8>().map_err(|_| ProvisioningError::InvalidTimezone)?;
                zone = Some(TimezoneSelection::NamedZone(idx));
            }
            "tzoffset" if !raw.is_empty() => {
                let raw = raw.strip_prefix("%2B").unwrap_or(raw);
                let hours = raw.parse::<i8>().map_err(|_| ProvisioningError::InvalidTimezone)?;
                offset = Some(TimezoneSelection::ManualOffset(hours));
            }
            _ => {}
        }
    }

    Ok(CredentialSubmission {
        ssid: ssid.ok_or(ProvisioningError::MissingSsid)?,
        passphrase,
        is_protected,
        timezone: offset.or(zone),
    })
}

enum FieldError {
    Malformed,
    TooLong,
}

impl FieldError {
    fn or(self, too_long: ProvisioningError) -> ProvisioningError {
        match self {
            Self::Malformed => ProvisioningError::MalformedForm,
            Self::TooLong => too_long,
        }
    }
}

/// Percent-decode one form value (`+` is a space).
fn decode_field<const N: usize>(raw: &str) -> Result<String<N>, FieldError> {
    let mut bytes: Vec<u8, N> = Vec::new();
    let mut input = raw.bytes();
    while let Some(b) = input.next() {
        let decoded = match b {
            b'+' => b' ',
            b'%' => {
                let hi = input.next().and_then(hex_value).ok_or(FieldError::Malformed)?;
                let lo = input.next().and_then(hex_value).ok_or(FieldError::Malformed)?;
                (hi << 4) | lo
            }
            other => other,
        };
        bytes.push(decoded).map_err(|_| FieldError::TooLong)?;
    }
    String::from_utf8(bytes).map_err(|_| FieldError::Malformed)
}

/// Network names are limited to `0x20..=0x7E`.
pub(crate) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
