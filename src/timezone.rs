//! Local wall-time projection.
//!
//! Zones are a flat, compiled-in table.  Each entry holds two sub-rules,
//! daylight and standard, in the classic "nth weekday of month at hour"
//! form:
//!
//! ```text
//!  index │ daylight sub-rule           │ standard sub-rule
//!  ──────┼─────────────────────────────┼─────────────────────────────
//!    0   │ CEST last Sun Mar 02:00 +120│ CET  last Sun Oct 03:00 +60
//!    1   │ BST  last Sun Mar 01:00 +60 │ GMT  last Sun Oct 02:00 +0
//!   ...  │                             │
//! ```
//!
//! A sub-rule's hour is local time as observed *before* the transition, so
//! the daylight start is converted to UTC with the standard offset and the
//! standard start with the daylight offset.

use chrono::{DateTime, Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

const SECS_PER_DAY: i64 = 86_400;

/// Bounds for a manual UTC offset, in whole hours.
pub const MIN_MANUAL_OFFSET_HOURS: i8 = -12;
pub const MAX_MANUAL_OFFSET_HOURS: i8 = 14;

/// How the device turns UTC into local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimezoneSelection {
    /// Index into [`ZONES`].
    NamedZone(u8),
    /// Fixed offset from UTC in hours, no daylight saving.
    ManualOffset(i8),
}

impl Default for TimezoneSelection {
    fn default() -> Self {
        Self::NamedZone(0)
    }
}

impl TimezoneSelection {
    /// `false` for an out-of-table index or an impossible offset.
    pub fn is_valid(self) -> bool {
        match self {
            Self::NamedZone(idx) => (idx as usize) < ZONES.len(),
            Self::ManualOffset(h) => (MIN_MANUAL_OFFSET_HOURS..=MAX_MANUAL_OFFSET_HOURS).contains(&h),
        }
    }
}

/// Which occurrence of the weekday within the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Week {
    First = 1,
    Second = 2,
    Third = 3,
    Fourth = 4,
    Last = 0,
}

/// One half of a zone: when it starts and what offset it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub abbrev: &'static str,
    pub week: Week,
    pub weekday: Weekday,
    /// 1–12.
    pub month: u32,
    /// Local hour of the transition, 0–23.
    pub hour: u32,
    /// Offset from UTC in minutes while this rule is in effect.
    pub offset_minutes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneRule {
    pub name: &'static str,
    pub daylight: TransitionRule,
    pub standard: TransitionRule,
}

const fn rule(
    abbrev: &'static str,
    week: Week,
    weekday: Weekday,
    month: u32,
    hour: u32,
    offset_minutes: i32,
) -> TransitionRule {
    TransitionRule {
        abbrev,
        week,
        weekday,
        month,
        hour,
        offset_minutes,
    }
}

/// The compiled zone table.  Index 0 is the factory default.
pub static ZONES: [ZoneRule; 10] = [
    ZoneRule {
        name: "Central European",
        daylight: rule("CEST", Week::Last, Weekday::Sun, 3, 2, 120),
        standard: rule("CET", Week::Last, Weekday::Sun, 10, 3, 60),
    },
    ZoneRule {
        name: "United Kingdom",
        daylight: rule("BST", Week::Last, Weekday::Sun, 3, 1, 60),
        standard: rule("GMT", Week::Last, Weekday::Sun, 10, 2, 0),
    },
    ZoneRule {
        name: "Eastern European",
        daylight: rule("EEST", Week::Last, Weekday::Sun, 3, 3, 180),
        standard: rule("EET", Week::Last, Weekday::Sun, 10, 4, 120),
    },
    ZoneRule {
        name: "US Eastern",
        daylight: rule("EDT", Week::Second, Weekday::Sun, 3, 2, -240),
        standard: rule("EST", Week::First, Weekday::Sun, 11, 2, -300),
    },
    ZoneRule {
        name: "US Central",
        daylight: rule("CDT", Week::Second, Weekday::Sun, 3, 2, -300),
        standard: rule("CST", Week::First, Weekday::Sun, 11, 2, -360),
    },
    ZoneRule {
        name: "US Mountain",
        daylight: rule("MDT", Week::Second, Weekday::Sun, 3, 2, -360),
        standard: rule("MST", Week::First, Weekday::Sun, 11, 2, -420),
    },
    ZoneRule {
        name: "US Arizona",
        daylight: rule("MST", Week::First, Weekday::Sun, 1, 0, -420),
        standard: rule("MST", Week::First, Weekday::Sun, 1, 0, -420),
    },
    ZoneRule {
        name: "US Pacific",
        daylight: rule("PDT", Week::Second, Weekday::Sun, 3, 2, -420),
        standard: rule("PST", Week::First, Weekday::Sun, 11, 2, -480),
    },
    ZoneRule {
        name: "Australia Eastern",
        daylight: rule("AEDT", Week::First, Weekday::Sun, 10, 2, 660),
        standard: rule("AEST", Week::First, Weekday::Sun, 4, 3, 600),
    },
    ZoneRule {
        name: "UTC",
        daylight: rule("UTC", Week::First, Weekday::Sun, 1, 0, 0),
        standard: rule("UTC", Week::First, Weekday::Sun, 1, 0, 0),
    },
];

/// Local wall time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl LocalTime {
    fn from_local_epoch(local: i64) -> Self {
        let secs_of_day = local.rem_euclid(SECS_PER_DAY);
        Self {
            hour: (secs_of_day / 3600) as u8,
            minute: ((secs_of_day % 3600) / 60) as u8,
            second: (secs_of_day % 60) as u8,
        }
    }
}

impl core::fmt::Display for LocalTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Project `utc` (epoch seconds) into local wall time.
///
/// An invalid selection falls back to zone 0; the settings layer never
/// hands one out, so this only guards against a future table shrink.
pub fn project(utc: i64, selection: TimezoneSelection) -> LocalTime {
    LocalTime::from_local_epoch(utc + i64::from(offset_minutes(utc, selection)) * 60)
}

/// Offset from UTC in minutes in effect at `utc`.
pub fn offset_minutes(utc: i64, selection: TimezoneSelection) -> i32 {
    match selection {
        TimezoneSelection::ManualOffset(h) => i32::from(h) * 60,
        TimezoneSelection::NamedZone(idx) => {
            let zone = ZONES.get(idx as usize).unwrap_or(&ZONES[0]);
            active_rule(zone, utc).offset_minutes
        }
    }
}

/// The sub-rule of `zone` in effect at `utc`.
pub fn active_rule(zone: &ZoneRule, utc: i64) -> &TransitionRule {
    let Some(year) = DateTime::from_timestamp(utc, 0).map(|dt| dt.year()) else {
        return &zone.standard;
    };
    let (Some(dst_local), Some(std_local)) = (
        transition_local(&zone.daylight, year),
        transition_local(&zone.standard, year),
    ) else {
        return &zone.standard;
    };

    let dst_start = dst_local - i64::from(zone.standard.offset_minutes) * 60;
    let std_start = std_local - i64::from(zone.daylight.offset_minutes) * 60;

    let in_daylight = if dst_start < std_start {
        // Northern hemisphere: daylight sits inside the calendar year.
        utc >= dst_start && utc < std_start
    } else {
        // Southern hemisphere: daylight wraps the new year.
        !(utc >= std_start && utc < dst_start)
    };

    if in_daylight { &zone.daylight } else { &zone.standard }
}

/// Epoch seconds of the rule's transition, read as if local time were UTC.
fn transition_local(rule: &TransitionRule, year: i32) -> Option<i64> {
    let date = match rule.week {
        Week::Last => last_weekday_of_month(year, rule.month, rule.weekday)?,
        week => NaiveDate::from_weekday_of_month_opt(year, rule.month, rule.weekday, week as u8)?,
    };
    Some(date.and_hms_opt(rule.hour, 0, 0)?.and_utc().timestamp())
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let mut day = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    while day.weekday() != weekday {
        day = day.pred_opt()?;
    }
    Some(day)
}
