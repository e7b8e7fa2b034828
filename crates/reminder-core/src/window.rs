//! Notification windows and calendar-day arithmetic.
//!
//! Everything here is pure: no store, no clock. Callers pass `now` and the
//! UTC offset in which calendar days are counted.

use chrono::{DateTime, FixedOffset, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ReminderError, Result};

pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Largest offset chrono accepts is just under a day; real zones stay within ±14h.
pub const MAX_OFFSET_MINUTES: i32 = 14 * 60;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// More than a month away.
    None,
    Month,
    Week,
    ThreeDays,
    OneDay,
    Today,
    /// Target date has passed.
    Expired,
}

impl Stage {
    /// Map an adjusted day count onto its window. Total over `i64`.
    pub fn for_days(days: i64) -> Stage {
        match days {
            8..=30 => Stage::Month,
            4..=7 => Stage::Week,
            2..=3 => Stage::ThreeDays,
            1 => Stage::OneDay,
            0 => Stage::Today,
            d if d < 0 => Stage::Expired,
            _ => Stage::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::None => "none",
            Stage::Month => "month",
            Stage::Week => "week",
            Stage::ThreeDays => "three_days",
            Stage::OneDay => "one_day",
            Stage::Today => "today",
            Stage::Expired => "expired",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Day counting
// ---------------------------------------------------------------------------

/// Whole calendar days from `now` until `target`, counted in `offset`.
///
/// Starts from the elapsed-time day count (rounded toward the earlier day),
/// then adds one when the calendar-date difference disagrees. That happens
/// whenever the target's time of day is earlier than now's, so a target at
/// 23:59 tomorrow and one at 08:00 tomorrow are both one day away.
/// Negative results mean the target is in the past.
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>, offset: &FixedOffset) -> i64 {
    let elapsed_ms = (target - now).num_milliseconds();
    let mut days = elapsed_ms.div_euclid(MS_PER_DAY);

    let calendar = (target.with_timezone(offset).date_naive()
        - now.with_timezone(offset).date_naive())
    .num_days();
    if calendar != days {
        days += 1;
    }
    days
}

/// Classify a target date relative to `now`.
pub fn classify(target: DateTime<Utc>, now: DateTime<Utc>, offset: &FixedOffset) -> Stage {
    Stage::for_days(days_until(target, now, offset))
}

/// Same month, day, and local time one year later. Feb 29 lands on Feb 28.
pub fn add_one_year(target: DateTime<Utc>, offset: &FixedOffset) -> Result<DateTime<Utc>> {
    target
        .with_timezone(offset)
        .checked_add_months(Months::new(12))
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ReminderError::DateOutOfRange(target.to_rfc3339()))
}

pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset> {
    if minutes.abs() > MAX_OFFSET_MINUTES {
        return Err(ReminderError::InvalidOffset(minutes));
    }
    FixedOffset::east_opt(minutes * 60).ok_or(ReminderError::InvalidOffset(minutes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
