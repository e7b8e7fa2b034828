//! Per-reminder decision for one scheduling pass.
//!
//! `decide` is pure: given a reminder and the current time it says what the
//! pass should do. Applying the action (sending, saving, deleting) happens in
//! the scheduler crate.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::types::Reminder;
use crate::window::{days_until, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Nothing due, or the current window was already notified.
    Skip,
    /// Deliver the notification for `stage`; `days` is the adjusted day count.
    Notify { stage: Stage, days: i64 },
    /// Non-recurring reminder whose target date has passed.
    Delete,
    /// Recurring reminder whose target date passed without a successful
    /// "today" notification: re-arm it for the next occurrence.
    RollForward,
    /// Target date missing or unreadable. Reported, never deleted.
    Quarantine,
}

pub fn decide(reminder: &Reminder, now: DateTime<Utc>, offset: &FixedOffset) -> Action {
    let Some(target) = reminder.target_date else {
        return Action::Quarantine;
    };

    let days = days_until(target, now, offset);
    match Stage::for_days(days) {
        Stage::Expired if reminder.recurring => Action::RollForward,
        Stage::Expired => Action::Delete,
        Stage::None => Action::Skip,
        stage if reminder.progress.is_sent(stage) => Action::Skip,
        stage => Action::Notify { stage, days },
    }
}

/// Roll a recurring reminder forward one year at a time until its target is
/// no longer in the past. Returns the number of years advanced.
pub fn catch_up(reminder: &mut Reminder, now: DateTime<Utc>, offset: &FixedOffset) -> Result<u32> {
    let mut years = 0;
    loop {
        reminder.roll_forward(offset)?;
        years += 1;
        match reminder.target_date {
            Some(target) if days_until(target, now, offset) < 0 => continue,
            _ => return Ok(years),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Progress;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn reminder(days_ahead: i64, recurring: bool) -> Reminder {
        Reminder::new(
            "Anniversary",
            now() + Duration::days(days_ahead),
            Uuid::new_v4(),
            recurring,
        )
    }

    #[test]
    fn ten_days_notifies_month() {
        let r = reminder(10, false);
        assert_eq!(
            decide(&r, now(), &utc()),
            Action::Notify {
                stage: Stage::Month,
                days: 10
            }
        );
    }

    #[test]
    fn already_sent_window_is_skipped() {
        let mut r = reminder(10, false);
        r.progress.month = true;
        assert_eq!(decide(&r, now(), &utc()), Action::Skip);
    }

    #[test]
    fn earlier_flags_do_not_block_later_windows() {
        let mut r = reminder(1, false);
        r.progress = Progress {
            month: true,
            week: true,
            three_days: true,
            ..Progress::default()
        };
        assert_eq!(
            decide(&r, now(), &utc()),
            Action::Notify {
                stage: Stage::OneDay,
                days: 1
            }
        );
    }

    #[test]
    fn far_future_is_skipped() {
        assert_eq!(decide(&reminder(45, false), now(), &utc()), Action::Skip);
    }

    #[test]
    fn past_one_off_is_deleted() {
        assert_eq!(decide(&reminder(-2, false), now(), &utc()), Action::Delete);
    }

    #[test]
    fn past_recurring_rolls_forward() {
        assert_eq!(
            decide(&reminder(-2, true), now(), &utc()),
            Action::RollForward
        );
    }

    #[test]
    fn missing_date_is_quarantined() {
        let mut r = reminder(3, false);
        r.target_date = None;
        assert_eq!(decide(&r, now(), &utc()), Action::Quarantine);
    }

    #[test]
    fn today_sent_is_skipped_until_midnight() {
        let mut r = reminder(0, true);
        r.progress.today = true;
        assert_eq!(decide(&r, now(), &utc()), Action::Skip);
    }

    #[test]
    fn catch_up_skips_stale_years() {
        let mut r = reminder(0, true);
        r.target_date = Some(Utc.with_ymd_and_hms(2021, 6, 1, 9, 0, 0).unwrap());
        r.progress.month = true;

        let years = catch_up(&mut r, now(), &utc()).unwrap();

        assert_eq!(years, 3);
        assert_eq!(
            r.target_date,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap())
        );
        assert_eq!(r.progress, Progress::default());
    }

    #[test]
    fn catch_up_from_yesterday_is_one_year() {
        let mut r = reminder(-1, true);
        assert_eq!(catch_up(&mut r, now(), &utc()).unwrap(), 1);
    }
}
