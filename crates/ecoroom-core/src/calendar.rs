//! Day-by-day cleaning calendar for a stay.
//!
//! Every function here is pure: a check-in date, a length in nights and an
//! interior rule go in, an ordered schedule comes out. Offsets run `0..=nights`;
//! offset 0 is check-in, offset `nights` is check-out, and the interior days
//! follow the rule chosen by the stay's origin.
//!
//! A zero-night stay has a single entry, and that entry is `C/O`: the
//! check-out assignment is applied last.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::model::{CleaningStatus, ScheduleEntry};

/// Full-service cleaning interval, in interior days.
pub const CLEAN_FULL_INTERVAL: u32 = 3;

/// Status rule for the days strictly between check-in and check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteriorRule {
    /// `〇` every third day, otherwise `エコドア` or `×` depending on the
    /// door-eco option.
    Periodic { door_eco: bool },
    /// The same status on every interior day.
    Flat(CleaningStatus),
}

impl InteriorRule {
    #[must_use]
    pub const fn status_at(self, offset: u32) -> CleaningStatus {
        match self {
            Self::Periodic { .. } if offset % CLEAN_FULL_INTERVAL == 0 => CleaningStatus::CleanFull,
            Self::Periodic { door_eco: true } => CleaningStatus::EcoDoor,
            Self::Periodic { door_eco: false } => CleaningStatus::Skip,
            Self::Flat(status) => status,
        }
    }
}

/// Expand a form-registered stay with the periodic rule.
#[must_use]
pub fn expand(check_in: NaiveDate, nights: u32, door_eco: bool) -> Vec<ScheduleEntry> {
    expand_with(check_in, nights, InteriorRule::Periodic { door_eco })
}

/// Expand a stay with an explicit interior rule.
///
/// Produces `nights + 1` entries dated `check_in + 0 ..= check_in + nights`.
/// The sequence stops early only if it would run past the last date `chrono`
/// can represent; callers that need the exact length validate the check-out
/// date first (see [`crate::model::StayRecord::generate`]).
#[must_use]
pub fn expand_with(check_in: NaiveDate, nights: u32, rule: InteriorRule) -> Vec<ScheduleEntry> {
    (0..=nights)
        .zip(check_in.iter_days())
        .map(|(offset, date)| {
            let status = if offset == nights {
                CleaningStatus::CheckOut
            } else if offset == 0 {
                CleaningStatus::CheckIn
            } else {
                rule.status_at(offset)
            };
            ScheduleEntry::computed(date, status)
        })
        .collect()
}

/// Replace interior entries with operator-chosen statuses.
///
/// All overrides are validated before any entry changes, so a rejected call
/// leaves `entries` untouched.
///
/// # Errors
///
/// Returns a validation error if an override targets the first or last
/// entry, uses a boundary status, or names a date outside the schedule.
pub fn apply_overrides(
    entries: &mut [ScheduleEntry],
    overrides: &BTreeMap<NaiveDate, CleaningStatus>,
) -> Result<()> {
    let last = entries.len().saturating_sub(1);
    let mut targets = Vec::with_capacity(overrides.len());

    for (date, status) in overrides {
        if status.is_boundary() {
            return Err(Error::forbidden_override(format!(
                "{status} cannot be assigned by hand ({date})"
            )));
        }
        let Some(idx) = entries.iter().position(|e| e.date == *date) else {
            return Err(Error::invalid(format!("{date} is not part of this stay")));
        };
        if idx == 0 || idx == last {
            return Err(Error::forbidden_override(format!(
                "{date} is a check-in/check-out day and cannot be edited"
            )));
        }
        targets.push((idx, *status));
    }

    for (idx, status) in targets {
        entries[idx].status = Some(status);
        entries[idx].overridden = true;
    }
    Ok(())
}

/// Number of days in a month of the proleptic Gregorian calendar.
///
/// Returns 0 for an invalid month or a year outside `chrono`'s range.
#[must_use]
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.map_or(31, |n| {
        u32::try_from(n.signed_duration_since(first).num_days()).unwrap_or(0)
    })
}
