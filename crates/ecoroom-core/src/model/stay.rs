use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::CleaningStatus;
use crate::calendar::{self, InteriorRule};
use crate::error::{Error, Result};

/// Room identifier, the primary key of a stay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

/// Ordering key derived from a room id.
///
/// All-digit ids sort numerically; anything else sorts after every numeric
/// id. Variant order is the sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoomSortKey {
    Numeric(u64),
    NonNumeric,
}

impl RoomId {
    /// Trim and validate a raw room id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty ids or ids containing control
    /// characters or commas (the feed format is comma-separated).
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid("room number must not be empty"));
        }
        if trimmed.chars().any(|c| c.is_control() || c == ',') {
            return Err(Error::invalid(format!(
                "room number '{}' contains invalid characters",
                trimmed.escape_debug()
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn sort_key(&self) -> RoomSortKey {
        if !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return RoomSortKey::NonNumeric;
        }
        self.0
            .parse::<u64>()
            .map_or(RoomSortKey::NonNumeric, RoomSortKey::Numeric)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

/// How a stay was created. Selects the interior status rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Origin {
    /// Registered through the add form: periodic `d % 3` rule.
    Form,
    /// Selected from the room-status feed: every interior day gets `interior`.
    FeedImport { interior: CleaningStatus },
}

impl Origin {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Form => "form",
            Self::FeedImport { .. } => "feed-import",
        }
    }
}

/// A registered stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub room: RoomId,
    #[serde(default)]
    pub guest: String,
    pub check_in: NaiveDate,
    pub nights: u32,
    #[serde(default)]
    pub door_eco: bool,
    #[serde(default)]
    pub plan_eco: bool,
    pub origin: Origin,
}

impl Stay {
    /// Check-out date, or `None` when it falls outside the representable
    /// calendar.
    #[must_use]
    pub fn check_out(&self) -> Option<NaiveDate> {
        self.check_in.checked_add_days(Days::new(u64::from(self.nights)))
    }

    /// Interior status rule for this stay's origin.
    #[must_use]
    pub const fn interior_rule(&self) -> InteriorRule {
        match self.origin {
            Origin::Form => InteriorRule::Periodic {
                door_eco: self.door_eco,
            },
            Origin::FeedImport { interior } => InteriorRule::Flat(interior),
        }
    }
}

/// One day of a stay's cleaning calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    /// `None` only for rows loaded from a store with an empty status value.
    pub status: Option<CleaningStatus>,
    /// Set when an editor chose this value by hand.
    #[serde(default)]
    pub overridden: bool,
}

impl ScheduleEntry {
    #[must_use]
    pub const fn computed(date: NaiveDate, status: CleaningStatus) -> Self {
        Self {
            date,
            status: Some(status),
            overridden: false,
        }
    }
}

/// A stay together with its full schedule, the unit the store persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRecord {
    pub stay: Stay,
    pub schedule: Vec<ScheduleEntry>,
}

impl StayRecord {
    /// Validate a stay and expand its schedule with the origin's rule.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the check-out date is not
    /// representable or a feed-import interior status is a boundary code.
    pub fn generate(stay: Stay) -> Result<Self> {
        if stay.check_out().is_none() {
            return Err(Error::invalid(format!(
                "check-out date for room {} is out of range",
                stay.room
            )));
        }
        let rule = stay.interior_rule();
        if let InteriorRule::Flat(status) = rule
            && status.is_boundary()
        {
            return Err(Error::forbidden_override(format!(
                "{status} cannot be used as an interior status"
            )));
        }
        let schedule = calendar::expand_with(stay.check_in, stay.nights, rule);
        Ok(Self { stay, schedule })
    }

    #[must_use]
    pub fn room(&self) -> &RoomId {
        &self.stay.room
    }

    #[must_use]
    pub fn entry_on(&self, date: NaiveDate) -> Option<&ScheduleEntry> {
        self.schedule.iter().find(|e| e.date == date)
    }

    /// Whether any entry falls in the given calendar month.
    #[must_use]
    pub fn has_entries_in(&self, year: i32, month: u32) -> bool {
        self.schedule
            .iter()
            .any(|e| e.date.year() == year && e.date.month() == month)
    }
}
