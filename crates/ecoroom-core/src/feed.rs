//! Room-status feed import.
//!
//! The feed is a CSV export from the front desk. Only two fields
//! matter: index 1 is the room number and index 6 the room's status code.
//! Rows with fewer than seven fields are ignored, which also drops blank
//! lines and most headers.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::model::{CleaningStatus, Origin, RoomId, Stay, StayRecord};

/// Length of every stay proposed from the feed.
pub const FEED_STAY_NIGHTS: u32 = 2;

const MIN_FIELDS: usize = 7;
const ROOM_FIELD: usize = 1;
const STATUS_FIELD: usize = 6;

/// One usable feed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedRow {
    /// 1-based line number in the source text.
    pub line: usize,
    pub room: String,
    pub status: String,
}

/// Read feed text into rows, keeping only rows with enough fields.
///
/// Fields follow CSV quoting, so a quoted guest name may contain commas.
/// Records the reader cannot decode are skipped with a warning.
#[must_use]
pub fn parse_feed(text: &str) -> Vec<FeedRow> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(record = idx + 1, error = %e, "unreadable feed record");
                continue;
            }
        };
        if record.len() < MIN_FIELDS {
            continue;
        }
        let line = record
            .position()
            .and_then(|p| usize::try_from(p.line()).ok())
            .unwrap_or(idx + 1);
        rows.push(FeedRow {
            line,
            room: record[ROOM_FIELD].to_string(),
            status: record[STATUS_FIELD].to_string(),
        });
    }
    rows
}

/// A proposed stay built from a feed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportCandidate {
    pub record: StayRecord,
    /// The room already has a stay; shown, but not selected by default.
    pub already_registered: bool,
    pub selected: bool,
}

/// Filter feed rows down to import candidates.
///
/// Rows whose status code is not in `eligible` are dropped, and only the
/// first row for a room counts. Every candidate is a
/// [`FEED_STAY_NIGHTS`]-night stay from `check_in` with no guest name whose
/// interior days all carry `interior`.
///
/// # Errors
///
/// Returns a validation error when `eligible` is empty or `interior` is a
/// check-in/check-out code.
pub fn import_eligible(
    rows: &[FeedRow],
    eligible: &BTreeSet<String>,
    existing: &BTreeSet<RoomId>,
    check_in: NaiveDate,
    interior: CleaningStatus,
) -> Result<Vec<ImportCandidate>> {
    if eligible.is_empty() {
        return Err(Error::invalid(
            "no eligible status codes: set [feed] eligible or pass --eligible",
        ));
    }
    if interior.is_boundary() {
        return Err(Error::forbidden_override(format!(
            "{interior} cannot be used as the interior status of imported stays"
        )));
    }

    let mut seen = BTreeSet::new();
    let mut candidates = Vec::new();
    for row in rows {
        if !eligible.contains(&row.status) {
            continue;
        }
        let room = match RoomId::parse(&row.room) {
            Ok(room) => room,
            Err(e) => {
                tracing::warn!(line = row.line, error = %e, "skipping feed row");
                continue;
            }
        };
        if !seen.insert(room.clone()) {
            tracing::debug!(line = row.line, room = %room, "duplicate feed row ignored");
            continue;
        }

        let already_registered = existing.contains(&room);
        let record = StayRecord::generate(Stay {
            room,
            guest: String::new(),
            check_in,
            nights: FEED_STAY_NIGHTS,
            door_eco: interior == CleaningStatus::EcoDoor,
            plan_eco: false,
            origin: Origin::FeedImport { interior },
        })?;
        candidates.push(ImportCandidate {
            record,
            already_registered,
            selected: !already_registered,
        });
    }

    tracing::debug!(
        rows = rows.len(),
        candidates = candidates.len(),
        "feed filtered"
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn codes(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn short_rows_are_ignored() {
        let rows = parse_feed("\u{feff}no,room,a,b,c,d,status\n1,205,x,x,x,x, 1 \n\n2,206,x\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, "status");
        assert_eq!(
            rows[1],
            FeedRow {
                line: 2,
                room: "205".into(),
                status: "1".into()
            }
        );
    }

    #[test]
    fn quoted_fields_keep_their_commas() {
        let rows = parse_feed(
            "\"1\",\"205\",\"Sato, Taro\",x,x,x,\"1\"\n\"2\",\"206\",Kato,x,x,x,\"1\"\n",
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, "1");

        let candidates = import_eligible(
            &rows,
            &codes(&["1"]),
            &BTreeSet::new(),
            date(2024, 7, 1),
            CleaningStatus::Skip,
        )
        .expect("import");
        let rooms: Vec<_> = candidates.iter().map(|c| c.record.room().as_str()).collect();
        assert_eq!(rooms, vec!["205", "206"]);
    }

    #[test]
    fn only_eligible_codes_become_candidates() {
        let rows = parse_feed("a,205,b,c,d,e,1\na,206,b,c,d,e,2\n");
        let candidates = import_eligible(
            &rows,
            &codes(&["1", "3"]),
            &BTreeSet::new(),
            date(2024, 7, 1),
            CleaningStatus::Skip,
        )
        .expect("import");

        assert_eq!(candidates.len(), 1);
        let first = &candidates[0];
        assert_eq!(first.record.room().as_str(), "205");
        assert!(first.selected);
        assert!(!first.already_registered);
        assert_eq!(first.record.stay.nights, 2);
        assert!(first.record.stay.guest.is_empty());
        assert_eq!(first.record.schedule.len(), 3);
    }

    #[test]
    fn registered_rooms_are_shown_but_not_selected() {
        let rows = parse_feed("a,205,b,c,d,e,1\na,207,b,c,d,e,3\na,205,b,c,d,e,3\n");
        let existing = BTreeSet::from([RoomId::parse("207").expect("room")]);
        let candidates = import_eligible(
            &rows,
            &codes(&["1", "3"]),
            &existing,
            date(2024, 7, 1),
            CleaningStatus::Skip,
        )
        .expect("import");

        let summary: Vec<_> = candidates
            .iter()
            .map(|c| (c.record.room().as_str(), c.already_registered, c.selected))
            .collect();
        assert_eq!(summary, vec![("205", false, true), ("207", true, false)]);
    }

    #[test]
    fn interior_status_is_flat_and_drives_door_eco() {
        let rows = parse_feed("a,301,b,c,d,e,1\n");
        let candidates = import_eligible(
            &rows,
            &codes(&["1"]),
            &BTreeSet::new(),
            date(2024, 7, 1),
            CleaningStatus::EcoDoor,
        )
        .expect("import");

        let record = &candidates[0].record;
        assert!(record.stay.door_eco);
        assert_eq!(
            record.stay.origin,
            Origin::FeedImport {
                interior: CleaningStatus::EcoDoor
            }
        );
        assert_eq!(record.schedule[1].status, Some(CleaningStatus::EcoDoor));
        assert_eq!(record.schedule[2].status, Some(CleaningStatus::CheckOut));
    }

    #[test]
    fn boundary_interior_and_empty_eligible_are_rejected() {
        let rows = parse_feed("a,301,b,c,d,e,1\n");
        let none = import_eligible(
            &rows,
            &BTreeSet::new(),
            &BTreeSet::new(),
            date(2024, 7, 1),
            CleaningStatus::Skip,
        );
        assert!(none.expect_err("empty eligible").is_validation());

        let boundary = import_eligible(
            &rows,
            &codes(&["1"]),
            &BTreeSet::new(),
            date(2024, 7, 1),
            CleaningStatus::CheckIn,
        );
        assert!(boundary.expect_err("boundary interior").is_validation());
    }
}
