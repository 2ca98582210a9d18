//! Retirement of finished stays.
//!
//! Two independent ways to decide which rooms leave the store:
//!
//! - **grid**: on the sheet for the reference month, a room whose cell in the
//!   reference day's column is blank has no business that day;
//! - **status**: the store's own schedule rows show a past check-out, no rows
//!   at all, or an empty status.
//!
//! Both only compute a deletion set. [`apply`] removes it in one transaction.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::db::{DeleteReport, Store};
use crate::error::Result;
use crate::grid::{self, GridDocument, ROOM_COL, find_column_for_day, read_row};
use crate::model::{RoomId, StayRecord};

/// Rooms whose cell for `reference` is blank on the matching month sheet.
///
/// Sheets for other months are skipped. A sheet titled without a year is
/// taken to be in the sheet's own year; a sheet whose title does not name a
/// month is ignored.
#[must_use]
pub fn retire_by_grid(doc: &GridDocument, reference: NaiveDate) -> BTreeSet<RoomId> {
    let mut doomed = BTreeSet::new();

    for sheet in &doc.sheets {
        if sheet.label().is_none() {
            tracing::debug!(sheet = %sheet.title, "not a month sheet, skipping");
            continue;
        }
        if !sheet.covers(reference.year(), reference.month()) {
            continue;
        }
        let Some(col) = find_column_for_day(sheet, reference.day()) else {
            tracing::debug!(sheet = %sheet.title, day = reference.day(), "no column for day");
            continue;
        };

        for row in sheet.data_rows() {
            let read = read_row(sheet, row, col);
            if !read.target_is_blank() {
                continue;
            }
            let Some(raw_room) = read.room else {
                continue;
            };
            match RoomId::parse(&raw_room) {
                Ok(room) => {
                    tracing::debug!(sheet = %sheet.title, row, room = %room, "blank on reference day");
                    doomed.insert(room);
                }
                Err(e) => tracing::warn!(
                    sheet = %sheet.title,
                    row,
                    error = %e,
                    "unusable room id in grid"
                ),
            }
        }
    }

    doomed
}

/// Load the grid document for a retirement pass.
///
/// Returns `None`, after logging, when the file is missing or unreadable.
#[must_use]
pub fn load_grid_for_retirement(path: &Path) -> Option<GridDocument> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no grid document, nothing to retire");
        return None;
    }
    match GridDocument::load(path) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "grid document unreadable, nothing retired"
            );
            None
        }
    }
}

/// [`retire_by_grid`] over a document on disk.
///
/// A missing or unreadable document yields an empty set; the caller falls
/// back to status-based retirement or skips the pass.
#[must_use]
pub fn retire_by_grid_file(path: &Path, reference: NaiveDate) -> BTreeSet<RoomId> {
    load_grid_for_retirement(path)
        .map(|doc| retire_by_grid(&doc, reference))
        .unwrap_or_default()
}

/// Rooms the store itself marks as finished at `cutoff` (inclusive).
///
/// # Errors
///
/// Fails if the store cannot be queried; nothing is deleted.
pub fn retire_by_status(store: &Store, cutoff: NaiveDate) -> Result<BTreeSet<RoomId>> {
    let rooms = store.status_retirement_candidates(cutoff)?;
    tracing::debug!(%cutoff, candidates = rooms.len(), "status retirement computed");
    Ok(rooms)
}

/// Delete a retirement set, all or nothing.
///
/// # Errors
///
/// Fails if the delete transaction fails; the store is left unchanged.
pub fn apply(store: &mut Store, rooms: &BTreeSet<RoomId>) -> Result<DeleteReport> {
    store.delete_many(rooms)
}

/// Grid and store disagree about which rooms exist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConsistencyWarning {
    /// A room on a sheet that the store does not know.
    GridOnly { sheet: String, room: String },
    /// A stored room absent from the sheets covering its schedule.
    StoreOnly { room: RoomId },
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GridOnly { sheet, room } => {
                write!(f, "room {room} appears on sheet {sheet} but is not in the store")
            }
            Self::StoreOnly { room } => {
                write!(f, "room {room} is in the store but missing from the grid")
            }
        }
    }
}

/// Compare a grid document with the stored stays. Warnings are logged and
/// returned; they never block anything.
///
/// A stored stay only counts as missing when the document has a sheet for at
/// least one of its months.
#[must_use]
pub fn check_consistency(doc: &GridDocument, records: &[StayRecord]) -> Vec<ConsistencyWarning> {
    let stored: BTreeSet<&str> = records.iter().map(|r| r.room().as_str()).collect();
    let mut warnings = BTreeSet::new();
    let mut on_grid: BTreeSet<String> = BTreeSet::new();

    for sheet in &doc.sheets {
        for row in sheet.data_rows() {
            let cell = sheet.cell(row, ROOM_COL);
            if grid::is_blank(cell) {
                continue;
            }
            let room = cell.map(str::trim).unwrap_or_default().to_string();
            if !stored.contains(room.as_str()) {
                warnings.insert(ConsistencyWarning::GridOnly {
                    sheet: sheet.title.clone(),
                    room: room.clone(),
                });
            }
            on_grid.insert(room);
        }
    }

    for record in records {
        let covered = doc.sheets.iter().any(|sheet| {
            record
                .schedule
                .iter()
                .any(|e| sheet.covers(e.date.year(), e.date.month()))
        });
        if covered && !on_grid.contains(record.room().as_str()) {
            warnings.insert(ConsistencyWarning::StoreOnly {
                room: record.room().clone(),
            });
        }
    }

    for warning in &warnings {
        tracing::warn!(%warning, "grid and store disagree");
    }
    warnings.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{MonthSheet, day_col, project};
    use crate::model::{CleaningStatus, Origin, Stay};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn room(id: &str) -> RoomId {
        RoomId::parse(id).expect("room")
    }

    fn record(id: &str, check_in: NaiveDate, nights: u32) -> StayRecord {
        StayRecord::generate(Stay {
            room: room(id),
            guest: String::new(),
            check_in,
            nights,
            door_eco: false,
            plan_eco: false,
            origin: Origin::Form,
        })
        .expect("generate")
    }

    fn july_sheet() -> MonthSheet {
        let mut sheet = MonthSheet::with_headers("7月".into(), 2024, 7, 31);
        sheet.set_cell(4, ROOM_COL, "101");
        sheet.set_cell(4, day_col(14), "×");
        sheet.set_cell(5, ROOM_COL, "102");
        sheet.set_cell(5, day_col(15), "〇");
        sheet.set_cell(6, ROOM_COL, "103");
        sheet.set_cell(6, day_col(15), "  ");
        sheet.set_cell(7, day_col(15), "");
        sheet
    }

    #[test]
    fn blank_reference_cell_marks_room() {
        let doc = GridDocument {
            sheets: vec![july_sheet()],
        };
        let doomed = retire_by_grid(&doc, date(2024, 7, 15));
        assert_eq!(doomed, BTreeSet::from([room("101"), room("103")]));
    }

    #[test]
    fn other_months_are_never_touched() {
        let doc = GridDocument {
            sheets: vec![july_sheet()],
        };
        assert!(retire_by_grid(&doc, date(2024, 8, 15)).is_empty());

        let mut dated = july_sheet();
        dated.title = "2025年7月".into();
        let doc = GridDocument {
            sheets: vec![dated],
        };
        assert!(retire_by_grid(&doc, date(2024, 7, 15)).is_empty());
        assert_eq!(retire_by_grid(&doc, date(2025, 7, 15)).len(), 2);
    }

    #[test]
    fn undated_title_stays_in_its_own_year() {
        let mut december = MonthSheet::with_headers("12月".into(), 2024, 12, 31);
        december.set_cell(4, ROOM_COL, "101");
        december.set_cell(4, day_col(14), "C/O");
        let doc = GridDocument {
            sheets: vec![december],
        };
        assert!(retire_by_grid(&doc, date(2025, 12, 15)).is_empty());
        assert_eq!(
            retire_by_grid(&doc, date(2024, 12, 15)),
            BTreeSet::from([room("101")])
        );
    }

    #[test]
    fn consistency_ignores_sheets_from_another_year() {
        // the July sheet is 2024, so a July 2025 stay is not expected on it
        let records = vec![record("104", date(2025, 7, 10), 3)];
        let doc = GridDocument {
            sheets: vec![july_sheet()],
        };
        let warnings = check_consistency(&doc, &records);
        assert!(
            !warnings.contains(&ConsistencyWarning::StoreOnly { room: room("104") }),
            "{warnings:?}"
        );
    }

    #[test]
    fn missing_day_header_retires_nothing() {
        let mut sheet = july_sheet();
        sheet.set_cell(grid::HEADER_ROW, day_col(15), "");
        let doc = GridDocument {
            sheets: vec![sheet],
        };
        assert!(retire_by_grid(&doc, date(2024, 7, 15)).is_empty());
    }

    #[test]
    fn missing_or_unreadable_file_is_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("none.json");
        assert!(retire_by_grid_file(&missing, date(2024, 7, 15)).is_empty());

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{ not a grid").expect("write");
        assert!(retire_by_grid_file(&garbage, date(2024, 7, 15)).is_empty());
    }

    #[test]
    fn grid_retirement_is_idempotent_after_apply() {
        let mut store = Store::open_in_memory().expect("store");
        store.upsert(&record("101", date(2024, 7, 10), 3)).expect("upsert");
        store.upsert(&record("102", date(2024, 7, 14), 4)).expect("upsert");

        let reference = date(2024, 7, 15);
        let doc = project(&store.all().expect("all"));
        let first = retire_by_grid(&doc, reference);
        assert_eq!(first, BTreeSet::from([room("101")]));
        let report = apply(&mut store, &first).expect("apply");
        assert_eq!(report.removed, vec![room("101")]);

        let doc = project(&store.all().expect("all"));
        assert!(retire_by_grid(&doc, reference).is_empty());
    }

    #[test]
    fn status_retirement_follows_checkouts() {
        let mut store = Store::open_in_memory().expect("store");
        store.upsert(&record("101", date(2024, 7, 10), 3)).expect("upsert");
        store.upsert(&record("102", date(2024, 7, 20), 2)).expect("upsert");
        store.upsert(&record("103", date(2024, 7, 14), 3)).expect("upsert");

        let cutoff = date(2024, 7, 15);
        let due = retire_by_status(&store, cutoff).expect("status");
        assert_eq!(due, BTreeSet::from([room("101")]));

        apply(&mut store, &due).expect("apply");
        assert!(retire_by_status(&store, cutoff).expect("status").is_empty());
    }

    #[test]
    fn consistency_reports_both_directions() {
        let records = vec![
            record("101", date(2024, 7, 10), 3),
            record("104", date(2024, 7, 1), 2),
            record("900", date(2024, 9, 1), 2),
        ];
        let doc = GridDocument {
            sheets: vec![july_sheet()],
        };
        let warnings = check_consistency(&doc, &records);
        assert_eq!(
            warnings,
            vec![
                ConsistencyWarning::GridOnly {
                    sheet: "7月".into(),
                    room: "102".into()
                },
                ConsistencyWarning::GridOnly {
                    sheet: "7月".into(),
                    room: "103".into()
                },
                ConsistencyWarning::StoreOnly { room: room("104") },
            ]
        );
    }

    #[test]
    fn projected_grid_is_consistent() {
        let mut rec = record("101", date(2024, 7, 30), 4);
        rec.schedule[1].status = Some(CleaningStatus::EcoDoor);
        let records = vec![rec, record("A2", date(2024, 7, 1), 2)];
        assert!(check_consistency(&project(&records), &records).is_empty());
    }
}
