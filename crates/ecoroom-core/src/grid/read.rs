//! Reverse path: grid document cells back into (room, day, status) values.

use serde::Serialize;

use super::{DAY_SCAN_LAST_COL, FIRST_DAY_COL, GridDocument, HEADER_ROW, MonthSheet, ROOM_COL};
use crate::model::CleaningStatus;

/// Empty and whitespace-only cells are both blank.
#[must_use]
pub fn is_blank(cell: Option<&str>) -> bool {
    cell.is_none_or(|v| v.trim().is_empty())
}

/// Find the header column whose text is the decimal day number.
///
/// Only columns `4..=34` of row 3 are scanned; the first match wins.
#[must_use]
pub fn find_column_for_day(sheet: &MonthSheet, day: u32) -> Option<u32> {
    let wanted = day.to_string();
    (FIRST_DAY_COL..=DAY_SCAN_LAST_COL)
        .find(|&col| sheet.cell(HEADER_ROW, col).is_some_and(|v| v.trim() == wanted))
}

/// The room-id cell and one target cell of a data row, trimmed, with blank
/// cells reported as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRead {
    pub row: u32,
    pub room: Option<String>,
    pub target: Option<String>,
}

impl RowRead {
    #[must_use]
    pub const fn target_is_blank(&self) -> bool {
        self.target.is_none()
    }
}

fn trimmed(cell: Option<&str>) -> Option<String> {
    if is_blank(cell) {
        return None;
    }
    cell.map(|v| v.trim().to_string())
}

#[must_use]
pub fn read_row(sheet: &MonthSheet, row: u32, col: u32) -> RowRead {
    RowRead {
        row,
        room: trimmed(sheet.cell(row, ROOM_COL)),
        target: trimmed(sheet.cell(row, col)),
    }
}

/// One populated status cell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GridTriple {
    pub year: i32,
    pub month: u32,
    pub room: String,
    pub day: u32,
    pub status: CleaningStatus,
}

/// Read every status cell of every sheet.
///
/// Cells holding text that is not a status code are skipped with a warning.
#[must_use]
pub fn read_back(doc: &GridDocument) -> Vec<GridTriple> {
    let mut triples = Vec::new();
    for sheet in &doc.sheets {
        let columns: Vec<(u32, u32)> = (1..=sheet.day_count)
            .filter_map(|day| find_column_for_day(sheet, day).map(|col| (day, col)))
            .collect();

        for row in sheet.data_rows() {
            for &(day, col) in &columns {
                let read = read_row(sheet, row, col);
                let (Some(room), Some(code)) = (read.room, read.target) else {
                    continue;
                };
                match CleaningStatus::from_code(&code) {
                    Some(status) => triples.push(GridTriple {
                        year: sheet.year,
                        month: sheet.month,
                        room,
                        day,
                        status,
                    }),
                    None => tracing::warn!(
                        sheet = %sheet.title,
                        row,
                        day,
                        code = %code,
                        "ignoring unknown status code in grid"
                    ),
                }
            }
        }
    }
    triples
}
