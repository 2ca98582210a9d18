//! Spreadsheet backend for the grid document.
//!
//! Every cell is written as text at its 1-based grid address, one worksheet
//! per month sheet. Reading accepts any workbook: numeric cells come back as
//! their shortest decimal text, so a day header typed as the number `15`
//! still matches day 15.

use calamine::{Data, Reader, Xlsx};
use chrono::{DateTime, Datelike, Local};
use rust_xlsxwriter::{Workbook, XlsxError};
use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::Path;

use super::{
    DAY_SCAN_LAST_COL, FIRST_DAY_COL, GUEST_COL, GridDocument, MonthSheet, ROOM_COL, TITLE_ROW,
    find_column_for_day, parse_sheet_title,
};
use crate::error::{Error, Result};

const GUEST_WIDTH: f64 = 12.0;
const ROOM_WIDTH: f64 = 8.0;
const DAY_WIDTH: f64 = 6.0;

fn grid_error(path: &Path, reason: impl ToString) -> Error {
    Error::Grid {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn zero_based_col(col: u32) -> std::result::Result<u16, XlsxError> {
    u16::try_from(col.saturating_sub(1)).map_err(|_| XlsxError::RowColumnLimitError)
}

fn write_workbook(doc: &GridDocument, path: &Path) -> std::result::Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    for sheet in &doc.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.title)?;
        worksheet.set_column_width(zero_based_col(GUEST_COL)?, GUEST_WIDTH)?;
        worksheet.set_column_width(zero_based_col(ROOM_COL)?, ROOM_WIDTH)?;
        for col in FIRST_DAY_COL..FIRST_DAY_COL + sheet.day_count {
            worksheet.set_column_width(zero_based_col(col)?, DAY_WIDTH)?;
        }
        for (row, cols) in &sheet.cells {
            for (col, value) in cols {
                worksheet.write_string(row.saturating_sub(1), zero_based_col(*col)?, value)?;
            }
        }
    }
    workbook.save(path)
}

/// Write `doc` as an xlsx workbook at `path`.
///
/// # Errors
///
/// Returns [`Error::Grid`] if a sheet cannot be named or the workbook cannot
/// be written.
pub fn save(doc: &GridDocument, path: &Path) -> Result<()> {
    write_workbook(doc, path).map_err(|e| grid_error(path, e))
}

/// Text of one spreadsheet cell, `None` for empty and error cells.
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Year recorded in the sheet's title, else in its banner cell.
fn recorded_year(sheet: &MonthSheet) -> Option<i32> {
    sheet.label().and_then(|l| l.year).or_else(|| {
        sheet
            .cell(TITLE_ROW, GUEST_COL)
            .and_then(parse_sheet_title)
            .and_then(|banner| banner.year)
    })
}

/// Year the file was last written, for sheets that never recorded one.
fn file_year(path: &Path) -> i32 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_or_else(|_| Local::now().year(), |t| DateTime::<Local>::from(t).year())
}

/// Read an xlsx workbook into a grid document.
///
/// Worksheets whose name is not a month title are kept so that retirement
/// can skip them explicitly; empty worksheets are dropped. A sheet's year
/// comes from its title, then its banner cell, then the file's modification
/// year. Its day count is the highest day found in the header row.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened and [`Error::Grid`] if
/// it is not a readable workbook.
pub fn load(path: &Path) -> Result<GridDocument> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::io(format!("read grid document {}", path.display()), e))?;
    let mut workbook: Xlsx<_> = Xlsx::new(BufReader::new(file)).map_err(|e| grid_error(path, e))?;
    let fallback_year = file_year(path);

    let mut sheets = Vec::new();
    for title in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&title)
            .map_err(|e| grid_error(path, e))?;
        let Some((start_row, start_col)) = range.start() else {
            tracing::debug!(sheet = %title, "empty worksheet skipped");
            continue;
        };

        let mut cells: BTreeMap<u32, BTreeMap<u32, String>> = BTreeMap::new();
        for (r, c, cell) in range.used_cells() {
            let Some(text) = cell_text(cell) else {
                continue;
            };
            let (Ok(r), Ok(c)) = (u32::try_from(r), u32::try_from(c)) else {
                continue;
            };
            cells
                .entry(start_row + r + 1)
                .or_default()
                .insert(start_col + c + 1, text);
        }

        let mut sheet = MonthSheet {
            month: parse_sheet_title(&title).map_or(0, |l| l.month),
            title,
            year: fallback_year,
            day_count: 0,
            cells,
        };
        sheet.year = recorded_year(&sheet).unwrap_or(fallback_year);
        sheet.day_count = (1..=DAY_SCAN_LAST_COL - FIRST_DAY_COL + 1)
            .rev()
            .find(|&day| find_column_for_day(&sheet, day).is_some())
            .unwrap_or(0);
        sheets.push(sheet);
    }

    tracing::debug!(path = %path.display(), sheets = sheets.len(), "workbook read");
    Ok(GridDocument { sheets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{HEADER_ROW, day_col, eco_plan_col};

    #[test]
    fn workbook_keeps_every_cell_and_the_year() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("now.xlsx");

        let mut july = MonthSheet::with_headers("7月".into(), 2024, 7, 31);
        july.set_cell(4, GUEST_COL, "Sato, Taro");
        july.set_cell(4, ROOM_COL, "101");
        july.set_cell(4, day_col(15), "C/O");
        july.set_cell(4, eco_plan_col(31), "エコプラン");
        let feb = MonthSheet::with_headers("2025年2月".into(), 2025, 2, 28);
        let doc = GridDocument {
            sheets: vec![july, feb],
        };
        save(&doc, &path).expect("save");

        let loaded = load(&path).expect("load");
        assert_eq!(loaded, doc);
    }

    #[test]
    fn numeric_headers_and_rooms_read_as_text() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("typed.xlsx");

        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name("12月").expect("name");
        ws.write_number(HEADER_ROW - 1, 3, 1).expect("header");
        ws.write_number(HEADER_ROW - 1, 4, 2).expect("header");
        ws.write_number(HEADER_ROW, 2, 205).expect("room");
        ws.write_string(HEADER_ROW, 3, "C/I").expect("status");
        workbook.save(&path).expect("save");

        let doc = load(&path).expect("load");
        let sheet = doc.sheet("12月").expect("december");
        assert_eq!(sheet.month, 12);
        assert_eq!(sheet.day_count, 2);
        assert_eq!(sheet.cell(3, day_col(1)), Some("1"));
        assert_eq!(sheet.cell(4, ROOM_COL), Some("205"));
        assert_eq!(sheet.cell(4, day_col(1)), Some("C/I"));
        assert_eq!(sheet.cell(4, day_col(2)), None);
        // no year in title or banner: the file's own year
        assert_eq!(sheet.year, Local::now().year());
    }

    #[test]
    fn non_workbook_is_a_grid_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bad.xlsx");
        std::fs::write(&path, "not a zip").expect("write");
        assert!(matches!(load(&path), Err(Error::Grid { .. })));
        assert!(matches!(
            load(&dir.path().join("missing.xlsx")),
            Err(Error::Io { .. })
        ));
    }
}
