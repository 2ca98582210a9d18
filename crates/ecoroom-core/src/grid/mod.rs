//! Month-partitioned grid document.
//!
//! The document mirrors the printed cleaning sheet one cell at a time, so the
//! coordinates below are an external contract shared with every spreadsheet
//! already in circulation:
//!
//! ```text
//! row 1:  <year>年<month>月
//! row 3:  氏名 | (blank) | 部屋番号 | 1 | 2 | ... | D | エコプラン
//! row 4+: guest | (blank) | room    | status per day  | エコプラン or blank
//! ```
//!
//! Rows and columns are 1-based. A sheet is titled `"<month>月"`; when one
//! document spans the same month number in two different years, the later
//! sheets carry the year as well (`"<year>年<month>月"`). The banner in row 1
//! always names the year, so a workbook keeps it even under a bare title.
//!
//! A path ending in `.xlsx` is read and written as a workbook; any other path
//! holds the document as JSON.

pub mod project;
pub mod read;
pub mod xlsx;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};

pub use project::project;
pub use read::{GridTriple, RowRead, find_column_for_day, is_blank, read_back, read_row};

/// Row of the `"<year>年<month>月"` banner in column 1.
pub const TITLE_ROW: u32 = 1;
/// Row carrying the column labels and day numbers.
pub const HEADER_ROW: u32 = 3;
/// First row holding a stay.
pub const DATA_FIRST_ROW: u32 = 4;
pub const GUEST_COL: u32 = 1;
pub const ROOM_COL: u32 = 3;
/// Column of day 1; day `d` lives in column `ROOM_COL + d`.
pub const FIRST_DAY_COL: u32 = 4;
/// Last column searched when looking for a day header.
pub const DAY_SCAN_LAST_COL: u32 = 34;

pub const GUEST_LABEL: &str = "氏名";
pub const ROOM_LABEL: &str = "部屋番号";
pub const ECO_PLAN_LABEL: &str = "エコプラン";

const MONTH_SUFFIX: char = '月';
const YEAR_SEPARATOR: char = '年';

/// Column of the eco-plan marker for a sheet with `day_count` days.
#[must_use]
pub const fn eco_plan_col(day_count: u32) -> u32 {
    FIRST_DAY_COL + day_count
}

/// Column holding day-of-month `day`.
#[must_use]
pub const fn day_col(day: u32) -> u32 {
    ROOM_COL + day
}

/// Month (and optional year) recovered from a sheet title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLabel {
    pub year: Option<i32>,
    pub month: u32,
}

/// Build a sheet title.
#[must_use]
pub fn sheet_title(year: i32, month: u32, with_year: bool) -> String {
    if with_year {
        format!("{year}{YEAR_SEPARATOR}{month}{MONTH_SUFFIX}")
    } else {
        format!("{month}{MONTH_SUFFIX}")
    }
}

/// Parse `"7月"` or `"2025年7月"`. Anything else is not a month sheet.
#[must_use]
pub fn parse_sheet_title(title: &str) -> Option<SheetLabel> {
    let rest = title.trim().strip_suffix(MONTH_SUFFIX)?;
    let (year, month) = match rest.split_once(YEAR_SEPARATOR) {
        Some((year, month)) => (Some(year.trim().parse::<i32>().ok()?), month),
        None => (None, rest),
    };
    let month = month.trim().parse::<u32>().ok()?;
    (1..=12)
        .contains(&month)
        .then_some(SheetLabel { year, month })
}

/// One month partition of the grid document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSheet {
    pub title: String,
    pub year: i32,
    pub month: u32,
    pub day_count: u32,
    /// Non-empty cells keyed by row, then column.
    #[serde(default)]
    cells: BTreeMap<u32, BTreeMap<u32, String>>,
}

impl MonthSheet {
    /// Create a sheet with its banner and header row filled in.
    #[must_use]
    pub fn with_headers(title: String, year: i32, month: u32, day_count: u32) -> Self {
        let mut sheet = Self {
            title,
            year,
            month,
            day_count,
            cells: BTreeMap::new(),
        };
        sheet.set_cell(TITLE_ROW, GUEST_COL, sheet_title(year, month, true));
        sheet.set_cell(HEADER_ROW, GUEST_COL, GUEST_LABEL);
        sheet.set_cell(HEADER_ROW, ROOM_COL, ROOM_LABEL);
        for day in 1..=day_count {
            sheet.set_cell(HEADER_ROW, day_col(day), day.to_string());
        }
        sheet.set_cell(HEADER_ROW, eco_plan_col(day_count), ECO_PLAN_LABEL);
        sheet
    }

    #[must_use]
    pub fn cell(&self, row: u32, col: u32) -> Option<&str> {
        self.cells
            .get(&row)
            .and_then(|r| r.get(&col))
            .map(String::as_str)
    }

    /// Write a cell. Writing an empty string clears it.
    pub fn set_cell(&mut self, row: u32, col: u32, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            if let Some(r) = self.cells.get_mut(&row) {
                r.remove(&col);
                if r.is_empty() {
                    self.cells.remove(&row);
                }
            }
            return;
        }
        self.cells.entry(row).or_default().insert(col, value);
    }

    /// Highest row with any content, 0 for an empty sheet.
    #[must_use]
    pub fn max_row(&self) -> u32 {
        self.cells.keys().next_back().copied().unwrap_or(0)
    }

    /// Rows from the first data row through the last used row.
    pub fn data_rows(&self) -> impl Iterator<Item = u32> + use<> {
        DATA_FIRST_ROW..=self.max_row()
    }

    #[must_use]
    pub fn label(&self) -> Option<SheetLabel> {
        parse_sheet_title(&self.title)
    }

    /// Whether this sheet holds the given calendar month. A year in the title
    /// wins; an undated title means the sheet's own year.
    #[must_use]
    pub fn covers(&self, year: i32, month: u32) -> bool {
        self.label()
            .is_some_and(|l| l.month == month && l.year.unwrap_or(self.year) == year)
    }
}

/// On-disk encoding of a grid document, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridFormat {
    Json,
    Xlsx,
}

impl GridFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
        {
            Self::Xlsx
        } else {
            Self::Json
        }
    }
}

/// The published grid: one sheet per covered month, in calendar order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDocument {
    pub sheets: Vec<MonthSheet>,
}

impl GridDocument {
    #[must_use]
    pub fn sheet(&self, title: &str) -> Option<&MonthSheet> {
        self.sheets.iter().find(|s| s.title == title)
    }

    pub fn sheet_mut(&mut self, title: &str) -> Option<&mut MonthSheet> {
        self.sheets.iter_mut().find(|s| s.title == title)
    }

    /// Load a grid document from disk, as a workbook or as JSON depending
    /// on the extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Grid`] if
    /// it is not a grid document.
    pub fn load(path: &Path) -> Result<Self> {
        if GridFormat::from_path(path) == GridFormat::Xlsx {
            return xlsx::load(path);
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("read grid document {}", path.display()), e))?;
        serde_json::from_str(&content).map_err(|e| Error::Grid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save the document, replacing any previous file in one rename.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on any filesystem failure and [`Error::Grid`] if
    /// the document cannot be encoded.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("create grid directory {}", parent.display()), e))?;
        }
        let tmp = path.with_extension("tmp");
        match GridFormat::from_path(path) {
            GridFormat::Xlsx => xlsx::save(self, &tmp)?,
            GridFormat::Json => {
                let json = serde_json::to_string_pretty(self).map_err(|e| Error::Grid {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
                std::fs::write(&tmp, json)
                    .map_err(|e| Error::io(format!("write grid document {}", tmp.display()), e))?;
            }
        }
        std::fs::rename(&tmp, path)
            .map_err(|e| Error::io(format!("replace grid document {}", path.display()), e))?;
        tracing::info!(path = %path.display(), sheets = self.sheets.len(), "grid document saved");
        Ok(())
    }
}
