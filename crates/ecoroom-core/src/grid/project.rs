//! Stay records → grid document.

use chrono::Datelike;
use std::collections::{BTreeMap, BTreeSet};

use super::{
    DATA_FIRST_ROW, ECO_PLAN_LABEL, GUEST_COL, GridDocument, MonthSheet, ROOM_COL, day_col,
    eco_plan_col, sheet_title,
};
use crate::calendar::days_in_month;
use crate::model::StayRecord;

/// Render every stay into month sheets.
///
/// Rows are ordered by room number (numeric ids first, everything else after
/// in input order). One sheet is produced per calendar month that holds at
/// least one schedule entry; each sheet's day count comes from its own year.
#[must_use]
pub fn project(records: &[StayRecord]) -> GridDocument {
    let mut sorted: Vec<&StayRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.room().sort_key());

    let months: BTreeSet<(i32, u32)> = records
        .iter()
        .flat_map(|r| r.schedule.iter())
        .map(|e| (e.date.year(), e.date.month()))
        .collect();

    let mut titles_used: BTreeMap<u32, usize> = BTreeMap::new();
    let mut sheets = Vec::with_capacity(months.len());

    for (year, month) in months {
        let seen = titles_used.entry(month).or_default();
        let title = sheet_title(year, month, *seen > 0);
        *seen += 1;

        let day_count = days_in_month(year, month);
        let mut sheet = MonthSheet::with_headers(title, year, month, day_count);

        let mut row = DATA_FIRST_ROW;
        for record in sorted.iter().filter(|r| r.has_entries_in(year, month)) {
            let stay = &record.stay;
            sheet.set_cell(row, GUEST_COL, stay.guest.as_str());
            sheet.set_cell(row, ROOM_COL, stay.room.as_str());
            if stay.plan_eco {
                sheet.set_cell(row, eco_plan_col(day_count), ECO_PLAN_LABEL);
            }
            for entry in record
                .schedule
                .iter()
                .filter(|e| e.date.year() == year && e.date.month() == month)
            {
                if let Some(status) = entry.status {
                    sheet.set_cell(row, day_col(entry.date.day()), status.as_str());
                }
            }
            row += 1;
        }

        tracing::debug!(
            sheet = %sheet.title,
            rows = row - DATA_FIRST_ROW,
            day_count,
            "projected month sheet"
        );
        sheets.push(sheet);
    }

    GridDocument { sheets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CleaningStatus, Origin, RoomId, Stay};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn record(
        room: &str,
        guest: &str,
        check_in: NaiveDate,
        nights: u32,
        plan_eco: bool,
    ) -> StayRecord {
        StayRecord::generate(Stay {
            room: RoomId::parse(room).expect("room"),
            guest: guest.to_string(),
            check_in,
            nights,
            door_eco: false,
            plan_eco,
            origin: Origin::Form,
        })
        .expect("generate")
    }

    #[test]
    fn rows_are_sorted_numerically_with_non_numeric_last() {
        let records = vec![
            record("B2", "b", date(2024, 7, 1), 2, false),
            record("1001", "c", date(2024, 7, 1), 2, false),
            record("A1", "a", date(2024, 7, 1), 2, false),
            record("205", "d", date(2024, 7, 1), 2, false),
        ];
        let doc = project(&records);
        let sheet = doc.sheet("7月").expect("july sheet");
        let rooms: Vec<_> = sheet
            .data_rows()
            .filter_map(|row| sheet.cell(row, ROOM_COL))
            .collect();
        assert_eq!(rooms, vec!["205", "1001", "B2", "A1"]);
    }

    #[test]
    fn stay_spanning_months_appears_on_both_sheets() {
        let records = vec![
            record("101", "Sato", date(2024, 7, 30), 3, true),
            record("102", "Kato", date(2024, 7, 5), 2, false),
        ];
        let doc = project(&records);
        let titles: Vec<_> = doc.sheets.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["7月", "8月"]);

        let july = doc.sheet("7月").expect("july");
        assert_eq!(july.day_count, 31);
        assert_eq!(july.cell(4, ROOM_COL), Some("101"));
        assert_eq!(july.cell(4, GUEST_COL), Some("Sato"));
        assert_eq!(july.cell(4, day_col(30)), Some("C/I"));
        assert_eq!(july.cell(4, day_col(31)), Some("×"));
        assert_eq!(july.cell(4, eco_plan_col(31)), Some("エコプラン"));
        assert_eq!(july.cell(5, ROOM_COL), Some("102"));
        assert_eq!(july.cell(5, eco_plan_col(31)), None);

        let august = doc.sheet("8月").expect("august");
        assert_eq!(august.max_row(), 4);
        assert_eq!(august.cell(4, ROOM_COL), Some("101"));
        assert_eq!(august.cell(4, day_col(1)), Some("×"));
        assert_eq!(august.cell(4, day_col(2)), Some("C/O"));
        assert_eq!(august.cell(4, day_col(3)), None);
    }

    #[test]
    fn year_rollover_uses_each_sheets_own_year() {
        let records = vec![record("301", "", date(2023, 12, 30), 64, false)];
        let doc = project(&records);
        let titles: Vec<_> = doc.sheets.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["12月", "1月", "2月", "3月"]);

        let feb = doc.sheet("2月").expect("february");
        assert_eq!(feb.year, 2024);
        assert_eq!(feb.day_count, 29);
        assert_eq!(feb.cell(3, day_col(29)), Some("29"));
        assert_eq!(feb.cell(3, eco_plan_col(29)), Some("エコプラン"));
        assert_eq!(feb.cell(4, GUEST_COL), None);
    }

    #[test]
    fn repeated_month_number_gets_a_dated_title() {
        let records = vec![
            record("101", "", date(2024, 12, 20), 2, false),
            record("102", "", date(2025, 12, 20), 2, false),
        ];
        let doc = project(&records);
        let titles: Vec<_> = doc.sheets.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["12月", "2025年12月"]);
        assert_eq!(doc.sheets[0].cell(4, ROOM_COL), Some("101"));
        assert_eq!(doc.sheets[0].max_row(), 4);
        assert_eq!(doc.sheets[1].cell(4, ROOM_COL), Some("102"));
    }

    #[test]
    fn missing_status_renders_blank() {
        let mut rec = record("101", "", date(2024, 7, 10), 3, false);
        rec.schedule[1].status = None;
        let doc = project(&[rec]);
        let sheet = doc.sheet("7月").expect("july");
        assert_eq!(sheet.cell(4, day_col(10)), Some(CleaningStatus::CheckIn.as_str()));
        assert_eq!(sheet.cell(4, day_col(11)), None);
    }

    #[test]
    fn empty_store_projects_no_sheets() {
        assert!(project(&[]).sheets.is_empty());
    }
}
