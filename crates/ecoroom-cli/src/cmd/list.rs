//! `ecoroom list`: registered stays in room order.

use crate::cmd::Project;
use crate::output::{OutputMode, Renderable, render_list};
use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use ecoroom_core::model::StayRecord;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only stays with a day in this month (`YYYY-MM`).
    #[arg(long, value_parser = parse_month)]
    pub month: Option<(i32, u32)>,
}

fn parse_month(raw: &str) -> Result<(i32, u32), String> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .map_err(|_| format!("expected YYYY-MM, got '{raw}'"))?;
    Ok((chrono::Datelike::year(&first), chrono::Datelike::month(&first)))
}

/// One stay summarized for listing.
#[derive(Debug, Serialize)]
pub struct StayRow {
    pub room: String,
    pub guest: String,
    pub check_in: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<NaiveDate>,
    pub nights: u32,
    pub door_eco: bool,
    pub plan_eco: bool,
    pub origin: &'static str,
}

impl From<&StayRecord> for StayRow {
    fn from(record: &StayRecord) -> Self {
        let stay = &record.stay;
        Self {
            room: stay.room.to_string(),
            guest: stay.guest.clone(),
            check_in: stay.check_in,
            check_out: stay.check_out(),
            nights: stay.nights,
            door_eco: stay.door_eco,
            plan_eco: stay.plan_eco,
            origin: stay.origin.as_str(),
        }
    }
}

impl StayRow {
    fn flags(&self) -> String {
        let mut flags = Vec::new();
        if self.door_eco {
            flags.push("eco-door");
        }
        if self.plan_eco {
            flags.push("eco-plan");
        }
        flags.join(",")
    }

    fn check_out_text(&self) -> String {
        self.check_out.map_or_else(|| "?".to_string(), |d| d.to_string())
    }
}

impl Renderable for StayRow {
    fn write_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        let guest = if self.guest.is_empty() { "-" } else { self.guest.as_str() };
        write!(
            w,
            "{:<6} {:<16} {} → {} ({} nights)",
            self.room,
            guest,
            self.check_in,
            self.check_out_text(),
            self.nights
        )?;
        let flags = self.flags();
        if !flags.is_empty() {
            write!(w, " [{flags}]")?;
        }
        writeln!(w)
    }

    fn write_row(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.room,
            self.guest,
            self.check_in,
            self.check_out_text(),
            self.nights,
            self.flags(),
            self.origin
        )
    }

    fn headers() -> &'static [&'static str] {
        &["ROOM", "GUEST", "CHECK_IN", "CHECK_OUT", "NIGHTS", "FLAGS", "ORIGIN"]
    }
}

/// Execute `ecoroom list`.
///
/// # Errors
///
/// Returns an error if the project is not initialized or the store cannot
/// be read.
pub fn run_list(args: &ListArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root)?;
    let store = project.read_store()?;
    let rows: Vec<StayRow> = store
        .all()?
        .iter()
        .filter(|r| args.month.is_none_or(|(y, m)| r.has_entries_in(y, m)))
        .map(StayRow::from)
        .collect();

    if rows.is_empty() && !output.is_json() {
        println!("No stays registered.");
        return Ok(());
    }
    render_list(&rows, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_argument_parses() {
        assert_eq!(parse_month("2024-07"), Ok((2024, 7)));
        assert_eq!(parse_month(" 2025-12 "), Ok((2025, 12)));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("July").is_err());
    }
}
