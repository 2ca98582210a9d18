//! `ecoroom edit`: change a stored stay and rewrite its schedule.

use crate::cmd::{Project, parse_room};
use crate::output::{OutputMode, render_mode};
use anyhow::{Context as _, Result};
use chrono::{Days, NaiveDate};
use clap::Args;
use ecoroom_core::model::CleaningStatus;
use ecoroom_core::session::EditRequest;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Room number.
    pub room: String,

    /// New guest name.
    #[arg(long)]
    pub guest: Option<String>,

    /// New check-in date (`YYYY-MM-DD`).
    #[arg(long)]
    pub check_in: Option<NaiveDate>,

    /// New check-out date (`YYYY-MM-DD`).
    #[arg(long, conflicts_with = "nights")]
    pub check_out: Option<NaiveDate>,

    /// New length of stay, counted from the (new) check-in date.
    #[arg(long)]
    pub nights: Option<u32>,

    /// Turn eco-door service on or off.
    #[arg(long)]
    pub door_eco: Option<bool>,

    /// Turn the eco-plan marker on or off.
    #[arg(long)]
    pub plan_eco: Option<bool>,

    /// Set one interior day by hand, e.g. `2024-07-12=skip`. Repeatable.
    #[arg(long = "set", value_name = "DATE=STATUS", value_parser = parse_override)]
    pub overrides: Vec<(NaiveDate, CleaningStatus)>,
}

fn parse_override(raw: &str) -> Result<(NaiveDate, CleaningStatus), String> {
    let (date, status) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected DATE=STATUS, got '{raw}'"))?;
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| format!("bad date '{date}': {e}"))?;
    let status = status.parse::<CleaningStatus>().map_err(|e| e.to_string())?;
    Ok((date, status))
}

/// Execute `ecoroom edit <room>`.
///
/// # Errors
///
/// Returns `RoomNotFound` for an unknown room, a validation error for
/// inconsistent dates or an override on a check-in/check-out day, or an
/// error if the store write fails.
pub fn run_edit(args: &EditArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let room = parse_room(&args.room)?;
    let project = Project::open(project_root)?;
    let mut w = project.writable()?;

    let check_out = match args.nights {
        Some(nights) => {
            let from = match args.check_in {
                Some(date) => date,
                None => w
                    .session
                    .record(&room)
                    .map(|r| r.stay.check_in)
                    .ok_or_else(|| ecoroom_core::Error::NotFound(room.clone()))?,
            };
            Some(
                from.checked_add_days(Days::new(u64::from(nights)))
                    .context("check-out date is out of range")?,
            )
        }
        None => args.check_out,
    };

    let request = EditRequest {
        guest: args.guest.clone(),
        check_in: args.check_in,
        check_out,
        door_eco: args.door_eco,
        plan_eco: args.plan_eco,
        overrides: args.overrides.iter().copied().collect::<BTreeMap<_, _>>(),
    };
    let record = w.session.edit(&mut w.store, &room, request)?;

    render_mode(
        output,
        &record,
        |r, w| writeln!(w, "{}\t{}\t{}", r.room(), r.stay.check_in, r.stay.nights),
        |r, w| {
            writeln!(
                w,
                "✓ Updated room {}: {} for {} nights",
                r.room(),
                r.stay.check_in,
                r.stay.nights
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_argument_parses() {
        let (date, status) = parse_override("2024-07-12=skip").expect("parse");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 7, 12).expect("date"));
        assert_eq!(status, CleaningStatus::Skip);

        let (_, status) = parse_override("2024-07-13=エコドア").expect("parse");
        assert_eq!(status, CleaningStatus::EcoDoor);
    }

    #[test]
    fn override_argument_rejects_garbage() {
        assert!(parse_override("2024-07-12").is_err());
        assert!(parse_override("07/12=skip").is_err());
        assert!(parse_override("2024-07-12=vacuum").is_err());
    }
}
