//! `ecoroom show`: one stay with its day-by-day schedule.

use crate::cmd::{Project, parse_room};
use crate::cmd::list::StayRow;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use anyhow::Result;
use clap::Args;
use ecoroom_core::Error;
use ecoroom_core::model::{ScheduleEntry, StayRecord};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Room number.
    pub room: String,
}

#[derive(Debug, Serialize)]
struct ShowStay {
    #[serde(flatten)]
    summary: StayRow,
    schedule: Vec<ScheduleEntry>,
}

impl From<&StayRecord> for ShowStay {
    fn from(record: &StayRecord) -> Self {
        Self {
            summary: StayRow::from(record),
            schedule: record.schedule.clone(),
        }
    }
}

fn status_text(entry: &ScheduleEntry) -> String {
    let code = entry.status.map_or("", |s| s.as_str());
    if entry.overridden {
        format!("{code} *")
    } else {
        code.to_string()
    }
}

/// Execute `ecoroom show <room>`.
///
/// # Errors
///
/// Returns `RoomNotFound` for an unknown room, or an error if the store
/// cannot be read.
pub fn run_show(args: &ShowArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let room = parse_room(&args.room)?;
    let project = Project::open(project_root)?;
    let store = project.read_store()?;
    let record = store.get(&room)?.ok_or(Error::NotFound(room))?;
    let detail = ShowStay::from(&record);

    render_mode(
        output,
        &detail,
        |d, w| {
            for entry in &d.schedule {
                writeln!(w, "{}\t{}\t{}", d.summary.room, entry.date, status_text(entry))?;
            }
            Ok(())
        },
        |d, w| {
            let s = &d.summary;
            pretty_section(w, &format!("Room {}", s.room))?;
            pretty_kv(w, "Guest", if s.guest.is_empty() { "-" } else { s.guest.as_str() })?;
            pretty_kv(w, "Check-in", s.check_in.to_string())?;
            pretty_kv(
                w,
                "Check-out",
                s.check_out.map_or_else(|| "?".to_string(), |c| c.to_string()),
            )?;
            pretty_kv(w, "Nights", s.nights.to_string())?;
            pretty_kv(w, "Eco door", if s.door_eco { "yes" } else { "no" })?;
            pretty_kv(w, "Eco plan", if s.plan_eco { "yes" } else { "no" })?;
            pretty_kv(w, "Origin", s.origin)?;
            writeln!(w)?;
            pretty_section(w, "Schedule")?;
            for entry in &d.schedule {
                writeln!(
                    w,
                    "  {} {}  {}",
                    entry.date,
                    entry.date.format("%a"),
                    status_text(entry)
                )?;
            }
            if d.schedule.iter().any(|e| e.overridden) {
                writeln!(w)?;
                writeln!(w, "  * set by hand")?;
            }
            Ok(())
        },
    )
}
