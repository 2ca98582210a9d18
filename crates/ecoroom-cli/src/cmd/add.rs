//! `ecoroom add`: register a stay from the add form fields.

use crate::cmd::Project;
use crate::output::{OutputMode, render_mode};
use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::Args;
use ecoroom_core::db::BatchReport;
use ecoroom_core::session::StayForm;
use std::path::Path;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Room number.
    pub room: String,

    /// Guest name.
    #[arg(long, default_value = "")]
    pub guest: String,

    /// Check-in date (`YYYY-MM-DD`).
    #[arg(long)]
    pub check_in: NaiveDate,

    /// Number of nights (at least 1).
    #[arg(long)]
    pub nights: u32,

    /// Reduced eco-door service on interior days.
    #[arg(long)]
    pub door_eco: bool,

    /// Guest booked the eco plan (marked on the grid).
    #[arg(long)]
    pub plan_eco: bool,
}

/// Execute `ecoroom add`.
///
/// # Errors
///
/// Returns a validation error for a bad room id, zero nights or a room that
/// is already registered, or an error if the store write fails.
pub fn run_add(args: &AddArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root)?;
    let mut w = project.writable()?;

    let room = w
        .session
        .propose(
            &w.store,
            StayForm {
                room: args.room.clone(),
                guest: args.guest.clone(),
                check_in: args.check_in,
                nights: args.nights,
                door_eco: args.door_eco,
                plan_eco: args.plan_eco,
            },
        )?
        .room()
        .clone();
    w.session
        .save(&mut w.store, &room)
        .with_context(|| format!("Failed to save room {room}"))?;
    let report = BatchReport {
        saved: vec![room],
        failed: Vec::new(),
    };

    render_mode(
        output,
        &report,
        |r, w| {
            for room in &r.saved {
                writeln!(w, "{room}")?;
            }
            Ok(())
        },
        |r, w| {
            for room in &r.saved {
                writeln!(w, "✓ Registered room {room}")?;
            }
            Ok(())
        },
    )
}
