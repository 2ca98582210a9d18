//! `ecoroom import`: propose short stays from the front-desk room feed.
//!
//! Without `--apply` the candidates are only listed. Rooms that already have
//! a stay are listed but never written.

use crate::cmd::{Project, parse_room, today};
use crate::output::{OutputMode, render_mode};
use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::Args;
use ecoroom_core::feed::{self, ImportCandidate};
use ecoroom_core::model::{CleaningStatus, RoomId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Feed file (comma-separated; room in field 2, status in field 7).
    pub file: PathBuf,

    /// Status codes that make a room eligible. Defaults to `[feed] eligible`.
    #[arg(long, value_delimiter = ',')]
    pub eligible: Vec<String>,

    /// Status for every interior day. Defaults to `[feed] interior`.
    #[arg(long)]
    pub interior: Option<CleaningStatus>,

    /// Check-in date of the imported stays. Defaults to today.
    #[arg(long)]
    pub check_in: Option<NaiveDate>,

    /// Only import these rooms. Defaults to every new eligible room.
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Write the selected stays. Without it the candidates are only listed.
    #[arg(long)]
    pub apply: bool,
}

#[derive(Debug, Serialize)]
struct ImportReport {
    candidates: Vec<CandidateRow>,
    imported: Vec<RoomId>,
}

#[derive(Debug, Serialize)]
struct CandidateRow {
    room: RoomId,
    check_in: NaiveDate,
    nights: u32,
    already_registered: bool,
    selected: bool,
}

impl From<&ImportCandidate> for CandidateRow {
    fn from(c: &ImportCandidate) -> Self {
        Self {
            room: c.record.room().clone(),
            check_in: c.record.stay.check_in,
            nights: c.record.stay.nights,
            already_registered: c.already_registered,
            selected: c.selected,
        }
    }
}

/// Narrow the default selection to `wanted`. Registered rooms are never
/// selected.
fn apply_selection(candidates: &mut [ImportCandidate], wanted: &BTreeSet<RoomId>) {
    if wanted.is_empty() {
        return;
    }
    for candidate in candidates {
        candidate.selected =
            !candidate.already_registered && wanted.contains(candidate.record.room());
    }
}

/// Execute `ecoroom import <file>`.
///
/// # Errors
///
/// Returns an error if the feed cannot be read, no eligible codes are
/// configured, the interior status is a check-in/check-out code, or the
/// store write fails.
pub fn run_import(args: &ImportArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root)?;
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read feed {}", args.file.display()))?;
    let rows = feed::parse_feed(&text);

    let eligible: BTreeSet<String> = if args.eligible.is_empty() {
        project.config.feed.eligible.iter().cloned().collect()
    } else {
        args.eligible.iter().map(|c| c.trim().to_string()).collect()
    };
    let interior = args.interior.unwrap_or(project.config.feed.interior);
    let wanted = args
        .select
        .iter()
        .map(|raw| parse_room(raw))
        .collect::<Result<BTreeSet<_>>>()?;

    let mut w = project.writable()?;
    let existing = w.store.room_ids()?;
    let mut candidates = feed::import_eligible(
        &rows,
        &eligible,
        &existing,
        args.check_in.unwrap_or_else(today),
        interior,
    )?;
    apply_selection(&mut candidates, &wanted);

    let rows: Vec<CandidateRow> = candidates.iter().map(CandidateRow::from).collect();
    let imported = if args.apply {
        let queued = w.session.propose_imported(candidates);
        let report = w.session.commit(&mut w.store);
        for failure in &report.failed {
            tracing::warn!(room = %failure.room, reason = %failure.reason, "import failed");
        }
        queued
            .into_iter()
            .filter(|r| report.saved.contains(r))
            .collect()
    } else {
        Vec::new()
    };

    let report = ImportReport {
        candidates: rows,
        imported,
    };
    render_mode(
        output,
        &report,
        |r, w| {
            for c in &r.candidates {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    c.room,
                    c.check_in,
                    if c.already_registered { "registered" } else { "new" },
                    if r.imported.contains(&c.room) { "imported" } else { "-" }
                )?;
            }
            Ok(())
        },
        |r, w| {
            if r.candidates.is_empty() {
                return writeln!(w, "No eligible rooms in the feed.");
            }
            for c in &r.candidates {
                let mark = if r.imported.contains(&c.room) {
                    "✓"
                } else if c.selected {
                    "+"
                } else {
                    " "
                };
                let note = if c.already_registered {
                    "  (already registered)"
                } else {
                    ""
                };
                writeln!(
                    w,
                    "{mark} {:<6} {} for {} nights{note}",
                    c.room, c.check_in, c.nights
                )?;
            }
            if !args.apply {
                writeln!(w)?;
                writeln!(w, "Run again with --apply to register the selected rooms.")?;
            }
            Ok(())
        },
    )
}
