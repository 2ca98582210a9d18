//! `ecoroom retire`: drop finished stays by grid or by status.

use crate::cmd::grid::write_retired;
use crate::cmd::{Project, now, today};
use crate::output::{OutputMode, render_mode};
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use ecoroom_core::session::{RetireRequest, RetirementSource};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RetireBy {
    /// Blank cells on the published month sheet.
    Grid,
    /// Checked-out, empty or unscheduled stays in the store.
    Status,
}

#[derive(Args, Debug)]
pub struct RetireArgs {
    /// Where the deletion set comes from.
    #[arg(long, value_enum, default_value = "grid")]
    pub by: RetireBy,

    /// Reference date (`YYYY-MM-DD`). Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Read this grid document instead of the configured one.
    #[arg(long, value_name = "PATH")]
    pub grid: Option<PathBuf>,

    /// Skip the store backup taken before deleting.
    #[arg(long)]
    pub no_backup: bool,
}

/// Execute `ecoroom retire`.
///
/// A missing or unreadable grid document retires nothing. Startup hygiene
/// runs after the backup so the copy still holds what it removes.
///
/// # Errors
///
/// Returns an error if the backup fails (nothing is deleted) or the store
/// query or delete fails.
pub fn run_retire(args: &RetireArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root)?;
    let mut w = project.writable_without_hygiene()?;

    let source = match args.by {
        RetireBy::Grid => {
            RetirementSource::Grid(args.grid.clone().unwrap_or_else(|| project.grid_path()))
        }
        RetireBy::Status => RetirementSource::Status,
    };
    let backup_dir =
        (project.config.backup.before_retire && !args.no_backup).then(|| project.backup_dir());
    let report = w.session.retire(
        &mut w.store,
        RetireRequest {
            source,
            reference: args.date.unwrap_or_else(today),
            backup_dir,
            stamp: now(),
            hygiene: project.hygiene_date(),
        },
    )?;

    render_mode(
        output,
        &report,
        |r, w| {
            for room in r.hygiene.iter().flat_map(|h| &h.removed) {
                writeln!(w, "hygiene\t{room}")?;
            }
            for room in &r.deleted.removed {
                writeln!(w, "{room}")?;
            }
            Ok(())
        },
        |r, w| write_retired(r, w),
    )
}
