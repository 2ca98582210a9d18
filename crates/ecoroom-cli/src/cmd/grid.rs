//! `ecoroom grid`: publish the month sheets, optionally retiring by them.

use crate::cmd::{Project, now};
use crate::output::{OutputMode, render_mode};
use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::Args;
use ecoroom_core::session::{CycleReport, PublishReport, RetirementReport};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct GridArgs {
    /// Write the grid document here instead of the configured path.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Open the published document with the system's default handler.
    #[arg(long)]
    pub open: bool,

    /// Save, publish, then retire rooms whose cell for DATE is blank.
    #[arg(long, value_name = "DATE")]
    pub retire_on: Option<NaiveDate>,

    /// Skip the store backup taken before retiring.
    #[arg(long, requires = "retire_on")]
    pub no_backup: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GridOutcome {
    Published(PublishReport),
    Cycle(CycleReport),
}

fn write_published(r: &PublishReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "✓ Published {} rooms on {} sheets to {}",
        r.rooms,
        r.sheets.len(),
        r.path.display()
    )?;
    if !r.sheets.is_empty() {
        writeln!(w, "  sheets: {}", r.sheets.join(", "))?;
    }
    Ok(())
}

/// Pretty summary of a retirement pass, shared with `ecoroom retire`.
pub fn write_retired(r: &RetirementReport, w: &mut dyn Write) -> io::Result<()> {
    if let Some(backup) = &r.backup {
        writeln!(w, "  backup: {}", backup.display())?;
    }
    if let Some(hygiene) = r.hygiene.as_ref().filter(|h| !h.removed.is_empty()) {
        let rooms: Vec<String> = hygiene.removed.iter().map(ToString::to_string).collect();
        writeln!(w, "  hygiene removed: {}", rooms.join(", "))?;
    }
    if r.deleted.removed.is_empty() {
        writeln!(w, "✓ Nothing to retire on {}", r.reference)?;
    } else {
        let rooms: Vec<String> = r.deleted.removed.iter().map(ToString::to_string).collect();
        writeln!(
            w,
            "✓ Retired {} rooms on {}: {}",
            rooms.len(),
            r.reference,
            rooms.join(", ")
        )?;
    }
    for warning in &r.warnings {
        writeln!(w, "  warning: {warning}")?;
    }
    Ok(())
}

/// Hand a file to the platform's default opener. The opener runs detached.
fn open_with_default_handler(path: &Path) -> Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        std::process::Command::new("xdg-open")
    };
    command
        .arg(path)
        .spawn()
        .with_context(|| format!("Failed to open {}", path.display()))?;
    tracing::info!(path = %path.display(), "grid handed to default handler");
    Ok(())
}

/// Execute `ecoroom grid`.
///
/// # Errors
///
/// Returns an error if the store cannot be read, the document cannot be
/// written, the backup fails, or the opener cannot be started.
pub fn run_grid(args: &GridArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root)?;
    let path = args.out.clone().unwrap_or_else(|| project.grid_path());
    let outcome = match args.retire_on {
        None => {
            let w = project.writable()?;
            GridOutcome::Published(w.session.publish_grid(&w.store, &path)?)
        }
        Some(reference) => {
            let mut w = project.writable_without_hygiene()?;
            let backup_dir = (project.config.backup.before_retire && !args.no_backup)
                .then(|| project.backup_dir());
            GridOutcome::Cycle(w.session.publish_and_retire(
                &mut w.store,
                &path,
                reference,
                backup_dir.as_deref(),
                now(),
                project.hygiene_date(),
            )?)
        }
    };

    render_mode(
        output,
        &outcome,
        |o, w| match o {
            GridOutcome::Published(r) => writeln!(w, "{}", r.path.display()),
            GridOutcome::Cycle(c) => {
                writeln!(w, "{}", c.published.path.display())?;
                for room in &c.retired.deleted.removed {
                    writeln!(w, "retired\t{room}")?;
                }
                Ok(())
            }
        },
        |o, w| match o {
            GridOutcome::Published(r) => write_published(r, w),
            GridOutcome::Cycle(c) => {
                write_published(&c.published, w)?;
                write_retired(&c.retired, w)
            }
        },
    )?;

    if args.open {
        open_with_default_handler(&path)?;
    }
    Ok(())
}
