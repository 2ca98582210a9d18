use crate::cmd::{Project, now};
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Directory for the copy. Defaults to `[backup] dir`.
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct BackupReport {
    backup: PathBuf,
}

/// Execute `ecoroom backup`: copy the store to a timestamped file.
///
/// # Errors
///
/// Returns an error if the lock cannot be taken or the copy fails.
pub fn run_backup(args: &BackupArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root)?;
    let dir = args.dir.clone().unwrap_or_else(|| project.backup_dir());
    let w = project.writable()?;
    let backup = w.store.backup(&dir, now())?;

    render(output, &BackupReport { backup }, |r, w| {
        writeln!(w, "{}", r.backup.display())
    })
}
