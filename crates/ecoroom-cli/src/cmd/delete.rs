//! `ecoroom delete`: remove stays by room number.

use crate::cmd::{Project, parse_room};
use crate::output::{OutputMode, render_mode};
use anyhow::Result;
use clap::Args;
use ecoroom_core::Error;
use ecoroom_core::db::DeleteReport;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Room numbers to remove.
    #[arg(required = true)]
    pub rooms: Vec<String>,
}

/// Execute `ecoroom delete <room>...`.
///
/// Every room is checked before anything is removed.
///
/// # Errors
///
/// Returns `RoomNotFound` if any room is unknown (nothing is deleted), or
/// an error if the delete fails.
pub fn run_delete(args: &DeleteArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let rooms = args
        .rooms
        .iter()
        .map(|raw| parse_room(raw))
        .collect::<Result<BTreeSet<_>>>()?;
    let project = Project::open(project_root)?;
    let mut w = project.writable()?;

    if let Some(missing) = rooms.iter().find(|r| w.session.record(r).is_none()) {
        return Err(Error::NotFound(missing.clone()).into());
    }

    let mut report = DeleteReport::default();
    for room in &rooms {
        let one = w.session.delete(&mut w.store, room)?;
        report.removed.extend(one.removed);
    }

    render_mode(
        output,
        &report,
        |r, w| {
            for room in &r.removed {
                writeln!(w, "{room}")?;
            }
            Ok(())
        },
        |r, w| {
            for room in &r.removed {
                writeln!(w, "✓ Deleted room {room}")?;
            }
            Ok(())
        },
    )
}
