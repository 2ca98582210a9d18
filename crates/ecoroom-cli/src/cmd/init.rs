use crate::output::{OutputMode, pretty_kv, render_mode};
use anyhow::{Context as _, Result};
use clap::Args;
use ecoroom_core::config::{self, ProjectConfig};
use ecoroom_core::db::Store;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite the default config even if `.ecoroom/` already exists.
    /// The store and its stays are kept.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "hotel_cleaning.db\nhotel_cleaning.db-*\nbackups/\nlock\n";

#[derive(Debug, Serialize)]
struct InitReport {
    config: PathBuf,
    store: PathBuf,
    grid: PathBuf,
    stays: usize,
}

/// Execute `ecoroom init`. Creates the project skeleton:
///
/// ```text
/// .ecoroom/
///   config.toml          (default project config)
///   hotel_cleaning.db    (store, migrated to the latest schema)
///   .gitignore           (store, WAL files, backups, lock)
/// ```
///
/// An existing store file at the configured path is opened in place and
/// migrated, so databases from the earlier tool can be adopted by copying
/// them into `.ecoroom/` before running `init`.
///
/// # Errors
///
/// Returns an error if `.ecoroom/` already exists and `--force` is not set,
/// or if any filesystem or store operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project_dir = config::project_dir(project_root);

    if project_dir.exists() && !args.force {
        anyhow::bail!(
            "{}/ already exists. Use `ecoroom init --force` to reinitialize.",
            config::PROJECT_DIR
        );
    }

    std::fs::create_dir_all(&project_dir)
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;

    let defaults = ProjectConfig::default();
    let config_path = config::write_project_config(project_root, &defaults)?;

    let gitignore_path = project_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write {}", gitignore_path.display()))?;

    let store_path = defaults.store_path(project_root);
    let store = Store::open(&store_path)
        .with_context(|| format!("Failed to open store {}", store_path.display()))?;
    let stays = store.room_ids()?.len();
    tracing::info!(root = %project_root.display(), stays, "project initialized");

    let report = InitReport {
        config: config_path,
        store: store_path,
        grid: defaults.grid_path(project_root),
        stays,
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "{}\t{}", r.store.display(), r.stays),
        |r, w| {
            writeln!(w, "✓ Initialized {}/ project structure.", config::PROJECT_DIR)?;
            writeln!(w)?;
            pretty_kv(w, "Config", r.config.display().to_string())?;
            pretty_kv(w, "Store", format!("{} ({} stays)", r.store.display(), r.stays))?;
            pretty_kv(w, "Grid", r.grid.display().to_string())?;
            writeln!(w)?;
            writeln!(w, "Next steps:")?;
            writeln!(w, "  Register a stay:")?;
            writeln!(w, "    ecoroom add 101 --guest \"Sato\" --check-in 2024-07-10 --nights 3")?;
            writeln!(w, "  Publish the month sheets:")?;
            writeln!(w, "    ecoroom grid")
        },
    )
}
