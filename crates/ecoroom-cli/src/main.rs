#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "ecoroom: room cleaning calendar with month-sheet publishing",
    long_about = None
)]
struct Cli {
    /// Output format (defaults to pretty on a terminal, text when piped).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Project root (the directory holding `.ecoroom/`). Defaults to the
    /// current directory.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize an ecoroom project",
        long_about = "Create .ecoroom/ with a default config and an empty store.",
        after_help = "EXAMPLES:\n    # Initialize a project in the current directory\n    ecoroom init\n\n    # Rewrite the default config, keeping the store\n    ecoroom init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Stays",
        about = "Register a stay",
        long_about = "Register a stay and generate its cleaning schedule.",
        after_help = "EXAMPLES:\n    # Three nights from July 10\n    ecoroom add 101 --guest \"Sato\" --check-in 2024-07-10 --nights 3\n\n    # Eco-door guest on the eco plan\n    ecoroom add 205 --check-in 2024-07-10 --nights 5 --door-eco --plan-eco"
    )]
    Add(cmd::add::AddArgs),

    #[command(
        next_help_heading = "Stays",
        about = "List registered stays",
        long_about = "List registered stays in room order.",
        after_help = "EXAMPLES:\n    # Every stay\n    ecoroom list\n\n    # Stays with a day in July 2024\n    ecoroom list --month 2024-07\n\n    # Emit machine-readable output\n    ecoroom list --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Stays",
        about = "Show one stay",
        long_about = "Show a stay and its day-by-day cleaning schedule.",
        after_help = "EXAMPLES:\n    # Show room 101\n    ecoroom show 101"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Stays",
        about = "Change a stay",
        long_about = "Change a stay's guest, dates or flags, or set interior days by hand.",
        after_help = "EXAMPLES:\n    # Extend to July 15\n    ecoroom edit 101 --check-out 2024-07-15\n\n    # Skip cleaning on one day\n    ecoroom edit 101 --set 2024-07-12=skip"
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Stays",
        about = "Delete stays",
        long_about = "Delete stays and their schedules.",
        after_help = "EXAMPLES:\n    # Delete two rooms\n    ecoroom delete 101 102"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Grid",
        about = "Publish the month sheets",
        long_about = "Project every stay into the month-sheet grid document.",
        after_help = "EXAMPLES:\n    # Publish to the configured path\n    ecoroom grid\n\n    # Publish and open\n    ecoroom grid --open\n\n    # Publish, then retire rooms blank on July 15\n    ecoroom grid --retire-on 2024-07-15"
    )]
    Grid(cmd::grid::GridArgs),

    #[command(
        next_help_heading = "Grid",
        about = "Retire finished stays",
        long_about = "Delete stays that are blank on the grid, or checked out in the store.",
        after_help = "EXAMPLES:\n    # Retire by today's column of the published grid\n    ecoroom retire\n\n    # Retire by store status as of July 15\n    ecoroom retire --by status --date 2024-07-15"
    )]
    Retire(cmd::retire::RetireArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Back up the store",
        long_about = "Copy the store to a timestamped backup file.",
        after_help = "EXAMPLES:\n    # Back up to the configured directory\n    ecoroom backup"
    )]
    Backup(cmd::backup::BackupArgs),

    #[command(
        next_help_heading = "Stays",
        about = "Import stays from the room feed",
        long_about = "Propose two-night stays for rooms whose feed status is eligible.",
        after_help = "EXAMPLES:\n    # Preview candidates\n    ecoroom import rooms.csv --eligible 1,3\n\n    # Register the new rooms with eco-door interiors\n    ecoroom import rooms.csv --eligible 1,3 --interior eco-door --apply"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    ecoroom completions bash"
    )]
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ECOROOM_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "ecoroom=debug,ecoroom_core=debug,info"
        } else {
            "ecoroom=info,ecoroom_core=info,warn"
        })
    });

    let format = env::var("ECOROOM_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(command: Commands, output: OutputMode, root: &std::path::Path) -> anyhow::Result<()> {
    match command {
        Commands::Init(args) => cmd::init::run_init(&args, output, root),
        Commands::Add(args) => cmd::add::run_add(&args, output, root),
        Commands::List(args) => cmd::list::run_list(&args, output, root),
        Commands::Show(args) => cmd::show::run_show(&args, output, root),
        Commands::Edit(args) => cmd::edit::run_edit(&args, output, root),
        Commands::Delete(args) => cmd::delete::run_delete(&args, output, root),
        Commands::Grid(args) => cmd::grid::run_grid(&args, output, root),
        Commands::Retire(args) => cmd::retire::run_retire(&args, output, root),
        Commands::Backup(args) => cmd::backup::run_backup(&args, output, root),
        Commands::Import(args) => cmd::import::run_import(&args, output, root),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "ecoroom", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let root = match cli.root.clone() {
        Some(root) => root,
        None => match env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("error: cannot read current directory: {e}");
                return ExitCode::FAILURE;
            }
        },
    };
    let output = output::resolve_output_mode(cli.format, cli.json, &root);

    match run(cli.command, output, &root) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            if let Err(render) = output::render_error(output, &CliError::from_anyhow(&e)) {
                eprintln!("error: {e:#} (while rendering: {render})");
            }
            ExitCode::FAILURE
        }
    }
}
