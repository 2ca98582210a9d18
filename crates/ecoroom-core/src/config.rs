use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::model::CleaningStatus;

/// Project state directory under the project root.
pub const PROJECT_DIR: &str = ".ecoroom";
const CONFIG_FILE: &str = "config.toml";
const LOCK_FILE: &str = "lock";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub startup: StartupConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Relative paths resolve against the project root.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_path")]
    pub path: PathBuf,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            path: default_grid_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,
    /// Copy the store before every retirement pass.
    #[serde(default = "default_true")]
    pub before_retire: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            before_retire: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Status codes that make a feed row an import candidate.
    #[serde(default)]
    pub eligible: Vec<String>,
    /// Status written on every interior day of an imported stay.
    #[serde(default = "default_feed_interior")]
    pub interior: CleaningStatus,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            eligible: Vec::new(),
            interior: default_feed_interior(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupConfig {
    /// Run status-based retirement against today's date when a command opens
    /// the store for writing. On unless set to `false`.
    #[serde(default = "default_true")]
    pub status_hygiene: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            status_hygiene: default_true(),
        }
    }
}

impl ProjectConfig {
    #[must_use]
    pub fn store_path(&self, root: &Path) -> PathBuf {
        root.join(&self.store.path)
    }

    #[must_use]
    pub fn grid_path(&self, root: &Path) -> PathBuf {
        root.join(&self.grid.path)
    }

    #[must_use]
    pub fn backup_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.backup.dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// `<root>/.ecoroom`
#[must_use]
pub fn project_dir(root: &Path) -> PathBuf {
    root.join(PROJECT_DIR)
}

#[must_use]
pub fn config_path(root: &Path) -> PathBuf {
    project_dir(root).join(CONFIG_FILE)
}

#[must_use]
pub fn lock_path(root: &Path) -> PathBuf {
    project_dir(root).join(LOCK_FILE)
}

/// Parse a TOML file, or return `T::default()` when it does not exist.
///
/// Syntax and schema failures carry [`Error::Config`].
fn read_toml_or_default<T: Default + serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    toml::from_str(&text)
        .map_err(|e| Error::Config(e.to_string()))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// `<root>/.ecoroom/config.toml`, with defaults for a missing file or
/// missing keys.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    read_toml_or_default(&config_path(project_root))
}

/// Write `config` to `<root>/.ecoroom/config.toml`.
///
/// # Errors
///
/// Fails if the directory or file cannot be written.
pub fn write_project_config(project_root: &Path, config: &ProjectConfig) -> Result<PathBuf> {
    let dir = project_dir(project_root);
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = config_path(project_root);
    let text = toml::to_string_pretty(config).context("Failed to serialize project config")?;
    std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// `<config_dir>/ecoroom/config.toml`; defaults when the platform has no
/// config directory.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    dirs::config_dir().map_or_else(
        || Ok(UserConfig::default()),
        |dir| read_toml_or_default(&dir.join("ecoroom").join(CONFIG_FILE)),
    )
}

/// Both config layers plus the output mode they settle on.
///
/// # Errors
///
/// Fails if either config file is unreadable.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;
    let resolved_output = pick_output(
        cli_json,
        env::var("ECOROOM_FORMAT").ok().as_deref(),
        user.output.as_deref(),
        std::io::stdout().is_terminal(),
    )
    .to_string();

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

/// Accepts the mode names plus the `human` and `table` aliases.
fn output_name(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

fn pick_output(
    cli_json: bool,
    env_format: Option<&str>,
    user_output: Option<&str>,
    tty: bool,
) -> &'static str {
    if cli_json {
        return "json";
    }
    env_format
        .and_then(output_name)
        .or_else(|| user_output.and_then(output_name))
        .unwrap_or(if tty { "pretty" } else { "text" })
}

const fn default_true() -> bool {
    true
}

fn default_store_path() -> PathBuf {
    PathBuf::from(PROJECT_DIR).join("hotel_cleaning.db")
}

fn default_grid_path() -> PathBuf {
    PathBuf::from("hotel_cleaning_now.xlsx")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(PROJECT_DIR).join("backups")
}

const fn default_feed_interior() -> CleaningStatus {
    CleaningStatus::Skip
}
