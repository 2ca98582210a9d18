pub mod add;
pub mod backup;
pub mod delete;
pub mod edit;
pub mod grid;
pub mod import;
pub mod init;
pub mod list;
pub mod retire;
pub mod show;

use anyhow::{Context as _, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use ecoroom_core::config::{self, ProjectConfig};
use ecoroom_core::db::Store;
use ecoroom_core::lock::{DEFAULT_LOCK_TIMEOUT, StoreLock};
use ecoroom_core::model::RoomId;
use ecoroom_core::session::Session;
use ecoroom_core::{Error, ErrorCode};
use std::path::{Path, PathBuf};

/// An initialized project directory and its configuration.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
}

/// Everything a mutating command needs, held for the command's lifetime.
pub struct Writable {
    pub store: Store,
    pub session: Session,
    _lock: StoreLock,
}

impl Project {
    /// Open the project rooted at `root`.
    ///
    /// # Errors
    ///
    /// Fails with `NotInitialized` if `.ecoroom/` is missing, or if the
    /// project config cannot be parsed.
    pub fn open(root: &Path) -> Result<Self> {
        if !config::project_dir(root).is_dir() {
            return Err(Error::Validation {
                code: ErrorCode::NotInitialized,
                reason: format!("no {} directory in {}", config::PROJECT_DIR, root.display()),
            }
            .into());
        }
        let config = config::load_project_config(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.config.store_path(&self.root)
    }

    pub fn grid_path(&self) -> PathBuf {
        self.config.grid_path(&self.root)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.config.backup_dir(&self.root)
    }

    /// Open the store without taking the write lock.
    pub fn read_store(&self) -> Result<Store> {
        let path = self.store_path();
        Store::open(&path).with_context(|| format!("Failed to open store {}", path.display()))
    }

    /// Take the write lock, open the store and load a session.
    ///
    /// Hygiene is left to the caller; see [`Self::hygiene_date`].
    pub fn writable_without_hygiene(&self) -> Result<Writable> {
        let lock = StoreLock::acquire(&config::lock_path(&self.root), DEFAULT_LOCK_TIMEOUT)?;
        let store = self.read_store()?;
        let session = Session::load(&store)?;
        Ok(Writable {
            store,
            session,
            _lock: lock,
        })
    }

    /// [`Self::writable_without_hygiene`], then status-based hygiene at
    /// today's date unless `[startup] status_hygiene = false`.
    pub fn writable(&self) -> Result<Writable> {
        let mut w = self.writable_without_hygiene()?;
        if let Some(today) = self.hygiene_date() {
            w.session.startup_hygiene(&mut w.store, today)?;
        }
        Ok(w)
    }

    /// Date for startup hygiene, `None` when it is switched off.
    pub fn hygiene_date(&self) -> Option<NaiveDate> {
        self.config.startup.status_hygiene.then(today)
    }
}

/// Local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Local wall-clock time, used for backup file names.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parse a room id argument.
pub fn parse_room(raw: &str) -> Result<RoomId> {
    Ok(RoomId::parse(raw)?)
}
