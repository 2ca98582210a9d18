use std::fmt;
use std::path::PathBuf;

use crate::model::RoomId;

/// Machine-readable error codes for scripts and front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    RoomNotFound,
    DuplicateRoom,
    InvalidInput,
    ForbiddenOverride,
    CorruptStore,
    GridUnreadable,
    StoreWriteFailed,
    LockContention,
    BackupFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// `E####`. The first digit groups the failure: 1 setup, 2 input,
    /// 3 stored data, 5 runtime, 9 bug.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::RoomNotFound => "E2001",
            Self::DuplicateRoom => "E2002",
            Self::InvalidInput => "E2003",
            Self::ForbiddenOverride => "E2004",
            Self::CorruptStore => "E3001",
            Self::GridUnreadable => "E3002",
            Self::StoreWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::BackupFailed => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::RoomNotFound => "Room not found",
            Self::DuplicateRoom => "Room already registered",
            Self::InvalidInput => "Invalid input",
            Self::ForbiddenOverride => "Check-in/check-out days cannot be edited",
            Self::CorruptStore => "Corrupt store row",
            Self::GridUnreadable => "Grid document unreadable",
            Self::StoreWriteFailed => "Store write failed",
            Self::LockContention => "Lock contention",
            Self::BackupFailed => "Backup failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `ecoroom init` in the project directory."),
            Self::ConfigParseError => Some("Fix syntax in .ecoroom/config.toml and retry."),
            Self::RoomNotFound => Some("Run `ecoroom list` to see registered rooms."),
            Self::DuplicateRoom => Some("Use `ecoroom edit` to change an existing stay."),
            Self::InvalidInput => None,
            Self::ForbiddenOverride => Some("Change the check-in or check-out date instead."),
            Self::CorruptStore => Some("Restore the latest backup from .ecoroom/backups/."),
            Self::GridUnreadable => Some("Regenerate the grid with `ecoroom grid`."),
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `ecoroom` process finishes."),
            Self::BackupFailed => Some("Check the backup directory and free disk space."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input rejected before any state was touched.
    #[error("{reason}")]
    Validation { code: ErrorCode, reason: String },

    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A persisted row could not be decoded.
    #[error("corrupt store row for room {room}: {detail}")]
    Corrupt { room: String, detail: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("grid document {}: {reason}", .path.display())]
    Grid { path: PathBuf, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("lock at {} still held after {waited_ms} ms", .path.display())]
    LockContention { path: PathBuf, waited_ms: u128 },

    #[error("backup failed: {0}")]
    Backup(String),
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::InvalidInput,
            reason: reason.into(),
        }
    }

    pub(crate) fn duplicate(room: &RoomId) -> Self {
        Self::Validation {
            code: ErrorCode::DuplicateRoom,
            reason: format!("room {room} is already registered"),
        }
    }

    pub(crate) fn forbidden_override(reason: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ForbiddenOverride,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound(_) => ErrorCode::RoomNotFound,
            Self::Store(_) => ErrorCode::StoreWriteFailed,
            Self::Corrupt { .. } => ErrorCode::CorruptStore,
            Self::Io { .. } => ErrorCode::InternalUnexpected,
            Self::Grid { .. } => ErrorCode::GridUnreadable,
            Self::Config(_) => ErrorCode::ConfigParseError,
            Self::LockContention { .. } => ErrorCode::LockContention,
            Self::Backup(_) => ErrorCode::BackupFailed,
        }
    }

    /// Whether the error was a rejected input (nothing was mutated).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::NotFound(_))
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
