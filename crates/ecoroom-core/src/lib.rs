//! ecoroom-core library.
//!
//! Stays go in through [`session::Session`], get their day-by-day cleaning
//! calendar from [`calendar`], live in the SQLite [`db::Store`], are published
//! as month sheets by [`grid`], and leave again through [`reconcile`].
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`error::Result`]; config loading
//!   uses `anyhow::Result`.
//! - **Logging**: `tracing` macros only. The binary installs the subscriber.

pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod grid;
pub mod lock;
pub mod model;
pub mod reconcile;
pub mod session;

pub use error::{Error, ErrorCode, Result};
