//! Shared domain types, persistence, configuration and crypto for the
//! sprint tracker sync and analytics platform.
//!
//! - [`types`] — entities shared by every other crate in the workspace.
//! - [`db`] — SQLite-backed repository (`tokio_rusqlite`).
//! - [`config`] — layered TOML + environment configuration.
//! - [`crypto`] — at-rest encryption for tracker credentials.
//! - [`error`] — the crate-wide error taxonomy other crates convert into.

pub mod cancel;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod types;

pub use db::SprintforgeDb;
pub use error::{CoreError, Result};
