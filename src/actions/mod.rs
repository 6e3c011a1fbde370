// src/actions/mod.rs

//! Built-in atomic actions.
//!
//! Each action implements [`crate::task::Runnable`] and is wired up from a
//! `[task.<name>]` config section by `Registry::from_config`:
//!
//! - [`exec`] runs a shell command as a child process.
//! - [`copy`] copies files matching a glob into a destination directory.
//! - [`serve`] starts/stops the static file server with livereload support.
//! - [`reload`] broadcasts a refresh to connected livereload clients.
//! - [`watch`] registers a file-watch subscription with the watch manager.

pub mod copy;
pub mod exec;
pub mod reload;
pub mod serve;
pub mod watch;

pub use copy::CopyAction;
pub use exec::ExecAction;
pub use reload::ReloadAction;
pub use serve::{ServeAction, ServeStopAction, ServerStopError};
pub use watch::WatchAction;
