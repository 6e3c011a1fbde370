// src/watch/mod.rs

//! File watching and change dispatch.
//!
//! This module is responsible for:
//! - Compiling `watch` / `exclude` glob patterns per subscription.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Debouncing change bursts and serializing reruns per subscription.
//!
//! It does **not** know about plan internals; it only turns filesystem
//! changes into sequencer runs of the bound task name.

pub mod patterns;
pub mod watcher;

pub use patterns::WatchProfile;
pub use watcher::{WatchRequest, spawn_watch_manager};
