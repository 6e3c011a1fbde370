// src/engine/mod.rs

//! Execution engine.
//!
//! - [`context`] holds the transient per-process state a run mutates: the
//!   static server slot, the livereload broadcast channel, the watch
//!   registrar and live-resource accounting.
//! - [`sequencer`] resolves a task name into an execution order and drives
//!   it to completion, propagating failure fail-fast.

pub mod context;
pub mod sequencer;

pub use context::{RunContext, ServerHandle};
pub use sequencer::Sequencer;
