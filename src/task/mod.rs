// src/task/mod.rs

//! Task model and registry.
//!
//! - [`model`] defines the tagged-variant task type: an atomic [`Runnable`]
//!   action or a [`Plan`] of ordered/parallel steps over other task names.
//! - [`registry`] holds the name → task mapping, including construction from
//!   a validated config file.

pub mod model;
pub mod registry;

pub use model::{Plan, Runnable, Step, Task, TaskName};
pub use registry::Registry;
