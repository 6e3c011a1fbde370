// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Registration-time errors (`DuplicateTask`, `UnknownTask`) are fatal before
//! any execution starts. `Step` wraps a failing step's underlying error with
//! the identity of the step, nesting for plans that invoke other plans, so a
//! failed run can report the full chain of task names.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A task name was registered twice. The first registration stays intact.
    #[error("task '{0}' is already registered")]
    DuplicateTask(String),

    /// A task name was resolved that no registration exists for.
    #[error("unknown task '{0}'")]
    UnknownTask(String),

    /// A step of a plan failed; `step` is the 1-based position in the plan.
    #[error("step {step} of task '{task}' failed")]
    Step {
        task: String,
        step: usize,
        #[source]
        source: Box<Error>,
    },

    /// An atomic action failed. The alternate-form source rendering inlines
    /// the full cause chain (anyhow errors cannot sit in `#[source]`
    /// position).
    #[error("task '{task}' failed: {source:#}")]
    Action {
        task: String,
        source: anyhow::Error,
    },

    /// Invalid task wiring detected before execution (e.g. a plan cycle).
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Chain of task names from the invoked task down to the failing action.
    pub fn task_chain(&self) -> Vec<&str> {
        let mut chain: Vec<&str> = Vec::new();
        let mut current = Some(self);

        while let Some(err) = current {
            match err {
                Error::Step { task, source, .. } => {
                    if chain.last() != Some(&task.as_str()) {
                        chain.push(task);
                    }
                    current = Some(source);
                }
                Error::Action { task, .. } => {
                    if chain.last() != Some(&task.as_str()) {
                        chain.push(task);
                    }
                    current = None;
                }
                Error::DuplicateTask(_) | Error::UnknownTask(_) | Error::Config(_) => {
                    current = None;
                }
            }
        }

        chain
    }
}

pub type Result<T> = std::result::Result<T, Error>;
