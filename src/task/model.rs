// src/task/model.rs

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::RunContext;

/// Public type alias for task names throughout the crate.
pub type TaskName = String;

/// An atomic unit of work: a zero-argument asynchronous action.
///
/// Implemented by the built-in actions in [`crate::actions`]; tests provide
/// stub implementations that record invocations.
#[async_trait]
pub trait Runnable: Send + Sync {
    async fn run(&self, ctx: Arc<RunContext>) -> anyhow::Result<()>;
}

/// A named unit of work: either an atomic action or a plan over other names.
#[derive(Clone)]
pub enum Task {
    Action(Arc<dyn Runnable>),
    Plan(Plan),
}

impl Task {
    /// Wrap a runnable as an action task.
    pub fn action(runnable: impl Runnable + 'static) -> Self {
        Task::Action(Arc::new(runnable))
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Action(_) => f.write_str("Task::Action(..)"),
            Task::Plan(plan) => f.debug_tuple("Task::Plan").field(plan).finish(),
        }
    }
}

/// One element of a plan: a single task name or a set of task names that
/// run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Single(TaskName),
    Parallel(Vec<TaskName>),
}

impl Step {
    /// Task names referenced by this step, in declaration order.
    pub fn members(&self) -> &[TaskName] {
        match self {
            Step::Single(name) => std::slice::from_ref(name),
            Step::Parallel(names) => names.as_slice(),
        }
    }
}

/// An ordered sequence of steps. Steps execute in list order; a step starts
/// only after the previous one succeeded. An empty plan succeeds trivially.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single-task step.
    pub fn then(mut self, name: impl Into<TaskName>) -> Self {
        self.steps.push(Step::Single(name.into()));
        self
    }

    /// Append a parallel step running all given tasks concurrently.
    pub fn all<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<TaskName>,
    {
        self.steps
            .push(Step::Parallel(names.into_iter().map(Into::into).collect()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
