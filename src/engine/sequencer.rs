// src/engine/sequencer.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::engine::context::RunContext;
use crate::errors::{Error, Result};
use crate::task::model::{Plan, Step, Task, TaskName};
use crate::task::registry::Registry;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Resolves a task name into an execution order and drives it to completion.
///
/// Semantics:
/// - Plan steps run in strict list order; a step starts only after the
///   previous step succeeded.
/// - Members of a parallel step are spawned as concurrent tokio tasks and
///   awaited jointly. **Failure policy: wait for all, then fail.** A failing
///   member does not preempt its siblings; the step fails with the first
///   failure observed, and any further sibling failures are logged rather
///   than swallowed.
/// - On failure, remaining steps are skipped and the error is wrapped with
///   the failing step's identity, nesting through plan recursion.
/// - An empty plan succeeds immediately.
/// - Re-invoking a name that is already running is unsupported; no dedup or
///   reentrancy guarantee is provided.
#[derive(Clone)]
pub struct Sequencer {
    registry: Arc<Registry>,
    ctx: Arc<RunContext>,
}

impl Sequencer {
    pub fn new(registry: Arc<Registry>, ctx: Arc<RunContext>) -> Self {
        Self { registry, ctx }
    }

    pub fn context(&self) -> &Arc<RunContext> {
        &self.ctx
    }

    /// Run one top-level task by name.
    pub async fn run(&self, name: &str) -> Result<()> {
        info!(task = %name, "run started");
        let result = self.clone().run_task(name.to_string()).await;
        match &result {
            Ok(()) => info!(task = %name, "run finished"),
            Err(err) => warn!(task = %name, chain = ?err.task_chain(), "run failed"),
        }
        result
    }

    // Boxed for recursion and so parallel members are 'static spawnable.
    fn run_task(self, name: TaskName) -> BoxFuture<Result<()>> {
        Box::pin(async move {
            let task = self.registry.resolve(&name)?;
            match task {
                Task::Action(runnable) => {
                    debug!(task = %name, "running action");
                    let runnable = Arc::clone(runnable);
                    runnable
                        .run(Arc::clone(&self.ctx))
                        .await
                        .map_err(|source| Error::Action { task: name, source })
                }
                Task::Plan(plan) => {
                    let plan = plan.clone();
                    self.run_plan(&name, plan).await
                }
            }
        })
    }

    async fn run_plan(&self, task: &str, plan: Plan) -> Result<()> {
        if plan.is_empty() {
            debug!(task = %task, "empty plan; nothing to do");
            return Ok(());
        }

        for (idx, step) in plan.steps.into_iter().enumerate() {
            let step_no = idx + 1;
            match step {
                Step::Single(member) => {
                    debug!(task = %task, step = step_no, member = %member, "running step");
                    self.clone().run_task(member).await.map_err(|source| Error::Step {
                        task: task.to_string(),
                        step: step_no,
                        source: Box::new(source),
                    })?;
                }
                Step::Parallel(members) => {
                    debug!(task = %task, step = step_no, ?members, "running parallel step");
                    self.run_parallel(task, step_no, members).await?;
                }
            }
        }

        Ok(())
    }

    /// Run all members of a parallel step to completion, then report the
    /// first observed failure (if any) as the step's outcome.
    async fn run_parallel(&self, task: &str, step_no: usize, members: Vec<TaskName>) -> Result<()> {
        let mut set = JoinSet::new();
        for member in members {
            set.spawn(self.clone().run_task(member));
        }

        let mut first_failure: Option<Error> = None;

        while let Some(joined) = set.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_err) => Err(Error::Action {
                    task: task.to_string(),
                    source: anyhow!("parallel member panicked: {join_err}"),
                }),
            };

            if let Err(err) = outcome {
                if first_failure.is_none() {
                    first_failure = Some(err);
                } else {
                    // Never silently swallow sibling failures.
                    warn!(
                        task = %task,
                        step = step_no,
                        error = %err,
                        "additional failure in parallel step"
                    );
                }
            }
        }

        match first_failure {
            None => Ok(()),
            Some(source) => Err(Error::Step {
                task: task.to_string(),
                step: step_no,
                source: Box::new(source),
            }),
        }
    }
}
