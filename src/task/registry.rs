// src/task/registry.rs

use std::collections::BTreeMap;

use anyhow::{Context, Result as AnyResult};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::actions::{CopyAction, ExecAction, ReloadAction, ServeAction, ServeStopAction, WatchAction};
use crate::config::model::{ConfigFile, StepSpec, TaskConfig};
use crate::errors::{Error, Result};
use crate::task::model::{Plan, Step, Task, TaskName};
use crate::watch::WatchProfile;

/// Explicit name → task mapping, constructed once before any run and
/// read-only afterwards. There is no ambient global registry; the owning
/// orchestrator shares it via `Arc`.
#[derive(Debug, Default)]
pub struct Registry {
    tasks: BTreeMap<TaskName, Task>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under a unique name.
    ///
    /// Fails with [`Error::DuplicateTask`] if the name is taken; the first
    /// registration stays intact.
    pub fn register(&mut self, name: impl Into<TaskName>, task: Task) -> Result<()> {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(Error::DuplicateTask(name));
        }
        debug!(task = %name, "registered task");
        self.tasks.insert(name, task);
        Ok(())
    }

    /// Look up a task by name.
    pub fn resolve(&self, name: &str) -> Result<&Task> {
        self.tasks
            .get(name)
            .ok_or_else(|| Error::UnknownTask(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Check that every plan member resolves and that plan composition is
    /// acyclic. Must pass before any run starts.
    pub fn validate(&self) -> Result<()> {
        for task in self.tasks.values() {
            if let Task::Plan(plan) = task {
                for step in &plan.steps {
                    for member in step.members() {
                        if !self.tasks.contains_key(member) {
                            return Err(Error::UnknownTask(member.clone()));
                        }
                    }
                }
            }
        }
        self.check_acyclic()
    }

    // Same petgraph toposort check as config validation, restated over the
    // built registry so programmatic (non-config) registrations are covered.
    fn check_acyclic(&self) -> Result<()> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.tasks.keys() {
            graph.add_node(name.as_str());
        }

        for (name, task) in self.tasks.iter() {
            if let Task::Plan(plan) = task {
                for step in &plan.steps {
                    for member in step.members() {
                        graph.add_edge(member.as_str(), name.as_str(), ());
                    }
                }
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(Error::Config(format!(
                "cycle detected in plan composition involving task '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// Build a registry from a validated [`ConfigFile`].
    ///
    /// Glob patterns and readiness regexes are compiled here, so malformed
    /// patterns are fatal before any execution starts.
    pub fn from_config(cfg: &ConfigFile) -> AnyResult<Self> {
        let mut registry = Registry::new();

        for (name, tc) in cfg.task.iter() {
            let task = build_task(name, tc, cfg)
                .with_context(|| format!("building task '{}'", name))?;
            registry
                .register(name.clone(), task)
                .map_err(anyhow::Error::from)?;
        }

        // Rerun targets live inside opaque watch actions, so they are
        // checked here against the finished registry rather than in
        // `validate`.
        for (name, tc) in cfg.task.iter() {
            if tc.watch.is_some() {
                if let Some(run) = &tc.run {
                    if registry.resolve(run).is_err() {
                        anyhow::bail!("watch task '{}' reruns unknown task '{}'", name, run);
                    }
                }
            }
        }

        registry.validate().map_err(anyhow::Error::from)?;
        Ok(registry)
    }
}

fn build_task(name: &str, tc: &TaskConfig, cfg: &ConfigFile) -> AnyResult<Task> {
    if let Some(steps) = &tc.plan {
        let steps = steps
            .iter()
            .map(|spec| match spec {
                StepSpec::Single(member) => Step::Single(member.clone()),
                StepSpec::Parallel(members) => Step::Parallel(members.clone()),
            })
            .collect();
        return Ok(Task::Plan(Plan { steps }));
    }

    if let Some(cmd) = &tc.exec {
        let action = ExecAction::new(cmd.clone(), tc.ready_on_stdout.as_deref())
            .context("compiling ready_on_stdout regex")?;
        return Ok(Task::action(action));
    }

    if let Some(pattern) = &tc.copy {
        let dest = tc
            .into
            .clone()
            .context("`copy` requires `into`")?;
        let action = CopyAction::new(pattern, dest)
            .with_context(|| format!("compiling copy glob '{}'", pattern))?;
        return Ok(Task::action(action));
    }

    if let Some(dir) = &tc.serve {
        return Ok(Task::action(ServeAction::new(
            dir.clone(),
            cfg.config.host.clone(),
            tc.port,
        )));
    }

    if tc.serve_stop {
        return Ok(Task::action(ServeStopAction));
    }

    if tc.reload {
        return Ok(Task::action(ReloadAction));
    }

    if let Some(patterns) = &tc.watch {
        let run = tc.run.clone().context("`watch` requires `run`")?;
        let profile = WatchProfile::compile(name, patterns, &tc.exclude)
            .with_context(|| format!("compiling watch globs for task '{}'", name))?;
        return Ok(Task::action(WatchAction::new(profile, run)));
    }

    // Unreachable after config validation, but keep a real error for
    // programmatic misuse.
    anyhow::bail!("task '{}' declares no kind", name)
}
