// src/config/validate.rs

use anyhow::{Result, anyhow};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, StepSpec};

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - there is at least one task
/// - `debounce_ms >= 1`
/// - every task declares exactly one kind
/// - kind-qualifying fields are attached to the right kind
///   (`into` with `copy`, `run`/`exclude` with `watch`, `ready_on_stdout`
///   and `port` where they belong)
/// - all plan members and watch rerun targets refer to existing tasks
/// - plan composition has no cycles
///
/// It does **not** compile globs or regexes; those are compiled (and fail
/// fast) when the registry is built from this config.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_kinds(cfg)?;
    validate_task_references(cfg)?;
    validate_plan_acyclic(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &ConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(anyhow!(
            "config must contain at least one [task.<name>] section"
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &ConfigFile) -> Result<()> {
    if cfg.config.debounce_ms == 0 {
        return Err(anyhow!("[config].debounce_ms must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_task_kinds(cfg: &ConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        let kinds = task.kinds_present();
        match kinds.len() {
            0 => {
                return Err(anyhow!(
                    "task '{}' declares no kind (expected one of plan, exec, copy, serve, serve_stop, reload, watch)",
                    name
                ));
            }
            1 => {}
            _ => {
                return Err(anyhow!(
                    "task '{}' declares more than one kind: {:?}",
                    name,
                    kinds
                ));
            }
        }

        let kind = kinds[0];
        if task.into.is_some() && kind != "copy" {
            return Err(anyhow!("task '{}': `into` is only valid with `copy`", name));
        }
        if kind == "copy" && task.into.is_none() {
            return Err(anyhow!("task '{}': `copy` requires `into`", name));
        }
        if task.port.is_some() && kind != "serve" {
            return Err(anyhow!("task '{}': `port` is only valid with `serve`", name));
        }
        if task.ready_on_stdout.is_some() && kind != "exec" {
            return Err(anyhow!(
                "task '{}': `ready_on_stdout` is only valid with `exec`",
                name
            ));
        }
        if (task.run.is_some() || !task.exclude.is_empty()) && kind != "watch" {
            return Err(anyhow!(
                "task '{}': `run` and `exclude` are only valid with `watch`",
                name
            ));
        }
        if kind == "watch" && task.run.is_none() {
            return Err(anyhow!("task '{}': `watch` requires `run`", name));
        }
    }
    Ok(())
}

fn validate_task_references(cfg: &ConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for referenced in task.referenced_tasks() {
            if !cfg.task.contains_key(referenced) {
                return Err(anyhow!(
                    "task '{}' references unknown task '{}'",
                    name,
                    referenced
                ));
            }
        }
        if let Some(steps) = &task.plan {
            for step in steps {
                match step {
                    StepSpec::Single(member) if member == name => {
                        return Err(anyhow!("task '{}' cannot list itself in its plan", name));
                    }
                    StepSpec::Parallel(members) if members.iter().any(|m| m == name) => {
                        return Err(anyhow!("task '{}' cannot list itself in its plan", name));
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

fn validate_plan_acyclic(cfg: &ConfigFile) -> Result<()> {
    // Edge direction: member -> plan that contains it. A topological sort
    // fails iff plan composition is cyclic. Watch rerun edges are excluded:
    // a watch task rerunning a plan that contains it is normal wiring, not
    // a composition cycle.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        if let Some(steps) = &task.plan {
            for step in steps {
                match step {
                    StepSpec::Single(member) => {
                        graph.add_edge(member.as_str(), name.as_str(), ());
                    }
                    StepSpec::Parallel(members) => {
                        for member in members {
                            graph.add_edge(member.as_str(), name.as_str(), ());
                        }
                    }
                }
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(anyhow!(
                "cycle detected in plan composition involving task '{}'",
                node
            ))
        }
    }
}
