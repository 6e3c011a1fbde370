// src/lib.rs

pub mod actions;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod task;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, StepSpec};
use crate::engine::{RunContext, Sequencer};
use crate::task::Registry;
use crate::watch::spawn_watch_manager;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - registry / sequencer / run context
/// - the watch manager
/// - Ctrl-C handling for runs that leave live resources behind
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let task = args.task.context("no task name given")?;
    let root = config_root_dir(&config_path);
    let registry = Arc::new(Registry::from_config(&cfg)?);

    let (watch_tx, watch_rx) = mpsc::unbounded_channel();
    let ctx = Arc::new(RunContext::new(root.clone(), watch_tx));
    let sequencer = Sequencer::new(registry, Arc::clone(&ctx));

    spawn_watch_manager(
        root,
        sequencer.clone(),
        Duration::from_millis(cfg.config.debounce_ms),
        watch_rx,
    );

    sequencer.run(&task).await?;

    // A successful run may leave a server, watch subscriptions or background
    // processes behind; stay alive until Ctrl-C in that case.
    if ctx.has_live_resources().await {
        info!("run complete; live resources active, press Ctrl-C to exit");
        tokio::signal::ctrl_c().await?;
        info!("shutting down");
        if let Some(handle) = ctx.take_server().await {
            handle.join.abort();
        }
    }

    Ok(())
}

/// Figure out a sensible project root.
/// Currently: directory containing the config file, or `.`.
fn config_root_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Simple dry-run output: print tasks and their kinds.
fn print_dry_run(cfg: &ConfigFile) {
    println!("planrun dry-run");
    println!("  config.debounce_ms = {}", cfg.config.debounce_ms);
    println!("  config.host = {}", cfg.config.host);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        if let Some(steps) = &task.plan {
            println!("      plan: {}", format_steps(steps));
        }
        if let Some(cmd) = &task.exec {
            println!("      exec: {cmd}");
            if let Some(pattern) = &task.ready_on_stdout {
                println!("      ready_on_stdout: {pattern}");
            }
        }
        if let Some(pattern) = &task.copy {
            if let Some(dest) = &task.into {
                println!("      copy: {pattern} -> {}", dest.display());
            }
        }
        if let Some(dir) = &task.serve {
            println!("      serve: {} (port {:?})", dir.display(), task.port);
        }
        if task.serve_stop {
            println!("      serve_stop");
        }
        if task.reload {
            println!("      reload");
        }
        if let Some(patterns) = &task.watch {
            println!("      watch: {:?}", patterns);
            if !task.exclude.is_empty() {
                println!("      exclude: {:?}", task.exclude);
            }
            if let Some(run) = &task.run {
                println!("      run: {run}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}

fn format_steps(steps: &[StepSpec]) -> String {
    let rendered: Vec<String> = steps
        .iter()
        .map(|step| match step {
            StepSpec::Single(name) => name.clone(),
            StepSpec::Parallel(names) => format!("[{}]", names.join(", ")),
        })
        .collect();
    rendered.join(" ; ")
}
