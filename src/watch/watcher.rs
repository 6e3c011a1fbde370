// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::engine::Sequencer;
use crate::task::TaskName;
use crate::watch::patterns::WatchProfile;

/// A watch subscription: globs to observe and the task to rerun on change.
/// Sent by `WatchAction` into the watch manager; lives until process exit.
#[derive(Debug)]
pub struct WatchRequest {
    pub profile: WatchProfile,
    pub run: TaskName,
}

struct Subscription {
    run: TaskName,
    profile: WatchProfile,
    ping_tx: mpsc::UnboundedSender<()>,
}

impl Subscription {
    /// Spawn the serial rerun worker for one subscription.
    ///
    /// Triggers are debounced to coalesce rapid bursts; a trigger that
    /// arrives while a rerun is in flight queues exactly one further rerun
    /// (pings accumulate in the channel and are drained after the debounce
    /// window). Rerun failures are reported but never end the worker.
    fn spawn(request: WatchRequest, sequencer: Sequencer, debounce: Duration) -> Self {
        let (ping_tx, mut ping_rx) = mpsc::unbounded_channel::<()>();
        let run = request.run.clone();

        let worker_task = run.clone();
        tokio::spawn(async move {
            while ping_rx.recv().await.is_some() {
                sleep(debounce).await;
                while ping_rx.try_recv().is_ok() {}

                info!(task = %worker_task, "change detected; rerunning");
                if let Err(err) = sequencer.run(&worker_task).await {
                    warn!(
                        task = %worker_task,
                        chain = ?err.task_chain(),
                        error = %err,
                        "watch rerun failed; waiting for next change"
                    );
                }
            }
            debug!(task = %worker_task, "watch rerun worker ended");
        });

        Self {
            run,
            profile: request.profile,
            ping_tx,
        }
    }
}

/// Spawn the watch manager loop.
///
/// The manager consumes [`WatchRequest`]s, starts a recursive filesystem
/// watcher over `root` on the first subscription, and forwards matching
/// change events to each subscription's rerun worker. Subscriptions fire
/// independently of each other.
pub fn spawn_watch_manager(
    root: impl Into<PathBuf>,
    sequencer: Sequencer,
    debounce: Duration,
    mut requests: mpsc::UnboundedReceiver<WatchRequest>,
) {
    let root = root.into();

    tokio::spawn(async move {
        let root = root.canonicalize().unwrap_or(root);

        // Channel from the blocking notify callback into the async world.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
        let mut watcher: Option<RecommendedWatcher> = None;
        let mut subscriptions: Vec<Subscription> = Vec::new();

        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => {
                        if watcher.is_none() {
                            match start_fs_watcher(&root, event_tx.clone()) {
                                Ok(w) => {
                                    info!("file watcher started on {:?}", root);
                                    watcher = Some(w);
                                }
                                Err(err) => {
                                    error!(error = %err, "failed to start file watcher; dropping subscription");
                                    continue;
                                }
                            }
                        }
                        debug!(task = %request.profile.name(), rerun = %request.run, "subscription added");
                        subscriptions.push(Subscription::spawn(
                            request,
                            sequencer.clone(),
                            debounce,
                        ));
                    }
                    None => break,
                },
                event = event_rx.recv() => match event {
                    Some(event) => dispatch(&root, &event, &subscriptions),
                    None => break,
                },
            }
        }

        debug!("watch manager loop ended");
    });
}

/// Forward one notify event to every subscription whose profile matches one
/// of the changed paths.
fn dispatch(root: &Path, event: &Event, subscriptions: &[Subscription]) {
    for path in &event.paths {
        let Some(rel_str) = relative_str(root, path) else {
            warn!("could not relativize path {:?} against root {:?}", path, root);
            continue;
        };

        for subscription in subscriptions {
            if subscription.profile.matches(&rel_str) {
                debug!(
                    task = %subscription.run,
                    path = %rel_str,
                    "watch match -> queueing rerun"
                );
                let _ = subscription.ping_tx.send(());
            }
        }
    }
}

fn start_fs_watcher(
    root: &Path,
    event_tx: mpsc::UnboundedSender<Event>,
) -> Result<RecommendedWatcher> {
    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("planrun: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("planrun: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Convert a path into a string relative to `root`, with forward slashes.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
