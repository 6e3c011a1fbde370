// src/engine/context.rs

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::watch::WatchRequest;

/// Handle to a running static file server.
///
/// Held in the [`RunContext`] server slot between a `serve` task and the
/// matching `serve_stop`. Dropping the join handle does not stop the server;
/// stop is explicit (see `actions::serve`).
#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub join: JoinHandle<()>,
}

/// Transient process state shared by all steps of a run.
///
/// A run mutates no shared entity except what lives here: the server slot,
/// livereload subscribers, watch subscriptions and background child-process
/// accounting. Constructed once at process start and passed by `Arc`.
pub struct RunContext {
    root: PathBuf,
    server: Mutex<Option<ServerHandle>>,
    reload_tx: broadcast::Sender<()>,
    watch_tx: mpsc::UnboundedSender<WatchRequest>,
    subscriptions: AtomicUsize,
    background: AtomicUsize,
}

impl RunContext {
    /// `root` is the project root (the config file's directory); all relative
    /// paths and watch patterns are resolved against it.
    pub fn new(root: impl Into<PathBuf>, watch_tx: mpsc::UnboundedSender<WatchRequest>) -> Self {
        let (reload_tx, _) = broadcast::channel(16);
        Self {
            root: root.into(),
            server: Mutex::new(None),
            reload_tx,
            watch_tx,
            subscriptions: AtomicUsize::new(0),
            background: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sender for livereload broadcasts; the server's websocket handlers
    /// subscribe to it, `reload` tasks send on it.
    pub fn reload_sender(&self) -> broadcast::Sender<()> {
        self.reload_tx.clone()
    }

    /// Install a server handle. Fails if a server is already running.
    pub async fn install_server(&self, handle: ServerHandle) -> Result<()> {
        let mut slot = self.server.lock().await;
        if let Some(existing) = slot.as_ref() {
            return Err(anyhow!(
                "a server is already running on {}; stop it first",
                existing.addr
            ));
        }
        debug!(addr = %handle.addr, "server handle installed");
        *slot = Some(handle);
        Ok(())
    }

    /// Take the server handle out of the slot, if any.
    pub async fn take_server(&self) -> Option<ServerHandle> {
        self.server.lock().await.take()
    }

    /// Register a watch subscription with the watch manager.
    pub fn subscribe_watch(&self, request: WatchRequest) -> Result<()> {
        self.watch_tx
            .send(request)
            .map_err(|_| anyhow!("watch manager is not running"))?;
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Record a background child process left running by a ready-gated
    /// `exec` task.
    pub fn note_background_process(&self) {
        self.background.fetch_add(1, Ordering::SeqCst);
    }

    /// Forget a background child process once it has exited, so the CLI does
    /// not keep waiting for Ctrl-C on its account.
    pub fn note_background_exit(&self) {
        self.background.fetch_sub(1, Ordering::SeqCst);
    }

    /// True if anything outlives the run: a server, watch subscriptions or
    /// background processes. The CLI stays alive until Ctrl-C in that case.
    pub async fn has_live_resources(&self) -> bool {
        self.subscriptions.load(Ordering::SeqCst) > 0
            || self.background.load(Ordering::SeqCst) > 0
            || self.server.lock().await.is_some()
    }
}
