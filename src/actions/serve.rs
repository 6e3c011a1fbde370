// src/actions/serve.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::engine::{RunContext, ServerHandle};
use crate::task::Runnable;

const DEFAULT_PORT: u16 = 4200;

/// Start a static file server over a directory.
///
/// The step completes once the listener is bound; the server keeps running
/// until a `serve_stop` task (or process exit). Besides the static tree, the
/// server exposes a `/livereload` websocket that `reload` tasks broadcast to.
pub struct ServeAction {
    dir: PathBuf,
    host: String,
    port: Option<u16>,
}

impl ServeAction {
    pub fn new(dir: PathBuf, host: String, port: Option<u16>) -> Self {
        Self { dir, host, port }
    }
}

#[async_trait]
impl Runnable for ServeAction {
    async fn run(&self, ctx: Arc<RunContext>) -> Result<()> {
        let dir = ctx.root().join(&self.dir);
        let reload_tx = ctx.reload_sender();

        let app = Router::new()
            .route("/livereload", get(livereload_ws))
            .fallback_service(ServeDir::new(&dir))
            .layer(TraceLayer::new_for_http())
            .with_state(reload_tx);

        let port = self.port.unwrap_or(DEFAULT_PORT);
        let bind_addr = format!("{}:{}", self.host, port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("binding static server to {bind_addr}"))?;
        let addr = listener.local_addr().context("reading bound address")?;

        let join = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!(error = %err, "static server terminated unexpectedly");
            }
        });

        info!(addr = %addr, dir = ?dir, "static server listening");

        let abort = join.abort_handle();
        if let Err(err) = ctx.install_server(ServerHandle { addr, join }).await {
            abort.abort();
            return Err(err);
        }
        Ok(())
    }
}

/// Stop the running static server.
///
/// Idempotent-safe: running it with no server up logs a warning and
/// succeeds. Internal stop problems are [`ServerStopError`]s that are logged
/// and swallowed since stop is best-effort.
pub struct ServeStopAction;

#[async_trait]
impl Runnable for ServeStopAction {
    async fn run(&self, ctx: Arc<RunContext>) -> Result<()> {
        match ctx.take_server().await {
            None => {
                warn!("no server is running; ignoring stop");
                Ok(())
            }
            Some(handle) => {
                if let Err(err) = stop_server(handle).await {
                    warn!(error = %err, "server stop reported an error; continuing");
                }
                Ok(())
            }
        }
    }
}

/// Best-effort failure while stopping the server; never fails a run.
#[derive(Debug, Error)]
#[error("failed to stop server: {0}")]
pub struct ServerStopError(String);

/// Abort-based stop. Livereload websocket connections are long-lived, so a
/// graceful connection drain would block indefinitely.
async fn stop_server(handle: ServerHandle) -> Result<(), ServerStopError> {
    info!(addr = %handle.addr, "stopping static server");
    handle.join.abort();
    match handle.join.await {
        Ok(()) => Ok(()),
        Err(err) if err.is_cancelled() => Ok(()),
        Err(err) => Err(ServerStopError(err.to_string())),
    }
}

async fn livereload_ws(
    ws: WebSocketUpgrade,
    State(reload_tx): State<broadcast::Sender<()>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_livereload(socket, reload_tx.subscribe()))
}

/// Forward reload broadcasts to one connected client until either side
/// disconnects. Incoming client messages are ignored.
async fn handle_livereload(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    debug!("livereload client connected");
    loop {
        tokio::select! {
            signal = reload_rx.recv() => match signal {
                Ok(()) => {
                    if socket.send(Message::Text("reload".to_string())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "livereload client lagged; coalescing");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
    debug!("livereload client disconnected");
}
