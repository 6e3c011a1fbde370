// src/actions/reload.rs

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::engine::RunContext;
use crate::task::Runnable;

/// Fire-and-forget broadcast telling connected livereload clients to
/// refresh. No acknowledgment is expected; zero connected clients is not an
/// error.
pub struct ReloadAction;

#[async_trait]
impl Runnable for ReloadAction {
    async fn run(&self, ctx: Arc<RunContext>) -> Result<()> {
        match ctx.reload_sender().send(()) {
            Ok(clients) => info!(clients, "livereload triggered"),
            Err(_) => debug!("no livereload clients connected; nothing to trigger"),
        }
        Ok(())
    }
}
