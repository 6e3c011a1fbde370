// src/actions/watch.rs

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::engine::RunContext;
use crate::task::{Runnable, TaskName};
use crate::watch::{WatchProfile, WatchRequest};

/// Register a watch subscription binding file globs to a rerun task, then
/// return immediately. The subscription lives until process exit; the watch
/// manager owns the reruns.
pub struct WatchAction {
    profile: WatchProfile,
    run: TaskName,
}

impl WatchAction {
    pub fn new(profile: WatchProfile, run: TaskName) -> Self {
        Self { profile, run }
    }
}

#[async_trait]
impl Runnable for WatchAction {
    async fn run(&self, ctx: Arc<RunContext>) -> Result<()> {
        info!(task = %self.profile.name(), rerun = %self.run, "registering watch subscription");
        ctx.subscribe_watch(WatchRequest {
            profile: self.profile.clone(),
            run: self.run.clone(),
        })
    }
}
