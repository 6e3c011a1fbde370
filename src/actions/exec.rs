// src/actions/exec.rs

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::engine::RunContext;
use crate::task::Runnable;

/// Run a shell command as a child process, with the project root as working
/// directory.
///
/// Without `ready_on_stdout`, the step suspends until the process exits and
/// a non-zero exit code fails the step.
///
/// With `ready_on_stdout`, the step completes as soon as a stdout line
/// matches the pattern while the process keeps running in the background
/// (used for "server is ready" style waits on external tools). The child is
/// spawned with kill-on-drop, so it does not outlive the runner. If the
/// process exits before the pattern matches, the step fails.
pub struct ExecAction {
    cmd: String,
    ready_on: Option<Regex>,
}

impl ExecAction {
    pub fn new(cmd: String, ready_on_stdout: Option<&str>) -> Result<Self> {
        let ready_on = ready_on_stdout
            .map(|pattern| {
                Regex::new(pattern)
                    .with_context(|| format!("invalid ready_on_stdout pattern: {pattern}"))
            })
            .transpose()?;
        Ok(Self { cmd, ready_on })
    }
}

#[async_trait]
impl Runnable for ExecAction {
    async fn run(&self, ctx: Arc<RunContext>) -> Result<()> {
        info!(cmd = %self.cmd, "starting process");

        let mut child = shell_command(&self.cmd)
            .current_dir(ctx.root())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning process for command '{}'", self.cmd))?;

        // Always consume stderr so buffers don't fill; log at debug.
        if let Some(stderr) = child.stderr.take() {
            let cmd = self.cmd.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(cmd = %cmd, "stderr: {}", line);
                }
            });
        }

        match &self.ready_on {
            None => self.wait_for_exit(child).await,
            Some(pattern) => self.wait_for_ready(child, pattern, &ctx).await,
        }
    }
}

impl ExecAction {
    async fn wait_for_exit(&self, mut child: Child) -> Result<()> {
        if let Some(stdout) = child.stdout.take() {
            let cmd = self.cmd.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(cmd = %cmd, "stdout: {}", line);
                }
            });
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of command '{}'", self.cmd))?;

        let code = status.code().unwrap_or(-1);
        info!(cmd = %self.cmd, exit_code = code, success = status.success(), "process exited");

        if !status.success() {
            bail!("command '{}' exited with code {}", self.cmd, code);
        }
        Ok(())
    }

    async fn wait_for_ready(
        &self,
        mut child: Child,
        pattern: &Regex,
        ctx: &Arc<RunContext>,
    ) -> Result<()> {
        let stdout = child
            .stdout
            .take()
            .context("no stdout pipe available for ready_on_stdout")?;
        let mut lines = BufReader::new(stdout).lines();

        loop {
            match lines.next_line().await? {
                Some(line) => {
                    debug!(cmd = %self.cmd, "stdout: {}", line);
                    if pattern.is_match(&line) {
                        info!(cmd = %self.cmd, "ready pattern matched; leaving process running");
                        break;
                    }
                }
                None => {
                    // stdout closed: the process exited (or dropped its pipe)
                    // before ever becoming ready.
                    let status = child
                        .wait()
                        .await
                        .with_context(|| format!("waiting for process of command '{}'", self.cmd))?;
                    bail!(
                        "command '{}' exited with code {} before ready pattern matched",
                        self.cmd,
                        status.code().unwrap_or(-1)
                    );
                }
            }
        }

        ctx.note_background_process();

        // Keep draining stdout and hold the child handle until it exits;
        // kill-on-drop ties its lifetime to the runner process.
        let cmd = self.cmd.clone();
        let ctx = Arc::clone(ctx);
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(cmd = %cmd, "stdout: {}", line);
            }
            match child.wait().await {
                Ok(status) => {
                    info!(cmd = %cmd, exit_code = status.code().unwrap_or(-1), "background process exited")
                }
                Err(err) => warn!(cmd = %cmd, error = %err, "waiting for background process failed"),
            }
            ctx.note_background_exit();
        });

        Ok(())
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}
