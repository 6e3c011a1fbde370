// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// debounce_ms = 250
/// host = "127.0.0.1"
///
/// [task.copy-assets]
/// copy = "e2e-app/**/*.html"
/// into = "dist/e2e-app"
///
/// [task.e2e]
/// plan = [["setup", "serve-app"], "protractor", "stop-server"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`.
    ///
    /// Keys are the *task names* (e.g. `"e2e"`, `"copy-assets"`).
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Debounce window (milliseconds) used to coalesce bursts of file-change
    /// notifications into a single watch rerun.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Host that `serve` tasks bind to.
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            host: default_host(),
        }
    }
}

/// One element of a `plan = [...]` list: either a single task name or an
/// array of task names to run concurrently.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    Single(String),
    Parallel(Vec<String>),
}

/// `[task.<name>]` section.
///
/// Exactly one *kind* must be present per task: `plan`, `exec`, `copy`,
/// `serve`, `serve_stop`, `reload` or `watch`. The remaining fields qualify
/// a kind (`into` belongs to `copy`, `port` to `serve`, `run`/`exclude` to
/// `watch`, `ready_on_stdout` to `exec`). Enforced in `validate.rs`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Ordered steps referencing other tasks by name.
    #[serde(default)]
    pub plan: Option<Vec<StepSpec>>,

    /// Shell command to execute.
    #[serde(default)]
    pub exec: Option<String>,

    /// Regex matched against the command's stdout lines. When it matches,
    /// the step completes while the process keeps running in the background
    /// (for "server is ready" style waits).
    #[serde(default)]
    pub ready_on_stdout: Option<String>,

    /// Source glob for a copy task, relative to the project root.
    #[serde(default)]
    pub copy: Option<String>,

    /// Destination directory for a copy task.
    #[serde(default)]
    pub into: Option<PathBuf>,

    /// Directory to serve as a static site.
    #[serde(default)]
    pub serve: Option<PathBuf>,

    /// Port for a serve task.
    #[serde(default)]
    pub port: Option<u16>,

    /// Stop the running static server. Safe to run when no server is up.
    #[serde(default)]
    pub serve_stop: bool,

    /// Trigger a livereload broadcast to connected clients.
    #[serde(default)]
    pub reload: bool,

    /// Glob patterns establishing a watch subscription.
    #[serde(default)]
    pub watch: Option<Vec<String>>,

    /// Glob patterns excluded from the watch subscription.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Task to rerun when a watched file changes.
    #[serde(default)]
    pub run: Option<String>,
}

impl TaskConfig {
    /// Names of the task kinds present in this section. Validation requires
    /// exactly one.
    pub fn kinds_present(&self) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        if self.plan.is_some() {
            kinds.push("plan");
        }
        if self.exec.is_some() {
            kinds.push("exec");
        }
        if self.copy.is_some() {
            kinds.push("copy");
        }
        if self.serve.is_some() {
            kinds.push("serve");
        }
        if self.serve_stop {
            kinds.push("serve_stop");
        }
        if self.reload {
            kinds.push("reload");
        }
        if self.watch.is_some() {
            kinds.push("watch");
        }
        kinds
    }

    /// All task names this task references (plan members and watch rerun
    /// target), used for dangling-reference validation.
    pub fn referenced_tasks(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        if let Some(steps) = &self.plan {
            for step in steps {
                match step {
                    StepSpec::Single(name) => refs.push(name.as_str()),
                    StepSpec::Parallel(names) => {
                        refs.extend(names.iter().map(|s| s.as_str()))
                    }
                }
            }
        }
        if let Some(run) = &self.run {
            refs.push(run.as_str());
        }
        refs
    }
}
