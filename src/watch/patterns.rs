// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::task::TaskName;

/// Compiled watch/exclude glob patterns for a single subscription.
///
/// The patterns are relative to the project root. The watcher passes
/// relative paths (e.g. `"e2e-app/main.ts"`) into `matches`.
#[derive(Clone)]
pub struct WatchProfile {
    name: TaskName,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl WatchProfile {
    /// Compile watch and exclude patterns for the named watch task.
    pub fn compile(name: &str, watch: &[String], exclude: &[String]) -> Result<Self> {
        let watch_set = build_globset(watch)
            .with_context(|| format!("building watch globset for task {name}"))?;

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for task {name}"))?,
            )
        };

        Ok(Self {
            name: name.to_string(),
            watch_set,
            exclude_set,
        })
    }

    /// Name of the watch task this profile belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this subscription is interested in the given path
    /// (relative to project root). Exclude patterns win over watch patterns.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
