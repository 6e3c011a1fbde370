// src/actions/copy.rs

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use globset::{Glob, GlobMatcher};
use tracing::{debug, info, warn};

use crate::engine::RunContext;
use crate::task::Runnable;

/// Copy files matching a glob into a destination directory.
///
/// The glob is evaluated relative to the project root. Matched files keep
/// their path relative to the glob's literal base: `e2e-app/**/*.html` into
/// `dist/e2e-app` copies `e2e-app/pages/x.html` to `dist/e2e-app/pages/x.html`.
/// I/O errors fail the step.
pub struct CopyAction {
    pattern: String,
    matcher: GlobMatcher,
    base: PathBuf,
    dest: PathBuf,
}

impl CopyAction {
    pub fn new(pattern: &str, dest: PathBuf) -> Result<Self> {
        let matcher = Glob::new(pattern)
            .with_context(|| format!("invalid glob pattern: {pattern}"))?
            .compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            base: literal_base(pattern),
            dest,
        })
    }

    fn copy_all(&self, root: &Path) -> Result<usize> {
        let search_root = root.join(&self.base);
        let dest_root = root.join(&self.dest);

        if !search_root.exists() {
            warn!(pattern = %self.pattern, "copy source directory does not exist; copied 0 files");
            return Ok(0);
        }

        let mut files = Vec::new();
        collect_files(&search_root, &dest_root, &mut files)
            .with_context(|| format!("walking {:?}", search_root))?;

        let mut copied = 0;
        for path in files {
            let rel_to_root = match path.strip_prefix(root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            if !self.matcher.is_match(slash_str(rel_to_root)) {
                continue;
            }

            let rel_to_base = path
                .strip_prefix(&search_root)
                .with_context(|| format!("relativizing {:?}", path))?;
            let target = dest_root.join(rel_to_base);

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {:?}", parent))?;
            }
            fs::copy(&path, &target)
                .with_context(|| format!("copying {:?} to {:?}", path, target))?;
            debug!(from = ?path, to = ?target, "copied file");
            copied += 1;
        }

        Ok(copied)
    }
}

#[async_trait]
impl Runnable for CopyAction {
    async fn run(&self, ctx: Arc<RunContext>) -> Result<()> {
        let copied = self.copy_all(ctx.root())?;
        info!(pattern = %self.pattern, dest = ?self.dest, copied, "copy finished");
        Ok(())
    }
}

/// Gather all regular files under `dir`, skipping the destination tree so a
/// destination nested inside the source cannot feed itself.
fn collect_files(dir: &Path, dest_root: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path == dest_root {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&path, dest_root, out)?;
        } else if file_type.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// The leading components of a glob pattern before its first meta character.
/// `e2e-app/**/*.html` → `e2e-app`; `*.html` → `""`.
fn literal_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_string_lossy();
                if part.contains(['*', '?', '[', '{']) {
                    break;
                }
                base.push(part.as_ref());
            }
            _ => break,
        }
    }
    // The last literal component of a meta-free pattern is the file itself.
    if base == Path::new(pattern) {
        base.pop();
    }
    base
}

fn slash_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
