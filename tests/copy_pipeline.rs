use std::error::Error as StdError;
use std::fs;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use planrun::actions::CopyAction;
use planrun::engine::{RunContext, Sequencer};
use planrun::task::{Plan, Registry, Runnable, Task};

type TestResult = Result<(), Box<dyn StdError>>;

/// Stands in for the browser test runner: asserts the copied files exist.
struct CheckFiles {
    expected: Vec<&'static str>,
    ran: Arc<AtomicBool>,
}

#[async_trait]
impl Runnable for CheckFiles {
    async fn run(&self, ctx: Arc<RunContext>) -> anyhow::Result<()> {
        self.ran.store(true, Ordering::SeqCst);
        for rel in &self.expected {
            let path = ctx.root().join(rel);
            anyhow::ensure!(path.is_file(), "expected copied file at {:?}", path);
        }
        Ok(())
    }
}

fn pipeline(root: &std::path::Path, ran: &Arc<AtomicBool>) -> Result<Sequencer, Box<dyn StdError>> {
    let mut registry = Registry::new();
    registry.register("build", Task::action(CopyAction::new("src/*.html", "out".into())?))?;
    registry.register(
        "test",
        Task::action(CheckFiles {
            expected: vec!["out/index.html", "out/about.html"],
            ran: Arc::clone(ran),
        }),
    )?;
    registry.register("pipeline", Task::Plan(Plan::new().then("build").then("test")))?;
    registry.validate()?;

    let (watch_tx, _watch_rx) = mpsc::unbounded_channel();
    let ctx = Arc::new(RunContext::new(root, watch_tx));
    Ok(Sequencer::new(Arc::new(registry), ctx))
}

#[tokio::test]
async fn copy_then_test_pipeline_succeeds() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    fs::create_dir(root.join("src"))?;
    fs::write(root.join("src/index.html"), "<html>index</html>")?;
    fs::write(root.join("src/about.html"), "<html>about</html>")?;
    fs::write(root.join("src/notes.txt"), "not copied")?;

    let ran = Arc::new(AtomicBool::new(false));
    pipeline(root, &ran)?.run("pipeline").await?;

    assert!(ran.load(Ordering::SeqCst), "test step must have run");
    assert!(root.join("out/index.html").is_file());
    assert!(root.join("out/about.html").is_file());
    assert!(!root.join("out/notes.txt").exists(), "glob must filter non-matches");
    Ok(())
}

#[tokio::test]
async fn failing_build_skips_test_step() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    fs::create_dir(root.join("src"))?;
    fs::write(root.join("src/index.html"), "<html>index</html>")?;
    // A plain file where the destination directory should go forces an I/O
    // error out of the copy step.
    fs::write(root.join("out"), "in the way")?;

    let ran = Arc::new(AtomicBool::new(false));
    let err = pipeline(root, &ran)?
        .run("pipeline")
        .await
        .expect_err("build step must fail");

    assert_eq!(err.task_chain(), vec!["pipeline", "build"]);
    assert!(!ran.load(Ordering::SeqCst), "test step must never start");
    Ok(())
}
