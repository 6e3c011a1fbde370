use std::error::Error as StdError;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::sleep;

use planrun::engine::{RunContext, Sequencer};
use planrun::errors::Error;
use planrun::task::{Plan, Registry, Runnable, Task};

type TestResult = Result<(), Box<dyn StdError>>;
type Log = Arc<Mutex<Vec<String>>>;

/// Stub runnable recording its invocations, optionally failing or stalling.
struct StubAction {
    name: &'static str,
    log: Log,
    fail: bool,
    delay_ms: u64,
}

impl StubAction {
    fn ok(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Arc::clone(log),
            fail: false,
            delay_ms: 0,
        }
    }

    fn failing(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Arc::clone(log),
            fail: true,
            delay_ms: 0,
        }
    }

    fn slow(name: &'static str, log: &Log, delay_ms: u64) -> Self {
        Self {
            name,
            log: Arc::clone(log),
            fail: false,
            delay_ms,
        }
    }
}

#[async_trait]
impl Runnable for StubAction {
    async fn run(&self, _ctx: Arc<RunContext>) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(format!("{}:start", self.name));
        if self.delay_ms > 0 {
            sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail {
            anyhow::bail!("{} failed", self.name);
        }
        self.log.lock().unwrap().push(format!("{}:done", self.name));
        Ok(())
    }
}

fn sequencer_for(registry: Registry) -> Sequencer {
    let (watch_tx, _watch_rx) = mpsc::unbounded_channel();
    let ctx = Arc::new(RunContext::new(".", watch_tx));
    Sequencer::new(Arc::new(registry), ctx)
}

#[tokio::test]
async fn empty_plan_succeeds_immediately() -> TestResult {
    let log: Log = Arc::default();
    let mut registry = Registry::new();
    registry.register("noop", Task::Plan(Plan::new()))?;

    sequencer_for(registry).run("noop").await?;
    assert!(log.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn failing_step_skips_remaining_steps() -> TestResult {
    let log: Log = Arc::default();
    let mut registry = Registry::new();
    registry.register("a", Task::action(StubAction::failing("a", &log)))?;
    registry.register("b", Task::action(StubAction::ok("b", &log)))?;
    registry.register("pipeline", Task::Plan(Plan::new().then("a").then("b")))?;

    let err = sequencer_for(registry)
        .run("pipeline")
        .await
        .expect_err("pipeline must fail");

    assert!(matches!(
        &err,
        Error::Step { task, step: 1, .. } if task == "pipeline"
    ));
    assert_eq!(err.task_chain(), vec!["pipeline", "a"]);

    // b never started.
    let entries = log.lock().unwrap().clone();
    assert_eq!(entries, vec!["a:start".to_string()]);
    Ok(())
}

#[tokio::test]
async fn parallel_step_waits_for_siblings_then_fails() -> TestResult {
    let log: Log = Arc::default();
    let mut registry = Registry::new();
    registry.register("bad", Task::action(StubAction::failing("bad", &log)))?;
    registry.register("slow", Task::action(StubAction::slow("slow", &log, 100)))?;
    registry.register("after", Task::action(StubAction::ok("after", &log)))?;
    registry.register(
        "pipeline",
        Task::Plan(Plan::new().all(["bad", "slow"]).then("after")),
    )?;

    let err = sequencer_for(registry)
        .run("pipeline")
        .await
        .expect_err("pipeline must fail");

    // Failure is attributable to `bad`.
    assert_eq!(err.task_chain(), vec!["pipeline", "bad"]);

    // Wait-for-all policy: the slow sibling settled before the step failed,
    // and the following step never started.
    let entries = log.lock().unwrap().clone();
    assert!(entries.contains(&"slow:done".to_string()));
    assert!(!entries.iter().any(|e| e.starts_with("after")));
    Ok(())
}

#[tokio::test]
async fn nested_plan_failure_reports_task_chain() -> TestResult {
    let log: Log = Arc::default();
    let mut registry = Registry::new();
    registry.register("compile", Task::action(StubAction::failing("compile", &log)))?;
    registry.register("build", Task::Plan(Plan::new().then("compile")))?;
    registry.register("ci", Task::Plan(Plan::new().then("build")))?;

    let err = sequencer_for(registry)
        .run("ci")
        .await
        .expect_err("ci must fail");

    assert_eq!(err.task_chain(), vec!["ci", "build", "compile"]);
    Ok(())
}

#[tokio::test]
async fn plan_members_resolve_at_run_time() -> TestResult {
    let mut registry = Registry::new();
    registry.register("top", Task::Plan(Plan::new().then("ghost")))?;

    let err = sequencer_for(registry)
        .run("top")
        .await
        .expect_err("ghost member must fail");

    match err {
        Error::Step { task, step, source } => {
            assert_eq!(task, "top");
            assert_eq!(step, 1);
            assert!(matches!(*source, Error::UnknownTask(name) if name == "ghost"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}
