use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use planrun::actions::{ExecAction, ReloadAction, ServeStopAction};
use planrun::engine::RunContext;
use planrun::task::Runnable;
use planrun::watch::WatchProfile;

type TestResult = Result<(), Box<dyn StdError>>;

fn test_ctx() -> (Arc<RunContext>, mpsc::UnboundedReceiver<planrun::watch::WatchRequest>) {
    let (watch_tx, watch_rx) = mpsc::unbounded_channel();
    (Arc::new(RunContext::new(".", watch_tx)), watch_rx)
}

#[tokio::test]
async fn serve_stop_without_server_succeeds() -> TestResult {
    let (ctx, _watch_rx) = test_ctx();
    // Idempotent-safe: no server running, still Ok.
    ServeStopAction.run(Arc::clone(&ctx)).await?;
    ServeStopAction.run(ctx).await?;
    Ok(())
}

#[tokio::test]
async fn reload_without_clients_succeeds() -> TestResult {
    let (ctx, _watch_rx) = test_ctx();
    ReloadAction.run(ctx).await?;
    Ok(())
}

#[tokio::test]
async fn watch_subscription_marks_context_live() -> TestResult {
    let (ctx, mut watch_rx) = test_ctx();
    assert!(!ctx.has_live_resources().await);

    let profile = WatchProfile::compile(
        "watch-app",
        &["e2e-app/**/*.ts".to_string()],
        &[],
    )?;
    ctx.subscribe_watch(planrun::watch::WatchRequest {
        profile,
        run: "rebuild".to_string(),
    })?;

    assert!(ctx.has_live_resources().await);
    let request = watch_rx.recv().await.expect("subscription forwarded");
    assert_eq!(request.run, "rebuild");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn ready_pattern_completes_step_while_child_runs() -> TestResult {
    let (ctx, _watch_rx) = test_ctx();
    let action = ExecAction::new(
        "printf 'booting\\nserver ready\\n'; sleep 5".to_string(),
        Some("ready"),
    )?;

    action.run(Arc::clone(&ctx)).await?;
    assert!(
        ctx.has_live_resources().await,
        "background child should keep the context live"
    );
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn child_exit_before_ready_pattern_fails_the_step() -> TestResult {
    let (ctx, _watch_rx) = test_ctx();
    let action = ExecAction::new("echo starting".to_string(), Some("ready"))?;

    let err = action
        .run(ctx)
        .await
        .expect_err("child exited without ever matching");
    assert!(
        err.to_string().contains("before ready pattern matched"),
        "unexpected error: {err:#}"
    );
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn background_child_exit_releases_live_resource() -> TestResult {
    let (ctx, _watch_rx) = test_ctx();
    // Matches the pattern and exits immediately afterwards.
    let action = ExecAction::new("echo ready".to_string(), Some("ready"))?;
    action.run(Arc::clone(&ctx)).await?;

    let mut released = false;
    for _ in 0..50 {
        if !ctx.has_live_resources().await {
            released = true;
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert!(released, "exited child still counted as a live resource");
    Ok(())
}

#[test]
fn watch_profile_matches_and_excludes() -> TestResult {
    let profile = WatchProfile::compile(
        "watch-e2e",
        &[
            "e2e-app/**/*.ts".to_string(),
            "e2e/**/*.html".to_string(),
        ],
        &["e2e-app/**/*.spec.ts".to_string()],
    )?;

    assert!(profile.matches("e2e-app/main.ts"));
    assert!(profile.matches("e2e-app/pages/button/button.ts"));
    assert!(profile.matches("e2e/index.html"));
    assert!(!profile.matches("e2e-app/main.spec.ts"), "exclude wins");
    assert!(!profile.matches("e2e-app/styles.css"));
    assert!(!profile.matches("docs/readme.md"));
    Ok(())
}
