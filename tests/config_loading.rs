use std::error::Error as StdError;
use std::path::PathBuf;

use planrun::config::{ConfigFile, StepSpec, load_and_validate, validate_config};

type TestResult = Result<(), Box<dyn StdError>>;

fn parse(toml_str: &str) -> Result<ConfigFile, toml::de::Error> {
    toml::from_str(toml_str)
}

#[test]
fn demo_e2e_config_loads_and_validates() -> TestResult {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = load_and_validate(manifest.join("demos/e2e.toml"))?;

    assert_eq!(cfg.config.debounce_ms, 250);
    assert_eq!(cfg.config.host, "127.0.0.1");
    assert!(cfg.task.contains_key("e2e"));
    assert!(cfg.task.contains_key("e2e-watch"));

    // The e2e entry point starts with a parallel step.
    let e2e = &cfg.task["e2e"];
    let steps = e2e.plan.as_ref().expect("e2e is a plan");
    assert!(matches!(&steps[0], StepSpec::Parallel(names) if names.len() == 2));
    assert!(matches!(&steps[1], StepSpec::Single(name) if name == "protractor"));
    Ok(())
}

#[test]
fn defaults_apply_when_config_section_missing() -> TestResult {
    let cfg = parse(
        r#"
        [task.hello]
        exec = "echo hello"
        "#,
    )?;

    assert_eq!(cfg.config.debounce_ms, 250);
    assert_eq!(cfg.config.host, "127.0.0.1");
    validate_config(&cfg)?;
    Ok(())
}

#[test]
fn plan_steps_parse_strings_and_arrays() -> TestResult {
    let cfg = parse(
        r#"
        [task.a]
        exec = "echo a"

        [task.b]
        exec = "echo b"

        [task.top]
        plan = ["a", ["a", "b"]]
        "#,
    )?;

    let steps = cfg.task["top"].plan.as_ref().expect("plan present");
    assert!(matches!(&steps[0], StepSpec::Single(name) if name == "a"));
    assert!(matches!(&steps[1], StepSpec::Parallel(names) if names == &["a", "b"]));
    validate_config(&cfg)?;
    Ok(())
}

#[test]
fn task_with_two_kinds_is_rejected() -> TestResult {
    let cfg = parse(
        r#"
        [task.confused]
        exec = "echo hi"
        reload = true
        "#,
    )?;

    let err = validate_config(&cfg).expect_err("two kinds must fail");
    assert!(err.to_string().contains("more than one kind"));
    Ok(())
}

#[test]
fn task_with_no_kind_is_rejected() -> TestResult {
    let cfg = parse(
        r#"
        [task.empty]
        port = 4200
        "#,
    )?;

    // `port` without `serve` means no kind at all.
    let err = validate_config(&cfg).expect_err("kindless task must fail");
    assert!(err.to_string().contains("declares no kind"));
    Ok(())
}

#[test]
fn dangling_plan_reference_is_fatal() -> TestResult {
    let cfg = parse(
        r#"
        [task.top]
        plan = ["missing"]
        "#,
    )?;

    let err = validate_config(&cfg).expect_err("dangling reference must fail");
    assert!(err.to_string().contains("unknown task 'missing'"));
    Ok(())
}

#[test]
fn copy_without_into_is_rejected() -> TestResult {
    let cfg = parse(
        r#"
        [task.assets]
        copy = "src/**/*.html"
        "#,
    )?;

    let err = validate_config(&cfg).expect_err("copy without into must fail");
    assert!(err.to_string().contains("requires `into`"));
    Ok(())
}

#[test]
fn watch_without_run_is_rejected() -> TestResult {
    let cfg = parse(
        r#"
        [task.watcher]
        watch = ["src/**/*.ts"]
        "#,
    )?;

    let err = validate_config(&cfg).expect_err("watch without run must fail");
    assert!(err.to_string().contains("requires `run`"));
    Ok(())
}

#[test]
fn plan_cycle_is_rejected() -> TestResult {
    let cfg = parse(
        r#"
        [task.a]
        plan = ["b"]

        [task.b]
        plan = ["a"]
        "#,
    )?;

    let err = validate_config(&cfg).expect_err("cycle must fail");
    assert!(err.to_string().contains("cycle detected"));
    Ok(())
}

#[test]
fn watch_rerun_may_reference_enclosing_plan() -> TestResult {
    // A watch task rerunning a plan that contains it is normal wiring,
    // not a composition cycle.
    let cfg = parse(
        r#"
        [task.build]
        exec = "echo build"

        [task.watcher]
        watch = ["src/**/*.ts"]
        run = "loop"

        [task.loop]
        plan = ["build", "watcher"]
        "#,
    )?;

    validate_config(&cfg)?;
    Ok(())
}
