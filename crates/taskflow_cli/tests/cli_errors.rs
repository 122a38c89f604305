use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskflow-{nanos}-{file_name}"))
}

fn run(store: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_taskflow"))
        .args(args)
        .env("TASKFLOW_STORE_PATH", store)
        .env("TASKFLOW_CONFIG_PATH", store.with_extension("config.json"))
        .env("TASKFLOW_DISABLE_NOTIFICATIONS", "1")
        .output()
        .expect("failed to run taskflow")
}

fn created_id(output: &Output) -> String {
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    value["id"].as_str().unwrap().to_string()
}

#[test]
fn help_exits_successfully() {
    let store = temp_path("cli-help.json");
    let output = run(&store, &["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
    assert!(stdout.contains("gantt"));
}

#[test]
fn unknown_task_reports_not_found() {
    let store = temp_path("cli-missing.json");
    let output = run(&store, &["task", "show", "task-missing"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: not_found"));
}

#[test]
fn parse_errors_are_invalid_input() {
    let store = temp_path("cli-parse.json");
    let output = run(&store, &["task", "status", "task-1", "blocked"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("ERROR: invalid_input"));
}

#[test]
fn invalid_due_date_is_rejected() {
    let store = temp_path("cli-date.json");
    let workspace = created_id(&run(&store, &["workspace", "add", "Acme", "--json"]));
    let list = created_id(&run(&store, &["list", "add", &workspace, "Inbox", "--json"]));

    let output = run(
        &store,
        &["task", "add", "Broken", "--list", &list, "--due", "2025-13-40"],
    );
    std::fs::remove_file(&store).ok();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: invalid_input"));
}

#[test]
fn viewer_cannot_create_tasks() {
    let store = temp_path("cli-roles.json");
    let workspace = created_id(&run(&store, &["workspace", "add", "Acme", "--json"]));
    let list = created_id(&run(&store, &["list", "add", &workspace, "Inbox", "--json"]));
    created_id(&run(
        &store,
        &["user", "add", "Vic", "vic@example.com", "--role", "viewer", "--json"],
    ));

    let denied = run(&store, &["task", "add", "Nope", "--list", &list, "--as", "vic"]);
    let allowed = run(
        &store,
        &["comment", "add", "task-none", "hi", "--as", "vic@example.com"],
    );
    std::fs::remove_file(&store).ok();

    assert_eq!(denied.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&denied.stderr).contains("ERROR: permission_denied"));
    // Commenting is allowed for viewers; the task simply does not exist.
    assert!(String::from_utf8_lossy(&allowed.stderr).contains("ERROR: not_found"));
}

#[test]
fn unknown_acting_user_is_not_found() {
    let store = temp_path("cli-actor.json");
    let output = run(&store, &["sidebar", "--as", "ghost"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("acting user not found"));
}

#[test]
fn ai_without_api_key_is_invalid_input() {
    let store = temp_path("cli-ai.json");
    let output = Command::new(env!("CARGO_BIN_EXE_taskflow"))
        .args(["ai", "summary"])
        .env("TASKFLOW_STORE_PATH", &store)
        .env("TASKFLOW_CONFIG_PATH", store.with_extension("config.json"))
        .env_remove("TASKFLOW_AI_API_KEY")
        .env_remove("GEMINI_API_KEY")
        .output()
        .expect("failed to run taskflow");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: invalid_input"));
}

#[test]
fn dates_past_the_calendar_are_errors_not_crashes() {
    let store = temp_path("cli-range.json");
    let workspace = created_id(&run(&store, &["workspace", "add", "Acme", "--json"]));
    let list = created_id(&run(&store, &["list", "add", &workspace, "Inbox", "--json"]));
    let task = created_id(&run(
        &store,
        &[
            "task", "add", "Last", "--list", &list, "--start", "9999-12-30", "--due",
            "9999-12-31", "--json",
        ],
    ));

    let calendar = run(&store, &["calendar", "9999-12"]);
    let chart = run(&store, &["gantt", "show"]);
    let drag = run(&store, &["gantt", "drag", &task, "1e18"]);
    let padding = run(
        &store,
        &["gantt", "show", "--config-override", "gantt.padding_days=1000000000"],
    );
    std::fs::remove_file(&store).ok();

    for output in [&calendar, &chart, &drag, &padding] {
        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: invalid_input"));
    }
}
