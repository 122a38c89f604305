use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskflow-{nanos}-{file_name}"))
}

fn run_interactive(input: &str) -> std::process::Output {
    let store_path = temp_path("cli-interactive.json");

    let mut child = Command::new(env!("CARGO_BIN_EXE_taskflow"))
        .env("TASKFLOW_STORE_PATH", &store_path)
        .env("TASKFLOW_CONFIG_PATH", store_path.with_extension("config.json"))
        .env("TASKFLOW_DISABLE_NOTIFICATIONS", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    let output = child
        .wait_with_output()
        .expect("failed to read interactive output");

    std::fs::remove_file(&store_path).ok();
    output
}

#[test]
fn interactive_help_shows_usage() {
    let output = run_interactive("help\nexit\n");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
}

#[test]
fn interactive_invalid_command_keeps_session_alive() {
    let output = run_interactive("nope\nworkspace add \"Side Project\"\nquit\n");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stderr.contains("ERROR: invalid_input"));
    assert!(stdout.contains("Added workspace: Side Project (ws-"));
}

#[test]
fn interactive_unterminated_quote_is_reported() {
    let output = run_interactive("workspace add \"oops\nexit\n");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unterminated quote"));
}

#[test]
fn interactive_session_ends_at_eof() {
    let output = run_interactive("workspace list\n");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("(none)"));
}
