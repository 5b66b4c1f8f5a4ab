//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with `HOME` pointed at a temporary
//! directory, so every test starts from an empty data directory.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_rollcall-cli"))
        .args(args)
        .env("HOME", home)
        .env_remove("ROLLCALL_ENV")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn write_timetable(home: &Path) {
    let dir = home.join(".config").join("rollcall");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("timetable.toml"),
        r#"
[[versions]]
effective_from = "2025-01-06"

[versions.days]
monday = [
    { time = "11:00 AM", subject = "Financial Accounting" },
    { time = "9:00 AM", subject = "Business Statistics", instructor = "Dr. Rao", room = "301" },
]
"#,
    )
    .unwrap();
}

#[test]
fn test_config_list_writes_defaults() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0, "config list failed");

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["thresholds"]["low"], 75);
    assert_eq!(parsed["thresholds"]["warning"], 85);
    assert!(home.path().join(".config/rollcall/config.toml").exists());
}

#[test]
fn test_config_set_and_get() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["config", "set", "thresholds.low", "80"]);
    assert_eq!(code, 0, "config set failed");

    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "thresholds.low"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "80");
}

#[test]
fn test_config_rejects_inverted_thresholds() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "thresholds.low", "95"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));
}

#[test]
fn test_mark_then_stats_json() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &["mark", "Economics", "9:00 AM", "present", "--date", "2025-01-06"],
    );
    assert_eq!(code, 0, "mark failed");
    assert!(stdout.contains("Marked Present: Economics on 2025-01-06 (9:00 AM)"));

    let (code, _, _) = run_cli(
        home.path(),
        &["mark", "Economics", "9:00 AM", "absent", "--date", "2025-01-07"],
    );
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(home.path(), &["stats", "--json"]);
    assert_eq!(code, 0);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["subjects"][0]["name"], "Economics");
    assert_eq!(report["subjects"][0]["percentage"], 50);
    assert_eq!(report["overall"]["conducted"], 2);
    assert_eq!(report["overall"]["band"], "low");
}

#[test]
fn test_undo_unmarked_is_not_an_error() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &["undo", "Economics", "9:00 AM", "--date", "2025-01-06"],
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("Nothing to do"));
}

#[test]
fn test_mark_rejects_bad_status() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["mark", "Economics", "9:00 AM", "late"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("status"));
}

#[test]
fn test_today_with_timetable() {
    let home = tempfile::tempdir().unwrap();
    write_timetable(home.path());

    let (code, _, _) = run_cli(home.path(), &["timetable", "seed"]);
    assert_eq!(code, 0, "timetable seed failed");
    let (code, _, _) = run_cli(
        home.path(),
        &["toggle", "Business Statistics", "9:00 AM", "--date", "2025-01-06"],
    );
    assert_eq!(code, 0);
    let (code, _, _) = run_cli(
        home.path(),
        &["mark", "Business Statistics", "9:00 AM", "absent", "--date", "2025-01-06"],
    );
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(home.path(), &["today", "--date", "2025-01-06", "--json"]);
    assert_eq!(code, 0, "today failed");
    let day: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let slots = day["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["subject"], "Business Statistics");
    assert_eq!(slots[0]["state"], "absent");
    assert_eq!(slots[1]["state"], "unmarked");
}

#[test]
fn test_today_without_timetable_is_empty() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["today", "--date", "2025-01-06"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No timetable configured"));
}

#[test]
fn test_timetable_show_without_timetable_is_empty() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["timetable", "show", "--date", "2025-01-06"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No timetable configured"));

    let (code, stdout, _) = run_cli(
        home.path(),
        &["timetable", "show", "--date", "2025-01-06", "--json"],
    );
    assert_eq!(code, 0);
    let slots: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(slots.as_array().map(Vec::len), Some(0));
}

#[test]
fn test_subject_add_and_list() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(
        home.path(),
        &["subject", "add", "Economics", "--required", "80", "--credits", "3"],
    );
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(home.path(), &["subject", "list", "--json"]);
    assert_eq!(code, 0);
    let subjects: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(subjects[0]["name"], "Economics");
    assert_eq!(subjects[0]["required_percentage"], 80);
    assert_eq!(subjects[0]["credits"], 3);
}
