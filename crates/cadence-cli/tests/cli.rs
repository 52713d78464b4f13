//! CLI command integration tests.
//! Each test uses a temp directory via CADENCE_DATA_DIR for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cadence_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("cadence").unwrap();
    cmd.env("CADENCE_DATA_DIR", data_dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Run a command and return the last whitespace-separated token of stdout
/// (the id printed by `add`).
fn run_for_id(dir: &TempDir, args: &[&str]) -> String {
    let output = cadence_cmd(dir).args(args).output().unwrap();
    assert!(output.status.success(), "{args:?} failed");
    String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .last()
        .unwrap()
        .to_string()
}

fn seed_item(dir: &TempDir) -> String {
    let owner = run_for_id(dir, &["owner", "add", "mira"]);
    run_for_id(dir, &["item", "add", "scales", "--owner", &owner])
}

#[test]
fn stats_fresh_workspace() {
    let dir = TempDir::new().unwrap();
    cadence_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("items:      0"))
        .stdout(predicate::str::contains("open:       0"));
}

#[test]
fn log_schedules_next_day_for_new_item() {
    let dir = TempDir::new().unwrap();
    let item = seed_item(&dir);

    cadence_cmd(&dir)
        .args(["log", &item, "--score", "7", "--reps", "3", "--seconds", "600"])
        .args(["--date", "2026-04-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("next practice: 2026-04-11 (1 days, foundation)"));

    cadence_cmd(&dir)
        .args(["due", "--date", "2026-04-11"])
        .assert()
        .success()
        .stdout(predicate::str::contains(item.as_str()));

    cadence_cmd(&dir)
        .args(["due", "--date", "2026-04-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing due"));
}

#[test]
fn extra_practice_keeps_due_date() {
    let dir = TempDir::new().unwrap();
    let item = seed_item(&dir);

    cadence_cmd(&dir)
        .args(["log", &item, "--score", "6", "--reps", "2", "--date", "2026-04-10"])
        .assert()
        .success();
    cadence_cmd(&dir)
        .args(["log", &item, "--score", "9", "--reps", "5", "--extra"])
        .args(["--date", "2026-04-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("due date unchanged"));

    cadence_cmd(&dir)
        .args(["item", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reps=7"))
        .stdout(predicate::str::contains("due=2026-04-11"));
}

#[test]
fn item_list_json_is_parseable() {
    let dir = TempDir::new().unwrap();
    let item = seed_item(&dir);

    let output = cadence_cmd(&dir)
        .args(["item", "list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed[0]["id"], item.as_str());
    assert_eq!(parsed[0]["difficulty"], "Average");
}

#[test]
fn maintain_moves_overdue_sessions() {
    let dir = TempDir::new().unwrap();
    let item = seed_item(&dir);
    cadence_cmd(&dir)
        .args(["log", &item, "--score", "7", "--reps", "3", "--date", "2026-04-01"])
        .assert()
        .success();

    cadence_cmd(&dir)
        .args(["maintain", "--date", "2026-04-20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rescheduled:     1"));

    cadence_cmd(&dir)
        .args(["due", "--date", "2026-04-20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing due"));
}

#[test]
fn remove_item_clears_sessions() {
    let dir = TempDir::new().unwrap();
    let item = seed_item(&dir);
    cadence_cmd(&dir)
        .args(["log", &item, "--score", "7", "--reps", "3", "--date", "2026-04-01"])
        .assert()
        .success();

    cadence_cmd(&dir)
        .args(["item", "remove", &item])
        .assert()
        .success();
    cadence_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("items:      0"))
        .stdout(predicate::str::contains("open:       0"));

    cadence_cmd(&dir)
        .args(["item", "remove", &item])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown item"));
}

#[test]
fn item_add_rejects_unknown_owner() {
    let dir = TempDir::new().unwrap();
    cadence_cmd(&dir)
        .args(["item", "add", "x", "--owner", "6f1c2e0a-0000-4000-8000-000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown owner"));
}

#[test]
fn merge_moves_history() {
    let dir = TempDir::new().unwrap();
    let owner = run_for_id(&dir, &["owner", "add", "mira"]);
    let a = run_for_id(&dir, &["item", "add", "a", "--owner", &owner]);
    let b = run_for_id(&dir, &["item", "add", "b", "--owner", &owner]);
    cadence_cmd(&dir)
        .args(["log", &a, "--score", "7", "--reps", "3", "--date", "2026-04-01"])
        .assert()
        .success();

    cadence_cmd(&dir)
        .args(["merge", &a, "--into", &b])
        .assert()
        .success()
        .stdout(predicate::str::contains("merged 1 items"))
        .stdout(predicate::str::contains("1 history entries moved"));
}

#[test]
fn curve_prints_requested_days() {
    let dir = TempDir::new().unwrap();
    let item = seed_item(&dir);
    let output = cadence_cmd(&dir)
        .args(["curve", &item, "--days", "5"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 6);
    assert!(stdout.lines().next().unwrap().trim().starts_with("0"));
}

#[test]
fn paused_owner_is_not_rescheduled() {
    let dir = TempDir::new().unwrap();
    let owner = run_for_id(&dir, &["owner", "add", "mira"]);
    let item = run_for_id(&dir, &["item", "add", "etude", "--owner", &owner]);

    cadence_cmd(&dir)
        .args(["owner", "pause", &owner])
        .assert()
        .success()
        .stdout(predicate::str::contains("paused"));
    cadence_cmd(&dir)
        .args(["log", &item, "--score", "7", "--reps", "3", "--date", "2026-04-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not scheduled"));
}
