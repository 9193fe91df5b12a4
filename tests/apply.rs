mod common;

use common::{Workspace, slashed};
use predicates::prelude::*;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

fn write_marker_aged(ws: &Workspace, age_secs: u64) {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    fs::write(ws.marker(), (now - age_secs).to_string()).unwrap();
}

#[test]
fn apply_after_dry_run_succeeds_and_consumes_marker() {
    let ws = Workspace::new();

    ws.mirror("source", "target", &["--dry-run"])
        .assert()
        .success();
    assert!(ws.marker().exists());

    ws.mirror("source", "target", &[])
        .assert()
        .success()
        .stdout(predicate::str::contains(" -n ").not())
        .stdout(predicate::str::contains(format!(
            "--progress --exclude-from={}",
            ws.home().join("loadrc/bashrc/mirror_exclude").display()
        )))
        .stdout(predicate::str::contains(slashed(&ws.path("target"))))
        .stderr(predicate::str::contains("completed successfully"));

    assert!(!ws.marker().exists());
}

#[test]
fn apply_without_marker_asks_for_dry_run() {
    let ws = Workspace::new();

    ws.mirror("source", "target", &[])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("marker file not found"))
        .stderr(predicate::str::contains("--dry-run"));
}

#[test]
fn apply_with_old_marker_is_refused() {
    let ws = Workspace::new();
    write_marker_aged(&ws, 7200);

    ws.mirror("source", "target", &[])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("too old"))
        .stderr(predicate::str::contains("maximum 3600"));

    assert!(ws.marker().exists());
}

#[test]
fn apply_with_garbage_marker_is_refused() {
    let ws = Workspace::new();
    fs::write(ws.marker(), "not a timestamp").unwrap();

    ws.mirror("source", "target", &[])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot parse marker timestamp"));
}

#[test]
fn marker_timeout_can_be_shortened() {
    let ws = Workspace::new();
    write_marker_aged(&ws, 120);

    ws.mirror("source", "target", &[])
        .assert()
        .success();

    write_marker_aged(&ws, 120);

    ws.mirror("source", "target", &["--marker-timeout", "60"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("maximum 60"));
}

#[test]
fn failed_apply_keeps_marker() {
    let ws = Workspace::new();
    write_marker_aged(&ws, 10);

    ws.mirror("source", "target", &[])
        .env("FOLDER_MIRROR_RSYNC", "false")
        .assert()
        .code(1);

    assert!(ws.marker().exists());
}

#[test]
fn apply_still_checks_overlap() {
    let ws = Workspace::new();
    write_marker_aged(&ws, 10);

    ws.mirror("source", "source", &[])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("same or nested"));

    assert!(ws.marker().exists());
}
