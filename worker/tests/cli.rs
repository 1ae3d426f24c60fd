//! Binary-level tests for exit codes and per-cycle output.

use std::fs;
use std::process::Command;

use worker::exit_codes;
use worker::io::queue_store::save_queue;
use worker::queue::QueueDocument;
use worker::test_support::{TestRepo, pending_task, worker_paths};

fn worker_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_worker"))
}

#[test]
fn non_repository_path_exits_before_queue_access() {
    let temp = tempfile::tempdir().expect("tempdir");
    // A corrupt queue next to the target proves it is never read.
    fs::write(temp.path().join("queue.json"), "{broken").expect("write");

    let output = worker_bin()
        .arg("run-once")
        .arg("--repo")
        .arg(temp.path())
        .output()
        .expect("run worker");

    assert_eq!(output.status.code(), Some(exit_codes::NOT_A_REPO));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a git repository"));
}

#[test]
fn missing_path_exits_with_repo_code() {
    let output = worker_bin()
        .arg("run-once")
        .arg("--repo")
        .arg("/definitely/not/there")
        .output()
        .expect("run worker");

    assert_eq!(output.status.code(), Some(exit_codes::NOT_A_REPO));
}

#[test]
fn empty_queue_reports_no_pending_work() {
    let repo = TestRepo::new().expect("repo");

    let output = worker_bin()
        .arg("run-once")
        .arg("--repo")
        .arg(repo.root())
        .output()
        .expect("run worker");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "no pending work");
}

#[test]
fn blocked_task_exits_nonzero_with_summary() {
    let repo = TestRepo::new().expect("repo");
    let paths = worker_paths(repo.root());
    let doc = QueueDocument {
        tasks: vec![pending_task("t2", "exit 1")],
    };
    save_queue(&paths.queue_path, &doc).expect("save");

    let output = worker_bin()
        .arg("run-once")
        .arg("--repo")
        .arg(repo.root())
        .output()
        .expect("run worker");

    assert_eq!(output.status.code(), Some(exit_codes::BLOCKED));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[BLOCKED] t2"));
    assert!(stdout.contains("t2.log"));
}

#[test]
fn run_loop_halts_on_blocked_task() {
    let repo = TestRepo::new().expect("repo");
    let paths = worker_paths(repo.root());
    let doc = QueueDocument {
        tasks: vec![
            pending_task("t1", "true"),
            pending_task("t2", "exit 1"),
            pending_task("t3", "true"),
        ],
    };
    save_queue(&paths.queue_path, &doc).expect("save");

    let output = worker_bin()
        .arg("run-loop")
        .arg("--repo")
        .arg(repo.root())
        .arg("--interval")
        .arg("1")
        .output()
        .expect("run worker");

    assert_eq!(output.status.code(), Some(exit_codes::BLOCKED));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[DONE] t1"));
    assert!(stdout.contains("[BLOCKED] t2"));
    // The loop stops at the blocked task; t3 is never processed.
    assert!(!stdout.contains("t3"));
}

#[test]
fn run_once_succeeds_and_prints_done() {
    let repo = TestRepo::new().expect("repo");
    let paths = worker_paths(repo.root());
    let doc = QueueDocument {
        tasks: vec![pending_task("t1", "true")],
    };
    save_queue(&paths.queue_path, &doc).expect("save");

    let output = worker_bin()
        .arg("run-once")
        .arg("--repo")
        .arg(repo.root())
        .output()
        .expect("run worker");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[DONE] t1"));
}
