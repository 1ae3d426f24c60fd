//! Continuous-loop helper for `worker run-loop`.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::cycle::{CycleOutcome, run_cycle};
use crate::io::config::WorkerPaths;
use crate::io::git::Repository;
use crate::io::process::ShellExecutor;

/// Run cycles until a task blocks.
///
/// Successful cycles, including "no pending work", sleep for `interval` and
/// go again, so the worker keeps polling for freshly appended tasks. A
/// `Blocked` outcome ends the loop immediately with no further sleep or
/// cycle: one blocked task halts all processing until an operator resets
/// it. Infrastructure errors also stop the loop by propagating.
///
/// `on_cycle` is invoked with every outcome before the loop decides whether
/// to continue; the CLI uses it to print the per-cycle summary line.
pub fn run_worker_loop<R, S, F>(
    repo_root: &Path,
    repo: &R,
    shell: &S,
    paths: &WorkerPaths,
    push: bool,
    interval: Duration,
    mut on_cycle: F,
) -> Result<CycleOutcome>
where
    R: Repository,
    S: ShellExecutor,
    F: FnMut(&CycleOutcome),
{
    loop {
        let outcome = run_cycle(repo_root, repo, shell, paths, push)?;
        on_cycle(&outcome);
        if let CycleOutcome::Blocked { .. } = outcome {
            info!("task blocked, stopping loop");
            return Ok(outcome);
        }
        debug!(
            interval_secs = interval.as_secs(),
            "sleeping before next cycle"
        );
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::process::ShExecutor;
    use crate::io::queue_store::{load_queue, save_queue};
    use crate::queue::{QueueDocument, TaskStatus};
    use crate::test_support::{
        ScriptedRepo, ScriptedShell, TestRepo, pending_task, worker_git, worker_paths,
    };

    #[test]
    fn loop_processes_until_a_task_blocks() {
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

        let mut outcomes = Vec::new();
        let stop = run_worker_loop(
            repo.root(),
            &worker_git(repo.root()),
            &ShExecutor,
            &paths,
            false,
            Duration::ZERO,
            |outcome| outcomes.push(outcome.clone()),
        )
        .expect("loop");

        assert!(matches!(stop, CycleOutcome::Blocked { ref id, .. } if id == "t2"));
        assert_eq!(outcomes.len(), 2);
        let saved = load_queue(&paths.queue_path).expect("load");
        assert_eq!(saved.tasks[0].status, TaskStatus::Done);
        assert_eq!(saved.tasks[1].status, TaskStatus::Blocked);
        // The loop stopped before reaching the third task.
        assert_eq!(saved.tasks[2].status, TaskStatus::Pending);
    }

    #[test]
    fn loop_halts_on_first_blocked_without_further_cycles() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = worker_paths(temp.path());
        let doc = QueueDocument {
            tasks: vec![pending_task("t1", "exit 1"), pending_task("t2", "true")],
        };
        save_queue(&paths.queue_path, &doc).expect("save");

        let mut cycles = 0;
        let stop = run_worker_loop(
            temp.path(),
            &ScriptedRepo::new(),
            &ScriptedShell::failing(1),
            &paths,
            false,
            Duration::ZERO,
            |_| cycles += 1,
        )
        .expect("loop");

        assert!(matches!(stop, CycleOutcome::Blocked { ref id, .. } if id == "t1"));
        assert_eq!(cycles, 1);
        let saved = load_queue(&paths.queue_path).expect("load");
        assert_eq!(saved.tasks[1].status, TaskStatus::Pending);
    }

    #[test]
    fn empty_queue_keeps_polling_for_new_work() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = worker_paths(temp.path());

        // Cycle 1 sees an empty queue; the callback then appends a failing
        // task, which cycle 2 picks up. The loop only stops because that
        // task blocks, proving "no pending work" is not a stop condition.
        let queue_path = paths.queue_path.clone();
        let mut outcomes = Vec::new();
        let stop = run_worker_loop(
            temp.path(),
            &ScriptedRepo::new(),
            &ScriptedShell::failing(1),
            &paths,
            false,
            Duration::ZERO,
            |outcome| {
                if outcomes.is_empty() {
                    let doc = QueueDocument {
                        tasks: vec![pending_task("late", "exit 1")],
                    };
                    save_queue(&queue_path, &doc).expect("append task");
                }
                outcomes.push(outcome.clone());
            },
        )
        .expect("loop");

        assert_eq!(outcomes[0], CycleOutcome::NoPending);
        assert!(matches!(stop, CycleOutcome::Blocked { ref id, .. } if id == "late"));
    }
}
