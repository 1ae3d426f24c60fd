//! Task lifecycle state machine.
//!
//! Drives one task through branch setup, command execution, change
//! detection, commit, and optional push. Every step is a potential
//! termination point with its own failure reason; task-level failures are
//! converted into a [`TaskResult`] here and never crash the cycle.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::io::git::Repository;
use crate::io::process::ShellExecutor;
use crate::io::task_log::write_task_log;
use crate::queue::Task;

/// Outcome of processing one task: success flag plus a human-readable
/// message stored as the task's `result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub success: bool,
    pub message: String,
}

impl TaskResult {
    fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn blocked(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Process one task against the repository.
///
/// Returns `Err` only for infrastructure failures (log directory or log
/// file unwritable); everything task-level lands in the returned
/// [`TaskResult`]. The command's own output is never copied into the
/// result message, operators read the log file.
#[instrument(skip_all, fields(task_id = %task.id))]
pub fn process_task<R: Repository, S: ShellExecutor>(
    task: &Task,
    repo: &R,
    shell: &S,
    workdir: &Path,
    log_dir: &Path,
    push: bool,
) -> Result<TaskResult> {
    let branch = task.branch_name();

    // Remote sync is best-effort: a network hiccup must not stop local work.
    if let Err(err) = repo.fetch_prune() {
        warn!(err = %err, "fetch --all --prune failed, continuing");
    }

    if let Err(err) = repo.checkout_reset_branch(&branch) {
        return Ok(TaskResult::blocked(format!("branch setup failed: {err}")));
    }

    debug!(command = %task.command, "running task command");
    let output = match shell.run(&task.command, workdir) {
        Ok(output) => output,
        // Could-not-run-at-all is still a task failure, not a worker crash.
        Err(err) => {
            return Ok(TaskResult::blocked(format!(
                "task command could not run: {err}"
            )));
        }
    };

    // The log record is written unconditionally once the command has run.
    let log_path = write_task_log(log_dir, &task.id, &task.command, &output)?;

    if !output.status.success() {
        return Ok(TaskResult::blocked(format!(
            "task command failed (log: {})",
            log_path.display()
        )));
    }

    let changed = match repo.has_changes() {
        Ok(changed) => changed,
        Err(err) => {
            return Ok(TaskResult::blocked(format!(
                "change detection failed: {err}"
            )));
        }
    };

    if changed {
        if let Err(err) = repo.stage_all() {
            return Ok(TaskResult::blocked(format!("stage failed: {err}")));
        }
        if let Err(err) = repo.commit(&task.effective_commit_message()) {
            return Ok(TaskResult::blocked(format!("commit failed: {err}")));
        }
        if push && let Err(err) = repo.push_upstream(&branch) {
            return Ok(TaskResult::blocked(format!("push failed: {err}")));
        }
        info!(branch, pushed = push, "task committed");
    } else {
        // A command that made no observable change still completed; an
        // idempotent or already-satisfied task must not block the queue.
        debug!("no working tree changes, completing as no-op");
    }

    Ok(TaskResult::done(format!(
        "completed (log: {})",
        log_path.display()
    )))
}
