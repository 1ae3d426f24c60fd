//! Orchestration for a single `worker run-once` cycle.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::io::config::WorkerPaths;
use crate::io::git::Repository;
use crate::io::process::ShellExecutor;
use crate::io::queue_store::{load_queue, save_queue};
use crate::processor::process_task;
use crate::queue::{TaskStatus, next_pending, now_timestamp};

/// Result of one cycle: select-task, process, persist-status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No task with PENDING status; the queue file is left untouched.
    NoPending,
    /// The selected task finished and is now DONE.
    Done { id: String, message: String },
    /// The selected task failed and is now BLOCKED.
    Blocked { id: String, message: String },
}

impl CycleOutcome {
    /// One-line operator-facing summary, printed to stdout per cycle.
    pub fn summary(&self) -> String {
        match self {
            CycleOutcome::NoPending => "no pending work".to_string(),
            CycleOutcome::Done { id, message } => format!("[DONE] {id} - {message}"),
            CycleOutcome::Blocked { id, message } => format!("[BLOCKED] {id} - {message}"),
        }
    }
}

/// Execute one cycle against the repository.
///
/// Selects the first PENDING task in stored order, marks it RUNNING and
/// persists immediately (so observers see in-progress state even if this
/// process dies), processes it, then persists the final DONE/BLOCKED status
/// and result. Queue load/save failures propagate as `Err` without marking
/// the task, its true state is unknown.
#[instrument(skip_all)]
pub fn run_cycle<R: Repository, S: ShellExecutor>(
    repo_root: &Path,
    repo: &R,
    shell: &S,
    paths: &WorkerPaths,
    push: bool,
) -> Result<CycleOutcome> {
    let mut doc = load_queue(&paths.queue_path)?;
    let Some(index) = next_pending(&doc) else {
        debug!("no pending task");
        return Ok(CycleOutcome::NoPending);
    };

    let id = doc.tasks[index].id.clone();
    info!(task_id = %id, "starting task");
    doc.tasks[index].status = TaskStatus::Running;
    doc.tasks[index].updated_at = Some(now_timestamp());
    save_queue(&paths.queue_path, &doc).context("persist RUNNING status")?;

    let task = doc.tasks[index].clone();
    let result = process_task(&task, repo, shell, repo_root, &paths.log_dir, push)?;

    let entry = &mut doc.tasks[index];
    entry.status = if result.success {
        TaskStatus::Done
    } else {
        TaskStatus::Blocked
    };
    entry.updated_at = Some(now_timestamp());
    entry.result = Some(result.message.clone());
    save_queue(&paths.queue_path, &doc).context("persist final status")?;

    if result.success {
        info!(task_id = %id, "task done");
        Ok(CycleOutcome::Done {
            id,
            message: result.message,
        })
    } else {
        info!(task_id = %id, "task blocked");
        Ok(CycleOutcome::Blocked {
            id,
            message: result.message,
        })
    }
}
