//! Task queue data model and pure selection logic.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lifecycle state of a queued task.
///
/// `Done` and `Blocked` are terminal; the worker never transitions a task
/// out of them. Resuming a blocked task means editing the queue file by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Blocked,
}

/// One queued unit of work.
///
/// `id` must be unique within the queue: it derives the branch name
/// (`task/<id>`) and the log file name (`<id>.log`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// Opaque shell command, executed verbatim. Never parsed or validated.
    pub command: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    /// Set on every status transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Human-readable outcome, set once processing finishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Task {
    /// Name of the dedicated branch this task is processed on.
    pub fn branch_name(&self) -> String {
        format!("task/{}", self.id)
    }

    /// Commit message to use: the task's own, or a generated default.
    pub fn effective_commit_message(&self) -> String {
        match &self.commit_message {
            Some(msg) if !msg.trim().is_empty() => msg.clone(),
            _ => format!("task: {}", self.id),
        }
    }
}

/// The full persisted collection of tasks, loaded and saved whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDocument {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Index of the first `Pending` task in stored order, if any.
///
/// Stored order is selection priority: the queue is never reordered by the
/// worker, so this is deterministic for a given document.
pub fn next_pending(doc: &QueueDocument) -> Option<usize> {
    doc.tasks
        .iter()
        .position(|task| task.status == TaskStatus::Pending)
}

/// Check semantic invariants the JSON schema cannot express.
///
/// Returns human-readable violations; an empty vec means the document is
/// well-formed. Checked on every load so a hand-edited queue fails fast.
pub fn validate_invariants(doc: &QueueDocument) -> Vec<String> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for task in &doc.tasks {
        if !seen.insert(task.id.as_str()) {
            errors.push(format!("duplicate id '{}'", task.id));
        }
    }

    let running: Vec<&str> = doc
        .tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Running)
        .map(|task| task.id.as_str())
        .collect();
    if running.len() > 1 {
        errors.push(format!(
            "more than one RUNNING task: {}",
            running.join(", ")
        ));
    }

    errors
}

/// Current local time formatted as the queue's `updated_at` timestamp.
pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
