//! Per-task log records.
//!
//! One plain-text file per task id, written exactly once per execution and
//! overwritten wholesale if the task is ever reprocessed. Never rotated or
//! truncated.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::io::process::CommandOutput;
use crate::queue::now_timestamp;

/// Path of the log file for a task id.
pub fn log_path(log_dir: &Path, task_id: &str) -> PathBuf {
    log_dir.join(format!("{task_id}.log"))
}

/// Write the log record for one command execution.
///
/// Creates the log directory on demand. Returns the log file path so the
/// task result message can reference it.
pub fn write_task_log(
    log_dir: &Path,
    task_id: &str,
    command: &str,
    output: &CommandOutput,
) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("create log directory {}", log_dir.display()))?;
    let path = log_path(log_dir, task_id);
    let record = render_record(task_id, command, output, &now_timestamp());
    fs::write(&path, record).with_context(|| format!("write task log {}", path.display()))?;
    Ok(path)
}

fn render_record(task_id: &str, command: &str, output: &CommandOutput, timestamp: &str) -> String {
    format!(
        "[{timestamp}] TASK={task_id}\n\
         CMD: {command}\n\n\
         [STDOUT]\n{stdout}\n\
         [STDERR]\n{stderr}\n\
         [RETURN_CODE] {code}\n",
        stdout = output.stdout_text(),
        stderr = output.stderr_text(),
        code = output.code_label(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::process::{ShExecutor, ShellExecutor};

    #[test]
    fn writes_record_with_output_and_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log_dir = temp.path().join("logs");
        let output = ShExecutor
            .run("echo out; echo err >&2; exit 5", temp.path())
            .expect("run");

        let path = write_task_log(&log_dir, "t1", "echo out; echo err >&2; exit 5", &output)
            .expect("write log");

        assert_eq!(path, log_dir.join("t1.log"));
        let contents = fs::read_to_string(&path).expect("read");
        assert!(contents.contains("TASK=t1"));
        assert!(contents.contains("CMD: echo out; echo err >&2; exit 5"));
        assert!(contents.contains("[STDOUT]\nout\n"));
        assert!(contents.contains("[STDERR]\nerr\n"));
        assert!(contents.contains("[RETURN_CODE] 5"));
    }

    #[test]
    fn reprocessing_overwrites_previous_record() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log_dir = temp.path().join("logs");

        let first = ShExecutor.run("echo first", temp.path()).expect("run");
        write_task_log(&log_dir, "t1", "echo first", &first).expect("write");
        let second = ShExecutor.run("echo second", temp.path()).expect("run");
        let path = write_task_log(&log_dir, "t1", "echo second", &second).expect("write");

        let contents = fs::read_to_string(&path).expect("read");
        assert!(contents.contains("second"));
        assert!(!contents.contains("first"));
    }
}
