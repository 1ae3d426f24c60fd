//! Shell command execution with captured output.
//!
//! A non-zero exit is ordinary data here, never an error: the caller decides
//! whether it is fatal. Only a failure to run the command at all (spawn or
//! pipe I/O) surfaces as `Err`.

use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Exit code rendered for logs; `"signal"` when the child was killed.
    pub fn code_label(&self) -> String {
        match self.status.code() {
            Some(code) => code.to_string(),
            None => "signal".to_string(),
        }
    }
}

/// Abstraction over running an opaque shell command in a working directory.
///
/// Tests use scripted implementations that return predetermined outputs
/// without spawning processes.
pub trait ShellExecutor {
    fn run(&self, command: &str, workdir: &Path) -> Result<CommandOutput>;
}

/// Executor that spawns `sh -c <command>`.
pub struct ShExecutor;

impl ShellExecutor for ShExecutor {
    fn run(&self, command: &str, workdir: &Path) -> Result<CommandOutput> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).current_dir(workdir);
        run_command(cmd)
    }
}

/// Run a command to completion, capturing stdout and stderr.
///
/// Both pipes are drained on reader threads while the child runs to avoid
/// pipe deadlocks on large output. Blocks until the child exits; there is
/// deliberately no timeout, a hanging command hangs the worker.
#[instrument(skip_all)]
pub fn run_command(mut cmd: Command) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream(stdout));
    let stderr_handle = thread::spawn(move || read_stream(stderr));

    let status = child.wait().context("wait for command")?;

    let stdout = join_output(stdout_handle).context("join stdout")?;
    let stderr = join_output(stderr_handle).context("join stderr")?;

    debug!(exit_code = ?status.code(), "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}

fn join_output(handle: thread::JoinHandle<Result<Vec<u8>>>) -> Result<Vec<u8>> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).context("read output")?;
    Ok(buf)
}
