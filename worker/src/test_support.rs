//! Test-only helpers: queue fixtures, scripted I/O fakes, and real git repos.

use std::cell::{Cell, RefCell};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::io::config::{WorkerConfig, WorkerPaths};
use crate::io::git::{Git, Repository};
use crate::io::process::{CommandOutput, ShellExecutor};
use crate::queue::{Task, TaskStatus};

/// Create a PENDING task with no optional fields set.
pub fn pending_task(id: &str, command: &str) -> Task {
    Task {
        id: id.to_string(),
        command: command.to_string(),
        status: TaskStatus::Pending,
        commit_message: None,
        updated_at: None,
        result: None,
    }
}

/// Create a task in an explicit status.
pub fn task_with_status(id: &str, status: TaskStatus) -> Task {
    let mut task = pending_task(id, "true");
    task.status = status;
    task
}

/// Default worker paths rooted at `root` (queue.json, logs/).
pub fn worker_paths(root: &Path) -> WorkerPaths {
    WorkerPaths::new(root, &WorkerConfig::default())
}

/// Git adapter configured the way the CLI configures it: the worker's own
/// artifacts are excluded from change detection and staging.
pub fn worker_git(root: &Path) -> Git {
    Git::new(root).with_exclude_pathspecs(worker_paths(root).exclude_pathspecs(root))
}

fn exit_status(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}

/// Shell executor returning canned results without spawning processes.
pub struct ScriptedShell {
    exit_code: i32,
    stdout: String,
    stderr: String,
    runs: Cell<usize>,
}

impl ScriptedShell {
    pub fn succeeding() -> Self {
        Self {
            exit_code: 0,
            stdout: "ok\n".to_string(),
            stderr: String::new(),
            runs: Cell::new(0),
        }
    }

    pub fn failing(exit_code: i32) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: "scripted failure\n".to_string(),
            runs: Cell::new(0),
        }
    }

    /// How many commands were run through this executor.
    pub fn runs(&self) -> usize {
        self.runs.get()
    }
}

impl ShellExecutor for ScriptedShell {
    fn run(&self, _command: &str, _workdir: &Path) -> Result<CommandOutput> {
        self.runs.set(self.runs.get() + 1);
        Ok(CommandOutput {
            status: exit_status(self.exit_code),
            stdout: self.stdout.clone().into_bytes(),
            stderr: self.stderr.clone().into_bytes(),
        })
    }
}

/// Repository operations recorded by [`ScriptedRepo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoCall {
    FetchPrune,
    CheckoutReset,
    HasChanges,
    StageAll,
    Commit,
    Push,
}

/// Repository fake with scriptable per-operation failures.
#[derive(Default)]
pub struct ScriptedRepo {
    has_changes: bool,
    fail_fetch: Option<String>,
    fail_checkout: Option<String>,
    fail_has_changes: Option<String>,
    fail_stage: Option<String>,
    fail_commit: Option<String>,
    fail_push: Option<String>,
    calls: RefCell<Vec<RepoCall>>,
    commit_messages: RefCell<Vec<String>>,
}

impl ScriptedRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_changes(mut self, has_changes: bool) -> Self {
        self.has_changes = has_changes;
        self
    }

    pub fn fail_fetch(mut self, reason: &str) -> Self {
        self.fail_fetch = Some(reason.to_string());
        self
    }

    pub fn fail_checkout(mut self, reason: &str) -> Self {
        self.fail_checkout = Some(reason.to_string());
        self
    }

    pub fn fail_has_changes(mut self, reason: &str) -> Self {
        self.fail_has_changes = Some(reason.to_string());
        self
    }

    pub fn fail_stage(mut self, reason: &str) -> Self {
        self.fail_stage = Some(reason.to_string());
        self
    }

    pub fn fail_commit(mut self, reason: &str) -> Self {
        self.fail_commit = Some(reason.to_string());
        self
    }

    pub fn fail_push(mut self, reason: &str) -> Self {
        self.fail_push = Some(reason.to_string());
        self
    }

    /// Operations invoked, in call order.
    pub fn calls(&self) -> Vec<RepoCall> {
        self.calls.borrow().clone()
    }

    /// Messages passed to `commit`, in call order.
    pub fn commit_messages(&self) -> Vec<String> {
        self.commit_messages.borrow().clone()
    }

    fn record(&self, call: RepoCall, failure: &Option<String>) -> Result<()> {
        self.calls.borrow_mut().push(call);
        match failure {
            Some(reason) => Err(anyhow!("{reason}")),
            None => Ok(()),
        }
    }
}

impl Repository for ScriptedRepo {
    fn fetch_prune(&self) -> Result<()> {
        self.record(RepoCall::FetchPrune, &self.fail_fetch)
    }

    fn checkout_reset_branch(&self, _branch: &str) -> Result<()> {
        self.record(RepoCall::CheckoutReset, &self.fail_checkout)
    }

    fn has_changes(&self) -> Result<bool> {
        self.record(RepoCall::HasChanges, &self.fail_has_changes)?;
        Ok(self.has_changes)
    }

    fn stage_all(&self) -> Result<()> {
        self.record(RepoCall::StageAll, &self.fail_stage)
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.commit_messages.borrow_mut().push(message.to_string());
        self.record(RepoCall::Commit, &self.fail_commit)
    }

    fn push_upstream(&self, _branch: &str) -> Result<()> {
        self.record(RepoCall::Push, &self.fail_push)
    }
}

/// A real git repository in a temp directory, with one initial commit.
///
/// Deliberately unprepared: no `.gitignore` for worker artifacts, so tests
/// exercise the same bare repository an operator points the worker at.
pub struct TestRepo {
    dir: TempDir,
    // Keeps the bare push remote alive for the repo's lifetime.
    _remote: Option<TempDir>,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let repo = Self { dir, _remote: None };
        repo.git(&["init", "-q"])?;
        repo.git(&["config", "user.email", "worker@test.invalid"])?;
        repo.git(&["config", "user.name", "worker-test"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        std::fs::write(repo.root().join("README.md"), "# test repo\n")
            .context("write README")?;
        repo.git(&["add", "-A"])?;
        repo.git(&["commit", "-q", "-m", "initial commit"])?;
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Register a bare repository (outside the working tree) as `origin`
    /// so pushes have a target.
    ///
    /// Returns the bare repository path for post-push inspection.
    pub fn add_bare_origin(&mut self) -> Result<PathBuf> {
        let remote = tempfile::tempdir().context("create remote tempdir")?;
        let remote_dir = remote.path().join("origin.git");
        let status = Command::new("git")
            .args(["init", "-q", "--bare"])
            .arg(&remote_dir)
            .status()
            .context("spawn git init --bare")?;
        if !status.success() {
            return Err(anyhow!("git init --bare failed"));
        }
        self.git(&["remote", "add", "origin", remote_dir.to_str().expect("utf8 path")])?;
        self._remote = Some(remote);
        Ok(remote_dir)
    }

    pub fn current_branch(&self) -> Result<String> {
        self.git_capture(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Number of commits reachable from a ref.
    pub fn commit_count(&self, reference: &str) -> Result<usize> {
        let out = self.git_capture(&["rev-list", "--count", reference])?;
        out.parse().context("parse rev-list count")
    }

    /// Tip commit of a ref in an arbitrary git directory (e.g. a bare remote).
    pub fn tip_of(git_dir: &Path, reference: &str) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(git_dir)
            .args(["rev-parse", reference])
            .output()
            .context("spawn git rev-parse")?;
        if !output.status.success() {
            return Err(anyhow!(
                "git rev-parse {reference} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn git(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.root())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }

    fn git_capture(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.root())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
