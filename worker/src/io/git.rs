//! Git adapter for the worker's repository mutation surface.
//!
//! The worker drives branches and commits deterministically, so we keep a
//! small, explicit wrapper around `git` subprocess calls. The [`Repository`]
//! trait is the narrow surface the task processor consumes; tests use
//! scripted implementations that never touch a real repository.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

/// The version-control capability set consumed by the task processor:
/// fetch, branch, status, stage-all, commit, push.
pub trait Repository {
    /// Fetch all remotes and prune stale refs.
    fn fetch_prune(&self) -> Result<()>;
    /// Create the branch at current HEAD, or reset it if it exists, and
    /// switch to it (`checkout -B`).
    fn checkout_reset_branch(&self, branch: &str) -> Result<()>;
    /// True if the working tree has any change, including untracked files.
    fn has_changes(&self) -> Result<bool>;
    /// Stage all changes (respects .gitignore).
    fn stage_all(&self) -> Result<()>;
    /// Commit staged changes with a message.
    fn commit(&self, message: &str) -> Result<()>;
    /// Push the branch to `origin`, setting the upstream tracking ref.
    fn push_upstream(&self, branch: &str) -> Result<()>;
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    exclude_pathspecs: Vec<String>,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            exclude_pathspecs: Vec::new(),
        }
    }

    /// Hide the given `:(exclude)` pathspecs from change detection and
    /// staging. The worker excludes its own queue, logs, and config this
    /// way so they never count as task output.
    pub fn with_exclude_pathspecs(mut self, pathspecs: Vec<String>) -> Self {
        self.exclude_pathspecs = pathspecs;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// True if the working directory looks like a git repository.
    pub fn is_repository(&self) -> bool {
        self.workdir.join(".git").exists()
    }

    fn args_with_excludes(&self, base: &[&str]) -> Vec<String> {
        let mut args: Vec<String> = base.iter().map(|arg| arg.to_string()).collect();
        if !self.exclude_pathspecs.is_empty() {
            args.push("--".to_string());
            args.push(".".to_string());
            args.extend(self.exclude_pathspecs.iter().cloned());
        }
        args
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

impl Repository for Git {
    #[instrument(skip_all)]
    fn fetch_prune(&self) -> Result<()> {
        debug!("fetching all remotes with prune");
        self.run_checked(&["fetch", "--all", "--prune"])?;
        Ok(())
    }

    #[instrument(skip_all, fields(branch))]
    fn checkout_reset_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "creating or resetting branch");
        self.run_checked(&["checkout", "-B", branch])?;
        Ok(())
    }

    fn has_changes(&self) -> Result<bool> {
        let args = self.args_with_excludes(&["status", "--porcelain"]);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.run_checked(&refs)?;
        Ok(!String::from_utf8_lossy(&out.stdout).trim().is_empty())
    }

    fn stage_all(&self) -> Result<()> {
        let args = self.args_with_excludes(&["add", "-A"]);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_checked(&refs)?;
        Ok(())
    }

    #[instrument(skip_all)]
    fn commit(&self, message: &str) -> Result<()> {
        debug!("committing staged changes");
        self.run_checked(&["commit", "-m", message])?;
        Ok(())
    }

    #[instrument(skip_all, fields(branch))]
    fn push_upstream(&self, branch: &str) -> Result<()> {
        debug!(branch, "pushing branch with upstream");
        self.run_checked(&["push", "-u", "origin", branch])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;

    #[test]
    fn is_repository_detects_git_dir() {
        let repo = TestRepo::new().expect("repo");
        assert!(Git::new(repo.root()).is_repository());

        let temp = tempfile::tempdir().expect("tempdir");
        assert!(!Git::new(temp.path()).is_repository());
    }

    #[test]
    fn checkout_reset_branch_switches_and_resets() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.root());

        git.checkout_reset_branch("task/t1").expect("checkout");
        assert_eq!(repo.current_branch().expect("branch"), "task/t1");

        // Resetting an existing branch must not fail.
        git.checkout_reset_branch("task/t1").expect("re-checkout");
    }

    #[test]
    fn has_changes_sees_untracked_files() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.root());

        assert!(!git.has_changes().expect("status"));
        std::fs::write(repo.root().join("new.txt"), "content").expect("write");
        assert!(git.has_changes().expect("status"));
    }

    #[test]
    fn exclude_pathspecs_hide_paths_from_status_and_staging() {
        let repo = TestRepo::new().expect("repo");
        std::fs::write(repo.root().join("queue.json"), "{\"tasks\": []}\n").expect("write");
        std::fs::create_dir(repo.root().join("logs")).expect("mkdir");
        std::fs::write(repo.root().join("logs/t1.log"), "log\n").expect("write");
        std::fs::write(repo.root().join("payload.txt"), "payload\n").expect("write");

        let excluding = Git::new(repo.root()).with_exclude_pathspecs(vec![
            ":(exclude)queue.json".to_string(),
            ":(exclude)logs".to_string(),
        ]);

        assert!(excluding.has_changes().expect("status"));
        excluding.stage_all().expect("stage");
        excluding.commit("add payload").expect("commit");

        // Only the payload was committed; the excluded paths are still
        // untracked as far as an unfiltered view is concerned.
        assert!(!excluding.has_changes().expect("status"));
        assert!(Git::new(repo.root()).has_changes().expect("status"));
    }

    #[test]
    fn stage_and_commit_clears_changes() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.root());

        std::fs::write(repo.root().join("new.txt"), "content").expect("write");
        git.stage_all().expect("stage");
        git.commit("add new.txt").expect("commit");
        assert!(!git.has_changes().expect("status"));
    }
}
