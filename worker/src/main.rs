//! Single-consumer git task-queue worker.
//!
//! Drives a persisted queue (`queue.json`) through a repeatable git
//! workflow: take the first PENDING task, run its shell command on a
//! dedicated `task/<id>` branch, and commit (optionally push) the result.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use worker::cycle::{CycleOutcome, run_cycle};
use worker::exit_codes;
use worker::io::config::{WorkerPaths, config_path, load_config};
use worker::io::git::Git;
use worker::io::process::ShExecutor;
use worker::logging;
use worker::looping::run_worker_loop;

#[derive(Parser)]
#[command(
    name = "worker",
    version,
    about = "Single-consumer git task-queue worker"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process at most one pending task, then exit.
    RunOnce {
        /// Git repository to operate on.
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Push the task branch to origin after committing.
        #[arg(long)]
        push: bool,
    },
    /// Process pending tasks in a loop, sleeping between cycles.
    RunLoop {
        /// Git repository to operate on.
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Push the task branch to origin after committing.
        #[arg(long)]
        push: bool,
        /// Seconds to sleep between cycles (default from worker.toml).
        #[arg(long)]
        interval: Option<u64>,
    },
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{err:#}");
            if err.downcast_ref::<NotARepository>().is_some() {
                ExitCode::from(exit_codes::NOT_A_REPO as u8)
            } else {
                ExitCode::from(exit_codes::BLOCKED as u8)
            }
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::RunOnce { repo, push } => {
            let (root, paths) = prepare(&repo)?;
            let git = Git::new(&root).with_exclude_pathspecs(paths.exclude_pathspecs(&root));
            let outcome = run_cycle(&root, &git, &ShExecutor, &paths, push)?;
            println!("{}", outcome.summary());
            Ok(outcome_code(&outcome))
        }
        Command::RunLoop {
            repo,
            push,
            interval,
        } => {
            let (root, paths) = prepare(&repo)?;
            let cfg = load_config(&config_path(&root))?;
            let interval = Duration::from_secs(interval.unwrap_or(cfg.default_interval_secs));
            let git = Git::new(&root).with_exclude_pathspecs(paths.exclude_pathspecs(&root));
            let stop = run_worker_loop(
                &root,
                &git,
                &ShExecutor,
                &paths,
                push,
                interval,
                |outcome| println!("{}", outcome.summary()),
            )?;
            Ok(outcome_code(&stop))
        }
    }
}

/// Resolve the repository root and worker paths.
///
/// A non-repository target is a setup error: reported before any queue
/// access, with its own exit code.
fn prepare(repo: &Path) -> Result<(PathBuf, WorkerPaths)> {
    let root = repo
        .canonicalize()
        .with_context(|| format!("resolve repository path {}", repo.display()))
        .map_err(|err| NotARepository(format!("{err:#}")))?;
    if !Git::new(&root).is_repository() {
        return Err(NotARepository(format!("not a git repository: {}", root.display())).into());
    }
    let cfg = load_config(&config_path(&root))?;
    let paths = WorkerPaths::new(&root, &cfg);
    Ok((root, paths))
}

fn outcome_code(outcome: &CycleOutcome) -> i32 {
    match outcome {
        CycleOutcome::NoPending | CycleOutcome::Done { .. } => exit_codes::OK,
        CycleOutcome::Blocked { .. } => exit_codes::BLOCKED,
    }
}

/// Setup error carrying the dedicated exit code.
#[derive(Debug)]
struct NotARepository(String);

impl std::fmt::Display for NotARepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotARepository {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_once_defaults() {
        let cli = Cli::parse_from(["worker", "run-once"]);
        let Command::RunOnce { repo, push } = cli.command else {
            panic!("expected run-once");
        };
        assert_eq!(repo, PathBuf::from("."));
        assert!(!push);
    }

    #[test]
    fn parse_run_loop_with_flags() {
        let cli = Cli::parse_from([
            "worker", "run-loop", "--repo", "/tmp/r", "--push", "--interval", "5",
        ]);
        let Command::RunLoop {
            repo,
            push,
            interval,
        } = cli.command
        else {
            panic!("expected run-loop");
        };
        assert_eq!(repo, PathBuf::from("/tmp/r"));
        assert!(push);
        assert_eq!(interval, Some(5));
    }
}
