//! Single-consumer git task-queue worker.
//!
//! This crate drives a persisted task queue through a repeatable git
//! workflow: take the first pending task, run its shell command on a
//! dedicated `task/<id>` branch, and commit (optionally push) whatever the
//! command changed. The architecture enforces a strict separation:
//!
//! - **[`queue`]**: Pure, deterministic logic (task model, selection,
//!   invariants). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (queue file, git, process
//!   execution, task logs). Isolated to enable scripting in tests.
//!
//! Orchestration modules ([`processor`], [`cycle`], [`looping`]) coordinate
//! queue logic with I/O to implement the CLI commands.

pub mod cycle;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod processor;
pub mod queue;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
