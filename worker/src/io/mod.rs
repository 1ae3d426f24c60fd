//! I/O helpers for worker commands.

pub mod config;
pub mod git;
pub mod process;
pub mod queue_store;
pub mod task_log;
