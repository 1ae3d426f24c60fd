//! Stable exit codes for worker CLI commands.

/// Cycle or loop ended in success, including "no pending work".
pub const OK: i32 = 0;
/// Cycle or loop ended on a blocked task, or an infrastructure error occurred.
pub const BLOCKED: i32 = 1;
/// The target path is not a git repository; no queue access was attempted.
pub const NOT_A_REPO: i32 = 2;
