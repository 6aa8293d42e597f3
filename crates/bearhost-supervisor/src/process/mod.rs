//! Low-level process plumbing shared by the key provisioner and the daemon
//! supervisor: exec planning, the fork/exec child path, and bounded waits.

mod errors;
pub(crate) mod exec;
pub(crate) mod wait;

pub use errors::{SupervisorError, Tool};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Exit status used by a forked child whose `execv` failed.
pub const EXEC_FAILURE_STATUS: i32 = 127;
