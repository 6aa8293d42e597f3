//! Supervision of a Dropbear SSH daemon.
//!
//! The crate owns the full lifecycle of one daemon process: it provisions a
//! persistent host key with the key-generation helper, forks the daemon in the
//! foreground with its output captured through a pipe, forwards that output
//! line by line to a caller-supplied [`LogSink`] without blocking, and shuts
//! the daemon down with a bounded `SIGTERM` grace period before escalating to
//! `SIGKILL`.
//!
//! Everything is driven from the caller's thread. [`DaemonSupervisor::start`]
//! and [`DaemonSupervisor::stop`] are the only calls that block, and both
//! block for at most their configured timeouts. The host application is
//! expected to call [`DaemonSupervisor::pump_logs`] once per frame.
//!
//! Lifecycle transitions are reported through [`LifecycleReporter`] so hosts
//! can observe state without polling.
#![deny(missing_docs)]

mod process;
mod provision;
mod pump;
mod reporter;
mod sink;
mod supervisor;

pub use nix::unistd::Pid;
pub use process::{EXEC_FAILURE_STATUS, SupervisorError, Tool};
pub use provision::{KeyProvisioner, KeyStatus};
pub use pump::{LineFramer, PumpStatus};
pub use reporter::{LifecycleReporter, StructuredLifecycleReporter};
pub use sink::LogSink;
pub use supervisor::{DaemonSupervisor, SupervisorState};

#[cfg(test)]
mod tests;
