//! Defines the unified error surface for key provisioning and daemon
//! supervision.

use std::fmt;
use std::io;

use camino::Utf8PathBuf;
use nix::errno::Errno;
use nix::unistd::Pid;
use thiserror::Error;

use bearhost_config::KeyPathsError;

/// External programs the supervisor launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// The one-shot key-generation helper.
    Keygen,
    /// The long-running SSH daemon.
    Daemon,
}

impl Tool {
    fn as_str(self) -> &'static str {
        match self {
            Self::Keygen => "key-generation helper",
            Self::Daemon => "ssh daemon",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced while provisioning the host key or launching the daemon.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required binary is absent or lacks an execute bit.
    #[error("{tool} '{path}' is missing or not executable")]
    ToolingMissing {
        /// Which program was being checked.
        tool: Tool,
        /// Configured location of the program.
        path: Utf8PathBuf,
    },
    /// Inspecting the host key failed for a reason other than absence.
    #[error("failed to inspect host key '{path}': {source}")]
    KeyInspect {
        /// Host key path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The host key directory could not be prepared.
    #[error(transparent)]
    KeyDirectory(#[from] KeyPathsError),
    /// A stale or partial key file could not be removed.
    #[error("failed to remove incomplete host key '{path}': {source}")]
    KeyCleanup {
        /// Host key path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The helper did not exit within the configured ceiling.
    #[error("key-generation helper did not finish within {timeout_ms} ms")]
    KeygenTimeout {
        /// Configured ceiling in milliseconds.
        timeout_ms: u128,
    },
    /// The helper exited unsuccessfully.
    #[error("key-generation helper {status}")]
    KeygenFailed {
        /// Human-readable exit description.
        status: String,
    },
    /// The helper exited cleanly but left no usable key behind.
    #[error("key-generation helper exited without producing '{path}'")]
    KeyNotProduced {
        /// Host key path.
        path: Utf8PathBuf,
    },
    /// An argument could not be converted for `execv`.
    #[error("argument '{value}' contains an interior NUL byte")]
    InvalidArgument {
        /// Offending argument.
        value: String,
    },
    /// The output pipe could not be created.
    #[error("failed to create daemon output pipe: {source}")]
    Pipe {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// `/dev/null` could not be opened for the child's standard input.
    #[error("failed to open /dev/null: {source}")]
    NullDevice {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The pipe's read end could not be switched to non-blocking mode.
    #[error("failed to make daemon output pipe non-blocking: {source}")]
    NonBlocking {
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// `fork(2)` failed, usually through resource exhaustion.
    #[error("failed to fork {tool}: {source}")]
    Fork {
        /// Which program was being launched.
        tool: Tool,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Waiting on a child process failed.
    #[error("failed to wait for process {pid}: {source}")]
    Wait {
        /// Child that could not be awaited.
        pid: Pid,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// A daemon is already supervised.
    #[error("ssh daemon already running with pid {pid}")]
    AlreadyRunning {
        /// PID of the running daemon.
        pid: Pid,
    },
}
