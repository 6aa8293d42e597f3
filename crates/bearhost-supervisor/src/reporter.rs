//! Lifecycle reporting hooks for the daemon supervisor.

use camino::Utf8Path;
use nix::unistd::Pid;
use tracing::{error, info, warn};

use crate::process::SupervisorError;
use crate::provision::KeyStatus;
use crate::supervisor::SupervisorState;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Observer notified of every supervisor lifecycle event.
pub trait LifecycleReporter: Send + Sync {
    /// The supervisor moved between states.
    fn state_changed(&self, from: SupervisorState, to: SupervisorState);

    /// A host key is in place.
    fn host_key_ready(&self, path: &Utf8Path, status: KeyStatus);

    /// The daemon was forked.
    fn daemon_spawned(&self, pid: Pid);

    /// The daemon exited and was reaped.
    fn daemon_exited(&self, pid: Pid, status: &str);

    /// The daemon ignored `SIGTERM` and was killed.
    fn daemon_killed(&self, pid: Pid);

    /// `start()` failed; the supervisor is back in `Stopped`.
    fn start_failed(&self, error: &SupervisorError);
}

/// Reporter that emits structured tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Creates a new reporter instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn state_changed(&self, from: SupervisorState, to: SupervisorState) {
        info!(
            target: LIFECYCLE_TARGET,
            from = from.as_str(),
            to = to.as_str(),
            "supervisor state changed"
        );
    }

    fn host_key_ready(&self, path: &Utf8Path, status: KeyStatus) {
        info!(target: LIFECYCLE_TARGET, path = %path, status = ?status, "host key ready");
    }

    fn daemon_spawned(&self, pid: Pid) {
        info!(target: LIFECYCLE_TARGET, pid = pid.as_raw(), "ssh daemon spawned");
    }

    fn daemon_exited(&self, pid: Pid, status: &str) {
        info!(target: LIFECYCLE_TARGET, pid = pid.as_raw(), status, "ssh daemon exited");
    }

    fn daemon_killed(&self, pid: Pid) {
        warn!(
            target: LIFECYCLE_TARGET,
            pid = pid.as_raw(),
            "ssh daemon ignored SIGTERM; sent SIGKILL"
        );
    }

    fn start_failed(&self, error: &SupervisorError) {
        error!(target: LIFECYCLE_TARGET, %error, "ssh daemon failed to start");
    }
}
