//! Bounded child waits built on `waitpid(WNOHANG)` polling.

use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::warn;

use super::{PROCESS_TARGET, SupervisorError};

/// Polls `pid` until it exits or `timeout` elapses.
///
/// Returns `Ok(None)` when the deadline passes with the child still alive.
pub(crate) fn wait_bounded(
    pid: Pid,
    timeout: Duration,
    interval: Duration,
) -> Result<Option<WaitStatus>, SupervisorError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = try_reap(pid)? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(interval.min(deadline - now));
    }
}

/// Performs a single non-blocking reap attempt.
pub(crate) fn try_reap(pid: Pid) -> Result<Option<WaitStatus>, SupervisorError> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => {
                return Ok(Some(status));
            }
            Ok(_) => return Ok(None),
            Err(Errno::EINTR) => continue,
            Err(source) => return Err(SupervisorError::Wait { pid, source }),
        }
    }
}

/// Sends `SIGKILL` and blocks until the child is reaped.
///
/// `SIGKILL` cannot be caught, so the blocking wait is bounded by the kernel.
pub(crate) fn kill_and_reap(pid: Pid) -> Option<WaitStatus> {
    if let Err(error) = signal::kill(pid, Signal::SIGKILL)
        && error != Errno::ESRCH
    {
        warn!(target: PROCESS_TARGET, pid = pid.as_raw(), %error, "failed to send SIGKILL");
    }
    loop {
        match waitpid(pid, None) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => return Some(status),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(error) => {
                warn!(target: PROCESS_TARGET, pid = pid.as_raw(), %error, "failed to reap killed child");
                return None;
            }
        }
    }
}

/// Renders an exit status for humans, e.g. `exited with status 1`.
pub(crate) fn describe(status: &WaitStatus) -> String {
    match status {
        WaitStatus::Exited(_, code) => format!("exited with status {code}"),
        WaitStatus::Signaled(_, signal, _) => format!("terminated by signal {}", signal.as_str()),
        other => format!("changed state ({other:?})"),
    }
}

/// Returns true for a normal exit with status zero.
pub(crate) fn is_success(status: &WaitStatus) -> bool {
    matches!(status, WaitStatus::Exited(_, 0))
}
