//! Host key provisioning.
//!
//! The key-generation helper runs at most once per missing key. Its output is
//! discarded, its runtime is capped, and a key it leaves half-written is
//! removed so the next attempt starts from a clean slate.

use std::fs;
use std::io::ErrorKind;
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

use bearhost_config::{KeyPaths, SupervisorSettings};
use camino::{Utf8Path, Utf8PathBuf};
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::process::exec::{self, ChildStdio, ExecPlan};
use crate::process::wait;
use crate::process::{PROCESS_TARGET, SupervisorError, Tool};

/// Outcome of a successful provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// A usable key was already on disk; nothing was spawned.
    Existing,
    /// The helper produced a fresh key.
    Generated,
}

/// Ensures a persistent host key exists before the daemon starts.
#[derive(Debug, Clone)]
pub struct KeyProvisioner {
    keygen_binary: Utf8PathBuf,
    key_path: Utf8PathBuf,
    key_type: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl KeyProvisioner {
    /// Builds a provisioner from the supervisor settings.
    #[must_use]
    pub fn new(settings: &SupervisorSettings) -> Self {
        Self {
            keygen_binary: settings.keygen_binary.clone(),
            key_path: settings.host_key_path.clone(),
            key_type: settings.key_type.clone(),
            timeout: settings.keygen_timeout,
            poll_interval: settings.poll_interval,
        }
    }

    /// Path of the key this provisioner manages.
    #[must_use]
    pub fn key_path(&self) -> &Utf8Path {
        &self.key_path
    }

    /// Generates the host key if no usable one exists.
    ///
    /// A non-empty regular file counts as usable. An empty file is treated as
    /// the remains of an interrupted run and regenerated.
    pub fn ensure_host_key(&self) -> Result<KeyStatus, SupervisorError> {
        if key_is_usable(&self.key_path)? {
            debug!(target: PROCESS_TARGET, path = %self.key_path, "host key already present");
            return Ok(KeyStatus::Existing);
        }

        exec::ensure_executable(Tool::Keygen, &self.keygen_binary)?;
        KeyPaths::for_key(&self.key_path)?.prepare()?;
        remove_key(&self.key_path)?;

        info!(
            target: PROCESS_TARGET,
            path = %self.key_path,
            key_type = %self.key_type,
            "generating host key"
        );
        match self.run_helper() {
            Ok(()) => Ok(KeyStatus::Generated),
            Err(error) => {
                if let Err(cleanup) = remove_key(&self.key_path) {
                    warn!(target: PROCESS_TARGET, error = %cleanup, "failed to clean up partial host key");
                }
                Err(error)
            }
        }
    }

    fn run_helper(&self) -> Result<(), SupervisorError> {
        let plan = ExecPlan::new(
            Tool::Keygen,
            &self.keygen_binary,
            &["-t", &self.key_type, "-f", self.key_path.as_str()],
        )?;
        let null = exec::open_null_device()?;
        let fd = null.as_raw_fd();
        let stdio = ChildStdio {
            stdin: fd,
            stdout: fd,
            stderr: fd,
            close_in_child: None,
        };
        let mut helper = KeygenHelper::launch(&plan, &stdio)?;
        drop(null);

        let status = helper.wait(self.timeout, self.poll_interval)?;
        if !wait::is_success(&status) {
            return Err(SupervisorError::KeygenFailed {
                status: wait::describe(&status),
            });
        }
        if !key_is_usable(&self.key_path)? {
            return Err(SupervisorError::KeyNotProduced {
                path: self.key_path.clone(),
            });
        }
        info!(
            target: PROCESS_TARGET,
            path = %self.key_path,
            elapsed_ms = helper.elapsed().as_millis(),
            "host key generated"
        );
        Ok(())
    }
}

/// A running key-generation helper. Dropping an unreaped helper kills it.
struct KeygenHelper {
    pid: Pid,
    launched_at: Instant,
    reaped: bool,
}

impl KeygenHelper {
    fn launch(plan: &ExecPlan, stdio: &ChildStdio) -> Result<Self, SupervisorError> {
        let pid = exec::spawn(plan, stdio)?;
        debug!(target: PROCESS_TARGET, pid = pid.as_raw(), "key-generation helper launched");
        Ok(Self {
            pid,
            launched_at: Instant::now(),
            reaped: false,
        })
    }

    fn wait(&mut self, timeout: Duration, interval: Duration) -> Result<WaitStatus, SupervisorError> {
        match wait::wait_bounded(self.pid, timeout, interval) {
            Ok(Some(status)) => {
                self.reaped = true;
                Ok(status)
            }
            Ok(None) => {
                warn!(
                    target: PROCESS_TARGET,
                    pid = self.pid.as_raw(),
                    timeout_ms = timeout.as_millis(),
                    "key-generation helper timed out; killing"
                );
                wait::kill_and_reap(self.pid);
                self.reaped = true;
                Err(SupervisorError::KeygenTimeout {
                    timeout_ms: timeout.as_millis(),
                })
            }
            Err(error) => Err(error),
        }
    }

    fn elapsed(&self) -> Duration {
        self.launched_at.elapsed()
    }
}

impl Drop for KeygenHelper {
    fn drop(&mut self) {
        if !self.reaped {
            wait::kill_and_reap(self.pid);
        }
    }
}

fn key_is_usable(path: &Utf8Path) -> Result<bool, SupervisorError> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.is_file() && metadata.len() > 0),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(SupervisorError::KeyInspect {
            path: path.to_owned(),
            source,
        }),
    }
}

fn remove_key(path: &Utf8Path) -> Result<(), SupervisorError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SupervisorError::KeyCleanup {
            path: path.to_owned(),
            source,
        }),
    }
}
