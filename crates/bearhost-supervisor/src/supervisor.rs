//! Lifecycle control for the supervised SSH daemon.
//!
//! `DaemonSupervisor` owns at most one daemon process at a time. Starting it
//! provisions the host key, forks the daemon with its stdout and stderr wired
//! into a pipe, and hands the pipe to a [`LogPump`]. Stopping it escalates
//! from `SIGTERM` to `SIGKILL` after a bounded grace period and always reaps
//! the child before forgetting it.

use std::io;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::time::Instant;

use bearhost_config::SupervisorSettings;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::process::exec::{self, ChildStdio, ExecPlan};
use crate::process::wait;
use crate::process::{PROCESS_TARGET, SupervisorError, Tool};
use crate::provision::{KeyProvisioner, KeyStatus};
use crate::pump::LogPump;
use crate::reporter::{LifecycleReporter, StructuredLifecycleReporter};
use crate::sink::LogSink;

/// Coarse lifecycle state of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No daemon is tracked.
    Stopped,
    /// The host key is being checked or generated.
    Provisioning,
    /// A daemon has been forked and is tracked.
    Running,
    /// The tracked daemon is being shut down.
    Stopping,
}

impl SupervisorState {
    /// Returns the lowercase label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Provisioning => "provisioning",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

struct DaemonHandle {
    pid: Pid,
    pump: LogPump,
    alive: bool,
    started_at: Instant,
}

/// Supervises a single SSH daemon and forwards its output to a sink.
pub struct DaemonSupervisor<S: LogSink> {
    settings: SupervisorSettings,
    provisioner: KeyProvisioner,
    sink: S,
    reporter: Arc<dyn LifecycleReporter>,
    state: SupervisorState,
    daemon: Option<DaemonHandle>,
}

impl<S: LogSink> DaemonSupervisor<S> {
    /// Creates a stopped supervisor that reports through tracing.
    #[must_use]
    pub fn new(settings: SupervisorSettings, sink: S) -> Self {
        Self::with_reporter(settings, sink, Arc::new(StructuredLifecycleReporter::new()))
    }

    /// Creates a stopped supervisor with a custom lifecycle reporter.
    #[must_use]
    pub fn with_reporter(
        settings: SupervisorSettings,
        sink: S,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Self {
        let provisioner = KeyProvisioner::new(&settings);
        Self {
            settings,
            provisioner,
            sink,
            reporter,
            state: SupervisorState::Stopped,
            daemon: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// PID of the tracked daemon, if any.
    #[must_use]
    pub fn pid(&self) -> Option<Pid> {
        self.daemon.as_ref().map(|handle| handle.pid)
    }

    /// Whether the tracked daemon has not yet been observed to exit.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.daemon.as_ref().is_some_and(|handle| handle.alive)
    }

    /// Settings the supervisor was built with.
    #[must_use]
    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// The sink receiving daemon output.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Provisions the host key if needed, then forks the daemon.
    ///
    /// Returns once the fork completes. Readiness is only observable through
    /// the daemon's own output.
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        if let Some(handle) = &self.daemon {
            warn!(target: PROCESS_TARGET, pid = handle.pid.as_raw(), "ssh daemon already running");
            return Err(SupervisorError::AlreadyRunning { pid: handle.pid });
        }

        self.transition(SupervisorState::Provisioning);
        match self.provision_and_spawn() {
            Ok(handle) => {
                self.reporter.daemon_spawned(handle.pid);
                self.daemon = Some(handle);
                self.transition(SupervisorState::Running);
                Ok(())
            }
            Err(error) => {
                self.reporter.start_failed(&error);
                self.transition(SupervisorState::Stopped);
                Err(error)
            }
        }
    }

    /// Forwards any daemon output available right now. Never blocks.
    ///
    /// Each call also probes the daemon with a non-blocking reap, so an exit
    /// is noticed even while a descendant keeps the output pipe open.
    pub fn pump_logs(&mut self) {
        let Self {
            daemon,
            sink,
            reporter,
            ..
        } = self;
        let Some(handle) = daemon.as_mut() else {
            return;
        };

        handle.pump.pump(sink);
        if handle.alive {
            reap_exited(handle, sink, &**reporter);
        }
    }

    /// Stops the daemon, escalating to `SIGKILL` after the shutdown timeout.
    ///
    /// Idempotent: without a tracked daemon this does nothing. A daemon that
    /// already exited is reaped and reported to the sink without signalling.
    pub fn stop(&mut self) {
        let Some(mut handle) = self.daemon.take() else {
            return;
        };
        self.transition(SupervisorState::Stopping);

        if handle.alive {
            reap_exited(&mut handle, &mut self.sink, &*self.reporter);
        }
        if handle.alive {
            self.terminate(&mut handle);
        }
        debug!(
            target: PROCESS_TARGET,
            pid = handle.pid.as_raw(),
            uptime_ms = handle.started_at.elapsed().as_millis(),
            "draining daemon output"
        );
        handle.pump.finish(&mut self.sink);
        self.transition(SupervisorState::Stopped);
    }

    fn provision_and_spawn(&mut self) -> Result<DaemonHandle, SupervisorError> {
        exec::ensure_executable(Tool::Daemon, &self.settings.daemon_binary)?;
        let status = self.provisioner.ensure_host_key()?;
        self.reporter.host_key_ready(self.provisioner.key_path(), status);
        if status == KeyStatus::Generated {
            self.sink
                .line(&format!("Generated host key at {}", self.provisioner.key_path()));
        }
        self.spawn_daemon()
    }

    fn spawn_daemon(&self) -> Result<DaemonHandle, SupervisorError> {
        let port = self.settings.listen_port.to_string();
        let plan = ExecPlan::new(
            Tool::Daemon,
            &self.settings.daemon_binary,
            &[
                "-F",
                "-E",
                "-r",
                self.settings.host_key_path.as_str(),
                "-p",
                &port,
            ],
        )?;

        let (reader, writer) = io::pipe().map_err(|source| SupervisorError::Pipe { source })?;
        let pump = LogPump::new(reader)?;
        let null = exec::open_null_device()?;
        let stdio = ChildStdio {
            stdin: null.as_raw_fd(),
            stdout: writer.as_raw_fd(),
            stderr: writer.as_raw_fd(),
            close_in_child: Some(pump.reader_fd()),
        };
        let pid = exec::spawn(&plan, &stdio)?;
        drop(writer);

        info!(
            target: PROCESS_TARGET,
            pid = pid.as_raw(),
            command = plan.display(),
            "ssh daemon started"
        );
        Ok(DaemonHandle {
            pid,
            pump,
            alive: true,
            started_at: Instant::now(),
        })
    }

    fn terminate(&mut self, handle: &mut DaemonHandle) {
        let pid = handle.pid;
        match signal::kill(pid, Signal::SIGTERM) {
            Ok(()) => debug!(target: PROCESS_TARGET, pid = pid.as_raw(), "sent SIGTERM"),
            Err(Errno::ESRCH) => {}
            Err(error) => warn!(target: PROCESS_TARGET, pid = pid.as_raw(), %error, "failed to send SIGTERM"),
        }

        let graceful = match wait::wait_bounded(
            pid,
            self.settings.shutdown_timeout,
            self.settings.poll_interval,
        ) {
            Ok(status) => status,
            Err(error) => {
                warn!(target: PROCESS_TARGET, %error, "graceful wait failed");
                None
            }
        };

        let status = match graceful {
            Some(status) => Some(status),
            None => {
                self.reporter.daemon_killed(pid);
                wait::kill_and_reap(pid)
            }
        };
        handle.alive = false;
        if let Some(status) = status {
            self.reporter.daemon_exited(pid, &wait::describe(&status));
        }
    }

    fn transition(&mut self, next: SupervisorState) {
        let previous = self.state;
        if previous == next {
            return;
        }
        self.state = next;
        self.reporter.state_changed(previous, next);
    }
}

fn reap_exited(handle: &mut DaemonHandle, sink: &mut dyn LogSink, reporter: &dyn LifecycleReporter) {
    match wait::try_reap(handle.pid) {
        Ok(Some(status)) => {
            handle.alive = false;
            handle.pump.pump(sink);
            let description = wait::describe(&status);
            sink.line(&format!("dropbear {description}"));
            reporter.daemon_exited(handle.pid, &description);
        }
        Ok(None) => {}
        Err(error) => {
            warn!(target: PROCESS_TARGET, %error, "failed to reap ssh daemon");
            handle.alive = false;
        }
    }
}

impl<S: LogSink> Drop for DaemonSupervisor<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
