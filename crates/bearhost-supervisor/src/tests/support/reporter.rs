//! Test double for [`LifecycleReporter`] that records events for assertions.

use std::sync::Mutex;

use camino::Utf8Path;
use nix::unistd::Pid;

use crate::process::SupervisorError;
use crate::provision::KeyStatus;
use crate::reporter::LifecycleReporter;
use crate::supervisor::SupervisorState;

/// Lifecycle events captured during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    StateChanged {
        from: SupervisorState,
        to: SupervisorState,
    },
    HostKeyReady(KeyStatus),
    DaemonSpawned(Pid),
    DaemonExited {
        pid: Pid,
        status: String,
    },
    DaemonKilled(Pid),
    StartFailed(String),
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    /// Destination states in the order they were entered.
    pub fn visited_states(&self) -> Vec<SupervisorState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn state_changed(&self, from: SupervisorState, to: SupervisorState) {
        self.record(LifecycleEvent::StateChanged { from, to });
    }

    fn host_key_ready(&self, _path: &Utf8Path, status: KeyStatus) {
        self.record(LifecycleEvent::HostKeyReady(status));
    }

    fn daemon_spawned(&self, pid: Pid) {
        self.record(LifecycleEvent::DaemonSpawned(pid));
    }

    fn daemon_exited(&self, pid: Pid, status: &str) {
        self.record(LifecycleEvent::DaemonExited {
            pid,
            status: status.to_owned(),
        });
    }

    fn daemon_killed(&self, pid: Pid) {
        self.record(LifecycleEvent::DaemonKilled(pid));
    }

    fn start_failed(&self, error: &SupervisorError) {
        self.record(LifecycleEvent::StartFailed(error.to_string()));
    }
}
