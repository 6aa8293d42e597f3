//! Shared fixtures for supervision tests: fake tooling scripts, a recording
//! sink, and a recording lifecycle reporter.

mod reporter;
mod tooling;

pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
pub use tooling::{DaemonScript, FakeTooling, KeygenScript};

use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;

use crate::sink::LogSink;

/// Serialises tests that fork so a script being written by one test is never
/// inherited as a writable descriptor by another test's child.
static FORK_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Acquires the fork lock, ignoring poisoning from earlier failed tests.
pub fn fork_guard() -> MutexGuard<'static, ()> {
    FORK_LOCK.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Sink that keeps every line for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .expect("sink mutex poisoned")
            .clone()
    }
}

impl LogSink for RecordingSink {
    fn line(&mut self, line: &str) {
        self.lines
            .lock()
            .expect("sink mutex poisoned")
            .push(line.to_owned());
    }
}
