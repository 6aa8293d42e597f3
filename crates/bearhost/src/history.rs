//! Bounded log history shown on the status screen.

use std::collections::VecDeque;

use bearhost_supervisor::LogSink;
use tracing::debug;

const DAEMON_OUTPUT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::daemon");

/// Keeps the most recent lines, evicting the oldest once full.
#[derive(Debug, Clone)]
pub struct LogHistory {
    lines: VecDeque<String>,
    capacity: usize,
    revision: u64,
}

impl LogHistory {
    /// Creates a history holding at most `capacity` lines (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            revision: 0,
        }
    }

    /// Appends a line, dropping the oldest when at capacity.
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
        self.revision += 1;
    }

    /// The last `count` lines, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &str> {
        let skip = self.lines.len().saturating_sub(count);
        self.lines.iter().skip(skip).map(String::as_str)
    }

    /// Number of retained lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing has been retained yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Increments on every push; used to detect changes between frames.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl LogSink for LogHistory {
    fn line(&mut self, line: &str) {
        debug!(target: DAEMON_OUTPUT_TARGET, line, "daemon output");
        self.push(line);
    }
}
