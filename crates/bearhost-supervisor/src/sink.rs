//! Destination for daemon output lines.

/// Receives complete, terminator-free lines of daemon output.
///
/// Any `FnMut(&str)` closure is a sink.
pub trait LogSink {
    /// Delivers one line.
    fn line(&mut self, line: &str);
}

impl<F> LogSink for F
where
    F: FnMut(&str),
{
    fn line(&mut self, line: &str) {
        self(line);
    }
}
