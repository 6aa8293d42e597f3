//! Non-blocking capture of daemon output.
//!
//! The daemon writes to the pipe in arbitrary chunks. `LineFramer` turns
//! those chunks into whole lines and `LogPump` drains the pipe without ever
//! blocking the caller's frame loop.

use std::io::{ErrorKind, PipeReader, Read};
use std::os::fd::{AsRawFd, RawFd};

use tracing::{debug, warn};

use crate::process::exec::set_nonblocking;
use crate::process::{PROCESS_TARGET, SupervisorError};
use crate::sink::LogSink;

const READ_CHUNK: usize = 4096;
const MAX_READS_PER_PUMP: usize = 16;

/// Splits a byte stream into lines, buffering any unterminated tail.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    /// Creates an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and emits every completed line.
    ///
    /// Returns the number of lines emitted.
    pub fn push(&mut self, bytes: &[u8], sink: &mut dyn LogSink) -> usize {
        self.pending.extend_from_slice(bytes);
        let mut start = 0;
        let mut emitted = 0;
        while let Some(offset) = self.pending[start..].iter().position(|byte| *byte == b'\n') {
            emit(&self.pending[start..start + offset], sink);
            start += offset + 1;
            emitted += 1;
        }
        self.pending.drain(..start);
        emitted
    }

    /// Emits the buffered tail, if any, as a final line.
    pub fn flush(&mut self, sink: &mut dyn LogSink) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        emit(&self.pending, sink);
        self.pending.clear();
        true
    }

    /// Bytes received since the last line terminator.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

fn emit(line: &[u8], sink: &mut dyn LogSink) {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    sink.line(&String::from_utf8_lossy(line));
}

/// Whether the pipe's write side is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// More output may arrive.
    Open,
    /// End of file was observed.
    Closed,
}

/// Owns the read end of the daemon's output pipe.
#[derive(Debug)]
pub(crate) struct LogPump {
    reader: PipeReader,
    framer: LineFramer,
    status: PumpStatus,
}

impl LogPump {
    /// Wraps `reader`, switching it to non-blocking mode.
    pub(crate) fn new(reader: PipeReader) -> Result<Self, SupervisorError> {
        set_nonblocking(&reader)?;
        Ok(Self {
            reader,
            framer: LineFramer::new(),
            status: PumpStatus::Open,
        })
    }

    /// Raw descriptor of the read end, closed by the forked child.
    pub(crate) fn reader_fd(&self) -> RawFd {
        self.reader.as_raw_fd()
    }

    /// Reads whatever is available right now and forwards complete lines.
    ///
    /// Reads are capped per call so a chatty daemon cannot starve the
    /// caller.
    pub(crate) fn pump(&mut self, sink: &mut dyn LogSink) -> PumpStatus {
        self.read_available(sink);
        self.status
    }

    /// Drains any remaining output, flushes the unterminated tail, and
    /// closes the pipe.
    pub(crate) fn finish(mut self, sink: &mut dyn LogSink) {
        while self.status == PumpStatus::Open && self.read_available(sink) > 0 {}
        self.framer.flush(sink);
    }

    fn read_available(&mut self, sink: &mut dyn LogSink) -> usize {
        if self.status == PumpStatus::Closed {
            return 0;
        }
        let mut buffer = [0_u8; READ_CHUNK];
        let mut reads = 0;
        while reads < MAX_READS_PER_PUMP {
            match self.reader.read(&mut buffer) {
                Ok(0) => {
                    debug!(target: PROCESS_TARGET, "daemon output pipe closed");
                    self.status = PumpStatus::Closed;
                    break;
                }
                Ok(read) => {
                    self.framer.push(&buffer[..read], sink);
                    reads += 1;
                }
                Err(error) if error.kind() == ErrorKind::WouldBlock => break,
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => {
                    warn!(target: PROCESS_TARGET, %error, "failed to read daemon output");
                    self.status = PumpStatus::Closed;
                    break;
                }
            }
        }
        reads
    }
}
