//! Fork/exec plumbing.
//!
//! Everything the child needs is prepared in the parent before `fork(2)`.
//! Between `fork` and `execv` the child only rewires file descriptors, so a
//! multi-threaded parent cannot deadlock the child on a lock it never owns.

use std::ffi::{CString, c_char};
use std::fs::{self, File, OpenOptions};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::PermissionsExt;
use std::ptr;

use camino::Utf8Path;
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::unistd::{ForkResult, Pid, close, dup2, fork};
use tracing::debug;

use super::{EXEC_FAILURE_STATUS, PROCESS_TARGET, SupervisorError, Tool};

const NULL_DEVICE: &str = "/dev/null";

/// A program plus its argument vector, converted for `execv` ahead of time.
pub(crate) struct ExecPlan {
    tool: Tool,
    program: CString,
    argv: Vec<CString>,
    argv_ptrs: Vec<*const c_char>,
    display: String,
}

impl ExecPlan {
    /// Builds a plan whose `argv[0]` is the program path itself.
    pub(crate) fn new(tool: Tool, program: &Utf8Path, args: &[&str]) -> Result<Self, SupervisorError> {
        let program_c = to_cstring(program.as_str())?;
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(program_c.clone());
        for arg in args {
            argv.push(to_cstring(arg)?);
        }
        let mut argv_ptrs: Vec<*const c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
        argv_ptrs.push(ptr::null());

        let mut display = program.as_str().to_owned();
        for arg in args {
            display.push(' ');
            display.push_str(arg);
        }

        Ok(Self {
            tool,
            program: program_c,
            argv,
            argv_ptrs,
            display,
        })
    }

    pub(crate) fn tool(&self) -> Tool {
        self.tool
    }

    /// Command line rendered for logs.
    pub(crate) fn display(&self) -> &str {
        &self.display
    }

    pub(crate) fn arg_count(&self) -> usize {
        self.argv.len()
    }
}

fn to_cstring(value: &str) -> Result<CString, SupervisorError> {
    CString::new(value).map_err(|_| SupervisorError::InvalidArgument {
        value: value.to_owned(),
    })
}

/// File descriptors the child should inherit as its standard streams.
pub(crate) struct ChildStdio {
    pub(crate) stdin: RawFd,
    pub(crate) stdout: RawFd,
    pub(crate) stderr: RawFd,
    /// Parent-only descriptor the child closes before exec.
    pub(crate) close_in_child: Option<RawFd>,
}

/// Forks and executes `plan`, returning the child's PID to the parent.
pub(crate) fn spawn(plan: &ExecPlan, stdio: &ChildStdio) -> Result<Pid, SupervisorError> {
    debug!(
        target: PROCESS_TARGET,
        command = plan.display(),
        args = plan.arg_count(),
        "forking child process"
    );
    // SAFETY: the child branch only calls async-signal-safe functions
    // (`close`, `dup2`, `execv`, `_exit`) on data prepared before the fork.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => Ok(child),
        Ok(ForkResult::Child) => exec_child(plan, stdio),
        Err(source) => Err(SupervisorError::Fork {
            tool: plan.tool(),
            source,
        }),
    }
}

fn exec_child(plan: &ExecPlan, stdio: &ChildStdio) -> ! {
    if let Some(fd) = stdio.close_in_child {
        let _ = close(fd);
    }
    let wired = dup2(stdio.stdin, libc::STDIN_FILENO)
        .and_then(|_| dup2(stdio.stdout, libc::STDOUT_FILENO))
        .and_then(|_| dup2(stdio.stderr, libc::STDERR_FILENO));
    if wired.is_ok() {
        // SAFETY: `program` and `argv_ptrs` are NUL-terminated and outlive
        // this call; `execv` only returns on failure.
        unsafe {
            libc::execv(plan.program.as_ptr(), plan.argv_ptrs.as_ptr());
        }
    }
    // SAFETY: `_exit` skips atexit handlers and stdio flushing inherited from
    // the parent.
    unsafe { libc::_exit(EXEC_FAILURE_STATUS) }
}

/// Opens `/dev/null` for reading and writing.
pub(crate) fn open_null_device() -> Result<File, SupervisorError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(NULL_DEVICE)
        .map_err(|source| SupervisorError::NullDevice { source })
}

/// Switches `fd` to non-blocking mode, preserving its other status flags.
pub(crate) fn set_nonblocking(fd: &impl AsRawFd) -> Result<(), SupervisorError> {
    let raw = fd.as_raw_fd();
    let current = fcntl(raw, FcntlArg::F_GETFL).map_err(|source| SupervisorError::NonBlocking { source })?;
    let flags = OFlag::from_bits_truncate(current) | OFlag::O_NONBLOCK;
    fcntl(raw, FcntlArg::F_SETFL(flags)).map_err(|source| SupervisorError::NonBlocking { source })?;
    Ok(())
}

/// Confirms `path` names a regular file with at least one execute bit set.
pub(crate) fn ensure_executable(tool: Tool, path: &Utf8Path) -> Result<(), SupervisorError> {
    let executable = fs::metadata(path)
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false);
    if executable {
        Ok(())
    } else {
        Err(SupervisorError::ToolingMissing {
            tool,
            path: path.to_owned(),
        })
    }
}
