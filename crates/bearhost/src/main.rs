//! Entrypoint for the Dropbear host application.
//!
//! The binary delegates to [`bearhost::run`], which loads configuration,
//! installs telemetry, and drives the supervision loop until a termination
//! signal arrives.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

fn main() -> ExitCode {
    let stdout_is_terminal = io::stdout().is_terminal();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    bearhost::run(
        std::env::args_os(),
        &mut stdout,
        &mut stderr,
        stdout_is_terminal,
    )
}
