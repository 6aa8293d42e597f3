//! Host application for a supervised Dropbear SSH daemon.
//!
//! The host loads layered configuration, installs structured telemetry, and
//! hands the daemon to [`bearhost_supervisor::DaemonSupervisor`]. A frame loop
//! then shows where to connect (IPv4 addresses and login accounts) next to
//! the daemon's recent output until `SIGINT`, `SIGTERM`, or `SIGHUP` asks it
//! to stop, at which point the daemon is shut down before the process exits.
#![deny(missing_docs)]

mod errors;
mod history;
mod host;
mod network;
mod render;
mod telemetry;
mod users;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use bearhost_config::Config;
use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;

pub use errors::AppError;
pub use history::LogHistory;
pub use host::{Host, StatusBoard, install_shutdown_flag};
pub use network::{AddressSource, InterfaceAddress, SystemAddressSource};
pub use render::{StatusView, render_status};
pub use telemetry::{TelemetryError, initialise as initialise_telemetry};
pub use users::{PASSWD_PATH, SystemUser, load_system_users, parse_passwd};

/// Runs the host with the given arguments until a termination signal.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E, stdout_is_terminal: bool) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    match run_host(args, stdout, stdout_is_terminal) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "bearhost: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run_host<I, W>(args: I, stdout: &mut W, stdout_is_terminal: bool) -> Result<(), AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
{
    let config = Config::load_from_iter(args).map_err(|source| AppError::Config { source })?;
    telemetry::initialise(&config)?;
    let shutdown = install_shutdown_flag()?;
    let mut host = Host::new(&config, SystemAddressSource, Utf8PathBuf::from(PASSWD_PATH))
        .with_clear_screen(stdout_is_terminal);
    host.run(&shutdown, stdout)
}
