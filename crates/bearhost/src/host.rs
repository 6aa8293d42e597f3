//! The host run loop.
//!
//! Each frame checks for a termination request, refreshes the address list
//! on its own cadence, forwards daemon output into the log history, and
//! redraws the status screen when its contents changed. Only `stop()` on the
//! way out blocks, and only for the configured shutdown timeout.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use bearhost_config::Config;
use bearhost_supervisor::DaemonSupervisor;
use camino::Utf8PathBuf;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::history::LogHistory;
use crate::network::{AddressSource, InterfaceAddress};
use crate::render::{StatusView, render_status};
use crate::users::{SystemUser, load_system_users};

pub(crate) const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Registers a flag raised by `SIGINT`, `SIGTERM`, or `SIGHUP`.
pub fn install_shutdown_flag() -> Result<Arc<AtomicBool>, AppError> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM, SIGHUP] {
        signal_hook::flag::register(signal, Arc::clone(&flag))
            .map_err(|source| AppError::Signals { source })?;
    }
    Ok(flag)
}

/// Addresses and accounts shown alongside the daemon log.
pub struct StatusBoard<A> {
    source: A,
    passwd_path: Utf8PathBuf,
    addresses: Vec<InterfaceAddress>,
    users: Option<Vec<SystemUser>>,
    reported_missing_addresses: bool,
}

impl<A: AddressSource> StatusBoard<A> {
    /// Creates an empty board; nothing is read until the first refresh.
    pub fn new(source: A, passwd_path: Utf8PathBuf) -> Self {
        Self {
            source,
            passwd_path,
            addresses: Vec::new(),
            users: None,
            reported_missing_addresses: false,
        }
    }

    /// Addresses from the latest refresh.
    pub fn addresses(&self) -> &[InterfaceAddress] {
        &self.addresses
    }

    /// Accounts read on the first refresh.
    pub fn users(&self) -> &[SystemUser] {
        self.users.as_deref().unwrap_or_default()
    }

    /// Re-reads the address list, and the account list on first call.
    pub fn refresh(&mut self, history: &mut LogHistory) {
        let first_empty = self.addresses.is_empty() && !self.reported_missing_addresses;
        match self.source.ipv4_addresses() {
            Ok(addresses) => {
                if addresses.is_empty() && first_empty {
                    history.push("No IPv4 addresses found");
                    self.reported_missing_addresses = true;
                }
                self.addresses = addresses;
            }
            Err(errno) => {
                warn!(target: HOST_TARGET, error = %errno, "failed to enumerate interfaces");
                if first_empty {
                    history.push(format!("getifaddrs failed: {}", errno.desc()));
                    self.reported_missing_addresses = true;
                }
                self.addresses.clear();
            }
        }

        if self.users.is_none() {
            let users = match load_system_users(&self.passwd_path) {
                Ok(users) => users,
                Err(error) => {
                    warn!(target: HOST_TARGET, path = %self.passwd_path, %error, "failed to read account database");
                    Vec::new()
                }
            };
            if !users.is_empty() {
                history.push(format!("System users found: {}", users.len()));
            }
            self.users = Some(users);
        }
    }
}

/// Owns the supervisor and the status screen for one run.
pub struct Host<A> {
    supervisor: DaemonSupervisor<LogHistory>,
    board: StatusBoard<A>,
    frame_interval: Duration,
    address_refresh: Duration,
    next_refresh: Instant,
    last_frame: Option<String>,
    clear_screen: bool,
}

impl<A: AddressSource> Host<A> {
    /// Builds a host whose supervisor logs into a bounded history.
    pub fn new(config: &Config, source: A, passwd_path: Utf8PathBuf) -> Self {
        Self {
            supervisor: DaemonSupervisor::new(
                config.supervisor_settings(),
                LogHistory::new(config.log_history_lines()),
            ),
            board: StatusBoard::new(source, passwd_path),
            frame_interval: config.frame_interval(),
            address_refresh: config.address_refresh(),
            next_refresh: Instant::now(),
            last_frame: None,
            clear_screen: false,
        }
    }

    /// Prefixes each frame with an ANSI clear when writing to a terminal.
    #[must_use]
    pub fn with_clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }

    /// Retained daemon output and host messages.
    pub fn history(&self) -> &LogHistory {
        self.supervisor.sink()
    }

    /// The daemon supervisor.
    pub fn supervisor(&self) -> &DaemonSupervisor<LogHistory> {
        &self.supervisor
    }

    /// Starts the daemon, recording any failure in the log history.
    pub fn start_daemon(&mut self) {
        if let Err(error) = self.supervisor.start() {
            warn!(target: HOST_TARGET, %error, "continuing without a running daemon");
            self.supervisor
                .sink_mut()
                .push(format!("Failed to start dropbear: {error}"));
        }
    }

    /// Runs one frame; returns whether a new frame was written.
    pub fn tick(&mut self, out: &mut dyn Write) -> Result<bool, AppError> {
        let now = Instant::now();
        if now >= self.next_refresh {
            self.board.refresh(self.supervisor.sink_mut());
            self.next_refresh = now + self.address_refresh;
        }
        self.supervisor.pump_logs();

        let frame = render_status(&StatusView {
            addresses: self.board.addresses(),
            users: self.board.users(),
            history: self.supervisor.sink(),
        });
        if self.last_frame.as_deref() == Some(frame.as_str()) {
            return Ok(false);
        }

        if self.clear_screen {
            out.write_all(CLEAR_SCREEN.as_bytes())
                .map_err(|source| AppError::Output { source })?;
        }
        out.write_all(frame.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|source| AppError::Output { source })?;
        self.last_frame = Some(frame);
        Ok(true)
    }

    /// Starts the daemon and renders frames until `shutdown` is raised,
    /// then stops the daemon.
    pub fn run(&mut self, shutdown: &AtomicBool, out: &mut dyn Write) -> Result<(), AppError> {
        self.start_daemon();
        while !shutdown.load(Ordering::Relaxed) {
            self.tick(out)?;
            thread::sleep(self.frame_interval);
        }
        info!(target: HOST_TARGET, "shutdown requested");
        self.supervisor.stop();
        Ok(())
    }
}
