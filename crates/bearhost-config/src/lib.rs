//! Shared configuration for the bearhost supervisor and its host binary.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, then a TOML
//! file (`--config-path` or `BEARHOST_CONFIG_PATH`), then `BEARHOST_*`
//! environment variables, then command-line flags. The supervisor itself only
//! consumes the resolved [`SupervisorSettings`], so tests can build settings
//! directly without touching the loader.

mod defaults;
mod keys;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_ADDRESS_REFRESH_MS, DEFAULT_DAEMON_BINARY, DEFAULT_FRAME_INTERVAL_MS,
    DEFAULT_HOST_KEY_PATH, DEFAULT_KEY_TYPE, DEFAULT_KEYGEN_BINARY, DEFAULT_KEYGEN_TIMEOUT_MS,
    DEFAULT_LISTEN_PORT, DEFAULT_LOG_FILTER, DEFAULT_LOG_HISTORY_LINES,
    DEFAULT_SHUTDOWN_TIMEOUT_MS, DEFAULT_WAIT_POLL_INTERVAL_MS, default_daemon_binary,
    default_host_key_path, default_key_type, default_keygen_binary, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use keys::{KeyPaths, KeyPathsError};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration shared by the host binary and the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "BEARHOST")]
pub struct Config {
    /// Path to the dropbear daemon binary.
    #[serde(default = "default_daemon_binary")]
    #[ortho_config(default = default_daemon_binary())]
    pub daemon_binary: Utf8PathBuf,
    /// Path to the key-generation helper.
    #[serde(default = "default_keygen_binary")]
    #[ortho_config(default = default_keygen_binary())]
    pub keygen_binary: Utf8PathBuf,
    /// Location of the persistent host key.
    #[serde(default = "default_host_key_path")]
    #[ortho_config(default = default_host_key_path())]
    pub host_key_path: Utf8PathBuf,
    /// Key type passed to the helper with `-t`.
    #[serde(default = "default_key_type")]
    #[ortho_config(default = default_key_type())]
    pub key_type: String,
    /// Port passed to the daemon with `-p`.
    #[serde(default = "default_listen_port")]
    #[ortho_config(default = DEFAULT_LISTEN_PORT)]
    pub listen_port: u16,
    /// Ceiling, in milliseconds, for the helper to produce the key.
    #[serde(default = "default_keygen_timeout_ms")]
    #[ortho_config(default = DEFAULT_KEYGEN_TIMEOUT_MS)]
    pub keygen_timeout_ms: u64,
    /// Grace period, in milliseconds, between `SIGTERM` and `SIGKILL`.
    #[serde(default = "default_shutdown_timeout_ms")]
    #[ortho_config(default = DEFAULT_SHUTDOWN_TIMEOUT_MS)]
    pub shutdown_timeout_ms: u64,
    /// Interval, in milliseconds, between child status probes.
    #[serde(default = "default_wait_poll_interval_ms")]
    #[ortho_config(default = DEFAULT_WAIT_POLL_INTERVAL_MS)]
    pub wait_poll_interval_ms: u64,
    /// Delay, in milliseconds, between host loop iterations.
    #[serde(default = "default_frame_interval_ms")]
    #[ortho_config(default = DEFAULT_FRAME_INTERVAL_MS)]
    pub frame_interval_ms: u64,
    /// Interval, in milliseconds, between network address refreshes.
    #[serde(default = "default_address_refresh_ms")]
    #[ortho_config(default = DEFAULT_ADDRESS_REFRESH_MS)]
    pub address_refresh_ms: u64,
    /// Number of daemon log lines retained by the host.
    #[serde(default = "default_log_history_lines")]
    #[ortho_config(default = DEFAULT_LOG_HISTORY_LINES)]
    pub log_history_lines: usize,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

const fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

const fn default_keygen_timeout_ms() -> u64 {
    DEFAULT_KEYGEN_TIMEOUT_MS
}

const fn default_shutdown_timeout_ms() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}

const fn default_wait_poll_interval_ms() -> u64 {
    DEFAULT_WAIT_POLL_INTERVAL_MS
}

const fn default_frame_interval_ms() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}

const fn default_address_refresh_ms() -> u64 {
    DEFAULT_ADDRESS_REFRESH_MS
}

const fn default_log_history_lines() -> usize {
    DEFAULT_LOG_HISTORY_LINES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_binary: default_daemon_binary(),
            keygen_binary: default_keygen_binary(),
            host_key_path: default_host_key_path(),
            key_type: default_key_type(),
            listen_port: DEFAULT_LISTEN_PORT,
            keygen_timeout_ms: DEFAULT_KEYGEN_TIMEOUT_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            wait_poll_interval_ms: DEFAULT_WAIT_POLL_INTERVAL_MS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            address_refresh_ms: DEFAULT_ADDRESS_REFRESH_MS,
            log_history_lines: DEFAULT_LOG_HISTORY_LINES,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Path to the dropbear daemon binary.
    #[must_use]
    pub fn daemon_binary(&self) -> &Utf8Path {
        self.daemon_binary.as_path()
    }

    /// Path to the key-generation helper.
    #[must_use]
    pub fn keygen_binary(&self) -> &Utf8Path {
        self.keygen_binary.as_path()
    }

    /// Location of the persistent host key.
    #[must_use]
    pub fn host_key_path(&self) -> &Utf8Path {
        self.host_key_path.as_path()
    }

    /// Delay between host loop iterations.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Interval between network address refreshes.
    #[must_use]
    pub fn address_refresh(&self) -> Duration {
        Duration::from_millis(self.address_refresh_ms)
    }

    /// Number of daemon log lines the host retains.
    #[must_use]
    pub fn log_history_lines(&self) -> usize {
        self.log_history_lines
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for structured logs.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Resolves the subset of settings consumed by the daemon supervisor.
    #[must_use]
    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            daemon_binary: self.daemon_binary.clone(),
            keygen_binary: self.keygen_binary.clone(),
            host_key_path: self.host_key_path.clone(),
            key_type: self.key_type.clone(),
            listen_port: self.listen_port,
            keygen_timeout: Duration::from_millis(self.keygen_timeout_ms),
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
            poll_interval: Duration::from_millis(self.wait_poll_interval_ms),
        }
    }
}

/// Settings consumed by the key provisioner and the process supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Path to the dropbear daemon binary.
    pub daemon_binary: Utf8PathBuf,
    /// Path to the key-generation helper.
    pub keygen_binary: Utf8PathBuf,
    /// Location of the persistent host key.
    pub host_key_path: Utf8PathBuf,
    /// Key type passed to the helper.
    pub key_type: String,
    /// Port passed to the daemon.
    pub listen_port: u16,
    /// Ceiling for the helper to finish.
    pub keygen_timeout: Duration,
    /// Grace period between `SIGTERM` and `SIGKILL`.
    pub shutdown_timeout: Duration,
    /// Interval between child status probes.
    pub poll_interval: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Config::default().supervisor_settings()
    }
}
