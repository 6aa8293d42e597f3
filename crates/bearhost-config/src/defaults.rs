use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default location of the dropbear daemon binary.
pub const DEFAULT_DAEMON_BINARY: &str = "/usr/sbin/dropbear";

/// Default location of the key-generation helper.
pub const DEFAULT_KEYGEN_BINARY: &str = "/usr/bin/dropbearkey";

/// Default location of the persistent host key.
pub const DEFAULT_HOST_KEY_PATH: &str = "/etc/dropbear/dropbear_rsa_host_key";

/// Key type requested from the helper.
pub const DEFAULT_KEY_TYPE: &str = "rsa";

/// Port the daemon listens on.
pub const DEFAULT_LISTEN_PORT: u16 = 22;

/// Ceiling for the key-generation helper to finish.
pub const DEFAULT_KEYGEN_TIMEOUT_MS: u64 = 10_000;

/// Ceiling for the daemon to exit after `SIGTERM` before it is killed.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 3_000;

/// Interval between `waitpid` probes inside the bounded waits.
pub const DEFAULT_WAIT_POLL_INTERVAL_MS: u64 = 50;

/// Delay between iterations of the host poll loop.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// How often the host re-enumerates network addresses.
pub const DEFAULT_ADDRESS_REFRESH_MS: u64 = 2_000;

/// Number of daemon log lines the host keeps.
pub const DEFAULT_LOG_HISTORY_LINES: usize = 200;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default daemon binary as an owned path.
pub fn default_daemon_binary() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_DAEMON_BINARY)
}

/// Default helper binary as an owned path.
pub fn default_keygen_binary() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_KEYGEN_BINARY)
}

/// Default host key path as an owned path.
pub fn default_host_key_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_HOST_KEY_PATH)
}

/// Owned key type used where allocation is required (e.g. serde).
pub fn default_key_type() -> String {
    DEFAULT_KEY_TYPE.to_string()
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binaries.
///
/// The host renders its status to stdout and logs to stderr, so the
/// human-readable format is the better default on a device console.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
