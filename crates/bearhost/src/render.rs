//! Plain-text rendering of the status screen.

use std::fmt::Write as _;

use crate::history::LogHistory;
use crate::network::InterfaceAddress;
use crate::users::SystemUser;

/// First line of every frame.
pub const TITLE: &str = "Dropbear SSH Server";
/// Last line of every frame.
pub const FOOTER: &str = "Press Ctrl+C to exit";

/// Maximum number of log lines shown in one frame.
pub const VISIBLE_LOG_LINES: usize = 12;

/// Everything that appears on one frame.
#[derive(Debug, Clone, Copy)]
pub struct StatusView<'a> {
    /// Addresses to connect to, already sorted.
    pub addresses: &'a [InterfaceAddress],
    /// Login accounts.
    pub users: &'a [SystemUser],
    /// Recent log lines.
    pub history: &'a LogHistory,
}

/// Renders `view` as newline-terminated text.
#[must_use]
pub fn render_status(view: &StatusView<'_>) -> String {
    let mut frame = String::new();
    let _ = writeln!(frame, "{TITLE}");
    frame.push('\n');

    if view.addresses.is_empty() {
        frame.push_str("IP: (resolving...)\n");
    } else {
        for address in view.addresses {
            let _ = writeln!(frame, "IP: {address}");
        }
    }
    frame.push('\n');

    if !view.users.is_empty() {
        frame.push_str("System Users:\n");
        for user in view.users {
            let _ = writeln!(frame, "  {user}");
        }
        frame.push('\n');
    }

    frame.push_str("Logs:\n");
    for line in view.history.recent(VISIBLE_LOG_LINES) {
        let _ = writeln!(frame, "{line}");
    }
    frame.push('\n');
    let _ = writeln!(frame, "{FOOTER}");
    frame
}
