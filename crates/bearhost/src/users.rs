//! Login accounts listed on the status screen.

use std::fmt;
use std::fs;
use std::io;

use camino::Utf8Path;

/// Location of the system account database.
pub const PASSWD_PATH: &str = "/etc/passwd";

/// UID reserved for `nobody`; it and anything above are hidden.
const NOBODY_UID: i64 = 65_534;

/// An account that can log in over SSH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemUser {
    /// Login name.
    pub name: String,
    /// Numeric user id.
    pub uid: u32,
}

impl fmt::Display for SystemUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (UID: {})", self.name, self.uid)
    }
}

/// Parses `passwd(5)` content, keeping entries with `0 <= uid < 65534`.
///
/// Blank lines, comments, and entries with a malformed UID are skipped.
#[must_use]
pub fn parse_passwd(contents: &str) -> Vec<SystemUser> {
    contents
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_entry)
        .collect()
}

fn parse_entry(line: &str) -> Option<SystemUser> {
    let mut fields = line.split(':');
    let name = fields.next()?;
    let _password = fields.next()?;
    let uid: i64 = fields.next()?.trim().parse().ok()?;
    if !(0..NOBODY_UID).contains(&uid) {
        return None;
    }
    Some(SystemUser {
        name: name.to_owned(),
        uid: u32::try_from(uid).ok()?,
    })
}

/// Reads and parses the account database at `path`.
pub fn load_system_users(path: &Utf8Path) -> io::Result<Vec<SystemUser>> {
    fs::read_to_string(path).map(|contents| parse_passwd(&contents))
}
