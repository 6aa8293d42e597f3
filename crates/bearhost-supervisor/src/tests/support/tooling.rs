//! Shell scripts standing in for the key-generation helper and the daemon.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use bearhost_config::SupervisorSettings;
use camino::Utf8PathBuf;
use tempfile::TempDir;

const KEYGEN_NAME: &str = "dropbearkey";
const DAEMON_NAME: &str = "dropbear";
const CALLS_FILE: &str = "keygen.calls";

/// Port passed to the fake daemon; scenarios expect it in daemon output.
const TEST_PORT: u16 = 2222;

const RECORD_CALL: &str = r#"echo run >> "$(dirname "$0")/keygen.calls"
key=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-f" ]; then shift; key="$1"; fi
  shift
done
"#;

/// Behaviour of the fake key-generation helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeygenScript {
    Succeeds,
    FailsAfterPartialWrite,
    ExitsWithoutKey,
    Hangs,
}

impl KeygenScript {
    fn body(self) -> &'static str {
        match self {
            Self::Succeeds => "printf 'fake host key\\n' > \"$key\"\n",
            Self::FailsAfterPartialWrite => "printf 'partial' > \"$key\"\nexit 1\n",
            Self::ExitsWithoutKey => "exit 0\n",
            Self::Hangs => "exec sleep 30\n",
        }
    }
}

/// Behaviour of the fake daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonScript {
    Cooperative,
    IgnoresTerm,
    TrailingPartialLine,
    ExitsImmediately,
    ExitsLeavingChild,
}

impl DaemonScript {
    fn body(self) -> &'static str {
        match self {
            Self::Cooperative => concat!(
                "trap 'printf \"dropbear shutting down\\n\"; exit 0' TERM\n",
                "printf 'dropbear listening on port %s\\r\\n' \"$6\"\n",
                "printf 'host key %s\\n' \"$4\" >&2\n",
                "while :; do sleep 0.05; done\n",
            ),
            Self::IgnoresTerm => concat!(
                "trap '' TERM\n",
                "printf 'ignoring TERM\\n'\n",
                "while :; do sleep 0.05; done\n",
            ),
            Self::TrailingPartialLine => concat!(
                "trap 'exit 0' TERM\n",
                "printf 'ready\\n'\n",
                "printf 'trailing'\n",
                "while :; do sleep 0.05; done\n",
            ),
            Self::ExitsImmediately => "printf 'fatal: cannot bind\\n'\nexit 3\n",
            Self::ExitsLeavingChild => "sleep 10 &\nprintf 'fatal\\n'\nexit 3\n",
        }
    }
}

/// A temporary directory holding fake tooling and the host key location.
pub struct FakeTooling {
    dir: TempDir,
    root: Utf8PathBuf,
}

impl FakeTooling {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create tooling dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tooling dir");
        Self { dir, root }
    }

    pub fn install_keygen(&self, script: KeygenScript) {
        let body = format!("#!/bin/sh\n{RECORD_CALL}{}", script.body());
        self.install(KEYGEN_NAME, &body);
    }

    pub fn install_daemon(&self, script: DaemonScript) {
        self.install(DAEMON_NAME, &format!("#!/bin/sh\n{}", script.body()));
    }

    fn install(&self, name: &str, body: &str) {
        let path = self.root.join(name);
        fs::write(&path, body).expect("write fake tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake tool");
    }

    pub fn host_key_path(&self) -> Utf8PathBuf {
        self.root.join("keys").join("host_key")
    }

    pub fn write_host_key(&self, contents: &str) {
        let path = self.host_key_path();
        fs::create_dir_all(self.root.join("keys")).expect("create key dir");
        fs::write(path, contents).expect("write host key");
    }

    pub fn keygen_invocations(&self) -> usize {
        fs::read_to_string(self.dir.path().join(CALLS_FILE))
            .map(|calls| calls.lines().count())
            .unwrap_or(0)
    }

    /// Settings pointing at the fake tools with short test timeouts.
    pub fn settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            daemon_binary: self.root.join(DAEMON_NAME),
            keygen_binary: self.root.join(KEYGEN_NAME),
            host_key_path: self.host_key_path(),
            key_type: "rsa".to_owned(),
            listen_port: TEST_PORT,
            keygen_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
        }
    }
}
