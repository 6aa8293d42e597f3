//! Prepares the filesystem location of the persistent host key.
//!
//! The key-generation helper refuses to create a key inside a directory that
//! does not exist, so the parent directory is created up front with owner-only
//! permissions before the supervisor ever forks the helper.

use std::fs::DirBuilder;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::Config;

/// Canonical location of the host key written by the key-generation helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPaths {
    key_dir: Utf8PathBuf,
    key_path: Utf8PathBuf,
}

impl KeyPaths {
    /// Derives the key paths from the shared configuration.
    pub fn from_config(config: &Config) -> Result<Self, KeyPathsError> {
        Self::for_key(config.host_key_path())
    }

    /// Derives the key paths for an explicit key file.
    pub fn for_key(key_path: &Utf8Path) -> Result<Self, KeyPathsError> {
        let key_dir = key_path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .ok_or_else(|| KeyPathsError::MissingParent {
                path: key_path.to_path_buf(),
            })?;
        Ok(Self {
            key_dir: key_dir.to_path_buf(),
            key_path: key_path.to_path_buf(),
        })
    }

    /// Ensures the key directory exists with restrictive permissions.
    pub fn prepare(&self) -> Result<(), KeyPathsError> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(&self.key_dir)
            .map_err(|source| KeyPathsError::CreateDirectory {
                path: self.key_dir.clone(),
                source,
            })
    }

    /// Directory holding the host key.
    pub fn key_dir(&self) -> &Utf8Path {
        self.key_dir.as_path()
    }

    /// Path of the host key file.
    pub fn key_path(&self) -> &Utf8Path {
        self.key_path.as_path()
    }
}

/// Errors raised while deriving or preparing the host key location.
#[derive(Debug, Error)]
pub enum KeyPathsError {
    /// The key path lacked a parent directory.
    #[error("host key path '{path}' has no parent directory")]
    MissingParent { path: Utf8PathBuf },
    /// Creating the key directory failed.
    #[error("failed to prepare host key directory '{path}': {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_directory_from_key_path() {
        let paths = KeyPaths::for_key(Utf8Path::new("/etc/dropbear/dropbear_rsa_host_key"))
            .expect("paths should derive");
        assert_eq!(paths.key_dir(), Utf8Path::new("/etc/dropbear"));
        assert!(paths.key_path().ends_with("dropbear_rsa_host_key"));
    }

    #[test]
    fn rejects_bare_file_names() {
        let error =
            KeyPaths::for_key(Utf8Path::new("host_key")).expect_err("bare names have no parent");
        assert!(matches!(error, KeyPathsError::MissingParent { .. }));
    }

    #[test]
    fn prepare_creates_nested_directories() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp dir");
        let key = root.join("nested").join("keys").join("host_key");
        let paths = KeyPaths::for_key(&key).expect("paths should derive");

        paths.prepare().expect("directory should be created");
        paths.prepare().expect("preparing twice is harmless");

        assert!(paths.key_dir().is_dir());
        assert!(!paths.key_path().exists(), "only the directory is created");
    }
}
