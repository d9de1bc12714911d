//! Resolver for secrets mounted as files.
//!
//! Container runtimes commonly project each secret as a directory with one
//! file per key:
//!
//! ```text
//! <secrets_dir>/
//!   minio-creds/
//!     accessKey
//!     secretKey
//! ```

use crate::validation::validate_secret_selector;
use crate::{ArtifactError, Config, Credential, Result, SecretResolver};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Reads `<root>/<name>/<key>` for each lookup.
///
/// File contents are returned byte-for-byte, binary included; nothing is
/// trimmed.
#[derive(Debug, Clone)]
pub struct FileSecretResolver {
    root: PathBuf,
}

impl FileSecretResolver {
    /// Creates a resolver rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a resolver rooted at `config.secrets_dir`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.secrets_dir.clone())
    }

    /// Returns the mount root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn secret_path(&self, name: &str, key: &str) -> PathBuf {
        self.root.join(name).join(key)
    }
}

#[async_trait]
impl SecretResolver for FileSecretResolver {
    async fn get_secret(&self, name: &str, key: &str) -> Result<Credential> {
        validate_secret_selector(name, key)?;

        let path = self.secret_path(name, key);
        let data = fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ArtifactError::SecretNotFound {
                name: name.to_string(),
                key: key.to_string(),
            },
            ErrorKind::PermissionDenied => ArtifactError::SecretAccessDenied {
                name: name.to_string(),
                key: key.to_string(),
            },
            _ => ArtifactError::SecretStoreUnavailable(format!("reading {:?}: {}", path, e)),
        })?;

        Ok(Credential::from(data))
    }
}
