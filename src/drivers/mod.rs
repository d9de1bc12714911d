//! Driver implementations.
//!
//! Each module exposes its driver type, a `create_driver` function that
//! resolves the backend's secrets, and a `register` function that adds the
//! backend to a [`DriverRegistry`].

use crate::factory::DriverRegistry;
use crate::{Artifact, ArtifactError, DriverKind};
use std::path::Path;

#[cfg(feature = "s3")]
pub mod s3;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "git")]
pub mod git;

#[cfg(feature = "artifactory")]
pub mod artifactory;

#[cfg(feature = "hdfs")]
pub mod hdfs;

#[cfg(feature = "raw")]
pub mod raw;

#[cfg(feature = "oss")]
pub mod oss;

#[cfg(feature = "gcs")]
pub mod gcs;

/// Registers all compiled drivers with `registry`.
#[allow(unused_variables)]
pub fn register_all(registry: &mut DriverRegistry) {
    #[cfg(feature = "s3")]
    s3::register(registry);

    #[cfg(feature = "http")]
    http::register(registry);

    #[cfg(feature = "git")]
    git::register(registry);

    #[cfg(feature = "artifactory")]
    artifactory::register(registry);

    #[cfg(feature = "hdfs")]
    hdfs::register(registry);

    #[cfg(feature = "raw")]
    raw::register(registry);

    #[cfg(feature = "oss")]
    oss::register(registry);

    #[cfg(feature = "gcs")]
    gcs::register(registry);
}

/// Error for an artifact handed to a driver of another backend.
#[allow(dead_code)]
pub(crate) fn wrong_location(kind: DriverKind, artifact: &Artifact) -> ArtifactError {
    ArtifactError::InvalidArtifact(format!(
        "artifact '{}' has no {} location",
        artifact.name, kind
    ))
}

/// Returns true when `path` is an existing directory.
#[allow(dead_code)]
pub(crate) async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

/// Returns `path` as a string argument.
#[allow(dead_code)]
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
