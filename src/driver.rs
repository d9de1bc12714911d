//! Driver trait definition for artifact backends.
//!
//! This module defines the [`ArtifactDriver`] trait that every backend
//! implements. A driver is built by the [`factory`](crate::factory) with its
//! credentials already resolved, used for one `load` or `save`, then dropped.

use crate::{Artifact, DriverKind, Result};
use async_trait::async_trait;
use std::any::Any;
use std::path::Path;

/// ArtifactDriver moves one artifact between a backend and the local filesystem.
///
/// All implementations must be `Send + Sync` so a driver can be handed to
/// another task.
///
/// # Implementations
///
/// - **CLI-based**: S3 (`aws`), HTTP and Artifactory (`curl`), Git (`git`),
///   HDFS (`hdfs`), OSS (`ossutil`), GCS (`gcloud`)
/// - **Local**: Raw (inline data)
///
/// # Example
///
/// ```no_run
/// use artifactmux::{factory, Artifact, Context};
/// use artifactmux::resolvers::FileSecretResolver;
///
/// #[tokio::main]
/// async fn main() -> artifactmux::Result<()> {
///     let artifact = Artifact::from_json(r#"{"name": "page", "http": {"url": "https://example.com/"}}"#)?;
///     let resolver = FileSecretResolver::new("/var/run/artifactmux/secrets");
///
///     let driver = factory::new_driver(&Context::default(), &artifact, &resolver).await?;
///     driver.load(&artifact, "/tmp/page.html".as_ref()).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ArtifactDriver: Send + Sync {
    /// Returns the backend this driver talks to.
    fn kind(&self) -> DriverKind;

    /// Returns `self` for downcasting to the concrete driver type.
    fn as_any(&self) -> &dyn Any;

    /// Fetches `artifact` and places it at `path`.
    ///
    /// # Errors
    ///
    /// - [`ArtifactError::InvalidArtifact`](crate::ArtifactError::InvalidArtifact):
    ///   `artifact` does not point at this driver's backend
    /// - [`ArtifactError::DriverOperation`](crate::ArtifactError::DriverOperation):
    ///   the transfer failed
    async fn load(&self, artifact: &Artifact, path: &Path) -> Result<()>;

    /// Uploads `path` to the destination described by `artifact`.
    ///
    /// # Errors
    ///
    /// - [`ArtifactError::NotSupported`](crate::ArtifactError::NotSupported):
    ///   the backend is read-only (HTTP, Git, Raw)
    /// - [`ArtifactError::DriverOperation`](crate::ArtifactError::DriverOperation):
    ///   the transfer failed
    async fn save(&self, path: &Path, artifact: &Artifact) -> Result<()>;
}

impl dyn ArtifactDriver {
    /// Downcasts to a concrete driver type.
    ///
    /// ```
    /// # #[cfg(feature = "raw")]
    /// # {
    /// use artifactmux::ArtifactDriver;
    /// use artifactmux::drivers::raw::RawDriver;
    ///
    /// let driver: Box<dyn ArtifactDriver> = Box::new(RawDriver);
    /// assert!(driver.downcast_ref::<RawDriver>().is_some());
    /// # }
    /// ```
    pub fn downcast_ref<T: ArtifactDriver + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
