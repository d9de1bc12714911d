//! Inline data driver.
//!
//! The artifact carries its own contents; loading writes them to disk.

use super::wrong_location;
use crate::factory::DriverRegistry;
use crate::{
    Artifact, ArtifactDriver, ArtifactError, ArtifactLocation, Context, DriverKind, Result,
    SecretResolver,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::Any;
use std::path::Path;

/// Raw driver. Holds no configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDriver;

fn construct<'a>(
    _ctx: &'a Context,
    location: &'a ArtifactLocation,
    _resolver: &'a dyn SecretResolver,
) -> BoxFuture<'a, Result<Box<dyn ArtifactDriver>>> {
    Box::pin(async move {
        let ArtifactLocation::Raw(_) = location else {
            return Err(ArtifactError::UnsupportedDriver);
        };
        Ok(Box::new(RawDriver) as Box<dyn ArtifactDriver>)
    })
}

/// Registers the raw driver.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(DriverKind::Raw, construct);
}

#[async_trait]
impl ArtifactDriver for RawDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Raw
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, artifact: &Artifact, path: &Path) -> Result<()> {
        let raw = artifact
            .raw()
            .ok_or_else(|| wrong_location(DriverKind::Raw, artifact))?;

        tokio::fs::write(path, raw.data.as_bytes())
            .await
            .map_err(|e| ArtifactError::driver_op("raw", "load", &artifact.name, e.into()))
    }

    async fn save(&self, _path: &Path, _artifact: &Artifact) -> Result<()> {
        Err(ArtifactError::not_supported("raw", "save"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::RawArtifact;
    use tempfile::tempdir;

    fn inline(data: &str) -> Artifact {
        Artifact::new("inline").with_location(ArtifactLocation::Raw(RawArtifact {
            data: data.to_string(),
        }))
    }

    #[tokio::test]
    async fn test_load_writes_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");

        RawDriver.load(&inline("hello\nworld"), &path).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "hello\nworld");
    }

    #[tokio::test]
    async fn test_load_into_missing_dir_fails_with_context() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");

        let err = RawDriver.load(&inline("x"), &path).await.unwrap_err();
        assert!(matches!(err, ArtifactError::DriverOperation { .. }));
        assert!(err.to_string().starts_with("raw: load inline"));
    }

    #[tokio::test]
    async fn test_save_not_supported() {
        let err = RawDriver
            .save(Path::new("/tmp/x"), &inline("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::NotSupported { .. }));
    }
}
