//! Google Cloud Storage driver.
//!
//! Transfers run through `gcloud storage cp`. A service account key is
//! optional: with no secret name the CLI uses ambient credentials (workload
//! identity, metadata server). Otherwise the key is written to an
//! owner-only file and passed via `CLOUDSDK_AUTH_CREDENTIAL_FILE_OVERRIDE`.

use super::{is_dir, path_arg, wrong_location};
use crate::artifact::GcsArtifact;
use crate::cli::{run_command, CommandSpec, SecretFile};
use crate::factory::DriverRegistry;
use crate::{
    Artifact, ArtifactDriver, ArtifactError, ArtifactLocation, Context, Credential, DriverKind,
    Result, SecretResolver,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::Any;
use std::path::Path;

/// GCS driver with a resolved service account key.
#[derive(Debug, Clone)]
pub struct GcsDriver {
    /// Service account key JSON, empty for ambient credentials
    pub service_account_key: Credential,
    /// gcloud program
    pub program: String,
}

/// Builds a [`GcsDriver`] for `location`.
pub async fn create_driver(
    ctx: &Context,
    resolver: &dyn SecretResolver,
    location: &GcsArtifact,
) -> Result<GcsDriver> {
    let service_account_key = ctx
        .resolve_if_configured(resolver, &location.service_account_key_secret)
        .await?;

    Ok(GcsDriver {
        service_account_key,
        program: ctx.config().program("gcloud"),
    })
}

fn construct<'a>(
    ctx: &'a Context,
    location: &'a ArtifactLocation,
    resolver: &'a dyn SecretResolver,
) -> BoxFuture<'a, Result<Box<dyn ArtifactDriver>>> {
    Box::pin(async move {
        let ArtifactLocation::Gcs(gcs) = location else {
            return Err(ArtifactError::UnsupportedDriver);
        };
        let driver = create_driver(ctx, resolver, gcs).await?;
        Ok(Box::new(driver) as Box<dyn ArtifactDriver>)
    })
}

/// Registers the GCS driver.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(DriverKind::Gcs, construct);
}

impl GcsDriver {
    /// Builds the `gcloud storage cp` invocation.
    pub fn copy_command(
        &self,
        key_file: Option<&str>,
        src: &str,
        dst: &str,
        recursive: bool,
    ) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.program).args(["storage", "cp"]);
        if recursive {
            spec = spec.arg("--recursive");
        }
        spec = spec.args([src, dst]);

        if let Some(path) = key_file {
            spec = spec.env("CLOUDSDK_AUTH_CREDENTIAL_FILE_OVERRIDE", path);
        }
        spec
    }

    async fn copy(&self, src: &str, dst: &str, recursive: bool) -> Result<()> {
        let key_file = if self.service_account_key.is_empty() {
            None
        } else {
            Some(SecretFile::create(&self.service_account_key)?)
        };
        let key_path = key_file.as_ref().map(SecretFile::path_string);

        let spec = self.copy_command(key_path.as_deref(), src, dst, recursive);
        run_command(&spec).await?;
        Ok(())
    }
}

fn object_url(location: &GcsArtifact) -> String {
    format!("gs://{}/{}", location.bucket, location.key.trim_start_matches('/'))
}

#[async_trait]
impl ArtifactDriver for GcsDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Gcs
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, artifact: &Artifact, path: &Path) -> Result<()> {
        let location = artifact
            .gcs()
            .ok_or_else(|| wrong_location(DriverKind::Gcs, artifact))?;

        let recursive = location.key.ends_with('/');
        self.copy(&object_url(location), &path_arg(path), recursive)
            .await
            .map_err(|e| ArtifactError::driver_op("gcs", "load", &artifact.name, e))
    }

    async fn save(&self, path: &Path, artifact: &Artifact) -> Result<()> {
        let location = artifact
            .gcs()
            .ok_or_else(|| wrong_location(DriverKind::Gcs, artifact))?;

        let recursive = is_dir(path).await;
        self.copy(&path_arg(path), &object_url(location), recursive)
            .await
            .map_err(|e| ArtifactError::driver_op("gcs", "save", &artifact.name, e))
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::artifact::SecretSelector;
    use crate::resolvers::MockSecretResolver;

    fn resolver() -> MockSecretResolver {
        MockSecretResolver::new().with_secret("gcs", "serviceAccountKey", "{\"type\":\"service_account\"}")
    }

    #[tokio::test]
    async fn test_resolves_service_account_key() {
        let resolver = resolver();
        let loc = GcsArtifact {
            bucket: "b".to_string(),
            key: "k".to_string(),
            service_account_key_secret: SecretSelector::new("gcs", "serviceAccountKey"),
        };

        let driver = create_driver(&Context::default(), &resolver, &loc).await.unwrap();
        assert!(driver.service_account_key.expose().contains("service_account"));
        assert_eq!(resolver.call_count(), 1);
    }

    #[tokio::test]
    async fn test_ambient_credentials() {
        let resolver = resolver();
        let driver = create_driver(&Context::default(), &resolver, &GcsArtifact::default())
            .await
            .unwrap();

        assert!(driver.service_account_key.is_empty());
        assert_eq!(resolver.call_count(), 0);

        let spec = driver.copy_command(None, "gs://b/k", "/tmp/k", false);
        assert_eq!(spec.args, vec!["storage", "cp", "gs://b/k", "/tmp/k"]);
        assert!(spec.env.is_empty());
    }

    #[tokio::test]
    async fn test_key_failure() {
        let resolver = resolver();
        resolver.fail_with(|| ArtifactError::SecretStoreUnavailable("down".to_string()));
        let loc = GcsArtifact {
            service_account_key_secret: SecretSelector::new("gcs", "serviceAccountKey"),
            ..Default::default()
        };

        let err = create_driver(&Context::default(), &resolver, &loc).await.unwrap_err();
        assert!(err.is_secret_failure());
    }

    #[tokio::test]
    async fn test_copy_command_with_key_file() {
        let driver = create_driver(&Context::default(), &resolver(), &GcsArtifact::default())
            .await
            .unwrap();

        let spec = driver.copy_command(Some("/tmp/key.json"), "/tmp/dir", "gs://b/out/", true);
        assert_eq!(spec.args, vec!["storage", "cp", "--recursive", "/tmp/dir", "gs://b/out/"]);
        assert_eq!(
            spec.env_value("CLOUDSDK_AUTH_CREDENTIAL_FILE_OVERRIDE"),
            Some("/tmp/key.json")
        );
    }
}
