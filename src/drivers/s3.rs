//! S3-compatible object store driver.
//!
//! Transfers run through the AWS CLI (`aws s3 cp`). Static keys are handed
//! over as `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`; without them the CLI
//! falls back to its default credential chain (instance role, web identity,
//! shared config).
//!
//! # Credential policy
//!
//! The access/secret key pair is optional as a unit. When the access key
//! reference has no name, nothing is resolved and both keys stay empty.
//! Otherwise the access key is resolved first, then the secret key.

use super::{is_dir, path_arg, wrong_location};
use crate::artifact::S3Artifact;
use crate::cli::{run_command, CommandSpec};
use crate::factory::DriverRegistry;
use crate::{
    Artifact, ArtifactDriver, ArtifactError, ArtifactLocation, Context, Credential, DriverKind,
    Result, SecretResolver,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::Any;
use std::path::Path;

/// S3 driver with resolved credentials.
#[derive(Debug, Clone)]
pub struct S3Driver {
    /// Service endpoint (host[:port] or full URL)
    pub endpoint: String,
    /// Access key ID, empty when not configured
    pub access_key: Credential,
    /// Secret access key, empty when not configured
    pub secret_key: Credential,
    /// Use HTTPS for a bare endpoint
    pub secure: bool,
    /// Region
    pub region: String,
    /// Role to assume
    pub role_arn: String,
    /// Ignore static keys and use the default credential chain
    pub use_sdk_creds: bool,
    /// AWS CLI program
    pub program: String,
}

/// Builds an [`S3Driver`] for `location`.
pub async fn create_driver(
    ctx: &Context,
    resolver: &dyn SecretResolver,
    location: &S3Artifact,
) -> Result<S3Driver> {
    let mut access_key = Credential::default();
    let mut secret_key = Credential::default();

    if location.access_key_secret.is_configured() {
        access_key = ctx.resolve(resolver, &location.access_key_secret).await?;
        secret_key = ctx.resolve(resolver, &location.secret_key_secret).await?;
    }

    Ok(S3Driver {
        endpoint: location.endpoint.clone(),
        access_key,
        secret_key,
        secure: !location.insecure.unwrap_or(false),
        region: location.region.clone(),
        role_arn: location.role_arn.clone(),
        use_sdk_creds: location.use_sdk_creds,
        program: ctx.config().program("aws"),
    })
}

fn construct<'a>(
    ctx: &'a Context,
    location: &'a ArtifactLocation,
    resolver: &'a dyn SecretResolver,
) -> BoxFuture<'a, Result<Box<dyn ArtifactDriver>>> {
    Box::pin(async move {
        let ArtifactLocation::S3(s3) = location else {
            return Err(ArtifactError::UnsupportedDriver);
        };
        let driver = create_driver(ctx, resolver, s3).await?;
        Ok(Box::new(driver) as Box<dyn ArtifactDriver>)
    })
}

/// Registers the S3 driver.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(DriverKind::S3, construct);
}

impl S3Driver {
    /// Returns the endpoint URL passed to `--endpoint-url`, if any.
    pub fn endpoint_url(&self) -> Option<String> {
        if self.endpoint.is_empty() {
            return None;
        }
        if self.endpoint.contains("://") {
            return Some(self.endpoint.clone());
        }
        let scheme = if self.secure { "https" } else { "http" };
        Some(format!("{}://{}", scheme, self.endpoint))
    }

    /// Builds the `aws s3 cp` invocation.
    pub fn copy_command(&self, src: &str, dst: &str, recursive: bool) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.program).args(["s3", "cp", src, dst]);

        if recursive {
            spec = spec.arg("--recursive");
        }
        if let Some(url) = self.endpoint_url() {
            spec = spec.arg("--endpoint-url").arg(url);
        }
        if !self.region.is_empty() {
            spec = spec.arg("--region").arg(&self.region);
        }

        if !self.use_sdk_creds && !self.access_key.is_empty() {
            spec = spec
                .env("AWS_ACCESS_KEY_ID", self.access_key.clone())
                .env("AWS_SECRET_ACCESS_KEY", self.secret_key.clone());
        }
        if !self.role_arn.is_empty() {
            spec = spec.env("AWS_ROLE_ARN", self.role_arn.as_str());
        }

        spec
    }
}

fn object_url(location: &S3Artifact) -> String {
    format!("s3://{}/{}", location.bucket, location.key.trim_start_matches('/'))
}

#[async_trait]
impl ArtifactDriver for S3Driver {
    fn kind(&self) -> DriverKind {
        DriverKind::S3
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, artifact: &Artifact, path: &Path) -> Result<()> {
        let location = artifact
            .s3()
            .ok_or_else(|| wrong_location(DriverKind::S3, artifact))?;

        let recursive = location.key.ends_with('/');
        let spec = self.copy_command(&object_url(location), &path_arg(path), recursive);

        run_command(&spec)
            .await
            .map_err(|e| ArtifactError::driver_op("s3", "load", &artifact.name, e))?;
        Ok(())
    }

    async fn save(&self, path: &Path, artifact: &Artifact) -> Result<()> {
        let location = artifact
            .s3()
            .ok_or_else(|| wrong_location(DriverKind::S3, artifact))?;

        let recursive = is_dir(path).await;
        let spec = self.copy_command(&path_arg(path), &object_url(location), recursive);

        run_command(&spec)
            .await
            .map_err(|e| ArtifactError::driver_op("s3", "save", &artifact.name, e))?;
        Ok(())
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::artifact::SecretSelector;
    use crate::resolvers::MockSecretResolver;

    fn location() -> S3Artifact {
        S3Artifact {
            endpoint: "minio:9000".to_string(),
            bucket: "models".to_string(),
            key: "v3/model.tgz".to_string(),
            access_key_secret: SecretSelector::new("minio-creds", "accessKey"),
            secret_key_secret: SecretSelector::new("minio-creds", "secretKey"),
            ..Default::default()
        }
    }

    fn resolver() -> MockSecretResolver {
        MockSecretResolver::new()
            .with_secret("minio-creds", "accessKey", "AKIA")
            .with_secret("minio-creds", "secretKey", "SECRET")
    }

    #[tokio::test]
    async fn test_resolves_access_then_secret() {
        let resolver = resolver();
        let driver = create_driver(&Context::default(), &resolver, &location())
            .await
            .unwrap();

        assert_eq!(driver.access_key.expose(), "AKIA");
        assert_eq!(driver.secret_key.expose(), "SECRET");
        assert_eq!(
            resolver.calls(),
            vec![
                ("minio-creds".to_string(), "accessKey".to_string()),
                ("minio-creds".to_string(), "secretKey".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_access_key_name_skips_resolution() {
        let resolver = resolver();
        let mut loc = location();
        loc.access_key_secret = SecretSelector::default();

        let driver = create_driver(&Context::default(), &resolver, &loc).await.unwrap();
        assert!(driver.access_key.is_empty());
        assert!(driver.secret_key.is_empty());
        assert_eq!(resolver.call_count(), 0);
    }

    #[tokio::test]
    async fn test_access_key_failure_stops_before_secret_key() {
        let resolver = resolver();
        resolver.fail_on("minio-creds", "accessKey", || {
            ArtifactError::SecretStoreUnavailable("down".to_string())
        });

        let err = create_driver(&Context::default(), &resolver, &location())
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::SecretStoreUnavailable(_)));
        assert_eq!(resolver.call_count(), 1);
    }

    #[tokio::test]
    async fn test_secure_defaults_and_verbatim_fields() {
        let mut loc = location();
        loc.region = "eu-west-1".to_string();
        loc.role_arn = "arn:aws:iam::1:role/r".to_string();
        loc.use_sdk_creds = true;

        let driver = create_driver(&Context::default(), &resolver(), &loc).await.unwrap();
        assert!(driver.secure);
        assert_eq!(driver.endpoint, "minio:9000");
        assert_eq!(driver.region, "eu-west-1");
        assert_eq!(driver.role_arn, "arn:aws:iam::1:role/r");
        assert!(driver.use_sdk_creds);

        loc.insecure = Some(false);
        let driver = create_driver(&Context::default(), &resolver(), &loc).await.unwrap();
        assert!(driver.secure);

        loc.insecure = Some(true);
        let driver = create_driver(&Context::default(), &resolver(), &loc).await.unwrap();
        assert!(!driver.secure);
    }

    #[tokio::test]
    async fn test_copy_command() {
        let mut loc = location();
        loc.insecure = Some(true);
        loc.region = "us-east-1".to_string();
        let driver = create_driver(&Context::default(), &resolver(), &loc).await.unwrap();

        let spec = driver.copy_command("s3://models/v3/model.tgz", "/tmp/model.tgz", false);
        assert_eq!(spec.program, "aws");
        assert_eq!(
            spec.args,
            vec![
                "s3",
                "cp",
                "s3://models/v3/model.tgz",
                "/tmp/model.tgz",
                "--endpoint-url",
                "http://minio:9000",
                "--region",
                "us-east-1"
            ]
        );
        assert_eq!(spec.env_value("AWS_ACCESS_KEY_ID"), Some("AKIA"));
        assert_eq!(spec.env_value("AWS_SECRET_ACCESS_KEY"), Some("SECRET"));
        assert!(!spec.args.iter().any(|a| a.contains("SECRET")));
    }

    #[tokio::test]
    async fn test_sdk_creds_omit_static_keys() {
        let mut loc = location();
        loc.use_sdk_creds = true;
        let driver = create_driver(&Context::default(), &resolver(), &loc).await.unwrap();

        let spec = driver.copy_command("/tmp/dir", "s3://models/out/", true);
        assert!(spec.args.contains(&"--recursive".to_string()));
        assert_eq!(spec.env_value("AWS_ACCESS_KEY_ID"), None);
    }

    #[tokio::test]
    async fn test_load_rejects_other_backends() {
        let driver = create_driver(&Context::default(), &resolver(), &location())
            .await
            .unwrap();
        let artifact = Artifact::new("x");

        let err = driver.load(&artifact, Path::new("/tmp/x")).await.unwrap_err();
        assert!(matches!(err, ArtifactError::InvalidArtifact(_)));
    }
}
