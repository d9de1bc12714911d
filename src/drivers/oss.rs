//! Alibaba Cloud OSS driver.
//!
//! Transfers run through `ossutil cp`. The access/secret key pair follows
//! the same policy as S3: an access-key reference with no name means no
//! resolution and ambient credentials. Keys are written to a temporary
//! `ossutil` config file passed with `-c`.

use super::{is_dir, path_arg, wrong_location};
use crate::artifact::OssArtifact;
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

/// OSS driver with resolved credentials.
#[derive(Debug, Clone)]
pub struct OssDriver {
    /// Service endpoint
    pub endpoint: String,
    /// Access key ID, empty when not configured
    pub access_key: Credential,
    /// Access key secret, empty when not configured
    pub secret_key: Credential,
    /// ossutil program
    pub program: String,
}

/// Builds an [`OssDriver`] for `location`.
pub async fn create_driver(
    ctx: &Context,
    resolver: &dyn SecretResolver,
    location: &OssArtifact,
) -> Result<OssDriver> {
    let mut access_key = Credential::default();
    let mut secret_key = Credential::default();

    if location.access_key_secret.is_configured() {
        access_key = ctx.resolve(resolver, &location.access_key_secret).await?;
        secret_key = ctx.resolve(resolver, &location.secret_key_secret).await?;
    }

    Ok(OssDriver {
        endpoint: location.endpoint.clone(),
        access_key,
        secret_key,
        program: ctx.config().program("ossutil"),
    })
}

fn construct<'a>(
    ctx: &'a Context,
    location: &'a ArtifactLocation,
    resolver: &'a dyn SecretResolver,
) -> BoxFuture<'a, Result<Box<dyn ArtifactDriver>>> {
    Box::pin(async move {
        let ArtifactLocation::Oss(oss) = location else {
            return Err(ArtifactError::UnsupportedDriver);
        };
        let driver = create_driver(ctx, resolver, oss).await?;
        Ok(Box::new(driver) as Box<dyn ArtifactDriver>)
    })
}

/// Registers the OSS driver.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(DriverKind::Oss, construct);
}

impl OssDriver {
    /// Renders the `ossutil` config file.
    pub fn config_file(&self) -> Credential {
        let mut config = String::from("[Credentials]\nlanguage=EN\n");
        if !self.endpoint.is_empty() {
            config.push_str(&format!("endpoint={}\n", self.endpoint));
        }
        if !self.access_key.is_empty() {
            config.push_str(&format!(
                "accessKeyID={}\naccessKeySecret={}\n",
                self.access_key.expose(),
                self.secret_key.expose()
            ));
        }
        Credential::new(config)
    }

    /// Builds the `ossutil cp` invocation.
    pub fn copy_command(&self, config: &str, src: &str, dst: &str, recursive: bool) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.program).args(["-c", config, "cp"]);
        if recursive {
            spec = spec.arg("-r");
        }
        spec.args(["-f", src, dst])
    }

    async fn copy(&self, src: &str, dst: &str, recursive: bool) -> Result<()> {
        let config = SecretFile::create(&self.config_file())?;
        let spec = self.copy_command(&config.path_string(), src, dst, recursive);
        run_command(&spec).await?;
        Ok(())
    }
}

fn object_url(location: &OssArtifact) -> String {
    format!("oss://{}/{}", location.bucket, location.key.trim_start_matches('/'))
}

#[async_trait]
impl ArtifactDriver for OssDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Oss
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, artifact: &Artifact, path: &Path) -> Result<()> {
        let location = artifact
            .oss()
            .ok_or_else(|| wrong_location(DriverKind::Oss, artifact))?;

        let recursive = location.key.ends_with('/');
        self.copy(&object_url(location), &path_arg(path), recursive)
            .await
            .map_err(|e| ArtifactError::driver_op("oss", "load", &artifact.name, e))
    }

    async fn save(&self, path: &Path, artifact: &Artifact) -> Result<()> {
        let location = artifact
            .oss()
            .ok_or_else(|| wrong_location(DriverKind::Oss, artifact))?;

        let recursive = is_dir(path).await;
        self.copy(&path_arg(path), &object_url(location), recursive)
            .await
            .map_err(|e| ArtifactError::driver_op("oss", "save", &artifact.name, e))
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::artifact::SecretSelector;
    use crate::resolvers::MockSecretResolver;

    fn location() -> OssArtifact {
        OssArtifact {
            endpoint: "oss-cn-hangzhou.aliyuncs.com".to_string(),
            bucket: "datasets".to_string(),
            key: "train/".to_string(),
            access_key_secret: SecretSelector::new("oss", "accessKey"),
            secret_key_secret: SecretSelector::new("oss", "secretKey"),
        }
    }

    fn resolver() -> MockSecretResolver {
        MockSecretResolver::new()
            .with_secret("oss", "accessKey", "LTAI")
            .with_secret("oss", "secretKey", "OSSSECRET")
    }

    #[tokio::test]
    async fn test_resolves_pair() {
        let resolver = resolver();
        let driver = create_driver(&Context::default(), &resolver, &location())
            .await
            .unwrap();

        assert_eq!(driver.endpoint, "oss-cn-hangzhou.aliyuncs.com");
        assert_eq!(driver.access_key.expose(), "LTAI");
        assert_eq!(driver.secret_key.expose(), "OSSSECRET");
        assert_eq!(resolver.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_access_key_name_skips_resolution() {
        let resolver = resolver();
        let mut loc = location();
        loc.access_key_secret.name.clear();

        let driver = create_driver(&Context::default(), &resolver, &loc).await.unwrap();
        assert!(driver.access_key.is_empty());
        assert!(driver.secret_key.is_empty());
        assert_eq!(resolver.call_count(), 0);
        assert!(!driver.config_file().expose().contains("accessKeyID"));
    }

    #[tokio::test]
    async fn test_secret_key_failure() {
        let resolver = resolver();
        resolver.fail_on("oss", "secretKey", || ArtifactError::SecretNotFound {
            name: "oss".to_string(),
            key: "secretKey".to_string(),
        });

        let err = create_driver(&Context::default(), &resolver, &location())
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::SecretNotFound { .. }));
        assert_eq!(resolver.call_count(), 2);
    }

    #[tokio::test]
    async fn test_config_file_and_command() {
        let driver = create_driver(&Context::default(), &resolver(), &location())
            .await
            .unwrap();

        assert_eq!(
            driver.config_file().expose(),
            "[Credentials]\nlanguage=EN\nendpoint=oss-cn-hangzhou.aliyuncs.com\naccessKeyID=LTAI\naccessKeySecret=OSSSECRET\n"
        );

        let spec = driver.copy_command("/tmp/cfg", "oss://datasets/train/", "/tmp/train", true);
        assert_eq!(spec.program, "ossutil");
        assert_eq!(
            spec.args,
            vec!["-c", "/tmp/cfg", "cp", "-r", "-f", "oss://datasets/train/", "/tmp/train"]
        );
        assert!(spec.env.is_empty());
    }

    #[test]
    fn test_object_url() {
        let mut loc = location();
        loc.key = "/a/b.bin".to_string();
        assert_eq!(object_url(&loc), "oss://datasets/a/b.bin");
    }
}
