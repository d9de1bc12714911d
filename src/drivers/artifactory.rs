//! Artifactory driver.
//!
//! Username and password are always resolved, username first, even when the
//! references are empty. A missing reference surfaces as whatever the
//! resolver reports for it.
//!
//! Basic auth is fed to `curl` as a config file on stdin (`-K -`) so the
//! password never appears in argv.

use super::{path_arg, wrong_location};
use crate::artifact::ArtifactoryArtifact;
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

/// Artifactory driver with resolved credentials.
#[derive(Debug, Clone)]
pub struct ArtifactoryDriver {
    /// Username
    pub username: Credential,
    /// Password or API key
    pub password: Credential,
    /// curl program
    pub program: String,
}

/// Builds an [`ArtifactoryDriver`] for `location`.
pub async fn create_driver(
    ctx: &Context,
    resolver: &dyn SecretResolver,
    location: &ArtifactoryArtifact,
) -> Result<ArtifactoryDriver> {
    let username = ctx.resolve(resolver, &location.username_secret).await?;
    let password = ctx.resolve(resolver, &location.password_secret).await?;

    Ok(ArtifactoryDriver {
        username,
        password,
        program: ctx.config().program("curl"),
    })
}

fn construct<'a>(
    ctx: &'a Context,
    location: &'a ArtifactLocation,
    resolver: &'a dyn SecretResolver,
) -> BoxFuture<'a, Result<Box<dyn ArtifactDriver>>> {
    Box::pin(async move {
        let ArtifactLocation::Artifactory(art) = location else {
            return Err(ArtifactError::UnsupportedDriver);
        };
        let driver = create_driver(ctx, resolver, art).await?;
        Ok(Box::new(driver) as Box<dyn ArtifactDriver>)
    })
}

/// Registers the Artifactory driver.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(DriverKind::Artifactory, construct);
}

/// Escapes a value for a double-quoted curl config string. Line breaks must
/// be escaped or they would end the `user` line early.
fn quote(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

impl ArtifactoryDriver {
    /// Returns the curl config carrying basic auth.
    fn auth_config(&self) -> Credential {
        Credential::new(format!(
            "user = \"{}:{}\"\n",
            quote(self.username.expose()),
            quote(self.password.expose())
        ))
    }

    /// Builds the download invocation.
    pub fn download_command(&self, url: &str, dst: &str) -> CommandSpec {
        CommandSpec::new(&self.program)
            .args(["-fsSL", "-K", "-", "-o", dst, url])
            .stdin(self.auth_config())
    }

    /// Builds the upload invocation.
    pub fn upload_command(&self, src: &str, url: &str) -> CommandSpec {
        CommandSpec::new(&self.program)
            .args(["-fsS", "-K", "-", "-T", src, url])
            .stdin(self.auth_config())
    }
}

#[async_trait]
impl ArtifactDriver for ArtifactoryDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Artifactory
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, artifact: &Artifact, path: &Path) -> Result<()> {
        let location = artifact
            .artifactory()
            .ok_or_else(|| wrong_location(DriverKind::Artifactory, artifact))?;

        run_command(&self.download_command(&location.url, &path_arg(path)))
            .await
            .map_err(|e| ArtifactError::driver_op("artifactory", "load", &artifact.name, e))?;
        Ok(())
    }

    async fn save(&self, path: &Path, artifact: &Artifact) -> Result<()> {
        let location = artifact
            .artifactory()
            .ok_or_else(|| wrong_location(DriverKind::Artifactory, artifact))?;

        run_command(&self.upload_command(&path_arg(path), &location.url))
            .await
            .map_err(|e| ArtifactError::driver_op("artifactory", "save", &artifact.name, e))?;
        Ok(())
    }
}
