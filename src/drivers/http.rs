//! HTTP(S) download driver.
//!
//! Takes no credentials. Loads with `curl`; saving is not supported.

use super::{path_arg, wrong_location};
use crate::cli::{run_command, CommandSpec};
use crate::factory::DriverRegistry;
use crate::{
    Artifact, ArtifactDriver, ArtifactError, ArtifactLocation, Context, DriverKind, Result,
    SecretResolver,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::Any;
use std::path::Path;

/// HTTP driver.
#[derive(Debug, Clone)]
pub struct HttpDriver {
    /// curl program
    pub program: String,
}

/// Builds an [`HttpDriver`]. Never touches the resolver.
pub fn create_driver(ctx: &Context) -> HttpDriver {
    HttpDriver {
        program: ctx.config().program("curl"),
    }
}

fn construct<'a>(
    ctx: &'a Context,
    location: &'a ArtifactLocation,
    _resolver: &'a dyn SecretResolver,
) -> BoxFuture<'a, Result<Box<dyn ArtifactDriver>>> {
    Box::pin(async move {
        let ArtifactLocation::Http(_) = location else {
            return Err(ArtifactError::UnsupportedDriver);
        };
        Ok(Box::new(create_driver(ctx)) as Box<dyn ArtifactDriver>)
    })
}

/// Registers the HTTP driver.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(DriverKind::Http, construct);
}

impl HttpDriver {
    /// Builds the download invocation.
    pub fn download_command(&self, url: &str, dst: &str) -> CommandSpec {
        CommandSpec::new(&self.program).args(["-fsSL", "-o", dst, url])
    }
}

#[async_trait]
impl ArtifactDriver for HttpDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Http
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, artifact: &Artifact, path: &Path) -> Result<()> {
        let location = artifact
            .http()
            .ok_or_else(|| wrong_location(DriverKind::Http, artifact))?;

        run_command(&self.download_command(&location.url, &path_arg(path)))
            .await
            .map_err(|e| ArtifactError::driver_op("http", "load", &artifact.name, e))?;
        Ok(())
    }

    async fn save(&self, _path: &Path, _artifact: &Artifact) -> Result<()> {
        Err(ArtifactError::not_supported("http", "save"))
    }
}
