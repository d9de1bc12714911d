//! Artifactmux - Credentialed artifact drivers behind a single factory.
//!
//! Workflow steps read inputs from and write outputs to many kinds of
//! storage. Artifactmux takes an artifact descriptor naming exactly one
//! backend, resolves the secrets that backend needs through a pluggable
//! [`SecretResolver`], and hands back a ready [`ArtifactDriver`].
//!
//! # Features
//!
//! - **One entry point**: [`factory::new_driver`] covers every backend
//! - **Lazy secrets**: only the secrets a backend actually needs are read,
//!   in a fixed order, and the first failure aborts construction
//! - **Async/Await**: built on tokio, with an optional per-lookup deadline
//! - **Redacted credentials**: [`Credential`] never prints its value and is
//!   zeroed on drop
//! - **Feature Flags**: compile only the backends you need
//!
//! # Quick Start
//!
//! ```no_run
//! use artifactmux::resolvers::FileSecretResolver;
//! use artifactmux::{factory, Artifact, Config, Context};
//!
//! #[tokio::main]
//! async fn main() -> artifactmux::Result<()> {
//!     let config = Config::from_env();
//!     let resolver = FileSecretResolver::from_config(&config);
//!     let ctx = Context::new(config);
//!
//!     let artifact = Artifact::from_json(
//!         r#"{
//!             "name": "model",
//!             "s3": {
//!                 "endpoint": "minio:9000",
//!                 "bucket": "models",
//!                 "key": "v3/model.tgz",
//!                 "accessKeySecret": {"name": "minio-creds", "key": "accessKey"},
//!                 "secretKeySecret": {"name": "minio-creds", "key": "secretKey"}
//!             }
//!         }"#,
//!     )?;
//!
//!     let driver = factory::new_driver(&ctx, &artifact, &resolver).await?;
//!     driver.load(&artifact, "/tmp/model.tgz".as_ref()).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Supported Drivers
//!
//! | Driver | Feature Flag | CLI Required | Secrets |
//! |--------|-------------|--------------|---------|
//! | S3 | `s3` | `aws` | optional access/secret key pair |
//! | HTTP | `http` | `curl` | none |
//! | Git | `git` | `git` | optional username, password, SSH key |
//! | Artifactory | `artifactory` | `curl` | username and password |
//! | HDFS | `hdfs` | `hdfs`, `kinit` | optional Kerberos ccache or keytab |
//! | Raw | `raw` | None | none |
//! | OSS | `oss` | `ossutil` | optional access/secret key pair |
//! | GCS | `gcs` | `gcloud` | optional service account key |
//!
//! # Feature Flags
//!
//! Enable drivers by adding feature flags to `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! artifactmux = { version = "0.1", default-features = false, features = ["s3", "git"] }
//! ```
//!
//! `full` enables every driver. `mock` adds
//! [`MockSecretResolver`](resolvers::MockSecretResolver) for tests.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod context;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod factory;
pub mod resolvers;
pub mod secret;
pub mod validation;

pub use artifact::{Artifact, ArtifactLocation, SecretSelector};
pub use config::{Config, DriverKind};
pub use context::Context;
pub use driver::ArtifactDriver;
pub use error::{ArtifactError, Result};
pub use secret::{Credential, SecretResolver};

/// Initializes the artifactmux library.
///
/// Builds the process-wide driver registry with every compiled-in driver.
/// The registry is also built on first use, so calling this is optional;
/// it is idempotent.
pub fn init() {
    let registry = factory::registry()
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    tracing::debug!(drivers = ?registry.kinds(), "driver registry initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_initialization() {
        init();
        init();
    }

    #[tokio::test]
    async fn test_empty_artifact_is_unsupported() {
        init();

        let resolver = resolvers::FileSecretResolver::new("/nonexistent");
        let result = factory::new_driver(&Context::default(), &Artifact::new("empty"), &resolver).await;

        assert!(matches!(result, Err(ArtifactError::UnsupportedDriver)));
    }
}
