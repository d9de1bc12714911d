//! Per-construction context.

use crate::artifact::SecretSelector;
use crate::{ArtifactError, Config, Credential, Result, SecretResolver};
use std::time::Duration;

/// Context threaded through driver construction.
///
/// Carries the [`Config`] and the deadline applied to each secret lookup.
/// Cancelling construction is done by dropping its future.
#[derive(Debug, Clone)]
pub struct Context {
    config: Config,
    timeout: Option<Duration>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Context {
    /// Creates a context whose lookups use `config.secret_timeout`.
    pub fn new(config: Config) -> Self {
        let timeout = config.secret_timeout;
        Self { config, timeout }
    }

    /// Overrides the per-lookup timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the per-lookup timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Resolves one secret reference through `resolver`.
    ///
    /// Resolver errors are returned unchanged. Running past the timeout
    /// yields [`ArtifactError::SecretTimeout`].
    pub async fn resolve(
        &self,
        resolver: &dyn SecretResolver,
        selector: &SecretSelector,
    ) -> Result<Credential> {
        tracing::debug!(name = %selector.name, key = %selector.key, "resolving secret");

        let lookup = resolver.get_secret(&selector.name, &selector.key);
        match self.timeout {
            None => lookup.await,
            Some(timeout) => match tokio::time::timeout(timeout, lookup).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!(name = %selector.name, key = %selector.key, "secret lookup timed out");
                    Err(ArtifactError::SecretTimeout {
                        name: selector.name.clone(),
                        key: selector.key.clone(),
                    })
                }
            },
        }
    }

    /// Resolves `selector` only when it names a secret.
    ///
    /// An unconfigured selector yields the empty credential without calling
    /// the resolver.
    pub async fn resolve_if_configured(
        &self,
        resolver: &dyn SecretResolver,
        selector: &SecretSelector,
    ) -> Result<Credential> {
        if !selector.is_configured() {
            return Ok(Credential::default());
        }
        self.resolve(resolver, selector).await
    }

    /// Resolves `selector` only when it is present.
    pub async fn resolve_optional(
        &self,
        resolver: &dyn SecretResolver,
        selector: Option<&SecretSelector>,
    ) -> Result<Credential> {
        match selector {
            Some(selector) => self.resolve(resolver, selector).await,
            None => Ok(Credential::default()),
        }
    }
}
