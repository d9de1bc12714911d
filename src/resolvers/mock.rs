//! Mock secret resolver for testing.
//!
//! Holds secrets in memory, records every lookup, and can inject errors
//! either globally or for a single `(name, key)` pair.

use crate::{ArtifactError, Credential, Result, SecretResolver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type ErrorFactory = Box<dyn Fn() -> ArtifactError + Send + Sync>;

/// Mock resolver for testing.
///
/// # Example
///
/// ```
/// use artifactmux::resolvers::MockSecretResolver;
/// use artifactmux::{ArtifactError, SecretResolver};
///
/// #[tokio::main]
/// async fn main() -> artifactmux::Result<()> {
///     let resolver = MockSecretResolver::new().with_secret("creds", "user", "admin");
///
///     assert_eq!(resolver.get_secret("creds", "user").await?.expose(), "admin");
///
///     resolver.fail_on("creds", "pass", || {
///         ArtifactError::SecretStoreUnavailable("down".to_string())
///     });
///     assert!(resolver.get_secret("creds", "pass").await.is_err());
///
///     assert_eq!(resolver.call_count(), 2);
///     Ok(())
/// }
/// ```
#[derive(Default)]
pub struct MockSecretResolver {
    secrets: HashMap<(String, String), Vec<u8>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, String)>>,
    error: Mutex<Option<ErrorFactory>>,
    key_errors: Mutex<HashMap<(String, String), ErrorFactory>>,
}

impl MockSecretResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret value. Text and raw bytes are both accepted.
    pub fn with_secret(
        mut self,
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        self.secrets.insert((name.into(), key.into()), value.into());
        self
    }

    /// Delays every lookup, for exercising timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes every lookup fail with the produced error.
    pub fn fail_with(&self, error: impl Fn() -> ArtifactError + Send + Sync + 'static) {
        *lock(&self.error) = Some(Box::new(error));
    }

    /// Makes lookups of one `(name, key)` pair fail with the produced error.
    pub fn fail_on(
        &self,
        name: impl Into<String>,
        key: impl Into<String>,
        error: impl Fn() -> ArtifactError + Send + Sync + 'static,
    ) {
        lock(&self.key_errors).insert((name.into(), key.into()), Box::new(error));
    }

    /// Returns every `(name, key)` looked up, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.calls).clone()
    }

    /// Returns the number of lookups made.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl SecretResolver for MockSecretResolver {
    async fn get_secret(&self, name: &str, key: &str) -> Result<Credential> {
        let pair = (name.to_string(), key.to_string());
        lock(&self.calls).push(pair.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let injected = lock(&self.error)
            .as_ref()
            .map(|error| error())
            .or_else(|| lock(&self.key_errors).get(&pair).map(|error| error()));
        if let Some(err) = injected {
            return Err(err);
        }

        self.secrets
            .get(&pair)
            .map(|value| Credential::from_bytes(value.as_slice()))
            .ok_or_else(|| ArtifactError::SecretNotFound {
                name: pair.0,
                key: pair.1,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_and_recording() {
        let resolver = MockSecretResolver::new()
            .with_secret("a", "x", "1")
            .with_secret("b", "y", "2");

        assert_eq!(resolver.get_secret("b", "y").await.unwrap().expose(), "2");
        assert_eq!(resolver.get_secret("a", "x").await.unwrap().expose(), "1");
        assert_eq!(
            resolver.calls(),
            vec![
                ("b".to_string(), "y".to_string()),
                ("a".to_string(), "x".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_is_not_found() {
        let resolver = MockSecretResolver::new();
        let err = resolver.get_secret("", "").await.unwrap_err();
        assert!(matches!(err, ArtifactError::SecretNotFound { .. }));
    }

    #[tokio::test]
    async fn test_error_injection() {
        let resolver = MockSecretResolver::new().with_secret("a", "x", "1");
        resolver.fail_on("a", "y", || ArtifactError::SecretAccessDenied {
            name: "a".to_string(),
            key: "y".to_string(),
        });

        assert!(resolver.get_secret("a", "x").await.is_ok());
        assert!(matches!(
            resolver.get_secret("a", "y").await,
            Err(ArtifactError::SecretAccessDenied { .. })
        ));

        resolver.fail_with(|| ArtifactError::SecretStoreUnavailable("down".to_string()));
        assert!(matches!(
            resolver.get_secret("a", "x").await,
            Err(ArtifactError::SecretStoreUnavailable(_))
        ));
    }
}
