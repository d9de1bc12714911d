//! Secret resolution capability and credential values.
//!
//! The factory never talks to a secret store directly. It receives a
//! [`SecretResolver`] and asks it for `(name, key)` pairs; whatever comes back
//! is wrapped in a [`Credential`] owned by the driver being built.

use crate::Result;
use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Plaintext credential hydrated into a driver.
///
/// - `Debug` and `Display` print `[REDACTED]`
/// - serialization writes `"[REDACTED]"`, never the value
/// - the buffer is zeroed on drop
///
/// Values are raw bytes: keytabs and credential caches are binary. The
/// empty credential means "not configured".
///
/// ```
/// use artifactmux::Credential;
///
/// let key = Credential::new("AKIAEXAMPLE");
/// assert_eq!(format!("{:?}", key), "Credential([REDACTED])");
/// assert_eq!(key.expose(), "AKIAEXAMPLE");
/// assert!(Credential::default().is_empty());
///
/// let keytab = Credential::from_bytes(vec![0x05, 0x02, 0xff]);
/// assert_eq!(keytab.expose_bytes(), b"\x05\x02\xff");
/// assert!(!keytab.is_text());
/// ```
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential(Vec<u8>);

impl Credential {
    /// Wraps a plaintext value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().into_bytes())
    }

    /// Wraps raw bytes.
    pub fn from_bytes(value: impl Into<Vec<u8>>) -> Self {
        Self(value.into())
    }

    /// Returns the plaintext as text. Never log the result.
    ///
    /// A credential that is not valid UTF-8 yields the empty string; use
    /// [`expose_bytes`](Self::expose_bytes) for binary material.
    pub fn expose(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Returns the raw bytes. Never log the result.
    pub fn expose_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true when the value is valid UTF-8.
    pub fn is_text(&self) -> bool {
        std::str::from_utf8(&self.0).is_ok()
    }

    /// Returns true when no credential was configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Credential {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Serialize for Credential {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

/// Fetches secret plaintext by name and key.
///
/// Implementations must be cheap to call repeatedly: the factory may call
/// `get_secret` zero or more times per construction, and never retries.
/// Errors are returned to the caller of the factory unchanged, so they
/// should be one of the secret-resolution variants of
/// [`ArtifactError`](crate::ArtifactError).
///
/// # Example
///
/// ```
/// use artifactmux::{ArtifactError, Credential, Result, SecretResolver};
/// use async_trait::async_trait;
///
/// struct EnvResolver;
///
/// #[async_trait]
/// impl SecretResolver for EnvResolver {
///     async fn get_secret(&self, name: &str, key: &str) -> Result<Credential> {
///         let var = format!("{}_{}", name, key).to_uppercase().replace('-', "_");
///         std::env::var(&var)
///             .map(Credential::from)
///             .map_err(|_| ArtifactError::SecretNotFound {
///                 name: name.to_string(),
///                 key: key.to_string(),
///             })
///     }
/// }
/// ```
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Returns the plaintext stored under `key` in secret `name`.
    async fn get_secret(&self, name: &str, key: &str) -> Result<Credential>;
}

#[async_trait]
impl<T: SecretResolver + ?Sized> SecretResolver for std::sync::Arc<T> {
    async fn get_secret(&self, name: &str, key: &str) -> Result<Credential> {
        (**self).get_secret(name, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redaction() {
        let cred = Credential::new("hunter2");
        assert_eq!(format!("{:?}", cred), "Credential([REDACTED])");
        assert_eq!(cred.to_string(), "[REDACTED]");
        assert_eq!(serde_json::to_string(&cred).unwrap(), "\"[REDACTED]\"");
        assert_eq!(cred.expose(), "hunter2");
    }

    #[test]
    fn test_credential_empty() {
        assert!(Credential::default().is_empty());
        assert!(!Credential::from("x").is_empty());
    }

    #[test]
    fn test_binary_credential() {
        let bytes = vec![0x05, 0x02, 0x00, 0x00, 0x00, 0x45, 0xff, 0xfe];
        let cred = Credential::from(bytes.clone());

        assert_eq!(cred.expose_bytes(), bytes.as_slice());
        assert!(!cred.is_text());
        assert_eq!(cred.expose(), "");
        assert_eq!(format!("{:?}", cred), "Credential([REDACTED])");

        assert!(Credential::new("text").is_text());
    }
}
