//! Error types for driver construction and artifact operations.

use thiserror::Error;

/// Result type alias using [`ArtifactError`].
pub type Result<T> = std::result::Result<T, ArtifactError>;

/// Errors that can occur while building or using an artifact driver.
///
/// Construction only ever fails with a secret-resolution error (see
/// [`ArtifactError::is_secret_failure`]) or a configuration defect
/// ([`ArtifactError::UnsupportedDriver`], [`ArtifactError::InvalidArtifact`]).
/// The remaining variants come from driver operations.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The artifact names no backend, or no driver is registered for it.
    #[error("unsupported artifact driver")]
    UnsupportedDriver,

    /// The artifact descriptor is malformed.
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    /// The referenced secret does not exist.
    #[error("secret not found: {name}/{key}")]
    SecretNotFound {
        /// Secret name
        name: String,
        /// Key within the secret
        key: String,
    },

    /// The resolver is not allowed to read the referenced secret.
    #[error("permission denied reading secret {name}/{key}")]
    SecretAccessDenied {
        /// Secret name
        name: String,
        /// Key within the secret
        key: String,
    },

    /// The secret store could not be reached.
    #[error("secret store unavailable: {0}")]
    SecretStoreUnavailable(String),

    /// The lookup did not finish before the context deadline.
    #[error("timed out resolving secret {name}/{key}")]
    SecretTimeout {
        /// Secret name
        name: String,
        /// Key within the secret
        key: String,
    },

    /// The secret reference itself is malformed.
    #[error("invalid secret reference: {0}")]
    InvalidSecretRef(String),

    /// Operation is not supported by this driver.
    #[error("operation not supported by {driver} driver: {operation}")]
    NotSupported {
        /// Driver name
        driver: String,
        /// Operation name (load or save)
        operation: String,
    },

    /// Required CLI tool is not installed.
    #[error("driver CLI not installed: {0}")]
    DriverNotInstalled(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    CommandFailed(String),

    /// Driver operation failed with context.
    #[error("{driver}: {operation} {artifact}: {source}")]
    DriverOperation {
        /// Driver name
        driver: String,
        /// Operation name (load or save)
        operation: String,
        /// Artifact name
        artifact: String,
        /// Underlying error
        #[source]
        source: Box<ArtifactError>,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ArtifactError {
    /// Creates a driver operation error with context.
    ///
    /// # Example
    ///
    /// ```
    /// use artifactmux::ArtifactError;
    ///
    /// let err = ArtifactError::CommandFailed("exit 1".to_string());
    /// let wrapped = ArtifactError::driver_op("s3", "load", "model", err);
    ///
    /// assert_eq!(
    ///     wrapped.to_string(),
    ///     "s3: load model: command execution failed: exit 1"
    /// );
    /// ```
    pub fn driver_op(
        driver: impl Into<String>,
        operation: impl Into<String>,
        artifact: impl Into<String>,
        err: ArtifactError,
    ) -> Self {
        Self::DriverOperation {
            driver: driver.into(),
            operation: operation.into(),
            artifact: artifact.into(),
            source: Box::new(err),
        }
    }

    /// Creates a not-supported error for a driver operation.
    pub fn not_supported(driver: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::NotSupported {
            driver: driver.into(),
            operation: operation.into(),
        }
    }

    /// Returns true for the unsupported-driver sentinel.
    pub fn is_unsupported_driver(&self) -> bool {
        matches!(self, Self::UnsupportedDriver)
    }

    /// Returns true if the error came from resolving a secret.
    ///
    /// These are environmental failures: the store was down, the reference
    /// did not exist, or access was refused.
    pub fn is_secret_failure(&self) -> bool {
        matches!(
            self,
            Self::SecretNotFound { .. }
                | Self::SecretAccessDenied { .. }
                | Self::SecretStoreUnavailable(_)
                | Self::SecretTimeout { .. }
                | Self::InvalidSecretRef(_)
        )
    }
}
