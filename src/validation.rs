//! Descriptor and secret-reference validation.

use crate::{ArtifactError, DriverKind, Result};

/// Maximum allowed length for secret names and keys.
const MAX_NAME_LENGTH: usize = 253;

/// Rejects artifacts that populate more than one backend.
///
/// `populated` lists the backends in dispatch priority order. Zero entries
/// is valid here; the factory reports it as
/// [`ArtifactError::UnsupportedDriver`].
///
/// # Example
///
/// ```
/// use artifactmux::validation::validate_location_count;
/// use artifactmux::DriverKind;
///
/// assert!(validate_location_count("a", &[]).is_ok());
/// assert!(validate_location_count("a", &[DriverKind::Git]).is_ok());
/// assert!(validate_location_count("a", &[DriverKind::S3, DriverKind::Gcs]).is_err());
/// ```
pub fn validate_location_count(artifact: &str, populated: &[DriverKind]) -> Result<()> {
    if populated.len() <= 1 {
        return Ok(());
    }

    let names: Vec<&str> = populated.iter().map(DriverKind::as_str).collect();
    tracing::warn!(artifact = %artifact, backends = %names.join(","), "artifact sets multiple locations");

    Err(ArtifactError::InvalidArtifact(format!(
        "artifact '{}' sets more than one location: {}",
        artifact,
        names.join(", ")
    )))
}

/// Validates one part (name or key) of a secret reference.
///
/// Secret names and keys end up as path components when secrets are read
/// from a mounted volume, so this rejects:
/// - Empty values
/// - Excessive length (>253 characters)
/// - Null bytes and control characters
/// - Path separators and `.`/`..` components
///
/// # Errors
///
/// Returns [`ArtifactError::InvalidSecretRef`] if validation fails.
pub fn validate_secret_part(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ArtifactError::InvalidSecretRef(format!(
            "secret {} cannot be empty",
            what
        )));
    }

    if value.len() > MAX_NAME_LENGTH {
        return Err(ArtifactError::InvalidSecretRef(format!(
            "secret {} exceeds maximum length of {} characters",
            what, MAX_NAME_LENGTH
        )));
    }

    if value.contains('\0') {
        return Err(ArtifactError::InvalidSecretRef(format!(
            "secret {} contains null byte",
            what
        )));
    }

    if value.chars().any(|c| c.is_control()) {
        return Err(ArtifactError::InvalidSecretRef(format!(
            "secret {} contains control characters",
            what
        )));
    }

    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(ArtifactError::InvalidSecretRef(format!(
            "secret {} must be a single path component: {}",
            what, value
        )));
    }

    Ok(())
}

/// Validates a secret reference before it is used as a path.
///
/// # Example
///
/// ```
/// use artifactmux::validation::validate_secret_selector;
///
/// assert!(validate_secret_selector("minio-creds", "accessKey").is_ok());
/// assert!(validate_secret_selector("", "accessKey").is_err());
/// assert!(validate_secret_selector("creds", "../../etc/passwd").is_err());
/// ```
pub fn validate_secret_selector(name: &str, key: &str) -> Result<()> {
    validate_secret_part("name", name)?;
    validate_secret_part("key", key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_selectors() {
        assert!(validate_secret_selector("my-secret", "token").is_ok());
        assert!(validate_secret_selector("git-creds", "id_rsa").is_ok());
        assert!(validate_secret_selector("s3.credentials", "AWS_ACCESS_KEY_ID").is_ok());
        assert!(validate_secret_selector("x", "..hidden").is_ok());
    }

    #[test]
    fn test_empty_parts() {
        let result = validate_secret_selector("", "key");
        assert!(result.unwrap_err().to_string().contains("name cannot be empty"));

        let result = validate_secret_selector("name", "");
        assert!(result.unwrap_err().to_string().contains("key cannot be empty"));
    }

    #[test]
    fn test_too_long() {
        let long_name = "a".repeat(254);
        let result = validate_secret_selector(&long_name, "key");
        assert!(result.unwrap_err().to_string().contains("maximum length"));
    }

    #[test]
    fn test_null_and_control() {
        let result = validate_secret_selector("name\0", "key");
        assert!(result.unwrap_err().to_string().contains("null byte"));

        let result = validate_secret_selector("name", "key\x01");
        assert!(result.unwrap_err().to_string().contains("control"));
    }

    #[test]
    fn test_path_traversal_attempts() {
        let bad = vec!["..", ".", "a/b", "../etc", "a\\b", "/abs"];

        for value in bad {
            let result = validate_secret_selector("name", value);
            assert!(result.is_err(), "Expected '{}' to fail validation", value);
            assert!(matches!(result, Err(ArtifactError::InvalidSecretRef(_))));
        }
    }

    #[test]
    fn test_location_count() {
        assert!(validate_location_count("a", &[DriverKind::Raw]).is_ok());

        let err = validate_location_count("a", &[DriverKind::Http, DriverKind::Raw]).unwrap_err();
        assert!(err.to_string().contains("http, raw"));
    }
}
