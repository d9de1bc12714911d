//! Driver kinds and factory configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding [`Config::secret_timeout`] (whole seconds, `0` disables).
pub const ENV_SECRET_TIMEOUT: &str = "ARTIFACTMUX_SECRET_TIMEOUT_SECS";

/// Environment variable overriding [`Config::secrets_dir`].
pub const ENV_SECRETS_DIR: &str = "ARTIFACTMUX_SECRETS_DIR";

/// Artifact driver identifier.
///
/// Each variant corresponds to one storage backend. Drivers must be enabled
/// via Cargo feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    /// S3-compatible object storage
    S3,
    /// Plain HTTP(S) download
    Http,
    /// Git repository checkout
    Git,
    /// Artifactory repository
    Artifactory,
    /// Hadoop distributed filesystem
    Hdfs,
    /// Inline data carried in the descriptor
    Raw,
    /// Alibaba Cloud OSS
    Oss,
    /// Google Cloud Storage
    Gcs,
}

impl DriverKind {
    /// All kinds in the documented dispatch priority order.
    pub const PRIORITY: [DriverKind; 8] = [
        Self::S3,
        Self::Http,
        Self::Git,
        Self::Artifactory,
        Self::Hdfs,
        Self::Raw,
        Self::Oss,
        Self::Gcs,
    ];

    /// Returns the lowercase name used in descriptors and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Http => "http",
            Self::Git => "git",
            Self::Artifactory => "artifactory",
            Self::Hdfs => "hdfs",
            Self::Raw => "raw",
            Self::Oss => "oss",
            Self::Gcs => "gcs",
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration shared by every driver construction.
///
/// Use the builder pattern:
///
/// ```
/// use artifactmux::Config;
/// use std::time::Duration;
///
/// let config = Config::new()
///     .with_secret_timeout(Duration::from_secs(5))
///     .with_secrets_dir("/etc/workflow/secrets")
///     .with_option("aws", "/usr/local/bin/aws");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Deadline for each secret lookup (default: 30 seconds, `None` waits forever)
    pub secret_timeout: Option<Duration>,

    /// Root of the mounted secret volume read by
    /// [`FileSecretResolver`](crate::resolvers::FileSecretResolver)
    pub secrets_dir: PathBuf,

    /// Driver-specific options
    pub options: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            secret_timeout: Some(Duration::from_secs(30)),
            secrets_dir: PathBuf::from("/var/run/artifactmux/secrets"),
            options: HashMap::new(),
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from the process environment.
    ///
    /// Unset variables keep their defaults; a timeout that does not parse
    /// as whole seconds is ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_SECRET_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(0) => config.secret_timeout = None,
                Ok(secs) => config.secret_timeout = Some(Duration::from_secs(secs)),
                Err(_) => tracing::warn!(value = %raw, "ignoring unparsable {}", ENV_SECRET_TIMEOUT),
            }
        }

        if let Ok(dir) = std::env::var(ENV_SECRETS_DIR) {
            if !dir.is_empty() {
                config.secrets_dir = PathBuf::from(dir);
            }
        }

        config
    }

    /// Sets the per-lookup secret timeout.
    pub fn with_secret_timeout(mut self, timeout: Duration) -> Self {
        self.secret_timeout = Some(timeout);
        self
    }

    /// Disables the secret lookup deadline.
    pub fn without_secret_timeout(mut self) -> Self {
        self.secret_timeout = None;
        self
    }

    /// Sets the mounted secret directory.
    pub fn with_secrets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.secrets_dir = dir.into();
        self
    }

    /// Adds a driver-specific option.
    ///
    /// Drivers look up the program they run under its default name, so
    /// `with_option("git", "/opt/git/bin/git")` swaps the git binary.
    /// Recognized keys: `aws`, `curl`, `git`, `hdfs`, `kinit`, `ossutil`, `gcloud`.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Gets a driver-specific option value.
    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }

    /// Returns the program to run for a CLI-backed driver.
    pub fn program(&self, default: &str) -> String {
        self.get_option(default)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}
