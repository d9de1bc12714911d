//! Artifact descriptors.
//!
//! An [`Artifact`] names a file or directory a workflow step consumes or
//! produces, and at most one [`ArtifactLocation`] saying which backend holds
//! it. On the wire the location keeps its historical shape, one optional
//! field per backend:
//!
//! ```yaml
//! name: model
//! s3:
//!   endpoint: minio:9000
//!   bucket: models
//!   key: v3/model.tgz
//!   accessKeySecret: { name: minio-creds, key: accessKey }
//!   secretKeySecret: { name: minio-creds, key: secretKey }
//! ```
//!
//! Deserializing into [`Artifact`] rejects documents that populate more than
//! one backend, so the factory always sees a single, unambiguous location.

use crate::validation::validate_location_count;
use crate::{ArtifactError, DriverKind, Result};
use serde::{Deserialize, Serialize};

/// Reference to one key of an externally held secret.
///
/// An empty `name` means "no credential of this kind configured" for the
/// backends that treat credentials as optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretSelector {
    /// Secret name
    pub name: String,
    /// Key within the secret
    pub key: String,
}

impl SecretSelector {
    /// Creates a new selector.
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }

    /// Returns true when a secret name is set.
    pub fn is_configured(&self) -> bool {
        !self.name.is_empty()
    }
}

impl std::fmt::Display for SecretSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.key)
    }
}

/// S3-compatible object store location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct S3Artifact {
    /// Service endpoint (host[:port])
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Object key, or key prefix for directories
    pub key: String,
    /// Region
    pub region: String,
    /// Talk plain HTTP to the endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    /// Access key reference
    pub access_key_secret: SecretSelector,
    /// Secret key reference
    pub secret_key_secret: SecretSelector,
    /// Role to assume
    #[serde(rename = "roleARN")]
    pub role_arn: String,
    /// Use the SDK's default credential chain
    #[serde(rename = "useSDKCreds")]
    pub use_sdk_creds: bool,
}

/// HTTP(S) location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpArtifact {
    /// URL to download
    pub url: String,
}

/// Git repository location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GitArtifact {
    /// Repository URL
    pub repo: String,
    /// Commit, tag or branch to check out
    pub revision: String,
    /// Shallow clone depth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u64>,
    /// Extra refspecs to fetch before checkout
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fetch: Vec<String>,
    /// Skip submodule initialisation
    pub disable_submodules: bool,
    /// Username reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username_secret: Option<SecretSelector>,
    /// Password reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_secret: Option<SecretSelector>,
    /// SSH private key reference
    #[serde(rename = "sshPrivateKeySecret", skip_serializing_if = "Option::is_none")]
    pub ssh_private_key_secret: Option<SecretSelector>,
    /// Disable SSH host key checking
    pub insecure_ignore_host_key: bool,
}

/// Artifactory location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArtifactoryArtifact {
    /// Full artifact URL
    pub url: String,
    /// Username reference (always resolved)
    pub username_secret: SecretSelector,
    /// Password reference (always resolved)
    pub password_secret: SecretSelector,
}

/// HDFS location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HdfsArtifact {
    /// Namenode addresses (host:port)
    pub addresses: Vec<String>,
    /// Absolute path in HDFS
    pub path: String,
    /// Overwrite on save
    pub force: bool,
    /// User to act as when Kerberos is not used
    #[serde(rename = "hdfsUser")]
    pub hdfs_user: String,
    /// Kerberos credential cache reference
    #[serde(rename = "krbCCacheSecret", skip_serializing_if = "Option::is_none")]
    pub krb_ccache_secret: Option<SecretSelector>,
    /// Kerberos keytab reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub krb_keytab_secret: Option<SecretSelector>,
    /// Kerberos principal user (keytab auth)
    pub krb_username: String,
    /// Kerberos realm (keytab auth)
    pub krb_realm: String,
    /// krb5.conf contents
    pub krb_config: String,
    /// Namenode service principal name
    pub krb_service_principal_name: String,
}

/// Inline data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawArtifact {
    /// File contents
    pub data: String,
}

/// Alibaba Cloud OSS location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OssArtifact {
    /// Service endpoint
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Access key reference
    pub access_key_secret: SecretSelector,
    /// Secret key reference
    pub secret_key_secret: SecretSelector,
}

/// Google Cloud Storage location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GcsArtifact {
    /// Bucket name
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Service account key reference
    pub service_account_key_secret: SecretSelector,
}

/// Where an artifact lives. Exactly one backend per artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    /// S3-compatible object store
    S3(S3Artifact),
    /// HTTP(S) URL
    Http(HttpArtifact),
    /// Git repository
    Git(GitArtifact),
    /// Artifactory repository
    Artifactory(ArtifactoryArtifact),
    /// HDFS
    Hdfs(HdfsArtifact),
    /// Inline data
    Raw(RawArtifact),
    /// Alibaba Cloud OSS
    Oss(OssArtifact),
    /// Google Cloud Storage
    Gcs(GcsArtifact),
}

impl ArtifactLocation {
    /// Returns the driver kind for this location.
    pub fn kind(&self) -> DriverKind {
        match self {
            Self::S3(_) => DriverKind::S3,
            Self::Http(_) => DriverKind::Http,
            Self::Git(_) => DriverKind::Git,
            Self::Artifactory(_) => DriverKind::Artifactory,
            Self::Hdfs(_) => DriverKind::Hdfs,
            Self::Raw(_) => DriverKind::Raw,
            Self::Oss(_) => DriverKind::Oss,
            Self::Gcs(_) => DriverKind::Gcs,
        }
    }
}

/// An artifact and its backend location.
///
/// # Example
///
/// ```
/// use artifactmux::{Artifact, ArtifactLocation, DriverKind};
/// use artifactmux::artifact::RawArtifact;
///
/// let artifact = Artifact::new("greeting").with_location(ArtifactLocation::Raw(RawArtifact {
///     data: "hello".to_string(),
/// }));
/// assert_eq!(artifact.kind(), Some(DriverKind::Raw));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ArtifactSpec", into = "ArtifactSpec")]
pub struct Artifact {
    /// Artifact name
    pub name: String,
    /// Backend location, if any
    pub location: Option<ArtifactLocation>,
}

impl Artifact {
    /// Creates an artifact without a location.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }

    /// Sets the backend location.
    pub fn with_location(mut self, location: ArtifactLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Returns the driver kind, if a location is set.
    pub fn kind(&self) -> Option<DriverKind> {
        self.location.as_ref().map(ArtifactLocation::kind)
    }

    /// Parses an artifact from JSON, rejecting ambiguous locations.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: ArtifactSpec = serde_json::from_str(json)?;
        Self::try_from(spec)
    }

    /// Returns the S3 location, if that is the backend.
    pub fn s3(&self) -> Option<&S3Artifact> {
        match &self.location {
            Some(ArtifactLocation::S3(s3)) => Some(s3),
            _ => None,
        }
    }

    /// Returns the HTTP location, if that is the backend.
    pub fn http(&self) -> Option<&HttpArtifact> {
        match &self.location {
            Some(ArtifactLocation::Http(http)) => Some(http),
            _ => None,
        }
    }

    /// Returns the Git location, if that is the backend.
    pub fn git(&self) -> Option<&GitArtifact> {
        match &self.location {
            Some(ArtifactLocation::Git(git)) => Some(git),
            _ => None,
        }
    }

    /// Returns the Artifactory location, if that is the backend.
    pub fn artifactory(&self) -> Option<&ArtifactoryArtifact> {
        match &self.location {
            Some(ArtifactLocation::Artifactory(art)) => Some(art),
            _ => None,
        }
    }

    /// Returns the HDFS location, if that is the backend.
    pub fn hdfs(&self) -> Option<&HdfsArtifact> {
        match &self.location {
            Some(ArtifactLocation::Hdfs(hdfs)) => Some(hdfs),
            _ => None,
        }
    }

    /// Returns the inline data, if that is the backend.
    pub fn raw(&self) -> Option<&RawArtifact> {
        match &self.location {
            Some(ArtifactLocation::Raw(raw)) => Some(raw),
            _ => None,
        }
    }

    /// Returns the OSS location, if that is the backend.
    pub fn oss(&self) -> Option<&OssArtifact> {
        match &self.location {
            Some(ArtifactLocation::Oss(oss)) => Some(oss),
            _ => None,
        }
    }

    /// Returns the GCS location, if that is the backend.
    pub fn gcs(&self) -> Option<&GcsArtifact> {
        match &self.location {
            Some(ArtifactLocation::Gcs(gcs)) => Some(gcs),
            _ => None,
        }
    }
}

/// Wire form of an [`Artifact`]: one optional field per backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSpec {
    /// Artifact name
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifactory: Option<ArtifactoryArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdfs: Option<HdfsArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oss: Option<OssArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcs: Option<GcsArtifact>,
}

impl ArtifactSpec {
    /// Lists the populated backends in dispatch priority order.
    pub fn populated(&self) -> Vec<DriverKind> {
        DriverKind::PRIORITY
            .into_iter()
            .filter(|kind| match kind {
                DriverKind::S3 => self.s3.is_some(),
                DriverKind::Http => self.http.is_some(),
                DriverKind::Git => self.git.is_some(),
                DriverKind::Artifactory => self.artifactory.is_some(),
                DriverKind::Hdfs => self.hdfs.is_some(),
                DriverKind::Raw => self.raw.is_some(),
                DriverKind::Oss => self.oss.is_some(),
                DriverKind::Gcs => self.gcs.is_some(),
            })
            .collect()
    }
}

impl TryFrom<ArtifactSpec> for Artifact {
    type Error = ArtifactError;

    fn try_from(spec: ArtifactSpec) -> Result<Self> {
        validate_location_count(&spec.name, &spec.populated())?;

        let location = if let Some(s3) = spec.s3 {
            Some(ArtifactLocation::S3(s3))
        } else if let Some(http) = spec.http {
            Some(ArtifactLocation::Http(http))
        } else if let Some(git) = spec.git {
            Some(ArtifactLocation::Git(git))
        } else if let Some(art) = spec.artifactory {
            Some(ArtifactLocation::Artifactory(art))
        } else if let Some(hdfs) = spec.hdfs {
            Some(ArtifactLocation::Hdfs(hdfs))
        } else if let Some(raw) = spec.raw {
            Some(ArtifactLocation::Raw(raw))
        } else if let Some(oss) = spec.oss {
            Some(ArtifactLocation::Oss(oss))
        } else {
            spec.gcs.map(ArtifactLocation::Gcs)
        };

        Ok(Self {
            name: spec.name,
            location,
        })
    }
}

impl From<Artifact> for ArtifactSpec {
    fn from(artifact: Artifact) -> Self {
        let mut spec = ArtifactSpec {
            name: artifact.name,
            ..Default::default()
        };
        match artifact.location {
            Some(ArtifactLocation::S3(s3)) => spec.s3 = Some(s3),
            Some(ArtifactLocation::Http(http)) => spec.http = Some(http),
            Some(ArtifactLocation::Git(git)) => spec.git = Some(git),
            Some(ArtifactLocation::Artifactory(art)) => spec.artifactory = Some(art),
            Some(ArtifactLocation::Hdfs(hdfs)) => spec.hdfs = Some(hdfs),
            Some(ArtifactLocation::Raw(raw)) => spec.raw = Some(raw),
            Some(ArtifactLocation::Oss(oss)) => spec.oss = Some(oss),
            Some(ArtifactLocation::Gcs(gcs)) => spec.gcs = Some(gcs),
            None => {}
        }
        spec
    }
}
