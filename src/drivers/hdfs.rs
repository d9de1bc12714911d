//! HDFS driver.
//!
//! Runs `hdfs dfs -get`/`-put` against the first configured namenode.
//! Authentication is one of:
//!
//! - simple: `HADOOP_USER_NAME` set from `hdfsUser`
//! - Kerberos credential cache: the cache is written to an owner-only file
//!   and exported as `KRB5CCNAME`
//! - Kerberos keytab: `kinit` fills a fresh cache from the keytab before the
//!   transfer
//!
//! Both Kerberos modes need `krbConfig` and `krbServicePrincipalName`; the
//! keytab mode also needs the principal's username and realm. These are
//! checked at construction, before any secret is read.

use super::{path_arg, wrong_location};
use crate::artifact::{HdfsArtifact, SecretSelector};
use crate::cli::{run_command, CommandSpec, SecretFile};
use crate::factory::DriverRegistry;
use crate::{
    Artifact, ArtifactDriver, ArtifactError, ArtifactLocation, Context, Credential, DriverKind,
    Result, SecretResolver,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::Any;
use std::path::Path;

/// HDFS driver with resolved Kerberos material.
#[derive(Debug, Clone)]
pub struct HdfsDriver {
    /// Namenode addresses
    pub addresses: Vec<String>,
    /// Acting user for simple authentication
    pub hdfs_user: String,
    /// Kerberos credential cache, empty when not configured
    pub krb_ccache: Credential,
    /// Kerberos keytab, empty when not configured
    pub krb_keytab: Credential,
    /// Kerberos principal user
    pub krb_username: String,
    /// Kerberos realm
    pub krb_realm: String,
    /// krb5.conf contents
    pub krb_config: String,
    /// Namenode service principal name
    pub krb_service_principal_name: String,
    /// hdfs program
    pub program: String,
    /// kinit program
    pub kinit_program: String,
}

fn has_secret(selector: Option<&SecretSelector>) -> bool {
    selector.is_some_and(|s| s.is_configured())
}

/// Checks that the Kerberos fields needed by the chosen mode are present.
pub fn validate(location: &HdfsArtifact) -> Result<()> {
    let keytab = has_secret(location.krb_keytab_secret.as_ref());
    let ccache = has_secret(location.krb_ccache_secret.as_ref());

    if keytab && (location.krb_username.is_empty() || location.krb_realm.is_empty()) {
        return Err(ArtifactError::InvalidArtifact(
            "hdfs: keytab authentication requires krbUsername and krbRealm".to_string(),
        ));
    }
    if keytab || ccache {
        if location.krb_config.is_empty() {
            return Err(ArtifactError::InvalidArtifact(
                "hdfs: kerberos authentication requires krbConfig".to_string(),
            ));
        }
        if location.krb_service_principal_name.is_empty() {
            return Err(ArtifactError::InvalidArtifact(
                "hdfs: kerberos authentication requires krbServicePrincipalName".to_string(),
            ));
        }
    }

    Ok(())
}

/// Builds an [`HdfsDriver`] for `location`.
///
/// The location is validated before any secret is read.
pub async fn create_driver(
    ctx: &Context,
    resolver: &dyn SecretResolver,
    location: &HdfsArtifact,
) -> Result<HdfsDriver> {
    validate(location)?;

    let mut krb_ccache = Credential::default();
    if let Some(selector) = &location.krb_ccache_secret {
        krb_ccache = ctx.resolve_if_configured(resolver, selector).await?;
    }

    let mut krb_keytab = Credential::default();
    if let Some(selector) = &location.krb_keytab_secret {
        krb_keytab = ctx.resolve_if_configured(resolver, selector).await?;
    }

    Ok(HdfsDriver {
        addresses: location.addresses.clone(),
        hdfs_user: location.hdfs_user.clone(),
        krb_ccache,
        krb_keytab,
        krb_username: location.krb_username.clone(),
        krb_realm: location.krb_realm.clone(),
        krb_config: location.krb_config.clone(),
        krb_service_principal_name: location.krb_service_principal_name.clone(),
        program: ctx.config().program("hdfs"),
        kinit_program: ctx.config().program("kinit"),
    })
}

fn construct<'a>(
    ctx: &'a Context,
    location: &'a ArtifactLocation,
    resolver: &'a dyn SecretResolver,
) -> BoxFuture<'a, Result<Box<dyn ArtifactDriver>>> {
    Box::pin(async move {
        let ArtifactLocation::Hdfs(hdfs) = location else {
            return Err(ArtifactError::UnsupportedDriver);
        };
        let driver = create_driver(ctx, resolver, hdfs).await?;
        Ok(Box::new(driver) as Box<dyn ArtifactDriver>)
    })
}

/// Registers the HDFS driver.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(DriverKind::Hdfs, construct);
}

/// Files handed to the Kerberos tooling. Removed on drop.
struct KerberosFiles {
    config: SecretFile,
    ccache: SecretFile,
    keytab: Option<SecretFile>,
}

impl HdfsDriver {
    /// Returns true when Kerberos authentication is configured.
    pub fn uses_kerberos(&self) -> bool {
        !self.krb_ccache.is_empty() || !self.krb_keytab.is_empty()
    }

    /// Returns the `hdfs://` filesystem URI of the first namenode.
    pub fn filesystem_uri(&self) -> String {
        let address = self.addresses.first().map(String::as_str).unwrap_or_default();
        format!("hdfs://{}", address)
    }

    /// Returns the Kerberos principal used with a keytab.
    pub fn principal(&self) -> String {
        format!("{}@{}", self.krb_username, self.krb_realm)
    }

    /// Builds an `hdfs dfs` invocation.
    ///
    /// `krb` carries the paths of the krb5.conf and credential cache files
    /// when Kerberos is in use.
    pub fn dfs_command<I, S>(&self, krb: Option<(&str, &str)>, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = CommandSpec::new(&self.program).arg("dfs");

        match krb {
            Some((config, ccache)) => {
                spec = spec
                    .arg("-D")
                    .arg("hadoop.security.authentication=kerberos")
                    .arg("-D")
                    .arg(format!(
                        "dfs.namenode.kerberos.principal={}",
                        self.krb_service_principal_name
                    ))
                    .env("KRB5_CONFIG", config)
                    .env("KRB5CCNAME", ccache);
            }
            None => {
                if !self.hdfs_user.is_empty() {
                    spec = spec.env("HADOOP_USER_NAME", self.hdfs_user.as_str());
                }
            }
        }

        spec.arg("-fs").arg(self.filesystem_uri()).args(args)
    }

    /// Builds the `kinit` invocation that fills `ccache` from `keytab`.
    pub fn kinit_command(&self, config: &str, keytab: &str, ccache: &str) -> CommandSpec {
        CommandSpec::new(&self.kinit_program)
            .args(["-kt", keytab, "-c", ccache])
            .arg(self.principal())
            .env("KRB5_CONFIG", config)
    }

    async fn kerberos_files(&self) -> Result<Option<KerberosFiles>> {
        if !self.uses_kerberos() {
            return Ok(None);
        }

        let config = SecretFile::create(&Credential::new(self.krb_config.as_str()))?;

        if self.krb_keytab.is_empty() {
            let ccache = SecretFile::create(&self.krb_ccache)?;
            return Ok(Some(KerberosFiles {
                config,
                ccache,
                keytab: None,
            }));
        }

        let keytab = SecretFile::create(&self.krb_keytab)?;
        let ccache = SecretFile::empty()?;
        let kinit = self.kinit_command(
            &config.path_string(),
            &keytab.path_string(),
            &ccache.path_string(),
        );
        run_command(&kinit).await?;

        Ok(Some(KerberosFiles {
            config,
            ccache,
            keytab: Some(keytab),
        }))
    }

    async fn run_dfs(&self, args: [&str; 3], force: bool) -> Result<()> {
        if self.addresses.is_empty() {
            return Err(ArtifactError::InvalidArtifact(
                "hdfs: at least one namenode address is required".to_string(),
            ));
        }

        let files = self.kerberos_files().await?;
        let paths = files
            .as_ref()
            .map(|f| (f.config.path_string(), f.ccache.path_string()));
        tracing::debug!(
            kerberos = files.is_some(),
            keytab = files.as_ref().is_some_and(|f| f.keytab.is_some()),
            "running hdfs transfer"
        );

        let mut dfs_args: Vec<&str> = vec![args[0]];
        if force {
            dfs_args.push("-f");
        }
        dfs_args.extend_from_slice(&args[1..]);

        let spec = self.dfs_command(
            paths.as_ref().map(|(c, k)| (c.as_str(), k.as_str())),
            dfs_args,
        );
        run_command(&spec).await?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactDriver for HdfsDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Hdfs
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, artifact: &Artifact, path: &Path) -> Result<()> {
        let location = artifact
            .hdfs()
            .ok_or_else(|| wrong_location(DriverKind::Hdfs, artifact))?;

        let dst = path_arg(path);
        self.run_dfs(["-get", location.path.as_str(), dst.as_str()], false)
            .await
            .map_err(|e| ArtifactError::driver_op("hdfs", "load", &artifact.name, e))
    }

    async fn save(&self, path: &Path, artifact: &Artifact) -> Result<()> {
        let location = artifact
            .hdfs()
            .ok_or_else(|| wrong_location(DriverKind::Hdfs, artifact))?;

        let src = path_arg(path);
        self.run_dfs(["-put", src.as_str(), location.path.as_str()], location.force)
            .await
            .map_err(|e| ArtifactError::driver_op("hdfs", "save", &artifact.name, e))
    }
}
