//! Git repository driver.
//!
//! Username, password and SSH private key are independent and optional;
//! each is resolved only when its reference is present. With none of them
//! the clone is anonymous or relies on the caller's SSH agent.
//!
//! Credentials reach git without touching argv: username and password via a
//! credential helper that reads `GIT_USERNAME`/`GIT_PASSWORD`, the SSH key
//! via an owner-only file referenced from `GIT_SSH_COMMAND`.

use super::{path_arg, wrong_location};
use crate::artifact::GitArtifact;
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

const CREDENTIAL_HELPER: &str =
    "credential.helper=!f() { echo username=\"$GIT_USERNAME\"; echo password=\"$GIT_PASSWORD\"; }; f";

/// Git driver with resolved credentials.
#[derive(Debug, Clone)]
pub struct GitDriver {
    /// Username, empty when not configured
    pub username: Credential,
    /// Password or token, empty when not configured
    pub password: Credential,
    /// SSH private key, empty when not configured
    pub ssh_private_key: Credential,
    /// Disable SSH host key checking
    pub insecure_ignore_host_key: bool,
    /// git program
    pub program: String,
}

/// Builds a [`GitDriver`] for `location`.
pub async fn create_driver(
    ctx: &Context,
    resolver: &dyn SecretResolver,
    location: &GitArtifact,
) -> Result<GitDriver> {
    let username = ctx
        .resolve_optional(resolver, location.username_secret.as_ref())
        .await?;
    let password = ctx
        .resolve_optional(resolver, location.password_secret.as_ref())
        .await?;
    let ssh_private_key = ctx
        .resolve_optional(resolver, location.ssh_private_key_secret.as_ref())
        .await?;

    Ok(GitDriver {
        username,
        password,
        ssh_private_key,
        insecure_ignore_host_key: location.insecure_ignore_host_key,
        program: ctx.config().program("git"),
    })
}

fn construct<'a>(
    ctx: &'a Context,
    location: &'a ArtifactLocation,
    resolver: &'a dyn SecretResolver,
) -> BoxFuture<'a, Result<Box<dyn ArtifactDriver>>> {
    Box::pin(async move {
        let ArtifactLocation::Git(git) = location else {
            return Err(ArtifactError::UnsupportedDriver);
        };
        let driver = create_driver(ctx, resolver, git).await?;
        Ok(Box::new(driver) as Box<dyn ArtifactDriver>)
    })
}

/// Registers the Git driver.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(DriverKind::Git, construct);
}

/// Single-quotes `value` for the shell git runs `GIT_SSH_COMMAND` through.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

impl GitDriver {
    /// Returns the `GIT_SSH_COMMAND` to use, if any.
    pub fn ssh_command(&self, key_file: Option<&Path>) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();

        if let Some(key) = key_file {
            let key = shell_quote(&key.to_string_lossy());
            parts.push(format!("-i {} -o IdentitiesOnly=yes", key));
        }
        if self.insecure_ignore_host_key {
            parts.push("-o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null".to_string());
        }

        if parts.is_empty() {
            None
        } else {
            Some(format!("ssh {}", parts.join(" ")))
        }
    }

    /// Builds a git invocation with credentials wired in.
    pub fn git_command<I, S>(&self, key_file: Option<&Path>, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = CommandSpec::new(&self.program).env("GIT_TERMINAL_PROMPT", "0");

        if !self.username.is_empty() || !self.password.is_empty() {
            spec = spec
                .args(["-c", "credential.helper=", "-c", CREDENTIAL_HELPER])
                .env("GIT_USERNAME", self.username.clone())
                .env("GIT_PASSWORD", self.password.clone());
        }
        if let Some(ssh) = self.ssh_command(key_file) {
            spec = spec.env("GIT_SSH_COMMAND", ssh);
        }

        spec.args(args)
    }

    /// Builds the clone, fetch, checkout and submodule steps for a load.
    pub fn load_commands(
        &self,
        location: &GitArtifact,
        dst: &str,
        key_file: Option<&Path>,
    ) -> Vec<CommandSpec> {
        let mut clone = vec!["clone".to_string()];
        if let Some(depth) = location.depth {
            clone.push("--depth".to_string());
            clone.push(depth.to_string());
        }
        clone.push(location.repo.clone());
        clone.push(dst.to_string());

        let mut steps = vec![self.git_command(key_file, clone)];

        if !location.fetch.is_empty() {
            let mut fetch = vec!["-C".to_string(), dst.to_string(), "fetch".to_string(), "origin".to_string()];
            fetch.extend(location.fetch.iter().cloned());
            steps.push(self.git_command(key_file, fetch));
        }

        if !location.revision.is_empty() {
            steps.push(self.git_command(key_file, ["-C", dst, "checkout", location.revision.as_str()]));
        }

        if !location.disable_submodules {
            steps.push(self.git_command(
                key_file,
                ["-C", dst, "submodule", "update", "--init", "--recursive"],
            ));
        }

        steps
    }
}

#[async_trait]
impl ArtifactDriver for GitDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Git
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, artifact: &Artifact, path: &Path) -> Result<()> {
        let location = artifact
            .git()
            .ok_or_else(|| wrong_location(DriverKind::Git, artifact))?;
        let wrap = |e| ArtifactError::driver_op("git", "load", &artifact.name, e);

        let key_file = if self.ssh_private_key.is_empty() {
            None
        } else {
            Some(SecretFile::create(&self.ssh_private_key).map_err(wrap)?)
        };

        let dst = path_arg(path);
        for step in self.load_commands(location, &dst, key_file.as_ref().map(SecretFile::path)) {
            run_command(&step).await.map_err(wrap)?;
        }
        Ok(())
    }

    async fn save(&self, _path: &Path, _artifact: &Artifact) -> Result<()> {
        Err(ArtifactError::not_supported("git", "save"))
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::artifact::SecretSelector;
    use crate::resolvers::MockSecretResolver;

    fn resolver() -> MockSecretResolver {
        MockSecretResolver::new()
            .with_secret("git-creds", "username", "octocat")
            .with_secret("git-creds", "password", "ghp_token")
            .with_secret("k", "id_rsa", "PRIVATEKEY")
    }

    #[tokio::test]
    async fn test_no_credentials() {
        let resolver = resolver();
        let location = GitArtifact {
            repo: "https://example.com/repo.git".to_string(),
            ..Default::default()
        };

        let driver = create_driver(&Context::default(), &resolver, &location)
            .await
            .unwrap();
        assert!(driver.username.is_empty());
        assert!(driver.password.is_empty());
        assert!(driver.ssh_private_key.is_empty());
        assert_eq!(resolver.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ssh_key_only() {
        let resolver = resolver();
        let location = GitArtifact {
            ssh_private_key_secret: Some(SecretSelector::new("k", "id_rsa")),
            ..Default::default()
        };

        let driver = create_driver(&Context::default(), &resolver, &location)
            .await
            .unwrap();
        assert_eq!(driver.ssh_private_key.expose(), "PRIVATEKEY");
        assert!(driver.username.is_empty());
        assert!(driver.password.is_empty());
        assert_eq!(resolver.call_count(), 1);
    }

    #[tokio::test]
    async fn test_username_and_password() {
        let location = GitArtifact {
            username_secret: Some(SecretSelector::new("git-creds", "username")),
            password_secret: Some(SecretSelector::new("git-creds", "password")),
            insecure_ignore_host_key: true,
            ..Default::default()
        };

        let driver = create_driver(&Context::default(), &resolver(), &location)
            .await
            .unwrap();
        assert_eq!(driver.username.expose(), "octocat");
        assert_eq!(driver.password.expose(), "ghp_token");
        assert!(driver.insecure_ignore_host_key);
    }

    #[tokio::test]
    async fn test_password_failure_aborts() {
        let resolver = resolver();
        resolver.fail_on("git-creds", "password", || ArtifactError::SecretAccessDenied {
            name: "git-creds".to_string(),
            key: "password".to_string(),
        });
        let location = GitArtifact {
            username_secret: Some(SecretSelector::new("git-creds", "username")),
            password_secret: Some(SecretSelector::new("git-creds", "password")),
            ssh_private_key_secret: Some(SecretSelector::new("k", "id_rsa")),
            ..Default::default()
        };

        let err = create_driver(&Context::default(), &resolver, &location)
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::SecretAccessDenied { .. }));
        assert_eq!(resolver.call_count(), 2);
    }

    #[tokio::test]
    async fn test_load_commands() {
        let location = GitArtifact {
            repo: "git@example.com:org/repo.git".to_string(),
            revision: "v1.2.0".to_string(),
            depth: Some(1),
            fetch: vec!["refs/pull/1/head".to_string()],
            username_secret: Some(SecretSelector::new("git-creds", "username")),
            password_secret: Some(SecretSelector::new("git-creds", "password")),
            ..Default::default()
        };
        let driver = create_driver(&Context::default(), &resolver(), &location)
            .await
            .unwrap();

        let steps = driver.load_commands(&location, "/work/src", None);
        assert_eq!(steps.len(), 4);

        let clone = &steps[0];
        assert_eq!(&clone.args[..4], ["-c", "credential.helper=", "-c", CREDENTIAL_HELPER]);
        assert_eq!(
            &clone.args[4..],
            ["clone", "--depth", "1", "git@example.com:org/repo.git", "/work/src"]
        );
        assert_eq!(clone.env_value("GIT_USERNAME"), Some("octocat"));
        assert_eq!(clone.env_value("GIT_PASSWORD"), Some("ghp_token"));
        assert!(!clone.args.iter().any(|a| a.contains("ghp_token")));

        assert_eq!(&steps[1].args[4..], ["-C", "/work/src", "fetch", "origin", "refs/pull/1/head"]);
        assert_eq!(&steps[2].args[4..], ["-C", "/work/src", "checkout", "v1.2.0"]);
        assert_eq!(steps[3].args.last().map(String::as_str), Some("--recursive"));
    }

    #[tokio::test]
    async fn test_ssh_command() {
        let location = GitArtifact {
            ssh_private_key_secret: Some(SecretSelector::new("k", "id_rsa")),
            insecure_ignore_host_key: true,
            disable_submodules: true,
            ..Default::default()
        };
        let driver = create_driver(&Context::default(), &resolver(), &location)
            .await
            .unwrap();

        let ssh = driver.ssh_command(Some(Path::new("/tmp/key"))).unwrap();
        assert_eq!(
            ssh,
            "ssh -i '/tmp/key' -o IdentitiesOnly=yes -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null"
        );

        let steps = driver.load_commands(&location, "/work/src", Some(Path::new("/tmp/key")));
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].env_value("GIT_SSH_COMMAND"), Some(ssh.as_str()));
        assert_eq!(steps[0].env_value("GIT_USERNAME"), None);
    }

    #[tokio::test]
    async fn test_ssh_command_quotes_key_path() {
        let driver = create_driver(&Context::default(), &resolver(), &GitArtifact::default())
            .await
            .unwrap();

        let ssh = driver
            .ssh_command(Some(Path::new("/tmp/my dir/it's key")))
            .unwrap();
        assert_eq!(ssh, "ssh -i '/tmp/my dir/it'\\''s key' -o IdentitiesOnly=yes");
    }

    #[tokio::test]
    async fn test_save_not_supported() {
        let driver = create_driver(&Context::default(), &resolver(), &GitArtifact::default())
            .await
            .unwrap();
        let err = driver
            .save(Path::new("/tmp/x"), &Artifact::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::NotSupported { .. }));
    }
}
