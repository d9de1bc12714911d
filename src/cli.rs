//! Common utilities for CLI-backed drivers.
//!
//! Drivers describe the process they want as a [`CommandSpec`] and hand it
//! to [`run_command`]. Credentials only ever travel through environment
//! variables, stdin, or a [`SecretFile`]; argv is treated as public.

use crate::{ArtifactError, Credential, Result};
use std::ffi::OsStr;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};

/// A process to run: program, arguments, extra environment and stdin.
///
/// `Debug` shows environment variable names but never their values, and
/// never the stdin payload.
///
/// # Example
///
/// ```
/// use artifactmux::cli::CommandSpec;
///
/// let spec = CommandSpec::new("aws")
///     .args(["s3", "cp", "s3://bucket/key", "/tmp/out"])
///     .env("AWS_SECRET_ACCESS_KEY", "s3cr3t");
///
/// assert_eq!(spec.env_value("AWS_SECRET_ACCESS_KEY"), Some("s3cr3t"));
/// assert!(!format!("{:?}", spec).contains("s3cr3t"));
/// ```
#[derive(Clone, Default)]
pub struct CommandSpec {
    /// Program to execute
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: Vec<(String, Credential)>,
    /// Data written to stdin
    pub stdin: Option<Credential>,
}

impl CommandSpec {
    /// Creates a spec for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<Credential>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the stdin payload.
    pub fn stdin(mut self, data: impl Into<Credential>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Returns the value set for an environment variable.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.expose())
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env)
            .field("stdin", &self.stdin.is_some())
            .finish()
    }
}

/// Executes a command and returns stdout as a string.
///
/// # Errors
///
/// - [`ArtifactError::DriverNotInstalled`] if the program is not found
/// - [`ArtifactError::CommandFailed`] if the exit code is non-zero
/// - [`ArtifactError::Io`] for other spawn or pipe failures
pub async fn run_command(spec: &CommandSpec) -> Result<String> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    cmd.stdin(if spec.stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    for (key, value) in &spec.env {
        cmd.env(key, os_value(value));
    }

    tracing::debug!(program = %spec.program, args = ?spec.args, "running command");

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::DriverNotInstalled(format!("{} command not found", spec.program))
        } else {
            ArtifactError::Io(e)
        }
    })?;

    // A child that exits without draining stdin breaks the pipe; its exit
    // status and stderr take precedence over the write error.
    let mut stdin_result = Ok(());
    if let (Some(data), Some(mut stdin)) = (&spec.stdin, child.stdin.take()) {
        stdin_result = write_stdin(&mut stdin, data).await;
    }

    let output = child.wait_with_output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ArtifactError::CommandFailed(format!(
            "{} failed with exit code {}: {}",
            spec.program,
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    stdin_result?;

    String::from_utf8(output.stdout).map_err(|e| {
        ArtifactError::Other(anyhow::anyhow!("Invalid UTF-8 in command output: {}", e))
    })
}

async fn write_stdin(stdin: &mut ChildStdin, data: &Credential) -> std::io::Result<()> {
    stdin.write_all(data.expose_bytes()).await?;
    stdin.flush().await
}

#[cfg(unix)]
fn os_value(value: &Credential) -> &OsStr {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(value.expose_bytes())
}

#[cfg(not(unix))]
fn os_value(value: &Credential) -> &OsStr {
    OsStr::new(value.expose())
}

/// Owner-only temporary file holding credential material.
///
/// Some CLIs only accept keys from a file (SSH keys, keytabs, service
/// account JSON). The file is created with mode 0600 and removed on drop.
pub struct SecretFile {
    file: NamedTempFile,
}

impl SecretFile {
    /// Writes `contents` to a fresh temporary file.
    pub fn create(contents: &Credential) -> Result<Self> {
        let mut file = tempfile::Builder::new().prefix("artifactmux-").tempfile()?;
        file.write_all(contents.expose_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    /// Creates an empty file for a tool to write into.
    pub fn empty() -> Result<Self> {
        Self::create(&Credential::default())
    }

    /// Returns the file's path.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the file's path as a string for argv or environment use.
    pub fn path_string(&self) -> String {
        self.file.path().to_string_lossy().into_owned()
    }
}

impl fmt::Debug for SecretFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretFile").field("path", &self.path()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_success() {
        let output = run_command(&CommandSpec::new("echo").arg("hello")).await.unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_command_not_found() {
        let result = run_command(&CommandSpec::new("nonexistent-command-12345")).await;
        assert!(matches!(result, Err(ArtifactError::DriverNotInstalled(_))));
    }

    #[tokio::test]
    async fn test_run_command_failure() {
        let result = run_command(&CommandSpec::new("false")).await;
        assert!(matches!(result, Err(ArtifactError::CommandFailed(_))));
    }

    #[tokio::test]
    async fn test_run_command_with_env() {
        let spec = CommandSpec::new("printenv")
            .arg("TEST_VAR")
            .env("TEST_VAR", "test-value");
        let output = run_command(&spec).await.unwrap();
        assert_eq!(output.trim(), "test-value");
    }

    #[tokio::test]
    async fn test_run_command_with_stdin() {
        let spec = CommandSpec::new("cat").stdin("hello from stdin");
        let output = run_command(&spec).await.unwrap();
        assert_eq!(output.trim(), "hello from stdin");
    }

    #[test]
    fn test_debug_hides_values() {
        let spec = CommandSpec::new("curl")
            .arg("-K")
            .arg("-")
            .env("TOKEN", "abc123")
            .stdin("user = \"u:p\"");
        let debug = format!("{:?}", spec);
        assert!(debug.contains("TOKEN"));
        assert!(!debug.contains("abc123"));
        assert!(!debug.contains("u:p"));
    }

    #[test]
    fn test_secret_file() {
        let file = SecretFile::create(&Credential::new("-----BEGIN KEY-----")).unwrap();
        let path = file.path().to_path_buf();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "-----BEGIN KEY-----");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_secret_file_keeps_binary_contents() {
        let keytab = vec![0x05, 0x02, 0x00, 0x00, 0x00, 0x45, 0xff, 0xfe];
        let file = SecretFile::create(&Credential::from(keytab.clone())).unwrap();

        assert_eq!(std::fs::read(file.path()).unwrap(), keytab);
    }

    #[tokio::test]
    async fn test_early_exit_reports_stderr_not_broken_pipe() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo refused >&2; exit 3"])
            .stdin("x".repeat(1 << 20));

        let err = run_command(&spec).await.unwrap_err();
        match err {
            ArtifactError::CommandFailed(msg) => {
                assert!(msg.contains("exit code 3"), "{}", msg);
                assert!(msg.contains("refused"), "{}", msg);
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }
}
