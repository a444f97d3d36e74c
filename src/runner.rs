//! External tool invocation
//!
//! Every tool (openssl, bpsigner, signtool) is launched from an explicit
//! argument vector. Nothing goes through a shell, so paths and passwords
//! containing metacharacters are passed through untouched.

use crate::credential::Secret;
use crate::error::{Result, SignError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Replacement text for secrets in logs and error messages
const REDACTED: &str = "****";

#[derive(Clone)]
enum Arg {
    Plain(OsString),
    Secret { prefix: String, value: Secret },
}

impl Arg {
    fn expose(&self) -> OsString {
        match self {
            Self::Plain(s) => s.clone(),
            Self::Secret { prefix, value } => format!("{prefix}{}", value.expose()).into(),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(s) => f.write_str(&s.to_string_lossy()),
            Self::Secret { prefix, .. } => write!(f, "{prefix}{REDACTED}"),
        }
    }
}

/// A fully described tool invocation: program, argv and extra environment.
///
/// Arguments are kept as `OsString`, so paths reach the child byte for byte
/// even when they are not valid UTF-8. Only `Display` is lossy.
#[derive(Clone)]
pub struct ToolInvocation {
    program: PathBuf,
    args: Vec<Arg>,
    envs: Vec<(String, Arg)>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    /// Append `prefix` immediately followed by a path, e.g. `-in=/tmp/a.txt`.
    #[must_use]
    pub fn path_arg(self, prefix: &str, path: &Path) -> Self {
        let mut arg = OsString::from(prefix);
        arg.push(path.as_os_str());
        self.arg(arg)
    }

    /// Append `prefix` followed by a secret. Shown as `prefix****` when displayed.
    #[must_use]
    pub fn secret_arg(mut self, prefix: &str, secret: &Secret) -> Self {
        self.args.push(Arg::Secret {
            prefix: prefix.to_string(),
            value: secret.clone(),
        });
        self
    }

    #[must_use]
    pub fn env(mut self, key: &str, value: impl Into<OsString>) -> Self {
        self.envs.push((key.to_string(), Arg::Plain(value.into())));
        self
    }

    #[must_use]
    pub fn secret_env(mut self, key: &str, secret: &Secret) -> Self {
        self.envs.push((
            key.to_string(),
            Arg::Secret {
                prefix: String::new(),
                value: secret.clone(),
            },
        ));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Program file name without directories, for messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Real argument vector including secrets. Only for spawning.
    pub fn argv(&self) -> Vec<OsString> {
        self.args.iter().map(Arg::expose).collect()
    }

    /// Real environment additions including secrets. Only for spawning.
    pub fn environment(&self) -> Vec<(String, OsString)> {
        self.envs
            .iter()
            .map(|(k, v)| (k.clone(), v.expose()))
            .collect()
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program_name())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ToolInvocation({self})")
    }
}

/// Captured result of a finished tool.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Short human description of why the tool failed.
    pub fn failure_reason(&self, program: &str) -> String {
        let status = self
            .code
            .map_or_else(|| "was terminated by a signal".to_string(), |c| format!("exited with status {c}"));
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        if detail.is_empty() {
            format!("{program} {status}")
        } else {
            format!("{program} {status}: {detail}")
        }
    }
}

/// Launches external tools and looks them up on the search path.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the invocation to completion.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;

    /// Find `tool` on the search path.
    fn locate(&self, tool: &str) -> Option<PathBuf>;
}

/// Runs tools as child processes with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        tracing::debug!(command = %invocation, "running tool");

        let output = tokio::process::Command::new(invocation.program())
            .args(invocation.argv())
            .envs(invocation.environment())
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| {
                SignError::CommandExecution(format!(
                    "Failed to execute {}: {e}",
                    invocation.program().display()
                ))
            })?;

        let result = ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        tracing::debug!(
            tool = %invocation.program_name(),
            success = result.success,
            code = ?result.code,
            "tool finished"
        );
        Ok(result)
    }

    fn locate(&self, tool: &str) -> Option<PathBuf> {
        which::which(tool).ok()
    }
}
