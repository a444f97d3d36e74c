//! Error types for key generation, signing and verification.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignError>;

#[derive(Debug, Error)]
pub enum SignError {
    /// Missing environment variable, nonexistent path or missing bundled tool.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Usage error: {0}")]
    Usage(String),

    /// Native backend tool is not on the search path.
    #[error("{tool} not in PATH. {hint}")]
    ToolNotFound { tool: String, hint: String },

    #[error("Certificate generation failed: {0}")]
    Generation(String),

    #[error("Signing {} failed: {reason}", .path.display())]
    SigningFailed { path: PathBuf, reason: String },

    #[error("Verifying {} failed: {reason}", .path.display())]
    VerificationFailed { path: PathBuf, reason: String },

    /// A credential was required but could not be obtained.
    #[error("{0} is required but no password was supplied and prompting is disabled")]
    CredentialUnavailable(String),

    #[error("Password prompt failed: {0}")]
    Prompt(String),

    #[error("Command execution failed: {0}")]
    CommandExecution(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SignError {
    /// Process exit status for this failure.
    ///
    /// Usage-class failures share clap's status so scripts can tell a bad
    /// invocation apart from a failed signing run.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::CredentialUnavailable(_) => 2,
            _ => 1,
        }
    }
}
