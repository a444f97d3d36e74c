//! Certificate types and the optional TOML settings file.

use crate::credential::Secret;
use crate::error::{Result, SignError};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Identity written into generated certificates and used for key file names
pub const DEFAULT_SIGNER_IDENTITY: &str = "BrowserPlus";

/// Timestamp authority passed to the native signer
pub const DEFAULT_TIMESTAMP_URL: &str = "http://timestamp.verisign.com/scripts/timstamp.dll";

/// Well-known password for development certificates only
pub const DEFAULT_DEVEL_PASSWORD: &str = "FreeYourBrowser";

/// How long an interactive password prompt waits for the operator
pub const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 300;

/// Settings file looked up in the tool root when `--config` is not given
pub const SETTINGS_FILE_NAME: &str = "bp_sign.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum CertificateType {
    Devel,
    Prod,
}

impl CertificateType {
    /// Subdirectory of the tool root holding this type's key material
    #[must_use]
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Devel => "devel",
            Self::Prod => "prod",
        }
    }

    /// Human-readable name for messages
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Devel => "development",
            Self::Prod => "production",
        }
    }

    #[must_use]
    pub fn is_devel(&self) -> bool {
        matches!(self, Self::Devel)
    }
}

/// Overrides read from `bp_sign.toml`.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_signer_identity")]
    pub signer_identity: String,

    #[serde(default = "default_timestamp_url")]
    pub timestamp_url: String,

    #[serde(default = "default_prompt_timeout_secs")]
    pub prompt_timeout_secs: u64,

    #[serde(default = "default_devel_password")]
    pub devel_password: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            signer_identity: default_signer_identity(),
            timestamp_url: default_timestamp_url(),
            prompt_timeout_secs: default_prompt_timeout_secs(),
            devel_password: default_devel_password(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("signer_identity", &self.signer_identity)
            .field("timestamp_url", &self.timestamp_url)
            .field("prompt_timeout_secs", &self.prompt_timeout_secs)
            .field("devel_password", &"****")
            .finish()
    }
}

impl Settings {
    /// Load settings from `path`.
    ///
    /// A missing file yields defaults unless `required` is set (the path was
    /// given explicitly), in which case it is a configuration error.
    pub async fn load(path: &Path, required: bool) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(SignError::Configuration(format!(
                    "cannot read settings file {}: {e}",
                    path.display()
                )));
            }
        };

        let settings = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), ?settings, "loaded settings");
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| SignError::Configuration(format!("malformed settings file: {e}")))?;
        if settings.signer_identity.trim().is_empty() {
            return Err(SignError::Configuration(
                "signer_identity must not be empty".to_string(),
            ));
        }
        if settings.prompt_timeout_secs == 0 {
            return Err(SignError::Configuration(
                "prompt_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(settings)
    }

    #[must_use]
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    #[must_use]
    pub fn devel_secret(&self) -> Secret {
        Secret::new(self.devel_password.clone())
    }
}

fn default_signer_identity() -> String {
    DEFAULT_SIGNER_IDENTITY.to_string()
}

fn default_timestamp_url() -> String {
    DEFAULT_TIMESTAMP_URL.to_string()
}

fn default_prompt_timeout_secs() -> u64 {
    DEFAULT_PROMPT_TIMEOUT_SECS
}

fn default_devel_password() -> String {
    DEFAULT_DEVEL_PASSWORD.to_string()
}
