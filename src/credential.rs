//! Password acquisition for the signing backends
//!
//! Each backend needs its own secret: the Authenticode password unlocks the
//! `.pfx` handed to signtool, the store password unlocks the generic private
//! key. A secret is obtained the first time a file needs it and then reused
//! for the rest of the invocation.

use crate::error::{Result, SignError};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A password held in memory only. Wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

/// Which backend a credential unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Authenticode,
    Store,
}

impl CredentialKind {
    #[must_use]
    pub fn prompt_label(&self) -> &'static str {
        match self {
            Self::Authenticode => "Authenticode signing password",
            Self::Store => "BrowserPlus signing password",
        }
    }
}

/// Reads a secret from an operator. Blocking.
pub trait Prompter: Send + Sync {
    fn read_secret(&self, label: &str) -> Result<Secret>;
}

/// Prompts on stdout and reads one line from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn read_secret(&self, label: &str) -> Result<Secret> {
        print!("{label}: ");
        io::stdout().flush()?;

        let mut input = String::new();
        let bytes_read = io::stdin().read_line(&mut input)?;

        // EOF (Ctrl+D) or a closed stdin
        if bytes_read == 0 {
            input.zeroize();
            return Err(SignError::Prompt(format!("no input for {label}")));
        }

        let secret = Secret::new(input.trim_end_matches(['\r', '\n']));
        input.zeroize();
        Ok(secret)
    }
}

/// Where a credential comes from when a backend first asks for it.
#[derive(Clone)]
pub enum CredentialSource {
    /// Given on the command line, or the development default.
    Supplied(Secret),
    /// Ask the operator, waiting at most `timeout`.
    Interactive {
        prompter: Arc<dyn Prompter>,
        timeout: Duration,
    },
    /// Never prompt; needing the credential is an error.
    Unattended,
}

impl CredentialSource {
    pub fn interactive(prompter: impl Prompter + 'static, timeout: Duration) -> Self {
        Self::Interactive {
            prompter: Arc::new(prompter),
            timeout,
        }
    }

    /// Use `supplied` when present, otherwise `fallback`.
    pub fn supplied_or(supplied: Option<Secret>, fallback: &CredentialSource) -> Self {
        match supplied {
            Some(secret) => Self::Supplied(secret),
            None => fallback.clone(),
        }
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supplied(_) => f.write_str("Supplied"),
            Self::Interactive { timeout, .. } => {
                write!(f, "Interactive(timeout = {}s)", timeout.as_secs())
            }
            Self::Unattended => f.write_str("Unattended"),
        }
    }
}

/// Invocation-scoped credential cache, one slot per backend.
#[derive(Debug)]
pub struct Credentials {
    authenticode: CredentialSource,
    store: CredentialSource,
    authenticode_cached: Option<Secret>,
    store_cached: Option<Secret>,
}

impl Credentials {
    pub fn new(authenticode: CredentialSource, store: CredentialSource) -> Self {
        Self {
            authenticode,
            store,
            authenticode_cached: None,
            store_cached: None,
        }
    }

    /// Return the credential for `kind`, acquiring it on first use.
    pub async fn obtain(&mut self, kind: CredentialKind) -> Result<Secret> {
        let (source, cached) = match kind {
            CredentialKind::Authenticode => (&self.authenticode, &mut self.authenticode_cached),
            CredentialKind::Store => (&self.store, &mut self.store_cached),
        };

        if let Some(secret) = cached {
            return Ok(secret.clone());
        }

        tracing::debug!(?kind, ?source, "acquiring credential");
        let secret = match source {
            CredentialSource::Supplied(secret) => secret.clone(),
            CredentialSource::Interactive { prompter, timeout } => {
                prompt_with_timeout(Arc::clone(prompter), kind.prompt_label(), *timeout).await?
            }
            CredentialSource::Unattended => {
                return Err(SignError::CredentialUnavailable(
                    kind.prompt_label().to_string(),
                ));
            }
        };

        *cached = Some(secret.clone());
        Ok(secret)
    }
}

async fn prompt_with_timeout(
    prompter: Arc<dyn Prompter>,
    label: &'static str,
    timeout: Duration,
) -> Result<Secret> {
    let task = tokio::task::spawn_blocking(move || prompter.read_secret(label));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(SignError::Prompt(join_error.to_string())),
        Err(_) => Err(SignError::Prompt(format!(
            "no {} entered within {} seconds",
            label.to_lowercase(),
            timeout.as_secs()
        ))),
    }
}
