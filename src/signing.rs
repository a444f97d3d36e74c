//! Signing dispatcher
//!
//! Routes each target to signtool (native executables on Windows) or to the
//! bundled bpsigner (everything else, detached `.sig` sidecar). A batch stops
//! at the first file that cannot be signed.

use crate::certs::KeyPair;
use crate::classify::{FileClass, SigningTarget};
use crate::credential::{CredentialKind, Credentials};
use crate::error::{Result, SignError};
use crate::runner::{ToolInvocation, ToolRunner};
use std::path::{Path, PathBuf};

/// Native signer looked up on the search path
pub const NATIVE_SIGNER: &str = "signtool";

/// Shown when the native signer is missing
pub const NATIVE_SIGNER_HINT: &str =
    "Run the Visual Studio vsvars.bat or install the Windows SDK so signtool.exe is on PATH.";

/// Mode applied to every target before signing: rwxr-xr-x
pub const TARGET_MODE: u32 = 0o755;

/// What was produced for one signed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    /// Signature embedded by the native signer.
    Embedded,
    /// Detached signature written next to the file.
    Detached(PathBuf),
}

pub struct SigningDispatcher<'a> {
    runner: &'a dyn ToolRunner,
    bpsigner: PathBuf,
    key_pair: KeyPair,
    auth_key: Option<PathBuf>,
    timestamp_url: String,
    credentials: Credentials,
}

impl<'a> SigningDispatcher<'a> {
    pub fn new(
        runner: &'a dyn ToolRunner,
        bpsigner: impl Into<PathBuf>,
        key_pair: KeyPair,
        credentials: Credentials,
    ) -> Self {
        Self {
            runner,
            bpsigner: bpsigner.into(),
            key_pair,
            auth_key: None,
            timestamp_url: crate::config::DEFAULT_TIMESTAMP_URL.to_string(),
            credentials,
        }
    }

    /// `.pfx` key container handed to the native signer.
    #[must_use]
    pub fn with_auth_key(mut self, auth_key: Option<PathBuf>) -> Self {
        self.auth_key = auth_key;
        self
    }

    #[must_use]
    pub fn with_timestamp_url(mut self, url: impl Into<String>) -> Self {
        self.timestamp_url = url.into();
        self
    }

    /// Sign every target in order, stopping at the first failure.
    pub async fn sign_all(&mut self, targets: &[SigningTarget]) -> Result<Vec<SignOutcome>> {
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let outcome = self.sign(target).await?;
            success!("Signed {}", target.path().display());
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    pub async fn sign(&mut self, target: &SigningTarget) -> Result<SignOutcome> {
        normalize_permissions(target.path()).await?;

        tracing::debug!(path = %target.path().display(), class = ?target.class(), "signing");
        match target.class() {
            FileClass::NativeExecutable => self.sign_native(target).await,
            FileClass::GenericArtifact => self.sign_generic(target).await,
        }
    }

    async fn sign_native(&mut self, target: &SigningTarget) -> Result<SignOutcome> {
        let signtool = self
            .runner
            .locate(NATIVE_SIGNER)
            .ok_or_else(|| SignError::ToolNotFound {
                tool: NATIVE_SIGNER.to_string(),
                hint: NATIVE_SIGNER_HINT.to_string(),
            })?;

        let auth_key = self.auth_key.clone().ok_or_else(|| {
            SignError::Usage(format!(
                "-authKey=<pfxPath> is required to sign {}",
                target.path().display()
            ))
        })?;

        let password = self.credentials.obtain(CredentialKind::Authenticode).await?;

        let invocation = ToolInvocation::new(signtool)
            .arg("sign")
            .arg("/p")
            .secret_arg("", &password)
            .arg("/f")
            .arg(auth_key)
            .arg("/t")
            .arg(&self.timestamp_url)
            .arg("/v")
            .arg(target.path());

        run_signer(self.runner, &invocation, target.path()).await?;
        Ok(SignOutcome::Embedded)
    }

    async fn sign_generic(&mut self, target: &SigningTarget) -> Result<SignOutcome> {
        if !tokio::fs::try_exists(self.key_pair.private_key()).await? {
            return Err(SignError::SigningFailed {
                path: target.path().to_path_buf(),
                reason: format!(
                    "private key {} not found (create it with makeCerts)",
                    self.key_pair.private_key().display()
                ),
            });
        }

        let password = self.credentials.obtain(CredentialKind::Store).await?;
        let signature = target.signature_path();

        let invocation = ToolInvocation::new(&self.bpsigner)
            .arg("sign")
            .path_arg("-privateKey=", self.key_pair.private_key())
            .path_arg("-publicKey=", self.key_pair.public_key())
            .path_arg("-in=", target.path())
            .path_arg("-out=", &signature)
            .secret_arg("-password=", &password);

        run_signer(self.runner, &invocation, target.path()).await?;
        Ok(SignOutcome::Detached(signature))
    }
}

async fn run_signer(runner: &dyn ToolRunner, invocation: &ToolInvocation, path: &Path) -> Result<()> {
    let output = runner.run(invocation).await?;
    if !output.stdout.trim().is_empty() {
        tracing::debug!(tool = %invocation.program_name(), stdout = %output.stdout.trim(), "tool output");
    }
    if output.success {
        Ok(())
    } else {
        Err(SignError::SigningFailed {
            path: path.to_path_buf(),
            reason: output.failure_reason(&invocation.program_name()),
        })
    }
}

/// Make the target readable and executable by all, writable by its owner.
async fn normalize_permissions(path: &Path) -> Result<()> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| SignError::SigningFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let permissions = target_permissions(metadata.permissions());
    tokio::fs::set_permissions(path, permissions).await?;
    Ok(())
}

#[cfg(unix)]
fn target_permissions(_current: std::fs::Permissions) -> std::fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    std::fs::Permissions::from_mode(TARGET_MODE)
}

#[cfg(not(unix))]
fn target_permissions(mut current: std::fs::Permissions) -> std::fs::Permissions {
    current.set_readonly(false);
    current
}
