//! Verification dispatcher
//!
//! Mirrors the signing dispatcher: native executables are checked by
//! `signtool verify`, everything else by bpsigner against its `.sig`
//! sidecar. Either backend failing stops the batch.

use crate::classify::{FileClass, SigningTarget};
use crate::error::{Result, SignError};
use crate::runner::{ToolInvocation, ToolRunner};
use crate::signing::{NATIVE_SIGNER, NATIVE_SIGNER_HINT};
use std::path::PathBuf;

pub struct VerificationDispatcher<'a> {
    runner: &'a dyn ToolRunner,
    bpsigner: PathBuf,
    cert_store: Option<PathBuf>,
}

impl<'a> VerificationDispatcher<'a> {
    pub fn new(runner: &'a dyn ToolRunner, bpsigner: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            bpsigner: bpsigner.into(),
            cert_store: None,
        }
    }

    /// Trust store handed to bpsigner instead of its built-in default.
    #[must_use]
    pub fn with_cert_store(mut self, cert_store: Option<PathBuf>) -> Self {
        self.cert_store = cert_store;
        self
    }

    /// Verify every target in order, stopping at the first failure.
    pub async fn verify_all(&self, targets: &[SigningTarget]) -> Result<usize> {
        for target in targets {
            self.verify(target).await?;
            success!("Verified {}", target.path().display());
        }
        Ok(targets.len())
    }

    pub async fn verify(&self, target: &SigningTarget) -> Result<()> {
        if !tokio::fs::try_exists(target.path()).await? {
            return Err(self.failed(target, "file not found".to_string()));
        }

        tracing::debug!(path = %target.path().display(), class = ?target.class(), "verifying");
        let invocation = match target.class() {
            FileClass::NativeExecutable => self.native_invocation(target)?,
            FileClass::GenericArtifact => self.generic_invocation(target).await?,
        };

        let output = self.runner.run(&invocation).await?;
        if !output.stdout.trim().is_empty() {
            tracing::debug!(tool = %invocation.program_name(), stdout = %output.stdout.trim(), "tool output");
        }
        if !output.success {
            return Err(self.failed(target, output.failure_reason(&invocation.program_name())));
        }
        Ok(())
    }

    fn native_invocation(&self, target: &SigningTarget) -> Result<ToolInvocation> {
        let signtool = self
            .runner
            .locate(NATIVE_SIGNER)
            .ok_or_else(|| SignError::ToolNotFound {
                tool: NATIVE_SIGNER.to_string(),
                hint: NATIVE_SIGNER_HINT.to_string(),
            })?;

        // /a: accept any trusted chain, /v: verbose diagnostics
        Ok(ToolInvocation::new(signtool)
            .arg("verify")
            .arg("/a")
            .arg("/v")
            .arg(target.path()))
    }

    async fn generic_invocation(&self, target: &SigningTarget) -> Result<ToolInvocation> {
        let signature = target.signature_path();
        if !tokio::fs::try_exists(&signature).await? {
            return Err(self.failed(
                target,
                format!("signature {} not found", signature.display()),
            ));
        }

        let mut invocation = ToolInvocation::new(&self.bpsigner)
            .arg("verify")
            .path_arg("-in=", target.path())
            .path_arg("-signature=", &signature);
        if let Some(cert_store) = &self.cert_store {
            invocation = invocation.path_arg("-certStore=", cert_store);
        }
        Ok(invocation)
    }

    fn failed(&self, target: &SigningTarget, reason: String) -> SignError {
        SignError::VerificationFailed {
            path: target.path().to_path_buf(),
            reason,
        }
    }
}
