//! Certificate store: key pair layout and generation
//!
//! Key material lives at `<root>/<certType>/<identity>.pvk` (private key)
//! and `<root>/<certType>/<identity>.crt` (self-signed certificate).

use crate::config::CertificateType;
use crate::credential::Secret;
use crate::environment::OpenSslTool;
use crate::error::{Result, SignError};
use crate::runner::{ToolInvocation, ToolRunner};
use std::path::{Path, PathBuf};

/// RSA modulus size for generated private keys
pub const KEY_BITS: u32 = 4096;

/// Validity window of generated certificates, in days
pub const CERT_VALIDITY_DAYS: u32 = 5000;

/// Child environment variable carrying the key password to openssl
const KEY_PASSWORD_ENV: &str = "BP_SIGN_KEY_PASSWORD";

/// Public certificate and private key paths for one certificate type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    public_key: PathBuf,
    private_key: PathBuf,
}

impl KeyPair {
    /// Compute the pair's paths. No I/O.
    #[must_use]
    pub fn derive(root: &Path, cert_type: CertificateType, signer_identity: &str) -> Self {
        let dir = root.join(cert_type.dir_name());
        Self {
            public_key: dir.join(format!("{signer_identity}.crt")),
            private_key: dir.join(format!("{signer_identity}.pvk")),
        }
    }

    pub fn public_key(&self) -> &Path {
        &self.public_key
    }

    pub fn private_key(&self) -> &Path {
        &self.private_key
    }
}

#[derive(Debug, Clone)]
pub struct CertificateStore {
    root: PathBuf,
    signer_identity: String,
    openssl: OpenSslTool,
}

impl CertificateStore {
    pub fn new(root: impl Into<PathBuf>, signer_identity: impl Into<String>, openssl: OpenSslTool) -> Self {
        Self {
            root: root.into(),
            signer_identity: signer_identity.into(),
            openssl,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn signer_identity(&self) -> &str {
        &self.signer_identity
    }

    /// Key pair used for signing with `cert_type`.
    #[must_use]
    pub fn resolve_key_pair(&self, cert_type: CertificateType) -> KeyPair {
        KeyPair::derive(&self.root, cert_type, &self.signer_identity)
    }

    /// Generate a fresh private key and self-signed certificate under
    /// `out_dir/<certType>/`.
    ///
    /// The private key is encrypted only when `password` is given. Existing
    /// key material is never overwritten.
    pub async fn create_key_pair(
        &self,
        runner: &dyn ToolRunner,
        cert_type: CertificateType,
        out_dir: &Path,
        password: Option<&Secret>,
    ) -> Result<KeyPair> {
        let key_pair = KeyPair::derive(out_dir, cert_type, &self.signer_identity);

        for existing in [key_pair.private_key(), key_pair.public_key()] {
            if tokio::fs::try_exists(existing).await? {
                return Err(SignError::Generation(format!(
                    "{} already exists; remove it first to issue a new {} key pair",
                    existing.display(),
                    cert_type.display_name()
                )));
            }
        }

        tokio::fs::create_dir_all(out_dir.join(cert_type.dir_name())).await?;

        let genrsa = self.genrsa(&key_pair, password);
        self.run_step(runner, &genrsa, "private key").await?;

        let req = self.self_signed_cert(&key_pair, password);
        self.run_step(runner, &req, "certificate").await?;

        tracing::info!(
            cert_type = cert_type.dir_name(),
            public_key = %key_pair.public_key().display(),
            "key pair created"
        );
        Ok(key_pair)
    }

    fn openssl(&self) -> ToolInvocation {
        ToolInvocation::new(&self.openssl.binary)
            .env("OPENSSL_CONF", &self.openssl.config)
    }

    fn genrsa(&self, key_pair: &KeyPair, password: Option<&Secret>) -> ToolInvocation {
        let mut invocation = self.openssl().arg("genrsa");
        if let Some(password) = password {
            invocation = invocation
                .arg("-des3")
                .arg("-passout")
                .arg(format!("env:{KEY_PASSWORD_ENV}"))
                .secret_env(KEY_PASSWORD_ENV, password);
        }
        invocation
            .arg("-out")
            .arg(key_pair.private_key())
            .arg(KEY_BITS.to_string())
    }

    fn self_signed_cert(&self, key_pair: &KeyPair, password: Option<&Secret>) -> ToolInvocation {
        let mut invocation = self
            .openssl()
            .arg("req")
            .arg("-new")
            .arg("-x509")
            .arg("-days")
            .arg(CERT_VALIDITY_DAYS.to_string())
            .arg("-subj")
            .arg(format!("/CN={}", self.signer_identity));
        if let Some(password) = password {
            invocation = invocation
                .arg("-passin")
                .arg(format!("env:{KEY_PASSWORD_ENV}"))
                .secret_env(KEY_PASSWORD_ENV, password);
        }
        invocation
            .arg("-key")
            .arg(key_pair.private_key())
            .arg("-out")
            .arg(key_pair.public_key())
    }

    async fn run_step(&self, runner: &dyn ToolRunner, invocation: &ToolInvocation, what: &str) -> Result<()> {
        let output = runner
            .run(invocation)
            .await
            .map_err(|e| SignError::Generation(format!("{what}: {e}")))?;

        if !output.success {
            return Err(SignError::Generation(format!(
                "{what}: {}",
                output.failure_reason(&invocation.program_name())
            )));
        }
        Ok(())
    }
}
