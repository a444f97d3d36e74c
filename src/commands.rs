//! The three subcommands, wired to the components.

use crate::certs::{CertificateStore, KeyPair};
use crate::classify::SigningTarget;
use crate::config::{CertificateType, Settings};
use crate::credential::{CredentialSource, Credentials, Secret};
use crate::environment::Environment;
use crate::error::Result;
use crate::runner::ToolRunner;
use crate::signing::{SignOutcome, SigningDispatcher};
use crate::verification::VerificationDispatcher;
use std::path::PathBuf;

/// Shared state for one invocation.
pub struct Context<'a> {
    pub env: &'a Environment,
    pub settings: &'a Settings,
    pub runner: &'a dyn ToolRunner,
    /// Used for any credential not supplied on the command line
    pub fallback: CredentialSource,
}

impl Context<'_> {
    fn certificate_store(&self) -> CertificateStore {
        CertificateStore::new(
            self.env.tool_root.clone(),
            self.settings.signer_identity.clone(),
            self.env.openssl.clone(),
        )
    }

    fn absolute(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            self.env.working_dir.join(path)
        }
    }

    fn targets(&self, files: &[PathBuf]) -> Vec<SigningTarget> {
        files
            .iter()
            .map(|f| SigningTarget::new(f, &self.env.working_dir, self.env.platform))
            .collect()
    }

    /// Supplied value, else the development default for `devel`, else the fallback.
    fn credential_source(&self, cert_type: CertificateType, supplied: Option<Secret>) -> CredentialSource {
        if cert_type.is_devel() {
            let default = CredentialSource::Supplied(self.settings.devel_secret());
            CredentialSource::supplied_or(supplied, &default)
        } else {
            CredentialSource::supplied_or(supplied, &self.fallback)
        }
    }
}

pub struct MakeCertsArgs {
    pub cert_type: CertificateType,
    pub out_dir: PathBuf,
    pub password: Option<Secret>,
}

pub struct SignArgs {
    pub cert_type: CertificateType,
    pub password: Option<Secret>,
    pub auth_key: Option<PathBuf>,
    pub authenticode_password: Option<Secret>,
    pub files: Vec<PathBuf>,
}

pub struct VerifyArgs {
    pub cert_store: Option<PathBuf>,
    pub files: Vec<PathBuf>,
}

pub async fn make_certs(ctx: &Context<'_>, args: MakeCertsArgs) -> Result<KeyPair> {
    let store = ctx.certificate_store();
    status!(
        "Making {} {} certificate",
        store.signer_identity(),
        args.cert_type.display_name()
    );

    let out_dir = ctx.absolute(args.out_dir);
    if args.password.is_none() && !args.cert_type.is_devel() {
        warn!("No -password given; the production private key will be stored unencrypted");
    }

    let key_pair = store
        .create_key_pair(ctx.runner, args.cert_type, &out_dir, args.password.as_ref())
        .await?;

    success!("Private key: {}", key_pair.private_key().display());
    success!("Certificate: {}", key_pair.public_key().display());
    Ok(key_pair)
}

pub async fn sign(ctx: &Context<'_>, args: SignArgs) -> Result<Vec<SignOutcome>> {
    let key_pair = ctx.certificate_store().resolve_key_pair(args.cert_type);
    let credentials = Credentials::new(
        ctx.credential_source(args.cert_type, args.authenticode_password),
        ctx.credential_source(args.cert_type, args.password),
    );

    let mut dispatcher = SigningDispatcher::new(ctx.runner, ctx.env.bpsigner.clone(), key_pair, credentials)
        .with_auth_key(args.auth_key.map(|k| ctx.absolute(k)))
        .with_timestamp_url(ctx.settings.timestamp_url.clone());

    let outcomes = dispatcher.sign_all(&ctx.targets(&args.files)).await?;
    success!("Signed {} file(s)", outcomes.len());
    Ok(outcomes)
}

pub async fn verify(ctx: &Context<'_>, args: VerifyArgs) -> Result<usize> {
    let dispatcher = VerificationDispatcher::new(ctx.runner, ctx.env.bpsigner.clone())
        .with_cert_store(args.cert_store.map(|s| ctx.absolute(s)));

    let verified = dispatcher.verify_all(&ctx.targets(&args.files)).await?;
    success!("Verified {verified} file(s)");
    Ok(verified)
}
