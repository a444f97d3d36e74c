//! Key pair issuance, file signing and signature verification for releases
//!
//! Executables, libraries and cabinets on Windows are signed with signtool;
//! every other file gets a detached `.sig` produced by the bundled bpsigner.
//! Key material is generated with the bundled openssl.

#[macro_use]
pub mod output;

pub mod certs;
pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod credential;
pub mod environment;
pub mod error;
pub mod runner;
pub mod signing;
pub mod verification;

// Re-export common types
pub use certs::{CertificateStore, KeyPair};
pub use classify::{FileClass, PlatformCapabilities, SigningTarget, classify};
pub use config::{CertificateType, Settings};
pub use credential::{CredentialSource, Credentials, Secret};
pub use environment::Environment;
pub use error::{Result, SignError};
pub use runner::{ProcessRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use signing::{SignOutcome, SigningDispatcher};
pub use verification::VerificationDispatcher;
