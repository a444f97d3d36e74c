//! Command-line surface
//!
//! Accepts the historical single-dash form (`-certType=devel`) alongside the
//! usual `--certType=devel`; [`normalize_args`] rewrites the former before
//! clap sees it.

use crate::config::CertificateType;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Long option names that may be written with a single dash
const LONG_OPTIONS: &[&str] = &[
    "certType",
    "outDir",
    "password",
    "authKey",
    "authenticodePassword",
    "certStore",
    "root",
    "config",
    "unattended",
    "verbose",
];

#[derive(Debug, Parser)]
#[command(name = "bp_sign")]
#[command(version, about = "Create signing certificates, sign files and verify signatures")]
pub struct Cli {
    /// Log tool invocations and backend output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Never prompt for passwords; fail instead
    #[arg(long, global = true)]
    pub unattended: bool,

    /// Directory holding devel/ and prod/ key material
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Settings file (TOML); defaults to bp_sign.toml in the key root
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a private key and self-signed certificate
    #[command(name = "makeCerts", alias = "make-certs")]
    MakeCerts {
        #[arg(long = "certType", value_enum)]
        cert_type: CertificateType,

        #[arg(long = "outDir")]
        out_dir: PathBuf,

        /// Encrypt the private key with this password
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign files (signtool for .exe/.dll/.cab on Windows, detached .sig otherwise)
    Sign {
        #[arg(long = "certType", value_enum)]
        cert_type: CertificateType,

        /// Private key password
        #[arg(long)]
        password: Option<String>,

        /// PKCS#12 (.pfx) key container for Authenticode signing
        #[arg(long = "authKey")]
        auth_key: Option<PathBuf>,

        /// Password for the Authenticode key container
        #[arg(long = "authenticodePassword")]
        authenticode_password: Option<String>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Verify signatures
    Verify {
        /// Trust store to verify detached signatures against
        #[arg(long = "certStore")]
        cert_store: Option<PathBuf>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Rewrite `-name[=value]` to `--name[=value]` for known long options, and a
/// trailing `help` directly after the subcommand to `--help`.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out: Vec<OsString> = Vec::new();
    for (index, arg) in args.into_iter().map(Into::into).enumerate() {
        let rewritten = match arg.to_str() {
            Some("help") if index == 2 => Some(OsString::from("--help")),
            Some(text) if is_legacy_option(text) => Some(OsString::from(format!("-{text}"))),
            _ => None,
        };
        out.push(rewritten.unwrap_or(arg));
    }
    out
}

fn is_legacy_option(arg: &str) -> bool {
    let Some(body) = arg.strip_prefix('-') else {
        return false;
    };
    if body.starts_with('-') {
        return false;
    }
    let name = body.split_once('=').map_or(body, |(name, _)| name);
    LONG_OPTIONS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(normalize_args(args.iter().copied()))
    }

    #[test]
    fn legacy_single_dash_options() {
        let normalized = normalize_args(["bp_sign", "sign", "-certType=devel", "-password=x", "a.txt"]);
        assert_eq!(
            normalized,
            os(&["bp_sign", "sign", "--certType=devel", "--password=x", "a.txt"])
        );
    }

    #[test]
    fn short_flags_and_files_are_untouched() {
        let normalized = normalize_args(["bp_sign", "-v", "verify", "-weird.txt", "--certStore=s"]);
        assert_eq!(normalized, os(&["bp_sign", "-v", "verify", "-weird.txt", "--certStore=s"]));
    }

    #[test]
    fn parses_make_certs() {
        let cli = parse(&["bp_sign", "makeCerts", "-certType=prod", "-outDir=/tmp/keys"]).unwrap();
        match cli.command {
            Command::MakeCerts {
                cert_type,
                out_dir,
                password,
            } => {
                assert_eq!(cert_type, CertificateType::Prod);
                assert_eq!(out_dir, PathBuf::from("/tmp/keys"));
                assert!(password.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_sign_with_all_options() {
        let cli = parse(&[
            "bp_sign",
            "sign",
            "-certType=devel",
            "-password=pw",
            "-authKey=keys/yahoo.pfx",
            "-authenticodePassword=pw2",
            "a.exe",
            "b.zip",
        ])
        .unwrap();
        match cli.command {
            Command::Sign {
                cert_type,
                password,
                auth_key,
                authenticode_password,
                files,
            } => {
                assert_eq!(cert_type, CertificateType::Devel);
                assert_eq!(password.as_deref(), Some("pw"));
                assert_eq!(auth_key, Some(PathBuf::from("keys/yahoo.pfx")));
                assert_eq!(authenticode_password.as_deref(), Some("pw2"));
                assert_eq!(files, vec![PathBuf::from("a.exe"), PathBuf::from("b.zip")]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_verify_and_global_flags() {
        let cli = parse(&["bp_sign", "verify", "-certStore=store.pem", "-unattended", "x.sig.txt"]).unwrap();
        assert!(cli.unattended);
        match cli.command {
            Command::Verify { cert_store, files } => {
                assert_eq!(cert_store, Some(PathBuf::from("store.pem")));
                assert_eq!(files, vec![PathBuf::from("x.sig.txt")]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn usage_errors() {
        // missing -certType
        assert!(parse(&["bp_sign", "sign", "a.txt"]).is_err());
        // no files
        assert!(parse(&["bp_sign", "sign", "-certType=devel"]).is_err());
        // unknown certificate type
        assert!(parse(&["bp_sign", "makeCerts", "-certType=test", "-outDir=x"]).is_err());
        // unknown subcommand
        assert!(parse(&["bp_sign", "publish", "a.txt"]).is_err());
        // no subcommand
        assert!(parse(&["bp_sign"]).is_err());
    }

    #[test]
    fn help_after_subcommand() {
        let err = parse(&["bp_sign", "sign", "help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
