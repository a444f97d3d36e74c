use anyhow::Result;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bp_sign::cli::{Cli, Command, normalize_args};
use bp_sign::commands::{self, Context, MakeCertsArgs, SignArgs, VerifyArgs};
use bp_sign::config::{SETTINGS_FILE_NAME, Settings};
use bp_sign::credential::{CredentialSource, Secret, TerminalPrompter};
use bp_sign::environment::{Environment, ResolveOptions};
use bp_sign::{PlatformCapabilities, ProcessRunner, SignError};

// ============================================================================
// ERROR HANDLING STRATEGY
// ============================================================================
//
// CRITICAL I/O - errors propagated with `?` and turned into a nonzero exit:
//   • Environment resolution, settings file, key material checks
//   • External tools: openssl, bpsigner, signtool
//   • Password prompts on stdin
//
// DECORATIVE I/O - errors ignored with `let _ =` inside the output macros:
//   • Colored status lines on stdout/stderr
//
// Usage errors never reach `run`: clap prints usage and exits with status 2
// before anything is resolved or touched.
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            bp_sign::error!("{e:#}");
            e.downcast_ref::<SignError>().map_or(1, SignError::exit_code)
        }
    };

    // Exit without dropping the runtime: a timed-out password prompt can
    // still hold a blocking thread on stdin.
    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let vars: HashMap<String, String> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();

    let working_dir = std::env::current_dir()?;
    let options = ResolveOptions {
        platform: PlatformCapabilities::current(),
        default_root: executable_dir().unwrap_or_else(|| working_dir.clone()),
        working_dir,
        explicit_root: cli.root.clone(),
    };
    let env = Environment::resolve(&vars, options)?;

    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(|| env.tool_root.join(SETTINGS_FILE_NAME));
    let settings = Settings::load(&settings_path, cli.config.is_some()).await?;

    let fallback = if cli.unattended {
        CredentialSource::Unattended
    } else {
        CredentialSource::interactive(TerminalPrompter, settings.prompt_timeout())
    };

    let runner = ProcessRunner;
    let ctx = Context {
        env: &env,
        settings: &settings,
        runner: &runner,
        fallback,
    };

    match cli.command {
        Command::MakeCerts {
            cert_type,
            out_dir,
            password,
        } => {
            commands::make_certs(
                &ctx,
                MakeCertsArgs {
                    cert_type,
                    out_dir,
                    password: password.map(Secret::new),
                },
            )
            .await?;
        }
        Command::Sign {
            cert_type,
            password,
            auth_key,
            authenticode_password,
            files,
        } => {
            commands::sign(
                &ctx,
                SignArgs {
                    cert_type,
                    password: password.map(Secret::new),
                    auth_key,
                    authenticode_password: authenticode_password.map(Secret::new),
                    files,
                },
            )
            .await?;
        }
        Command::Verify { cert_store, files } => {
            commands::verify(&ctx, VerifyArgs { cert_store, files }).await?;
        }
    }

    Ok(())
}

/// Directory of the running executable; the default key root.
fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
}
