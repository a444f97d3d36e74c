//! Startup precondition gate
//!
//! Everything the signing flows need from the outside world is collected
//! here, once, from an explicit snapshot of the environment variables.
//! Components receive the resulting `Environment` and never look at the
//! process environment themselves.

use crate::classify::PlatformCapabilities;
use crate::error::{Result, SignError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Platform distribution root (bundled openssl and its config)
pub const PLATFORM_PATH_VAR: &str = "BP_PLATFORM_PATH";

/// Internal SDK root (bundled bpsigner)
pub const INTERNAL_SDK_PATH_VAR: &str = "BP_INTERNAL_SDK_PATH";

/// Optional override for the directory holding `<certType>/` key material
pub const SIGNING_ROOT_VAR: &str = "BP_SIGNING_ROOT";

/// Bundled openssl and the config file it must run with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSslTool {
    pub binary: PathBuf,
    pub config: PathBuf,
}

/// Resolved, immutable view of the deployment.
#[derive(Debug, Clone)]
pub struct Environment {
    pub platform_root: PathBuf,
    pub sdk_root: PathBuf,
    pub openssl: OpenSslTool,
    pub bpsigner: PathBuf,
    /// Directory holding `<certType>/<identity>.{crt,pvk}`
    pub tool_root: PathBuf,
    /// Base for relative target paths
    pub working_dir: PathBuf,
    pub platform: PlatformCapabilities,
}

/// Inputs to [`Environment::resolve`] that do not come from variables.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub platform: PlatformCapabilities,
    pub working_dir: PathBuf,
    /// `--root` from the command line; wins over `BP_SIGNING_ROOT`
    pub explicit_root: Option<PathBuf>,
    /// Used when neither `--root` nor `BP_SIGNING_ROOT` is given
    pub default_root: PathBuf,
}

impl Environment {
    /// Verify every prerequisite and build the environment.
    ///
    /// Performs only existence checks; nothing is created or modified.
    pub fn resolve(vars: &HashMap<String, String>, options: ResolveOptions) -> Result<Self> {
        let platform_root = required_path(vars, PLATFORM_PATH_VAR)?;
        let sdk_root = required_path(vars, INTERNAL_SDK_PATH_VAR)?;

        let exe_suffix = std::env::consts::EXE_SUFFIX;

        let bpsigner = sdk_root.join("signing").join(format!("bpsigner{exe_suffix}"));
        require_tool(&bpsigner, "bundled signer")?;

        let dist = platform_root.join("external").join("dist");
        let openssl = OpenSslTool {
            binary: dist.join("bin").join(format!("openssl{exe_suffix}")),
            config: dist.join("ssl").join("openssl.cnf"),
        };
        require_tool(&openssl.binary, "bundled openssl")?;

        let tool_root = options
            .explicit_root
            .or_else(|| vars.get(SIGNING_ROOT_VAR).map(PathBuf::from))
            .unwrap_or(options.default_root);

        let env = Self {
            platform_root,
            sdk_root,
            openssl,
            bpsigner,
            tool_root,
            working_dir: options.working_dir,
            platform: options.platform,
        };
        tracing::debug!(?env, "environment resolved");
        Ok(env)
    }
}

fn required_path(vars: &HashMap<String, String>, name: &str) -> Result<PathBuf> {
    let value = vars
        .get(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SignError::Configuration(format!("{name} environment variable not set!")))?;

    let path = PathBuf::from(value);
    if !path.exists() {
        return Err(SignError::Configuration(format!(
            "{name} ({value}) does not exist!"
        )));
    }
    Ok(path)
}

fn require_tool(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SignError::Configuration(format!(
            "{what} {} not found",
            path.display()
        )))
    }
}
