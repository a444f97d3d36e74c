//! Backend selection for a target file

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Extensions that must be signed with the platform's own signer.
pub const NATIVE_EXTENSIONS: &[&str] = &["exe", "dll", "cab"];

/// Suffix appended to a file name to form its detached signature.
pub const SIGNATURE_SUFFIX: &str = ".sig";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// Executable, library or cabinet on a platform with a native signer.
    NativeExecutable,
    /// Everything else; carries a detached `.sig` sidecar.
    GenericArtifact,
}

/// What the host platform can sign natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    pub native_signing: bool,
}

impl PlatformCapabilities {
    /// Capabilities of the platform this binary was built for.
    #[must_use]
    pub fn current() -> Self {
        Self {
            native_signing: cfg!(windows),
        }
    }
}

/// Pick the backend for `path`. Extension matching ignores ASCII case.
#[must_use]
pub fn classify(path: &Path, platform: PlatformCapabilities) -> FileClass {
    if !platform.native_signing {
        return FileClass::GenericArtifact;
    }

    let is_native = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| NATIVE_EXTENSIONS.iter().any(|n| ext.eq_ignore_ascii_case(n)));

    if is_native {
        FileClass::NativeExecutable
    } else {
        FileClass::GenericArtifact
    }
}

/// A file queued for signing or verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningTarget {
    path: PathBuf,
    class: FileClass,
}

impl SigningTarget {
    /// Resolve `path` against `working_dir` and classify it.
    pub fn new(path: &Path, working_dir: &Path, platform: PlatformCapabilities) -> Self {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            working_dir.join(path)
        };
        let class = classify(&path, platform);
        Self { path, class }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn class(&self) -> FileClass {
        self.class
    }

    /// `<target>.sig`, next to the target.
    pub fn signature_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(SIGNATURE_SUFFIX);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NATIVE: PlatformCapabilities = PlatformCapabilities {
        native_signing: true,
    };
    const PORTABLE: PlatformCapabilities = PlatformCapabilities {
        native_signing: false,
    };

    #[test]
    fn native_extensions_route_to_native_backend() {
        for name in ["setup.exe", "bpcore.dll", "plugin.cab", "SETUP.EXE", "Core.Dll"] {
            assert_eq!(
                classify(Path::new(name), NATIVE),
                FileClass::NativeExecutable,
                "{name}"
            );
        }
    }

    #[test]
    fn other_files_are_generic_on_native_platform() {
        for name in ["service.tar.gz", "manifest.json", "exe", "setup.exe.bak", "archive.cabx"] {
            assert_eq!(
                classify(Path::new(name), NATIVE),
                FileClass::GenericArtifact,
                "{name}"
            );
        }
    }

    #[test]
    fn everything_is_generic_without_native_signer() {
        for name in ["setup.exe", "bpcore.dll", "plugin.cab", "notes.txt"] {
            assert_eq!(classify(Path::new(name), PORTABLE), FileClass::GenericArtifact);
        }
    }

    #[test]
    fn relative_targets_resolve_against_working_dir() {
        let target = SigningTarget::new(Path::new("out/service.zip"), Path::new("/build"), PORTABLE);
        assert_eq!(target.path(), Path::new("/build/out/service.zip"));
        assert_eq!(target.signature_path(), PathBuf::from("/build/out/service.zip.sig"));

        let absolute = SigningTarget::new(Path::new("/rel/a.exe"), Path::new("/build"), NATIVE);
        assert_eq!(absolute.path(), Path::new("/rel/a.exe"));
        assert_eq!(absolute.class(), FileClass::NativeExecutable);
    }
}
