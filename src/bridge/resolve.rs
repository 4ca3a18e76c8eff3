//! Locates the costa executable for the current platform.

use std::env;
use std::path::{Path, PathBuf};

/// Unqualified name used for the PATH fallback.
pub const CLI_NAME: &str = "costa";

/// Relative path of the bundled binary for a platform/arch pair.
///
/// macOS ships a universal binary, so the architecture is ignored there.
/// Returns `None` for pairs no bundle exists for; those hosts go straight
/// to the PATH fallback.
pub fn bundled_relative_path(os: &str, arch: &str) -> Option<&'static str> {
    match (os, arch) {
        ("macos", _) => Some("bin/darwin/costa"),
        ("windows", "x86_64") => Some("bin/win32-x64/costa.exe"),
        ("linux", "x86_64") => Some("bin/linux-x64/costa"),
        ("linux", "aarch64") => Some("bin/linux-arm64/costa"),
        _ => None,
    }
}

/// A located CLI binary, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBinary {
    /// The binary shipped alongside this tool.
    Bundled(PathBuf),
    /// Found through the OS search path.
    OnPath(PathBuf),
    /// Explicit override from the settings file.
    Configured(PathBuf),
    /// Nothing was found; spawning this bare name lets the OS loader try
    /// once more and a miss is reported as `CliNotFound`.
    Fallback(PathBuf),
}

impl ResolvedBinary {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedBinary::Bundled(path)
            | ResolvedBinary::OnPath(path)
            | ResolvedBinary::Configured(path)
            | ResolvedBinary::Fallback(path) => path,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ResolvedBinary::Fallback(_))
    }

    pub fn origin(&self) -> &'static str {
        match self {
            ResolvedBinary::Bundled(_) => "bundled",
            ResolvedBinary::OnPath(_) => "on PATH",
            ResolvedBinary::Configured(_) => "config override",
            ResolvedBinary::Fallback(_) => "not found (PATH fallback)",
        }
    }
}

/// Resolves the binary to invoke: the bundled one when it exists on disk,
/// otherwise whatever PATH offers, otherwise the bare name.
pub fn resolve_binary(install_dir: &Path) -> ResolvedBinary {
    if let Some(rel) = bundled_relative_path(env::consts::OS, env::consts::ARCH) {
        let bundled = install_dir.join(rel);
        if bundled.is_file() {
            return ResolvedBinary::Bundled(bundled);
        }
    }
    match which::which(CLI_NAME) {
        Ok(path) => ResolvedBinary::OnPath(path),
        Err(_) => ResolvedBinary::Fallback(PathBuf::from(CLI_NAME)),
    }
}

/// Directory the bundled binaries are expected under. The closest analog of
/// an extension bundle root is the directory holding the current executable.
pub fn default_install_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Best-effort execute-bit fix. The binary may already be runnable or sit on
/// a read-only filesystem, so failures are swallowed.
#[cfg(unix)]
pub fn ensure_executable(path: &Path) {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    let mut perms = metadata.permissions();
    let mode = perms.mode();
    if mode & 0o111 == 0o111 {
        return;
    }
    perms.set_mode(mode | 0o111);
    let _ = fs::set_permissions(path, perms);
}

#[cfg(not(unix))]
pub fn ensure_executable(_path: &Path) {}
