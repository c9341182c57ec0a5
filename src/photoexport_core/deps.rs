use crate::photoexport_core::error::{ExportError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

/// The exporter binary.
pub const EXPORTER: &str = "osxphotos";

/// Optional tree-listing tool used by the final report.
pub const LISTING_TOOL: &str = "tree";

static EXPORTER_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();
static LISTING_TOOL_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Whether the exporter is on PATH. Probed once per process.
pub fn exporter_available() -> bool {
    EXPORTER_PATH.get_or_init(|| find_in_path(EXPORTER)).is_some()
}

/// Whether `tree` is on PATH. Probed once per process.
pub fn listing_tool_available() -> bool {
    LISTING_TOOL_PATH
        .get_or_init(|| find_in_path(LISTING_TOOL))
        .is_some()
}

/// Look up an executable the way a shell would.
pub fn find_in_path(name: impl AsRef<OsStr>) -> Option<PathBuf> {
    let name = name.as_ref();
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Ask the exporter for its version.
pub fn exporter_version() -> Result<String> {
    let output = Command::new(EXPORTER)
        .arg("version")
        .output()
        .map_err(|e| ExportError::DependencyBroken {
            name: EXPORTER,
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ExportError::DependencyBroken {
            name: EXPORTER,
            reason: format!("`{} version` exited with {}", EXPORTER, output.status),
        });
    }

    Ok(parse_version(&String::from_utf8_lossy(&output.stdout)))
}

/// The version is the last whitespace-separated token of the output.
fn parse_version(stdout: &str) -> String {
    stdout
        .split_whitespace()
        .last()
        .unwrap_or("unknown")
        .to_string()
}

/// Check that required tools are available. Returns the exporter version.
pub fn validate_dependencies() -> Result<String> {
    log::debug!("Checking dependencies...");

    if !exporter_available() {
        log::error!("{} not found on PATH", EXPORTER);
        return Err(ExportError::DependencyMissing(EXPORTER));
    }

    let version = exporter_version().inspect_err(|e| log::error!("{}", e))?;
    log::info!("{} version {}", EXPORTER, version);

    if listing_tool_available() {
        log::debug!("{} available", LISTING_TOOL);
    } else {
        log::warn!("{} not found, install with: brew install tree", LISTING_TOOL);
    }

    Ok(version)
}
