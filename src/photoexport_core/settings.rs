//! YAML settings file loading.
//!
//! Loading happens in two phases. The file is first parsed into a generic
//! YAML mapping; a file that is missing, unreadable or not a mapping is
//! treated as empty and reported as a [`ConfigNotice`]. The mapping is then
//! converted into a typed [`SettingsFile`], and unknown keys or ill-typed
//! values are rejected with [`ExportError::InvalidSettings`].

use crate::photoexport_core::error::{ExportError, Result};
use log::Level;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// A diagnostic raised while resolving configuration, before logging exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigNotice {
    pub level: Level,
    pub message: String,
}

impl ConfigNotice {
    fn warn(message: String) -> Self {
        Self { level: Level::Warn, message }
    }

    fn error(message: String) -> Self {
        Self { level: Level::Error, message }
    }

    fn info(message: String) -> Self {
        Self { level: Level::Info, message }
    }

    /// Forward the notice to the active logger.
    pub fn emit(&self) {
        log::log!(self.level, "{}", self.message);
    }
}

/// Values read from a settings file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub export_dir: Option<PathBuf>,
    pub nc_photos_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub dry_run: Option<bool>,
    pub use_symlink: Option<bool>,
    pub cleanup: Option<bool>,
    pub export_aae: Option<bool>,
    pub quiet: Option<bool>,
    pub verbose: Option<u8>,
}

impl SettingsFile {
    /// Convert a raw mapping into typed settings.
    pub fn from_mapping(path: &Path, mapping: Mapping) -> Result<Self> {
        let mut settings: SettingsFile =
            serde_yaml::from_value(Value::Mapping(mapping)).map_err(|e| {
                ExportError::InvalidSettings {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            })?;

        settings.export_dir = settings.export_dir.as_deref().and_then(normalize_path);
        settings.nc_photos_dir = settings.nc_photos_dir.as_deref().and_then(normalize_path);
        settings.log_file = settings.log_file.as_deref().and_then(normalize_path);

        Ok(settings)
    }
}

/// Read a settings file into a generic mapping.
///
/// Never fails: problems are returned as notices alongside an empty mapping.
pub fn load_mapping(config_path: &Path) -> (Mapping, Vec<ConfigNotice>) {
    let config_file = normalize_path(config_path).unwrap_or_else(|| config_path.to_path_buf());

    if !config_file.exists() {
        return (
            Mapping::new(),
            vec![ConfigNotice::warn(format!(
                "Configuration file not found: {}",
                config_file.display()
            ))],
        );
    }

    if !config_file.is_file() {
        return (
            Mapping::new(),
            vec![ConfigNotice::error(format!(
                "Provided configuration path is not a file: {}",
                config_file.display()
            ))],
        );
    }

    let content = match std::fs::read_to_string(&config_file) {
        Ok(content) => content,
        Err(e) => {
            return (
                Mapping::new(),
                vec![ConfigNotice::error(format!(
                    "Error loading configuration file {}: {}",
                    config_file.display(),
                    e
                ))],
            );
        }
    };

    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Mapping(mapping)) => (
            mapping,
            vec![ConfigNotice::info(format!(
                "Loaded configuration from {}",
                config_file.display()
            ))],
        ),
        // An empty document parses as null.
        Ok(Value::Null) => (
            Mapping::new(),
            vec![ConfigNotice::info(format!(
                "Configuration file is empty: {}",
                config_file.display()
            ))],
        ),
        Ok(_) => (
            Mapping::new(),
            vec![ConfigNotice::error(format!(
                "Error loading configuration file {}: top level is not a mapping",
                config_file.display()
            ))],
        ),
        Err(e) => (
            Mapping::new(),
            vec![ConfigNotice::error(format!(
                "Error loading configuration file {}: {}",
                config_file.display(),
                e
            ))],
        ),
    }
}

/// Load and type-check a settings file.
pub fn load_settings(config_path: &Path) -> Result<(SettingsFile, Vec<ConfigNotice>)> {
    let (mapping, notices) = load_mapping(config_path);
    let settings = SettingsFile::from_mapping(config_path, mapping)?;
    Ok((settings, notices))
}

/// Expand a leading `~` and make the path absolute.
///
/// Returns `None` for an empty path so it counts as "not provided".
pub fn normalize_path(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }

    let expanded = expand_home(path);
    Some(std::path::absolute(&expanded).unwrap_or(expanded))
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
