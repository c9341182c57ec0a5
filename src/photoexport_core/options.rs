use crate::photoexport_core::cli::Cli;
use crate::photoexport_core::error::{ExportError, Result};
use crate::photoexport_core::settings::{self, ConfigNotice, SettingsFile, normalize_path};
use std::path::PathBuf;

/// Resolved, immutable run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub export_dir: PathBuf,
    pub nc_photos_dir: PathBuf,
    pub log_file: PathBuf,
    pub dry_run: bool,
    pub use_symlink: bool,
    pub cleanup: bool,
    pub export_aae: bool,
    pub quiet: bool,
    pub verbose: u8,
}

/// Options plus the diagnostics gathered while resolving them.
#[derive(Debug)]
pub struct Resolved {
    pub options: Options,
    pub notices: Vec<ConfigNotice>,
}

impl Options {
    /// Load the settings file named by `--config` (if any) and overlay the
    /// command line on top of it.
    pub fn resolve(cli: &Cli) -> Result<Resolved> {
        let (file, notices) = match &cli.config {
            Some(path) => settings::load_settings(path)?,
            None => (SettingsFile::default(), Vec::new()),
        };
        let options = Self::merge(cli, file)?;
        Ok(Resolved { options, notices })
    }

    /// Merge file settings with command-line values. A command-line value is
    /// only applied when the user actually supplied it.
    pub fn merge(cli: &Cli, file: SettingsFile) -> Result<Self> {
        let export_dir = cli.export_dir.as_deref().and_then(normalize_path).or(file.export_dir);
        let nc_photos_dir = cli
            .nc_photos_dir
            .as_deref()
            .and_then(normalize_path)
            .or(file.nc_photos_dir);
        let log_file = cli.log_file.as_deref().and_then(normalize_path).or(file.log_file);

        let (export_dir, nc_photos_dir, log_file) = match (export_dir, nc_photos_dir, log_file) {
            (Some(e), Some(n), Some(l)) => (e, n, l),
            (e, n, l) => {
                let mut missing = Vec::new();
                if e.is_none() {
                    missing.push("export_dir");
                }
                if n.is_none() {
                    missing.push("nc_photos_dir");
                }
                if l.is_none() {
                    missing.push("log_file");
                }
                return Err(ExportError::MissingConfig(missing));
            }
        };

        for (field, path) in [
            ("export_dir", &export_dir),
            ("nc_photos_dir", &nc_photos_dir),
            ("log_file", &log_file),
        ] {
            if !path.is_absolute() {
                return Err(ExportError::InvalidPath {
                    field,
                    reason: format!("{} is not absolute", path.display()),
                });
            }
        }

        let quiet = cli.quiet || file.quiet.unwrap_or(false);
        let verbose = if cli.verbose > 0 {
            cli.verbose
        } else {
            file.verbose.unwrap_or(0)
        };

        Ok(Options {
            export_dir,
            nc_photos_dir,
            log_file,
            dry_run: cli.dry_run || file.dry_run.unwrap_or(false),
            use_symlink: cli
                .symlink_override()
                .or(file.use_symlink)
                .unwrap_or(true),
            cleanup: cli.cleanup || file.cleanup.unwrap_or(false),
            export_aae: cli.export_aae || file.export_aae.unwrap_or(false),
            quiet,
            // Quiet wins over verbose.
            verbose: if quiet { 0 } else { verbose },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::path::Path;

    fn full_cli() -> Cli {
        Cli {
            export_dir: Some(PathBuf::from("/b/export")),
            nc_photos_dir: Some(PathBuf::from("/b/nc")),
            log_file: Some(PathBuf::from("/b/log.txt")),
            ..Default::default()
        }
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = SettingsFile {
            export_dir: Some(PathBuf::from("/a")),
            ..Default::default()
        };
        let cli = Cli {
            export_dir: Some(PathBuf::from("/b")),
            ..full_cli()
        };
        let options = Options::merge(&cli, file).unwrap();
        assert_eq!(options.export_dir, Path::new("/b"));
    }

    #[test]
    fn test_absent_cli_keeps_file_values() {
        let file = SettingsFile {
            export_dir: Some(PathBuf::from("/a/export")),
            nc_photos_dir: Some(PathBuf::from("/a/nc")),
            log_file: Some(PathBuf::from("/a/log.txt")),
            dry_run: Some(true),
            use_symlink: Some(false),
            cleanup: Some(true),
            export_aae: Some(true),
            verbose: Some(1),
            ..Default::default()
        };
        let options = Options::merge(&Cli::default(), file).unwrap();
        assert_eq!(options.export_dir, Path::new("/a/export"));
        assert!(options.dry_run);
        assert!(!options.use_symlink);
        assert!(options.cleanup);
        assert!(options.export_aae);
        assert_eq!(options.verbose, 1);
    }

    #[test]
    fn test_use_symlink_defaults_true() {
        let options = Options::merge(&full_cli(), SettingsFile::default()).unwrap();
        assert!(options.use_symlink);

        let cli = Cli {
            no_symlink: true,
            ..full_cli()
        };
        assert!(!Options::merge(&cli, SettingsFile::default()).unwrap().use_symlink);

        let file = SettingsFile {
            use_symlink: Some(false),
            ..Default::default()
        };
        let cli = Cli {
            use_symlink: true,
            ..full_cli()
        };
        assert!(Options::merge(&cli, file).unwrap().use_symlink);
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let err = Options::merge(&Cli::default(), SettingsFile::default()).unwrap_err();
        match err {
            ExportError::MissingConfig(fields) => {
                assert_eq!(fields, vec!["export_dir", "nc_photos_dir", "log_file"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let cli = Cli {
            log_file: None,
            ..full_cli()
        };
        match Options::merge(&cli, SettingsFile::default()) {
            Err(ExportError::MissingConfig(fields)) => assert_eq!(fields, vec!["log_file"]),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_overrides_verbose() {
        let cli = Cli {
            quiet: true,
            verbose: 3,
            ..full_cli()
        };
        let options = Options::merge(&cli, SettingsFile::default()).unwrap();
        assert!(options.quiet);
        assert_eq!(options.verbose, 0);
    }

    #[test]
    fn test_resolve_reads_config_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = temp.child("config.yaml");
        config
            .write_str("export_dir: /a\nnc_photos_dir: /a/nc\nlog_file: /a/log.txt\n")
            .unwrap();

        let cli = Cli {
            config: Some(config.path().to_path_buf()),
            export_dir: Some(PathBuf::from("/b")),
            ..Default::default()
        };
        let resolved = Options::resolve(&cli).unwrap();
        assert_eq!(resolved.options.export_dir, Path::new("/b"));
        assert_eq!(resolved.options.nc_photos_dir, Path::new("/a/nc"));
        assert_eq!(resolved.notices.len(), 1);
    }

    #[test]
    fn test_relative_cli_paths_are_made_absolute() {
        let cli = Cli {
            export_dir: Some(PathBuf::from("relative/export")),
            ..full_cli()
        };
        let options = Options::merge(&cli, SettingsFile::default()).unwrap();
        assert!(options.export_dir.is_absolute());
    }
}
