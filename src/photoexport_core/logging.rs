use crate::photoexport_core::options::Options;
use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const ARCHIVE_DATE_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day]_[hour]-[minute]-[second]_[subsecond digits:6]"
);

/// Console and file levels for a run.
pub fn levels(options: &Options) -> (LevelFilter, LevelFilter) {
    if options.quiet {
        (LevelFilter::Warn, LevelFilter::Info)
    } else {
        match options.verbose {
            0 => (LevelFilter::Info, LevelFilter::Debug),
            1 => (LevelFilter::Debug, LevelFilter::Trace),
            _ => (LevelFilter::Trace, LevelFilter::Trace),
        }
    }
}

/// Install the console + rotating file loggers.
pub fn init(options: &Options) -> Result<()> {
    let (console_level, file_level) = levels(options);

    let term_config = ConfigBuilder::new()
        .set_time_format_custom(format_description!("[hour]:[minute]:[second]"))
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();

    let file_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .set_location_level(LevelFilter::Debug)
        .build();

    let writer = RotatingFile::open(&options.log_file, RotationPolicy::default())
        .with_context(|| format!("Cannot open log file {}", options.log_file.display()))?;

    let loggers: Vec<Box<dyn SharedLogger>> = vec![
        TermLogger::new(
            console_level,
            term_config,
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
        WriteLogger::new(file_level, file_config, writer),
    ];

    CombinedLogger::init(loggers).context("Logger already initialized")?;
    log::info!("Logging configured");
    Ok(())
}

/// When the log file is rotated and how long archives are kept.
#[derive(Debug, Clone, Copy)]
pub struct RotationPolicy {
    pub max_bytes: u64,
    pub retention: Duration,
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            retention: Duration::from_secs(7 * 24 * 60 * 60),
            compress: true,
        }
    }
}

/// Append-only log file that rolls over by size.
///
/// Archives sit next to the live file as `<name>.<timestamp>` (or
/// `<name>.<timestamp>.gz` when compressed).
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    written: u64,
    policy: RotationPolicy,
}

impl RotatingFile {
    pub fn open(path: &Path, policy: RotationPolicy) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();

        let rotating = Self {
            path: path.to_path_buf(),
            file,
            written,
            policy,
        };
        rotating.prune_archives();
        Ok(rotating)
    }

    /// Move the live file aside and start a fresh one. Once the rename has
    /// happened the live file is always reopened; a failed compression
    /// leaves the plain archive behind.
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        let stamp = OffsetDateTime::now_utc()
            .format(ARCHIVE_DATE_FORMAT)
            .map_err(io::Error::other)?;
        let archive = self.sibling(&stamp);
        fs::rename(&self.path, &archive)?;

        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;

        if self.policy.compress {
            let _ = compress(&archive);
        }
        self.prune_archives();
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.file_name();
        name.push('.');
        name.push_str(suffix);
        self.path.with_file_name(name)
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Delete archives older than the retention window. Errors are ignored:
    /// there is no logger to report them to from inside the logger.
    fn prune_archives(&self) {
        let Some(dir) = self.path.parent() else {
            return;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        let prefix = format!("{}.", self.file_name());
        let now = SystemTime::now();

        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(&prefix) {
                continue;
            }
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let expired = meta
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .is_some_and(|age| age > self.policy.retention);
            if expired {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

/// Gzip `path` into `path.gz` and drop the original. On failure the
/// original is kept and any partial `.gz` is removed.
fn compress(path: &Path) -> io::Result<()> {
    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);

    let encoded = File::create(&gz_path).and_then(|gz| {
        let mut encoder = GzEncoder::new(gz, Compression::default());
        io::copy(&mut File::open(path)?, &mut encoder)?;
        encoder.finish().map(drop)
    });
    if let Err(e) = encoded {
        let _ = fs::remove_file(&gz_path);
        return Err(e);
    }
    fs::remove_file(path)
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.policy.max_bytes {
            // Keep appending to the current file and retry only after another
            // full window.
            if self.rotate().is_err() {
                self.written = 0;
            }
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::io::Read;

    fn archives(dir: &Path, prefix: &str) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with(&format!("{prefix}."))
            })
            .collect();
        found.sort();
        found
    }

    fn options(quiet: bool, verbose: u8) -> Options {
        Options {
            export_dir: PathBuf::from("/e"),
            nc_photos_dir: PathBuf::from("/n"),
            log_file: PathBuf::from("/l.log"),
            dry_run: false,
            use_symlink: true,
            cleanup: false,
            export_aae: false,
            quiet,
            verbose,
        }
    }

    #[test]
    fn test_levels() {
        assert_eq!(levels(&options(true, 0)), (LevelFilter::Warn, LevelFilter::Info));
        assert_eq!(levels(&options(false, 0)), (LevelFilter::Info, LevelFilter::Debug));
        assert_eq!(levels(&options(false, 1)), (LevelFilter::Debug, LevelFilter::Trace));
        assert_eq!(levels(&options(false, 3)), (LevelFilter::Trace, LevelFilter::Trace));
    }

    #[test]
    fn test_creates_parent_dirs() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("logs/nested/export.log");
        let mut file = RotatingFile::open(&path, RotationPolicy::default()).unwrap();
        file.write_all(b"hello\n").unwrap();
        file.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_rotates_and_compresses() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("export.log");
        let policy = RotationPolicy {
            max_bytes: 16,
            ..Default::default()
        };

        let mut file = RotatingFile::open(&path, policy).unwrap();
        file.write_all(b"first line 1234\n").unwrap();
        file.write_all(b"second line\n").unwrap();
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second line\n");

        let found = archives(temp.path(), "export.log");
        assert_eq!(found.len(), 1);
        assert!(found[0].to_string_lossy().ends_with(".gz"));

        let mut decoded = String::new();
        flate2::read::GzDecoder::new(File::open(&found[0]).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "first line 1234\n");
    }

    #[test]
    fn test_uncompressed_rotation() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("export.log");
        let policy = RotationPolicy {
            max_bytes: 4,
            compress: false,
            ..Default::default()
        };

        let mut file = RotatingFile::open(&path, policy).unwrap();
        file.write_all(b"abcd").unwrap();
        file.write_all(b"efgh").unwrap();

        let found = archives(temp.path(), "export.log");
        assert_eq!(found.len(), 1);
        assert_eq!(fs::read_to_string(&found[0]).unwrap(), "abcd");
    }

    #[test]
    fn test_failed_compression_keeps_logging() {
        let temp = assert_fs::TempDir::new().unwrap();
        // Long enough that the archive name still fits in NAME_MAX but the
        // `.gz` name does not.
        let name = format!("{}.log", "a".repeat(223));
        let path = temp.path().join(&name);
        let policy = RotationPolicy {
            max_bytes: 16,
            ..Default::default()
        };

        let mut file = RotatingFile::open(&path, policy).unwrap();
        file.write_all(b"first line\n").unwrap();
        file.write_all(b"second\n").unwrap();
        file.write_all(b"third\n").unwrap();
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second\nthird\n");

        let found = archives(temp.path(), &name);
        assert_eq!(found.len(), 1);
        assert!(!found[0].to_string_lossy().ends_with(".gz"));
        assert_eq!(fs::read_to_string(&found[0]).unwrap(), "first line\n");
    }

    #[test]
    fn test_failed_rename_keeps_appending() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("export.log");
        let policy = RotationPolicy {
            max_bytes: 4,
            ..Default::default()
        };

        let mut file = RotatingFile::open(&path, policy).unwrap();
        file.write_all(b"abcd").unwrap();
        fs::remove_file(&path).unwrap();

        file.write_all(b"efgh").unwrap();
        file.write_all(b"ijkl").unwrap();
        file.flush().unwrap();
        assert!(archives(temp.path(), "export.log").is_empty());
    }

    #[test]
    fn test_prunes_expired_archives() {
        let temp = assert_fs::TempDir::new().unwrap();
        let old = temp.child("export.log.2020-01-01_00-00-00_000000.gz");
        old.write_str("old").unwrap();
        let fresh = temp.child("export.log.2099-01-01_00-00-00_000000.gz");
        fresh.write_str("fresh").unwrap();
        let unrelated = temp.child("other.log.2020-01-01_00-00-00_000000.gz");
        unrelated.write_str("other").unwrap();

        let eight_days = Duration::from_secs(8 * 24 * 60 * 60);
        for path in [old.path(), unrelated.path()] {
            File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(SystemTime::now() - eight_days)
                .unwrap();
        }

        RotatingFile::open(&temp.path().join("export.log"), RotationPolicy::default()).unwrap();

        assert!(!old.path().exists());
        assert!(fresh.path().exists());
        assert!(unrelated.path().exists());
    }
}
