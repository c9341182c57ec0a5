#![allow(dead_code)]

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;
use std::ffi::OsString;
use std::path::Path;

/// Stand-in for `osxphotos`. `export` prints progress on both streams,
/// creates a small year/month tree unless `--dry-run` is given and exits
/// with `$FAKE_EXPORT_STATUS`. `$FAKE_EXPORT_SLEEP` makes it hang instead.
const FAKE_EXPORTER: &str = r#"#!/bin/sh
case "$1" in
  version)
    echo "osxphotos, version 0.72.1"
    exit 0
    ;;
  export)
    dest="$2"
    if [ -n "$FAKE_EXPORT_SLEEP" ]; then
      exec sleep "$FAKE_EXPORT_SLEEP"
    fi
    dry=""
    for arg in "$@"; do
      [ "$arg" = "--dry-run" ] && dry=1
    done
    echo "Exporting 2 photos to $dest"
    echo "Processing IMG_0001"
    echo "Processing IMG_E0002" >&2
    if [ -z "$dry" ]; then
      mkdir -p "$dest/2023/01" "$dest/2024/02"
      printf 'abc' > "$dest/2023/01/IMG_0001.jpg"
      printf 'defgh' > "$dest/2024/02/IMG_E0002.jpg"
    fi
    exit "${FAKE_EXPORT_STATUS:-0}"
    ;;
esac
exit 64
"#;

/// Layout used by every CLI test.
pub struct Sandbox {
    pub temp: TempDir,
    pub bin: ChildPath,
    pub export_dir: ChildPath,
    pub nc_dir: ChildPath,
    pub log_file: ChildPath,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let bin = temp.child("bin");
        bin.create_dir_all().unwrap();
        let export_dir = temp.child("export");
        let nc_dir = temp.child("nextcloud");
        let log_file = temp.child("test.log");
        Sandbox {
            temp,
            bin,
            export_dir,
            nc_dir,
            log_file,
        }
    }

    /// Sandbox with the fake exporter first on PATH.
    pub fn with_exporter() -> Self {
        let sandbox = Self::new();
        install_script(&sandbox.bin.child("osxphotos"), FAKE_EXPORTER);
        sandbox
    }

    /// PATH with the sandbox `bin` directory in front.
    pub fn path_env(&self) -> OsString {
        let mut dirs = vec![self.bin.path().to_path_buf()];
        if let Some(path) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&path));
        }
        std::env::join_paths(dirs).unwrap()
    }

    /// `photoexport` with PATH set and the three required paths filled in.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("photoexport").unwrap();
        cmd.env("PATH", self.path_env())
            .env_remove("FAKE_EXPORT_STATUS")
            .env_remove("FAKE_EXPORT_SLEEP")
            .arg("-e")
            .arg(self.export_dir.path())
            .arg("-n")
            .arg(self.nc_dir.path())
            .arg("-l")
            .arg(self.log_file.path());
        cmd
    }
}

#[cfg(unix)]
fn install_script(path: &ChildPath, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    path.write_str(body).unwrap();
    std::fs::set_permissions(path.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
}

pub fn read_log(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}
