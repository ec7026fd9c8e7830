//! Host platform services.
//!
//! Everything that touches the real machine lives here: where the emulator
//! keeps its data, where the ROM is installed, directory bookkeeping, free
//! space queries, and host identification.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use directories::BaseDirs;
use log::warn;

use crate::error::{CraftError, CraftResult};

static BASE_PATH: OnceLock<PathBuf> = OnceLock::new();
static ROM_PATH: OnceLock<PathBuf> = OnceLock::new();

/// ROM install location when `CRAFTOS_ROM_DIR` is not set.
const DEFAULT_ROM_DIR: &str = "/usr/local/share/craftos";

/// Get the user's home directory.
///
/// Falls back to `$HOME`, then `/tmp`, when the platform lookup fails.
fn home_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp"))
        })
}

fn resolve_base_path() -> PathBuf {
    match std::env::var("CRAFTOS_BASE_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => home_dir().join(".craftos"),
    }
}

fn resolve_rom_path() -> PathBuf {
    match std::env::var("CRAFTOS_ROM_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from(DEFAULT_ROM_DIR),
    }
}

/// Directory holding per-computer data, configuration, and saves.
///
/// `$CRAFTOS_BASE_DIR` if set, else `<home>/.craftos`. Resolved once on
/// first use and cached for the life of the process.
pub fn base_path() -> &'static Path {
    BASE_PATH.get_or_init(resolve_base_path)
}

/// Directory holding the installed ROM.
///
/// `$CRAFTOS_ROM_DIR` if set, else `/usr/local/share/craftos`. Resolved
/// once on first use and cached for the life of the process.
pub fn rom_path() -> &'static Path {
    ROM_PATH.get_or_init(resolve_rom_path)
}

/// The BIOS that boots every computer, `<rom>/bios.lua`.
pub fn bios_path() -> PathBuf {
    rom_path().join("bios.lua")
}

/// Directory scanned for plugins, `<rom>/plugins`.
pub fn plugin_path() -> PathBuf {
    rom_path().join("plugins")
}

/// Create a directory and any missing parents. Succeeds if the directory
/// already exists.
pub fn create_directory(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
}

/// Remove a directory tree, visiting every entry.
///
/// Unlike `fs::remove_dir_all`, one failed entry does not stop the walk:
/// everything removable is removed, and every failure is reported together
/// in a single `RemoveDirectory` error.
pub fn remove_directory(path: &Path) -> CraftResult<()> {
    if !path.is_dir() {
        return Err(CraftError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("not a directory: {}", path.display()),
        )));
    }
    let mut failures = Vec::new();
    remove_tree(path, &mut failures);
    if failures.is_empty() {
        Ok(())
    } else {
        warn!(
            "remove_directory {}: {} entries failed",
            path.display(),
            failures.len()
        );
        Err(CraftError::RemoveDirectory {
            path: path.to_path_buf(),
            failures,
        })
    }
}

fn remove_tree(path: &Path, failures: &mut Vec<(PathBuf, io::Error)>) {
    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            failures.push((path.to_path_buf(), err));
            return;
        }
    };
    let before = failures.len();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                failures.push((path.to_path_buf(), err));
                continue;
            }
        };
        let child = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            remove_tree(&child, failures);
        } else if let Err(err) = std::fs::remove_file(&child) {
            failures.push((child, err));
        }
    }
    // The directory itself can only go once its contents did.
    if failures.len() == before {
        if let Err(err) = std::fs::remove_dir(path) {
            failures.push((path.to_path_buf(), err));
        }
    }
}

/// Free space in bytes on the filesystem holding `path`, 0 when the query
/// fails.
#[cfg(unix)]
pub fn free_space(path: &Path) -> u64 {
    use std::os::unix::ffi::OsStrExt;

    let Ok(cpath) = std::ffi::CString::new(path.as_os_str().as_bytes()) else {
        return 0;
    };
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::statvfs(cpath.as_ptr(), &mut stat) };
    if ret != 0 {
        return 0;
    }
    (stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64)
}

#[cfg(not(unix))]
pub fn free_space(_path: &Path) -> u64 {
    0
}

/// Host identification string, `"<os-name> <architecture> <os-version>"`.
///
/// Name and version come from `/proc/sys/kernel` where available, with
/// compile-time fallbacks elsewhere. Diagnostics only; never parsed back.
pub fn host_string() -> String {
    let kernel = |name: &str, fallback: &str| {
        std::fs::read_to_string(format!("/proc/sys/kernel/{name}"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| fallback.to_string())
    };
    let sysname = kernel("ostype", std::env::consts::OS);
    let release = kernel("osrelease", "unknown");
    format!("{sysname} {} {release}", std::env::consts::ARCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_cached_paths_are_absolute() {
        assert!(base_path().is_absolute());
        assert!(rom_path().is_absolute());
    }

    #[test]
    fn test_bios_and_plugins_under_rom() {
        assert!(bios_path().starts_with(rom_path()));
        assert!(bios_path().ends_with("bios.lua"));
        assert!(plugin_path().starts_with(rom_path()));
        assert!(plugin_path().ends_with("plugins"));
    }

    #[test]
    #[serial]
    fn test_base_path_env_override() {
        std::env::set_var("CRAFTOS_BASE_DIR", "/custom/base");
        assert_eq!(resolve_base_path(), PathBuf::from("/custom/base"));

        std::env::remove_var("CRAFTOS_BASE_DIR");
        assert!(resolve_base_path().ends_with(".craftos"));
    }

    #[test]
    #[serial]
    fn test_rom_path_env_override() {
        std::env::set_var("CRAFTOS_ROM_DIR", "/custom/rom");
        assert_eq!(resolve_rom_path(), PathBuf::from("/custom/rom"));

        std::env::remove_var("CRAFTOS_ROM_DIR");
        assert_eq!(resolve_rom_path(), PathBuf::from(DEFAULT_ROM_DIR));
    }

    #[test]
    fn test_create_directory_idempotent() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c");

        create_directory(&nested).unwrap();
        assert!(nested.is_dir());
        create_directory(&nested).unwrap();
    }

    #[test]
    fn test_remove_directory_recursive() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("computer");
        std::fs::create_dir_all(root.join("saves")).unwrap();
        std::fs::write(root.join("startup.lua"), "-- boot").unwrap();
        std::fs::write(root.join("saves").join("game.dat"), [0u8; 16]).unwrap();

        remove_directory(&root).unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_remove_directory_missing_fails() {
        let dir = tempdir().unwrap();
        assert!(remove_directory(&dir.path().join("nope")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_free_space() {
        let dir = tempdir().unwrap();
        assert!(free_space(dir.path()) > 0);
        assert_eq!(free_space(Path::new("/no/such/path/anywhere")), 0);
    }

    #[test]
    fn test_host_string_shape() {
        let host = host_string();
        let fields: Vec<&str> = host.split_whitespace().collect();
        assert!(fields.len() >= 3, "expected 3 fields, got: {host:?}");
        assert_eq!(fields[1], std::env::consts::ARCH);
    }
}
