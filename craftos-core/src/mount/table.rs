//! Mount table - virtual path resolution for one computer.
//!
//! A MountTable provides:
//! - Mount registration from virtual paths to host or memory backings
//! - Longest-prefix resolution of emulated paths
//! - Read-only policy enforcement per governing mount
//!
//! Each computer instance owns one table. Clones share it, and every
//! operation goes through the table's single lock.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use log::debug;

use super::memory::MemStore;
use crate::error::{CraftError, CraftResult};
use crate::path::VirtualPath;
use crate::platform;

/// Where a mount's data lives.
#[derive(Debug, Clone)]
pub enum Backing {
    /// Directory on the host filesystem.
    Host(PathBuf),
    /// Synthetic in-memory store.
    Memory(MemStore),
}

impl fmt::Display for Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backing::Host(path) => write!(f, "host:{}", path.display()),
            Backing::Memory(_) => f.write_str("memory"),
        }
    }
}

/// One registered mount.
#[derive(Debug, Clone)]
pub struct MountEntry {
    /// Mount point in the emulated namespace.
    pub virtual_path: VirtualPath,
    /// Backing storage.
    pub backing: Backing,
    /// Whether writes through this mount are refused.
    pub read_only: bool,
}

/// Outcome of resolving an emulated path.
#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    /// Mount point of the governing (most specific) mount.
    pub mount: VirtualPath,
    /// The governing mount's backing.
    pub backing: Backing,
    /// Path below the mount point; relative, empty for the mount point
    /// itself.
    pub remainder: String,
    /// Effective policy inherited from the governing mount.
    pub read_only: bool,
}

impl ResolvedLocation {
    /// Host location of the resolved path; `None` for memory backings.
    pub fn host_path(&self) -> Option<PathBuf> {
        match &self.backing {
            Backing::Host(root) => {
                if self.remainder.is_empty() {
                    Some(root.clone())
                } else {
                    Some(root.join(&self.remainder))
                }
            }
            Backing::Memory(_) => None,
        }
    }
}

/// Shared table state (interior of Arc<RwLock<...>>).
#[derive(Default)]
struct MountTableInner {
    mounts: BTreeMap<VirtualPath, MountEntry>,
}

/// Mount registry for one computer instance.
///
/// Thread-safe; clone is cheap (just clones the Arc) and shares the table.
#[derive(Clone)]
pub struct MountTable {
    inner: Arc<RwLock<MountTableInner>>,
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MountTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MountTableInner::default())),
        }
    }

    /// Register a mount at a canonical absolute virtual path.
    ///
    /// A host backing directory that does not exist yet is created here, so
    /// the first access does not fail on a missing parent; creation failure
    /// surfaces as `BackingUnavailable` and nothing is registered.
    pub fn mount(&self, virtual_path: &str, backing: Backing, read_only: bool) -> CraftResult<()> {
        let vpath = VirtualPath::parse_canonical(virtual_path)?;
        let mut inner = self.inner.write().map_err(|_| CraftError::LockPoisoned)?;
        if inner.mounts.contains_key(&vpath) {
            return Err(CraftError::DuplicateMount(vpath.to_string()));
        }
        if let Backing::Host(root) = &backing {
            platform::create_directory(root).map_err(|source| CraftError::BackingUnavailable {
                path: root.clone(),
                source,
            })?;
        }
        debug!("mount {vpath} -> {backing} (read_only={read_only})");
        inner.mounts.insert(
            vpath.clone(),
            MountEntry {
                virtual_path: vpath,
                backing,
                read_only,
            },
        );
        Ok(())
    }

    /// Remove the mount registered at exactly `virtual_path`.
    ///
    /// Backing storage is never deleted.
    pub fn unmount(&self, virtual_path: &str) -> CraftResult<()> {
        let vpath = VirtualPath::parse_canonical(virtual_path)?;
        let mut inner = self.inner.write().map_err(|_| CraftError::LockPoisoned)?;
        if inner.mounts.remove(&vpath).is_none() {
            return Err(CraftError::NotMounted(vpath.to_string()));
        }
        debug!("unmount {vpath}");
        Ok(())
    }

    /// Resolve an emulated path to its governing mount.
    ///
    /// The path is normalized before matching, so `..` segments are
    /// resolved in the virtual namespace and a remainder can never point
    /// outside the governing backing.
    pub fn resolve(&self, emulated_path: &str) -> CraftResult<ResolvedLocation> {
        let vpath = VirtualPath::normalize(emulated_path)?;
        let inner = self.inner.read().map_err(|_| CraftError::LockPoisoned)?;
        let mut best: Option<(&MountEntry, String)> = None;
        for entry in inner.mounts.values() {
            if let Some(remainder) = vpath.strip_prefix(&entry.virtual_path) {
                let better = match &best {
                    Some((current, _)) => {
                        entry.virtual_path.segment_count() > current.virtual_path.segment_count()
                    }
                    None => true,
                };
                if better {
                    best = Some((entry, remainder));
                }
            }
        }
        match best {
            Some((entry, remainder)) => Ok(ResolvedLocation {
                mount: entry.virtual_path.clone(),
                backing: entry.backing.clone(),
                remainder,
                read_only: entry.read_only,
            }),
            None => Err(CraftError::NoMountFound(vpath.to_string())),
        }
    }

    /// Resolve for a mutating operation.
    ///
    /// Fails with `ReadOnlyViolation` when the governing mount is
    /// read-only, which keeps "you may not" distinct from "no such place".
    pub fn resolve_for_write(&self, emulated_path: &str) -> CraftResult<ResolvedLocation> {
        let location = self.resolve(emulated_path)?;
        if location.read_only {
            return Err(CraftError::ReadOnlyViolation(location.mount.to_string()));
        }
        Ok(location)
    }

    /// Whether a write at `emulated_path` would be allowed.
    pub fn is_writable(&self, emulated_path: &str) -> bool {
        self.resolve_for_write(emulated_path).is_ok()
    }

    /// Whether a mount is registered at exactly `virtual_path`.
    pub fn is_mounted(&self, virtual_path: &str) -> bool {
        let Ok(vpath) = VirtualPath::parse_canonical(virtual_path) else {
            return false;
        };
        if let Ok(inner) = self.inner.read() {
            return inner.mounts.contains_key(&vpath);
        }
        false
    }

    /// Snapshot of the registered mounts, ordered by mount point.
    pub fn mounts(&self) -> Vec<MountEntry> {
        match self.inner.read() {
            Ok(inner) => inner.mounts.values().cloned().collect(),
            Err(_) => vec![],
        }
    }

    /// Free space in bytes on the mount governing `emulated_path`.
    ///
    /// Read-only mounts report 0; memory backings are not size-limited.
    pub fn free_space(&self, emulated_path: &str) -> CraftResult<u64> {
        let location = self.resolve(emulated_path)?;
        if location.read_only {
            return Ok(0);
        }
        Ok(match &location.backing {
            Backing::Host(root) => platform::free_space(root),
            Backing::Memory(_) => u64::MAX,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mem() -> Backing {
        Backing::Memory(MemStore::new())
    }

    #[test]
    fn test_mount_resolve_remainder() {
        let table = MountTable::new();
        table.mount("/", mem(), false).unwrap();
        table.mount("/rom", mem(), true).unwrap();

        let loc = table.resolve("/rom/programs/ls.lua").unwrap();
        assert_eq!(loc.mount.as_str(), "/rom");
        assert_eq!(loc.remainder, "programs/ls.lua");
        assert!(loc.read_only);

        let loc = table.resolve("/rom").unwrap();
        assert_eq!(loc.mount.as_str(), "/rom");
        assert_eq!(loc.remainder, "");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = MountTable::new();
        table.mount("/", mem(), false).unwrap();
        table.mount("/rom", mem(), true).unwrap();
        table.mount("/rom/programs", mem(), false).unwrap();

        assert_eq!(
            table.resolve("/rom/programs/ls.lua").unwrap().mount.as_str(),
            "/rom/programs"
        );
        assert_eq!(table.resolve("/rom/bios.lua").unwrap().mount.as_str(), "/rom");
        assert_eq!(table.resolve("/startup.lua").unwrap().mount.as_str(), "/");
    }

    #[test]
    fn test_prefixes_match_segments_not_strings() {
        let table = MountTable::new();
        table.mount("/rom", mem(), true).unwrap();

        // `/romx` shares a string prefix with `/rom` but is not below it.
        assert!(matches!(
            table.resolve("/romx/file"),
            Err(CraftError::NoMountFound(_))
        ));
    }

    #[test]
    fn test_duplicate_mount_rejected() {
        let table = MountTable::new();
        table.mount("/rom", mem(), true).unwrap();

        assert!(matches!(
            table.mount("/rom", mem(), false),
            Err(CraftError::DuplicateMount(_))
        ));
    }

    #[test]
    fn test_unmount_falls_back() {
        let table = MountTable::new();
        table.mount("/", mem(), false).unwrap();
        table.mount("/disk", mem(), false).unwrap();

        assert_eq!(table.resolve("/disk/save.dat").unwrap().mount.as_str(), "/disk");

        table.unmount("/disk").unwrap();
        let loc = table.resolve("/disk/save.dat").unwrap();
        assert_eq!(loc.mount.as_str(), "/");
        assert_eq!(loc.remainder, "disk/save.dat");

        assert!(matches!(
            table.unmount("/disk"),
            Err(CraftError::NotMounted(_))
        ));
    }

    #[test]
    fn test_escape_attempts_stay_contained() {
        let table = MountTable::new();
        table.mount("/a", mem(), false).unwrap();

        // Normalization clamps at the root, so this lands on `/etc/passwd`
        // in the virtual namespace, where nothing is mounted.
        assert!(matches!(
            table.resolve("/a/../../etc/passwd"),
            Err(CraftError::NoMountFound(_))
        ));

        table.mount("/", mem(), false).unwrap();
        let loc = table.resolve("/a/../../etc/passwd").unwrap();
        assert_eq!(loc.mount.as_str(), "/");
        assert_eq!(loc.remainder, "etc/passwd");
    }

    #[test]
    fn test_dotdot_resolves_across_mounts() {
        let table = MountTable::new();
        table.mount("/", mem(), false).unwrap();
        table.mount("/rom", mem(), true).unwrap();

        // Normalized before matching: this is `/startup.lua`, governed by
        // the root mount, not the ROM mount.
        let loc = table.resolve("/rom/../startup.lua").unwrap();
        assert_eq!(loc.mount.as_str(), "/");
        assert_eq!(loc.remainder, "startup.lua");
        assert!(!loc.read_only);
    }

    #[test]
    fn test_read_only_policy() {
        let table = MountTable::new();
        table.mount("/", mem(), false).unwrap();
        table.mount("/rom", mem(), true).unwrap();

        assert!(!table.is_writable("/rom/bios.lua"));
        assert!(table.is_writable("/startup.lua"));
        assert!(!table.is_writable("/nowhere/../rom/bios.lua"));

        assert!(matches!(
            table.resolve_for_write("/rom/bios.lua"),
            Err(CraftError::ReadOnlyViolation(_))
        ));
        // Plain resolution still succeeds.
        assert!(table.resolve("/rom/bios.lua").is_ok());
    }

    #[test]
    fn test_mount_requires_canonical_path() {
        let table = MountTable::new();
        for raw in ["rom", "/rom/", "/a/../b"] {
            assert!(
                matches!(
                    table.mount(raw, mem(), false),
                    Err(CraftError::InvalidPath(_))
                ),
                "expected InvalidPath for {raw:?}"
            );
        }
    }

    #[test]
    fn test_resolve_with_no_mounts() {
        let table = MountTable::new();
        assert!(matches!(
            table.resolve("/anything"),
            Err(CraftError::NoMountFound(_))
        ));
    }

    #[test]
    fn test_is_mounted_is_exact() {
        let table = MountTable::new();
        table.mount("/rom", mem(), true).unwrap();

        assert!(table.is_mounted("/rom"));
        assert!(!table.is_mounted("/rom/programs"));
        assert!(!table.is_mounted("/"));
    }

    #[test]
    fn test_host_mount_creates_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("computer").join("0");

        let table = MountTable::new();
        table.mount("/", Backing::Host(root.clone()), false).unwrap();
        assert!(root.is_dir());

        let loc = table.resolve("/startup.lua").unwrap();
        assert_eq!(loc.host_path().unwrap(), root.join("startup.lua"));

        let loc = table.resolve("/").unwrap();
        assert_eq!(loc.host_path().unwrap(), root);
    }

    #[test]
    fn test_shared_clone() {
        let a = MountTable::new();
        let b = a.clone();

        a.mount("/rom", mem(), true).unwrap();
        assert!(b.is_mounted("/rom"));
        assert_eq!(b.mounts().len(), 1);
    }

    #[test]
    fn test_free_space_policies() {
        let dir = tempdir().unwrap();
        let table = MountTable::new();
        table.mount("/", Backing::Host(dir.path().join("root")), false).unwrap();
        table.mount("/rom", mem(), true).unwrap();
        table.mount("/scratch", mem(), false).unwrap();

        assert_eq!(table.free_space("/rom/bios.lua").unwrap(), 0);
        assert_eq!(table.free_space("/scratch/tmp.txt").unwrap(), u64::MAX);
        assert!(table.free_space("/startup.lua").unwrap() > 0);
    }
}
