//! Emulator configuration.
//!
//! Loaded from `<base>/config.json`. A missing file yields the defaults;
//! a malformed one is an error, never silently ignored.

use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::CraftResult;
use crate::mount::{Backing, MemStore};
use crate::platform;

/// Extra mount applied at computer startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountSpec {
    /// Mount point in the emulated namespace.
    pub path: String,
    /// Host directory backing the mount, or the literal `mem` for an
    /// empty in-memory store.
    pub source: String,
    #[serde(default)]
    pub read_only: bool,
}

impl MountSpec {
    /// Backing described by `source`.
    pub fn backing(&self) -> Backing {
        if self.source == "mem" {
            Backing::Memory(MemStore::new())
        } else {
            Backing::Host(PathBuf::from(&self.source))
        }
    }
}

/// Emulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Whether the computer's root mount refuses writes.
    #[serde(default)]
    pub root_read_only: bool,
    /// Whether the ROM mount refuses writes.
    #[serde(default = "default_true")]
    pub rom_read_only: bool,
    /// Extra mounts applied after `/` and `/rom`.
    #[serde(default)]
    pub mounts: Vec<MountSpec>,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_read_only: false,
            rom_read_only: true,
            mounts: Vec::new(),
        }
    }
}

impl Config {
    /// Configuration file location under a base directory.
    pub fn path_under(base: &Path) -> PathBuf {
        base.join("config.json")
    }

    /// Load from `<base>/config.json`.
    pub fn load(base: &Path) -> CraftResult<Self> {
        let path = Self::path_under(base);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    /// Write to `<base>/config.json`, creating the base directory first.
    pub fn save(&self, base: &Path) -> CraftResult<()> {
        platform::create_directory(base)?;
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::path_under(base), text)?;
        Ok(())
    }
}
