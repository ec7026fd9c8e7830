//! Computer instance wiring.
//!
//! A Computer owns one mount table and its id. Attaching builds the
//! standard mount set (root, ROM, configured extras); dropping the
//! instance discards the mounts and keeps the backing files.

use std::path::{Path, PathBuf};

use log::debug;

use crate::config::Config;
use crate::error::{CraftError, CraftResult};
use crate::mount::{Backing, MountTable};
use crate::platform;

/// One emulated computer.
pub struct Computer {
    id: u32,
    data_dir: PathBuf,
    table: MountTable,
}

impl Computer {
    /// Attach a computer using the platform's base and ROM directories.
    pub fn attach(id: u32, config: &Config) -> CraftResult<Self> {
        Self::attach_at(id, config, platform::base_path(), platform::rom_path())
    }

    /// Attach with explicit base and ROM roots.
    ///
    /// Mount order: `/` onto `<base>/computer/<id>` (created on demand),
    /// `/rom` onto `<rom>/rom`, then the configured extras. A missing ROM
    /// directory aborts the attach; it is the only fatal startup error.
    pub fn attach_at(id: u32, config: &Config, base: &Path, rom: &Path) -> CraftResult<Self> {
        let rom_dir = rom.join("rom");
        if !rom_dir.is_dir() {
            return Err(CraftError::BackingUnavailable {
                path: rom_dir,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let data_dir = base.join("computer").join(id.to_string());
        let table = MountTable::new();
        table.mount("/", Backing::Host(data_dir.clone()), config.root_read_only)?;
        table.mount("/rom", Backing::Host(rom_dir), config.rom_read_only)?;
        for spec in &config.mounts {
            table.mount(&spec.path, spec.backing(), spec.read_only)?;
        }

        debug!("computer {id} attached at {}", data_dir.display());
        Ok(Self {
            id,
            data_dir,
            table,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Host directory holding this computer's writable data.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The computer's mount table; clones share it.
    pub fn table(&self) -> &MountTable {
        &self.table
    }

    /// Attach removable media at runtime.
    pub fn mount_media(
        &self,
        virtual_path: &str,
        backing: Backing,
        read_only: bool,
    ) -> CraftResult<()> {
        self.table.mount(virtual_path, backing, read_only)
    }

    /// Detach removable media.
    pub fn unmount_media(&self, virtual_path: &str) -> CraftResult<()> {
        self.table.unmount(virtual_path)
    }

    /// Delete this computer's data directory and discard the instance.
    ///
    /// Other mounts' backing storage is untouched.
    pub fn wipe(self) -> CraftResult<()> {
        debug!("wiping computer {}", self.id);
        platform::remove_directory(&self.data_dir)
    }
}
