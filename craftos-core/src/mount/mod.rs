//! Mount layer for the emulated filesystem.
//!
//! This module provides the mount resolution architecture:
//! - `MountTable`: Per-computer registry with longest-prefix resolution
//! - `Backing`: Host directory or in-memory storage behind a mount
//! - `MemStore`: Synthetic backing for ROM images and scratch media

mod memory;
mod table;

pub use memory::MemStore;
pub use table::{Backing, MountEntry, MountTable, ResolvedLocation};
