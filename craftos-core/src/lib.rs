//! CraftOS Computer Emulator Core
//!
//! This crate provides the filesystem core for emulating a CraftOS
//! computer:
//! - Mount table mapping the virtual namespace onto host directories
//! - In-memory backings for ROM images and scratch media
//! - Platform services (data/ROM locations, free space, host identity)
//!
//! # Architecture
//!
//! The resolution layer uses a layered design:
//! - `VirtualPath`: Normalized paths in the emulated namespace
//! - `MountTable`: Per-computer registry with longest-prefix resolution
//! - `Backing`: Host directory or `MemStore` behind each mount
//! - `Computer`: Wires config, platform paths, and the standard mount set

pub mod computer;
pub mod config;
pub mod error;
pub mod mount;
pub mod path;
pub mod platform;

pub use computer::Computer;
pub use config::{Config, MountSpec};
pub use error::{CraftError, CraftResult};
pub use mount::{Backing, MemStore, MountEntry, MountTable, ResolvedLocation};
pub use path::VirtualPath;
