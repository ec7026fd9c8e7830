//! CraftOS CLI - Inspect the emulated filesystem from the command line.
//!
//! Usage:
//!   craftos [--id N] [--mount VIRTUAL=SOURCE[:ro]]... <COMMAND>
//!
//! Examples:
//!   craftos paths                          # Show base/ROM/BIOS/plugin dirs
//!   craftos host                           # Show host identification
//!   craftos mounts                         # Attach computer 0, list mounts
//!   craftos resolve /rom/bios.lua disk/x   # Resolve emulated paths
//!   craftos df /                           # Free space on the root mount
//!   craftos --mount /disk=/media/usb:ro mounts
//!   craftos --mount /scratch=mem resolve /scratch/tmp

use clap::{Parser, Subcommand};
use log::debug;

use craftos_core::{platform, Computer, Config, CraftError, CraftResult, MountSpec};

/// CraftOS Emulator CLI
#[derive(Parser, Debug)]
#[command(name = "craftos")]
#[command(about = "Inspect a CraftOS computer's mounts")]
struct Args {
    /// Computer id to attach
    #[arg(long, default_value_t = 0)]
    id: u32,

    /// Extra media as VIRTUAL=SOURCE[:ro]; SOURCE is a host directory or `mem`
    #[arg(long = "mount", value_name = "SPEC")]
    mounts: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the platform directories
    Paths,
    /// Print the host identification string
    Host,
    /// Attach a computer and list its mount table
    Mounts,
    /// Resolve emulated paths against an attached computer
    Resolve {
        /// Paths in the emulated namespace
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Report free space for the mount governing a path
    Df {
        /// Path in the emulated namespace
        path: String,
    },
}

/// Parse `VIRTUAL=SOURCE[:ro]` into a mount spec.
fn parse_mount_spec(raw: &str) -> CraftResult<MountSpec> {
    let (path, rest) = raw
        .split_once('=')
        .ok_or_else(|| CraftError::InvalidPath(raw.to_string()))?;
    let (source, read_only) = match rest.strip_suffix(":ro") {
        Some(source) => (source, true),
        None => (rest, false),
    };
    if path.is_empty() || source.is_empty() {
        return Err(CraftError::InvalidPath(raw.to_string()));
    }
    Ok(MountSpec {
        path: path.to_string(),
        source: source.to_string(),
        read_only,
    })
}

/// Attach the computer named by the arguments, with any extra media.
fn attach(args: &Args) -> CraftResult<Computer> {
    let config = Config::load(platform::base_path())?;
    let computer = Computer::attach(args.id, &config)?;
    for raw in &args.mounts {
        debug!("attaching extra media {raw}");
        let spec = parse_mount_spec(raw)?;
        computer.mount_media(&spec.path, spec.backing(), spec.read_only)?;
    }
    Ok(computer)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    match &args.command {
        Command::Paths => {
            println!("base:    {}", platform::base_path().display());
            println!("rom:     {}", platform::rom_path().display());
            println!("bios:    {}", platform::bios_path().display());
            println!("plugins: {}", platform::plugin_path().display());
        }
        Command::Host => {
            println!("{}", platform::host_string());
        }
        Command::Mounts => {
            let computer = attach(&args)?;
            for entry in computer.table().mounts() {
                let policy = if entry.read_only { "ro" } else { "rw" };
                println!("{}\t{}\t{}", entry.virtual_path, policy, entry.backing);
            }
        }
        Command::Resolve { paths } => {
            let computer = attach(&args)?;
            let mut failed = false;
            for path in paths {
                match computer.table().resolve(path) {
                    Ok(loc) => {
                        let policy = if loc.read_only { "ro" } else { "rw" };
                        match loc.host_path() {
                            Some(host) => println!("{path} -> {} [{policy}]", host.display()),
                            None => println!("{path} -> memory:{} [{policy}]", loc.remainder),
                        }
                    }
                    Err(err) => {
                        eprintln!("{path}: {err}");
                        failed = true;
                    }
                }
            }
            if failed {
                return Err("some paths did not resolve".into());
            }
        }
        Command::Df { path } => {
            let computer = attach(&args)?;
            println!("{}", computer.table().free_space(path)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mount_spec() {
        let spec = parse_mount_spec("/disk=/media/usb").unwrap();
        assert_eq!(spec.path, "/disk");
        assert_eq!(spec.source, "/media/usb");
        assert!(!spec.read_only);

        let spec = parse_mount_spec("/disk=/media/usb:ro").unwrap();
        assert!(spec.read_only);

        let spec = parse_mount_spec("/scratch=mem").unwrap();
        assert_eq!(spec.source, "mem");
    }

    #[test]
    fn test_parse_mount_spec_rejects_malformed() {
        for raw in ["nodelimiter", "=source", "/disk=", ""] {
            assert!(
                parse_mount_spec(raw).is_err(),
                "expected error for {raw:?}"
            );
        }
    }
}
