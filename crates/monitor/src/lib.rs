//! Debugger monitor for the RV32IM emulator core.
//!
//! Provides the command-line configuration, guest image loading, and the
//! interactive command loop used by the `rvmon` binary.

/// Command-line arguments.
pub mod config;
/// ELF and raw image loading.
pub mod loader;
/// Debugger command loop.
pub mod sdb;

pub use config::Args;
pub use loader::{load, ImageKind, LoadedImage, BUILTIN_IMAGE};
pub use sdb::{LineReader, Monitor, StdinReader, COMMANDS};

#[cfg(test)]
use tempfile as _;
use tracing_subscriber as _;
