//! Command-line arguments.

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use riscv_core::{CoreConfig, DEFAULT_MEMORY_BASE, DEFAULT_MEMORY_SIZE};

/// `rvmon` command line.
#[derive(Debug, Clone, Parser)]
#[command(name = "rvmon")]
#[command(about = "RV32IM emulator with an interactive debugger monitor")]
#[command(version)]
pub struct Args {
    /// ELF or raw binary to load; a built-in program runs when omitted
    #[arg(value_name = "IMAGE")]
    pub image: Option<Utf8PathBuf>,

    /// Run to completion without the command prompt
    #[arg(short, long)]
    pub batch: bool,

    /// Disable the instruction ring buffer
    #[arg(long = "no-itrace", action = ArgAction::SetFalse)]
    pub itrace: bool,

    /// Trace function calls and returns against the image's symbols
    #[arg(long)]
    pub ftrace: bool,

    /// Physical memory base and reset vector (e.g. 0x80000000)
    #[arg(long, value_parser = parse_hex, default_value_t = DEFAULT_MEMORY_BASE)]
    pub mem_base: u32,

    /// Physical memory size in bytes
    #[arg(long, value_parser = parse_size, default_value_t = DEFAULT_MEMORY_SIZE)]
    pub mem_size: usize,

    /// Log filter used when `RUST_LOG` is not set
    #[arg(long, default_value = "info")]
    pub log: String,
}

impl Args {
    /// Emulator configuration selected by the arguments.
    #[must_use]
    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            memory_base: self.mem_base,
            memory_size: self.mem_size,
            itrace: self.itrace,
            ftrace: self.ftrace,
        }
    }
}

fn parse_hex(s: &str) -> Result<u32, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse()
    }
}

fn parse_size(s: &str) -> Result<usize, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x") {
        usize::from_str_radix(hex, 16)
    } else {
        s.parse()
    }
}
