//! `rvmon`: run an RV32IM image under the debugger monitor.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use monitor::{load, Args, Monitor, StdinReader};
use riscv_core::Emulator;
use tracing::info;
use tracing_subscriber::EnvFilter;

use camino as _;
use elf as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&args.log))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut emu = Emulator::new(args.core_config());
    let loaded = load(&mut emu, args.image.as_deref())?;
    info!(
        kind = ?loaded.kind,
        entry = format_args!("{:#010x}", loaded.entry),
        bytes = loaded.bytes,
        symbols = loaded.symbols,
        "image ready"
    );

    let mut monitor = Monitor::new(emu);
    let mut out = io::stdout().lock();
    if args.batch {
        monitor.batch(&mut out)?;
    } else {
        monitor
            .run(&mut StdinReader, &mut out)
            .context("monitor session failed")?;
    }

    let state = monitor.emulator().run_state();
    info!(?state, retired = monitor.emulator().retired(), "monitor exiting");
    Ok(if state.is_bad_exit() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
