//! The debugger command loop.
//!
//! Each input line is split into a command name and its argument text and
//! dispatched through [`COMMANDS`]. Recoverable errors are printed and the
//! loop continues; fatal ones end the session with an error.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use riscv_core::{Emulator, RunOutcome, RunState, SessionError, WatchpointId};
use tracing::debug;

/// Prompt shown before each interactive command.
pub const PROMPT: &str = "(rvmon) ";

/// Bytes per line of `x` output.
const BYTES_PER_LINE: usize = 4;

/// Source of command lines.
pub trait LineReader {
    /// Shows `prompt` and returns the next line, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures of the underlying stream.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Reads commands from standard input, printing the prompt to standard output.
#[derive(Debug, Default)]
pub struct StdinReader;

impl LineReader for StdinReader {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Whether the loop keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// Leave the loop.
    Quit,
}

type Handler = fn(&mut Monitor, &str, &mut dyn Write) -> Result<Flow>;

/// One entry of the command table.
pub struct Command {
    /// Name typed at the prompt.
    pub name: &'static str,
    /// Help text.
    pub description: &'static str,
    handler: Handler,
}

/// Commands understood by the monitor, in `help` order.
pub const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        description: "Display information about all supported commands",
        handler: cmd_help,
    },
    Command {
        name: "c",
        description: "Continue the execution of the program",
        handler: cmd_c,
    },
    Command {
        name: "q",
        description: "Exit the monitor",
        handler: cmd_q,
    },
    Command {
        name: "si",
        description: "si [N]: Execute N instructions and stop (default 1)",
        handler: cmd_si,
    },
    Command {
        name: "info",
        description: "info r|w: Print registers or watchpoints",
        handler: cmd_info,
    },
    Command {
        name: "p",
        description: "p EXPR: Print the value of EXPR",
        handler: cmd_p,
    },
    Command {
        name: "x",
        description: "x N EXPR: Scan N bytes of memory starting at EXPR",
        handler: cmd_x,
    },
    Command {
        name: "w",
        description: "w EXPR: Stop when the value of EXPR changes",
        handler: cmd_w,
    },
    Command {
        name: "d",
        description: "d N: Delete watchpoint N",
        handler: cmd_d,
    },
];

/// An emulator session driven by debugger commands.
pub struct Monitor {
    emu: Emulator,
}

impl Monitor {
    /// Wraps a loaded emulator.
    #[must_use]
    pub const fn new(emu: Emulator) -> Self {
        Self { emu }
    }

    /// The driven emulator.
    #[must_use]
    pub const fn emulator(&self) -> &Emulator {
        &self.emu
    }

    /// Reads and runs commands until `q` or end of input.
    ///
    /// # Errors
    ///
    /// Returns I/O failures and fatal command errors.
    pub fn run(&mut self, input: &mut dyn LineReader, out: &mut dyn Write) -> Result<()> {
        loop {
            let Some(line) = input.read_line(PROMPT).context("failed to read command")? else {
                debug!("end of input");
                self.emu.quit();
                return Ok(());
            };
            if self.execute_line(&line, out)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Runs the program to completion without reading commands.
    ///
    /// # Errors
    ///
    /// Returns output failures and fatal watch-expression errors.
    pub fn batch(&mut self, out: &mut dyn Write) -> Result<()> {
        cmd_c(self, "", out).map(|_| ())
    }

    /// Dispatches one command line.
    ///
    /// # Errors
    ///
    /// Returns output failures and fatal command errors.
    pub fn execute_line(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        let (name, args) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(name, args)| (name, args.trim()));

        match COMMANDS.iter().find(|command| command.name == name) {
            Some(command) => (command.handler)(self, args, out)
                .with_context(|| format!("command `{line}` failed")),
            None => {
                writeln!(out, "Unknown command '{name}'")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn run_for(&mut self, limit: Option<u64>, out: &mut dyn Write) -> Result<Flow> {
        if let Some(outcome) = recover(out, self.emu.execute(limit))? {
            report(&outcome, out)?;
        }
        Ok(Flow::Continue)
    }
}

/// Prints a recoverable error and yields `None`; fatal errors are returned.
fn recover<T>(out: &mut dyn Write, result: Result<T, SessionError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_fatal() => Err(err.into()),
        Err(err) => {
            writeln!(out, "{err}")?;
            Ok(None)
        }
    }
}

fn report(outcome: &RunOutcome, out: &mut dyn Write) -> Result<()> {
    for change in &outcome.watch_changes {
        writeln!(out, "{change}")?;
    }
    if outcome.steps == 0 && outcome.state.is_terminated() {
        writeln!(
            out,
            "The program has ended. Restart the monitor to run it again."
        )?;
        return Ok(());
    }
    match outcome.state {
        RunState::End { pc, code: 0 } => writeln!(out, "HIT GOOD TRAP at pc = {pc:#010x}")?,
        RunState::End { pc, code } => {
            writeln!(out, "HIT BAD TRAP at pc = {pc:#010x} (code {code})")?;
        }
        RunState::Abort { fault } => writeln!(out, "ABORT: {fault}")?,
        RunState::Stopped | RunState::Running | RunState::Quit => {}
    }
    Ok(())
}

fn cmd_help(_monitor: &mut Monitor, args: &str, out: &mut dyn Write) -> Result<Flow> {
    if args.is_empty() {
        for command in COMMANDS {
            writeln!(out, "{} - {}", command.name, command.description)?;
        }
        return Ok(Flow::Continue);
    }
    match COMMANDS.iter().find(|command| command.name == args) {
        Some(command) => writeln!(out, "{} - {}", command.name, command.description)?,
        None => writeln!(out, "Unknown command '{args}'")?,
    }
    Ok(Flow::Continue)
}

fn cmd_c(monitor: &mut Monitor, _args: &str, out: &mut dyn Write) -> Result<Flow> {
    monitor.run_for(None, out)
}

fn cmd_q(monitor: &mut Monitor, _args: &str, _out: &mut dyn Write) -> Result<Flow> {
    monitor.emu.quit();
    Ok(Flow::Quit)
}

fn cmd_si(monitor: &mut Monitor, args: &str, out: &mut dyn Write) -> Result<Flow> {
    let steps = if args.is_empty() {
        1
    } else if let Ok(steps) = args.parse::<u64>() {
        steps
    } else {
        writeln!(out, "Invalid step count '{args}'")?;
        return Ok(Flow::Continue);
    };
    monitor.run_for(Some(steps), out)
}

fn cmd_info(monitor: &mut Monitor, args: &str, out: &mut dyn Write) -> Result<Flow> {
    match args {
        "r" => {
            for line in monitor.emu.reg_display() {
                writeln!(out, "{line}")?;
            }
        }
        "w" => {
            let watchpoints = monitor.emu.watchpoints();
            if watchpoints.active_len() == 0 {
                writeln!(out, "No watchpoints.")?;
            } else {
                writeln!(out, "{:<6}{:<24}Value", "Num", "What")?;
                for wp in watchpoints.iter() {
                    let value = wp
                        .value
                        .map_or_else(|| "-".to_owned(), |value| format!("{value:#010x}"));
                    writeln!(out, "{:<6}{:<24}{value}", wp.id.to_string(), wp.expr)?;
                }
            }
        }
        _ => writeln!(out, "Usage: info r|w")?,
    }
    Ok(Flow::Continue)
}

fn cmd_p(monitor: &mut Monitor, args: &str, out: &mut dyn Write) -> Result<Flow> {
    if args.is_empty() {
        writeln!(out, "Usage: p EXPR")?;
        return Ok(Flow::Continue);
    }
    let result = monitor.emu.evaluate(args).map_err(SessionError::from);
    if let Some(value) = recover(out, result)? {
        writeln!(out, "{value:#010x}")?;
    }
    Ok(Flow::Continue)
}

fn cmd_x(monitor: &mut Monitor, args: &str, out: &mut dyn Write) -> Result<Flow> {
    let Some((count, expr)) = args.split_once(char::is_whitespace) else {
        writeln!(out, "Usage: x N EXPR")?;
        return Ok(Flow::Continue);
    };
    let Ok(count) = count.parse::<usize>() else {
        writeln!(out, "Invalid byte count '{count}'")?;
        return Ok(Flow::Continue);
    };
    let result = monitor.emu.evaluate(expr.trim()).map_err(SessionError::from);
    let Some(addr) = recover(out, result)? else {
        return Ok(Flow::Continue);
    };
    let (bytes, failure) = monitor.emu.examine_prefix(addr, count);

    for (line_addr, chunk) in (0_u32..)
        .map(|line| addr.wrapping_add(line * 4))
        .zip(bytes.chunks(BYTES_PER_LINE))
    {
        let hex: Vec<String> = chunk.iter().map(|byte| format!("{byte:#04x}")).collect();
        writeln!(out, "{line_addr:#010x}: {}", hex.join(" "))?;
    }
    if let Some(err) = failure {
        writeln!(out, "{err}")?;
    }
    Ok(Flow::Continue)
}

fn cmd_w(monitor: &mut Monitor, args: &str, out: &mut dyn Write) -> Result<Flow> {
    if args.is_empty() {
        writeln!(out, "Usage: w EXPR")?;
        return Ok(Flow::Continue);
    }
    if let Some(id) = recover(out, monitor.emu.watch(args))? {
        writeln!(out, "Watchpoint {id}: {args}")?;
    }
    Ok(Flow::Continue)
}

fn cmd_d(monitor: &mut Monitor, args: &str, out: &mut dyn Write) -> Result<Flow> {
    let Ok(number) = args.parse::<usize>() else {
        writeln!(out, "Usage: d N")?;
        return Ok(Flow::Continue);
    };
    let id = WatchpointId(number);
    if recover(out, monitor.emu.unwatch(id))?.is_some() {
        writeln!(out, "Deleted watchpoint {id}")?;
    }
    Ok(Flow::Continue)
}
