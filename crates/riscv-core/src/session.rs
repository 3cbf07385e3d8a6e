//! The emulator session: one hart, its memory, and the debugger state
//! attached to it.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{CoreConfig, LogSink, RunOutcome, StepOutcome, TraceSink};
use crate::execute::{self, ControlTransfer};
use crate::expr::{evaluate, ExprContext, ExprError};
use crate::memory::{AccessWidth, Memory, MemoryError, PhysicalMemory};
use crate::state::{RegisterFile, RunState};
use crate::trace::{CallTracer, InstructionRing, SymbolTable};
use crate::watchpoint::{WatchReport, WatchpointError, WatchpointId, WatchpointPool};

/// Failure of a debugger operation on the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Watchpoint pool failure.
    #[error(transparent)]
    Watchpoint(#[from] WatchpointError),
    /// Expression failure.
    #[error(transparent)]
    Expr(#[from] ExprError),
}

impl SessionError {
    /// Returns `true` when the debugging session cannot continue.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Watchpoint(err) => err.is_fatal(),
            Self::Expr(err) => err.is_fatal(),
        }
    }
}

struct SessionContext<'a, M> {
    regs: &'a RegisterFile,
    memory: &'a M,
    symbols: &'a SymbolTable,
}

impl<M: Memory> ExprContext for SessionContext<'_, M> {
    fn register(&self, name: &str) -> Option<u32> {
        self.regs.lookup(name)
    }

    fn symbol(&self, name: &str) -> Option<u32> {
        self.symbols.lookup(name).map(|symbol| symbol.address)
    }

    fn read_word(&self, addr: u32) -> Result<u32, MemoryError> {
        self.memory.read(addr, AccessWidth::Word)
    }
}

/// A single-hart emulator with its debugger state.
pub struct Emulator<M: Memory = PhysicalMemory> {
    config: CoreConfig,
    regs: RegisterFile,
    memory: M,
    watchpoints: WatchpointPool,
    ring: InstructionRing,
    tracer: CallTracer,
    sink: Box<dyn TraceSink>,
    run_state: RunState,
    retired: u64,
}

impl Emulator<PhysicalMemory> {
    /// Creates a session with zeroed physical memory described by `config`.
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        let memory = PhysicalMemory::new(config.memory_base, config.memory_size);
        Self::with_memory(config, memory)
    }

    /// Copies `image` into physical memory at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::ImageTooLarge`] when the image does not fit.
    pub fn load_image(&mut self, addr: u32, image: &[u8]) -> Result<(), MemoryError> {
        self.memory.load(addr, image)?;
        info!(
            addr = format_args!("{addr:#010x}"),
            len = image.len(),
            "image loaded"
        );
        Ok(())
    }
}

impl<M: Memory> Emulator<M> {
    /// Creates a session over `memory`; execution starts at `config.memory_base`.
    #[must_use]
    pub fn with_memory(config: CoreConfig, memory: M) -> Self {
        Self {
            regs: RegisterFile::new(config.memory_base),
            memory,
            watchpoints: WatchpointPool::new(),
            ring: InstructionRing::new(),
            tracer: CallTracer::default(),
            sink: Box::new(LogSink),
            run_state: RunState::Stopped,
            retired: 0,
            config,
        }
    }

    /// Routes call-trace events to `sink`.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.sink = sink;
    }

    /// Installs the image's symbol table.
    pub fn set_symbols(&mut self, symbols: SymbolTable) {
        info!(count = symbols.len(), "symbols loaded");
        self.tracer.set_symbols(symbols);
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Register file.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Mutable register file.
    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Guest memory.
    #[must_use]
    pub const fn memory(&self) -> &M {
        &self.memory
    }

    /// Mutable guest memory.
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Watchpoint pool.
    #[must_use]
    pub const fn watchpoints(&self) -> &WatchpointPool {
        &self.watchpoints
    }

    /// Instruction ring buffer.
    #[must_use]
    pub const fn ring(&self) -> &InstructionRing {
        &self.ring
    }

    /// Call tracer.
    #[must_use]
    pub const fn tracer(&self) -> &CallTracer {
        &self.tracer
    }

    /// Current run state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Instructions retired since the session started.
    #[must_use]
    pub const fn retired(&self) -> u64 {
        self.retired
    }

    /// Marks the session as left by the user.
    pub fn quit(&mut self) {
        self.run_state = RunState::Quit;
    }

    /// Lines for `info registers`.
    #[must_use]
    pub fn reg_display(&self) -> Vec<String> {
        self.regs.display_lines()
    }

    /// Evaluates `text` against the live registers, memory and symbols.
    ///
    /// # Errors
    ///
    /// See [`ExprError`].
    pub fn evaluate(&self, text: &str) -> Result<u32, ExprError> {
        evaluate(text, &self.context())
    }

    /// Reads `len` bytes starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns the first failing byte access.
    pub fn examine(&self, addr: u32, len: usize) -> Result<Vec<u8>, MemoryError> {
        match self.examine_prefix(addr, len) {
            (bytes, None) => Ok(bytes),
            (_, Some(err)) => Err(err),
        }
    }

    /// Reads up to `len` bytes starting at `addr`, stopping at the first
    /// unmapped byte. Returns the readable prefix and that byte's error.
    #[must_use]
    pub fn examine_prefix(&self, addr: u32, len: usize) -> (Vec<u8>, Option<MemoryError>) {
        let mut bytes = Vec::with_capacity(len);
        for offset in 0..len {
            let offset = u32::try_from(offset).unwrap_or(u32::MAX);
            match self
                .memory
                .read(addr.wrapping_add(offset), AccessWidth::Byte)
            {
                Ok(byte) => bytes.push(byte.to_le_bytes()[0]),
                Err(err) => return (bytes, Some(err)),
            }
        }
        (bytes, None)
    }

    /// Registers a watchpoint on `expr` and stores its current value.
    ///
    /// An expression that cannot be evaluated now is not registered.
    ///
    /// # Errors
    ///
    /// Returns the pool or evaluation failure.
    pub fn watch(&mut self, expr: &str) -> Result<WatchpointId, SessionError> {
        let id = self.watchpoints.register(expr)?;
        match self.evaluate(expr) {
            Ok(value) => {
                self.watchpoints.prime(id, value)?;
                Ok(id)
            }
            Err(err) => {
                self.watchpoints.remove(id)?;
                Err(err.into())
            }
        }
    }

    /// Removes watchpoint `id`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchpointError::NotFound`] for inactive numbers.
    pub fn unwatch(&mut self, id: WatchpointId) -> Result<(), SessionError> {
        self.watchpoints.remove(id)?;
        Ok(())
    }

    /// Runs one instruction and updates the ring buffer, call tracer and run
    /// state from its outcome.
    ///
    /// Returns `None` without executing anything once the program has ended
    /// or aborted.
    pub fn step_one(&mut self) -> Option<StepOutcome> {
        if self.run_state.is_terminated() {
            warn!("program execution has ended; restart the monitor to run again");
            return None;
        }
        let pc = self.regs.pc();
        let outcome = execute::step_one(&mut self.regs, &mut self.memory);

        let raw = match outcome {
            StepOutcome::Retired { raw, .. } | StepOutcome::Trap { raw, .. } => Some(raw),
            StepOutcome::Fault { raw, .. } => raw,
        };
        if let (true, Some(raw)) = (self.config.itrace, raw) {
            self.ring.record(pc, raw);
        }

        match outcome {
            StepOutcome::Retired { transfer, .. } => {
                self.retired += 1;
                if let (true, Some(transfer)) = (self.config.ftrace, transfer) {
                    self.trace_transfer(transfer);
                }
            }
            StepOutcome::Trap { pc, code, .. } => {
                self.retired += 1;
                self.run_state = RunState::End { pc, code };
                if code == 0 {
                    info!("HIT GOOD TRAP at pc = {pc:#010x}");
                } else {
                    warn!("HIT BAD TRAP at pc = {pc:#010x}, code = {code}");
                }
            }
            StepOutcome::Fault { fault, .. } => {
                self.run_state = RunState::Abort { fault };
                error!("ABORT: {fault}");
                self.dump_ring();
            }
        }
        Some(outcome)
    }

    /// Runs up to `limit` instructions, or until the program stops when
    /// `limit` is `None`.
    ///
    /// Stops early on a trap, a fault or a watchpoint change. A session whose
    /// program already ended does not run again.
    ///
    /// # Errors
    ///
    /// Returns a fatal watch-expression failure; the session is left stopped.
    pub fn execute(&mut self, limit: Option<u64>) -> Result<RunOutcome, SessionError> {
        if self.run_state.is_terminated() {
            warn!("program execution has ended; restart the monitor to run again");
            return Ok(RunOutcome {
                steps: 0,
                state: self.run_state,
                watch_changes: Vec::new(),
            });
        }

        self.run_state = RunState::Running;
        let mut steps = 0_u64;
        let mut watch_changes = Vec::new();
        while limit.map_or(true, |limit| steps < limit) {
            match self.step_one() {
                Some(StepOutcome::Retired { .. }) => steps += 1,
                Some(StepOutcome::Trap { .. }) => {
                    steps += 1;
                    break;
                }
                Some(StepOutcome::Fault { .. }) | None => break,
            }

            let report = match self.check_watchpoints() {
                Ok(report) => report,
                Err(err) => {
                    self.run_state = RunState::Stopped;
                    return Err(err.into());
                }
            };
            if report.triggered() {
                watch_changes = report.changes;
                break;
            }
        }

        if self.run_state == RunState::Running {
            self.run_state = RunState::Stopped;
        }
        debug!(steps, total = self.retired, state = ?self.run_state, "run finished");
        Ok(RunOutcome {
            steps,
            state: self.run_state,
            watch_changes,
        })
    }

    fn check_watchpoints(&mut self) -> Result<WatchReport, ExprError> {
        let ctx = SessionContext {
            regs: &self.regs,
            memory: &self.memory,
            symbols: self.tracer.symbols(),
        };
        self.watchpoints.check_all(&ctx)
    }

    fn trace_transfer(&mut self, transfer: ControlTransfer) {
        let sink = self.sink.as_mut();
        match transfer {
            ControlTransfer::Call { pc, target } => self.tracer.on_call(pc, target, false, sink),
            ControlTransfer::TailCall { pc, target } => {
                self.tracer.on_call(pc, target, true, sink);
            }
            ControlTransfer::Return { pc } => self.tracer.on_return(pc, sink),
            ControlTransfer::Jump { pc, target } => {
                if self.tracer.symbols().function_at(target).is_some() {
                    self.tracer.on_call(pc, target, true, sink);
                }
            }
        }
    }

    fn dump_ring(&self) {
        if self.ring.is_empty() {
            return;
        }
        for line in self.ring.render() {
            error!("{line}");
        }
    }

    fn context(&self) -> SessionContext<'_, M> {
        SessionContext {
            regs: &self.regs,
            memory: &self.memory,
            symbols: self.tracer.symbols(),
        }
    }
}
