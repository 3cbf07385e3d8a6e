//! Core of an RV32IM emulator with debugger support.
//!
//! The crate decodes and executes RV32IM instructions over a flat physical
//! memory, evaluates debugger expressions against live machine state, keeps
//! a pool of data watchpoints, and traces execution through an instruction
//! ring buffer and a symbol-aware function-call tracer. [`Emulator`] ties
//! these together into one session.

/// Memory access contract and flat physical memory.
pub mod memory;
pub use memory::{
    AccessWidth, Memory, MemoryError, PhysicalMemory, DEFAULT_MEMORY_BASE, DEFAULT_MEMORY_SIZE,
};

/// Public host-facing API contract and integration types.
pub mod api;
pub use api::{
    CallRecord, CoreConfig, LogSink, ReturnRecord, RunOutcome, StepOutcome, TraceEvent, TraceSink,
};

/// Architectural hart state and run state.
pub mod state;
pub use state::{RegisterFile, RunState, GPR_COUNT, REGISTER_NAMES, REG_A0, REG_RA, REG_SP, REG_ZERO};

/// Instruction pattern table and mnemonic classification.
pub mod encoding;
pub use encoding::{classify, Format, InstructionPattern, Mnemonic, INSTRUCTION_TABLE};

/// Operand field extraction and immediate decoding.
pub mod decoder;
pub use decoder::{sign_extend, DecodedInstruction, Decoder};

/// Instruction-level fault taxonomy.
pub mod fault;
pub use fault::{Fault, FaultClass};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{
    commit_execution, execute_instruction, step_one, ControlTransfer, ExecuteOutcome,
    ExecuteState,
};

/// Instruction disassembly.
pub mod disasm;
pub use disasm::{disassemble_one, DisassemblyRow};

/// Debugger expression tokenizer and evaluator.
pub mod expr;
pub use expr::{evaluate, tokenize, ExprContext, ExprError, Token, TokenKind};

/// Data watchpoint pool.
pub mod watchpoint;
pub use watchpoint::{
    WatchChange, WatchReport, Watchpoint, WatchpointError, WatchpointId, WatchpointPool,
    MAX_EXPRESSION_LEN, WATCHPOINT_POOL_SIZE,
};

/// Instruction ring buffer and function-call tracer.
pub mod trace;
pub use trace::{CallTracer, InstructionRing, Symbol, SymbolKind, SymbolTable, IRINGBUF_CAPACITY};

/// Emulator session.
pub mod session;
pub use session::{Emulator, SessionError};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
