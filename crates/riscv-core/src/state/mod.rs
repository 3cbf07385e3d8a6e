//! Architectural CPU state model primitives.

/// General-purpose register file and program counter.
pub mod registers;
/// Emulator run-state machine.
pub mod run_state;

pub use registers::{RegisterFile, GPR_COUNT, REGISTER_NAMES, REG_A0, REG_RA, REG_SP, REG_ZERO};
pub use run_state::RunState;
