use thiserror::Error;

use crate::memory::MemoryError;

/// Fault classes used for diagnostics and abort reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// The catch-all decode pattern matched the instruction word.
    Decode,
    /// Fetch, load or store touched an address outside physical memory.
    Memory,
}

/// Instruction-level faults raised while fetching, decoding or executing.
///
/// Every fault aborts the current execution run; none of them is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// The instruction word only matched the catch-all invalid pattern.
    #[error("invalid instruction {raw:#010x} at pc = {pc:#010x}")]
    IllegalInstruction {
        /// Address of the faulting instruction.
        pc: u32,
        /// Raw instruction word.
        raw: u32,
    },
    /// A fetch, load or store accessed unmapped memory.
    #[error("memory fault at pc = {pc:#010x}: {source}")]
    Memory {
        /// Address of the faulting instruction.
        pc: u32,
        /// Underlying memory access failure.
        source: MemoryError,
    },
}

impl Fault {
    /// Returns the program counter of the faulting instruction.
    #[must_use]
    pub const fn pc(self) -> u32 {
        match self {
            Self::IllegalInstruction { pc, .. } | Self::Memory { pc, .. } => pc,
        }
    }

    /// Returns the diagnostics class for this fault.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::IllegalInstruction { .. } => FaultClass::Decode,
            Self::Memory { .. } => FaultClass::Memory,
        }
    }
}
