//! Memory access layer consumed by the execute engine and the expression evaluator.

/// Access widths, the `Memory` trait and access errors.
pub mod access;
/// Flat little-endian physical memory.
pub mod physical;

pub use access::{AccessWidth, Memory, MemoryError};
pub use physical::{PhysicalMemory, DEFAULT_MEMORY_BASE, DEFAULT_MEMORY_SIZE};
