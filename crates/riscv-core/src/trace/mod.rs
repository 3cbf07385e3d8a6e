//! Execution tracing: the instruction ring buffer and the symbol-aware
//! function-call tracer.

/// Function-call tracer with tail-call collapsing.
pub mod ftrace;
/// Fixed-capacity ring of recently executed instructions.
pub mod iringbuf;
/// Function symbols loaded from the guest image.
pub mod symbols;

pub use ftrace::CallTracer;
pub use iringbuf::{InstructionRing, RingEntry, RingLine, RingLines, IRINGBUF_CAPACITY};
pub use symbols::{Symbol, SymbolKind, SymbolTable, MAX_SYMBOL_NAME_LEN};
