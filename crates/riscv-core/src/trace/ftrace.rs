//! Call/return tracing resolved against the image's function symbols.
//!
//! The first two call levels (startup code and `main`) are not logged. A tail
//! call (`jalr zero` to a function other than through `ra`) leaves no return
//! of its own, so the caller is remembered on a chain and its return is logged
//! once the tail-called function returns.

use tracing::trace;

use crate::api::{CallRecord, ReturnRecord, TraceEvent, TraceSink};
use crate::trace::symbols::SymbolTable;

/// Call levels below this depth are tracked but not logged.
const SILENT_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TailCallEntry {
    pc: u32,
    target: u32,
}

/// Function-call tracer.
#[derive(Debug, Clone, Default)]
pub struct CallTracer {
    symbols: SymbolTable,
    depth: usize,
    chain: Vec<TailCallEntry>,
}

impl CallTracer {
    /// Creates a tracer over `symbols`.
    #[must_use]
    pub fn new(symbols: SymbolTable) -> Self {
        Self {
            symbols,
            depth: 0,
            chain: Vec::new(),
        }
    }

    /// Symbol table used for name resolution.
    #[must_use]
    pub const fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Replaces the symbol table and resets the call depth.
    pub fn set_symbols(&mut self, symbols: SymbolTable) {
        self.symbols = symbols;
        self.depth = 0;
        self.chain.clear();
    }

    /// Current call depth.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Number of tail calls awaiting their implied return.
    #[must_use]
    pub fn pending_tail_calls(&self) -> usize {
        self.chain.len()
    }

    /// Records a call from `pc` to `target`.
    pub fn on_call(&mut self, pc: u32, target: u32, is_tail: bool, sink: &mut dyn TraceSink) {
        self.depth += 1;
        if self.depth > SILENT_DEPTH {
            let name = self
                .symbols
                .function_at(target)
                .map(|symbol| symbol.name.clone());
            sink.on_event(&TraceEvent::Call(CallRecord {
                pc,
                target,
                name,
                depth: self.depth,
            }));
        } else {
            trace!(pc, target, depth = self.depth, "call below trace depth");
        }
        if is_tail {
            self.chain.push(TailCallEntry { pc, target });
        }
    }

    /// Records a return executed at `pc`, then discharges every tail call
    /// whose callee is the function that just returned.
    pub fn on_return(&mut self, pc: u32, sink: &mut dyn TraceSink) {
        let mut pc = pc;
        loop {
            if self.depth <= SILENT_DEPTH {
                return;
            }
            let returning = self.symbols.function_containing(pc);
            sink.on_event(&TraceEvent::Return(ReturnRecord {
                pc,
                name: returning.map(|symbol| symbol.name.clone()),
                depth: self.depth,
            }));
            self.depth -= 1;

            let Some(returning) = returning.map(|symbol| symbol.address) else {
                return;
            };
            let Some(head) = self.chain.last().copied() else {
                return;
            };
            let callee = self
                .symbols
                .function_containing(head.target)
                .map(|symbol| symbol.address);
            if callee != Some(returning) {
                return;
            }
            self.chain.pop();
            pc = head.pc;
        }
    }
}
