//! Host-facing contracts: configuration, step and run outcomes, and the
//! trace event sink.

use std::fmt;

use tracing::info;

use crate::execute::ControlTransfer;
use crate::fault::Fault;
use crate::memory::{DEFAULT_MEMORY_BASE, DEFAULT_MEMORY_SIZE};
use crate::state::RunState;
use crate::watchpoint::WatchChange;

/// Top-level configuration for an emulator session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// First physical address and reset vector.
    pub memory_base: u32,
    /// Physical memory size in bytes.
    pub memory_size: usize,
    /// Record executed instructions in the ring buffer.
    pub itrace: bool,
    /// Trace function calls and returns against the symbol table.
    pub ftrace: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            memory_base: DEFAULT_MEMORY_BASE,
            memory_size: DEFAULT_MEMORY_SIZE,
            itrace: true,
            ftrace: false,
        }
    }
}

/// Status of one fetch/decode/execute attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// The instruction retired.
    Retired {
        /// Address of the instruction.
        pc: u32,
        /// Raw instruction word.
        raw: u32,
        /// Call/return classification of a jump.
        transfer: Option<ControlTransfer>,
    },
    /// The trap instruction ended the program.
    Trap {
        /// Address of the trap instruction.
        pc: u32,
        /// Raw instruction word.
        raw: u32,
        /// Exit code taken from `a0`.
        code: u32,
    },
    /// The instruction faulted.
    Fault {
        /// Raw word, when the fetch itself succeeded.
        raw: Option<u32>,
        /// Fault details.
        fault: Fault,
    },
}

/// Aggregated outcome of [`crate::Emulator::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Instructions retired during this call.
    pub steps: u64,
    /// Run state on return.
    pub state: RunState,
    /// Watchpoint changes that stopped the run.
    pub watch_changes: Vec<WatchChange>,
}

/// Function entry observed by the call tracer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CallRecord {
    /// Address of the call instruction.
    pub pc: u32,
    /// Call target.
    pub target: u32,
    /// Function symbol at `target`, if any.
    pub name: Option<String>,
    /// Call depth after entering the function.
    pub depth: usize,
}

/// Function exit observed by the call tracer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ReturnRecord {
    /// Address of the return (or of the discharged tail call).
    pub pc: u32,
    /// Function containing `pc`, if any.
    pub name: Option<String>,
    /// Call depth before leaving the function.
    pub depth: usize,
}

/// Trace events emitted by the call tracer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TraceEvent {
    /// A traced call.
    Call(CallRecord),
    /// A traced return.
    Return(ReturnRecord),
}

impl TraceEvent {
    /// Indentation in spaces: `2 * (depth - 3)`.
    #[must_use]
    pub const fn indent(&self) -> usize {
        let depth = match self {
            Self::Call(record) => record.depth,
            Self::Return(record) => record.depth,
        };
        2 * depth.saturating_sub(3)
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = self.indent();
        match self {
            Self::Call(record) => write!(
                f,
                "{:#010x}: {:indent$}call [{}@{:#010x}]",
                record.pc,
                "",
                record.name.as_deref().unwrap_or("???"),
                record.target,
            ),
            Self::Return(record) => write!(
                f,
                "{:#010x}: {:indent$}ret [{}]",
                record.pc,
                "",
                record.name.as_deref().unwrap_or("???"),
            ),
        }
    }
}

/// Sink for call-trace events.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: &TraceEvent);
}

/// Sink writing each event as an `info` log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn on_event(&mut self, event: &TraceEvent) {
        info!(target: "ftrace", "{event}");
    }
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: &TraceEvent) {
        self.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::{CallRecord, CoreConfig, ReturnRecord, TraceEvent, TraceSink};
    use crate::memory::DEFAULT_MEMORY_BASE;

    #[test]
    fn default_config_maps_memory_at_reset_vector() {
        let config = CoreConfig::default();
        assert_eq!(config.memory_base, DEFAULT_MEMORY_BASE);
        assert_eq!(config.memory_size, 0x0800_0000);
        assert!(config.itrace);
        assert!(!config.ftrace);
    }

    #[test]
    fn trace_lines_indent_by_depth() {
        let call = TraceEvent::Call(CallRecord {
            pc: 0x8000_0010,
            target: 0x8000_0100,
            name: Some("fib".to_owned()),
            depth: 4,
        });
        let ret = TraceEvent::Return(ReturnRecord {
            pc: 0x8000_0120,
            name: None,
            depth: 3,
        });

        assert_eq!(call.to_string(), "0x80000010:   call [fib@0x80000100]");
        assert_eq!(ret.to_string(), "0x80000120: ret [???]");
    }

    #[test]
    fn vec_sink_collects_in_order() {
        let mut sink: Vec<TraceEvent> = Vec::new();
        let event = TraceEvent::Return(ReturnRecord {
            pc: 0,
            name: None,
            depth: 3,
        });
        sink.on_event(&event);
        sink.on_event(&event);
        assert_eq!(sink.len(), 2);
    }
}
