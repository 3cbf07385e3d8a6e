use std::fmt;

use crate::disasm::disassemble_one;

/// Number of instructions the ring retains.
pub const IRINGBUF_CAPACITY: usize = 16;

const CURRENT_PREFIX: &str = " --> ";
const PLAIN_PREFIX: &str = "     ";
const HIGHLIGHT_START: &str = "\x1b[31m";
const HIGHLIGHT_END: &str = "\x1b[0m";

/// One recorded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RingEntry {
    /// Instruction address.
    pub pc: u32,
    /// Raw instruction word.
    pub raw: u32,
}

/// The last [`IRINGBUF_CAPACITY`] executed instructions, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstructionRing {
    entries: [RingEntry; IRINGBUF_CAPACITY],
    cursor: usize,
    wrapped: bool,
}

impl InstructionRing {
    /// Creates an empty ring.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an instruction, overwriting the oldest entry when full.
    pub fn record(&mut self, pc: u32, raw: u32) {
        self.entries[self.cursor] = RingEntry { pc, raw };
        self.cursor += 1;
        if self.cursor == IRINGBUF_CAPACITY {
            self.cursor = 0;
            self.wrapped = true;
        }
    }

    /// Number of retained entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        if self.wrapped {
            IRINGBUF_CAPACITY
        } else {
            self.cursor
        }
    }

    /// Returns `true` before the first record.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recently recorded entry.
    #[must_use]
    pub fn latest(&self) -> Option<RingEntry> {
        if self.is_empty() {
            return None;
        }
        let index = (self.cursor + IRINGBUF_CAPACITY - 1) % IRINGBUF_CAPACITY;
        Some(self.entries[index])
    }

    /// Renders the ring oldest to newest; the newest line is marked current.
    ///
    /// The ring is not consumed, so rendering can be repeated.
    #[must_use]
    pub const fn render(&self) -> RingLines<'_> {
        let start = if self.wrapped { self.cursor } else { 0 };
        RingLines {
            ring: self,
            next: start,
            remaining: self.len(),
        }
    }
}

/// Iterator over the lines of an [`InstructionRing`] dump.
#[derive(Debug, Clone)]
pub struct RingLines<'a> {
    ring: &'a InstructionRing,
    next: usize,
    remaining: usize,
}

impl Iterator for RingLines<'_> {
    type Item = RingLine;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let entry = self.ring.entries[self.next];
        self.next = (self.next + 1) % IRINGBUF_CAPACITY;
        self.remaining -= 1;
        Some(RingLine {
            pc: entry.pc,
            raw: entry.raw,
            current: self.remaining == 0,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RingLines<'_> {}

/// One line of a ring dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingLine {
    /// Instruction address.
    pub pc: u32,
    /// Raw instruction word.
    pub raw: u32,
    /// Whether this is the most recent instruction.
    pub current: bool,
}

impl fmt::Display for RingLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = disassemble_one(self.pc, self.raw);
        if self.current {
            write!(
                f,
                "{HIGHLIGHT_START}{CURRENT_PREFIX}{:#010x}: {:08x}  {row}{HIGHLIGHT_END}",
                self.pc, self.raw
            )
        } else {
            write!(f, "{PLAIN_PREFIX}{:#010x}: {:08x}  {row}", self.pc, self.raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InstructionRing, RingEntry, IRINGBUF_CAPACITY};

    const ADDI: u32 = 0x0015_0513;

    #[test]
    fn partial_ring_renders_in_record_order() {
        let mut ring = InstructionRing::new();
        for i in 0..3 {
            ring.record(0x8000_0000 + 4 * i, ADDI);
        }

        let lines: Vec<_> = ring.render().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].pc, 0x8000_0000);
        assert_eq!(lines[2].pc, 0x8000_0008);
        assert!(lines[2].current);
        assert!(!lines[0].current && !lines[1].current);
    }

    #[test]
    fn wrapped_ring_keeps_the_newest_entries() {
        let mut ring = InstructionRing::new();
        for i in 0..20 {
            ring.record(0x8000_0000 + 4 * i, ADDI);
        }

        assert_eq!(ring.len(), IRINGBUF_CAPACITY);
        let pcs: Vec<u32> = ring.render().map(|line| line.pc).collect();
        let expected: Vec<u32> = (4..20).map(|i| 0x8000_0000 + 4 * i).collect();
        assert_eq!(pcs, expected);
        assert_eq!(
            ring.latest(),
            Some(RingEntry {
                pc: 0x8000_004C,
                raw: ADDI
            })
        );
    }

    #[test]
    fn rendering_is_repeatable() {
        let mut ring = InstructionRing::new();
        ring.record(0x8000_0000, ADDI);
        let lines = ring.render();
        assert_eq!(lines.clone().count(), 1);
        assert_eq!(lines.count(), 1);
        assert_eq!(ring.render().len(), 1);
    }

    #[test]
    fn current_line_is_highlighted() {
        let mut ring = InstructionRing::new();
        ring.record(0x8000_0000, ADDI);
        ring.record(0x8000_0004, 0x0010_0073);

        let text: Vec<String> = ring.render().map(|line| line.to_string()).collect();
        assert_eq!(text[0], "     0x80000000: 00150513  addi a0, a0, 1");
        assert_eq!(text[1], "\x1b[31m --> 0x80000004: 00100073  ebreak\x1b[0m");
    }

    #[test]
    fn empty_ring_renders_nothing() {
        let ring = InstructionRing::new();
        assert!(ring.is_empty());
        assert_eq!(ring.render().count(), 0);
        assert_eq!(ring.latest(), None);
    }
}
