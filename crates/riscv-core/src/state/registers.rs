/// Number of architecturally visible general-purpose registers (`x0..x31`).
pub const GPR_COUNT: usize = 32;
/// Hard-wired zero register.
pub const REG_ZERO: usize = 0;
/// Return address register (`x1`).
pub const REG_RA: usize = 1;
/// Stack pointer register (`x2`).
pub const REG_SP: usize = 2;
/// First argument / return value register (`x10`).
pub const REG_A0: usize = 10;

/// Display names of `x0..x31`, in index order.
pub const REGISTER_NAMES: [&str; GPR_COUNT] = [
    "$0", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4", "a5",
    "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4", "t5", "t6",
];

/// Register file of the RV32 hart: 32 general-purpose registers and `pc`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    gpr: [u32; GPR_COUNT],
    pc: u32,
}

impl RegisterFile {
    /// Creates a zeroed register file that starts executing at `pc`.
    #[must_use]
    pub const fn new(pc: u32) -> Self {
        Self {
            gpr: [0; GPR_COUNT],
            pc,
        }
    }

    /// Reads general-purpose register `index` (only the low five bits are used).
    #[must_use]
    pub const fn gpr(&self, index: usize) -> u32 {
        self.gpr[index % GPR_COUNT]
    }

    /// Writes general-purpose register `index` (only the low five bits are used).
    ///
    /// Writes to `x0` land in the register until [`Self::clear_zero`] runs at
    /// the end of the instruction.
    pub const fn set_gpr(&mut self, index: usize, value: u32) {
        self.gpr[index % GPR_COUNT] = value;
    }

    /// Forces `x0` back to zero.
    pub const fn clear_zero(&mut self) {
        self.gpr[REG_ZERO] = 0;
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    /// Resolves a register name to its index.
    ///
    /// Accepts display names (`$0`, `ra`, `a0`, ...), `zero`, and `x0..x31`.
    #[must_use]
    pub fn index_of(name: &str) -> Option<usize> {
        if name == "zero" || name == "0" {
            return Some(REG_ZERO);
        }
        if let Some(index) = REGISTER_NAMES.iter().position(|candidate| *candidate == name) {
            return Some(index);
        }
        let digits = name.strip_prefix('x')?;
        if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
            return None;
        }
        digits.parse::<usize>().ok().filter(|index| *index < GPR_COUNT)
    }

    /// Reads a register by name; `pc` resolves to the program counter.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<u32> {
        if name == "pc" {
            return Some(self.pc);
        }
        Self::index_of(name).map(|index| self.gpr[index])
    }

    /// Debugger-issued register write by name. Writes to `x0` are discarded.
    ///
    /// Returns `false` when the name does not resolve.
    pub fn set_by_name(&mut self, name: &str, value: u32) -> bool {
        if name == "pc" {
            self.pc = value;
            return true;
        }
        match Self::index_of(name) {
            Some(REG_ZERO) => true,
            Some(index) => {
                self.gpr[index] = value;
                true
            }
            None => false,
        }
    }

    /// Formats one line per register plus `pc`, for `info registers`.
    #[must_use]
    pub fn display_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = REGISTER_NAMES
            .iter()
            .zip(self.gpr.iter())
            .map(|(name, value)| format_register(name, *value))
            .collect();
        lines.push(format_register("pc", self.pc));
        lines
    }
}

#[allow(clippy::cast_possible_wrap)]
fn format_register(name: &str, value: u32) -> String {
    format!("{name:<4}{value:#010x}  {}", value as i32)
}

#[cfg(test)]
mod tests {
    use super::{RegisterFile, GPR_COUNT, REGISTER_NAMES, REG_A0, REG_RA, REG_SP, REG_ZERO};

    #[test]
    fn register_names_cover_every_index() {
        assert_eq!(REGISTER_NAMES.len(), GPR_COUNT);
        for (index, name) in REGISTER_NAMES.iter().enumerate() {
            assert_eq!(RegisterFile::index_of(name), Some(index));
        }
        assert_eq!(RegisterFile::index_of("ra"), Some(REG_RA));
        assert_eq!(RegisterFile::index_of("sp"), Some(REG_SP));
        assert_eq!(RegisterFile::index_of("a0"), Some(REG_A0));
    }

    #[test]
    fn numeric_and_alias_names_resolve() {
        assert_eq!(RegisterFile::index_of("zero"), Some(REG_ZERO));
        assert_eq!(RegisterFile::index_of("0"), Some(REG_ZERO));
        assert_eq!(RegisterFile::index_of("x0"), Some(0));
        assert_eq!(RegisterFile::index_of("x31"), Some(31));
        assert_eq!(RegisterFile::index_of("x32"), None);
        assert_eq!(RegisterFile::index_of("x01"), None);
        assert_eq!(RegisterFile::index_of("x"), None);
        assert_eq!(RegisterFile::index_of("foo"), None);
    }

    #[test]
    fn general_register_file_tracks_each_register_independently() {
        let mut regs = RegisterFile::new(0x8000_0000);
        for (offset, index) in (0_u32..).zip(1..GPR_COUNT) {
            regs.set_gpr(index, 0x1000 + offset);
        }
        for (offset, index) in (0_u32..).zip(1..GPR_COUNT) {
            assert_eq!(regs.gpr(index), 0x1000 + offset);
        }
        assert_eq!(regs.pc(), 0x8000_0000);
    }

    #[test]
    fn zero_register_is_cleared_after_instruction_body() {
        let mut regs = RegisterFile::default();
        regs.set_gpr(REG_ZERO, 0xFFFF_FFFF);
        regs.clear_zero();
        assert_eq!(regs.gpr(REG_ZERO), 0);
    }

    #[test]
    fn debugger_writes_respect_zero_register() {
        let mut regs = RegisterFile::default();

        assert!(regs.set_by_name("a0", 7));
        assert!(regs.set_by_name("$0", 7));
        assert!(regs.set_by_name("pc", 0x8000_0010));
        assert!(!regs.set_by_name("bogus", 1));

        assert_eq!(regs.lookup("a0"), Some(7));
        assert_eq!(regs.lookup("$0"), Some(0));
        assert_eq!(regs.lookup("pc"), Some(0x8000_0010));
        assert_eq!(regs.lookup("bogus"), None);
    }

    #[test]
    fn display_lines_list_registers_then_pc() {
        let mut regs = RegisterFile::new(0x8000_0000);
        regs.set_gpr(REG_A0, 0xFFFF_FFFF);

        let lines = regs.display_lines();
        assert_eq!(lines.len(), GPR_COUNT + 1);
        assert_eq!(lines[REG_A0], "a0  0xffffffff  -1");
        assert_eq!(lines[GPR_COUNT], "pc  0x80000000  -2147483648");
    }
}
