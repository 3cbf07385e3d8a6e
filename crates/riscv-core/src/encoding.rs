//! Ordered instruction pattern table for the RV32IM decoder.
//!
//! Each entry is written as a 32-character bit pattern, most significant bit
//! first, where `0`/`1` are fixed bits and `?` is a wildcard. Spaces only group
//! fields for readability. Patterns are compiled into `(mask, value)` pairs at
//! build time; a malformed pattern fails compilation.
//!
//! The table is searched in order and the first match wins, so the catch-all
//! invalid pattern must stay last.

/// Instruction formats, selecting which operand fields are extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Format {
    /// Register + 12-bit immediate.
    I,
    /// 20-bit upper immediate.
    U,
    /// Store: two registers + split 12-bit immediate.
    S,
    /// No operands.
    N,
    /// Jump: 21-bit pc-relative immediate.
    J,
    /// Register-register.
    R,
    /// Branch: two registers + 13-bit pc-relative immediate.
    B,
}

/// Mnemonics recognised by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Mnemonic {
    Lui,
    Auipc,
    Jal,
    Jalr,
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
    Sb,
    Sh,
    Sw,
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
    Ebreak,
    Inv,
}

impl Mnemonic {
    /// Lower-case assembler name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lui => "lui",
            Self::Auipc => "auipc",
            Self::Jal => "jal",
            Self::Jalr => "jalr",
            Self::Beq => "beq",
            Self::Bne => "bne",
            Self::Blt => "blt",
            Self::Bge => "bge",
            Self::Bltu => "bltu",
            Self::Bgeu => "bgeu",
            Self::Lb => "lb",
            Self::Lh => "lh",
            Self::Lw => "lw",
            Self::Lbu => "lbu",
            Self::Lhu => "lhu",
            Self::Sb => "sb",
            Self::Sh => "sh",
            Self::Sw => "sw",
            Self::Addi => "addi",
            Self::Slti => "slti",
            Self::Sltiu => "sltiu",
            Self::Xori => "xori",
            Self::Ori => "ori",
            Self::Andi => "andi",
            Self::Slli => "slli",
            Self::Srli => "srli",
            Self::Srai => "srai",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Sll => "sll",
            Self::Slt => "slt",
            Self::Sltu => "sltu",
            Self::Xor => "xor",
            Self::Srl => "srl",
            Self::Sra => "sra",
            Self::Or => "or",
            Self::And => "and",
            Self::Mul => "mul",
            Self::Mulh => "mulh",
            Self::Mulhsu => "mulhsu",
            Self::Mulhu => "mulhu",
            Self::Div => "div",
            Self::Divu => "divu",
            Self::Rem => "rem",
            Self::Remu => "remu",
            Self::Ebreak => "ebreak",
            Self::Inv => "inv",
        }
    }
}

/// One row of the decode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionPattern {
    /// Source pattern, most significant bit first.
    pub pattern: &'static str,
    /// Bits that must match `value`.
    pub mask: u32,
    /// Expected values of the fixed bits.
    pub value: u32,
    /// Decoded mnemonic.
    pub mnemonic: Mnemonic,
    /// Operand layout.
    pub format: Format,
}

impl InstructionPattern {
    /// Returns `true` when every fixed bit of the pattern matches `word`.
    #[must_use]
    pub const fn matches(&self, word: u32) -> bool {
        word & self.mask == self.value
    }
}

/// Compiles a bit pattern into `(mask, value)`.
///
/// # Panics
///
/// Panics (at compile time when used in a constant) on characters other than
/// `0`, `1`, `?` and space, or when the pattern does not describe 32 bits.
#[must_use]
pub const fn compile_pattern(pattern: &str) -> (u32, u32) {
    let bytes = pattern.as_bytes();
    let mut mask = 0u32;
    let mut value = 0u32;
    let mut bits = 0;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c != b' ' {
            assert!(bits < 32, "instruction pattern longer than 32 bits");
            mask <<= 1;
            value <<= 1;
            match c {
                b'0' => mask |= 1,
                b'1' => {
                    mask |= 1;
                    value |= 1;
                }
                b'?' => {}
                _ => panic!("instruction pattern contains an invalid character"),
            }
            bits += 1;
        }
        i += 1;
    }
    assert!(bits == 32, "instruction pattern must describe 32 bits");
    (mask, value)
}

const fn pattern(pattern: &'static str, mnemonic: Mnemonic, format: Format) -> InstructionPattern {
    let (mask, value) = compile_pattern(pattern);
    InstructionPattern {
        pattern,
        mask,
        value,
        mnemonic,
        format,
    }
}

/// Catch-all entry: matches every word and must be tried last.
pub const INVALID_PATTERN: InstructionPattern = pattern(
    "??????? ????? ????? ??? ????? ????? ??",
    Mnemonic::Inv,
    Format::N,
);

/// Decode table in priority order.
pub const INSTRUCTION_TABLE: &[InstructionPattern] = &[
    pattern("??????? ????? ????? ??? ????? 01101 11", Mnemonic::Lui, Format::U),
    pattern("??????? ????? ????? ??? ????? 00101 11", Mnemonic::Auipc, Format::U),
    pattern("??????? ????? ????? ??? ????? 11011 11", Mnemonic::Jal, Format::J),
    pattern("??????? ????? ????? 000 ????? 11001 11", Mnemonic::Jalr, Format::I),
    pattern("??????? ????? ????? 000 ????? 11000 11", Mnemonic::Beq, Format::B),
    pattern("??????? ????? ????? 001 ????? 11000 11", Mnemonic::Bne, Format::B),
    pattern("??????? ????? ????? 100 ????? 11000 11", Mnemonic::Blt, Format::B),
    pattern("??????? ????? ????? 101 ????? 11000 11", Mnemonic::Bge, Format::B),
    pattern("??????? ????? ????? 110 ????? 11000 11", Mnemonic::Bltu, Format::B),
    pattern("??????? ????? ????? 111 ????? 11000 11", Mnemonic::Bgeu, Format::B),
    pattern("??????? ????? ????? 000 ????? 00000 11", Mnemonic::Lb, Format::I),
    pattern("??????? ????? ????? 001 ????? 00000 11", Mnemonic::Lh, Format::I),
    pattern("??????? ????? ????? 010 ????? 00000 11", Mnemonic::Lw, Format::I),
    pattern("??????? ????? ????? 100 ????? 00000 11", Mnemonic::Lbu, Format::I),
    pattern("??????? ????? ????? 101 ????? 00000 11", Mnemonic::Lhu, Format::I),
    pattern("??????? ????? ????? 000 ????? 01000 11", Mnemonic::Sb, Format::S),
    pattern("??????? ????? ????? 001 ????? 01000 11", Mnemonic::Sh, Format::S),
    pattern("??????? ????? ????? 010 ????? 01000 11", Mnemonic::Sw, Format::S),
    pattern("??????? ????? ????? 000 ????? 00100 11", Mnemonic::Addi, Format::I),
    pattern("??????? ????? ????? 010 ????? 00100 11", Mnemonic::Slti, Format::I),
    pattern("??????? ????? ????? 011 ????? 00100 11", Mnemonic::Sltiu, Format::I),
    pattern("??????? ????? ????? 100 ????? 00100 11", Mnemonic::Xori, Format::I),
    pattern("??????? ????? ????? 110 ????? 00100 11", Mnemonic::Ori, Format::I),
    pattern("??????? ????? ????? 111 ????? 00100 11", Mnemonic::Andi, Format::I),
    pattern("000000? ????? ????? 001 ????? 00100 11", Mnemonic::Slli, Format::I),
    pattern("000000? ????? ????? 101 ????? 00100 11", Mnemonic::Srli, Format::I),
    pattern("010000? ????? ????? 101 ????? 00100 11", Mnemonic::Srai, Format::I),
    pattern("0000000 ????? ????? 000 ????? 01100 11", Mnemonic::Add, Format::R),
    pattern("0100000 ????? ????? 000 ????? 01100 11", Mnemonic::Sub, Format::R),
    pattern("0000000 ????? ????? 001 ????? 01100 11", Mnemonic::Sll, Format::R),
    pattern("0000000 ????? ????? 010 ????? 01100 11", Mnemonic::Slt, Format::R),
    pattern("0000000 ????? ????? 011 ????? 01100 11", Mnemonic::Sltu, Format::R),
    pattern("0000000 ????? ????? 100 ????? 01100 11", Mnemonic::Xor, Format::R),
    pattern("0000000 ????? ????? 101 ????? 01100 11", Mnemonic::Srl, Format::R),
    pattern("0100000 ????? ????? 101 ????? 01100 11", Mnemonic::Sra, Format::R),
    pattern("0000000 ????? ????? 110 ????? 01100 11", Mnemonic::Or, Format::R),
    pattern("0000000 ????? ????? 111 ????? 01100 11", Mnemonic::And, Format::R),
    pattern("0000001 ????? ????? 000 ????? 01100 11", Mnemonic::Mul, Format::R),
    pattern("0000001 ????? ????? 001 ????? 01100 11", Mnemonic::Mulh, Format::R),
    pattern("0000001 ????? ????? 010 ????? 01100 11", Mnemonic::Mulhsu, Format::R),
    pattern("0000001 ????? ????? 011 ????? 01100 11", Mnemonic::Mulhu, Format::R),
    pattern("0000001 ????? ????? 100 ????? 01100 11", Mnemonic::Div, Format::R),
    pattern("0000001 ????? ????? 101 ????? 01100 11", Mnemonic::Divu, Format::R),
    pattern("0000001 ????? ????? 110 ????? 01100 11", Mnemonic::Rem, Format::R),
    pattern("0000001 ????? ????? 111 ????? 01100 11", Mnemonic::Remu, Format::R),
    pattern("0000000 00001 00000 000 00000 11100 11", Mnemonic::Ebreak, Format::N),
    INVALID_PATTERN,
];

/// Returns the first table entry whose fixed bits match `word`.
#[must_use]
pub fn classify(word: u32) -> &'static InstructionPattern {
    INSTRUCTION_TABLE
        .iter()
        .find(|entry| entry.matches(word))
        .unwrap_or(&INVALID_PATTERN)
}
