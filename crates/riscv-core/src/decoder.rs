//! Instruction decoder for RV32IM.
//!
//! Decoding classifies the word against the ordered pattern table and then
//! extracts operands according to the matched format. Source registers are
//! read during decode, so a [`DecodedInstruction`] is only meaningful for the
//! register file it was decoded against.

use crate::encoding::{classify, Format, Mnemonic};
use crate::state::RegisterFile;

/// Extracts `word[hi:lo]` (inclusive), right-aligned.
#[must_use]
pub const fn bits(word: u32, hi: u32, lo: u32) -> u32 {
    (word >> lo) & (u32::MAX >> (31 - (hi - lo)))
}

/// Sign-extends the low `width` bits of `value` to 32 bits.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub const fn sign_extend(value: u32, width: u32) -> u32 {
    let shift = 32 - width;
    (((value << shift) as i32) >> shift) as u32
}

/// I-format immediate: `sext(word[31:20], 12)`.
#[must_use]
pub const fn imm_i(word: u32) -> u32 {
    sign_extend(bits(word, 31, 20), 12)
}

/// U-format immediate: `word[31:12] << 12`.
#[must_use]
pub const fn imm_u(word: u32) -> u32 {
    bits(word, 31, 12) << 12
}

/// S-format immediate: `sext(word[31:25] ++ word[11:7], 12)`.
#[must_use]
pub const fn imm_s(word: u32) -> u32 {
    sign_extend((bits(word, 31, 25) << 5) | bits(word, 11, 7), 12)
}

/// B-format immediate: `sext(word[31] ++ word[7] ++ word[30:25] ++ word[11:8] ++ 0, 13)`.
#[must_use]
pub const fn imm_b(word: u32) -> u32 {
    let raw = (bits(word, 31, 31) << 12)
        | (bits(word, 7, 7) << 11)
        | (bits(word, 30, 25) << 5)
        | (bits(word, 11, 8) << 1);
    sign_extend(raw, 13)
}

/// J-format immediate: `sext(word[31] ++ word[19:12] ++ word[20] ++ word[30:21] ++ 0, 21)`.
#[must_use]
pub const fn imm_j(word: u32) -> u32 {
    let raw = (bits(word, 31, 31) << 20)
        | (bits(word, 19, 12) << 12)
        | (bits(word, 20, 20) << 11)
        | (bits(word, 30, 21) << 1);
    sign_extend(raw, 21)
}

/// Decoded instruction with operands extracted for its format.
///
/// Fields a format does not use are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Raw instruction word.
    pub raw: u32,
    /// Matched mnemonic.
    pub mnemonic: Mnemonic,
    /// Operand layout of the matched pattern.
    pub format: Format,
    /// Destination register index (`word[11:7]`).
    pub rd: usize,
    /// First source register index (`word[19:15]`).
    pub rs1: usize,
    /// Second source register index (`word[24:20]`).
    pub rs2: usize,
    /// Value of `rs1` read at decode time.
    pub src1: u32,
    /// Value of `rs2` read at decode time.
    pub src2: u32,
    /// Sign-extended immediate.
    pub imm: u32,
}

impl DecodedInstruction {
    /// Returns `true` when the catch-all invalid pattern matched.
    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        matches!(self.mnemonic, Mnemonic::Inv)
    }

    const fn reads_rs1(format: Format) -> bool {
        matches!(format, Format::I | Format::S | Format::R | Format::B)
    }

    const fn reads_rs2(format: Format) -> bool {
        matches!(format, Format::S | Format::R | Format::B)
    }
}

/// RV32IM instruction decoder.
pub struct Decoder;

impl Decoder {
    /// Classifies `word` and extracts register indices and the immediate
    /// without reading any register values.
    #[must_use]
    pub fn decode_fields(word: u32) -> DecodedInstruction {
        let entry = classify(word);
        let imm = match entry.format {
            Format::I => imm_i(word),
            Format::U => imm_u(word),
            Format::S => imm_s(word),
            Format::B => imm_b(word),
            Format::J => imm_j(word),
            Format::R | Format::N => 0,
        };
        DecodedInstruction {
            raw: word,
            mnemonic: entry.mnemonic,
            format: entry.format,
            rd: bits(word, 11, 7) as usize,
            rs1: bits(word, 19, 15) as usize,
            rs2: bits(word, 24, 20) as usize,
            src1: 0,
            src2: 0,
            imm,
        }
    }

    /// Decodes `word` and reads the source registers its format uses.
    #[must_use]
    pub fn decode(word: u32, regs: &RegisterFile) -> DecodedInstruction {
        let mut instr = Self::decode_fields(word);
        if DecodedInstruction::reads_rs1(instr.format) {
            instr.src1 = regs.gpr(instr.rs1);
        }
        if DecodedInstruction::reads_rs2(instr.format) {
            instr.src2 = regs.gpr(instr.rs2);
        }
        instr
    }
}
