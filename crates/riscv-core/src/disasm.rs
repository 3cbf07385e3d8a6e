//! Instruction disassembly for RV32IM.
//!
//! Used by the instruction ring-buffer dump. Branch and jump targets are shown
//! as absolute addresses; words that only match the catch-all pattern render
//! as `.word 0x... ; illegal`.

use std::fmt;

use crate::decoder::{DecodedInstruction, Decoder};
use crate::encoding::{Format, Mnemonic};
use crate::state::REGISTER_NAMES;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the instruction.
    pub addr: u32,
    /// Raw instruction word.
    pub raw: u32,
    /// Lower-case mnemonic, or `.word` for illegal encodings.
    pub mnemonic: String,
    /// Formatted operands (e.g. `a0, a1, -1` or `8(sp)`).
    pub operands: String,
    /// Whether the word only matched the catch-all pattern.
    pub is_illegal: bool,
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            f.write_str(&self.mnemonic)
        } else {
            write!(f, "{} {}", self.mnemonic, self.operands)
        }
    }
}

/// Disassembles the instruction word `raw` located at `pc`.
#[must_use]
pub fn disassemble_one(pc: u32, raw: u32) -> DisassemblyRow {
    let instr = Decoder::decode_fields(raw);
    if instr.is_invalid() {
        return DisassemblyRow {
            addr: pc,
            raw,
            mnemonic: ".word".to_owned(),
            operands: format!("{raw:#010x} ; illegal"),
            is_illegal: true,
        };
    }
    DisassemblyRow {
        addr: pc,
        raw,
        mnemonic: instr.mnemonic.as_str().to_owned(),
        operands: format_operands(&instr, pc),
        is_illegal: false,
    }
}

#[allow(clippy::cast_possible_wrap)]
fn format_operands(instr: &DecodedInstruction, pc: u32) -> String {
    let rd = reg(instr.rd);
    let rs1 = reg(instr.rs1);
    let rs2 = reg(instr.rs2);
    let imm = instr.imm as i32;

    match instr.format {
        Format::R => format!("{rd}, {rs1}, {rs2}"),
        Format::I => match instr.mnemonic {
            Mnemonic::Lb | Mnemonic::Lh | Mnemonic::Lw | Mnemonic::Lbu | Mnemonic::Lhu => {
                format!("{rd}, {imm}({rs1})")
            }
            Mnemonic::Jalr => format!("{rd}, {imm}({rs1})"),
            Mnemonic::Slli | Mnemonic::Srli | Mnemonic::Srai => {
                format!("{rd}, {rs1}, {}", instr.rs2)
            }
            _ => format!("{rd}, {rs1}, {imm}"),
        },
        Format::S => format!("{rs2}, {imm}({rs1})"),
        Format::B => format!("{rs1}, {rs2}, {:#x}", pc.wrapping_add(instr.imm)),
        Format::J => format!("{rd}, {:#x}", pc.wrapping_add(instr.imm)),
        Format::U => format!("{rd}, {:#x}", instr.imm >> 12),
        Format::N => String::new(),
    }
}

fn reg(index: usize) -> &'static str {
    match index {
        0 => "zero",
        _ => REGISTER_NAMES[index % REGISTER_NAMES.len()],
    }
}
