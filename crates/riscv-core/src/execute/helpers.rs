//! Helper functions for instruction execution.

#![allow(clippy::pedantic, clippy::nursery, unknown_lints, missing_docs)]

use crate::decoder::{bits, sign_extend};
use crate::encoding::Mnemonic;
use crate::memory::AccessWidth;

/// Shift amount of an immediate shift: the 6-bit `word[25:20]` field, sign
/// extended for `srai` and zero extended otherwise, taken modulo 32.
#[must_use]
pub fn immediate_shift_amount(mnemonic: Mnemonic, raw: u32) -> u32 {
    let field = bits(raw, 25, 20);
    let extended = match mnemonic {
        Mnemonic::Srai => sign_extend(field, 6),
        _ => field,
    };
    extended & 0x1F
}

/// Shift amount of a register shift: `src2 mod 32`.
#[must_use]
pub const fn register_shift_amount(src2: u32) -> u32 {
    src2 & 0x1F
}

/// Access width and sign extension of a load mnemonic.
#[must_use]
pub const fn load_shape(mnemonic: Mnemonic) -> Option<(AccessWidth, bool)> {
    match mnemonic {
        Mnemonic::Lb => Some((AccessWidth::Byte, true)),
        Mnemonic::Lh => Some((AccessWidth::Half, true)),
        Mnemonic::Lw => Some((AccessWidth::Word, false)),
        Mnemonic::Lbu => Some((AccessWidth::Byte, false)),
        Mnemonic::Lhu => Some((AccessWidth::Half, false)),
        _ => None,
    }
}

/// Access width of a store mnemonic.
#[must_use]
pub const fn store_width(mnemonic: Mnemonic) -> Option<AccessWidth> {
    match mnemonic {
        Mnemonic::Sb => Some(AccessWidth::Byte),
        Mnemonic::Sh => Some(AccessWidth::Half),
        Mnemonic::Sw => Some(AccessWidth::Word),
        _ => None,
    }
}

/// Extends a loaded value to 32 bits.
#[must_use]
pub const fn extend_load(value: u32, width: AccessWidth, signed: bool) -> u32 {
    if signed {
        sign_extend(value, (width.bytes() * 8) as u32)
    } else {
        value & width.mask()
    }
}

/// Evaluates a branch condition; `None` for non-branch mnemonics.
#[must_use]
pub const fn branch_taken(mnemonic: Mnemonic, src1: u32, src2: u32) -> Option<bool> {
    let taken = match mnemonic {
        Mnemonic::Beq => src1 == src2,
        Mnemonic::Bne => src1 != src2,
        Mnemonic::Blt => (src1 as i32) < (src2 as i32),
        Mnemonic::Bge => (src1 as i32) >= (src2 as i32),
        Mnemonic::Bltu => src1 < src2,
        Mnemonic::Bgeu => src1 >= src2,
        _ => return None,
    };
    Some(taken)
}

/// Register-register and register-immediate ALU result.
///
/// `operand` is `src2` for R-format and the immediate for I-format; `shamt`
/// is the already reduced shift amount.
#[must_use]
pub fn alu(mnemonic: Mnemonic, src1: u32, operand: u32, shamt: u32) -> Option<u32> {
    let value = match mnemonic {
        Mnemonic::Add | Mnemonic::Addi => src1.wrapping_add(operand),
        Mnemonic::Sub => src1.wrapping_sub(operand),
        Mnemonic::And | Mnemonic::Andi => src1 & operand,
        Mnemonic::Or | Mnemonic::Ori => src1 | operand,
        Mnemonic::Xor | Mnemonic::Xori => src1 ^ operand,
        Mnemonic::Slt | Mnemonic::Slti => u32::from((src1 as i32) < (operand as i32)),
        Mnemonic::Sltu | Mnemonic::Sltiu => u32::from(src1 < operand),
        Mnemonic::Sll | Mnemonic::Slli => src1.wrapping_shl(shamt),
        Mnemonic::Srl | Mnemonic::Srli => src1.wrapping_shr(shamt),
        Mnemonic::Sra | Mnemonic::Srai => ((src1 as i32).wrapping_shr(shamt)) as u32,
        _ => return None,
    };
    Some(value)
}

/// RV32M result with the architectural divide-by-zero and overflow values.
#[must_use]
pub fn muldiv(mnemonic: Mnemonic, src1: u32, src2: u32) -> Option<u32> {
    let signed1 = src1 as i32;
    let signed2 = src2 as i32;
    let value = match mnemonic {
        Mnemonic::Mul => src1.wrapping_mul(src2),
        Mnemonic::Mulh => ((i64::from(signed1) * i64::from(signed2)) >> 32) as u32,
        Mnemonic::Mulhsu => ((i64::from(signed1) * i64::from(src2)) >> 32) as u32,
        Mnemonic::Mulhu => ((u64::from(src1) * u64::from(src2)) >> 32) as u32,
        Mnemonic::Div if src2 == 0 => u32::MAX,
        Mnemonic::Div => signed1.wrapping_div(signed2) as u32,
        Mnemonic::Divu if src2 == 0 => u32::MAX,
        Mnemonic::Divu => src1 / src2,
        Mnemonic::Rem if src2 == 0 => src1,
        Mnemonic::Rem => signed1.wrapping_rem(signed2) as u32,
        Mnemonic::Remu if src2 == 0 => src1,
        Mnemonic::Remu => src1 % src2,
        _ => return None,
    };
    Some(value)
}
