//! Call/return classification of jumps for the function-call tracer.

use crate::decoder::DecodedInstruction;
use crate::encoding::Mnemonic;
use crate::state::{REG_RA, REG_ZERO};

/// Control transfer observed when a jump retires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ControlTransfer {
    /// Jump that links into `ra`.
    Call {
        /// Address of the jump.
        pc: u32,
        /// Jump target.
        target: u32,
    },
    /// `jalr` that discards the link and does not return through `ra`.
    TailCall {
        /// Address of the jump.
        pc: u32,
        /// Jump target.
        target: u32,
    },
    /// `jalr zero, 0(ra)`.
    Return {
        /// Address of the return instruction.
        pc: u32,
    },
    /// `jal zero, ...`: a plain jump, or a tail call when `target` starts a
    /// function.
    Jump {
        /// Address of the jump.
        pc: u32,
        /// Jump target.
        target: u32,
    },
}

impl ControlTransfer {
    /// Classifies a retired jump given its final target.
    ///
    /// Links into registers other than `ra` and non-jump mnemonics yield
    /// `None`.
    #[must_use]
    pub const fn classify(instr: &DecodedInstruction, pc: u32, target: u32) -> Option<Self> {
        match instr.mnemonic {
            Mnemonic::Jal if instr.rd == REG_RA => Some(Self::Call { pc, target }),
            Mnemonic::Jal if instr.rd == REG_ZERO => Some(Self::Jump { pc, target }),
            Mnemonic::Jalr if instr.rd == REG_RA => Some(Self::Call { pc, target }),
            Mnemonic::Jalr if instr.rd == REG_ZERO => {
                if instr.rs1 == REG_RA && instr.imm == 0 {
                    Some(Self::Return { pc })
                } else {
                    Some(Self::TailCall { pc, target })
                }
            }
            _ => None,
        }
    }

    /// Address of the instruction that performed the transfer.
    #[must_use]
    pub const fn pc(self) -> u32 {
        match self {
            Self::Call { pc, .. }
            | Self::TailCall { pc, .. }
            | Self::Return { pc }
            | Self::Jump { pc, .. } => pc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ControlTransfer;
    use crate::decoder::Decoder;

    const PC: u32 = 0x8000_0100;

    #[test]
    fn jal_ra_is_a_call() {
        // jal ra, 16
        let instr = Decoder::decode_fields(0x0100_00EF);
        assert_eq!(
            ControlTransfer::classify(&instr, PC, PC + 16),
            Some(ControlTransfer::Call {
                pc: PC,
                target: PC + 16
            })
        );
    }

    #[test]
    fn ret_is_a_return() {
        // jalr zero, 0(ra)
        let instr = Decoder::decode_fields(0x0000_8067);
        assert_eq!(
            ControlTransfer::classify(&instr, PC, 0x8000_0000),
            Some(ControlTransfer::Return { pc: PC })
        );
    }

    #[test]
    fn jalr_zero_through_other_register_is_a_tail_call() {
        // jalr zero, 0(t1)
        let instr = Decoder::decode_fields(0x0003_0067);
        let transfer = ControlTransfer::classify(&instr, PC, 0x8000_0200);
        assert_eq!(
            transfer,
            Some(ControlTransfer::TailCall {
                pc: PC,
                target: 0x8000_0200
            })
        );
        assert_eq!(transfer.map(ControlTransfer::pc), Some(PC));
    }

    #[test]
    fn jal_zero_is_a_jump() {
        // jal zero, 8
        let jump = Decoder::decode_fields(0x0080_006F);
        assert_eq!(
            ControlTransfer::classify(&jump, PC, PC + 8),
            Some(ControlTransfer::Jump {
                pc: PC,
                target: PC + 8
            })
        );
    }

    #[test]
    fn other_links_are_not_traced() {
        // jalr t0, 0(a0)
        let other_link = Decoder::decode_fields(0x0005_02E7);
        assert_eq!(ControlTransfer::classify(&other_link, PC, 0), None);
        // addi a0, a0, 1
        let alu = Decoder::decode_fields(0x0015_0513);
        assert_eq!(ControlTransfer::classify(&alu, PC, PC + 4), None);
    }
}
