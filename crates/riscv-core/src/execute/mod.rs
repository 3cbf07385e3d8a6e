//! Instruction execution pipeline for RV32IM.
//!
//! A step runs in two phases:
//! 1. `execute_instruction` reads operands and memory and computes every
//!    side effect into an [`ExecuteState`] without touching the hart;
//! 2. `commit_execution` applies the pending store, the destination
//!    register write and the new pc, in that order.
//!
//! A fault in either phase leaves registers and pc untouched.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::similar_names,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    unknown_lints,
    missing_docs
)]

mod helpers;
mod transfer;

pub use helpers::{
    alu, branch_taken, extend_load, immediate_shift_amount, load_shape, muldiv,
    register_shift_amount, store_width,
};
pub use transfer::ControlTransfer;

use tracing::debug;

use crate::decoder::{DecodedInstruction, Decoder};
use crate::encoding::Mnemonic;
use crate::fault::Fault;
use crate::memory::{AccessWidth, Memory, MemoryError};
use crate::state::{RegisterFile, REG_A0};
use crate::StepOutcome;

/// Width of every RV32I instruction in bytes.
pub const INSTRUCTION_BYTES: u32 = 4;

/// Outcome of the execute phase of a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Side effects are ready to commit.
    Retired,
    /// `ebreak`: the program ended; the exit code is read from `a0`.
    Trap,
    /// The instruction faulted; nothing may be committed.
    Fault { fault: Fault },
}

/// Side effects accumulated by the execute phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteState {
    /// Address of the instruction.
    pub pc: u32,
    /// Sequential next pc.
    pub snpc: u32,
    /// Decided next pc, redirected by jumps and taken branches.
    pub dnpc: u32,
    /// Destination register and its new value.
    pub dest: Option<(usize, u32)>,
    /// Pending store: address, width and value.
    pub memory_write: Option<(u32, AccessWidth, u32)>,
    /// Call/return classification of a retired jump.
    pub transfer: Option<ControlTransfer>,
}

impl ExecuteState {
    /// Creates an execute state for the instruction at `pc`.
    #[must_use]
    pub const fn new(pc: u32) -> Self {
        let snpc = pc.wrapping_add(INSTRUCTION_BYTES);
        Self {
            pc,
            snpc,
            dnpc: snpc,
            dest: None,
            memory_write: None,
            transfer: None,
        }
    }
}

/// Executes one decoded instruction at `pc` without committing anything.
///
/// Loads read memory here; stores are deferred to [`commit_execution`].
pub fn execute_instruction(
    instr: &DecodedInstruction,
    pc: u32,
    memory: &dyn Memory,
) -> (ExecuteOutcome, ExecuteState) {
    let mut exec = ExecuteState::new(pc);
    let src1 = instr.src1;
    let src2 = instr.src2;
    let imm = instr.imm;

    let mem_fault = |source: MemoryError| ExecuteOutcome::Fault {
        fault: Fault::Memory { pc, source },
    };

    match instr.mnemonic {
        Mnemonic::Lui => exec.dest = Some((instr.rd, imm)),
        Mnemonic::Auipc => exec.dest = Some((instr.rd, pc.wrapping_add(imm))),
        Mnemonic::Jal => {
            exec.dnpc = pc.wrapping_add(imm);
            exec.dest = Some((instr.rd, exec.snpc));
            exec.transfer = ControlTransfer::classify(instr, pc, exec.dnpc);
        }
        Mnemonic::Jalr => {
            // Target first: rd may alias rs1.
            exec.dnpc = src1.wrapping_add(imm) & !1;
            exec.dest = Some((instr.rd, exec.snpc));
            exec.transfer = ControlTransfer::classify(instr, pc, exec.dnpc);
        }
        Mnemonic::Beq
        | Mnemonic::Bne
        | Mnemonic::Blt
        | Mnemonic::Bge
        | Mnemonic::Bltu
        | Mnemonic::Bgeu => {
            if branch_taken(instr.mnemonic, src1, src2) == Some(true) {
                exec.dnpc = pc.wrapping_add(imm);
            }
        }
        Mnemonic::Lb | Mnemonic::Lh | Mnemonic::Lw | Mnemonic::Lbu | Mnemonic::Lhu => {
            let Some((width, signed)) = load_shape(instr.mnemonic) else {
                return (illegal(instr, pc), exec);
            };
            let addr = src1.wrapping_add(imm);
            match memory.read(addr, width) {
                Ok(value) => exec.dest = Some((instr.rd, extend_load(value, width, signed))),
                Err(source) => return (mem_fault(source), exec),
            }
        }
        Mnemonic::Sb | Mnemonic::Sh | Mnemonic::Sw => {
            let Some(width) = store_width(instr.mnemonic) else {
                return (illegal(instr, pc), exec);
            };
            exec.memory_write = Some((src1.wrapping_add(imm), width, src2 & width.mask()));
        }
        Mnemonic::Slli | Mnemonic::Srli | Mnemonic::Srai => {
            let shamt = immediate_shift_amount(instr.mnemonic, instr.raw);
            exec.dest = alu(instr.mnemonic, src1, imm, shamt).map(|value| (instr.rd, value));
        }
        Mnemonic::Addi
        | Mnemonic::Slti
        | Mnemonic::Sltiu
        | Mnemonic::Xori
        | Mnemonic::Ori
        | Mnemonic::Andi => {
            exec.dest = alu(instr.mnemonic, src1, imm, 0).map(|value| (instr.rd, value));
        }
        Mnemonic::Add
        | Mnemonic::Sub
        | Mnemonic::Sll
        | Mnemonic::Slt
        | Mnemonic::Sltu
        | Mnemonic::Xor
        | Mnemonic::Srl
        | Mnemonic::Sra
        | Mnemonic::Or
        | Mnemonic::And => {
            let shamt = register_shift_amount(src2);
            exec.dest = alu(instr.mnemonic, src1, src2, shamt).map(|value| (instr.rd, value));
        }
        Mnemonic::Mul
        | Mnemonic::Mulh
        | Mnemonic::Mulhsu
        | Mnemonic::Mulhu
        | Mnemonic::Div
        | Mnemonic::Divu
        | Mnemonic::Rem
        | Mnemonic::Remu => {
            exec.dest = muldiv(instr.mnemonic, src1, src2).map(|value| (instr.rd, value));
        }
        Mnemonic::Ebreak => return (ExecuteOutcome::Trap, exec),
        Mnemonic::Inv => return (illegal(instr, pc), exec),
    }

    (ExecuteOutcome::Retired, exec)
}

const fn illegal(instr: &DecodedInstruction, pc: u32) -> ExecuteOutcome {
    ExecuteOutcome::Fault {
        fault: Fault::IllegalInstruction { pc, raw: instr.raw },
    }
}

/// Applies the side effects of a retired instruction.
///
/// # Errors
///
/// Returns the store's [`MemoryError`] when the pending write is unmapped; in
/// that case neither the destination register nor pc is updated.
pub fn commit_execution(
    regs: &mut RegisterFile,
    memory: &mut dyn Memory,
    exec: &ExecuteState,
) -> Result<(), MemoryError> {
    if let Some((addr, width, value)) = exec.memory_write {
        memory.write(addr, width, value)?;
    }
    if let Some((rd, value)) = exec.dest {
        regs.set_gpr(rd, value);
    }
    regs.set_pc(exec.dnpc);
    Ok(())
}

fn fetch(pc: u32, memory: &dyn Memory) -> Result<u32, Fault> {
    memory
        .read(pc, AccessWidth::Word)
        .map_err(|source| Fault::Memory { pc, source })
}

/// Fetches, decodes, executes and commits the instruction at pc.
///
/// `x0` is forced back to zero before returning, whatever the outcome.
pub fn step_one(regs: &mut RegisterFile, memory: &mut dyn Memory) -> StepOutcome {
    let pc = regs.pc();
    let raw = match fetch(pc, memory) {
        Ok(raw) => raw,
        Err(fault) => return StepOutcome::Fault { raw: None, fault },
    };

    let instr = Decoder::decode(raw, regs);
    debug!(
        pc = format_args!("{pc:#010x}"),
        raw = format_args!("{raw:#010x}"),
        mnemonic = instr.mnemonic.as_str(),
        "execute"
    );
    let (outcome, exec) = execute_instruction(&instr, pc, memory);

    let step = match outcome {
        ExecuteOutcome::Retired => match commit_execution(regs, memory, &exec) {
            Ok(()) => StepOutcome::Retired {
                pc,
                raw,
                transfer: exec.transfer,
            },
            Err(source) => StepOutcome::Fault {
                raw: Some(raw),
                fault: Fault::Memory { pc, source },
            },
        },
        ExecuteOutcome::Trap => {
            let code = regs.gpr(REG_A0);
            regs.set_pc(exec.dnpc);
            StepOutcome::Trap { pc, raw, code }
        }
        ExecuteOutcome::Fault { fault } => StepOutcome::Fault {
            raw: Some(raw),
            fault,
        },
    };

    regs.clear_zero();
    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{PhysicalMemory, DEFAULT_MEMORY_BASE};

    const BASE: u32 = DEFAULT_MEMORY_BASE;

    fn machine(program: &[u32]) -> (RegisterFile, PhysicalMemory) {
        let mut memory = PhysicalMemory::new(BASE, 0x1000);
        let image: Vec<u8> = program.iter().flat_map(|word| word.to_le_bytes()).collect();
        memory.load(BASE, &image).expect("program fits");
        (RegisterFile::new(BASE), memory)
    }

    #[test]
    fn addi_retires_and_advances_pc() {
        // addi a0, zero, 5
        let (mut regs, mut memory) = machine(&[0x0050_0513]);
        let outcome = step_one(&mut regs, &mut memory);

        assert!(matches!(outcome, StepOutcome::Retired { pc: BASE, .. }));
        assert_eq!(regs.gpr(10), 5);
        assert_eq!(regs.pc(), BASE + 4);
    }

    #[test]
    fn writes_to_zero_register_are_discarded() {
        // addi zero, zero, 5
        let (mut regs, mut memory) = machine(&[0x0050_0013]);
        step_one(&mut regs, &mut memory);
        assert_eq!(regs.gpr(0), 0);
    }

    #[test]
    fn jalr_computes_target_before_linking() {
        // jalr ra, 4(ra)
        let (mut regs, mut memory) = machine(&[0x0040_80E7]);
        regs.set_gpr(1, BASE + 0x100);
        let outcome = step_one(&mut regs, &mut memory);

        assert_eq!(regs.pc(), BASE + 0x104);
        assert_eq!(regs.gpr(1), BASE + 4);
        assert!(matches!(
            outcome,
            StepOutcome::Retired {
                transfer: Some(ControlTransfer::Call { target, .. }),
                ..
            } if target == BASE + 0x104
        ));
    }

    #[test]
    fn jalr_clears_target_bit_zero() {
        // jalr zero, 1(a0)
        let (mut regs, mut memory) = machine(&[0x0015_0067]);
        regs.set_gpr(10, BASE + 0x10);
        step_one(&mut regs, &mut memory);
        assert_eq!(regs.pc(), BASE + 0x10);
    }

    #[test]
    fn store_then_load_roundtrips_through_memory() {
        // sw a0, 0(sp); lbu a1, 0(sp); lb a2, 0(sp)
        let (mut regs, mut memory) = machine(&[0x00A1_2023, 0x0001_4583, 0x0001_0603]);
        regs.set_gpr(2, BASE + 0x800);
        regs.set_gpr(10, 0x0000_00F0);

        for _ in 0..3 {
            assert!(matches!(
                step_one(&mut regs, &mut memory),
                StepOutcome::Retired { .. }
            ));
        }
        assert_eq!(regs.gpr(11), 0xF0);
        assert_eq!(regs.gpr(12), 0xFFFF_FFF0);
    }

    #[test]
    fn faulting_store_commits_nothing() {
        // sw a0, 0(zero)
        let (mut regs, mut memory) = machine(&[0x00A0_2023]);
        regs.set_gpr(10, 7);
        let outcome = step_one(&mut regs, &mut memory);

        assert!(matches!(
            outcome,
            StepOutcome::Fault {
                fault: Fault::Memory { pc: BASE, .. },
                ..
            }
        ));
        assert_eq!(regs.pc(), BASE);
    }

    #[test]
    fn ebreak_traps_with_a0() {
        let (mut regs, mut memory) = machine(&[0x0010_0073]);
        regs.set_gpr(REG_A0, 3);
        let outcome = step_one(&mut regs, &mut memory);
        assert_eq!(
            outcome,
            StepOutcome::Trap {
                pc: BASE,
                raw: 0x0010_0073,
                code: 3
            }
        );
    }

    #[test]
    fn invalid_word_faults_without_moving_pc() {
        let (mut regs, mut memory) = machine(&[0xFFFF_FFFF]);
        let outcome = step_one(&mut regs, &mut memory);
        assert_eq!(
            outcome,
            StepOutcome::Fault {
                raw: Some(0xFFFF_FFFF),
                fault: Fault::IllegalInstruction {
                    pc: BASE,
                    raw: 0xFFFF_FFFF
                }
            }
        );
        assert_eq!(regs.pc(), BASE);
    }

    #[test]
    fn fetch_outside_memory_faults() {
        let (_, mut memory) = machine(&[]);
        let mut regs = RegisterFile::new(0);
        let outcome = step_one(&mut regs, &mut memory);
        assert!(matches!(
            outcome,
            StepOutcome::Fault {
                raw: None,
                fault: Fault::Memory { pc: 0, .. }
            }
        ));
    }
}
