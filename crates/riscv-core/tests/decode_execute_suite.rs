//! Program-level coverage of the decode-execute engine.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::unreadable_literal
)]

use proptest::prelude::*;
use riscv_core::{
    CoreConfig, Emulator, FaultClass, RunState, StepOutcome, DEFAULT_MEMORY_BASE, REG_A0,
};
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const BASE: u32 = DEFAULT_MEMORY_BASE;

const OP: u32 = 0x33;
const OP_IMM: u32 = 0x13;
const LOAD: u32 = 0x03;
const STORE: u32 = 0x23;
const BRANCH: u32 = 0x63;
const JAL: u32 = 0x6F;
const JALR: u32 = 0x67;
const LUI: u32 = 0x37;
const AUIPC: u32 = 0x17;
const EBREAK: u32 = 0x0010_0073;

const ZERO: u32 = 0;
const RA: u32 = 1;
const SP: u32 = 2;
const T0: u32 = 5;
const A0: u32 = 10;
const A1: u32 = 11;
const A2: u32 = 12;
const A3: u32 = 13;
const A4: u32 = 14;

const fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32) -> u32 {
    (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | OP
}

const fn i_type(imm: i32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    (((imm as u32) & 0xFFF) << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

const fn s_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 5) & 0x7F) << 25)
        | (rs2 << 20)
        | (rs1 << 15)
        | (funct3 << 12)
        | ((imm & 0x1F) << 7)
        | STORE
}

const fn b_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 12) & 1) << 31)
        | (((imm >> 5) & 0x3F) << 25)
        | (rs2 << 20)
        | (rs1 << 15)
        | (funct3 << 12)
        | (((imm >> 1) & 0xF) << 8)
        | (((imm >> 11) & 1) << 7)
        | BRANCH
}

const fn j_type(imm: i32, rd: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 20) & 1) << 31)
        | (((imm >> 1) & 0x3FF) << 21)
        | (((imm >> 11) & 1) << 20)
        | (((imm >> 12) & 0xFF) << 12)
        | (rd << 7)
        | JAL
}

const fn u_type(imm20: u32, rd: u32, opcode: u32) -> u32 {
    (imm20 << 12) | (rd << 7) | opcode
}

fn session(program: &[u32]) -> Emulator {
    let config = CoreConfig {
        memory_size: 0x2000,
        ..CoreConfig::default()
    };
    let mut emu = Emulator::new(config);
    let image: Vec<u8> = program.iter().flat_map(|word| word.to_le_bytes()).collect();
    emu.load_image(BASE, &image).expect("program fits");
    emu
}

#[test]
fn counted_loop_sums_to_good_trap() {
    let mut emu = session(&[
        i_type(10, ZERO, 0, T0, OP_IMM),
        i_type(0, ZERO, 0, A0, OP_IMM),
        r_type(0, T0, A0, 0, A0),
        i_type(-1, T0, 0, T0, OP_IMM),
        b_type(-8, ZERO, T0, 1),
        i_type(-55, A0, 0, A0, OP_IMM),
        EBREAK,
    ]);

    let outcome = emu.execute(None).expect("runs");
    assert_eq!(outcome.steps, 34);
    assert_eq!(
        outcome.state,
        RunState::End {
            pc: BASE + 24,
            code: 0
        }
    );
}

#[test]
fn call_and_return_through_ra() {
    let mut emu = session(&[
        j_type(12, RA),
        i_type(-42, A0, 0, A0, OP_IMM),
        EBREAK,
        i_type(42, ZERO, 0, A0, OP_IMM),
        i_type(0, RA, 0, ZERO, JALR),
    ]);

    let outcome = emu.execute(None).expect("runs");
    assert_eq!(outcome.steps, 5);
    assert_eq!(
        outcome.state,
        RunState::End {
            pc: BASE + 8,
            code: 0
        }
    );
    assert_eq!(emu.registers().gpr(RA as usize), BASE + 4);
}

#[test]
fn sub_word_loads_extend_by_mnemonic() {
    let mut emu = session(&[
        u_type(0x80001, SP, LUI),
        i_type(-2, ZERO, 0, T0, OP_IMM),
        s_type(-4, T0, SP, 2),
        i_type(-4, SP, 0, A1, LOAD),
        i_type(-4, SP, 4, A2, LOAD),
        i_type(-4, SP, 1, A3, LOAD),
        i_type(-4, SP, 5, A4, LOAD),
        EBREAK,
    ]);

    emu.execute(None).expect("runs");
    let regs = emu.registers();
    assert_eq!(regs.gpr(SP as usize), 0x8000_1000);
    assert_eq!(regs.gpr(A1 as usize), 0xFFFF_FFFE);
    assert_eq!(regs.gpr(A2 as usize), 0xFE);
    assert_eq!(regs.gpr(A3 as usize), 0xFFFF_FFFE);
    assert_eq!(regs.gpr(A4 as usize), 0xFFFE);
}

#[test]
fn auipc_adds_upper_immediate_to_pc() {
    let mut emu = session(&[u_type(0, ZERO, OP_IMM), u_type(1, A0, AUIPC)]);
    emu.step_one();
    emu.step_one();
    assert_eq!(emu.registers().gpr(REG_A0), BASE + 4 + 0x1000);
}

#[test]
fn store_outside_memory_aborts_without_side_effects() {
    let mut emu = session(&[
        i_type(7, ZERO, 0, A0, OP_IMM),
        s_type(0, A0, ZERO, 2),
        EBREAK,
    ]);

    let outcome = emu.execute(None).expect("runs");
    let fault = outcome.state.fault().expect("aborted");
    assert_eq!(fault.class(), FaultClass::Memory);
    assert_eq!(fault.pc(), BASE + 4);
    assert_eq!(emu.registers().pc(), BASE + 4);
    assert!(outcome.state.is_bad_exit());
}

#[test]
fn invalid_word_is_reported_with_its_pc() {
    let mut emu = session(&[0xFFFF_FFFF]);
    let outcome = emu.step_one().expect("running");
    let StepOutcome::Fault { raw, fault } = outcome else {
        panic!("expected fault, got {outcome:?}");
    };
    assert_eq!(raw, Some(0xFFFF_FFFF));
    assert_eq!(fault.class(), FaultClass::Decode);
    assert_eq!(emu.registers().pc(), BASE);
}

#[rstest]
#[case::add(0x00, 0, 1, 2, 3)]
#[case::sub(0x20, 0, 5, 7, 0xFFFF_FFFE)]
#[case::sll(0x00, 1, 1, 33, 2)]
#[case::slt(0x00, 2, 0xFFFF_FFFF, 0, 1)]
#[case::sltu(0x00, 3, 0xFFFF_FFFF, 0, 0)]
#[case::xor(0x00, 4, 0xF0, 0xFF, 0x0F)]
#[case::srl(0x00, 5, 0x8000_0000, 31, 1)]
#[case::sra(0x20, 5, 0x8000_0000, 31, 0xFFFF_FFFF)]
#[case::or(0x00, 6, 0xF0, 0x0F, 0xFF)]
#[case::and(0x00, 7, 0xF0, 0x3C, 0x30)]
#[case::mul(0x01, 0, 6, 7, 42)]
#[case::mulhu(0x01, 3, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFE)]
#[case::div(0x01, 4, 0xFFFF_FFF9, 2, 0xFFFF_FFFD)]
#[case::divu_by_zero(0x01, 5, 7, 0, 0xFFFF_FFFF)]
#[case::rem(0x01, 6, 0xFFFF_FFF9, 2, 0xFFFF_FFFF)]
#[case::remu_by_zero(0x01, 7, 7, 0, 7)]
fn register_alu_operations(
    #[case] funct7: u32,
    #[case] funct3: u32,
    #[case] lhs: u32,
    #[case] rhs: u32,
    #[case] expected: u32,
) {
    let mut emu = session(&[r_type(funct7, A2, A1, funct3, A0)]);
    emu.registers_mut().set_gpr(A1 as usize, lhs);
    emu.registers_mut().set_gpr(A2 as usize, rhs);

    let outcome = emu.step_one().expect("running");
    assert!(matches!(outcome, StepOutcome::Retired { .. }), "{outcome:?}");
    assert_eq!(emu.registers().gpr(REG_A0), expected);
}

proptest! {
    #[test]
    fn addi_sign_extends_its_immediate(imm in -2048_i32..2048) {
        let mut emu = session(&[i_type(imm, ZERO, 0, A0, OP_IMM)]);
        emu.step_one();
        prop_assert_eq!(emu.registers().gpr(REG_A0), imm as u32);
    }

    #[test]
    fn branches_follow_their_condition(
        lhs in any::<u32>(),
        rhs in any::<u32>(),
        funct3 in prop::sample::select(vec![0_u32, 1, 4, 5, 6, 7]),
    ) {
        let mut emu = session(&[b_type(16, A2, A1, funct3)]);
        emu.registers_mut().set_gpr(A1 as usize, lhs);
        emu.registers_mut().set_gpr(A2 as usize, rhs);
        emu.step_one();

        let taken = match funct3 {
            0 => lhs == rhs,
            1 => lhs != rhs,
            4 => (lhs as i32) < (rhs as i32),
            5 => (lhs as i32) >= (rhs as i32),
            6 => lhs < rhs,
            _ => lhs >= rhs,
        };
        let expected = if taken { BASE + 16 } else { BASE + 4 };
        prop_assert_eq!(emu.registers().pc(), expected);
    }

    #[test]
    fn zero_register_reads_zero_after_any_word(word in any::<u32>()) {
        let mut emu = session(&[word]);
        emu.step_one();
        prop_assert_eq!(emu.registers().gpr(0), 0);
    }

    #[test]
    fn jal_links_and_jumps_by_its_offset(offset in (-0x100_i32..0x100).prop_map(|o| o * 4)) {
        let mut emu = session(&[j_type(offset, RA)]);
        emu.step_one();
        prop_assert_eq!(emu.registers().gpr(RA as usize), BASE + 4);
        prop_assert_eq!(emu.registers().pc(), BASE.wrapping_add(offset as u32));
    }
}
