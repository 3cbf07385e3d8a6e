//! Instruction throughput of the emulator session.
//!
//! Runs a counted loop to completion with and without the instruction ring
//! buffer and reports retired instructions per second.
//!
//! ```sh
//! cargo run --release -p riscv-core --example throughput
//! ```

#![allow(clippy::pedantic)]

use proptest as _;
use riscv_core::{CoreConfig, Emulator, RunState, DEFAULT_MEMORY_BASE};
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

use std::time::Instant;

const ITERATIONS: u32 = 2_000_000;

/// `t0 = ITERATIONS; loop: a0 += t0; t0 -= 1; bnez t0, loop; li a0, 0; ebreak`
fn counted_loop() -> Vec<u32> {
    let lui_t0 = (ITERATIONS + 0x800) & 0xFFFF_F000 | (5 << 7) | 0x37;
    let addi_t0 = ((ITERATIONS & 0xFFF) << 20) | (5 << 15) | (5 << 7) | 0x13;
    vec![
        lui_t0,
        addi_t0,
        0x0055_0533, // add  a0, a0, t0
        0xFFF2_8293, // addi t0, t0, -1
        0xFE02_9CE3, // bnez t0, -8
        0x0000_0513, // li   a0, 0
        0x0010_0073, // ebreak
    ]
}

fn measure(itrace: bool) -> (u64, f64) {
    let mut emu = Emulator::new(CoreConfig {
        memory_size: 0x1000,
        itrace,
        ..CoreConfig::default()
    });
    let image: Vec<u8> = counted_loop()
        .iter()
        .flat_map(|word| word.to_le_bytes())
        .collect();
    emu.load_image(DEFAULT_MEMORY_BASE, &image)
        .expect("program fits");

    let start = Instant::now();
    let outcome = emu.execute(None).expect("no watchpoints");
    let elapsed = start.elapsed().as_secs_f64();
    assert!(
        matches!(outcome.state, RunState::End { code: 0, .. }),
        "unexpected end state {:?}",
        outcome.state
    );
    (outcome.steps, elapsed)
}

fn main() {
    println!("=== riscv-core throughput ===");
    for itrace in [false, true] {
        let (steps, elapsed) = measure(itrace);
        println!(
            "itrace={itrace:<5} steps={steps:>10} time={elapsed:>8.3}s rate={:>8.2} MIPS",
            steps as f64 / elapsed / 1e6
        );
    }
}
