#![no_main]

use libfuzzer_sys::fuzz_target;
use riscv_core::{disassemble_one, CoreConfig, Decoder, Emulator, DEFAULT_MEMORY_BASE};

const STEP_LIMIT: u64 = 64;

fuzz_target!(|data: &[u8]| {
    let (program, expr) = data.split_at(data.len().min(64) & !3);

    for chunk in program.chunks_exact(4) {
        let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let _ = Decoder::decode_fields(word);
        let _ = disassemble_one(DEFAULT_MEMORY_BASE, word).to_string();
    }

    let mut emu = Emulator::new(CoreConfig {
        memory_size: 0x1000,
        ..CoreConfig::default()
    });
    if emu.load_image(DEFAULT_MEMORY_BASE, program).is_err() {
        return;
    }
    let _ = emu.execute(Some(STEP_LIMIT));
    assert_eq!(emu.registers().gpr(0), 0);

    if let Ok(text) = std::str::from_utf8(expr) {
        let _ = emu.evaluate(text);
        let _ = emu.watch(text);
    }
});
