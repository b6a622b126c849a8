#![no_main]

use libfuzzer_sys::fuzz_target;
use mnemo_disasm::{Arm64Disassembler, DecodeError, Disassembler, WalkControl};

fuzz_target!(|data: &[u8]| {
    // ARM64 instructions are fixed 32-bit
    if data.len() < 4 {
        return;
    }

    let mut disasm = Arm64Disassembler::new();

    // Decode single instruction
    if let Ok(decoded) = disasm.decode_instruction(data, 0x1000) {
        assert_eq!(decoded.size, 4);
    }

    // Only reserved encodings may end a walk early
    let mut last = None;
    let result = disasm.disassemble_buffer(data, 0x1000, |address, _| {
        assert!(last.map_or(true, |prev| prev < address));
        last = Some(address);
        WalkControl::Continue
    });
    if let Err(err) = result {
        assert!(matches!(err, DecodeError::InvalidEncoding { .. }));
    }
});
