#![no_main]

use libfuzzer_sys::fuzz_target;
use mnemo_disasm::{Armv8mDisassembler, Disassembler, WalkControl};

fuzz_target!(|data: &[u8]| {
    let mut disasm = Armv8mDisassembler::new();

    let mut lines = 0;
    let _ = disasm
        .disassemble_buffer(data, 0, |_, _| {
            lines += 1;
            WalkControl::Continue
        })
        .expect("table walks never fail");
    assert_eq!(lines, data.len() / 2);
});
