#![no_main]

use libfuzzer_sys::fuzz_target;
use mnemo_disasm::{Disassembler, RiscVDisassembler, WalkControl, WalkOutcome};

fuzz_target!(|data: &[u8]| {
    let mut disasm = RiscVDisassembler::new();

    // Every word decodes, unknown ones as `.word`
    let mut lines = 0;
    let outcome = disasm
        .disassemble_buffer(data, 0x1000, |_, text| {
            assert!(!text.is_empty());
            lines += 1;
            WalkControl::Continue
        })
        .expect("RV32I walks never fail");

    assert_eq!(lines, data.len() / 4);
    if data.len() % 4 != 0 {
        assert!(matches!(outcome, WalkOutcome::Incomplete { needed: 4, .. }));
    }
});
