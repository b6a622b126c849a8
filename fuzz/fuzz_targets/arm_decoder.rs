#![no_main]

use libfuzzer_sys::fuzz_target;
use mnemo_core::{Mode, PoolKind, SymbolKind};
use mnemo_disasm::{ArmDisassembler, Disassembler, WalkControl};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // The first byte picks the starting mode and seeds a mode switch
    // partway through the buffer.
    let (control, code) = data.split_at(1);
    let control = control[0];
    let mode = if control & 1 == 0 { Mode::Thumb } else { Mode::Arm };

    let mut disasm = ArmDisassembler::new();
    let switch = 0x1000 + u32::from(control >> 1) * 2;
    let kind = if mode == Mode::Thumb {
        SymbolKind::CodeArm
    } else {
        SymbolKind::CodeThumb
    };
    disasm.add_symbol(Some("switch"), switch, kind);
    let _ = disasm.add_literals(code, 0x1000);
    if control & 0x80 != 0 {
        let _ = disasm.add_pool(0x1000 + code.len() as u32 / 2, 4, PoolKind::Literal);
    }

    let mut last = None;
    let mut positions = Vec::new();
    disasm
        .disassemble_buffer_in(code, 0x1000, mode, |address, text| {
            assert!(!text.is_empty());
            assert!(last.map_or(true, |prev| prev < address));
            last = Some(address);
            positions.push(address);
            WalkControl::Continue
        })
        .expect("32-bit ARM walks never fail");

    // A second walk over the same bytes sees the pools the first one found
    // and must still make progress.
    let mut again = 0;
    let _ = disasm.disassemble_buffer_in(code, 0x1000, mode, |_, _| {
        again += 1;
        WalkControl::Continue
    });
    assert!(again <= code.len());
    assert!(positions.len() <= code.len());
});
