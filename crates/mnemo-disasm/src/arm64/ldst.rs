//! Loads and stores.

use crate::table::{form, Form};
use mnemo_core::bits::sign_extend64;
use mnemo_core::{IndexMode, MemoryRef, Operand, Register};

use super::decoder::Builder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
    Literal,
    Pair,
    UnsignedOffset,
    Immediate9,
    RegisterOffset,
    Exclusive { pair: bool, status: bool },
}

#[rustfmt::skip]
pub(super) static FORMS: &[Form<Kind>] = &[
    form!(b"oo011v00_iiiiiiiiiiiiiiiiiii_ttttt",              "ldr",    Kind::Literal),
    form!(b"oo101v_xxx_l_iiiiiii_uuuuu_nnnnn_ttttt",          "ldp",    Kind::Pair),
    form!(b"ss111v01_oo_iiiiiiiiiiii_nnnnn_ttttt",            "ldr",    Kind::UnsignedOffset),
    form!(b"ss111v00_oo0_iiiiiiiii_xx_nnnnn_ttttt",           "ldr",    Kind::Immediate9),
    form!(b"ss111v00_oo1_mmmmm_xxx_S_10_nnnnn_ttttt",         "ldr",    Kind::RegisterOffset),
    form!(b"ss001000_000_rrrrr_0_uuuuu_nnnnn_ttttt",          "stxr",   Kind::Exclusive { pair: false, status: true }),
    form!(b"ss001000_000_rrrrr_1_uuuuu_nnnnn_ttttt",          "stlxr",  Kind::Exclusive { pair: false, status: true }),
    form!(b"ss001000_010_rrrrr_0_uuuuu_nnnnn_ttttt",          "ldxr",   Kind::Exclusive { pair: false, status: false }),
    form!(b"ss001000_010_rrrrr_1_uuuuu_nnnnn_ttttt",          "ldaxr",  Kind::Exclusive { pair: false, status: false }),
    form!(b"ss001000_001_rrrrr_0_uuuuu_nnnnn_ttttt",          "stxp",   Kind::Exclusive { pair: true, status: true }),
    form!(b"ss001000_001_rrrrr_1_uuuuu_nnnnn_ttttt",          "stlxp",  Kind::Exclusive { pair: true, status: true }),
    form!(b"ss001000_011_rrrrr_0_uuuuu_nnnnn_ttttt",          "ldxp",   Kind::Exclusive { pair: true, status: false }),
    form!(b"ss001000_011_rrrrr_1_uuuuu_nnnnn_ttttt",          "ldaxp",  Kind::Exclusive { pair: true, status: false }),
    form!(b"ss001000_100_rrrrr_0_uuuuu_nnnnn_ttttt",          "stllr",  Kind::Exclusive { pair: false, status: false }),
    form!(b"ss001000_100_rrrrr_1_uuuuu_nnnnn_ttttt",          "stlr",   Kind::Exclusive { pair: false, status: false }),
    form!(b"ss001000_110_rrrrr_0_uuuuu_nnnnn_ttttt",          "ldlar",  Kind::Exclusive { pair: false, status: false }),
    form!(b"ss001000_110_rrrrr_1_uuuuu_nnnnn_ttttt",          "ldar",   Kind::Exclusive { pair: false, status: false }),
];

/// Mnemonic, transfer register and access size of a single-register
/// load/store selected by `size`, `V` and `opc`.
struct Access {
    mnemonic: &'static str,
    rt: Register,
    bytes: u8,
}

fn single_access(size: u32, v: u32, opc: u32, rt: u32) -> Option<Access> {
    let gpr = |mnemonic, is_64bit, bytes| Access {
        mnemonic,
        rt: Register::arm64_zr(rt, is_64bit),
        bytes,
    };
    let fpr = |mnemonic, bytes: u8| Access {
        mnemonic,
        rt: Register::arm64_fp(rt, u16::from(bytes) * 8),
        bytes,
    };

    Some(match (v, opc, size) {
        (0, 0, 0) => gpr("strb", false, 1),
        (0, 0, 1) => gpr("strh", false, 2),
        (0, 0, 2) => gpr("str", false, 4),
        (0, 0, 3) => gpr("str", true, 8),
        (0, 1, 0) => gpr("ldrb", false, 1),
        (0, 1, 1) => gpr("ldrh", false, 2),
        (0, 1, 2) => gpr("ldr", false, 4),
        (0, 1, 3) => gpr("ldr", true, 8),
        (0, 2, 0) => gpr("ldrsb", true, 1),
        (0, 2, 1) => gpr("ldrsh", true, 2),
        (0, 2, 2) => gpr("ldrsw", true, 4),
        (0, 2, 3) => gpr("prfm", true, 8),
        (0, 3, 0) => gpr("ldrsb", false, 1),
        (0, 3, 1) => gpr("ldrsh", false, 2),
        (1, 0, _) => fpr("str", 1 << size),
        (1, 1, _) => fpr("ldr", 1 << size),
        (1, 2, 0) => fpr("str", 16),
        (1, 3, 0) => fpr("ldr", 16),
        _ => return None,
    })
}

/// Unscaled-offset spelling of a load/store mnemonic (`ldr` -> `ldur`).
fn unscaled(mnemonic: &str) -> String {
    match mnemonic {
        "prfm" => "prfum".to_string(),
        _ => mnemonic.replacen('r', "ur", 1),
    }
}

/// Prefetch operation name, e.g. `pldl1keep`.
fn prefetch_op(rt: u32) -> String {
    let kind = match rt >> 3 {
        0 => "pld",
        1 => "pli",
        2 => "pst",
        _ => return format!("#{:#x}", rt),
    };
    let target = (rt >> 1) & 3;
    if target == 3 {
        return format!("#{:#x}", rt);
    }
    let policy = if rt & 1 == 0 { "keep" } else { "strm" };
    format!("{}l{}{}", kind, target + 1, policy)
}

/// Writes the transfer operand, which is a prefetch name for `prfm`.
fn transfer(b: &mut Builder, access: &Access, rt: u32) {
    if access.mnemonic.starts_with("prf") {
        b.text(&prefetch_op(rt));
    } else {
        b.reg(access.rt);
    }
}

pub(super) fn render(form: &Form<Kind>, _word: u32, address: u64, b: &mut Builder) -> Option<()> {
    match form.kind {
        Kind::Literal => {
            let opc = b.field("opc", 30, 2);
            let v = b.field("v", 26, 1);
            let imm19 = b.field("imm19", 5, 19);
            let rt = b.field("rt", 0, 5);
            let offset = sign_extend64(u64::from(imm19) << 2, 21);
            let target = address.wrapping_add(offset as u64);
            match (v, opc) {
                (0, 3) => {
                    b.mnemonic("prfm");
                    b.text(&prefetch_op(rt));
                }
                (0, _) => {
                    b.mnemonic(if opc == 2 { "ldrsw" } else { "ldr" });
                    b.reg(Register::arm64_zr(rt, opc != 0));
                }
                (_, 3) => return None,
                _ => {
                    b.mnemonic("ldr");
                    b.reg(Register::arm64_fp(rt, 32 << opc));
                }
            }
            b.target(address, target);
        }
        Kind::Pair => render_pair(b)?,
        Kind::UnsignedOffset => {
            let size = b.field("size", 30, 2);
            let v = b.field("v", 26, 1);
            let opc = b.field("opc", 22, 2);
            let imm12 = b.field("imm12", 10, 12);
            let rn = b.field("rn", 5, 5);
            let rt = b.field("rt", 0, 5);
            let access = single_access(size, v, opc, rt)?;
            let disp = i64::from(imm12) * i64::from(access.bytes);
            b.mnemonic(access.mnemonic);
            transfer(b, &access, rt);
            b.mem(MemoryRef::base_disp(
                Register::arm64_sp(rn, true),
                disp,
                access.bytes,
            ));
        }
        Kind::Immediate9 => {
            let size = b.field("size", 30, 2);
            let v = b.field("v", 26, 1);
            let opc = b.field("opc", 22, 2);
            let imm9 = b.field("imm9", 12, 9);
            let idx = b.field("idx", 10, 2);
            let rn = b.field("rn", 5, 5);
            let rt = b.field("rt", 0, 5);
            let access = single_access(size, v, opc, rt)?;
            let disp = sign_extend64(u64::from(imm9), 9);
            let mode = match idx {
                0b00 => IndexMode::Offset,
                0b01 => IndexMode::PostIndex,
                0b11 => IndexMode::PreIndex,
                // Unprivileged ldtr/sttr.
                _ => return None,
            };
            let is_prefetch = access.mnemonic == "prfm";
            if is_prefetch && mode != IndexMode::Offset {
                return None;
            }
            if mode == IndexMode::Offset {
                b.mnemonic(&unscaled(access.mnemonic));
            } else {
                b.mnemonic(access.mnemonic);
            }
            transfer(b, &access, rt);
            b.mem(
                MemoryRef::base_disp(Register::arm64_sp(rn, true), disp, access.bytes)
                    .with_mode(mode),
            );
        }
        Kind::RegisterOffset => {
            let size = b.field("size", 30, 2);
            let v = b.field("v", 26, 1);
            let opc = b.field("opc", 22, 2);
            let rm = b.field("rm", 16, 5);
            let option = b.field("option", 13, 3);
            let s = b.field("s", 12, 1);
            let rn = b.field("rn", 5, 5);
            let rt = b.field("rt", 0, 5);
            let access = single_access(size, v, opc, rt)?;
            let extend = match option {
                0b010 => "uxtw",
                0b011 => "lsl",
                0b110 => "sxtw",
                0b111 => "sxtx",
                _ => return None,
            };
            let amount = if s == 1 {
                access.bytes.trailing_zeros()
            } else {
                0
            };
            let base = Register::arm64_sp(rn, true);
            let index = Register::arm64_zr(rm, option & 1 == 1);
            let mem = MemoryRef::base_index(base, index, access.bytes);

            b.mnemonic(access.mnemonic);
            transfer(b, &access, rt);
            let text = match (extend, s) {
                ("lsl", 0) => format!("[{}, {}]", base, index),
                (_, 0) => format!("[{}, {}, {}]", base, index, extend),
                _ => format!("[{}, {}, {} #{}]", base, index, extend, amount),
            };
            b.operand_as(Operand::Memory(mem), &text);
        }
        Kind::Exclusive { pair, status } => {
            let size = b.field("size", 30, 2);
            let rs = b.field("rs", 16, 5);
            let rt2 = b.field("rt2", 10, 5);
            let rn = b.field("rn", 5, 5);
            let rt = b.field("rt", 0, 5);
            let is_64bit = size == 3;
            let suffix = match (pair, size) {
                (true, 0 | 1) => return None,
                (false, 0) => "b",
                (false, 1) => "h",
                _ => "",
            };
            b.mnemonic(&format!("{}{}", form.mnemonic, suffix));
            if status {
                b.reg(Register::arm64_zr(rs, false));
            }
            b.reg(Register::arm64_zr(rt, is_64bit));
            if pair {
                b.reg(Register::arm64_zr(rt2, is_64bit));
            }
            b.mem(MemoryRef::base_disp(
                Register::arm64_sp(rn, true),
                0,
                1 << size,
            ));
        }
    }
    Some(())
}

fn render_pair(b: &mut Builder) -> Option<()> {
    let opc = b.field("opc", 30, 2);
    let v = b.field("v", 26, 1);
    let idx = b.field("idx", 23, 3);
    let load = b.field("l", 22, 1) == 1;
    let imm7 = b.field("imm7", 15, 7);
    let rt2 = b.field("rt2", 10, 5);
    let rn = b.field("rn", 5, 5);
    let rt = b.field("rt", 0, 5);

    let mode = match idx {
        0b000 | 0b010 => IndexMode::Offset,
        0b001 => IndexMode::PostIndex,
        0b011 => IndexMode::PreIndex,
        _ => return None,
    };
    let non_temporal = idx == 0b000;

    // (suffix, access size, SIMD/FP, 64-bit general registers)
    let (mnemonic, scale, fp, wide) = match (v, opc) {
        (0, 0) => ("p", 4u8, false, false),
        (0, 1) if load && !non_temporal => ("psw", 4, false, true),
        (0, 2) => ("p", 8, false, true),
        (1, 0) => ("p", 4, true, false),
        (1, 1) => ("p", 8, true, false),
        (1, 2) => ("p", 16, true, false),
        _ => return None,
    };
    let reg = |r| {
        if fp {
            Register::arm64_fp(r, u16::from(scale) * 8)
        } else {
            Register::arm64_zr(r, wide)
        }
    };

    let prefix = if load { "ld" } else { "st" };
    let np = if non_temporal { "n" } else { "" };
    b.mnemonic(&format!("{}{}{}", prefix, np, mnemonic));
    b.reg(reg(rt));
    b.reg(reg(rt2));
    let disp = sign_extend64(u64::from(imm7), 7) * i64::from(scale);
    b.mem(MemoryRef::base_disp(Register::arm64_sp(rn, true), disp, scale).with_mode(mode));
    Some(())
}

#[cfg(test)]
mod tests {
    use crate::arm64::Arm64Disassembler;
    use mnemo_core::{IndexMode, Operand};

    fn text(word: u32) -> String {
        Arm64Disassembler::new().disassemble(word, 0x1000).unwrap().text
    }

    #[test]
    fn test_literal_loads() {
        assert_eq!(text(0x5800_0080), "ldr x0, 0x1010");
        assert_eq!(text(0x9800_0021), "ldrsw x1, 0x1004");
        assert_eq!(text(0x1C00_0040), "ldr s0, 0x1008");
    }

    #[test]
    fn test_pairs() {
        assert_eq!(text(0xA9BF_7BFD), "stp x29, x30, [sp, #-0x10]!");
        assert_eq!(text(0xA8C1_7BFD), "ldp x29, x30, [sp], #0x10");
        assert_eq!(text(0x6940_0440), "ldpsw x0, x1, [x2]");
        assert_eq!(text(0x6C01_0400), "stnp d0, d1, [x0, #0x10]");
    }

    #[test]
    fn test_pair_operands() {
        let insn = Arm64Disassembler::new()
            .disassemble(0xA9BF_7BFD, 0)
            .unwrap();
        assert_eq!(insn.operands.len(), 3);
        match &insn.operands[2] {
            Operand::Memory(mem) => {
                assert_eq!(mem.displacement, -16);
                assert_eq!(mem.mode, IndexMode::PreIndex);
            }
            other => panic!("expected memory operand, got {:?}", other),
        }
    }

    #[test]
    fn test_unsigned_offset() {
        assert_eq!(text(0xF940_0420), "ldr x0, [x1, #0x8]");
        assert_eq!(text(0xB900_07E0), "str w0, [sp, #0x4]");
        assert_eq!(text(0x3940_0020), "ldrb w0, [x1]");
        assert_eq!(text(0xFD40_0400), "ldr d0, [x0, #0x8]");
        assert_eq!(text(0x3DC0_0400), "ldr q0, [x0, #0x10]");
    }

    #[test]
    fn test_immediate_indexed() {
        assert_eq!(text(0xF85F_83A0), "ldur x0, [x29, #-0x8]");
        assert_eq!(text(0xF81F_0FE0), "str x0, [sp, #-0x10]!");
        assert_eq!(text(0xF841_07E0), "ldr x0, [sp], #0x10");
    }

    #[test]
    fn test_register_offset() {
        assert_eq!(text(0xF862_7820), "ldr x0, [x1, x2, lsl #3]");
        assert_eq!(text(0xB862_D820), "ldr w0, [x1, w2, sxtw #2]");
    }

    #[test]
    fn test_exclusive_and_ordered() {
        assert_eq!(text(0xC85F_7C20), "ldxr x0, [x1]");
        assert_eq!(text(0xC802_7C20), "stxr w2, x0, [x1]");
        assert_eq!(text(0x885F_FC20), "ldaxr w0, [x1]");
        assert_eq!(text(0x085F_FC20), "ldaxrb w0, [x1]");
        assert_eq!(text(0xC89F_FC20), "stlr x0, [x1]");
        assert_eq!(text(0x88DF_FC20), "ldar w0, [x1]");
        assert_eq!(text(0xC823_0440), "stxp w3, x0, x1, [x2]");
    }

    #[test]
    fn test_prefetch_names() {
        assert_eq!(super::prefetch_op(0), "pldl1keep");
        assert_eq!(super::prefetch_op(0b10001), "pstl1strm");
        assert_eq!(super::prefetch_op(0b00110), "#0x6");
    }
}
