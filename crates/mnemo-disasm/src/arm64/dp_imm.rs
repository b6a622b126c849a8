//! Data processing (immediate).

use crate::table::{form, Form};
use mnemo_core::bits::sign_extend64;
use mnemo_core::Register;

use super::decoder::{decode_bitmask_imm, Builder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
    Adr,
    Adrp,
    AddSub { sub: bool, flags: bool },
    Logical,
    MoveWide,
    Bitfield,
    Extr,
}

#[rustfmt::skip]
pub(super) static FORMS: &[Form<Kind>] = &[
    form!(b"0ii10000_iiiiiiiiiiiiiiiiiii_ddddd",    "adr",   Kind::Adr),
    form!(b"1ii10000_iiiiiiiiiiiiiiiiiii_ddddd",    "adrp",  Kind::Adrp),
    form!(b"s0010001_0hiiiiiiiiiiii_nnnnn_ddddd",   "add",   Kind::AddSub { sub: false, flags: false }),
    form!(b"s0110001_0hiiiiiiiiiiii_nnnnn_ddddd",   "adds",  Kind::AddSub { sub: false, flags: true }),
    form!(b"s1010001_0hiiiiiiiiiiii_nnnnn_ddddd",   "sub",   Kind::AddSub { sub: true, flags: false }),
    form!(b"s1110001_0hiiiiiiiiiiii_nnnnn_ddddd",   "subs",  Kind::AddSub { sub: true, flags: true }),
    form!(b"s0010010_0Nrrrrrrssssss_nnnnn_ddddd",   "and",   Kind::Logical),
    form!(b"s0110010_0Nrrrrrrssssss_nnnnn_ddddd",   "orr",   Kind::Logical),
    form!(b"s1010010_0Nrrrrrrssssss_nnnnn_ddddd",   "eor",   Kind::Logical),
    form!(b"s1110010_0Nrrrrrrssssss_nnnnn_ddddd",   "ands",  Kind::Logical),
    form!(b"s0010010_1hhiiiiiiiiiiiiiiii_ddddd",    "movn",  Kind::MoveWide),
    form!(b"s1010010_1hhiiiiiiiiiiiiiiii_ddddd",    "movz",  Kind::MoveWide),
    form!(b"s1110010_1hhiiiiiiiiiiiiiiii_ddddd",    "movk",  Kind::MoveWide),
    form!(b"s0010011_0Nrrrrrrssssss_nnnnn_ddddd",   "sbfm",  Kind::Bitfield),
    form!(b"s0110011_0Nrrrrrrssssss_nnnnn_ddddd",   "bfm",   Kind::Bitfield),
    form!(b"s1010011_0Nrrrrrrssssss_nnnnn_ddddd",   "ubfm",  Kind::Bitfield),
    form!(b"s0010011_1N0mmmmmssssss_nnnnn_ddddd",   "extr",  Kind::Extr),
];

pub(super) fn render(form: &Form<Kind>, _word: u32, address: u64, b: &mut Builder) -> Option<()> {
    match form.kind {
        Kind::Adr | Kind::Adrp => {
            let rd = b.field("rd", 0, 5);
            let immlo = b.field("immlo", 29, 2);
            let immhi = b.field("immhi", 5, 19);
            let imm = sign_extend64(u64::from((immhi << 2) | immlo), 21);
            let target = if form.kind == Kind::Adrp {
                (address & !0xFFF).wrapping_add((imm << 12) as u64)
            } else {
                address.wrapping_add(imm as u64)
            };
            b.mnemonic(form.mnemonic);
            b.reg(Register::arm64_zr(rd, true));
            b.target(address, target);
        }
        Kind::AddSub { sub, flags } => {
            let sf = b.field("sf", 31, 1) == 1;
            let shift = b.field("sh", 22, 1) * 12;
            let imm = b.field("imm12", 10, 12);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            let src = Register::arm64_sp(rn, sf);

            if flags && rd == 31 {
                b.mnemonic(if sub { "cmp" } else { "cmn" });
                b.reg(src);
            } else if !sub && !flags && shift == 0 && imm == 0 && (rd == 31 || rn == 31) {
                b.mnemonic("mov");
                b.reg(Register::arm64_sp(rd, sf));
                b.reg(src);
                return Some(());
            } else {
                b.mnemonic(form.mnemonic);
                let dest = if flags {
                    Register::arm64_zr(rd, sf)
                } else {
                    Register::arm64_sp(rd, sf)
                };
                b.reg(dest);
                b.reg(src);
            }
            b.imm(u64::from(imm));
            b.shift("lsl", shift);
        }
        Kind::Logical => {
            let sf = b.field("sf", 31, 1) == 1;
            let n = b.field("n", 22, 1);
            let immr = b.field("immr", 16, 6);
            let imms = b.field("imms", 10, 6);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            let imm = decode_bitmask_imm(n, imms, immr, sf)?;
            let flags = form.mnemonic == "ands";

            if flags && rd == 31 {
                b.mnemonic("tst");
                b.reg(Register::arm64_zr(rn, sf));
            } else if form.mnemonic == "orr" && rn == 31 {
                b.mnemonic("mov");
                b.reg(Register::arm64_sp(rd, sf));
            } else {
                b.mnemonic(form.mnemonic);
                let dest = if flags {
                    Register::arm64_zr(rd, sf)
                } else {
                    Register::arm64_sp(rd, sf)
                };
                b.reg(dest);
                b.reg(Register::arm64_zr(rn, sf));
            }
            b.imm(imm);
        }
        Kind::MoveWide => render_move_wide(form, b)?,
        Kind::Bitfield => render_bitfield(form, b)?,
        Kind::Extr => {
            let sf = b.field("sf", 31, 1) == 1;
            let n = b.field("n", 22, 1);
            let rm = b.field("rm", 16, 5);
            let imms = b.field("imms", 10, 6);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            if (n == 1) != sf || (!sf && imms >= 32) {
                return None;
            }
            b.mnemonic(if rn == rm { "ror" } else { form.mnemonic });
            b.reg(Register::arm64_zr(rd, sf));
            b.reg(Register::arm64_zr(rn, sf));
            if rn != rm {
                b.reg(Register::arm64_zr(rm, sf));
            }
            b.imm(u64::from(imms));
        }
    }
    Some(())
}

fn render_move_wide(form: &Form<Kind>, b: &mut Builder) -> Option<()> {
    let sf = b.field("sf", 31, 1) == 1;
    let hw = b.field("hw", 21, 2);
    let imm16 = b.field("imm16", 5, 16);
    let rd = b.field("rd", 0, 5);
    if !sf && hw >= 2 {
        return None;
    }
    let shift = hw * 16;
    let dest = Register::arm64_zr(rd, sf);
    let wide = u64::from(imm16) << shift;

    match form.mnemonic {
        "movz" if imm16 != 0 || hw == 0 => {
            b.mnemonic("mov");
            b.reg(dest);
            b.imm(wide);
        }
        "movn" if (imm16 != 0 || hw == 0) && (sf || imm16 != 0xFFFF) => {
            let value = if sf {
                !wide as i64
            } else {
                i64::from(!(wide as u32) as i32)
            };
            b.mnemonic("mov");
            b.reg(dest);
            b.simm(value);
        }
        _ => {
            b.mnemonic(form.mnemonic);
            b.reg(dest);
            b.imm(u64::from(imm16));
            b.shift("lsl", shift);
        }
    }
    Some(())
}

fn render_bitfield(form: &Form<Kind>, b: &mut Builder) -> Option<()> {
    let sf = b.field("sf", 31, 1) == 1;
    let n = b.field("n", 22, 1);
    let immr = b.field("immr", 16, 6);
    let imms = b.field("imms", 10, 6);
    let rn = b.field("rn", 5, 5);
    let rd = b.field("rd", 0, 5);
    let width = if sf { 64 } else { 32 };
    if (n == 1) != sf || immr >= width || imms >= width {
        return None;
    }

    let dest = Register::arm64_zr(rd, sf);
    let src = Register::arm64_zr(rn, sf);
    // (mnemonic, first immediate, second immediate)
    let alias: (&str, Option<u32>, Option<u32>) = match form.mnemonic {
        "sbfm" => {
            if imms == width - 1 {
                ("asr", Some(immr), None)
            } else if immr == 0 && matches!(imms, 7 | 15 | 31) {
                let name = match imms {
                    7 => "sxtb",
                    15 => "sxth",
                    _ => "sxtw",
                };
                b.mnemonic(name);
                b.reg(dest);
                b.reg(Register::arm64_zr(rn, false));
                return Some(());
            } else if imms < immr {
                ("sbfiz", Some(width - immr), Some(imms + 1))
            } else {
                ("sbfx", Some(immr), Some(imms - immr + 1))
            }
        }
        "ubfm" => {
            if imms != width - 1 && imms + 1 == immr {
                ("lsl", Some(width - 1 - imms), None)
            } else if imms == width - 1 {
                ("lsr", Some(immr), None)
            } else if !sf && immr == 0 && matches!(imms, 7 | 15) {
                b.mnemonic(if imms == 7 { "uxtb" } else { "uxth" });
                b.reg(dest);
                b.reg(src);
                return Some(());
            } else if imms < immr {
                ("ubfiz", Some(width - immr), Some(imms + 1))
            } else {
                ("ubfx", Some(immr), Some(imms - immr + 1))
            }
        }
        _ => {
            if imms < immr {
                if rn == 31 {
                    b.mnemonic("bfc");
                    b.reg(dest);
                    b.imm(u64::from(width - immr));
                    b.imm(u64::from(imms + 1));
                    return Some(());
                }
                ("bfi", Some(width - immr), Some(imms + 1))
            } else {
                ("bfxil", Some(immr), Some(imms - immr + 1))
            }
        }
    };

    let (mnemonic, first, second) = alias;
    b.mnemonic(mnemonic);
    b.reg(dest);
    b.reg(src);
    for value in [first, second].into_iter().flatten() {
        b.imm(u64::from(value));
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use crate::arm64::Arm64Disassembler;

    fn text(word: u32) -> String {
        Arm64Disassembler::new().disassemble(word, 0x1000).unwrap().text
    }

    #[test]
    fn test_add_sub_immediate() {
        assert_eq!(text(0x9100_4020), "add x0, x1, #0x10");
        assert_eq!(text(0xD100_83FF), "sub sp, sp, #0x20");
        assert_eq!(text(0x9140_0420), "add x0, x1, #0x1, lsl #12");
    }

    #[test]
    fn test_add_sub_aliases() {
        assert_eq!(text(0x9100_03FD), "mov x29, sp");
        assert_eq!(text(0xF100_041F), "cmp x0, #0x1");
        assert_eq!(text(0x3100_041F), "cmn w0, #0x1");
    }

    #[test]
    fn test_adr_adrp() {
        assert_eq!(text(0xB000_0000), "adrp x0, 0x2000");
        // adr x1, #-4
        assert_eq!(text(0x10FF_FFE1), "adr x1, 0xffc");
    }

    #[test]
    fn test_logical_immediate() {
        assert_eq!(text(0x9240_1C20), "and x0, x1, #0xff");
        assert_eq!(text(0x7200_001F), "tst w0, #0x1");
        // Reserved bitmask: N=0, imms=0b111111.
        assert_eq!(text(0x1200_FC20), ".long 0x1200fc20");
    }

    #[test]
    fn test_move_wide() {
        assert_eq!(text(0xD282_4680), "mov x0, #0x1234");
        assert_eq!(text(0xF2AA_CF00), "movk x0, #0x5678, lsl #16");
        assert_eq!(text(0x1280_0000), "mov w0, #-0x1");
        // hw=2 is not available for 32-bit registers.
        assert_eq!(text(0x52C0_0000), ".long 0x52c00000");
    }

    #[test]
    fn test_bitfield_aliases() {
        assert_eq!(text(0xD37D_F020), "lsl x0, x1, #0x3");
        assert_eq!(text(0x5304_7C20), "lsr w0, w1, #0x4");
        assert_eq!(text(0x5300_1C20), "uxtb w0, w1");
        assert_eq!(text(0x9340_7C20), "sxtw x0, w1");
        assert_eq!(text(0x9345_FC20), "asr x0, x1, #0x5");
        assert_eq!(text(0xD344_2C20), "ubfx x0, x1, #0x4, #0x8");
        assert_eq!(text(0x3318_0C20), "bfi w0, w1, #0x8, #0x4");
    }

    #[test]
    fn test_extr_and_ror() {
        assert_eq!(text(0x93C1_2020), "ror x0, x1, #0x8");
        assert_eq!(text(0x93C2_2020), "extr x0, x1, x2, #0x8");
    }
}
