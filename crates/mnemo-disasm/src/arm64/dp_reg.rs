//! Data processing (register).

use crate::table::{form, Form};
use mnemo_core::{Condition, Register};

use super::decoder::Builder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
    Logical,
    AddSubShifted,
    AddSubExtended,
    Carry,
    CondCompare { imm: bool },
    CondSelect,
    TwoSource,
    OneSource,
    ThreeSource { long: bool },
}

#[rustfmt::skip]
pub(super) static FORMS: &[Form<Kind>] = &[
    form!(b"s00_01010_hh_0_mmmmm_iiiiii_nnnnn_ddddd",       "and",    Kind::Logical),
    form!(b"s00_01010_hh_1_mmmmm_iiiiii_nnnnn_ddddd",       "bic",    Kind::Logical),
    form!(b"s01_01010_hh_0_mmmmm_iiiiii_nnnnn_ddddd",       "orr",    Kind::Logical),
    form!(b"s01_01010_hh_1_mmmmm_iiiiii_nnnnn_ddddd",       "orn",    Kind::Logical),
    form!(b"s10_01010_hh_0_mmmmm_iiiiii_nnnnn_ddddd",       "eor",    Kind::Logical),
    form!(b"s10_01010_hh_1_mmmmm_iiiiii_nnnnn_ddddd",       "eon",    Kind::Logical),
    form!(b"s11_01010_hh_0_mmmmm_iiiiii_nnnnn_ddddd",       "ands",   Kind::Logical),
    form!(b"s11_01010_hh_1_mmmmm_iiiiii_nnnnn_ddddd",       "bics",   Kind::Logical),
    form!(b"s00_01011_hh_0_mmmmm_iiiiii_nnnnn_ddddd",       "add",    Kind::AddSubShifted),
    form!(b"s01_01011_hh_0_mmmmm_iiiiii_nnnnn_ddddd",       "adds",   Kind::AddSubShifted),
    form!(b"s10_01011_hh_0_mmmmm_iiiiii_nnnnn_ddddd",       "sub",    Kind::AddSubShifted),
    form!(b"s11_01011_hh_0_mmmmm_iiiiii_nnnnn_ddddd",       "subs",   Kind::AddSubShifted),
    form!(b"s00_01011_00_1_mmmmm_ooo_iii_nnnnn_ddddd",      "add",    Kind::AddSubExtended),
    form!(b"s01_01011_00_1_mmmmm_ooo_iii_nnnnn_ddddd",      "adds",   Kind::AddSubExtended),
    form!(b"s10_01011_00_1_mmmmm_ooo_iii_nnnnn_ddddd",      "sub",    Kind::AddSubExtended),
    form!(b"s11_01011_00_1_mmmmm_ooo_iii_nnnnn_ddddd",      "subs",   Kind::AddSubExtended),
    form!(b"s00_11010000_mmmmm_000000_nnnnn_ddddd",         "adc",    Kind::Carry),
    form!(b"s01_11010000_mmmmm_000000_nnnnn_ddddd",         "adcs",   Kind::Carry),
    form!(b"s10_11010000_mmmmm_000000_nnnnn_ddddd",         "sbc",    Kind::Carry),
    form!(b"s11_11010000_mmmmm_000000_nnnnn_ddddd",         "sbcs",   Kind::Carry),
    form!(b"s01_11010010_mmmmm_cccc_00_nnnnn_0_ffff",       "ccmn",   Kind::CondCompare { imm: false }),
    form!(b"s11_11010010_mmmmm_cccc_00_nnnnn_0_ffff",       "ccmp",   Kind::CondCompare { imm: false }),
    form!(b"s01_11010010_iiiii_cccc_10_nnnnn_0_ffff",       "ccmn",   Kind::CondCompare { imm: true }),
    form!(b"s11_11010010_iiiii_cccc_10_nnnnn_0_ffff",       "ccmp",   Kind::CondCompare { imm: true }),
    form!(b"s00_11010100_mmmmm_cccc_00_nnnnn_ddddd",        "csel",   Kind::CondSelect),
    form!(b"s00_11010100_mmmmm_cccc_01_nnnnn_ddddd",        "csinc",  Kind::CondSelect),
    form!(b"s10_11010100_mmmmm_cccc_00_nnnnn_ddddd",        "csinv",  Kind::CondSelect),
    form!(b"s10_11010100_mmmmm_cccc_01_nnnnn_ddddd",        "csneg",  Kind::CondSelect),
    form!(b"s00_11010110_mmmmm_000010_nnnnn_ddddd",         "udiv",   Kind::TwoSource),
    form!(b"s00_11010110_mmmmm_000011_nnnnn_ddddd",         "sdiv",   Kind::TwoSource),
    form!(b"s00_11010110_mmmmm_001000_nnnnn_ddddd",         "lsl",    Kind::TwoSource),
    form!(b"s00_11010110_mmmmm_001001_nnnnn_ddddd",         "lsr",    Kind::TwoSource),
    form!(b"s00_11010110_mmmmm_001010_nnnnn_ddddd",         "asr",    Kind::TwoSource),
    form!(b"s00_11010110_mmmmm_001011_nnnnn_ddddd",         "ror",    Kind::TwoSource),
    form!(b"s10_11010110_00000_000000_nnnnn_ddddd",         "rbit",   Kind::OneSource),
    form!(b"s10_11010110_00000_000001_nnnnn_ddddd",         "rev16",  Kind::OneSource),
    form!(b"010_11010110_00000_000010_nnnnn_ddddd",         "rev",    Kind::OneSource),
    form!(b"110_11010110_00000_000010_nnnnn_ddddd",         "rev32",  Kind::OneSource),
    form!(b"110_11010110_00000_000011_nnnnn_ddddd",         "rev",    Kind::OneSource),
    form!(b"s10_11010110_00000_000100_nnnnn_ddddd",         "clz",    Kind::OneSource),
    form!(b"s10_11010110_00000_000101_nnnnn_ddddd",         "cls",    Kind::OneSource),
    form!(b"s00_11011_000_mmmmm_0_aaaaa_nnnnn_ddddd",       "madd",   Kind::ThreeSource { long: false }),
    form!(b"s00_11011_000_mmmmm_1_aaaaa_nnnnn_ddddd",       "msub",   Kind::ThreeSource { long: false }),
    form!(b"100_11011_001_mmmmm_0_aaaaa_nnnnn_ddddd",       "smaddl", Kind::ThreeSource { long: true }),
    form!(b"100_11011_001_mmmmm_1_aaaaa_nnnnn_ddddd",       "smsubl", Kind::ThreeSource { long: true }),
    form!(b"100_11011_010_mmmmm_0_aaaaa_nnnnn_ddddd",       "smulh",  Kind::ThreeSource { long: false }),
    form!(b"100_11011_101_mmmmm_0_aaaaa_nnnnn_ddddd",       "umaddl", Kind::ThreeSource { long: true }),
    form!(b"100_11011_101_mmmmm_1_aaaaa_nnnnn_ddddd",       "umsubl", Kind::ThreeSource { long: true }),
    form!(b"100_11011_110_mmmmm_0_aaaaa_nnnnn_ddddd",       "umulh",  Kind::ThreeSource { long: false }),
];

const SHIFTS: [&str; 4] = ["lsl", "lsr", "asr", "ror"];
const EXTENDS: [&str; 8] = ["uxtb", "uxth", "uxtw", "uxtx", "sxtb", "sxth", "sxtw", "sxtx"];

/// Alias used when the accumulator of a 3-source multiply is the zero
/// register.
fn multiply_alias(mnemonic: &str) -> Option<&'static str> {
    Some(match mnemonic {
        "madd" => "mul",
        "msub" => "mneg",
        "smaddl" => "smull",
        "smsubl" => "smnegl",
        "umaddl" => "umull",
        "umsubl" => "umnegl",
        _ => return None,
    })
}

pub(super) fn render(form: &Form<Kind>, _word: u32, _address: u64, b: &mut Builder) -> Option<()> {
    let sf = b.field("sf", 31, 1) == 1;
    let zr = |id| Register::arm64_zr(id, sf);

    match form.kind {
        Kind::Logical => {
            let shift = b.field("shift", 22, 2);
            let rm = b.field("rm", 16, 5);
            let imm6 = b.field("imm6", 10, 6);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            if !sf && imm6 >= 32 {
                return None;
            }
            match form.mnemonic {
                "orr" if rn == 31 && shift == 0 && imm6 == 0 => {
                    b.mnemonic("mov");
                    b.reg(zr(rd));
                }
                "orn" if rn == 31 => {
                    b.mnemonic("mvn");
                    b.reg(zr(rd));
                }
                "ands" if rd == 31 => {
                    b.mnemonic("tst");
                    b.reg(zr(rn));
                }
                _ => {
                    b.mnemonic(form.mnemonic);
                    b.reg(zr(rd));
                    b.reg(zr(rn));
                }
            }
            b.reg(zr(rm));
            b.shift(SHIFTS[shift as usize], imm6);
        }
        Kind::AddSubShifted => {
            let shift = b.field("shift", 22, 2);
            let rm = b.field("rm", 16, 5);
            let imm6 = b.field("imm6", 10, 6);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            if shift == 3 || (!sf && imm6 >= 32) {
                return None;
            }
            let flags = form.mnemonic.ends_with('s');
            let sub = form.mnemonic.starts_with("sub");
            if flags && rd == 31 {
                b.mnemonic(if sub { "cmp" } else { "cmn" });
                b.reg(zr(rn));
            } else if sub && rn == 31 {
                b.mnemonic(if flags { "negs" } else { "neg" });
                b.reg(zr(rd));
            } else {
                b.mnemonic(form.mnemonic);
                b.reg(zr(rd));
                b.reg(zr(rn));
            }
            b.reg(zr(rm));
            b.shift(SHIFTS[shift as usize], imm6);
        }
        Kind::AddSubExtended => {
            let rm = b.field("rm", 16, 5);
            let option = b.field("option", 13, 3);
            let imm3 = b.field("imm3", 10, 3);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            if imm3 > 4 {
                return None;
            }
            let flags = form.mnemonic.ends_with('s');
            let sub = form.mnemonic.starts_with("sub");
            let src = Register::arm64_sp(rn, sf);
            if flags && rd == 31 {
                b.mnemonic(if sub { "cmp" } else { "cmn" });
                b.reg(src);
            } else {
                b.mnemonic(form.mnemonic);
                let dest = if flags {
                    zr(rd)
                } else {
                    Register::arm64_sp(rd, sf)
                };
                b.reg(dest);
                b.reg(src);
            }
            b.reg(Register::arm64_zr(rm, sf && option & 3 == 3));

            let uses_sp = rn == 31 || (!flags && rd == 31);
            let lsl_option = if sf { 0b011 } else { 0b010 };
            if uses_sp && option == lsl_option {
                b.shift("lsl", imm3);
            } else if imm3 == 0 {
                b.text(EXTENDS[option as usize]);
            } else {
                b.text(&format!("{} #{}", EXTENDS[option as usize], imm3));
            }
        }
        Kind::Carry => {
            let rm = b.field("rm", 16, 5);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            if form.mnemonic.starts_with("sbc") && rn == 31 {
                b.mnemonic(if form.mnemonic == "sbcs" { "ngcs" } else { "ngc" });
                b.reg(zr(rd));
            } else {
                b.mnemonic(form.mnemonic);
                b.reg(zr(rd));
                b.reg(zr(rn));
            }
            b.reg(zr(rm));
        }
        Kind::CondCompare { imm } => {
            let second = b.field(if imm { "imm5" } else { "rm" }, 16, 5);
            let cond = Condition::from_bits(b.field("cond", 12, 4));
            let rn = b.field("rn", 5, 5);
            let nzcv = b.field("nzcv", 0, 4);
            b.mnemonic(form.mnemonic);
            b.reg(zr(rn));
            if imm {
                b.imm(u64::from(second));
            } else {
                b.reg(zr(second));
            }
            b.imm(u64::from(nzcv));
            b.condition(cond);
        }
        Kind::CondSelect => {
            let rm = b.field("rm", 16, 5);
            let cond = Condition::from_bits(b.field("cond", 12, 4));
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            let invertible = !matches!(cond, Condition::Always | Condition::Never);

            if form.mnemonic != "csel" && invertible && rn == rm {
                let alias = match (form.mnemonic, rn == 31) {
                    ("csinc", true) => "cset",
                    ("csinv", true) => "csetm",
                    ("csinc", false) => "cinc",
                    ("csinv", false) => "cinv",
                    _ => "cneg",
                };
                b.mnemonic(alias);
                b.reg(zr(rd));
                if !matches!(alias, "cset" | "csetm") {
                    b.reg(zr(rn));
                }
                b.condition(cond.inverse());
            } else {
                b.mnemonic(form.mnemonic);
                b.reg(zr(rd));
                b.reg(zr(rn));
                b.reg(zr(rm));
                b.condition(cond);
            }
        }
        Kind::TwoSource => {
            let rm = b.field("rm", 16, 5);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            b.mnemonic(form.mnemonic);
            b.reg(zr(rd));
            b.reg(zr(rn));
            b.reg(zr(rm));
        }
        Kind::OneSource => {
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            b.mnemonic(form.mnemonic);
            b.reg(zr(rd));
            b.reg(zr(rn));
        }
        Kind::ThreeSource { long } => {
            let rm = b.field("rm", 16, 5);
            let ra = b.field("ra", 10, 5);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            let source = |id| Register::arm64_zr(id, !long);
            let alias = if ra == 31 {
                multiply_alias(form.mnemonic)
            } else {
                None
            };
            b.mnemonic(alias.unwrap_or(form.mnemonic));
            b.reg(zr(rd));
            b.reg(source(rn));
            b.reg(source(rm));
            let high_half = matches!(form.mnemonic, "smulh" | "umulh");
            if alias.is_none() && !high_half {
                b.reg(zr(ra));
            }
        }
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use crate::arm64::Arm64Disassembler;
    use mnemo_core::Condition;

    fn text(word: u32) -> String {
        Arm64Disassembler::new().disassemble(word, 0x1000).unwrap().text
    }

    #[test]
    fn test_logical_shifted() {
        assert_eq!(text(0xAA01_03E0), "mov x0, x1");
        assert_eq!(text(0x0A02_0C20), "and w0, w1, w2, lsl #3");
        assert_eq!(text(0x2A21_03E0), "mvn w0, w1");
        assert_eq!(text(0xEA01_001F), "tst x0, x1");
    }

    #[test]
    fn test_add_sub_shifted() {
        assert_eq!(text(0x8B02_0020), "add x0, x1, x2");
        assert_eq!(text(0xCB02_1020), "sub x0, x1, x2, lsl #4");
        assert_eq!(text(0xEB01_001F), "cmp x0, x1");
        assert_eq!(text(0xCB01_03E0), "neg x0, x1");
        // shift=0b11 is reserved.
        assert_eq!(text(0x8BC2_0020), ".long 0x8bc20020");
    }

    #[test]
    fn test_add_sub_extended() {
        assert_eq!(text(0x8B21_4BE0), "add x0, sp, w1, uxtw #2");
        assert_eq!(text(0x8B21_63FF), "add sp, sp, x1");
    }

    #[test]
    fn test_carry() {
        assert_eq!(text(0x9A02_0020), "adc x0, x1, x2");
        assert_eq!(text(0x5A01_03E0), "ngc w0, w1");
    }

    #[test]
    fn test_conditional_select_aliases() {
        assert_eq!(text(0x9A82_0020), "csel x0, x1, x2, eq");
        assert_eq!(text(0x1A9F_07E0), "cset w0, ne");
        assert_eq!(text(0x9A81_A420), "cinc x0, x1, lt");
        assert_eq!(text(0x5A81_5420), "cneg w0, w1, mi");

        let insn = Arm64Disassembler::new()
            .disassemble(0x1A9F_07E0, 0)
            .unwrap();
        assert_eq!(insn.condition, Some(Condition::NotEqual));
    }

    #[test]
    fn test_conditional_compare() {
        assert_eq!(text(0xFA41_1004), "ccmp x0, x1, #0x4, ne");
        assert_eq!(text(0x3A43_0800), "ccmn w0, #0x3, #0x0, eq");
    }

    #[test]
    fn test_two_and_one_source() {
        assert_eq!(text(0x1AC2_0820), "udiv w0, w1, w2");
        assert_eq!(text(0x9AC2_2020), "lsl x0, x1, x2");
        assert_eq!(text(0x5AC0_0020), "rbit w0, w1");
        assert_eq!(text(0xDAC0_0C20), "rev x0, x1");
        assert_eq!(text(0x5AC0_0820), "rev w0, w1");
        assert_eq!(text(0xDAC0_0820), "rev32 x0, x1");
        assert_eq!(text(0xDAC0_1020), "clz x0, x1");
    }

    #[test]
    fn test_three_source() {
        assert_eq!(text(0x9B02_7C20), "mul x0, x1, x2");
        assert_eq!(text(0x1B02_0C20), "madd w0, w1, w2, w3");
        assert_eq!(text(0x9B22_7C20), "smull x0, w1, w2");
        assert_eq!(text(0x9BC2_7C20), "umulh x0, x1, x2");
    }
}
