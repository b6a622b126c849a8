//! Scalar floating point.

use crate::table::{form, Form};
use mnemo_core::{Condition, Register};

use super::decoder::Builder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
    OneSource,
    Convert,
    TwoSource,
    Compare,
    MoveImmediate,
    CondSelect,
    ToInteger,
    FromInteger,
    MoveToGeneral,
    MoveFromGeneral,
    ThreeSource,
}

#[rustfmt::skip]
pub(super) static FORMS: &[Form<Kind>] = &[
    form!(b"000_11110_tt_1_000000_10000_nnnnn_ddddd",   "fmov",    Kind::OneSource),
    form!(b"000_11110_tt_1_000001_10000_nnnnn_ddddd",   "fabs",    Kind::OneSource),
    form!(b"000_11110_tt_1_000010_10000_nnnnn_ddddd",   "fneg",    Kind::OneSource),
    form!(b"000_11110_tt_1_000011_10000_nnnnn_ddddd",   "fsqrt",   Kind::OneSource),
    form!(b"000_11110_tt_1_0001oo_10000_nnnnn_ddddd",   "fcvt",    Kind::Convert),
    form!(b"000_11110_tt_1_001000_10000_nnnnn_ddddd",   "frintn",  Kind::OneSource),
    form!(b"000_11110_tt_1_001001_10000_nnnnn_ddddd",   "frintp",  Kind::OneSource),
    form!(b"000_11110_tt_1_001010_10000_nnnnn_ddddd",   "frintm",  Kind::OneSource),
    form!(b"000_11110_tt_1_001011_10000_nnnnn_ddddd",   "frintz",  Kind::OneSource),
    form!(b"000_11110_tt_1_001100_10000_nnnnn_ddddd",   "frinta",  Kind::OneSource),
    form!(b"000_11110_tt_1_001110_10000_nnnnn_ddddd",   "frintx",  Kind::OneSource),
    form!(b"000_11110_tt_1_001111_10000_nnnnn_ddddd",   "frinti",  Kind::OneSource),
    form!(b"000_11110_tt_1_mmmmm_0000_10_nnnnn_ddddd",  "fmul",    Kind::TwoSource),
    form!(b"000_11110_tt_1_mmmmm_0001_10_nnnnn_ddddd",  "fdiv",    Kind::TwoSource),
    form!(b"000_11110_tt_1_mmmmm_0010_10_nnnnn_ddddd",  "fadd",    Kind::TwoSource),
    form!(b"000_11110_tt_1_mmmmm_0011_10_nnnnn_ddddd",  "fsub",    Kind::TwoSource),
    form!(b"000_11110_tt_1_mmmmm_0100_10_nnnnn_ddddd",  "fmax",    Kind::TwoSource),
    form!(b"000_11110_tt_1_mmmmm_0101_10_nnnnn_ddddd",  "fmin",    Kind::TwoSource),
    form!(b"000_11110_tt_1_mmmmm_0110_10_nnnnn_ddddd",  "fmaxnm",  Kind::TwoSource),
    form!(b"000_11110_tt_1_mmmmm_0111_10_nnnnn_ddddd",  "fminnm",  Kind::TwoSource),
    form!(b"000_11110_tt_1_mmmmm_1000_10_nnnnn_ddddd",  "fnmul",   Kind::TwoSource),
    form!(b"000_11110_tt_1_mmmmm_001000_nnnnn_0z000",   "fcmp",    Kind::Compare),
    form!(b"000_11110_tt_1_mmmmm_001000_nnnnn_1z000",   "fcmpe",   Kind::Compare),
    form!(b"000_11110_tt_1_iiiiiiii_100_00000_ddddd",   "fmov",    Kind::MoveImmediate),
    form!(b"000_11110_tt_1_mmmmm_cccc_11_nnnnn_ddddd",  "fcsel",   Kind::CondSelect),
    form!(b"s00_11110_tt_1_00_000_000000_nnnnn_ddddd",  "fcvtns",  Kind::ToInteger),
    form!(b"s00_11110_tt_1_00_001_000000_nnnnn_ddddd",  "fcvtnu",  Kind::ToInteger),
    form!(b"s00_11110_tt_1_00_010_000000_nnnnn_ddddd",  "scvtf",   Kind::FromInteger),
    form!(b"s00_11110_tt_1_00_011_000000_nnnnn_ddddd",  "ucvtf",   Kind::FromInteger),
    form!(b"s00_11110_tt_1_00_100_000000_nnnnn_ddddd",  "fcvtas",  Kind::ToInteger),
    form!(b"s00_11110_tt_1_00_101_000000_nnnnn_ddddd",  "fcvtau",  Kind::ToInteger),
    form!(b"s00_11110_tt_1_00_110_000000_nnnnn_ddddd",  "fmov",    Kind::MoveToGeneral),
    form!(b"s00_11110_tt_1_00_111_000000_nnnnn_ddddd",  "fmov",    Kind::MoveFromGeneral),
    form!(b"s00_11110_tt_1_01_000_000000_nnnnn_ddddd",  "fcvtps",  Kind::ToInteger),
    form!(b"s00_11110_tt_1_01_001_000000_nnnnn_ddddd",  "fcvtpu",  Kind::ToInteger),
    form!(b"s00_11110_tt_1_10_000_000000_nnnnn_ddddd",  "fcvtms",  Kind::ToInteger),
    form!(b"s00_11110_tt_1_10_001_000000_nnnnn_ddddd",  "fcvtmu",  Kind::ToInteger),
    form!(b"s00_11110_tt_1_11_000_000000_nnnnn_ddddd",  "fcvtzs",  Kind::ToInteger),
    form!(b"s00_11110_tt_1_11_001_000000_nnnnn_ddddd",  "fcvtzu",  Kind::ToInteger),
    form!(b"000_11111_tt_0_mmmmm_0_aaaaa_nnnnn_ddddd",  "fmadd",   Kind::ThreeSource),
    form!(b"000_11111_tt_0_mmmmm_1_aaaaa_nnnnn_ddddd",  "fmsub",   Kind::ThreeSource),
    form!(b"000_11111_tt_1_mmmmm_0_aaaaa_nnnnn_ddddd",  "fnmadd",  Kind::ThreeSource),
    form!(b"000_11111_tt_1_mmmmm_1_aaaaa_nnnnn_ddddd",  "fnmsub",  Kind::ThreeSource),
];

/// Register width in bits selected by the `type` field.
fn fp_bits(ftype: u32) -> Option<u16> {
    match ftype {
        0b00 => Some(32),
        0b01 => Some(64),
        0b11 => Some(16),
        _ => None,
    }
}

/// Expands the 8-bit `fmov` immediate (`a:bcd:efgh`) to its value.
pub(super) fn expand_fp_imm(imm8: u32) -> f64 {
    let sign = if imm8 & 0x80 != 0 { -1.0 } else { 1.0 };
    let b = (imm8 >> 6) & 1;
    let cd = ((imm8 >> 4) & 3) as i32;
    let exponent = if b == 1 { cd - 3 } else { cd + 1 };
    let fraction = f64::from(imm8 & 0xF);
    sign * (1.0 + fraction / 16.0) * 2f64.powi(exponent)
}

pub(super) fn render(form: &Form<Kind>, _word: u32, _address: u64, b: &mut Builder) -> Option<()> {
    let ftype = b.field("type", 22, 2);
    let bits = fp_bits(ftype)?;
    let fp = |id| Register::arm64_fp(id, bits);

    match form.kind {
        Kind::OneSource => {
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            b.mnemonic(form.mnemonic);
            b.reg(fp(rd));
            b.reg(fp(rn));
        }
        Kind::Convert => {
            let opc = b.field("opc", 15, 2);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            if opc == ftype {
                return None;
            }
            let dest_bits = fp_bits(opc)?;
            b.mnemonic(form.mnemonic);
            b.reg(Register::arm64_fp(rd, dest_bits));
            b.reg(fp(rn));
        }
        Kind::TwoSource => {
            let rm = b.field("rm", 16, 5);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            b.mnemonic(form.mnemonic);
            b.reg(fp(rd));
            b.reg(fp(rn));
            b.reg(fp(rm));
        }
        Kind::Compare => {
            let rm = b.field("rm", 16, 5);
            let rn = b.field("rn", 5, 5);
            let zero = b.field("zero", 3, 1) == 1;
            b.mnemonic(form.mnemonic);
            b.reg(fp(rn));
            if zero {
                b.text("#0.0");
            } else {
                b.reg(fp(rm));
            }
        }
        Kind::MoveImmediate => {
            let imm8 = b.field("imm8", 13, 8);
            let rd = b.field("rd", 0, 5);
            b.mnemonic(form.mnemonic);
            b.reg(fp(rd));
            b.text(&format!("#{:?}", expand_fp_imm(imm8)));
        }
        Kind::CondSelect => {
            let rm = b.field("rm", 16, 5);
            let cond = Condition::from_bits(b.field("cond", 12, 4));
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            b.mnemonic(form.mnemonic);
            b.reg(fp(rd));
            b.reg(fp(rn));
            b.reg(fp(rm));
            b.condition(cond);
        }
        Kind::ToInteger | Kind::MoveToGeneral | Kind::FromInteger | Kind::MoveFromGeneral => {
            let sf = b.field("sf", 31, 1) == 1;
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            let is_move = matches!(form.kind, Kind::MoveToGeneral | Kind::MoveFromGeneral);
            if is_move && bits != 16 && (bits == 64) != sf {
                return None;
            }
            let gpr = |id| Register::arm64_zr(id, sf);
            b.mnemonic(form.mnemonic);
            if matches!(form.kind, Kind::ToInteger | Kind::MoveToGeneral) {
                b.reg(gpr(rd));
                b.reg(fp(rn));
            } else {
                b.reg(fp(rd));
                b.reg(gpr(rn));
            }
        }
        Kind::ThreeSource => {
            let rm = b.field("rm", 16, 5);
            let ra = b.field("ra", 10, 5);
            let rn = b.field("rn", 5, 5);
            let rd = b.field("rd", 0, 5);
            b.mnemonic(form.mnemonic);
            b.reg(fp(rd));
            b.reg(fp(rn));
            b.reg(fp(rm));
            b.reg(fp(ra));
        }
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::expand_fp_imm;
    use crate::arm64::Arm64Disassembler;

    fn text(word: u32) -> String {
        Arm64Disassembler::new().disassemble(word, 0x1000).unwrap().text
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(text(0x1E22_2820), "fadd s0, s1, s2");
        assert_eq!(text(0x1E62_0820), "fmul d0, d1, d2");
        assert_eq!(text(0x1E61_C020), "fsqrt d0, d1");
        assert_eq!(text(0x1E20_4020), "fmov s0, s1");
    }

    #[test]
    fn test_precision_conversion() {
        assert_eq!(text(0x1E22_C020), "fcvt d0, s1");
        // Converting to the same precision is unallocated.
        assert_eq!(text(0x1E22_4020), ".long 0x1e224020");
    }

    #[test]
    fn test_compare() {
        assert_eq!(text(0x1E21_2000), "fcmp s0, s1");
        assert_eq!(text(0x1E60_2008), "fcmp d0, #0.0");
        assert_eq!(text(0x1E22_2030), "fcmpe s1, s2");
    }

    #[test]
    fn test_move_immediate() {
        assert_eq!(text(0x1E6E_1000), "fmov d0, #1.0");
        assert_eq!(text(0x1E30_9000), "fmov s0, #-2.5");
        assert_eq!(expand_fp_imm(0x00), 2.0);
        assert_eq!(expand_fp_imm(0x70), 1.0);
        assert_eq!(expand_fp_imm(0x40), 0.125);
        assert_eq!(expand_fp_imm(0x60), 0.5);
    }

    #[test]
    fn test_select_and_fused() {
        assert_eq!(text(0x1E62_CC20), "fcsel d0, d1, d2, gt");
        assert_eq!(text(0x1F42_0C20), "fmadd d0, d1, d2, d3");
        assert_eq!(text(0x1F22_8C20), "fnmsub s0, s1, s2, s3");
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(text(0x1E62_0020), "scvtf d0, w1");
        assert_eq!(text(0x9E78_0020), "fcvtzs x0, d1");
        assert_eq!(text(0x9E66_0020), "fmov x0, d1");
        assert_eq!(text(0x1E27_0020), "fmov s0, w1");
        // fmov between a 32-bit register and a double is unallocated.
        assert_eq!(text(0x1E66_0020), ".long 0x1e660020");
    }
}
