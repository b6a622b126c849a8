//! Branches, exception generation and system instructions.

use crate::table::{form, Form};
use mnemo_core::bits::sign_extend64;
use mnemo_core::{Condition, Register};

use super::decoder::Builder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
    Branch,
    BranchCond,
    CompareBranch,
    TestBranch,
    Exception,
    Hint,
    Barrier,
    SystemMove,
    BranchRegister,
    Fixed,
}

#[rustfmt::skip]
pub(super) static FORMS: &[Form<Kind>] = &[
    form!(b"000101_iiiiiiiiiiiiiiiiiiiiiiiiii",          "b",     Kind::Branch),
    form!(b"100101_iiiiiiiiiiiiiiiiiiiiiiiiii",          "bl",    Kind::Branch),
    form!(b"01010100_iiiiiiiiiiiiiiiiiii_0_cccc",        "b",     Kind::BranchCond),
    form!(b"s0110100_iiiiiiiiiiiiiiiiiii_ttttt",         "cbz",   Kind::CompareBranch),
    form!(b"s0110101_iiiiiiiiiiiiiiiiiii_ttttt",         "cbnz",  Kind::CompareBranch),
    form!(b"b0110110_bbbbb_iiiiiiiiiiiiii_ttttt",        "tbz",   Kind::TestBranch),
    form!(b"b0110111_bbbbb_iiiiiiiiiiiiii_ttttt",        "tbnz",  Kind::TestBranch),
    form!(b"11010100_000_iiiiiiiiiiiiiiii_000_01",       "svc",   Kind::Exception),
    form!(b"11010100_000_iiiiiiiiiiiiiiii_000_10",       "hvc",   Kind::Exception),
    form!(b"11010100_000_iiiiiiiiiiiiiiii_000_11",       "smc",   Kind::Exception),
    form!(b"11010100_001_iiiiiiiiiiiiiiii_000_00",       "brk",   Kind::Exception),
    form!(b"11010100_010_iiiiiiiiiiiiiiii_000_00",       "hlt",   Kind::Exception),
    form!(b"11010101_00000011_0010_mmmm_ooo_11111",      "hint",  Kind::Hint),
    form!(b"11010101_00000011_0011_mmmm_010_11111",      "clrex", Kind::Barrier),
    form!(b"11010101_00000011_0011_mmmm_100_11111",      "dsb",   Kind::Barrier),
    form!(b"11010101_00000011_0011_mmmm_101_11111",      "dmb",   Kind::Barrier),
    form!(b"11010101_00000011_0011_mmmm_110_11111",      "isb",   Kind::Barrier),
    form!(b"1101010100_0_1_rrrrrrrrrrrrrrr_ttttt",       "msr",   Kind::SystemMove),
    form!(b"1101010100_1_1_rrrrrrrrrrrrrrr_ttttt",       "mrs",   Kind::SystemMove),
    form!(b"1101011_0000_11111_000000_nnnnn_00000",      "br",    Kind::BranchRegister),
    form!(b"1101011_0001_11111_000000_nnnnn_00000",      "blr",   Kind::BranchRegister),
    form!(b"1101011_0010_11111_000000_nnnnn_00000",      "ret",   Kind::BranchRegister),
    form!(b"1101011_0100_11111_000000_11111_00000",      "eret",  Kind::Fixed),
];

/// Packs a system register encoding the way bits 20:5 of MRS/MSR hold it.
const fn sysreg(op0: u32, op1: u32, crn: u32, crm: u32, op2: u32) -> u32 {
    (op0 << 14) | (op1 << 11) | (crn << 7) | (crm << 3) | op2
}

static SYSTEM_REGISTERS: &[(u32, &str)] = &[
    (sysreg(3, 0, 0, 0, 0), "midr_el1"),
    (sysreg(3, 0, 0, 0, 5), "mpidr_el1"),
    (sysreg(3, 0, 1, 0, 0), "sctlr_el1"),
    (sysreg(3, 0, 2, 0, 0), "ttbr0_el1"),
    (sysreg(3, 0, 2, 0, 1), "ttbr1_el1"),
    (sysreg(3, 0, 2, 0, 2), "tcr_el1"),
    (sysreg(3, 0, 4, 0, 0), "spsr_el1"),
    (sysreg(3, 0, 4, 0, 1), "elr_el1"),
    (sysreg(3, 0, 4, 1, 0), "sp_el0"),
    (sysreg(3, 0, 4, 2, 2), "currentel"),
    (sysreg(3, 0, 5, 2, 0), "esr_el1"),
    (sysreg(3, 0, 6, 0, 0), "far_el1"),
    (sysreg(3, 0, 12, 0, 0), "vbar_el1"),
    (sysreg(3, 0, 13, 0, 4), "tpidr_el1"),
    (sysreg(3, 3, 0, 0, 1), "ctr_el0"),
    (sysreg(3, 3, 0, 0, 7), "dczid_el0"),
    (sysreg(3, 3, 4, 2, 0), "nzcv"),
    (sysreg(3, 3, 4, 2, 1), "daif"),
    (sysreg(3, 3, 4, 4, 0), "fpcr"),
    (sysreg(3, 3, 4, 4, 1), "fpsr"),
    (sysreg(3, 3, 13, 0, 2), "tpidr_el0"),
    (sysreg(3, 3, 13, 0, 3), "tpidrro_el0"),
    (sysreg(3, 3, 14, 0, 0), "cntfrq_el0"),
    (sysreg(3, 3, 14, 0, 2), "cntvct_el0"),
];

fn system_register_name(key: u32) -> String {
    match SYSTEM_REGISTERS.iter().find(|&&(k, _)| k == key) {
        Some(&(_, name)) => name.to_string(),
        None => format!(
            "s{}_{}_c{}_c{}_{}",
            key >> 14,
            (key >> 11) & 7,
            (key >> 7) & 0xF,
            (key >> 3) & 0xF,
            key & 7
        ),
    }
}

fn barrier_option(crm: u32) -> Option<&'static str> {
    Some(match crm {
        15 => "sy",
        14 => "st",
        13 => "ld",
        11 => "ish",
        10 => "ishst",
        9 => "ishld",
        7 => "nsh",
        6 => "nshst",
        5 => "nshld",
        3 => "osh",
        2 => "oshst",
        1 => "oshld",
        _ => return None,
    })
}

pub(super) fn render(form: &Form<Kind>, _word: u32, address: u64, b: &mut Builder) -> Option<()> {
    match form.kind {
        Kind::Branch => {
            let imm26 = b.field("imm26", 0, 26);
            let offset = sign_extend64(u64::from(imm26) << 2, 28);
            b.mnemonic(form.mnemonic);
            b.target(address, address.wrapping_add(offset as u64));
        }
        Kind::BranchCond => {
            let imm19 = b.field("imm19", 5, 19);
            let cond = Condition::from_bits(b.field("cond", 0, 4));
            let offset = sign_extend64(u64::from(imm19) << 2, 21);
            b.cond_mnemonic(form.mnemonic, cond);
            b.target(address, address.wrapping_add(offset as u64));
        }
        Kind::CompareBranch => {
            let sf = b.field("sf", 31, 1) == 1;
            let imm19 = b.field("imm19", 5, 19);
            let rt = b.field("rt", 0, 5);
            let offset = sign_extend64(u64::from(imm19) << 2, 21);
            b.mnemonic(form.mnemonic);
            b.reg(Register::arm64_zr(rt, sf));
            b.target(address, address.wrapping_add(offset as u64));
        }
        Kind::TestBranch => {
            let b5 = b.field("b5", 31, 1);
            let b40 = b.field("b40", 19, 5);
            let imm14 = b.field("imm14", 5, 14);
            let rt = b.field("rt", 0, 5);
            let offset = sign_extend64(u64::from(imm14) << 2, 16);
            b.mnemonic(form.mnemonic);
            b.reg(Register::arm64_zr(rt, b5 == 1));
            b.imm(u64::from((b5 << 5) | b40));
            b.target(address, address.wrapping_add(offset as u64));
        }
        Kind::Exception => {
            let imm16 = b.field("imm16", 5, 16);
            b.mnemonic(form.mnemonic);
            b.imm(u64::from(imm16));
        }
        Kind::Hint => {
            let crm = b.field("crm", 8, 4);
            let op2 = b.field("op2", 5, 3);
            match (crm << 3) | op2 {
                0 => b.mnemonic("nop"),
                1 => b.mnemonic("yield"),
                2 => b.mnemonic("wfe"),
                3 => b.mnemonic("wfi"),
                4 => b.mnemonic("sev"),
                5 => b.mnemonic("sevl"),
                imm => {
                    b.mnemonic("hint");
                    b.imm(u64::from(imm));
                }
            }
        }
        Kind::Barrier => {
            let crm = b.field("crm", 8, 4);
            b.mnemonic(form.mnemonic);
            match form.mnemonic {
                "isb" | "clrex" if crm == 15 => {}
                "dsb" | "dmb" => match barrier_option(crm) {
                    Some(option) => b.text(option),
                    None => b.imm(u64::from(crm)),
                },
                _ => b.imm(u64::from(crm)),
            }
        }
        Kind::SystemMove => {
            let key = b.field("sysreg", 5, 16);
            let rt = b.field("rt", 0, 5);
            let name = system_register_name(key);
            b.mnemonic(form.mnemonic);
            if form.mnemonic == "mrs" {
                b.reg(Register::arm64_zr(rt, true));
                b.text(&name);
            } else {
                b.text(&name);
                b.reg(Register::arm64_zr(rt, true));
            }
        }
        Kind::BranchRegister => {
            let rn = b.field("rn", 5, 5);
            b.mnemonic(form.mnemonic);
            if !(form.mnemonic == "ret" && rn == 30) {
                b.reg(Register::arm64_zr(rn, true));
            }
        }
        Kind::Fixed => b.mnemonic(form.mnemonic),
    }
    Some(())
}
