//! 32-bit Thumb2 encodings.
//!
//! Words hold the first halfword in bits 31:16 and the second in 15:0, so
//! patterns read in memory order.

use super::format::{pc_relative, Line, Offset, SHIFT_NAMES};
use crate::table::{form, lookup, Form};
use mnemo_core::bits::{bit, field, gather, sign_extend};
use mnemo_core::register::arm::PC;
use mnemo_core::{Condition, IndexMode};

const PC_REG: u32 = PC as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    BranchLink,
    BranchLinkExchange,
    Branch,
    CondBranch,
    Hint,
    Barrier,
    Mrs,
    Msr,
    Udf,
    PushPop,
    Multiple,
    TableBranch { half: bool },
    LoadExclusive,
    StoreExclusive,
    Dual,
    DataShifted,
    CompareShifted,
    MoveShifted,
    DataImm,
    CompareImm,
    MoveImm,
    PlainImm,
    Adr { add: bool },
    MoveWide,
    BitfieldExtract,
    BitfieldInsert,
    BitfieldClear,
    Literal,
    MemImm12,
    MemImm8,
    MemReg,
    Single,
    Reg2,
    Reg3,
    /// `rd, rn, rm, ra`
    Accumulate,
    /// `rdlo, rdhi, rn, rm`
    Long,
    Extend,
}

#[rustfmt::skip]
static FORMS: &[Form<Kind>] = &[
    form!(b"1111_0011_1010_1111_1000_0000_0000_0000", "nop.w", Kind::Hint),
    form!(b"1111_0011_1010_1111_1000_0000_0000_0001", "yield.w", Kind::Hint),
    form!(b"1111_0011_1010_1111_1000_0000_0000_0010", "wfe.w", Kind::Hint),
    form!(b"1111_0011_1010_1111_1000_0000_0000_0011", "wfi.w", Kind::Hint),
    form!(b"1111_0011_1010_1111_1000_0000_0000_0100", "sev.w", Kind::Hint),
    form!(b"1111_0011_1011_1111_1000_1111_0010_1111", "clrex", Kind::Hint),
    form!(b"1111_0011_1011_1111_1000_1111_0100_oooo", "dsb", Kind::Barrier),
    form!(b"1111_0011_1011_1111_1000_1111_0101_oooo", "dmb", Kind::Barrier),
    form!(b"1111_0011_1011_1111_1000_1111_0110_oooo", "isb", Kind::Barrier),
    form!(b"1111_0011_1110_1111_1000_dddd_ssss_ssss", "mrs", Kind::Mrs),
    form!(b"1111_0011_1000_nnnn_1000_mm00_ssss_ssss", "msr", Kind::Msr),
    form!(b"1111_0111_1111_iiii_1010_iiii_iiii_iiii", "udf.w", Kind::Udf),

    form!(b"1111_0sii_iiii_iiii_11j1_kiii_iiii_iiii", "bl", Kind::BranchLink),
    form!(b"1111_0sii_iiii_iiii_11j0_kiii_iiii_iii0", "blx", Kind::BranchLinkExchange),
    form!(b"1111_0sii_iiii_iiii_10j1_kiii_iiii_iiii", "b.w", Kind::Branch),
    form!(b"1111_0scc_ccii_iiii_10j0_kiii_iiii_iiii", "b.w", Kind::CondBranch),

    form!(b"1110_1001_0010_1101_0m0l_llll_llll_llll", "push.w", Kind::PushPop),
    form!(b"1110_1000_1011_1101_pm0l_llll_llll_llll", "pop.w", Kind::PushPop),
    form!(b"1110_1000_10w1_nnnn_pm0l_llll_llll_llll", "ldmia.w", Kind::Multiple),
    form!(b"1110_1000_10w0_nnnn_0m0l_llll_llll_llll", "stmia.w", Kind::Multiple),
    form!(b"1110_1001_00w1_nnnn_pm0l_llll_llll_llll", "ldmdb", Kind::Multiple),
    form!(b"1110_1001_00w0_nnnn_0m0l_llll_llll_llll", "stmdb", Kind::Multiple),

    form!(b"1110_1000_1101_nnnn_1111_0000_0000_mmmm", "tbb", Kind::TableBranch { half: false }),
    form!(b"1110_1000_1101_nnnn_1111_0000_0001_mmmm", "tbh", Kind::TableBranch { half: true }),
    form!(b"1110_1000_0101_nnnn_tttt_1111_iiii_iiii", "ldrex", Kind::LoadExclusive),
    form!(b"1110_1000_0100_nnnn_tttt_dddd_iiii_iiii", "strex", Kind::StoreExclusive),
    form!(b"1110_100p_u1w1_nnnn_tttt_TTTT_iiii_iiii", "ldrd", Kind::Dual),
    form!(b"1110_100p_u1w0_nnnn_tttt_TTTT_iiii_iiii", "strd", Kind::Dual),

    form!(b"1110_1010_0001_nnnn_0iii_1111_iitt_mmmm", "tst.w", Kind::CompareShifted),
    form!(b"1110_1010_1001_nnnn_0iii_1111_iitt_mmmm", "teq", Kind::CompareShifted),
    form!(b"1110_1011_0001_nnnn_0iii_1111_iitt_mmmm", "cmn.w", Kind::CompareShifted),
    form!(b"1110_1011_1011_nnnn_0iii_1111_iitt_mmmm", "cmp.w", Kind::CompareShifted),
    form!(b"1110_1010_010s_1111_0iii_dddd_iitt_mmmm", "mov.w", Kind::MoveShifted),
    form!(b"1110_1010_011s_1111_0iii_dddd_iitt_mmmm", "mvn.w", Kind::MoveShifted),
    form!(b"1110_1010_000s_nnnn_0iii_dddd_iitt_mmmm", "and.w", Kind::DataShifted),
    form!(b"1110_1010_001s_nnnn_0iii_dddd_iitt_mmmm", "bic.w", Kind::DataShifted),
    form!(b"1110_1010_010s_nnnn_0iii_dddd_iitt_mmmm", "orr.w", Kind::DataShifted),
    form!(b"1110_1010_011s_nnnn_0iii_dddd_iitt_mmmm", "orn", Kind::DataShifted),
    form!(b"1110_1010_100s_nnnn_0iii_dddd_iitt_mmmm", "eor.w", Kind::DataShifted),
    form!(b"1110_1011_000s_nnnn_0iii_dddd_iitt_mmmm", "add.w", Kind::DataShifted),
    form!(b"1110_1011_010s_nnnn_0iii_dddd_iitt_mmmm", "adc.w", Kind::DataShifted),
    form!(b"1110_1011_011s_nnnn_0iii_dddd_iitt_mmmm", "sbc.w", Kind::DataShifted),
    form!(b"1110_1011_101s_nnnn_0iii_dddd_iitt_mmmm", "sub.w", Kind::DataShifted),
    form!(b"1110_1011_110s_nnnn_0iii_dddd_iitt_mmmm", "rsb.w", Kind::DataShifted),

    form!(b"1111_0i00_0001_nnnn_0iii_1111_iiii_iiii", "tst.w", Kind::CompareImm),
    form!(b"1111_0i00_1001_nnnn_0iii_1111_iiii_iiii", "teq", Kind::CompareImm),
    form!(b"1111_0i01_0001_nnnn_0iii_1111_iiii_iiii", "cmn.w", Kind::CompareImm),
    form!(b"1111_0i01_1011_nnnn_0iii_1111_iiii_iiii", "cmp.w", Kind::CompareImm),
    form!(b"1111_0i00_010s_1111_0iii_dddd_iiii_iiii", "mov.w", Kind::MoveImm),
    form!(b"1111_0i00_011s_1111_0iii_dddd_iiii_iiii", "mvn.w", Kind::MoveImm),
    form!(b"1111_0i00_000s_nnnn_0iii_dddd_iiii_iiii", "and.w", Kind::DataImm),
    form!(b"1111_0i00_001s_nnnn_0iii_dddd_iiii_iiii", "bic.w", Kind::DataImm),
    form!(b"1111_0i00_010s_nnnn_0iii_dddd_iiii_iiii", "orr.w", Kind::DataImm),
    form!(b"1111_0i00_011s_nnnn_0iii_dddd_iiii_iiii", "orn", Kind::DataImm),
    form!(b"1111_0i00_100s_nnnn_0iii_dddd_iiii_iiii", "eor.w", Kind::DataImm),
    form!(b"1111_0i01_000s_nnnn_0iii_dddd_iiii_iiii", "add.w", Kind::DataImm),
    form!(b"1111_0i01_010s_nnnn_0iii_dddd_iiii_iiii", "adc.w", Kind::DataImm),
    form!(b"1111_0i01_011s_nnnn_0iii_dddd_iiii_iiii", "sbc.w", Kind::DataImm),
    form!(b"1111_0i01_101s_nnnn_0iii_dddd_iiii_iiii", "sub.w", Kind::DataImm),
    form!(b"1111_0i01_110s_nnnn_0iii_dddd_iiii_iiii", "rsb.w", Kind::DataImm),

    form!(b"1111_0i10_0000_1111_0iii_dddd_iiii_iiii", "adr.w", Kind::Adr { add: true }),
    form!(b"1111_0i10_1010_1111_0iii_dddd_iiii_iiii", "adr.w", Kind::Adr { add: false }),
    form!(b"1111_0i10_0000_nnnn_0iii_dddd_iiii_iiii", "addw", Kind::PlainImm),
    form!(b"1111_0i10_1010_nnnn_0iii_dddd_iiii_iiii", "subw", Kind::PlainImm),
    form!(b"1111_0i10_0100_iiii_0iii_dddd_iiii_iiii", "movw", Kind::MoveWide),
    form!(b"1111_0i10_1100_iiii_0iii_dddd_iiii_iiii", "movt", Kind::MoveWide),
    form!(b"1111_0011_0100_nnnn_0iii_dddd_ii0w_wwww", "sbfx", Kind::BitfieldExtract),
    form!(b"1111_0011_1100_nnnn_0iii_dddd_ii0w_wwww", "ubfx", Kind::BitfieldExtract),
    form!(b"1111_0011_0110_1111_0iii_dddd_ii0m_mmmm", "bfc", Kind::BitfieldClear),
    form!(b"1111_0011_0110_nnnn_0iii_dddd_ii0m_mmmm", "bfi", Kind::BitfieldInsert),

    form!(b"1111_1000_u101_1111_tttt_iiii_iiii_iiii", "ldr.w", Kind::Literal),
    form!(b"1111_1000_u001_1111_tttt_iiii_iiii_iiii", "ldrb.w", Kind::Literal),
    form!(b"1111_1000_u011_1111_tttt_iiii_iiii_iiii", "ldrh.w", Kind::Literal),
    form!(b"1111_1001_u001_1111_tttt_iiii_iiii_iiii", "ldrsb.w", Kind::Literal),
    form!(b"1111_1001_u011_1111_tttt_iiii_iiii_iiii", "ldrsh.w", Kind::Literal),
    form!(b"1111_1000_0101_1101_tttt_1011_0000_0100", "pop.w", Kind::Single),
    form!(b"1111_1000_0100_1101_tttt_1101_0000_0100", "push.w", Kind::Single),
    form!(b"1111_1000_1101_nnnn_tttt_iiii_iiii_iiii", "ldr.w", Kind::MemImm12),
    form!(b"1111_1000_1100_nnnn_tttt_iiii_iiii_iiii", "str.w", Kind::MemImm12),
    form!(b"1111_1000_1001_nnnn_tttt_iiii_iiii_iiii", "ldrb.w", Kind::MemImm12),
    form!(b"1111_1000_1000_nnnn_tttt_iiii_iiii_iiii", "strb.w", Kind::MemImm12),
    form!(b"1111_1000_1011_nnnn_tttt_iiii_iiii_iiii", "ldrh.w", Kind::MemImm12),
    form!(b"1111_1000_1010_nnnn_tttt_iiii_iiii_iiii", "strh.w", Kind::MemImm12),
    form!(b"1111_1001_1001_nnnn_tttt_iiii_iiii_iiii", "ldrsb.w", Kind::MemImm12),
    form!(b"1111_1001_1011_nnnn_tttt_iiii_iiii_iiii", "ldrsh.w", Kind::MemImm12),
    form!(b"1111_1000_0101_nnnn_tttt_0000_00ii_mmmm", "ldr.w", Kind::MemReg),
    form!(b"1111_1000_0100_nnnn_tttt_0000_00ii_mmmm", "str.w", Kind::MemReg),
    form!(b"1111_1000_0001_nnnn_tttt_0000_00ii_mmmm", "ldrb.w", Kind::MemReg),
    form!(b"1111_1000_0000_nnnn_tttt_0000_00ii_mmmm", "strb.w", Kind::MemReg),
    form!(b"1111_1000_0011_nnnn_tttt_0000_00ii_mmmm", "ldrh.w", Kind::MemReg),
    form!(b"1111_1000_0010_nnnn_tttt_0000_00ii_mmmm", "strh.w", Kind::MemReg),
    form!(b"1111_1001_0001_nnnn_tttt_0000_00ii_mmmm", "ldrsb.w", Kind::MemReg),
    form!(b"1111_1001_0011_nnnn_tttt_0000_00ii_mmmm", "ldrsh.w", Kind::MemReg),
    form!(b"1111_1000_0101_nnnn_tttt_1puw_iiii_iiii", "ldr", Kind::MemImm8),
    form!(b"1111_1000_0100_nnnn_tttt_1puw_iiii_iiii", "str", Kind::MemImm8),
    form!(b"1111_1000_0001_nnnn_tttt_1puw_iiii_iiii", "ldrb", Kind::MemImm8),
    form!(b"1111_1000_0000_nnnn_tttt_1puw_iiii_iiii", "strb", Kind::MemImm8),
    form!(b"1111_1000_0011_nnnn_tttt_1puw_iiii_iiii", "ldrh", Kind::MemImm8),
    form!(b"1111_1000_0010_nnnn_tttt_1puw_iiii_iiii", "strh", Kind::MemImm8),
    form!(b"1111_1001_0001_nnnn_tttt_1puw_iiii_iiii", "ldrsb", Kind::MemImm8),
    form!(b"1111_1001_0011_nnnn_tttt_1puw_iiii_iiii", "ldrsh", Kind::MemImm8),

    form!(b"1111_1010_000s_nnnn_1111_dddd_0000_mmmm", "lsl.w", Kind::Reg3),
    form!(b"1111_1010_001s_nnnn_1111_dddd_0000_mmmm", "lsr.w", Kind::Reg3),
    form!(b"1111_1010_010s_nnnn_1111_dddd_0000_mmmm", "asr.w", Kind::Reg3),
    form!(b"1111_1010_011s_nnnn_1111_dddd_0000_mmmm", "ror.w", Kind::Reg3),
    form!(b"1111_1010_0000_1111_1111_dddd_10rr_mmmm", "sxth.w", Kind::Extend),
    form!(b"1111_1010_0001_1111_1111_dddd_10rr_mmmm", "uxth.w", Kind::Extend),
    form!(b"1111_1010_0100_1111_1111_dddd_10rr_mmmm", "sxtb.w", Kind::Extend),
    form!(b"1111_1010_0101_1111_1111_dddd_10rr_mmmm", "uxtb.w", Kind::Extend),
    form!(b"1111_1010_1001_mmmm_1111_dddd_1000_mmmm", "rev.w", Kind::Reg2),
    form!(b"1111_1010_1001_mmmm_1111_dddd_1001_mmmm", "rev16.w", Kind::Reg2),
    form!(b"1111_1010_1001_mmmm_1111_dddd_1010_mmmm", "rbit", Kind::Reg2),
    form!(b"1111_1010_1001_mmmm_1111_dddd_1011_mmmm", "revsh.w", Kind::Reg2),
    form!(b"1111_1010_1011_mmmm_1111_dddd_1000_mmmm", "clz", Kind::Reg2),

    form!(b"1111_1011_0000_nnnn_1111_dddd_0000_mmmm", "mul.w", Kind::Reg3),
    form!(b"1111_1011_0000_nnnn_aaaa_dddd_0000_mmmm", "mla", Kind::Accumulate),
    form!(b"1111_1011_0000_nnnn_aaaa_dddd_0001_mmmm", "mls", Kind::Accumulate),
    form!(b"1111_1011_1001_nnnn_1111_dddd_1111_mmmm", "sdiv", Kind::Reg3),
    form!(b"1111_1011_1011_nnnn_1111_dddd_1111_mmmm", "udiv", Kind::Reg3),
    form!(b"1111_1011_1000_nnnn_llll_hhhh_0000_mmmm", "smull", Kind::Long),
    form!(b"1111_1011_1010_nnnn_llll_hhhh_0000_mmmm", "umull", Kind::Long),
    form!(b"1111_1011_1100_nnnn_llll_hhhh_0000_mmmm", "smlal", Kind::Long),
    form!(b"1111_1011_1110_nnnn_llll_hhhh_0000_mmmm", "umlal", Kind::Long),
];

/// Fields of one 32-bit instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fields {
    Branch { offset: i32, exchange: bool },
    CondBranch { cond: Condition, offset: i32 },
    None,
    Barrier { option: u32 },
    Mrs { rd: u32, sysm: u32 },
    Msr { rn: u32, sysm: u32 },
    Imm { imm: u32 },
    List { base: Option<(u32, bool)>, list: u32 },
    TableBranch { rn: u32, rm: u32, half: bool },
    Exclusive { status: Option<u32>, rt: u32, rn: u32, offset: u32 },
    Dual { rt: u32, rt2: u32, rn: u32, offset: Offset, mode: IndexMode },
    Shifted {
        rd: Option<u32>,
        rn: Option<u32>,
        rm: u32,
        shift: u32,
        amount: u32,
        flags: bool,
    },
    Immediate {
        rd: Option<u32>,
        rn: Option<u32>,
        imm: u32,
        flags: bool,
    },
    Adr { rd: u32, offset: u32, add: bool },
    Bitfield { rd: u32, rn: Option<u32>, lsb: u32, width: u32 },
    Literal { rt: u32, offset: u32, add: bool, size: u32 },
    Mem {
        rt: u32,
        rn: u32,
        offset: Offset,
        mode: IndexMode,
        unprivileged: bool,
    },
    Single { rt: u32 },
    Regs { regs: [u32; 4], count: usize },
    Extend { rd: u32, rm: u32, rotation: u32 },
}

fn rn(w: u32) -> u32 {
    field(w, 16, 4)
}

fn rt(w: u32) -> u32 {
    field(w, 12, 4)
}

fn rd(w: u32) -> u32 {
    field(w, 8, 4)
}

fn rm(w: u32) -> u32 {
    field(w, 0, 4)
}

/// `i:imm3:imm8`
fn imm12(w: u32) -> u32 {
    gather(w, &[(0, 8, 0), (12, 3, 8), (26, 1, 11)])
}

/// Expands a modified immediate: a byte replicated across the word, or an
/// 8-bit value with its top bit set rotated right.
fn expand_imm(imm12: u32) -> u32 {
    let imm8 = imm12 & 0xFF;
    if imm12 >> 10 == 0 {
        match (imm12 >> 8) & 3 {
            0 => imm8,
            1 => (imm8 << 16) | imm8,
            2 => (imm8 << 24) | (imm8 << 8),
            _ => imm8 * 0x0101_0101,
        }
    } else {
        (0x80 | (imm12 & 0x7F)).rotate_right(imm12 >> 7)
    }
}

/// `S:I1:I2:imm10:imm11:0`, with `I = !(J ^ S)`.
fn branch_offset(w: u32) -> i32 {
    let s = field(w, 26, 1);
    let i1 = !(field(w, 13, 1) ^ s) & 1;
    let i2 = !(field(w, 11, 1) ^ s) & 1;
    let imm = (s << 24) | (i1 << 23) | (i2 << 22) | (field(w, 16, 10) << 12) | (field(w, 0, 11) << 1);
    sign_extend(imm, 25)
}

impl Kind {
    fn extract(self, w: u32) -> Option<Fields> {
        let flags = bit(w, 20);
        let shifted = |rd: Option<u32>, rn: Option<u32>, flags: bool| Fields::Shifted {
            rd,
            rn,
            rm: rm(w),
            shift: field(w, 4, 2),
            amount: gather(w, &[(6, 2, 0), (12, 3, 2)]),
            flags,
        };
        let fields = match self {
            Self::BranchLink | Self::Branch => Fields::Branch {
                offset: branch_offset(w),
                exchange: false,
            },
            Self::BranchLinkExchange => Fields::Branch {
                offset: branch_offset(w),
                exchange: true,
            },
            Self::CondBranch => {
                let cond = field(w, 22, 4);
                if cond >= 0b1110 {
                    return None;
                }
                let imm = gather(w, &[(0, 11, 1), (16, 6, 12), (13, 1, 18), (11, 1, 19), (26, 1, 20)]);
                Fields::CondBranch {
                    cond: Condition::from_bits(cond),
                    offset: sign_extend(imm, 21),
                }
            }
            Self::Hint => Fields::None,
            Self::Barrier => Fields::Barrier {
                option: field(w, 0, 4),
            },
            Self::Mrs => Fields::Mrs {
                rd: rd(w),
                sysm: field(w, 0, 8),
            },
            Self::Msr => Fields::Msr {
                rn: rn(w),
                sysm: field(w, 0, 8),
            },
            Self::Udf => Fields::Imm {
                imm: gather(w, &[(0, 12, 0), (16, 4, 12)]),
            },
            Self::PushPop => Fields::List {
                base: None,
                list: field(w, 0, 16),
            },
            Self::Multiple => Fields::List {
                base: Some((rn(w), bit(w, 21))),
                list: field(w, 0, 16),
            },
            Self::TableBranch { half } => Fields::TableBranch {
                rn: rn(w),
                rm: rm(w),
                half,
            },
            Self::LoadExclusive => Fields::Exclusive {
                status: None,
                rt: rt(w),
                rn: rn(w),
                offset: field(w, 0, 8) << 2,
            },
            Self::StoreExclusive => Fields::Exclusive {
                status: Some(rd(w)),
                rt: rt(w),
                rn: rn(w),
                offset: field(w, 0, 8) << 2,
            },
            Self::Dual => {
                let mode = match (bit(w, 24), bit(w, 21)) {
                    (true, false) => IndexMode::Offset,
                    (true, true) => IndexMode::PreIndex,
                    (false, true) => IndexMode::PostIndex,
                    (false, false) => return None,
                };
                Fields::Dual {
                    rt: rt(w),
                    rt2: rd(w),
                    rn: rn(w),
                    offset: Offset::Imm {
                        value: field(w, 0, 8) << 2,
                        add: bit(w, 23),
                    },
                    mode,
                }
            }
            Self::DataShifted => shifted(Some(rd(w)), Some(rn(w)), flags),
            Self::CompareShifted => shifted(None, Some(rn(w)), false),
            Self::MoveShifted => shifted(Some(rd(w)), None, flags),
            Self::DataImm | Self::CompareImm | Self::MoveImm => Fields::Immediate {
                rd: (self != Self::CompareImm).then(|| rd(w)),
                rn: (self != Self::MoveImm).then(|| rn(w)),
                imm: expand_imm(imm12(w)),
                flags: flags && self != Self::CompareImm,
            },
            Self::PlainImm => Fields::Immediate {
                rd: Some(rd(w)),
                rn: Some(rn(w)),
                imm: imm12(w),
                flags: false,
            },
            Self::Adr { add } => Fields::Adr {
                rd: rd(w),
                offset: imm12(w),
                add,
            },
            Self::MoveWide => Fields::Immediate {
                rd: Some(rd(w)),
                rn: None,
                imm: gather(w, &[(0, 8, 0), (12, 3, 8), (26, 1, 11), (16, 4, 12)]),
                flags: false,
            },
            Self::BitfieldExtract => Fields::Bitfield {
                rd: rd(w),
                rn: Some(rn(w)),
                lsb: gather(w, &[(6, 2, 0), (12, 3, 2)]),
                width: field(w, 0, 5) + 1,
            },
            Self::BitfieldInsert | Self::BitfieldClear => {
                let lsb = gather(w, &[(6, 2, 0), (12, 3, 2)]);
                let msb = field(w, 0, 5);
                if msb < lsb {
                    return None;
                }
                Fields::Bitfield {
                    rd: rd(w),
                    rn: (self == Self::BitfieldInsert).then(|| rn(w)),
                    lsb,
                    width: msb - lsb + 1,
                }
            }
            Self::Literal => Fields::Literal {
                rt: rt(w),
                offset: field(w, 0, 12),
                add: bit(w, 23),
                size: 1 << field(w, 21, 2),
            },
            Self::MemImm12 => Fields::Mem {
                rt: rt(w),
                rn: rn(w),
                offset: Offset::Imm {
                    value: field(w, 0, 12),
                    add: true,
                },
                mode: IndexMode::Offset,
                unprivileged: false,
            },
            Self::MemImm8 => {
                let (mode, unprivileged) = match (bit(w, 10), bit(w, 9), bit(w, 8)) {
                    (true, true, false) => (IndexMode::Offset, true),
                    (true, _, false) => (IndexMode::Offset, false),
                    (true, _, true) => (IndexMode::PreIndex, false),
                    (false, _, true) => (IndexMode::PostIndex, false),
                    (false, _, false) => return None,
                };
                Fields::Mem {
                    rt: rt(w),
                    rn: rn(w),
                    offset: Offset::Imm {
                        value: field(w, 0, 8),
                        add: bit(w, 9),
                    },
                    mode,
                    unprivileged,
                }
            }
            Self::MemReg => Fields::Mem {
                rt: rt(w),
                rn: rn(w),
                offset: Offset::Reg {
                    rm: rm(w),
                    add: true,
                    shift: 0,
                    amount: field(w, 4, 2),
                },
                mode: IndexMode::Offset,
                unprivileged: false,
            },
            Self::Single => Fields::Single { rt: rt(w) },
            Self::Reg2 => Fields::Regs {
                regs: [rd(w), rm(w), 0, 0],
                count: 2,
            },
            Self::Reg3 => Fields::Regs {
                regs: [rd(w), rn(w), rm(w), 0],
                count: 3,
            },
            Self::Accumulate => Fields::Regs {
                regs: [rd(w), rn(w), rm(w), rt(w)],
                count: 4,
            },
            Self::Long => Fields::Regs {
                regs: [rt(w), rd(w), rn(w), rm(w)],
                count: 4,
            },
            Self::Extend => Fields::Extend {
                rd: rd(w),
                rm: rm(w),
                rotation: field(w, 4, 2) * 8,
            },
        };
        Some(fields)
    }
}

/// Decodes a 32-bit instruction (first halfword in bits 31:16).
///
/// `cond` is the IT slot condition. Returns `None` for encodings without
/// a form.
pub(super) fn decode(word: u32, address: u32, cond: Option<Condition>) -> Option<Line> {
    let form = lookup(FORMS, word)?;
    let fields = form.kind.extract(word)?;
    let pc = address.wrapping_add(4);
    let mut line = Line::new();
    render(&mut line, form.kind, form.mnemonic, fields, pc, cond);
    Some(line)
}

fn render(
    line: &mut Line,
    kind: Kind,
    mnemonic: &str,
    fields: Fields,
    pc: u32,
    cond: Option<Condition>,
) {
    if let Fields::CondBranch {
        cond: branch_cond,
        offset,
    } = fields
    {
        line.mnemonic(mnemonic, false, Some(branch_cond));
        line.branch(pc.wrapping_add(offset as u32));
        return;
    }

    match fields {
        Fields::Shifted {
            rd: Some(rd),
            rn: None,
            rm,
            shift,
            amount,
            flags,
        } if kind == Kind::MoveShifted && mnemonic == "mov.w" && (shift, amount) != (0, 0) => {
            // mov with a shift is written as the shift itself.
            if shift == 3 && amount == 0 {
                line.mnemonic("rrx", flags, cond);
                line.reg(rd);
                line.reg(rm);
            } else {
                let name = format!("{}.w", SHIFT_NAMES[shift as usize]);
                line.mnemonic(&name, flags, cond);
                line.reg(rd);
                line.reg(rm);
                let amount = if amount == 0 { 32 } else { amount };
                line.imm(i64::from(amount));
            }
            line.flow = rd == PC_REG;
            return;
        }
        Fields::Shifted { flags, .. } | Fields::Immediate { flags, .. } => {
            line.mnemonic(mnemonic, flags, cond)
        }
        Fields::Mem {
            unprivileged: true,
            ..
        } => line.mnemonic(&format!("{}t", mnemonic), false, cond),
        _ => line.mnemonic(mnemonic, false, cond),
    }

    match fields {
        Fields::Branch { offset, exchange } => {
            let base = if exchange { pc & !3 } else { pc };
            line.branch(base.wrapping_add(offset as u32));
        }
        Fields::Barrier { option } => match barrier_name(option) {
            Some(name) => line.operand(format_args!("{}", name)),
            None => line.imm(i64::from(option)),
        },
        Fields::Mrs { rd, sysm } => {
            line.reg(rd);
            line.operand(format_args!("{}", SysReg(sysm)));
        }
        Fields::Msr { rn, sysm } => {
            line.operand(format_args!("{}", SysReg(sysm)));
            line.reg(rn);
        }
        Fields::Imm { imm } => line.imm(i64::from(imm)),
        Fields::List { base, list } => {
            if let Some((rn, writeback)) = base {
                line.reg(rn);
                if writeback {
                    line.suffix("!");
                }
            }
            line.reglist(list);
            line.flow = list & (1 << PC_REG) != 0;
        }
        Fields::TableBranch { rn, rm, half } => {
            line.mem(
                rn,
                Offset::Reg {
                    rm,
                    add: true,
                    shift: 0,
                    amount: u32::from(half),
                },
                IndexMode::Offset,
            );
            line.flow = true;
        }
        Fields::Exclusive {
            status,
            rt,
            rn,
            offset,
        } => {
            if let Some(rd) = status {
                line.reg(rd);
            }
            line.reg(rt);
            line.mem(rn, Offset::Imm { value: offset, add: true }, IndexMode::Offset);
        }
        Fields::Dual {
            rt,
            rt2,
            rn,
            offset,
            mode,
        } => {
            line.reg(rt);
            line.reg(rt2);
            line.mem(rn, offset, mode);
        }
        Fields::Shifted {
            rd,
            rn,
            rm,
            shift,
            amount,
            ..
        } => {
            for r in [rd, rn].into_iter().flatten() {
                line.reg(r);
            }
            line.reg(rm);
            line.shift(shift, amount);
            line.flow = rd == Some(PC_REG);
        }
        Fields::Immediate { rd, rn, imm, .. } => {
            for r in [rd, rn].into_iter().flatten() {
                line.reg(r);
            }
            line.imm(i64::from(imm));
        }
        Fields::Adr { rd, offset, add } => {
            line.reg(rd);
            line.address(pc_relative(pc, offset, add));
        }
        Fields::Bitfield { rd, rn, lsb, width } => {
            line.reg(rd);
            if let Some(rn) = rn {
                line.reg(rn);
            }
            line.imm(i64::from(lsb));
            line.imm(i64::from(width));
        }
        Fields::Literal {
            rt,
            offset,
            add,
            size,
        } => {
            line.reg(rt);
            line.literal(offset, add, pc_relative(pc, offset, add), size);
            line.flow = rt == PC_REG;
        }
        Fields::Mem {
            rt,
            rn,
            offset,
            mode,
            ..
        } => {
            line.reg(rt);
            line.mem(rn, offset, mode);
            line.flow = rt == PC_REG && mnemonic.starts_with("ldr");
        }
        Fields::Single { rt } => {
            line.reglist(1 << rt);
            line.flow = rt == PC_REG && mnemonic.starts_with("pop");
        }
        Fields::Regs { regs, count } => {
            for &r in &regs[..count] {
                line.reg(r);
            }
        }
        Fields::Extend { rd, rm, rotation } => {
            line.reg(rd);
            line.reg(rm);
            if rotation != 0 {
                line.operand(format_args!("ror #{}", rotation));
            }
        }
        Fields::None | Fields::CondBranch { .. } => {}
    }
}

fn barrier_name(option: u32) -> Option<&'static str> {
    Some(match option {
        0b1111 => "sy",
        0b1110 => "st",
        0b1101 => "ld",
        0b1011 => "ish",
        0b1010 => "ishst",
        0b1001 => "ishld",
        0b0111 => "nsh",
        0b0110 => "nshst",
        0b0101 => "nshld",
        0b0011 => "osh",
        0b0010 => "oshst",
        0b0001 => "oshld",
        _ => return None,
    })
}

/// M-profile special register for `mrs`/`msr`.
struct SysReg(u32);

impl std::fmt::Display for SysReg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.0 {
            0 => "apsr",
            1 => "iapsr",
            2 => "eapsr",
            3 => "xpsr",
            5 => "ipsr",
            6 => "epsr",
            7 => "iepsr",
            8 => "msp",
            9 => "psp",
            10 => "msplim",
            11 => "psplim",
            16 => "primask",
            17 => "basepri",
            18 => "basepri_max",
            19 => "faultmask",
            20 => "control",
            other => return write!(f, "sysm{}", other),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::format::Target;

    fn text(word: u32) -> String {
        text_at(word, 0x1000, None)
    }

    fn text_at(word: u32, address: u32, cond: Option<Condition>) -> String {
        decode(word, address, cond)
            .map(|line| line.text.into_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_branch_offsets() {
        assert_eq!(text(0xF000_F800), "bl 0x1004");
        assert_eq!(text(0xF7FF_FFFE), "bl 0x1000");
        assert_eq!(text(0xF43F_AFFE), "beq.w 0x1000");
        // blx targets are computed from the word-aligned PC.
        assert_eq!(text_at(0xF000_E802, 0x1002, None), "blx 0x1008");
        assert!(decode(0xF000_F800, 0, None).unwrap().flow);
    }

    #[test]
    fn test_system() {
        assert_eq!(text(0xF3AF_8000), "nop.w");
        assert_eq!(text(0xF3BF_8F5B), "dmb ish");
        assert_eq!(text(0xF3BF_8F4F), "dsb sy");
        assert_eq!(text(0xF3BF_8F6F), "isb sy");
        assert_eq!(text(0xF3EF_8010), "mrs r0, primask");
        assert_eq!(text(0xF380_8810), "msr primask, r0");
        assert_eq!(text(0xF7F0_A000), "udf.w #0");
    }

    #[test]
    fn test_multiple() {
        assert_eq!(
            text(0xE92D_4FF0),
            "push.w {r4, r5, r6, r7, r8, r9, r10, r11, lr}"
        );
        let line = decode(0xE8BD_8FF0, 0, None).unwrap();
        assert_eq!(
            line.text.as_str(),
            "pop.w {r4, r5, r6, r7, r8, r9, r10, r11, pc}"
        );
        assert!(line.flow);
        assert_eq!(text(0xE8B0_0006), "ldmia.w r0!, {r1, r2}");
        assert_eq!(text(0xE900_0006), "stmdb r0, {r1, r2}");
    }

    #[test]
    fn test_table_branch_and_exclusive() {
        assert_eq!(text(0xE8D0_F001), "tbb [r0, r1]");
        assert_eq!(text(0xE8D0_F011), "tbh [r0, r1, lsl #1]");
        assert!(decode(0xE8D0_F001, 0, None).unwrap().flow);
        assert_eq!(text(0xE851_0F00), "ldrex r0, [r1]");
        assert_eq!(text(0xE841_0200), "strex r2, r0, [r1]");
        assert_eq!(text(0xE9D2_0102), "ldrd r0, r1, [r2, #8]");
        assert_eq!(text(0xE9E2_0102), "strd r0, r1, [r2, #8]!");
    }

    #[test]
    fn test_shifted_register() {
        assert_eq!(text(0xEB01_0082), "add.w r0, r1, r2, lsl #2");
        assert_eq!(text(0xEA4F_0001), "mov.w r0, r1");
        assert_eq!(text(0xEA4F_0081), "lsl.w r0, r1, #2");
        assert_eq!(text(0xEA5F_0031), "rrxs r0, r1");
        assert_eq!(text(0xEBB0_0F01), "cmp.w r0, r1");
        assert_eq!(text(0xEA10_0F01), "tst.w r0, r1");
    }

    #[test]
    fn test_modified_immediate() {
        assert_eq!(text(0xF04F_0001), "mov.w r0, #1");
        assert_eq!(text(0xF04F_4080), "mov.w r0, #1073741824");
        assert_eq!(text(0xF101_0001), "add.w r0, r1, #1");
        assert_eq!(text(0xF111_0001), "adds.w r0, r1, #1");
        assert_eq!(text(0xF1B0_0F01), "cmp.w r0, #1");
        assert_eq!(expand_imm(0x1AB), 0x00AB_00AB);
        assert_eq!(expand_imm(0x2AB), 0xAB00_AB00);
        assert_eq!(expand_imm(0x3AB), 0xABAB_ABAB);
    }

    #[test]
    fn test_plain_immediate() {
        assert_eq!(text(0xF601_70FF), "addw r0, r1, #4095");
        assert_eq!(text(0xF241_2034), "movw r0, #4660");
        assert_eq!(text(0xF2C1_2034), "movt r0, #4660");
        assert_eq!(text(0xF20F_0004), "adr.w r0, 0x1008");
        assert_eq!(text(0xF341_1007), "sbfx r0, r1, #4, #8");
        assert_eq!(text(0xF361_100B), "bfi r0, r1, #4, #8");
        assert_eq!(text(0xF36F_100B), "bfc r0, #4, #8");
    }

    #[test]
    fn test_loads_and_stores() {
        assert_eq!(text(0xF8DF_0008), "ldr.w r0, [pc, #8]");
        assert_eq!(text(0xF85F_0008), "ldr.w r0, [pc, #-8]");
        assert_eq!(text(0xF8D1_0008), "ldr.w r0, [r1, #8]");
        assert_eq!(text(0xF851_0C04), "ldr r0, [r1, #-4]");
        assert_eq!(text(0xF851_0B04), "ldr r0, [r1], #4");
        assert_eq!(text(0xF851_0F04), "ldr r0, [r1, #4]!");
        assert_eq!(text(0xF851_0E04), "ldrt r0, [r1, #4]");
        assert_eq!(text(0xF851_0022), "ldr.w r0, [r1, r2, lsl #2]");
        assert_eq!(text(0xF85D_0B04), "pop.w {r0}");
        assert_eq!(text(0xF84D_0D04), "push.w {r0}");
        assert!(decode(0xF851_0804, 0, None).is_none());
    }

    #[test]
    fn test_literal_sizes() {
        let target = |word| decode(word, 0x1000, None).and_then(|line| line.target);
        assert_eq!(
            target(0xF8DF_0008),
            Some(Target::Literal {
                address: 0x100C,
                size: 4
            })
        );
        assert_eq!(
            target(0xF8BF_0008),
            Some(Target::Literal {
                address: 0x100C,
                size: 2
            })
        );
        assert_eq!(
            target(0xF99F_0008),
            Some(Target::Literal {
                address: 0x100C,
                size: 1
            })
        );
    }

    #[test]
    fn test_register_forms() {
        assert_eq!(text(0xFA01_F002), "lsl.w r0, r1, r2");
        assert_eq!(text(0xFA0F_F081), "sxth.w r0, r1");
        assert_eq!(text(0xFA0F_F091), "sxth.w r0, r1, ror #8");
        assert_eq!(text(0xFA91_F081), "rev.w r0, r1");
        assert_eq!(text(0xFAB1_F081), "clz r0, r1");
        assert_eq!(text(0xFB01_F002), "mul.w r0, r1, r2");
        assert_eq!(text(0xFB01_3002), "mla r0, r1, r2, r3");
        assert_eq!(text(0xFB82_0103), "smull r0, r1, r2, r3");
        assert_eq!(text(0xFB91_F0F2), "sdiv r0, r1, r2");
    }

    #[test]
    fn test_it_condition_suffix() {
        let ne = Some(Condition::NotEqual);
        assert_eq!(text_at(0xF101_0001, 0, ne), "addne.w r0, r1, #1");
        assert_eq!(text_at(0xF111_0001, 0, ne), "addsne.w r0, r1, #1");
    }
}
