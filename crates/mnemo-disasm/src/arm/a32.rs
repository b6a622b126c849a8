//! A32 (ARM state) encodings.
//!
//! Conditional forms leave the condition nibble out of their pattern; see
//! [`lookup_conditional`].

use std::fmt::Write;

use super::format::{pc_relative, Line, Offset, SHIFT_NAMES};
use crate::table::{form, lookup_conditional, Form};
use mnemo_core::bits::{bit, field, gather, sign_extend};
use mnemo_core::register::arm::{self, PC};
use mnemo_core::{Condition, IndexMode};

const PC_REG: u32 = PC as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// `op rd, rn, <operand2>` in one of three shapes.
    Data(Shape),
    Compare(Shape),
    Move(Shape),
    Adr { add: bool },
    MoveWide,
    Hint,
    Barrier,
    /// `mul`, `mla`, `mls`
    Multiply { accumulate: bool },
    MultiplyLong,
    Divide,
    Swap,
    LoadExclusive,
    StoreExclusive,
    /// `ldrh`-class immediate and register forms.
    ExtraImm,
    ExtraReg,
    Dual { register: bool },
    Literal { size: u32 },
    MemImm,
    MemReg,
    Single,
    BranchExchange,
    Clz,
    Mrs,
    MsrReg,
    MsrImm,
    Breakpoint,
    BitfieldExtract,
    BitfieldInsert,
    BitfieldClear,
    Reverse,
    Extend,
    Udf,
    PushPop,
    Multiple,
    Branch,
    BranchExchangeImm,
    Svc,
    Cdp,
    Transfer,
    CoprocMem,
    Preload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Imm,
    ShiftImm,
    ShiftReg,
}

#[rustfmt::skip]
static FORMS: &[Form<Kind>] = &[
    // Multiplies, swaps and exclusives live in the data-processing space
    // with bits 7:4 = 1001.
    form!(b"cccc_0000_000s_dddd_0000_mmmm_1001_nnnn", "mul", Kind::Multiply { accumulate: false }),
    form!(b"cccc_0000_001s_dddd_aaaa_mmmm_1001_nnnn", "mla", Kind::Multiply { accumulate: true }),
    form!(b"cccc_0000_0110_dddd_aaaa_mmmm_1001_nnnn", "mls", Kind::Multiply { accumulate: true }),
    form!(b"cccc_0000_100s_hhhh_llll_mmmm_1001_nnnn", "umull", Kind::MultiplyLong),
    form!(b"cccc_0000_101s_hhhh_llll_mmmm_1001_nnnn", "umlal", Kind::MultiplyLong),
    form!(b"cccc_0000_110s_hhhh_llll_mmmm_1001_nnnn", "smull", Kind::MultiplyLong),
    form!(b"cccc_0000_111s_hhhh_llll_mmmm_1001_nnnn", "smlal", Kind::MultiplyLong),
    form!(b"cccc_0001_0000_nnnn_tttt_0000_1001_mmmm", "swp", Kind::Swap),
    form!(b"cccc_0001_0100_nnnn_tttt_0000_1001_mmmm", "swpb", Kind::Swap),
    form!(b"cccc_0001_1001_nnnn_tttt_1111_1001_1111", "ldrex", Kind::LoadExclusive),
    form!(b"cccc_0001_1000_nnnn_dddd_1111_1001_tttt", "strex", Kind::StoreExclusive),

    form!(b"cccc_0001_u101_1111_tttt_iiii_1011_iiii", "ldrh", Kind::Literal { size: 2 }),
    form!(b"cccc_0001_u101_1111_tttt_iiii_1101_iiii", "ldrsb", Kind::Literal { size: 1 }),
    form!(b"cccc_0001_u101_1111_tttt_iiii_1111_iiii", "ldrsh", Kind::Literal { size: 2 }),
    form!(b"cccc_000p_u1w1_nnnn_tttt_iiii_1011_iiii", "ldrh", Kind::ExtraImm),
    form!(b"cccc_000p_u1w0_nnnn_tttt_iiii_1011_iiii", "strh", Kind::ExtraImm),
    form!(b"cccc_000p_u1w1_nnnn_tttt_iiii_1101_iiii", "ldrsb", Kind::ExtraImm),
    form!(b"cccc_000p_u1w1_nnnn_tttt_iiii_1111_iiii", "ldrsh", Kind::ExtraImm),
    form!(b"cccc_000p_u1w0_nnnn_tttt_iiii_1101_iiii", "ldrd", Kind::Dual { register: false }),
    form!(b"cccc_000p_u1w0_nnnn_tttt_iiii_1111_iiii", "strd", Kind::Dual { register: false }),
    form!(b"cccc_000p_u0w1_nnnn_tttt_0000_1011_mmmm", "ldrh", Kind::ExtraReg),
    form!(b"cccc_000p_u0w0_nnnn_tttt_0000_1011_mmmm", "strh", Kind::ExtraReg),
    form!(b"cccc_000p_u0w1_nnnn_tttt_0000_1101_mmmm", "ldrsb", Kind::ExtraReg),
    form!(b"cccc_000p_u0w1_nnnn_tttt_0000_1111_mmmm", "ldrsh", Kind::ExtraReg),
    form!(b"cccc_000p_u0w0_nnnn_tttt_0000_1101_mmmm", "ldrd", Kind::Dual { register: true }),
    form!(b"cccc_000p_u0w0_nnnn_tttt_0000_1111_mmmm", "strd", Kind::Dual { register: true }),

    form!(b"cccc_0001_0010_1111_1111_1111_0001_mmmm", "bx", Kind::BranchExchange),
    form!(b"cccc_0001_0010_1111_1111_1111_0011_mmmm", "blx", Kind::BranchExchange),
    form!(b"cccc_0001_0110_1111_dddd_1111_0001_mmmm", "clz", Kind::Clz),
    form!(b"cccc_0001_0r00_1111_dddd_0000_0000_0000", "mrs", Kind::Mrs),
    form!(b"cccc_0001_0r10_kkkk_1111_0000_0000_nnnn", "msr", Kind::MsrReg),
    form!(b"cccc_0001_0010_iiii_iiii_iiii_0111_iiii", "bkpt", Kind::Breakpoint),

    form!(b"cccc_0011_0010_0000_1111_0000_0000_0000", "nop", Kind::Hint),
    form!(b"cccc_0011_0010_0000_1111_0000_0000_0001", "yield", Kind::Hint),
    form!(b"cccc_0011_0010_0000_1111_0000_0000_0010", "wfe", Kind::Hint),
    form!(b"cccc_0011_0010_0000_1111_0000_0000_0011", "wfi", Kind::Hint),
    form!(b"cccc_0011_0010_0000_1111_0000_0000_0100", "sev", Kind::Hint),
    form!(b"cccc_0011_0r10_kkkk_1111_rrrr_iiii_iiii", "msr", Kind::MsrImm),
    form!(b"cccc_0011_0000_iiii_dddd_iiii_iiii_iiii", "movw", Kind::MoveWide),
    form!(b"cccc_0011_0100_iiii_dddd_iiii_iiii_iiii", "movt", Kind::MoveWide),
    form!(b"cccc_0010_1000_1111_dddd_rrrr_iiii_iiii", "adr", Kind::Adr { add: true }),
    form!(b"cccc_0010_0100_1111_dddd_rrrr_iiii_iiii", "adr", Kind::Adr { add: false }),

    form!(b"cccc_0000_000s_nnnn_dddd_iiii_itt0_mmmm", "and", Kind::Data(Shape::ShiftImm)),
    form!(b"cccc_0000_000s_nnnn_dddd_ssss_0tt1_mmmm", "and", Kind::Data(Shape::ShiftReg)),
    form!(b"cccc_0010_000s_nnnn_dddd_rrrr_iiii_iiii", "and", Kind::Data(Shape::Imm)),
    form!(b"cccc_0000_001s_nnnn_dddd_iiii_itt0_mmmm", "eor", Kind::Data(Shape::ShiftImm)),
    form!(b"cccc_0000_001s_nnnn_dddd_ssss_0tt1_mmmm", "eor", Kind::Data(Shape::ShiftReg)),
    form!(b"cccc_0010_001s_nnnn_dddd_rrrr_iiii_iiii", "eor", Kind::Data(Shape::Imm)),
    form!(b"cccc_0000_010s_nnnn_dddd_iiii_itt0_mmmm", "sub", Kind::Data(Shape::ShiftImm)),
    form!(b"cccc_0000_010s_nnnn_dddd_ssss_0tt1_mmmm", "sub", Kind::Data(Shape::ShiftReg)),
    form!(b"cccc_0010_010s_nnnn_dddd_rrrr_iiii_iiii", "sub", Kind::Data(Shape::Imm)),
    form!(b"cccc_0000_011s_nnnn_dddd_iiii_itt0_mmmm", "rsb", Kind::Data(Shape::ShiftImm)),
    form!(b"cccc_0000_011s_nnnn_dddd_ssss_0tt1_mmmm", "rsb", Kind::Data(Shape::ShiftReg)),
    form!(b"cccc_0010_011s_nnnn_dddd_rrrr_iiii_iiii", "rsb", Kind::Data(Shape::Imm)),
    form!(b"cccc_0000_100s_nnnn_dddd_iiii_itt0_mmmm", "add", Kind::Data(Shape::ShiftImm)),
    form!(b"cccc_0000_100s_nnnn_dddd_ssss_0tt1_mmmm", "add", Kind::Data(Shape::ShiftReg)),
    form!(b"cccc_0010_100s_nnnn_dddd_rrrr_iiii_iiii", "add", Kind::Data(Shape::Imm)),
    form!(b"cccc_0000_101s_nnnn_dddd_iiii_itt0_mmmm", "adc", Kind::Data(Shape::ShiftImm)),
    form!(b"cccc_0000_101s_nnnn_dddd_ssss_0tt1_mmmm", "adc", Kind::Data(Shape::ShiftReg)),
    form!(b"cccc_0010_101s_nnnn_dddd_rrrr_iiii_iiii", "adc", Kind::Data(Shape::Imm)),
    form!(b"cccc_0000_110s_nnnn_dddd_iiii_itt0_mmmm", "sbc", Kind::Data(Shape::ShiftImm)),
    form!(b"cccc_0000_110s_nnnn_dddd_ssss_0tt1_mmmm", "sbc", Kind::Data(Shape::ShiftReg)),
    form!(b"cccc_0010_110s_nnnn_dddd_rrrr_iiii_iiii", "sbc", Kind::Data(Shape::Imm)),
    form!(b"cccc_0000_111s_nnnn_dddd_iiii_itt0_mmmm", "rsc", Kind::Data(Shape::ShiftImm)),
    form!(b"cccc_0000_111s_nnnn_dddd_ssss_0tt1_mmmm", "rsc", Kind::Data(Shape::ShiftReg)),
    form!(b"cccc_0010_111s_nnnn_dddd_rrrr_iiii_iiii", "rsc", Kind::Data(Shape::Imm)),
    form!(b"cccc_0001_0001_nnnn_0000_iiii_itt0_mmmm", "tst", Kind::Compare(Shape::ShiftImm)),
    form!(b"cccc_0001_0001_nnnn_0000_ssss_0tt1_mmmm", "tst", Kind::Compare(Shape::ShiftReg)),
    form!(b"cccc_0011_0001_nnnn_0000_rrrr_iiii_iiii", "tst", Kind::Compare(Shape::Imm)),
    form!(b"cccc_0001_0011_nnnn_0000_iiii_itt0_mmmm", "teq", Kind::Compare(Shape::ShiftImm)),
    form!(b"cccc_0001_0011_nnnn_0000_ssss_0tt1_mmmm", "teq", Kind::Compare(Shape::ShiftReg)),
    form!(b"cccc_0011_0011_nnnn_0000_rrrr_iiii_iiii", "teq", Kind::Compare(Shape::Imm)),
    form!(b"cccc_0001_0101_nnnn_0000_iiii_itt0_mmmm", "cmp", Kind::Compare(Shape::ShiftImm)),
    form!(b"cccc_0001_0101_nnnn_0000_ssss_0tt1_mmmm", "cmp", Kind::Compare(Shape::ShiftReg)),
    form!(b"cccc_0011_0101_nnnn_0000_rrrr_iiii_iiii", "cmp", Kind::Compare(Shape::Imm)),
    form!(b"cccc_0001_0111_nnnn_0000_iiii_itt0_mmmm", "cmn", Kind::Compare(Shape::ShiftImm)),
    form!(b"cccc_0001_0111_nnnn_0000_ssss_0tt1_mmmm", "cmn", Kind::Compare(Shape::ShiftReg)),
    form!(b"cccc_0011_0111_nnnn_0000_rrrr_iiii_iiii", "cmn", Kind::Compare(Shape::Imm)),
    form!(b"cccc_0001_100s_nnnn_dddd_iiii_itt0_mmmm", "orr", Kind::Data(Shape::ShiftImm)),
    form!(b"cccc_0001_100s_nnnn_dddd_ssss_0tt1_mmmm", "orr", Kind::Data(Shape::ShiftReg)),
    form!(b"cccc_0011_100s_nnnn_dddd_rrrr_iiii_iiii", "orr", Kind::Data(Shape::Imm)),
    form!(b"cccc_0001_101s_0000_dddd_iiii_itt0_mmmm", "mov", Kind::Move(Shape::ShiftImm)),
    form!(b"cccc_0001_101s_0000_dddd_ssss_0tt1_mmmm", "mov", Kind::Move(Shape::ShiftReg)),
    form!(b"cccc_0011_101s_0000_dddd_rrrr_iiii_iiii", "mov", Kind::Move(Shape::Imm)),
    form!(b"cccc_0001_110s_nnnn_dddd_iiii_itt0_mmmm", "bic", Kind::Data(Shape::ShiftImm)),
    form!(b"cccc_0001_110s_nnnn_dddd_ssss_0tt1_mmmm", "bic", Kind::Data(Shape::ShiftReg)),
    form!(b"cccc_0011_110s_nnnn_dddd_rrrr_iiii_iiii", "bic", Kind::Data(Shape::Imm)),
    form!(b"cccc_0001_111s_0000_dddd_iiii_itt0_mmmm", "mvn", Kind::Move(Shape::ShiftImm)),
    form!(b"cccc_0001_111s_0000_dddd_ssss_0tt1_mmmm", "mvn", Kind::Move(Shape::ShiftReg)),
    form!(b"cccc_0011_111s_0000_dddd_rrrr_iiii_iiii", "mvn", Kind::Move(Shape::Imm)),

    form!(b"cccc_0100_1001_1101_tttt_0000_0000_0100", "pop", Kind::Single),
    form!(b"cccc_0101_0010_1101_tttt_0000_0000_0100", "push", Kind::Single),
    form!(b"cccc_0101_u001_1111_tttt_iiii_iiii_iiii", "ldr", Kind::Literal { size: 4 }),
    form!(b"cccc_0101_u101_1111_tttt_iiii_iiii_iiii", "ldrb", Kind::Literal { size: 1 }),
    form!(b"cccc_010p_u0w1_nnnn_tttt_iiii_iiii_iiii", "ldr", Kind::MemImm),
    form!(b"cccc_010p_u0w0_nnnn_tttt_iiii_iiii_iiii", "str", Kind::MemImm),
    form!(b"cccc_010p_u1w1_nnnn_tttt_iiii_iiii_iiii", "ldrb", Kind::MemImm),
    form!(b"cccc_010p_u1w0_nnnn_tttt_iiii_iiii_iiii", "strb", Kind::MemImm),
    form!(b"cccc_011p_u0w1_nnnn_tttt_iiii_itt0_mmmm", "ldr", Kind::MemReg),
    form!(b"cccc_011p_u0w0_nnnn_tttt_iiii_itt0_mmmm", "str", Kind::MemReg),
    form!(b"cccc_011p_u1w1_nnnn_tttt_iiii_itt0_mmmm", "ldrb", Kind::MemReg),
    form!(b"cccc_011p_u1w0_nnnn_tttt_iiii_itt0_mmmm", "strb", Kind::MemReg),

    form!(b"cccc_0111_0001_dddd_1111_mmmm_0001_nnnn", "sdiv", Kind::Divide),
    form!(b"cccc_0111_0011_dddd_1111_mmmm_0001_nnnn", "udiv", Kind::Divide),
    form!(b"cccc_0111_101w_wwww_dddd_llll_l101_nnnn", "sbfx", Kind::BitfieldExtract),
    form!(b"cccc_0111_111w_wwww_dddd_llll_l101_nnnn", "ubfx", Kind::BitfieldExtract),
    form!(b"cccc_0111_110m_mmmm_dddd_llll_l001_1111", "bfc", Kind::BitfieldClear),
    form!(b"cccc_0111_110m_mmmm_dddd_llll_l001_nnnn", "bfi", Kind::BitfieldInsert),
    form!(b"cccc_0110_1011_1111_dddd_1111_0011_mmmm", "rev", Kind::Reverse),
    form!(b"cccc_0110_1011_1111_dddd_1111_1011_mmmm", "rev16", Kind::Reverse),
    form!(b"cccc_0110_1111_1111_dddd_1111_0011_mmmm", "rbit", Kind::Reverse),
    form!(b"cccc_0110_1111_1111_dddd_1111_1011_mmmm", "revsh", Kind::Reverse),
    form!(b"cccc_0110_1010_1111_dddd_rr00_0111_mmmm", "sxtb", Kind::Extend),
    form!(b"cccc_0110_1011_1111_dddd_rr00_0111_mmmm", "sxth", Kind::Extend),
    form!(b"cccc_0110_1110_1111_dddd_rr00_0111_mmmm", "uxtb", Kind::Extend),
    form!(b"cccc_0110_1111_1111_dddd_rr00_0111_mmmm", "uxth", Kind::Extend),
    form!(b"cccc_0111_1111_iiii_iiii_iiii_1111_iiii", "udf", Kind::Udf),

    form!(b"cccc_1001_0010_1101_llll_llll_llll_llll", "push", Kind::PushPop),
    form!(b"cccc_1000_1011_1101_llll_llll_llll_llll", "pop", Kind::PushPop),
    form!(b"cccc_1000_00w1_nnnn_llll_llll_llll_llll", "ldmda", Kind::Multiple),
    form!(b"cccc_1000_00w0_nnnn_llll_llll_llll_llll", "stmda", Kind::Multiple),
    form!(b"cccc_1000_10w1_nnnn_llll_llll_llll_llll", "ldm", Kind::Multiple),
    form!(b"cccc_1000_10w0_nnnn_llll_llll_llll_llll", "stm", Kind::Multiple),
    form!(b"cccc_1001_00w1_nnnn_llll_llll_llll_llll", "ldmdb", Kind::Multiple),
    form!(b"cccc_1001_00w0_nnnn_llll_llll_llll_llll", "stmdb", Kind::Multiple),
    form!(b"cccc_1001_10w1_nnnn_llll_llll_llll_llll", "ldmib", Kind::Multiple),
    form!(b"cccc_1001_10w0_nnnn_llll_llll_llll_llll", "stmib", Kind::Multiple),

    form!(b"cccc_1010_iiii_iiii_iiii_iiii_iiii_iiii", "b", Kind::Branch),
    form!(b"cccc_1011_iiii_iiii_iiii_iiii_iiii_iiii", "bl", Kind::Branch),
    form!(b"cccc_1111_iiii_iiii_iiii_iiii_iiii_iiii", "svc", Kind::Svc),
    form!(b"cccc_1110_ooo0_nnnn_tttt_pppp_ooo1_mmmm", "mcr", Kind::Transfer),
    form!(b"cccc_1110_ooo1_nnnn_tttt_pppp_ooo1_mmmm", "mrc", Kind::Transfer),
    form!(b"cccc_1110_oooo_nnnn_dddd_pppp_ooo0_mmmm", "cdp", Kind::Cdp),
    form!(b"cccc_110p_udw1_nnnn_dddd_pppp_iiii_iiii", "ldc", Kind::CoprocMem),
    form!(b"cccc_110p_udw0_nnnn_dddd_pppp_iiii_iiii", "stc", Kind::CoprocMem),

    // Unconditional space.
    form!(b"1111_0101_0111_1111_1111_0000_0001_1111", "clrex", Kind::Hint),
    form!(b"1111_0101_0111_1111_1111_0000_0100_oooo", "dsb", Kind::Barrier),
    form!(b"1111_0101_0111_1111_1111_0000_0101_oooo", "dmb", Kind::Barrier),
    form!(b"1111_0101_0111_1111_1111_0000_0110_oooo", "isb", Kind::Barrier),
    form!(b"1111_0101_u101_nnnn_1111_iiii_iiii_iiii", "pld", Kind::Preload),
    form!(b"1111_101h_iiii_iiii_iiii_iiii_iiii_iiii", "blx", Kind::BranchExchangeImm),
];

/// Second operand of a data-processing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand2 {
    Imm(u32),
    ShiftImm { rm: u32, shift: u32, amount: u32 },
    ShiftReg { rm: u32, shift: u32, rs: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fields {
    Data {
        rd: Option<u32>,
        rn: Option<u32>,
        operand: Operand2,
        flags: bool,
    },
    Adr { rd: u32, offset: u32, add: bool },
    MoveWide { rd: u32, imm: u32 },
    None,
    Barrier { option: u32 },
    Regs { regs: [u32; 4], count: usize, flags: bool },
    Swap { rt: u32, rt2: u32, rn: u32 },
    Exclusive { status: Option<u32>, rt: u32, rn: u32 },
    Mem {
        rt: u32,
        rt2: Option<u32>,
        rn: u32,
        offset: Offset,
        mode: IndexMode,
        unprivileged: bool,
    },
    Literal { rt: u32, offset: u32, add: bool, size: u32 },
    Single { rt: u32 },
    BranchExchange { rm: u32 },
    Mrs { rd: u32, spsr: bool },
    Msr { spsr: bool, mask: u32, source: Source },
    Imm { imm: u32 },
    Bitfield { rd: u32, rn: Option<u32>, lsb: u32, width: u32 },
    Extend { rd: u32, rm: u32, rotation: u32 },
    List { base: Option<(u32, bool)>, list: u32 },
    Branch { offset: i32 },
    Cdp { cp: u32, opc1: u32, crd: u32, crn: u32, crm: u32, opc2: u32 },
    Transfer { cp: u32, opc1: u32, rt: u32, crn: u32, crm: u32, opc2: u32 },
    CoprocMem { cp: u32, crd: u32, rn: u32, offset: Offset, mode: IndexMode },
    Preload { rn: u32, offset: Offset },
}

/// Source operand of `msr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Reg(u32),
    Imm(u32),
}

fn rn(w: u32) -> u32 {
    field(w, 16, 4)
}

fn rd(w: u32) -> u32 {
    field(w, 12, 4)
}

fn rs(w: u32) -> u32 {
    field(w, 8, 4)
}

fn rm(w: u32) -> u32 {
    field(w, 0, 4)
}

/// Indexing from the P and W bits; P=0 with W=1 is the unprivileged
/// (`ldrt`-style) post-indexed form.
fn index_mode(w: u32) -> (IndexMode, bool) {
    match (bit(w, 24), bit(w, 21)) {
        (true, false) => (IndexMode::Offset, false),
        (true, true) => (IndexMode::PreIndex, false),
        (false, false) => (IndexMode::PostIndex, false),
        (false, true) => (IndexMode::PostIndex, true),
    }
}

impl Kind {
    fn extract(self, w: u32) -> Option<Fields> {
        let flags = bit(w, 20);
        let operand = |shape| match shape {
            Shape::Imm => Operand2::Imm(field(w, 0, 8).rotate_right(field(w, 8, 4) * 2)),
            Shape::ShiftImm => Operand2::ShiftImm {
                rm: rm(w),
                shift: field(w, 5, 2),
                amount: field(w, 7, 5),
            },
            Shape::ShiftReg => Operand2::ShiftReg {
                rm: rm(w),
                shift: field(w, 5, 2),
                rs: rs(w),
            },
        };
        let fields = match self {
            Self::Data(shape) => Fields::Data {
                rd: Some(rd(w)),
                rn: Some(rn(w)),
                operand: operand(shape),
                flags,
            },
            Self::Compare(shape) => Fields::Data {
                rd: None,
                rn: Some(rn(w)),
                operand: operand(shape),
                flags: false,
            },
            Self::Move(shape) => Fields::Data {
                rd: Some(rd(w)),
                rn: None,
                operand: operand(shape),
                flags,
            },
            Self::Adr { add } => Fields::Adr {
                rd: rd(w),
                offset: field(w, 0, 8).rotate_right(field(w, 8, 4) * 2),
                add,
            },
            Self::MoveWide => Fields::MoveWide {
                rd: rd(w),
                imm: gather(w, &[(0, 12, 0), (16, 4, 12)]),
            },
            Self::Hint => Fields::None,
            Self::Barrier => Fields::Barrier {
                option: field(w, 0, 4),
            },
            Self::Multiply { accumulate } => Fields::Regs {
                regs: [rn(w), rm(w), rs(w), rd(w)],
                count: if accumulate { 4 } else { 3 },
                flags,
            },
            Self::MultiplyLong => Fields::Regs {
                regs: [rd(w), rn(w), rm(w), rs(w)],
                count: 4,
                flags,
            },
            Self::Divide => Fields::Regs {
                regs: [rn(w), rm(w), rs(w), 0],
                count: 3,
                flags: false,
            },
            Self::Swap => Fields::Swap {
                rt: rd(w),
                rt2: rm(w),
                rn: rn(w),
            },
            Self::LoadExclusive => Fields::Exclusive {
                status: None,
                rt: rd(w),
                rn: rn(w),
            },
            Self::StoreExclusive => Fields::Exclusive {
                status: Some(rd(w)),
                rt: rm(w),
                rn: rn(w),
            },
            Self::ExtraImm | Self::ExtraReg | Self::Dual { .. } => {
                let (mode, unprivileged) = index_mode(w);
                let offset = match self {
                    Self::ExtraReg | Self::Dual { register: true } => Offset::Reg {
                        rm: rm(w),
                        add: bit(w, 23),
                        shift: 0,
                        amount: 0,
                    },
                    _ => Offset::Imm {
                        value: gather(w, &[(0, 4, 0), (8, 4, 4)]),
                        add: bit(w, 23),
                    },
                };
                let dual = matches!(self, Self::Dual { .. });
                if dual && rd(w) & 1 != 0 {
                    return None;
                }
                Fields::Mem {
                    rt: rd(w),
                    rt2: dual.then(|| rd(w) + 1),
                    rn: rn(w),
                    offset,
                    mode,
                    unprivileged: unprivileged && !dual,
                }
            }
            Self::Literal { size } => {
                // Bit 26 separates ldr/ldrb from the split-immediate forms.
                let offset = if bit(w, 26) {
                    field(w, 0, 12)
                } else {
                    gather(w, &[(0, 4, 0), (8, 4, 4)])
                };
                Fields::Literal {
                    rt: rd(w),
                    offset,
                    add: bit(w, 23),
                    size,
                }
            }
            Self::MemImm | Self::MemReg => {
                let (mode, unprivileged) = index_mode(w);
                let offset = if self == Self::MemImm {
                    Offset::Imm {
                        value: field(w, 0, 12),
                        add: bit(w, 23),
                    }
                } else {
                    Offset::Reg {
                        rm: rm(w),
                        add: bit(w, 23),
                        shift: field(w, 5, 2),
                        amount: field(w, 7, 5),
                    }
                };
                Fields::Mem {
                    rt: rd(w),
                    rt2: None,
                    rn: rn(w),
                    offset,
                    mode,
                    unprivileged,
                }
            }
            Self::Single => Fields::Single { rt: rd(w) },
            Self::BranchExchange => Fields::BranchExchange { rm: rm(w) },
            Self::Clz | Self::Reverse => Fields::Regs {
                regs: [rd(w), rm(w), 0, 0],
                count: 2,
                flags: false,
            },
            Self::Mrs => Fields::Mrs {
                rd: rd(w),
                spsr: bit(w, 22),
            },
            Self::MsrReg => Fields::Msr {
                spsr: bit(w, 22),
                mask: rn(w),
                source: Source::Reg(rm(w)),
            },
            Self::MsrImm => Fields::Msr {
                spsr: bit(w, 22),
                mask: rn(w),
                source: Source::Imm(field(w, 0, 8).rotate_right(field(w, 8, 4) * 2)),
            },
            Self::Breakpoint | Self::Udf => Fields::Imm {
                imm: gather(w, &[(0, 4, 0), (8, 12, 4)]),
            },
            Self::Svc => Fields::Imm {
                imm: field(w, 0, 24),
            },
            Self::BitfieldExtract => Fields::Bitfield {
                rd: rd(w),
                rn: Some(rm(w)),
                lsb: field(w, 7, 5),
                width: field(w, 16, 5) + 1,
            },
            Self::BitfieldInsert | Self::BitfieldClear => {
                let lsb = field(w, 7, 5);
                let msb = field(w, 16, 5);
                if msb < lsb {
                    return None;
                }
                Fields::Bitfield {
                    rd: rd(w),
                    rn: (self == Self::BitfieldInsert).then(|| rm(w)),
                    lsb,
                    width: msb - lsb + 1,
                }
            }
            Self::Extend => Fields::Extend {
                rd: rd(w),
                rm: rm(w),
                rotation: field(w, 10, 2) * 8,
            },
            Self::PushPop => Fields::List {
                base: None,
                list: field(w, 0, 16),
            },
            Self::Multiple => Fields::List {
                base: Some((rn(w), bit(w, 21))),
                list: field(w, 0, 16),
            },
            Self::Branch => Fields::Branch {
                offset: sign_extend(field(w, 0, 24) << 2, 26),
            },
            Self::BranchExchangeImm => Fields::Branch {
                offset: sign_extend((field(w, 0, 24) << 2) | (field(w, 24, 1) << 1), 26),
            },
            Self::Cdp => Fields::Cdp {
                cp: rs(w),
                opc1: field(w, 20, 4),
                crd: rd(w),
                crn: rn(w),
                crm: rm(w),
                opc2: field(w, 5, 3),
            },
            Self::Transfer => Fields::Transfer {
                cp: rs(w),
                opc1: field(w, 21, 3),
                rt: rd(w),
                crn: rn(w),
                crm: rm(w),
                opc2: field(w, 5, 3),
            },
            Self::CoprocMem => {
                let mode = match (bit(w, 24), bit(w, 21)) {
                    (true, false) => IndexMode::Offset,
                    (true, true) => IndexMode::PreIndex,
                    (false, true) => IndexMode::PostIndex,
                    // mcrr/mrrc and the unindexed form
                    (false, false) => return None,
                };
                Fields::CoprocMem {
                    cp: rs(w),
                    crd: rd(w),
                    rn: rn(w),
                    offset: Offset::Imm {
                        value: field(w, 0, 8) << 2,
                        add: bit(w, 23),
                    },
                    mode,
                }
            }
            Self::Preload => Fields::Preload {
                rn: rn(w),
                offset: Offset::Imm {
                    value: field(w, 0, 12),
                    add: bit(w, 23),
                },
            },
        };
        Some(fields)
    }
}

/// Decodes one A32 word at `address`. Returns `None` for encodings
/// without a form.
pub(super) fn decode(word: u32, address: u32) -> Option<Line> {
    let form = lookup_conditional(FORMS, word)?;
    let fields = form.kind.extract(word)?;
    let cond = match word >> 28 {
        0xF => None,
        bits => Some(Condition::from_bits(bits)),
    };
    let pc = address.wrapping_add(8);
    let mut line = Line::new();
    render(&mut line, form.mnemonic, fields, pc, cond);
    Some(line)
}

fn render(line: &mut Line, mnemonic: &str, fields: Fields, pc: u32, cond: Option<Condition>) {
    if let Fields::Data {
        rd: Some(rd),
        rn: None,
        operand,
        flags,
    } = fields
    {
        if let (true, Some(name)) = (mnemonic == "mov", shift_alias(operand)) {
            // mov with a shifted register is written as the shift itself.
            line.mnemonic(name, flags, cond);
            line.reg(rd);
            match operand {
                Operand2::ShiftImm { rm, amount, .. } => {
                    line.reg(rm);
                    if name != "rrx" {
                        line.imm(i64::from(if amount == 0 { 32 } else { amount }));
                    }
                }
                Operand2::ShiftReg { rm, rs, .. } => {
                    line.reg(rm);
                    line.reg(rs);
                }
                Operand2::Imm(_) => {}
            }
            line.flow = rd == PC_REG;
            return;
        }
    }

    match fields {
        Fields::Data { flags, .. } | Fields::Regs { flags, .. } => {
            line.mnemonic(mnemonic, flags, cond)
        }
        Fields::Mem {
            unprivileged: true, ..
        } => line.mnemonic(&format!("{}t", mnemonic), false, cond),
        _ => line.mnemonic(mnemonic, false, cond),
    }

    match fields {
        Fields::Data {
            rd, rn, operand, ..
        } => {
            for r in [rd, rn].into_iter().flatten() {
                line.reg(r);
            }
            match operand {
                Operand2::Imm(imm) => line.imm(i64::from(imm)),
                Operand2::ShiftImm { rm, shift, amount } => {
                    line.reg(rm);
                    line.shift(shift, amount);
                }
                Operand2::ShiftReg { rm, shift, rs } => {
                    line.reg(rm);
                    let _ = write!(line.text, ", {} {}", SHIFT_NAMES[shift as usize], arm::name(rs));
                }
            }
            line.flow = rd == Some(PC_REG);
        }
        Fields::Adr { rd, offset, add } => {
            line.reg(rd);
            line.address(pc_relative(pc, offset, add));
        }
        Fields::MoveWide { rd, imm } => {
            line.reg(rd);
            line.imm(i64::from(imm));
        }
        Fields::None => {}
        Fields::Barrier { option } => match option {
            0b1111 => line.operand(format_args!("sy")),
            0b1011 => line.operand(format_args!("ish")),
            0b1010 => line.operand(format_args!("ishst")),
            0b0111 => line.operand(format_args!("nsh")),
            0b0011 => line.operand(format_args!("osh")),
            0b1110 => line.operand(format_args!("st")),
            other => line.imm(i64::from(other)),
        },
        Fields::Regs { regs, count, .. } => {
            for &r in &regs[..count] {
                line.reg(r);
            }
        }
        Fields::Swap { rt, rt2, rn } => {
            line.reg(rt);
            line.reg(rt2);
            line.mem(rn, Offset::Imm { value: 0, add: true }, IndexMode::Offset);
        }
        Fields::Exclusive { status, rt, rn } => {
            if let Some(rd) = status {
                line.reg(rd);
            }
            line.reg(rt);
            line.mem(rn, Offset::Imm { value: 0, add: true }, IndexMode::Offset);
        }
        Fields::Mem {
            rt,
            rt2,
            rn,
            offset,
            mode,
            ..
        } => {
            line.reg(rt);
            if let Some(rt2) = rt2 {
                line.reg(rt2);
            }
            line.mem(rn, offset, mode);
            line.flow = rt == PC_REG && mnemonic == "ldr";
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
        Fields::Single { rt } => {
            line.reglist(1 << rt);
            line.flow = rt == PC_REG && mnemonic == "pop";
        }
        Fields::BranchExchange { rm } => {
            line.reg(rm);
            line.flow = true;
        }
        Fields::Mrs { rd, spsr } => {
            line.reg(rd);
            line.operand(format_args!("{}", if spsr { "spsr" } else { "apsr" }));
        }
        Fields::Msr { spsr, mask, source } => {
            let mut name = String::from(if spsr { "spsr_" } else { "cpsr_" });
            for (bit, letter) in [(3, 'f'), (2, 's'), (1, 'x'), (0, 'c')] {
                if mask & (1 << bit) != 0 {
                    name.push(letter);
                }
            }
            line.operand(format_args!("{}", name));
            match source {
                Source::Reg(rn) => line.reg(rn),
                Source::Imm(imm) => line.imm(i64::from(imm)),
            }
        }
        Fields::Imm { imm } => line.imm(i64::from(imm)),
        Fields::Bitfield { rd, rn, lsb, width } => {
            line.reg(rd);
            if let Some(rn) = rn {
                line.reg(rn);
            }
            line.imm(i64::from(lsb));
            line.imm(i64::from(width));
        }
        Fields::Extend { rd, rm, rotation } => {
            line.reg(rd);
            line.reg(rm);
            if rotation != 0 {
                line.operand(format_args!("ror #{}", rotation));
            }
        }
        Fields::List { base, list } => {
            if let Some((rn, writeback)) = base {
                line.reg(rn);
                if writeback {
                    line.suffix("!");
                }
            }
            line.reglist(list);
            line.flow =
                (mnemonic.starts_with("ldm") || mnemonic == "pop") && list & (1 << PC_REG) != 0;
        }
        Fields::Branch { offset } => line.branch(pc.wrapping_add(offset as u32)),
        Fields::Cdp {
            cp,
            opc1,
            crd,
            crn,
            crm,
            opc2,
        } => {
            line.operand(format_args!("p{}", cp));
            line.operand(format_args!("{}", opc1));
            line.operand(format_args!("c{}", crd));
            line.operand(format_args!("c{}", crn));
            line.operand(format_args!("c{}", crm));
            line.operand(format_args!("{}", opc2));
        }
        Fields::Transfer {
            cp,
            opc1,
            rt,
            crn,
            crm,
            opc2,
        } => {
            line.operand(format_args!("p{}", cp));
            line.operand(format_args!("{}", opc1));
            line.reg(rt);
            line.operand(format_args!("c{}", crn));
            line.operand(format_args!("c{}", crm));
            line.operand(format_args!("{}", opc2));
        }
        Fields::CoprocMem {
            cp,
            crd,
            rn,
            offset,
            mode,
        } => {
            line.operand(format_args!("p{}", cp));
            line.operand(format_args!("c{}", crd));
            line.mem(rn, offset, mode);
        }
        Fields::Preload { rn, offset } => line.mem(rn, offset, IndexMode::Offset),
    }
}

/// Shift mnemonic that replaces `mov` with a shifted operand; `None` for
/// a plain register or immediate move.
fn shift_alias(operand: Operand2) -> Option<&'static str> {
    match operand {
        Operand2::Imm(_)
        | Operand2::ShiftImm {
            shift: 0,
            amount: 0,
            ..
        } => None,
        Operand2::ShiftImm {
            shift: 3,
            amount: 0,
            ..
        } => Some("rrx"),
        Operand2::ShiftImm { shift, .. } | Operand2::ShiftReg { shift, .. } => {
            Some(SHIFT_NAMES[shift as usize])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::format::Target;

    fn text(word: u32) -> String {
        decode(word, 0x1000)
            .map(|line| line.text.into_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_data_processing() {
        assert_eq!(text(0xE080_1002), "add r1, r0, r2");
        assert_eq!(text(0xE281_0002), "add r0, r1, #2");
        assert_eq!(text(0xE291_0002), "adds r0, r1, #2");
        assert_eq!(text(0x0281_0002), "addeq r0, r1, #2");
        assert_eq!(text(0xE3A0_04FF), "mov r0, #4278190080");
        assert_eq!(text(0xE081_0102), "add r0, r1, r2, lsl #2");
        assert_eq!(text(0xE081_0312), "add r0, r1, r2, lsl r3");
        assert_eq!(text(0xE351_0000), "cmp r1, #0");
        assert_eq!(text(0xE111_0002), "tst r1, r2");
    }

    #[test]
    fn test_mov_shift_aliases() {
        assert_eq!(text(0xE1A0_1002), "mov r1, r2");
        assert_eq!(text(0xE1A0_0101), "lsl r0, r1, #2");
        assert_eq!(text(0xE1A0_0021), "lsr r0, r1, #32");
        assert_eq!(text(0xE1A0_0061), "rrx r0, r1");
        assert_eq!(text(0xE1B0_0211), "lsls r0, r1, r2");
        let line = decode(0xE1A0_F00E, 0).unwrap();
        assert_eq!(line.text.as_str(), "mov pc, lr");
        assert!(line.flow);
    }

    #[test]
    fn test_adr_and_literal() {
        assert_eq!(text(0xE28F_0008), "adr r0, 0x1010");
        assert_eq!(text(0xE24F_0008), "adr r0, 0x1000");
        let line = decode(0xE59F_0004, 0x1000).unwrap();
        assert_eq!(line.text.as_str(), "ldr r0, [pc, #4]");
        assert_eq!(
            line.target,
            Some(Target::Literal {
                address: 0x100C,
                size: 4
            })
        );
        let line = decode(0xE1DF_00B2, 0x1000).unwrap();
        assert_eq!(line.text.as_str(), "ldrh r0, [pc, #2]");
        assert_eq!(
            line.target,
            Some(Target::Literal {
                address: 0x100A,
                size: 2
            })
        );
    }

    #[test]
    fn test_loads_and_stores() {
        assert_eq!(text(0xE591_3000), "ldr r3, [r1]");
        assert_eq!(text(0xE511_3004), "ldr r3, [r1, #-4]");
        assert_eq!(text(0xE5B1_3004), "ldr r3, [r1, #4]!");
        assert_eq!(text(0xE491_3004), "ldr r3, [r1], #4");
        assert_eq!(text(0xE4B1_3004), "ldrt r3, [r1], #4");
        assert_eq!(text(0xE5C1_3000), "strb r3, [r1]");
        assert_eq!(text(0xE791_3102), "ldr r3, [r1, r2, lsl #2]");
        assert_eq!(text(0xE1D1_30B4), "ldrh r3, [r1, #4]");
        assert_eq!(text(0xE191_30B2), "ldrh r3, [r1, r2]");
        assert_eq!(text(0xE1C1_20D8), "ldrd r2, r3, [r1, #8]");
        assert_eq!(text(0xE52D_E004), "push {lr}");
        assert_eq!(text(0xE49D_F004), "pop {pc}");
        assert_eq!(text(0xE191_3F9F), "ldrex r3, [r1]");
        assert_eq!(text(0xE181_2F93), "strex r2, r3, [r1]");
    }

    #[test]
    fn test_multiply_and_divide() {
        assert_eq!(text(0xE000_0291), "mul r0, r1, r2");
        assert_eq!(text(0xE020_3291), "mla r0, r1, r2, r3");
        assert_eq!(text(0xE081_0392), "umull r0, r1, r2, r3");
        assert_eq!(text(0xE710_F211), "sdiv r0, r1, r2");
    }

    #[test]
    fn test_block_transfer() {
        assert_eq!(text(0xE92D_4010), "push {r4, lr}");
        let line = decode(0xE8BD_8010, 0).unwrap();
        assert_eq!(line.text.as_str(), "pop {r4, pc}");
        assert!(line.flow);
        assert_eq!(text(0xE8B0_0006), "ldm r0!, {r1, r2}");
        assert_eq!(text(0xE980_0006), "stmib r0, {r1, r2}");
        assert!(decode(0xE8D0_0006, 0).is_none());
    }

    #[test]
    fn test_branches() {
        assert_eq!(text(0xEAFF_FFFE), "b 0x1000");
        assert_eq!(text(0xEB00_0000), "bl 0x1008");
        assert_eq!(text(0x1AFF_FFFD), "bne 0xffc");
        assert_eq!(text(0xFA00_0000), "blx 0x1008");
        assert_eq!(text(0xFB00_0000), "blx 0x100a");
        assert_eq!(text(0xE12F_FF1E), "bx lr");
        assert_eq!(text(0xE12F_FF33), "blx r3");
    }

    #[test]
    fn test_system_and_coprocessor() {
        assert_eq!(text(0xEE00_0000), "cdp p0, 0, c0, c0, c0, 0");
        assert_eq!(text(0xEE01_0F10), "mcr p15, 0, r0, c1, c0, 0");
        assert_eq!(text(0xEE11_0F10), "mrc p15, 0, r0, c1, c0, 0");
        assert_eq!(text(0xEF00_0000), "svc #0");
        assert_eq!(text(0xE320_F000), "nop");
        assert_eq!(text(0xE320_F003), "wfi");
        assert_eq!(text(0xF57F_F05F), "dmb sy");
        assert_eq!(text(0xF57F_F01F), "clrex");
        assert_eq!(text(0xE10F_0000), "mrs r0, apsr");
        assert_eq!(text(0xE129_F000), "msr cpsr_fc, r0");
        assert_eq!(text(0xE120_0070), "bkpt #0");
        assert_eq!(text(0xF5D1_F004), "pld [r1, #4]");
    }

    #[test]
    fn test_media() {
        assert_eq!(text(0xE7E7_0251), "ubfx r0, r1, #4, #8");
        assert_eq!(text(0xE7CB_0211), "bfi r0, r1, #4, #8");
        assert_eq!(text(0xE7CB_021F), "bfc r0, #4, #8");
        assert_eq!(text(0xE6BF_0F31), "rev r0, r1");
        assert_eq!(text(0xE6AF_0071), "sxtb r0, r1");
        assert_eq!(text(0xE6FF_0471), "uxth r0, r1, ror #8");
        assert_eq!(text(0xE7F0_00F0), "udf #0");
        assert_eq!(text(0xE16F_0F11), "clz r0, r1");
    }
}
