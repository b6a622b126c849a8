//! 16-bit Thumb encodings.

use super::format::{pc_relative, Line, Offset};
use super::it::{self, ItState};
use crate::table::{form, lookup, Form};
use mnemo_core::bits::{field, gather, sign_extend};
use mnemo_core::register::arm::{LR, PC, SP};
use mnemo_core::{Condition, IndexMode};

const SP_REG: u32 = SP as u32;
const LR_REG: u32 = LR as u32;
const PC_REG: u32 = PC as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// `movs rd, rm` (the zero `lsls`)
    Move,
    ShiftImm,
    AddSubReg,
    AddSubImm3,
    Imm8,
    DataProc,
    /// `muls rd, rn, rd`
    Multiply,
    /// `rsbs rd, rn, #0`
    Negate,
    /// `add`/`mov` on any register; writes the PC when rd is pc.
    HiReg,
    HiCompare,
    BranchExchange,
    LiteralLoad,
    MemReg,
    MemImm { scale: u32 },
    SpRel,
    Adr,
    AddSp,
    AdjustSp,
    Extend,
    CompareBranch,
    Push,
    Pop,
    Multiple { load: bool },
    Immediate,
    Cps,
    Hint,
    It,
    CondBranch,
    Branch,
}

impl Kind {
    /// Forms that set flags outside an IT block and drop the `s` inside one.
    fn narrow_flags(self) -> bool {
        matches!(
            self,
            Self::Move
                | Self::ShiftImm
                | Self::AddSubReg
                | Self::AddSubImm3
                | Self::Imm8
                | Self::DataProc
                | Self::Multiply
                | Self::Negate
        )
    }
}

#[rustfmt::skip]
static FORMS: &[Form<Kind>] = &[
    form!(b"0000_0000_00mm_mddd", "movs", Kind::Move),
    form!(b"0000_0iii_iimm_mddd", "lsls", Kind::ShiftImm),
    form!(b"0000_1iii_iimm_mddd", "lsrs", Kind::ShiftImm),
    form!(b"0001_0iii_iimm_mddd", "asrs", Kind::ShiftImm),
    form!(b"0001_100m_mmnn_nddd", "adds", Kind::AddSubReg),
    form!(b"0001_101m_mmnn_nddd", "subs", Kind::AddSubReg),
    form!(b"0001_110i_iinn_nddd", "adds", Kind::AddSubImm3),
    form!(b"0001_111i_iinn_nddd", "subs", Kind::AddSubImm3),
    form!(b"0010_0ddd_iiii_iiii", "movs", Kind::Imm8),
    form!(b"0010_1ddd_iiii_iiii", "cmp", Kind::Imm8),
    form!(b"0011_0ddd_iiii_iiii", "adds", Kind::Imm8),
    form!(b"0011_1ddd_iiii_iiii", "subs", Kind::Imm8),

    form!(b"0100_0000_00mm_mddd", "ands", Kind::DataProc),
    form!(b"0100_0000_01mm_mddd", "eors", Kind::DataProc),
    form!(b"0100_0000_10mm_mddd", "lsls", Kind::DataProc),
    form!(b"0100_0000_11mm_mddd", "lsrs", Kind::DataProc),
    form!(b"0100_0001_00mm_mddd", "asrs", Kind::DataProc),
    form!(b"0100_0001_01mm_mddd", "adcs", Kind::DataProc),
    form!(b"0100_0001_10mm_mddd", "sbcs", Kind::DataProc),
    form!(b"0100_0001_11mm_mddd", "rors", Kind::DataProc),
    form!(b"0100_0010_00mm_mddd", "tst", Kind::DataProc),
    form!(b"0100_0010_01nn_nddd", "rsbs", Kind::Negate),
    form!(b"0100_0010_10mm_mddd", "cmp", Kind::DataProc),
    form!(b"0100_0010_11mm_mddd", "cmn", Kind::DataProc),
    form!(b"0100_0011_00mm_mddd", "orrs", Kind::DataProc),
    form!(b"0100_0011_01nn_nddd", "muls", Kind::Multiply),
    form!(b"0100_0011_10mm_mddd", "bics", Kind::DataProc),
    form!(b"0100_0011_11mm_mddd", "mvns", Kind::DataProc),

    form!(b"0100_0100_dmmm_mddd", "add", Kind::HiReg),
    form!(b"0100_0101_nmmm_mnnn", "cmp", Kind::HiCompare),
    form!(b"0100_0110_dmmm_mddd", "mov", Kind::HiReg),
    form!(b"0100_0111_0mmm_m000", "bx", Kind::BranchExchange),
    form!(b"0100_0111_1mmm_m000", "blx", Kind::BranchExchange),
    form!(b"0100_1ttt_iiii_iiii", "ldr", Kind::LiteralLoad),

    form!(b"0101_000m_mmnn_nttt", "str", Kind::MemReg),
    form!(b"0101_001m_mmnn_nttt", "strh", Kind::MemReg),
    form!(b"0101_010m_mmnn_nttt", "strb", Kind::MemReg),
    form!(b"0101_011m_mmnn_nttt", "ldrsb", Kind::MemReg),
    form!(b"0101_100m_mmnn_nttt", "ldr", Kind::MemReg),
    form!(b"0101_101m_mmnn_nttt", "ldrh", Kind::MemReg),
    form!(b"0101_110m_mmnn_nttt", "ldrb", Kind::MemReg),
    form!(b"0101_111m_mmnn_nttt", "ldrsh", Kind::MemReg),
    form!(b"0110_0iii_iinn_nttt", "str", Kind::MemImm { scale: 4 }),
    form!(b"0110_1iii_iinn_nttt", "ldr", Kind::MemImm { scale: 4 }),
    form!(b"0111_0iii_iinn_nttt", "strb", Kind::MemImm { scale: 1 }),
    form!(b"0111_1iii_iinn_nttt", "ldrb", Kind::MemImm { scale: 1 }),
    form!(b"1000_0iii_iinn_nttt", "strh", Kind::MemImm { scale: 2 }),
    form!(b"1000_1iii_iinn_nttt", "ldrh", Kind::MemImm { scale: 2 }),
    form!(b"1001_0ttt_iiii_iiii", "str", Kind::SpRel),
    form!(b"1001_1ttt_iiii_iiii", "ldr", Kind::SpRel),
    form!(b"1010_0ddd_iiii_iiii", "adr", Kind::Adr),
    form!(b"1010_1ddd_iiii_iiii", "add", Kind::AddSp),

    form!(b"1011_0000_0iii_iiii", "add", Kind::AdjustSp),
    form!(b"1011_0000_1iii_iiii", "sub", Kind::AdjustSp),
    form!(b"1011_00i1_iiii_innn", "cbz", Kind::CompareBranch),
    form!(b"1011_0010_00mm_mddd", "sxth", Kind::Extend),
    form!(b"1011_0010_01mm_mddd", "sxtb", Kind::Extend),
    form!(b"1011_0010_10mm_mddd", "uxth", Kind::Extend),
    form!(b"1011_0010_11mm_mddd", "uxtb", Kind::Extend),
    form!(b"1011_010r_llll_llll", "push", Kind::Push),
    form!(b"1011_0110_0110_0aif", "cpsie", Kind::Cps),
    form!(b"1011_0110_0111_0aif", "cpsid", Kind::Cps),
    form!(b"1011_10i1_iiii_innn", "cbnz", Kind::CompareBranch),
    form!(b"1011_1010_00mm_mddd", "rev", Kind::Extend),
    form!(b"1011_1010_01mm_mddd", "rev16", Kind::Extend),
    form!(b"1011_1010_11mm_mddd", "revsh", Kind::Extend),
    form!(b"1011_110p_llll_llll", "pop", Kind::Pop),
    form!(b"1011_1110_iiii_iiii", "bkpt", Kind::Immediate),
    form!(b"1011_1111_0000_0000", "nop", Kind::Hint),
    form!(b"1011_1111_0001_0000", "yield", Kind::Hint),
    form!(b"1011_1111_0010_0000", "wfe", Kind::Hint),
    form!(b"1011_1111_0011_0000", "wfi", Kind::Hint),
    form!(b"1011_1111_0100_0000", "sev", Kind::Hint),
    form!(b"1011_1111_cccc_mmmm", "it", Kind::It),

    form!(b"1100_0nnn_llll_llll", "stmia", Kind::Multiple { load: false }),
    form!(b"1100_1nnn_llll_llll", "ldmia", Kind::Multiple { load: true }),
    form!(b"1101_1110_iiii_iiii", "udf", Kind::Immediate),
    form!(b"1101_1111_iiii_iiii", "svc", Kind::Immediate),
    form!(b"1101_cccc_iiii_iiii", "b", Kind::CondBranch),
    form!(b"1110_0iii_iiii_iiii", "b", Kind::Branch),
];

/// Fields of one 16-bit instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fields {
    RegReg { rd: u32, rm: u32 },
    RegRegReg { rd: u32, rn: u32, rm: u32 },
    RegRegImm { rd: u32, rn: u32, imm: u32 },
    RegImm { rd: u32, imm: u32 },
    Reg { rm: u32 },
    Literal { rt: u32, offset: u32 },
    Mem { rt: u32, rn: u32, offset: Offset },
    Adr { rd: u32, offset: u32 },
    CompareBranch { rn: u32, offset: u32 },
    List { base: Option<(u32, bool)>, list: u32 },
    Imm { imm: u32 },
    Cps { flags: u32 },
    None,
    It { firstcond: u32, mask: u32 },
    Branch { cond: Option<Condition>, offset: i32 },
}

impl Kind {
    fn extract(self, hw: u32) -> Fields {
        let low = |pos: u32| field(hw, pos, 3);
        match self {
            Self::Move | Self::DataProc | Self::Extend => Fields::RegReg {
                rd: low(0),
                rm: low(3),
            },
            Self::ShiftImm => {
                let imm = field(hw, 6, 5);
                // lsr and asr encode a shift by 32 as zero.
                let imm = if imm == 0 && field(hw, 11, 2) != 0 { 32 } else { imm };
                Fields::RegRegImm {
                    rd: low(0),
                    rn: low(3),
                    imm,
                }
            }
            Self::AddSubReg => Fields::RegRegReg {
                rd: low(0),
                rn: low(3),
                rm: low(6),
            },
            Self::AddSubImm3 => Fields::RegRegImm {
                rd: low(0),
                rn: low(3),
                imm: field(hw, 6, 3),
            },
            Self::Imm8 => Fields::RegImm {
                rd: low(8),
                imm: field(hw, 0, 8),
            },
            Self::Multiply => Fields::RegRegReg {
                rd: low(0),
                rn: low(3),
                rm: low(0),
            },
            Self::Negate => Fields::RegRegImm {
                rd: low(0),
                rn: low(3),
                imm: 0,
            },
            Self::HiReg | Self::HiCompare => Fields::RegReg {
                rd: gather(hw, &[(0, 3, 0), (7, 1, 3)]),
                rm: field(hw, 3, 4),
            },
            Self::BranchExchange => Fields::Reg {
                rm: field(hw, 3, 4),
            },
            Self::LiteralLoad => Fields::Literal {
                rt: low(8),
                offset: field(hw, 0, 8) << 2,
            },
            Self::MemReg => Fields::Mem {
                rt: low(0),
                rn: low(3),
                offset: Offset::Reg {
                    rm: low(6),
                    add: true,
                    shift: 0,
                    amount: 0,
                },
            },
            Self::MemImm { scale } => Fields::Mem {
                rt: low(0),
                rn: low(3),
                offset: Offset::Imm {
                    value: field(hw, 6, 5) * scale,
                    add: true,
                },
            },
            Self::SpRel => Fields::Mem {
                rt: low(8),
                rn: SP_REG,
                offset: Offset::Imm {
                    value: field(hw, 0, 8) << 2,
                    add: true,
                },
            },
            Self::Adr => Fields::Adr {
                rd: low(8),
                offset: field(hw, 0, 8) << 2,
            },
            Self::AddSp => Fields::RegRegImm {
                rd: low(8),
                rn: SP_REG,
                imm: field(hw, 0, 8) << 2,
            },
            Self::AdjustSp => Fields::RegRegImm {
                rd: SP_REG,
                rn: SP_REG,
                imm: field(hw, 0, 7) << 2,
            },
            Self::CompareBranch => Fields::CompareBranch {
                rn: low(0),
                offset: gather(hw, &[(3, 5, 1), (9, 1, 6)]),
            },
            Self::Push => Fields::List {
                base: None,
                list: field(hw, 0, 8) | (field(hw, 8, 1) << LR_REG),
            },
            Self::Pop => Fields::List {
                base: None,
                list: field(hw, 0, 8) | (field(hw, 8, 1) << PC_REG),
            },
            Self::Multiple { load } => {
                let rn = low(8);
                let list = field(hw, 0, 8);
                // ldmia writes back only when the base is not loaded.
                let writeback = !load || list & (1 << rn) == 0;
                Fields::List {
                    base: Some((rn, writeback)),
                    list,
                }
            }
            Self::Immediate => Fields::Imm {
                imm: field(hw, 0, 8),
            },
            Self::Cps => Fields::Cps {
                flags: field(hw, 0, 3),
            },
            Self::Hint => Fields::None,
            Self::It => Fields::It {
                firstcond: field(hw, 4, 4),
                mask: field(hw, 0, 4),
            },
            Self::CondBranch => Fields::Branch {
                cond: Some(Condition::from_bits(field(hw, 8, 4))),
                offset: sign_extend(field(hw, 0, 8), 8) << 1,
            },
            Self::Branch => Fields::Branch {
                cond: None,
                offset: sign_extend(field(hw, 0, 11), 11) << 1,
            },
        }
    }
}

/// Returns true if `hw` is the first halfword of a 32-bit encoding.
pub(super) fn is_wide(hw: u16) -> bool {
    matches!(hw >> 11, 0b11101 | 0b11110 | 0b11111)
}

/// Decodes a 16-bit instruction at `address`.
///
/// `cond` is the IT slot condition. Inside a block the condition becomes a
/// mnemonic suffix and flag-setting forms drop their `s`. Returns `None`
/// for encodings without a form.
pub(super) fn decode(hw: u16, address: u32, cond: Option<Condition>) -> Option<Line> {
    let hw = u32::from(hw);
    let form = lookup(FORMS, hw)?;
    let pc = address.wrapping_add(4);
    let mnemonic = match cond {
        Some(_) if form.kind.narrow_flags() => {
            form.mnemonic.strip_suffix('s').unwrap_or(form.mnemonic)
        }
        _ => form.mnemonic,
    };

    let mut line = Line::new();
    match form.kind.extract(hw) {
        Fields::It { firstcond, mask } => {
            line.mnemonic(&it::mnemonic(firstcond, mask)?, false, None);
            line.operand(format_args!("{}", Condition::from_bits(firstcond).name()));
            line.it = Some(ItState::new(firstcond, mask));
            return Some(line);
        }
        Fields::Branch {
            cond: Some(branch_cond),
            offset,
        } => {
            line.mnemonic(mnemonic, false, Some(branch_cond));
            line.branch(pc.wrapping_add(offset as u32));
            return Some(line);
        }
        Fields::Cps { flags } => {
            let mut letters = String::new();
            for (bit, letter) in [(2, 'a'), (1, 'i'), (0, 'f')] {
                if flags & (1 << bit) != 0 {
                    letters.push(letter);
                }
            }
            line.mnemonic(mnemonic, false, cond);
            line.operand(format_args!("{}", letters));
            return Some(line);
        }
        fields => {
            line.mnemonic(mnemonic, false, cond);
            render(&mut line, form.kind, fields, pc);
        }
    }
    Some(line)
}

fn render(line: &mut Line, kind: Kind, fields: Fields, pc: u32) {
    match fields {
        Fields::RegReg { rd, rm } => {
            // `cmp` compares rn (in the rd slot) with rm.
            line.reg(rd);
            line.reg(rm);
            line.flow = kind == Kind::HiReg && rd == PC_REG;
        }
        Fields::RegRegReg { rd, rn, rm } => {
            line.reg(rd);
            line.reg(rn);
            line.reg(rm);
        }
        Fields::RegRegImm { rd, rn, imm } => {
            line.reg(rd);
            line.reg(rn);
            line.imm(i64::from(imm));
        }
        Fields::RegImm { rd, imm } => {
            line.reg(rd);
            line.imm(i64::from(imm));
        }
        Fields::Reg { rm } => {
            line.reg(rm);
            line.flow = true;
        }
        Fields::Literal { rt, offset } => {
            line.reg(rt);
            line.literal(offset, true, pc_relative(pc, offset, true), 4);
        }
        Fields::Mem { rt, rn, offset } => {
            line.reg(rt);
            line.mem(rn, offset, IndexMode::Offset);
        }
        Fields::Adr { rd, offset } => {
            line.reg(rd);
            line.address(pc_relative(pc, offset, true));
        }
        Fields::CompareBranch { rn, offset } => {
            line.reg(rn);
            line.branch(pc.wrapping_add(offset));
        }
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
        Fields::Imm { imm } => line.imm(i64::from(imm)),
        Fields::Branch { offset, .. } => line.branch(pc.wrapping_add(offset as u32)),
        Fields::None | Fields::Cps { .. } | Fields::It { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::format::Target;

    fn text(hw: u16) -> String {
        text_at(hw, 0x1000, None)
    }

    fn text_at(hw: u16, address: u32, cond: Option<Condition>) -> String {
        decode(hw, address, cond)
            .map(|line| line.text.into_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_high_register_add() {
        assert_eq!(text(0x4463), "add r3, r12");
    }

    #[test]
    fn test_shifts_and_moves() {
        assert_eq!(text(0x0008), "movs r0, r1");
        assert_eq!(text(0x0088), "lsls r0, r1, #2");
        assert_eq!(text(0x0808), "lsrs r0, r1, #32");
        assert_eq!(text(0x2005), "movs r0, #5");
        assert_eq!(text(0x2A10), "cmp r2, #16");
        assert_eq!(text(0x4240), "rsbs r0, r0, #0");
        assert_eq!(text(0x4348), "muls r0, r1, r0");
    }

    #[test]
    fn test_flags_dropped_inside_it_block() {
        let eq = Some(Condition::Equal);
        assert_eq!(text_at(0x1888, 0, eq), "addeq r0, r1, r2");
        assert_eq!(text_at(0x2A10, 0, eq), "cmpeq r2, #16");
        assert_eq!(text_at(0x4008, 0, eq), "andeq r0, r1");
        assert_eq!(text_at(0x4770, 0, eq), "bxeq lr");
    }

    #[test]
    fn test_loads_and_stores() {
        assert_eq!(text(0x6848), "ldr r0, [r1, #4]");
        assert_eq!(text(0x7008), "strb r0, [r1]");
        assert_eq!(text(0x8848), "ldrh r0, [r1, #2]");
        assert_eq!(text(0x5888), "ldr r0, [r1, r2]");
        assert_eq!(text(0x9801), "ldr r0, [sp, #4]");
        assert_eq!(text(0x4801), "ldr r0, [pc, #4]");
    }

    #[test]
    fn test_literal_target_is_word_aligned() {
        let line = decode(0x4801, 0x1002, None).unwrap();
        assert_eq!(
            line.target,
            Some(Target::Literal {
                address: 0x1008,
                size: 4
            })
        );
    }

    #[test]
    fn test_stack_and_lists() {
        assert_eq!(text(0xB5F0), "push {r4, r5, r6, r7, lr}");
        assert_eq!(text(0xBDF0), "pop {r4, r5, r6, r7, pc}");
        assert_eq!(text(0xB082), "sub sp, sp, #8");
        assert_eq!(text(0xA901), "add r1, sp, #4");
        assert_eq!(text(0xC806), "ldmia r0!, {r1, r2}");
        assert_eq!(text(0xC807), "ldmia r0, {r0, r1, r2}");
        assert!(decode(0xBDF0, 0, None).unwrap().flow);
        assert!(!decode(0xB5F0, 0, None).unwrap().flow);
    }

    #[test]
    fn test_branches() {
        // b . at 0x1000
        assert_eq!(text(0xE7FE), "b 0x1000");
        assert_eq!(text(0xD0FE), "beq 0x1000");
        assert_eq!(text(0xB108), "cbz r0, 0x1006");
        assert_eq!(text(0x4770), "bx lr");
        assert_eq!(text(0x4687), "mov pc, r0");
        assert!(decode(0x4687, 0, None).unwrap().flow);
        assert_eq!(text(0x4587), "cmp pc, r0");
        assert!(!decode(0x4587, 0, None).unwrap().flow);
        assert_eq!(text(0x44F8), "add r8, pc");
        assert!(!decode(0x44F8, 0, None).unwrap().flow);
        assert!(decode(0x4487, 0, None).unwrap().flow);
    }

    #[test]
    fn test_it_and_hints() {
        let line = decode(0xBF0A, 0, None).unwrap();
        assert_eq!(line.text.as_str(), "itet eq");
        assert_eq!(line.it.map(|s| s.remaining()), Some(3));
        assert_eq!(text(0xBF00), "nop");
        assert_eq!(text(0xBF30), "wfi");
        assert_eq!(text(0xB662), "cpsie i");
        assert!(decode(0xBF50, 0, None).is_none());
    }

    #[test]
    fn test_misc() {
        assert_eq!(text(0xBE01), "bkpt #1");
        assert_eq!(text(0xDF02), "svc #2");
        assert_eq!(text(0xDEFF), "udf #255");
        assert_eq!(text(0xB2C8), "uxtb r0, r1");
        assert_eq!(text(0xBA08), "rev r0, r1");
        assert_eq!(text(0xA001), "adr r0, 0x1008");
    }

    #[test]
    fn test_wide_prefix() {
        assert!(is_wide(0xF000));
        assert!(is_wide(0xE800));
        assert!(!is_wide(0xE7FE));
        assert!(!is_wide(0x4463));
    }
}
