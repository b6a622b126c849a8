//! RISC-V instruction decoder implementation.

use std::fmt::Write;

use crate::table::{form, lookup, Form};
use crate::traits::data_directive;
use crate::{DecodeError, DecodedInstruction, Disassembler};
use mnemo_core::bits::{field, gather, sign_extend};
use mnemo_core::register::riscv::name as reg;
use mnemo_core::{Architecture, TextBuffer};

/// Instruction family; selects the field layout and the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Lui,
    Auipc,
    Jal,
    Jalr,
    Branch,
    Load,
    Store,
    OpImm,
    ShiftImm,
    Op,
    Fence,
    FenceI,
    /// No operands (ecall, ebreak, mret, wfi).
    System,
    Csr,
    CsrImm,
}

#[rustfmt::skip]
static FORMS: &[Form<Kind>] = &[
    form!(b"iiiiiiiiiiiiiiiiiiii_ddddd_0110111", "lui", Kind::Lui),
    form!(b"iiiiiiiiiiiiiiiiiiii_ddddd_0010111", "auipc", Kind::Auipc),
    form!(b"iiiiiiiiiiiiiiiiiiii_ddddd_1101111", "jal", Kind::Jal),
    form!(b"iiiiiiiiiiii_sssss_000_ddddd_1100111", "jalr", Kind::Jalr),

    form!(b"iiiiiii_ttttt_sssss_000_iiiii_1100011", "beq", Kind::Branch),
    form!(b"iiiiiii_ttttt_sssss_001_iiiii_1100011", "bne", Kind::Branch),
    form!(b"iiiiiii_ttttt_sssss_100_iiiii_1100011", "blt", Kind::Branch),
    form!(b"iiiiiii_ttttt_sssss_101_iiiii_1100011", "bge", Kind::Branch),
    form!(b"iiiiiii_ttttt_sssss_110_iiiii_1100011", "bltu", Kind::Branch),
    form!(b"iiiiiii_ttttt_sssss_111_iiiii_1100011", "bgeu", Kind::Branch),

    form!(b"iiiiiiiiiiii_sssss_000_ddddd_0000011", "lb", Kind::Load),
    form!(b"iiiiiiiiiiii_sssss_001_ddddd_0000011", "lh", Kind::Load),
    form!(b"iiiiiiiiiiii_sssss_010_ddddd_0000011", "lw", Kind::Load),
    form!(b"iiiiiiiiiiii_sssss_100_ddddd_0000011", "lbu", Kind::Load),
    form!(b"iiiiiiiiiiii_sssss_101_ddddd_0000011", "lhu", Kind::Load),

    form!(b"iiiiiii_ttttt_sssss_000_iiiii_0100011", "sb", Kind::Store),
    form!(b"iiiiiii_ttttt_sssss_001_iiiii_0100011", "sh", Kind::Store),
    form!(b"iiiiiii_ttttt_sssss_010_iiiii_0100011", "sw", Kind::Store),

    form!(b"iiiiiiiiiiii_sssss_000_ddddd_0010011", "addi", Kind::OpImm),
    form!(b"iiiiiiiiiiii_sssss_010_ddddd_0010011", "slti", Kind::OpImm),
    form!(b"iiiiiiiiiiii_sssss_011_ddddd_0010011", "sltiu", Kind::OpImm),
    form!(b"iiiiiiiiiiii_sssss_100_ddddd_0010011", "xori", Kind::OpImm),
    form!(b"iiiiiiiiiiii_sssss_110_ddddd_0010011", "ori", Kind::OpImm),
    form!(b"iiiiiiiiiiii_sssss_111_ddddd_0010011", "andi", Kind::OpImm),
    form!(b"0000000_hhhhh_sssss_001_ddddd_0010011", "slli", Kind::ShiftImm),
    form!(b"0000000_hhhhh_sssss_101_ddddd_0010011", "srli", Kind::ShiftImm),
    form!(b"0100000_hhhhh_sssss_101_ddddd_0010011", "srai", Kind::ShiftImm),

    form!(b"0000000_ttttt_sssss_000_ddddd_0110011", "add", Kind::Op),
    form!(b"0100000_ttttt_sssss_000_ddddd_0110011", "sub", Kind::Op),
    form!(b"0000000_ttttt_sssss_001_ddddd_0110011", "sll", Kind::Op),
    form!(b"0000000_ttttt_sssss_010_ddddd_0110011", "slt", Kind::Op),
    form!(b"0000000_ttttt_sssss_011_ddddd_0110011", "sltu", Kind::Op),
    form!(b"0000000_ttttt_sssss_100_ddddd_0110011", "xor", Kind::Op),
    form!(b"0000000_ttttt_sssss_101_ddddd_0110011", "srl", Kind::Op),
    form!(b"0100000_ttttt_sssss_101_ddddd_0110011", "sra", Kind::Op),
    form!(b"0000000_ttttt_sssss_110_ddddd_0110011", "or", Kind::Op),
    form!(b"0000000_ttttt_sssss_111_ddddd_0110011", "and", Kind::Op),

    // M extension
    form!(b"0000001_ttttt_sssss_000_ddddd_0110011", "mul", Kind::Op),
    form!(b"0000001_ttttt_sssss_001_ddddd_0110011", "mulh", Kind::Op),
    form!(b"0000001_ttttt_sssss_010_ddddd_0110011", "mulhsu", Kind::Op),
    form!(b"0000001_ttttt_sssss_011_ddddd_0110011", "mulhu", Kind::Op),
    form!(b"0000001_ttttt_sssss_100_ddddd_0110011", "div", Kind::Op),
    form!(b"0000001_ttttt_sssss_101_ddddd_0110011", "divu", Kind::Op),
    form!(b"0000001_ttttt_sssss_110_ddddd_0110011", "rem", Kind::Op),
    form!(b"0000001_ttttt_sssss_111_ddddd_0110011", "remu", Kind::Op),

    form!(b"ffff_pppp_qqqq_sssss_000_ddddd_0001111", "fence", Kind::Fence),
    form!(b"iiiiiiiiiiii_sssss_001_ddddd_0001111", "fence.i", Kind::FenceI),

    form!(b"000000000000_00000_000_00000_1110011", "ecall", Kind::System),
    form!(b"000000000001_00000_000_00000_1110011", "ebreak", Kind::System),
    form!(b"000100000010_00000_000_00000_1110011", "sret", Kind::System),
    form!(b"001100000010_00000_000_00000_1110011", "mret", Kind::System),
    form!(b"000100000101_00000_000_00000_1110011", "wfi", Kind::System),

    // Zicsr
    form!(b"cccccccccccc_sssss_001_ddddd_1110011", "csrrw", Kind::Csr),
    form!(b"cccccccccccc_sssss_010_ddddd_1110011", "csrrs", Kind::Csr),
    form!(b"cccccccccccc_sssss_011_ddddd_1110011", "csrrc", Kind::Csr),
    form!(b"cccccccccccc_uuuuu_101_ddddd_1110011", "csrrwi", Kind::CsrImm),
    form!(b"cccccccccccc_uuuuu_110_ddddd_1110011", "csrrsi", Kind::CsrImm),
    form!(b"cccccccccccc_uuuuu_111_ddddd_1110011", "csrrci", Kind::CsrImm),
];

/// Fields pulled out of a word for one instruction family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fields {
    U { rd: u32, imm: u32 },
    J { rd: u32, offset: i32 },
    I { rd: u32, rs1: u32, imm: i32 },
    S { rs1: u32, rs2: u32, imm: i32 },
    B { rs1: u32, rs2: u32, offset: i32 },
    R { rd: u32, rs1: u32, rs2: u32 },
    Shift { rd: u32, rs1: u32, shamt: u32 },
    Csr { rd: u32, src: u32, csr: u32 },
    Fence { pred: u32, succ: u32 },
    None,
}

/// Extract rd field (bits 11:7)
fn rd(insn: u32) -> u32 {
    field(insn, 7, 5)
}

/// Extract rs1 field (bits 19:15)
fn rs1(insn: u32) -> u32 {
    field(insn, 15, 5)
}

/// Extract rs2 field (bits 24:20)
fn rs2(insn: u32) -> u32 {
    field(insn, 20, 5)
}

/// I-type immediate: bits 31:20.
fn imm_i(insn: u32) -> i32 {
    sign_extend(field(insn, 20, 12), 12)
}

/// S-type immediate: bits 31:25 and 11:7.
fn imm_s(insn: u32) -> i32 {
    sign_extend(gather(insn, &[(25, 7, 5), (7, 5, 0)]), 12)
}

/// B-type immediate: imm[12|10:5] in bits 31:25, imm[4:1|11] in bits 11:7.
fn imm_b(insn: u32) -> i32 {
    sign_extend(
        gather(insn, &[(31, 1, 12), (7, 1, 11), (25, 6, 5), (8, 4, 1)]),
        13,
    )
}

/// U-type immediate, already shifted into bits 31:12.
fn imm_u(insn: u32) -> u32 {
    insn & 0xFFFF_F000
}

/// J-type immediate: imm[20|10:1|11|19:12] in bits 31:12.
fn imm_j(insn: u32) -> i32 {
    sign_extend(
        gather(insn, &[(31, 1, 20), (12, 8, 12), (20, 1, 11), (21, 10, 1)]),
        21,
    )
}

impl Kind {
    fn extract(self, insn: u32) -> Fields {
        match self {
            Self::Lui | Self::Auipc => Fields::U {
                rd: rd(insn),
                imm: imm_u(insn),
            },
            Self::Jal => Fields::J {
                rd: rd(insn),
                offset: imm_j(insn),
            },
            Self::Jalr | Self::Load | Self::OpImm => Fields::I {
                rd: rd(insn),
                rs1: rs1(insn),
                imm: imm_i(insn),
            },
            Self::Store => Fields::S {
                rs1: rs1(insn),
                rs2: rs2(insn),
                imm: imm_s(insn),
            },
            Self::Branch => Fields::B {
                rs1: rs1(insn),
                rs2: rs2(insn),
                offset: imm_b(insn),
            },
            Self::Op => Fields::R {
                rd: rd(insn),
                rs1: rs1(insn),
                rs2: rs2(insn),
            },
            Self::ShiftImm => Fields::Shift {
                rd: rd(insn),
                rs1: rs1(insn),
                shamt: field(insn, 20, 5),
            },
            Self::Csr | Self::CsrImm => Fields::Csr {
                rd: rd(insn),
                src: rs1(insn),
                csr: field(insn, 20, 12),
            },
            Self::Fence => Fields::Fence {
                pred: field(insn, 24, 4),
                succ: field(insn, 20, 4),
            },
            Self::FenceI | Self::System => Fields::None,
        }
    }
}

/// Well-known CSR names.
fn csr_name(csr: u32) -> Option<&'static str> {
    Some(match csr {
        0x001 => "fflags",
        0x002 => "frm",
        0x003 => "fcsr",
        0x100 => "sstatus",
        0x105 => "stvec",
        0x141 => "sepc",
        0x142 => "scause",
        0x180 => "satp",
        0x300 => "mstatus",
        0x301 => "misa",
        0x304 => "mie",
        0x305 => "mtvec",
        0x340 => "mscratch",
        0x341 => "mepc",
        0x342 => "mcause",
        0x343 => "mtval",
        0x344 => "mip",
        0xC00 => "cycle",
        0xC01 => "time",
        0xC02 => "instret",
        0xC80 => "cycleh",
        0xC81 => "timeh",
        0xC82 => "instreth",
        0xF11 => "mvendorid",
        0xF12 => "marchid",
        0xF13 => "mimpid",
        0xF14 => "mhartid",
        _ => return None,
    })
}

/// `iorw` letters of a fence predecessor/successor set.
fn fence_set(set: u32) -> String {
    ["i", "o", "r", "w"]
        .iter()
        .enumerate()
        .filter(|(i, _)| set & (8 >> i) != 0)
        .map(|(_, s)| *s)
        .collect()
}

/// RISC-V disassembler (RV32I, Zicsr, M).
#[derive(Debug, Clone, Copy, Default)]
pub struct RiscVDisassembler;

impl RiscVDisassembler {
    /// Creates a new RISC-V disassembler for RV32I.
    pub fn new() -> Self {
        Self
    }

    /// Decodes one 32-bit word at `address`.
    ///
    /// Words that match no known encoding render as a `.word` directive.
    pub fn decode_word(&self, word: u32, address: u64) -> Result<DecodedInstruction, DecodeError> {
        let text = match lookup(FORMS, word) {
            Some(form) => render(form.mnemonic, form.kind.extract(word), address as u32),
            None => data_directive(&word.to_le_bytes()),
        };
        Ok(DecodedInstruction {
            address,
            text: text.into_string(),
            size: 4,
            raw: word,
        })
    }
}

fn render(mnemonic: &str, fields: Fields, pc: u32) -> TextBuffer {
    let mut out = TextBuffer::new();
    let target = |offset: i32| pc.wrapping_add(offset as u32);

    let _ = match (mnemonic, fields) {
        ("lui" | "auipc", Fields::U { rd, imm }) => {
            write!(out, "{} {}, {:#x}", mnemonic, reg(rd), imm >> 12)
        }

        ("jal", Fields::J { rd: 0, offset }) => write!(out, "j {:#x}", target(offset)),
        ("jal", Fields::J { rd: 1, offset }) => write!(out, "jal {:#x}", target(offset)),
        (_, Fields::J { rd, offset }) => {
            write!(out, "{} {}, {:#x}", mnemonic, reg(rd), target(offset))
        }

        ("jalr", Fields::I { rd: 0, rs1: 1, imm: 0 }) => write!(out, "ret"),
        ("jalr", Fields::I { rd: 0, rs1, imm: 0 }) => write!(out, "jr {}", reg(rs1)),
        ("jalr", Fields::I { rd: 1, rs1, imm: 0 }) => write!(out, "jalr {}", reg(rs1)),
        ("jalr", Fields::I { rd, rs1, imm }) => {
            write!(out, "jalr {}, {}({})", reg(rd), imm, reg(rs1))
        }

        (_, Fields::B { rs1, rs2, offset }) => {
            let dest = target(offset);
            match (mnemonic, rs1, rs2) {
                ("beq", _, 0) => write!(out, "beqz {}, {:#x}", reg(rs1), dest),
                ("bne", _, 0) => write!(out, "bnez {}, {:#x}", reg(rs1), dest),
                ("blt", _, 0) => write!(out, "bltz {}, {:#x}", reg(rs1), dest),
                ("bge", _, 0) => write!(out, "bgez {}, {:#x}", reg(rs1), dest),
                ("blt", 0, _) => write!(out, "bgtz {}, {:#x}", reg(rs2), dest),
                ("bge", 0, _) => write!(out, "blez {}, {:#x}", reg(rs2), dest),
                _ => write!(out, "{} {}, {}, {:#x}", mnemonic, reg(rs1), reg(rs2), dest),
            }
        }

        ("addi", Fields::I { rd: 0, rs1: 0, imm: 0 }) => write!(out, "nop"),
        ("addi", Fields::I { rd, rs1: 0, imm }) => write!(out, "li {}, {}", reg(rd), imm),
        ("addi", Fields::I { rd, rs1, imm: 0 }) => write!(out, "mv {}, {}", reg(rd), reg(rs1)),
        ("xori", Fields::I { rd, rs1, imm: -1 }) => write!(out, "not {}, {}", reg(rd), reg(rs1)),
        ("sltiu", Fields::I { rd, rs1, imm: 1 }) => write!(out, "seqz {}, {}", reg(rd), reg(rs1)),
        ("lb" | "lh" | "lw" | "lbu" | "lhu", Fields::I { rd, rs1, imm }) => {
            write!(out, "{} {}, {}({})", mnemonic, reg(rd), imm, reg(rs1))
        }
        (_, Fields::I { rd, rs1, imm }) => {
            write!(out, "{} {}, {}, {}", mnemonic, reg(rd), reg(rs1), imm)
        }

        (_, Fields::S { rs1, rs2, imm }) => {
            write!(out, "{} {}, {}({})", mnemonic, reg(rs2), imm, reg(rs1))
        }

        ("sub", Fields::R { rd, rs1: 0, rs2 }) => write!(out, "neg {}, {}", reg(rd), reg(rs2)),
        ("sltu", Fields::R { rd, rs1: 0, rs2 }) => write!(out, "snez {}, {}", reg(rd), reg(rs2)),
        (_, Fields::R { rd, rs1, rs2 }) => {
            write!(out, "{} {}, {}, {}", mnemonic, reg(rd), reg(rs1), reg(rs2))
        }

        (_, Fields::Shift { rd, rs1, shamt }) => {
            write!(out, "{} {}, {}, {}", mnemonic, reg(rd), reg(rs1), shamt)
        }

        (_, Fields::Csr { rd, src, csr }) => {
            let csr = match csr_name(csr) {
                Some(name) => name.to_string(),
                None => format!("{:#x}", csr),
            };
            let immediate = mnemonic.ends_with('i');
            let src = if immediate {
                src.to_string()
            } else {
                reg(src).to_string()
            };
            match (mnemonic, rd) {
                ("csrrs", _) if src == "zero" => write!(out, "csrr {}, {}", reg(rd), csr),
                ("csrrw", 0) => write!(out, "csrw {}, {}", csr, src),
                ("csrrs", 0) => write!(out, "csrs {}, {}", csr, src),
                ("csrrc", 0) => write!(out, "csrc {}, {}", csr, src),
                ("csrrwi", 0) => write!(out, "csrwi {}, {}", csr, src),
                _ => write!(out, "{} {}, {}, {}", mnemonic, reg(rd), csr, src),
            }
        }

        (_, Fields::Fence { pred: 0xF, succ: 0xF }) => write!(out, "fence"),
        (_, Fields::Fence { pred, succ }) => {
            write!(out, "fence {}, {}", fence_set(pred), fence_set(succ))
        }

        (_, Fields::None) | (_, Fields::U { .. }) => write!(out, "{}", mnemonic),
    };
    out
}

impl Disassembler for RiscVDisassembler {
    fn decode_instruction(
        &mut self,
        bytes: &[u8],
        address: u64,
    ) -> Result<DecodedInstruction, DecodeError> {
        match *bytes {
            [a, b, c, d, ..] => self.decode_word(u32::from_le_bytes([a, b, c, d]), address),
            _ => Err(DecodeError::truncated(address, 4, bytes.len())),
        }
    }

    fn min_instruction_size(&self) -> usize {
        4
    }

    fn max_instruction_size(&self) -> usize {
        4
    }

    fn is_fixed_width(&self) -> bool {
        true
    }

    fn architecture(&self) -> Architecture {
        Architecture::RiscV32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_at(insn: u32, address: u64) -> String {
        RiscVDisassembler::new()
            .decode_word(insn, address)
            .unwrap()
            .text
    }

    fn text(insn: u32) -> String {
        text_at(insn, 0x1000)
    }

    #[test]
    fn test_addi() {
        // addi x1, x0, 42 (li x1, 42)
        let insn: u32 = (42 << 20) | (1 << 7) | 0b0010011;
        assert_eq!(text(insn), "li ra, 42");
        assert_eq!(text(0xFFF5_0513), "addi a0, a0, -1");
        assert_eq!(text(0x0000_0013), "nop");
        assert_eq!(text(0x0005_8513), "mv a0, a1");
    }

    #[test]
    fn test_add_sub() {
        // add x3, x1, x2
        let insn: u32 = ((2 << 20) | (1 << 15)) | (3 << 7) | 0b0110011;
        assert_eq!(text(insn), "add gp, ra, sp");
        assert_eq!(text(0x40C5_8533), "sub a0, a1, a2");
        assert_eq!(text(0x40C0_0533), "neg a0, a2");
    }

    #[test]
    fn test_shift_immediates() {
        assert_eq!(text(0x4035_5513), "srai a0, a0, 3");
        assert_eq!(text(0x0035_1513), "slli a0, a0, 3");
    }

    #[test]
    fn test_m_extension() {
        assert_eq!(text(0x02C5_8533), "mul a0, a1, a2");
        assert_eq!(text(0x02C5_C533), "div a0, a1, a2");
        assert_eq!(text(0x02C5_F533), "remu a0, a1, a2");
    }

    #[test]
    fn test_jal() {
        // jal x0, 0 (j 0x1000 - infinite loop)
        assert_eq!(text(0b1101111), "j 0x1000");
        assert_eq!(text(0x0080_00EF), "jal 0x1008");
        assert_eq!(text(0xFFDF_F06F), "j 0xffc");
        // jal a0, +2048 exercises imm[11] in bit 20.
        assert_eq!(text(0x0010_056F), "jal a0, 0x1800");
    }

    #[test]
    fn test_jalr_forms() {
        assert_eq!(text(0x0000_8067), "ret");
        assert_eq!(text(0x0005_0067), "jr a0");
        assert_eq!(text(0x0005_00E7), "jalr a0");
        assert_eq!(text(0x0085_0567), "jalr a0, 8(a0)");
    }

    #[test]
    fn test_branches() {
        assert_eq!(text(0x0005_1863), "bnez a0, 0x1010");
        // beq x1, x2, +8
        let insn: u32 = (2 << 20) | (1 << 15) | (4 << 8) | 0b1100011;
        assert_eq!(text(insn), "beq ra, sp, 0x1008");
        // blt zero, a0, -4 -> bgtz
        assert_eq!(text(0xFEA0_4EE3), "bgtz a0, 0xffc");
    }

    #[test]
    fn test_branch_wraps_address_space() {
        assert_eq!(text_at(0xFE00_0EE3, 0), "beqz zero, 0xfffffffc");
    }

    #[test]
    fn test_loads_and_stores() {
        assert_eq!(text(0x0081_2503), "lw a0, 8(sp)");
        assert_eq!(text(0x0011_2623), "sw ra, 12(sp)");
        // sb a0, -1(sp): imm[11:5] = 0x7F, imm[4:0] = 0x1F
        assert_eq!(text(0xFEA1_0FA3), "sb a0, -1(sp)");
    }

    #[test]
    fn test_upper_immediates() {
        assert_eq!(text(0x1234_5537), "lui a0, 0x12345");
        assert_eq!(text(0xFFFF_F517), "auipc a0, 0xfffff");
    }

    #[test]
    fn test_system_and_csr() {
        assert_eq!(text(0x0000_0073), "ecall");
        assert_eq!(text(0x0010_0073), "ebreak");
        assert_eq!(text(0x3020_0073), "mret");
        assert_eq!(text(0xF140_2573), "csrr a0, mhartid");
        assert_eq!(text(0x3005_1073), "csrw mstatus, a0");
        assert_eq!(text(0x3004_6573), "csrrsi a0, mstatus, 8");
        assert_eq!(text(0x7C00_1573), "csrrw a0, 0x7c0, zero");
    }

    #[test]
    fn test_fences() {
        assert_eq!(text(0x0FF0_000F), "fence");
        assert_eq!(text(0x0210_000F), "fence r, w");
        assert_eq!(text(0x0000_100F), "fence.i");
    }

    #[test]
    fn test_unknown_word_is_data() {
        assert_eq!(text(0xFFFF_FFFF), ".word 0xffffffff");
        assert_eq!(text(0x0000_0000), ".word 0x00000000");
        // funct7 not defined for OP
        assert_eq!(text(0x2000_0033), ".word 0x20000033");
    }

    #[test]
    fn test_truncated() {
        let mut disasm = RiscVDisassembler::new();
        let err = disasm.decode_instruction(&[0x13, 0x00], 0x40).unwrap_err();
        assert_eq!(err, DecodeError::truncated(0x40, 4, 2));
    }
}
