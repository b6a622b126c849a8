//! ARMv8-M DSP and vector extension table.
//!
//! A compact 16-bit opcode space (`0x4400`-`0x44BB`) carrying DSP and
//! vector mnemonics. Each opcode names exactly one instruction; the
//! operand registers are read from fixed 3-bit fields of the same
//! halfword. The space overlaps real Thumb encodings (high-register
//! `add`), so this decoder is separate from [`ArmDisassembler`] and keeps
//! no state.
//!
//! [`ArmDisassembler`]: crate::ArmDisassembler

use std::fmt::Write;

use crate::table::{form, lookup, Form};
use crate::traits::data_directive;
use crate::{DecodeError, DecodedInstruction, Disassembler};
use mnemo_core::bits::field;
use mnemo_core::register::arm;
use mnemo_core::{Architecture, TextBuffer};

/// Operand layout of a table entry. Numbers are field start bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Reg3 { d: u32, n: u32, m: u32 },
    Reg2 { d: u32, m: u32 },
    /// Two registers and a 5-bit immediate.
    RegImm { d: u32, n: u32, imm: u32 },
    /// `{d0, ...}, [rn]` with rn at bit 5.
    VectorLoad { count: u32 },
    /// `rn!, {s0-s31}` with rn at bit 5.
    LoadMultiple,
    /// `[rn]` with rn at bit 5.
    LazyLoad,
    Fixed(&'static str),
}

const NARROW3: Shape = Shape::Reg3 { d: 8, n: 5, m: 0 };
const WIDE3: Shape = Shape::Reg3 { d: 12, n: 8, m: 0 };

/// Operands extracted from a halfword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operands {
    Three(u32, u32, u32),
    Two(u32, u32),
    WithImm(u32, u32, u32),
    VectorLoad { count: u32, rn: u32 },
    LoadMultiple { rn: u32 },
    LazyLoad { rn: u32 },
    Fixed(&'static str),
}

impl Shape {
    fn extract(self, hw: u32) -> Operands {
        let reg = |pos: u32| field(hw, pos, 3);
        match self {
            Self::Reg3 { d, n, m } => Operands::Three(reg(d), reg(n), reg(m)),
            Self::Reg2 { d, m } => Operands::Two(reg(d), reg(m)),
            Self::RegImm { d, n, imm } => Operands::WithImm(reg(d), reg(n), field(hw, imm, 5)),
            Self::VectorLoad { count } => Operands::VectorLoad { count, rn: reg(5) },
            Self::LoadMultiple => Operands::LoadMultiple { rn: reg(5) },
            Self::LazyLoad => Operands::LazyLoad { rn: reg(5) },
            Self::Fixed(text) => Operands::Fixed(text),
        }
    }
}

static FORMS: &[Form<Shape>] = &[
    form!(b"0100_0100_0000_0000", "pkhbt", Shape::RegImm { d: 8, n: 5, imm: 0 }),
    form!(b"0100_0100_0000_0001", "pkhtb", Shape::RegImm { d: 8, n: 5, imm: 0 }),
    form!(b"0100_0100_0000_0010", "qadd", NARROW3),
    form!(b"0100_0100_0000_0011", "qadd16", NARROW3),
    form!(b"0100_0100_0000_0100", "qadd8", NARROW3),
    form!(b"0100_0100_0000_0101", "qasx", NARROW3),
    form!(b"0100_0100_0000_0110", "qdadd", NARROW3),
    form!(b"0100_0100_0000_0111", "qdsub", NARROW3),
    form!(b"0100_0100_0000_1000", "sadd16", NARROW3),
    form!(b"0100_0100_0000_1001", "sadd8", NARROW3),
    form!(b"0100_0100_0000_1010", "sasx", NARROW3),
    form!(b"0100_0100_0000_1011", "sel", NARROW3),
    form!(b"0100_0100_0000_1100", "shadd16", NARROW3),
    form!(b"0100_0100_0000_1101", "shadd8", NARROW3),
    form!(b"0100_0100_0000_1110", "shasx", NARROW3),
    form!(b"0100_0100_0000_1111", "shsax", NARROW3),
    form!(b"0100_0100_0001_0000", "shsub16", NARROW3),
    form!(b"0100_0100_0001_0001", "shsub8", NARROW3),
    form!(b"0100_0100_0010_0000", "smlal", WIDE3),
    form!(b"0100_0100_0010_0001", "smlalbb", WIDE3),
    form!(b"0100_0100_0010_0010", "smlalbt", WIDE3),
    form!(b"0100_0100_0010_0011", "smlalt", WIDE3),
    form!(b"0100_0100_0010_0100", "smlaltb", WIDE3),
    form!(b"0100_0100_0010_0101", "smlawb", NARROW3),
    form!(b"0100_0100_0010_0110", "smlawt", NARROW3),
    form!(b"0100_0100_0010_0111", "smlsd", NARROW3),
    form!(b"0100_0100_0010_1000", "smlsdx", NARROW3),
    form!(b"0100_0100_0010_1001", "smlsld", NARROW3),
    form!(b"0100_0100_0010_1010", "smlsldx", NARROW3),
    form!(b"0100_0100_0010_1011", "smmla", NARROW3),
    form!(b"0100_0100_0010_1100", "smmlar", NARROW3),
    form!(b"0100_0100_0010_1101", "smmul", NARROW3),
    form!(b"0100_0100_0010_1110", "smmulr", NARROW3),
    form!(b"0100_0100_0010_1111", "smuad", NARROW3),
    form!(b"0100_0100_0011_0000", "smuadx", NARROW3),
    form!(b"0100_0100_0011_0001", "smulbb", NARROW3),
    form!(b"0100_0100_0011_0010", "smulbt", NARROW3),
    form!(b"0100_0100_0011_0011", "smultb", NARROW3),
    form!(b"0100_0100_0011_0100", "smultt", NARROW3),
    form!(b"0100_0100_0011_0101", "smulwb", NARROW3),
    form!(b"0100_0100_0011_0110", "smulwt", NARROW3),
    form!(b"0100_0100_0011_0111", "pkabs", Shape::Reg2 { d: 8, m: 0 }),
    form!(b"0100_0100_0011_1000", "pkadd", NARROW3),
    form!(b"0100_0100_0011_1001", "pksub", NARROW3),
    form!(b"0100_0100_0011_1010", "qsub", NARROW3),
    form!(b"0100_0100_0011_1011", "qsub16", NARROW3),
    form!(b"0100_0100_0011_1100", "qsub8", NARROW3),
    form!(b"0100_0100_0011_1101", "sbc", NARROW3),
    form!(b"0100_0100_0011_1110", "sbfx", Shape::RegImm { d: 8, n: 5, imm: 0 }),
    form!(b"0100_0100_0011_1111", "sdiv", NARROW3),
    form!(b"0100_0100_0100_0000", "ssat", Shape::RegImm { d: 8, n: 0, imm: 5 }),
    form!(b"0100_0100_0100_0001", "ssat16", Shape::RegImm { d: 8, n: 0, imm: 5 }),
    form!(b"0100_0100_0100_0010", "ssax", NARROW3),
    form!(b"0100_0100_0100_0011", "ssub16", NARROW3),
    form!(b"0100_0100_0100_0100", "ssub8", NARROW3),
    form!(b"0100_0100_0100_0101", "uadd16", NARROW3),
    form!(b"0100_0100_0100_0110", "uadd8", NARROW3),
    form!(b"0100_0100_0100_0111", "uasx", NARROW3),
    form!(b"0100_0100_0100_1000", "ubfx", Shape::RegImm { d: 8, n: 5, imm: 0 }),
    form!(b"0100_0100_0100_1001", "udiv", NARROW3),
    form!(b"0100_0100_0100_1010", "uhadd16", NARROW3),
    form!(b"0100_0100_0100_1011", "uhadd8", NARROW3),
    form!(b"0100_0100_0100_1100", "uhasx", NARROW3),
    form!(b"0100_0100_0100_1101", "uhsax", NARROW3),
    form!(b"0100_0100_0100_1110", "uhsub16", NARROW3),
    form!(b"0100_0100_0100_1111", "uhsub8", NARROW3),
    form!(b"0100_0100_0101_0000", "umaal", WIDE3),
    form!(b"0100_0100_0101_0001", "umlal", WIDE3),
    form!(b"0100_0100_0101_0010", "umlsl", WIDE3),
    form!(b"0100_0100_0101_0011", "umull", WIDE3),
    form!(b"0100_0100_0101_0100", "uqadd16", NARROW3),
    form!(b"0100_0100_0101_0101", "uqadd8", NARROW3),
    form!(b"0100_0100_0101_0110", "uqasx", NARROW3),
    form!(b"0100_0100_0101_0111", "uqsub16", NARROW3),
    form!(b"0100_0100_0101_1000", "uqsub8", NARROW3),
    form!(b"0100_0100_0101_1001", "usad8", NARROW3),
    form!(b"0100_0100_0101_1010", "usada8", NARROW3),
    form!(b"0100_0100_0101_1011", "usat", Shape::RegImm { d: 8, n: 0, imm: 5 }),
    form!(b"0100_0100_0101_1100", "usat16", Shape::RegImm { d: 8, n: 0, imm: 5 }),
    form!(b"0100_0100_0101_1101", "usax", NARROW3),
    form!(b"0100_0100_0101_1110", "usub16", NARROW3),
    form!(b"0100_0100_0101_1111", "usub8", NARROW3),
    form!(b"0100_0100_0110_0000", "uxtab", NARROW3),
    form!(b"0100_0100_0110_0001", "uxtab16", NARROW3),
    form!(b"0100_0100_0110_0010", "uxtah", NARROW3),
    form!(b"0100_0100_0110_0011", "vaba.s16", WIDE3),
    form!(b"0100_0100_0110_0100", "vabd.s16", WIDE3),
    form!(b"0100_0100_0110_0101", "vabs.s16", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_0110_0110", "vacge.f32", WIDE3),
    form!(b"0100_0100_0110_0111", "vacgt.f32", WIDE3),
    form!(b"0100_0100_0110_1000", "vacle.f32", WIDE3),
    form!(b"0100_0100_0110_1001", "vaclt.f32", WIDE3),
    form!(b"0100_0100_0110_1010", "vadd.i16", WIDE3),
    form!(b"0100_0100_0110_1011", "vaddl.s16", WIDE3),
    form!(b"0100_0100_0110_1100", "vaddw.s16", WIDE3),
    form!(b"0100_0100_0110_1101", "vand", WIDE3),
    form!(b"0100_0100_0110_1110", "vbic", WIDE3),
    form!(b"0100_0100_0110_1111", "vbif", WIDE3),
    form!(b"0100_0100_0111_0000", "vbit", WIDE3),
    form!(b"0100_0100_0111_0001", "vbsl", WIDE3),
    form!(b"0100_0100_0111_0010", "vceq.i16", WIDE3),
    form!(b"0100_0100_0111_0011", "vcge.s16", WIDE3),
    form!(b"0100_0100_0111_0100", "vcgt.s16", WIDE3),
    form!(b"0100_0100_0111_0101", "vcle.s16", WIDE3),
    form!(b"0100_0100_0111_0110", "vclt.s16", WIDE3),
    form!(b"0100_0100_0111_0111", "vclz.i16", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_0111_1000", "vcmp.f32", WIDE3),
    form!(b"0100_0100_0111_1001", "vcmpe.f32", WIDE3),
    form!(b"0100_0100_0111_1010", "vcnt.8", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_0111_1011", "vdiv.f32", WIDE3),
    form!(b"0100_0100_0111_1100", "vdup.16", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_0111_1101", "veor", WIDE3),
    form!(b"0100_0100_0111_1110", "vext.8", Shape::RegImm { d: 12, n: 8, imm: 0 }),
    form!(b"0100_0100_0111_1111", "vhadd.s16", WIDE3),
    form!(b"0100_0100_1000_0000", "vhsub.s16", WIDE3),
    form!(b"0100_0100_1000_0001", "vld1.16", Shape::VectorLoad { count: 1 }),
    form!(b"0100_0100_1000_0010", "vld2.16", Shape::VectorLoad { count: 2 }),
    form!(b"0100_0100_1000_0011", "vld3.16", Shape::VectorLoad { count: 3 }),
    form!(b"0100_0100_1000_0100", "vld4.16", Shape::VectorLoad { count: 4 }),
    form!(b"0100_0100_1000_0101", "vldm", Shape::LoadMultiple),
    form!(b"0100_0100_1000_0110", "vlla", Shape::LazyLoad),
    form!(b"0100_0100_1000_0111", "vmax.s16", WIDE3),
    form!(b"0100_0100_1000_1000", "vmaxa.s16", WIDE3),
    form!(b"0100_0100_1000_1001", "vmin.s16", WIDE3),
    form!(b"0100_0100_1000_1010", "vmina.s16", WIDE3),
    form!(b"0100_0100_1000_1011", "vmla.i16", WIDE3),
    form!(b"0100_0100_1000_1100", "vmlal.s16", WIDE3),
    form!(b"0100_0100_1000_1101", "vmls.i16", WIDE3),
    form!(b"0100_0100_1000_1110", "vmlsl.s16", WIDE3),
    form!(b"0100_0100_1000_1111", "vmov.i16", Shape::RegImm { d: 12, n: 0, imm: 5 }),
    form!(b"0100_0100_1001_0000", "vmovl.s16", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1001_0001", "vmovn.i16", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1001_0010", "vmrs", Shape::Fixed("r0, fpscr")),
    form!(b"0100_0100_1001_0011", "vmsr", Shape::Fixed("fpscr, r0")),
    form!(b"0100_0100_1001_0100", "vmul.i16", WIDE3),
    form!(b"0100_0100_1001_0101", "vmull.s16", WIDE3),
    form!(b"0100_0100_1001_0110", "vmvn", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1001_0111", "vneg.s16", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1001_1000", "vnmla.f32", WIDE3),
    form!(b"0100_0100_1001_1001", "vnmls.f32", WIDE3),
    form!(b"0100_0100_1001_1010", "vnmlal.s16", WIDE3),
    form!(b"0100_0100_1001_1011", "vnmlsl.s16", WIDE3),
    form!(b"0100_0100_1001_1100", "vnmul.f32", WIDE3),
    form!(b"0100_0100_1001_1101", "vpadal.s16", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1001_1110", "vpadd.i16", WIDE3),
    form!(b"0100_0100_1001_1111", "vpaddl.s16", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1010_0000", "vpmin.s16", WIDE3),
    form!(b"0100_0100_1010_0001", "vpmax.s16", WIDE3),
    form!(b"0100_0100_1010_0010", "vqadd.s16", WIDE3),
    form!(b"0100_0100_1010_0011", "vqsub.s16", WIDE3),
    form!(b"0100_0100_1010_0100", "vraddhn.i16", WIDE3),
    form!(b"0100_0100_1010_0101", "vrecpe.u32", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1010_0110", "vrecps.f32", WIDE3),
    form!(b"0100_0100_1010_0111", "vrsqrte.u32", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1010_1000", "vrsqrts.f32", WIDE3),
    form!(b"0100_0100_1010_1001", "vshl.i16", Shape::RegImm { d: 12, n: 8, imm: 0 }),
    form!(b"0100_0100_1010_1010", "vshll.s16", Shape::RegImm { d: 12, n: 8, imm: 0 }),
    form!(b"0100_0100_1010_1011", "vshr.s16", Shape::RegImm { d: 12, n: 8, imm: 0 }),
    form!(b"0100_0100_1010_1100", "vrev16.8", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1010_1101", "vrev32.8", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1010_1110", "vrev64.8", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1010_1111", "vsri.16", Shape::RegImm { d: 12, n: 8, imm: 0 }),
    form!(b"0100_0100_1011_0000", "vsli.16", Shape::RegImm { d: 12, n: 8, imm: 0 }),
    form!(b"0100_0100_1011_0001", "vsra.s16", Shape::RegImm { d: 12, n: 8, imm: 0 }),
    form!(b"0100_0100_1011_0010", "vsub.i16", WIDE3),
    form!(b"0100_0100_1011_0011", "vsubl.s16", WIDE3),
    form!(b"0100_0100_1011_0100", "vsubw.s16", WIDE3),
    form!(b"0100_0100_1011_0101", "vswp", WIDE3),
    form!(b"0100_0100_1011_0110", "vtbl.8", WIDE3),
    form!(b"0100_0100_1011_0111", "vtbx.8", WIDE3),
    form!(b"0100_0100_1011_1000", "vtrn.16", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1011_1001", "vtst.8", WIDE3),
    form!(b"0100_0100_1011_1010", "vuzp.16", Shape::Reg2 { d: 12, m: 0 }),
    form!(b"0100_0100_1011_1011", "vzip.16", Shape::Reg2 { d: 12, m: 0 }),
];

/// Decoder for the ARMv8-M extension table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Armv8mDisassembler;

impl Armv8mDisassembler {
    pub fn new() -> Self {
        Self
    }

    /// Decodes one halfword.
    ///
    /// Opcodes outside the table render as a `.short` directive.
    pub fn decode_halfword(
        &self,
        hw: u16,
        address: u64,
    ) -> Result<DecodedInstruction, DecodeError> {
        let raw = u32::from(hw);
        let text = match lookup(FORMS, raw) {
            Some(form) => render(form.mnemonic, form.kind.extract(raw)),
            None => data_directive(&hw.to_le_bytes()),
        };
        Ok(DecodedInstruction {
            address,
            text: text.into_string(),
            size: 2,
            raw,
        })
    }
}

fn render(mnemonic: &str, operands: Operands) -> TextBuffer {
    let mut text = TextBuffer::new();
    let r = arm::name;
    let _ = match operands {
        Operands::Three(d, n, m) => write!(text, "{} {}, {}, {}", mnemonic, r(d), r(n), r(m)),
        Operands::Two(d, m) => write!(text, "{} {}, {}", mnemonic, r(d), r(m)),
        Operands::WithImm(d, n, imm) => write!(text, "{} {}, {}, #{}", mnemonic, r(d), r(n), imm),
        Operands::VectorLoad { count, rn } => {
            let _ = write!(text, "{} {{", mnemonic);
            for i in 0..count {
                let _ = write!(text, "{}d{}", if i == 0 { "" } else { ", " }, i);
            }
            write!(text, "}}, [{}]", r(rn))
        }
        Operands::LoadMultiple { rn } => write!(text, "{} {}!, {{s0-s31}}", mnemonic, r(rn)),
        Operands::LazyLoad { rn } => write!(text, "{} [{}]", mnemonic, r(rn)),
        Operands::Fixed(ops) => write!(text, "{} {}", mnemonic, ops),
    };
    text
}

impl Disassembler for Armv8mDisassembler {
    fn decode_instruction(
        &mut self,
        bytes: &[u8],
        address: u64,
    ) -> Result<DecodedInstruction, DecodeError> {
        match *bytes {
            [lo, hi, ..] => self.decode_halfword(u16::from_le_bytes([lo, hi]), address),
            _ => Err(DecodeError::truncated(address, 2, bytes.len())),
        }
    }

    fn min_instruction_size(&self) -> usize {
        2
    }

    fn max_instruction_size(&self) -> usize {
        2
    }

    fn is_fixed_width(&self) -> bool {
        true
    }

    fn architecture(&self) -> Architecture {
        Architecture::Armv8m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WalkControl, WalkOutcome};

    fn text(hw: u16) -> String {
        Armv8mDisassembler::new()
            .decode_halfword(hw, 0)
            .unwrap()
            .text
    }

    #[test]
    fn test_vaba() {
        // rd at bit 12, rn at bit 8, rm at bit 0, each three bits wide.
        assert_eq!(text(0x4463), "vaba.s16 r4, r4, r3");
    }

    #[test]
    fn test_narrow_register_layout() {
        // 0x4402: rd = 4, rn = 0, rm = 2.
        assert_eq!(text(0x4402), "qadd r4, r0, r2");
    }

    #[test]
    fn test_immediate_forms() {
        assert_eq!(text(0x4401), "pkhtb r4, r0, #1");
        // ssat: rd at 8, rn at 0, imm at 5.
        assert_eq!(text(0x4440), "ssat r4, r0, #2");
    }

    #[test]
    fn test_fixed_and_memory_forms() {
        assert_eq!(text(0x4492), "vmrs r0, fpscr");
        assert_eq!(text(0x4493), "vmsr fpscr, r0");
        assert_eq!(text(0x4482), "vld2.16 {d0, d1}, [r4]");
        assert_eq!(text(0x4485), "vldm r4!, {s0-s31}");
    }

    #[test]
    fn test_table_bounds() {
        assert_eq!(text(0x44BB), "vzip.16 r4, r3");
        assert_eq!(text(0x4412), ".short 0x4412");
        assert_eq!(text(0x44BC), ".short 0x44bc");
        assert_eq!(text(0x0000), ".short 0x0000");
    }

    #[test]
    fn test_walk_by_halfwords() {
        let mut disasm = Armv8mDisassembler::new();
        let mut lines = Vec::new();
        let outcome = disasm
            .disassemble_buffer(&[0x63, 0x44, 0x01, 0x44, 0xFF], 0x100, |addr, text| {
                lines.push((addr, text.to_string()));
                WalkControl::Continue
            })
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], (0x102, "pkhtb r4, r0, #1".to_string()));
        assert_eq!(
            outcome,
            WalkOutcome::Incomplete {
                address: 0x104,
                needed: 2,
                available: 1
            }
        );
    }
}
