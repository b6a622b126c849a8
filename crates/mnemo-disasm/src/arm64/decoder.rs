//! ARM64 instruction decoder implementation.

use std::fmt::{self, Write};

use crate::table::{lookup, Form};
use crate::traits::data_directive;
use crate::{DecodeError, DecodedInstruction, Disassembler};
use mnemo_core::bits::field;
use mnemo_core::{Architecture, Condition, MemoryRef, Operand, Register, TextBuffer};

use super::{branch, dp_imm, dp_reg, fp, ldst};

/// Top-level encoding group selected by `op0` (bits 28:25).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// `op0 == 0`: `udf` and reserved space.
    Reserved,
    /// `op0` in `1..=3`.
    Unallocated,
    DataProcessingImmediate,
    BranchExceptionSystem,
    LoadStore,
    DataProcessingRegister,
    SimdFp,
}

impl Group {
    /// Classifies a word by its `op0` field.
    pub fn of(word: u32) -> Self {
        let op0 = field(word, 25, 4);
        match op0 {
            0 => Self::Reserved,
            1..=3 => Self::Unallocated,
            _ if op0 >> 1 == 0b100 => Self::DataProcessingImmediate,
            _ if op0 >> 1 == 0b101 => Self::BranchExceptionSystem,
            _ if op0 & !0b1010 == 0b0100 => Self::LoadStore,
            _ if op0 & !0b1000 == 0b0101 => Self::DataProcessingRegister,
            _ => Self::SimdFp,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Unallocated => "unallocated",
            Self::DataProcessingImmediate => "data processing (immediate)",
            Self::BranchExceptionSystem => "branches, exception generation and system",
            Self::LoadStore => "loads and stores",
            Self::DataProcessingRegister => "data processing (register)",
            Self::SimdFp => "SIMD and floating point",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded ARM64 instruction.
///
/// Owns its text, the named raw fields that were extracted and the
/// structured operands; dropping the record releases all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Arm64Instruction {
    pub address: u64,
    pub raw: u32,
    pub group: Group,
    /// Rendered text, or a `.long` directive for unallocated encodings.
    pub text: String,
    /// Raw fields in extraction order, e.g. `("rd", 0)`.
    pub fields: Vec<(&'static str, u32)>,
    pub operands: Vec<Operand>,
    /// Condition of conditional branches, selects and compares.
    pub condition: Option<Condition>,
}

impl Arm64Instruction {
    /// Looks up an extracted field by name.
    pub fn field(&self, name: &str) -> Option<u32> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, v)| v)
    }

    /// Returns true if the word was not recognised and rendered as data.
    pub fn is_data(&self) -> bool {
        self.text.starts_with(".long")
    }
}

impl From<Arm64Instruction> for DecodedInstruction {
    fn from(insn: Arm64Instruction) -> Self {
        Self {
            address: insn.address,
            text: insn.text,
            size: 4,
            raw: insn.raw,
        }
    }
}

/// Accumulates the text, fields and operands of one instruction.
pub(super) struct Builder {
    word: u32,
    text: TextBuffer,
    fields: Vec<(&'static str, u32)>,
    operands: Vec<Operand>,
    condition: Option<Condition>,
    count: usize,
}

impl Builder {
    fn new(word: u32) -> Self {
        Self {
            word,
            text: TextBuffer::new(),
            fields: Vec::new(),
            operands: Vec::new(),
            condition: None,
            count: 0,
        }
    }

    /// Extracts and records a named field.
    pub(super) fn field(&mut self, name: &'static str, start: u32, len: u32) -> u32 {
        let value = field(self.word, start, len);
        self.fields.push((name, value));
        value
    }

    pub(super) fn mnemonic(&mut self, mnemonic: &str) {
        let _ = self.text.write_str(mnemonic);
    }

    /// Writes `prefix.cond` (e.g. `b.ne`) and records the condition.
    pub(super) fn cond_mnemonic(&mut self, prefix: &str, cond: Condition) {
        let _ = write!(self.text, "{}.{}", prefix, cond.name());
        self.condition = Some(cond);
    }

    fn separator(&mut self) {
        let sep = if self.count == 0 { " " } else { ", " };
        let _ = self.text.write_str(sep);
        self.count += 1;
    }

    pub(super) fn operand(&mut self, operand: Operand) {
        self.separator();
        let _ = write!(self.text, "{}", operand);
        self.operands.push(operand);
    }

    pub(super) fn reg(&mut self, reg: Register) {
        self.operand(Operand::reg(reg));
    }

    pub(super) fn imm(&mut self, value: u64) {
        self.operand(Operand::imm_unsigned(value, 64));
    }

    pub(super) fn simm(&mut self, value: i64) {
        self.operand(Operand::imm(value, 64));
    }

    pub(super) fn target(&mut self, address: u64, target: u64) {
        self.operand(Operand::pc_rel(target.wrapping_sub(address) as i64, target));
    }

    pub(super) fn mem(&mut self, mem: MemoryRef) {
        self.operand(Operand::Memory(mem));
    }

    /// Records `operand` but renders `text` in its place, for forms whose
    /// syntax the operand model does not capture (extended index registers).
    pub(super) fn operand_as(&mut self, operand: Operand, text: &str) {
        self.separator();
        let _ = self.text.write_str(text);
        self.operands.push(operand);
    }

    /// Appends text that has no structured operand (shifts, barrier
    /// options, register lists, system register names).
    pub(super) fn text(&mut self, text: &str) {
        self.separator();
        let _ = self.text.write_str(text);
    }

    /// Appends a condition name as the last operand.
    pub(super) fn condition(&mut self, cond: Condition) {
        self.text(cond.name());
        self.condition = Some(cond);
    }

    /// Appends `, <shift> #amount` unless the amount is zero.
    pub(super) fn shift(&mut self, kind: &str, amount: u32) {
        if amount != 0 {
            self.text(&format!("{} #{}", kind, amount));
        }
    }
}

/// Decodes the bitmask immediate of logical instructions.
///
/// Returns `None` for reserved encodings.
pub(super) fn decode_bitmask_imm(n: u32, imms: u32, immr: u32, is_64bit: bool) -> Option<u64> {
    let combined = (n << 6) | (!imms & 0x3F);
    if combined == 0 {
        return None;
    }
    let len = 31 - combined.leading_zeros();
    if len < 1 || (!is_64bit && n == 1) {
        return None;
    }
    let size = 1u32 << len;
    let levels = size - 1;
    let s = imms & levels;
    let r = immr & levels;
    if s == levels {
        return None;
    }

    let ones = (1u64 << (s + 1)) - 1;
    let element = if size == 64 {
        ones.rotate_right(r)
    } else {
        let mask = (1u64 << size) - 1;
        ((ones >> r) | (ones << ((size - r) % size))) & mask
    };

    let reg_size = if is_64bit { 64 } else { 32 };
    let mut result = 0u64;
    let mut pos = 0;
    while pos < reg_size {
        result |= element << pos;
        pos += size;
    }
    Some(result)
}

/// ARM64 disassembler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Arm64Disassembler;

impl Arm64Disassembler {
    /// Creates a new ARM64 disassembler.
    pub fn new() -> Self {
        Self
    }

    /// Decodes one instruction word at `address`.
    ///
    /// Unrecognised words come back as a `.long` directive; only the
    /// reserved group with nonzero bits 24:16 is an error.
    pub fn disassemble(&self, word: u32, address: u64) -> Result<Arm64Instruction, DecodeError> {
        let group = Group::of(word);
        let mut builder = Builder::new(word);

        let rendered = match group {
            Group::Reserved => {
                let op1 = field(word, 16, 9);
                if op1 != 0 {
                    return Err(DecodeError::invalid_encoding(
                        address,
                        word,
                        format!("reserved group with op1 {:#x}", op1),
                    ));
                }
                builder.mnemonic("udf");
                let imm16 = builder.field("imm16", 0, 16);
                builder.imm(u64::from(imm16));
                Some(())
            }
            Group::Unallocated => None,
            Group::DataProcessingImmediate => {
                dispatch(dp_imm::FORMS, dp_imm::render, word, address, &mut builder)
            }
            Group::BranchExceptionSystem => {
                dispatch(branch::FORMS, branch::render, word, address, &mut builder)
            }
            Group::LoadStore => dispatch(ldst::FORMS, ldst::render, word, address, &mut builder),
            Group::DataProcessingRegister => {
                dispatch(dp_reg::FORMS, dp_reg::render, word, address, &mut builder)
            }
            Group::SimdFp => dispatch(fp::FORMS, fp::render, word, address, &mut builder),
        };

        Ok(match rendered {
            Some(()) => Arm64Instruction {
                address,
                raw: word,
                group,
                text: builder.text.into_string(),
                fields: builder.fields,
                operands: builder.operands,
                condition: builder.condition,
            },
            None => Arm64Instruction {
                address,
                raw: word,
                group,
                text: data_directive_long(word),
                fields: Vec::new(),
                operands: Vec::new(),
                condition: None,
            },
        })
    }
}

type Render<K> = fn(&Form<K>, u32, u64, &mut Builder) -> Option<()>;

fn dispatch<K>(
    forms: &'static [Form<K>],
    render: Render<K>,
    word: u32,
    address: u64,
    builder: &mut Builder,
) -> Option<()> {
    let form = lookup(forms, word)?;
    render(form, word, address, builder)
}

fn data_directive_long(word: u32) -> String {
    let text = data_directive(&word.to_le_bytes());
    // A64 assemblers spell the 32-bit directive `.long`.
    text.as_str().replacen(".word", ".long", 1)
}

impl Disassembler for Arm64Disassembler {
    fn decode_instruction(
        &mut self,
        bytes: &[u8],
        address: u64,
    ) -> Result<DecodedInstruction, DecodeError> {
        match *bytes {
            [a, b, c, d, ..] => self
                .disassemble(u32::from_le_bytes([a, b, c, d]), address)
                .map(DecodedInstruction::from),
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
        Architecture::Arm64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WalkControl, WalkOutcome};

    fn text(word: u32) -> String {
        Arm64Disassembler::new().disassemble(word, 0x1000).unwrap().text
    }

    #[test]
    fn test_group_classification() {
        assert_eq!(Group::of(0x0000_0000), Group::Reserved);
        assert_eq!(Group::of(0x0200_0000), Group::Unallocated);
        assert_eq!(Group::of(0x9100_0000), Group::DataProcessingImmediate);
        assert_eq!(Group::of(0xD65F_03C0), Group::BranchExceptionSystem);
        assert_eq!(Group::of(0xF940_0000), Group::LoadStore);
        assert_eq!(Group::of(0x8B00_0000), Group::DataProcessingRegister);
        assert_eq!(Group::of(0x1E20_2800), Group::SimdFp);
    }

    #[test]
    fn test_udf() {
        let insn = Arm64Disassembler::new().disassemble(0x0000_002A, 0).unwrap();
        assert_eq!(insn.text, "udf #0x2a");
        assert_eq!(insn.field("imm16"), Some(0x2A));
        assert_eq!(insn.group, Group::Reserved);
    }

    #[test]
    fn test_reserved_with_op1_is_invalid() {
        let err = Arm64Disassembler::new()
            .disassemble(0x0001_0000, 0x40)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidEncoding {
                address: 0x40,
                raw: 0x0001_0000,
                ..
            }
        ));
    }

    #[test]
    fn test_unallocated_is_data() {
        let insn = Arm64Disassembler::new().disassemble(0x0200_0000, 0).unwrap();
        assert_eq!(insn.text, ".long 0x02000000");
        assert!(insn.is_data());
        assert!(insn.fields.is_empty());
    }

    #[test]
    fn test_nop_and_ret() {
        assert_eq!(text(0xD503_201F), "nop");
        assert_eq!(text(0xD65F_03C0), "ret");
    }

    #[test]
    fn test_bitmask_immediates() {
        assert_eq!(decode_bitmask_imm(0, 0b111100, 0, false), Some(0x5555_5555));
        assert_eq!(decode_bitmask_imm(1, 0b000111, 0, true), Some(0xFF));
        assert_eq!(decode_bitmask_imm(0, 0b011111, 0, false), None);
        assert_eq!(decode_bitmask_imm(1, 0b111111, 0, true), None);
        assert_eq!(decode_bitmask_imm(1, 0, 0, false), None);
        // 0b0011 rotated right by one, repeated in 4-bit elements.
        assert_eq!(
            decode_bitmask_imm(0, 0b111001, 1, true),
            Some(0x9999_9999_9999_9999)
        );
    }

    #[test]
    fn test_walk_stops_at_reserved() {
        let mut disasm = Arm64Disassembler::new();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0xD503_201Fu32.to_le_bytes());
        bytes.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        bytes.extend_from_slice(&0xD503_201Fu32.to_le_bytes());
        let mut seen = 0;
        let result = disasm.disassemble_buffer(&bytes, 0, |_, _| {
            seen += 1;
            WalkControl::Continue
        });
        assert!(matches!(
            result,
            Err(DecodeError::InvalidEncoding { address: 4, .. })
        ));
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_walk_completes() {
        let mut disasm = Arm64Disassembler::new();
        let bytes: Vec<u8> = [0xD503_201Fu32, 0x0200_0000, 0xD65F_03C0]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect();
        let mut lines = Vec::new();
        let outcome = disasm
            .disassemble_buffer(&bytes, 0x4000, |addr, text| {
                lines.push(format!("{:x}: {}", addr, text));
                WalkControl::Continue
            })
            .unwrap();
        assert_eq!(outcome, WalkOutcome::Completed);
        assert_eq!(
            lines,
            vec!["4000: nop", "4004: .long 0x02000000", "4008: ret"]
        );
    }
}
