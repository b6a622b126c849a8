//! 32-bit ARM decoder: A32, Thumb and Thumb2.
//!
//! Unlike the other decoders this one keeps state between instructions:
//! - the execution mode (A32 or Thumb), switched by code symbols
//! - the IT block opened by a Thumb2 `it` instruction
//! - symbols, code/literal pool ranges and literal data supplied by the
//!   caller, used to annotate branch targets and PC-relative loads
//!
//! Literal loads register the loaded range as a literal pool, so a later
//! walk over the same bytes renders the pool as data instead of decoding
//! it.

mod a32;
mod format;
mod it;
mod thumb;
mod thumb2;

pub use it::ItState;

use std::fmt::{self, Write};

use crate::traits::data_directive;
use crate::walk::{WalkControl, WalkOutcome};
use crate::{DecodeError, DecodedInstruction, Disassembler};
use format::{Line, Target};
use mnemo_core::{
    Architecture, CodePool, Error, FormatFlags, LiteralStore, Mode, PoolKind, SymbolKind,
    SymbolTable, TextBuffer,
};

/// Width of the raw-encoding column.
const RAW_COLUMN: usize = 11;
/// Comments start this many columns after the instruction text begins.
const COMMENT_COLUMN: usize = 28;

/// How an instruction was encoded, for the raw column and fallbacks.
#[derive(Debug, Clone, Copy)]
enum Encoding {
    Arm(u32),
    Narrow(u16),
    Wide(u16, u16),
}

impl Encoding {
    fn raw(self) -> u32 {
        match self {
            Self::Arm(word) => word,
            Self::Narrow(hw) => u32::from(hw),
            Self::Wide(hw1, hw2) => (u32::from(hw1) << 16) | u32::from(hw2),
        }
    }

    fn size(self) -> usize {
        match self {
            Self::Narrow(_) => 2,
            Self::Arm(_) | Self::Wide(..) => 4,
        }
    }

    /// Directive written for an encoding without a form.
    fn fallback(self) -> String {
        match self {
            Self::Arm(word) => format!(".word 0x{:08x}", word),
            Self::Narrow(hw) => format!(".short 0x{:04x}", hw),
            Self::Wide(..) => format!(".inst.w 0x{:08x}", self.raw()),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Arm(word) => write!(f, "{:08x}", word),
            Self::Narrow(hw) => write!(f, "{:04x}", hw),
            Self::Wide(hw1, hw2) => write!(f, "{:04x} {:04x}", hw1, hw2),
        }
    }
}

/// Decode context for 32-bit ARM code.
///
/// One context decodes one instruction stream. IT and pending literal
/// state are cleared by [`reset_state`](Self::reset_state), which every
/// buffer walk calls first; symbols, pools and literal blocks persist
/// until the caller clears them.
#[derive(Debug, Clone)]
pub struct ArmDisassembler {
    mode: Mode,
    format: FormatFlags,
    it: ItState,
    /// Literal range `(address, size)` read by the instruction being
    /// decoded, registered as a pool once it completes.
    pending_literal: Option<(u32, u32)>,
    symbols: SymbolTable,
    pools: CodePool,
    literals: LiteralStore,
    address: u32,
}

impl Default for ArmDisassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ArmDisassembler {
    /// Creates a Thumb-mode context that appends comments.
    pub fn new() -> Self {
        Self::with_format(FormatFlags::COMMENT)
    }

    pub fn with_format(format: FormatFlags) -> Self {
        Self {
            mode: Mode::default(),
            format,
            it: ItState::default(),
            pending_literal: None,
            symbols: SymbolTable::new(),
            pools: CodePool::new(),
            literals: LiteralStore::new(),
            address: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches between A32 and Thumb. Any open IT block is dropped.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.it.reset();
    }

    pub fn format(&self) -> FormatFlags {
        self.format
    }

    pub fn set_format(&mut self, format: FormatFlags) {
        self.format = format;
    }

    /// Address the next decode-one call decodes at.
    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn set_address(&mut self, address: u32) {
        self.address = address;
    }

    /// Current IT block state.
    pub fn it_state(&self) -> ItState {
        self.it
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn pools(&self) -> &CodePool {
        &self.pools
    }

    /// Adds a symbol. Thumb code addresses have bit 0 cleared.
    pub fn add_symbol(&mut self, name: Option<&str>, address: u32, kind: SymbolKind) {
        self.symbols.insert(name, address, kind);
    }

    /// Marks `[address, address + size)` as code or literal data.
    pub fn add_pool(&mut self, address: u32, size: u32, kind: PoolKind) -> Result<(), Error> {
        self.pools.insert(address, size, kind)
    }

    /// Merges pool ranges inside a window; returns how many were merged away.
    pub fn compact_pool(&mut self, address: u32, size: u32) -> usize {
        self.pools.compact(address, size)
    }

    pub fn clear_pool(&mut self) {
        self.pools.clear();
    }

    /// Copies a block of read-only data used to show literal values.
    pub fn add_literals(&mut self, bytes: &[u8], address: u32) -> Result<(), Error> {
        self.literals.add(bytes, address)
    }

    /// Leaves any IT block and drops pending literal state.
    pub fn reset_state(&mut self) {
        self.it.reset();
        self.pending_literal = None;
    }

    /// Decodes one A32 word at the current address and advances past it.
    pub fn decode_arm(&mut self, word: u32) -> Result<DecodedInstruction, DecodeError> {
        let address = self.address;
        let line = a32::decode(word, address);
        Ok(self.finish(line, address, Encoding::Arm(word)))
    }

    /// Decodes one Thumb instruction at the current address and advances
    /// past it.
    ///
    /// `hw2` is only read when `hw` starts a 32-bit encoding.
    pub fn decode_thumb(&mut self, hw: u16, hw2: u16) -> Result<DecodedInstruction, DecodeError> {
        let address = self.address;
        let slot = self.it.condition();
        let (line, encoding) = if thumb::is_wide(hw) {
            let word = (u32::from(hw) << 16) | u32::from(hw2);
            (thumb2::decode(word, address, slot), Encoding::Wide(hw, hw2))
        } else {
            (thumb::decode(hw, address, slot), Encoding::Narrow(hw))
        };

        if slot.is_some() {
            self.it.advance();
        }
        if let Some(line) = &line {
            if let Some(state) = line.it {
                self.it = state;
            }
            if line.flow {
                self.it.reset();
            }
        }
        Ok(self.finish(line, address, encoding))
    }

    /// Walks `bytes` starting in `mode`.
    pub fn disassemble_buffer_in<F>(
        &mut self,
        bytes: &[u8],
        base: u64,
        mode: Mode,
        callback: F,
    ) -> Result<WalkOutcome, DecodeError>
    where
        F: FnMut(u64, &str) -> WalkControl,
    {
        self.set_mode(mode);
        self.disassemble_buffer(bytes, base, callback)
    }

    /// Decorates a decoded line, registers its literal pool and advances.
    fn finish(&mut self, line: Option<Line>, address: u32, encoding: Encoding) -> DecodedInstruction {
        let mut text = self.prefix(address, encoding);
        let start = text.len();
        match &line {
            Some(line) => {
                let _ = text.write_str(line.text.as_str());
            }
            None => {
                let _ = text.write_str(&encoding.fallback());
            }
        }

        let target = line.and_then(|line| line.target);
        if let Some(target) = target {
            if self.format.contains(FormatFlags::COMMENT) {
                if let Some(comment) = self.comment(target) {
                    let column = (start + COMMENT_COLUMN).max(text.len() + 1);
                    text.pad_to(column);
                    let _ = write!(text, "; {}", comment);
                }
            }
            if let Target::Literal { address, size } = target {
                self.pending_literal = Some((address, size));
            }
        }
        self.register_literal();

        let size = encoding.size();
        self.address = address.wrapping_add(size as u32);
        DecodedInstruction {
            address: u64::from(address),
            text: text.into_string(),
            size,
            raw: encoding.raw(),
        }
    }

    /// Address and raw-encoding columns.
    fn prefix(&self, address: u32, encoding: impl fmt::Display) -> TextBuffer {
        let mut text = TextBuffer::new();
        if self.format.contains(FormatFlags::ADDRESS) {
            let _ = write!(text, "{:08x}  ", address);
        }
        if self.format.contains(FormatFlags::RAW_BYTES) {
            let start = text.len();
            let _ = write!(text, "{}", encoding);
            text.pad_to(start + RAW_COLUMN);
        }
        text
    }

    /// Symbol name at the target, or else the literal value it loads.
    fn comment(&self, target: Target) -> Option<String> {
        let (address, size) = match target {
            Target::Address(address) => (address, None),
            Target::Literal { address, size } => (address, Some(size)),
        };
        if let Some(name) = self.symbols.name_at(address) {
            return Some(name.to_owned());
        }
        let size = size?;
        let value = self.literals.read(address, size)?;
        Some(match size {
            1 => format!("0x{:02x}", value),
            2 => format!("0x{:04x}", value),
            _ => format!("0x{:08x}", value),
        })
    }

    fn register_literal(&mut self) {
        let Some((address, size)) = self.pending_literal.take() else {
            return;
        };
        match self.pools.insert(address, size, PoolKind::Literal) {
            Ok(()) => log::trace!("literal pool at {:#010x}+{}", address, size),
            Err(err) => log::trace!("literal pool at {:#010x} skipped: {}", address, err),
        }
    }
}

/// Raw column for a data directive: the same value the directive shows.
struct DataBytes<'a>(&'a [u8]);

impl fmt::Display for DataBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.0 {
            [a, b, c, d] => write!(f, "{:08x}", u32::from_le_bytes([a, b, c, d])),
            [a, b] => write!(f, "{:04x}", u16::from_le_bytes([a, b])),
            _ => self.0.iter().try_for_each(|b| write!(f, "{:02x}", b)),
        }
    }
}

impl Disassembler for ArmDisassembler {
    fn decode_instruction(
        &mut self,
        bytes: &[u8],
        address: u64,
    ) -> Result<DecodedInstruction, DecodeError> {
        self.address = address as u32;
        let halfword = |i: usize| {
            bytes
                .get(i..i + 2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
        };
        match self.mode {
            Mode::Arm => match *bytes {
                [a, b, c, d, ..] => self.decode_arm(u32::from_le_bytes([a, b, c, d])),
                _ => Err(DecodeError::truncated(address, 4, bytes.len())),
            },
            Mode::Thumb => {
                let hw = halfword(0).ok_or_else(|| DecodeError::truncated(address, 2, bytes.len()))?;
                let hw2 = if thumb::is_wide(hw) {
                    halfword(2).ok_or_else(|| DecodeError::truncated(address, 4, bytes.len()))?
                } else {
                    0
                };
                self.decode_thumb(hw, hw2)
            }
        }
    }

    fn instruction_size(&self, bytes: &[u8]) -> usize {
        match (self.mode, bytes) {
            (Mode::Arm, _) => 4,
            (Mode::Thumb, [lo, hi, ..]) if thumb::is_wide(u16::from_le_bytes([*lo, *hi])) => 4,
            (Mode::Thumb, _) => 2,
        }
    }

    fn min_instruction_size(&self) -> usize {
        2
    }

    fn max_instruction_size(&self) -> usize {
        4
    }

    fn is_fixed_width(&self) -> bool {
        false
    }

    fn architecture(&self) -> Architecture {
        Architecture::Arm
    }

    fn reset(&mut self) {
        self.reset_state();
    }

    fn prepare(&mut self, address: u64) {
        let Ok(address) = u32::try_from(address) else {
            return;
        };
        let mode = match self.symbols.get(address).map(|symbol| symbol.kind) {
            Some(SymbolKind::CodeArm) => Mode::Arm,
            Some(SymbolKind::CodeThumb) => Mode::Thumb,
            _ => return,
        };
        if mode != self.mode {
            log::debug!("{:#010x}: switching to {:?}", address, mode);
        }
        self.set_mode(mode);
    }

    fn data_at(&self, address: u64) -> Option<usize> {
        let address = u32::try_from(address).ok()?;
        self.pools
            .lookup(address)
            .filter(|range| range.kind == PoolKind::Literal)
            .map(|range| (range.end() - u64::from(address)) as usize)
    }

    fn render_data(&mut self, bytes: &[u8], address: u64) -> String {
        let address = address as u32;
        let mut text = self.prefix(address, DataBytes(bytes));
        let start = text.len();
        let _ = text.write_str(data_directive(bytes).as_str());
        if self.format.contains(FormatFlags::COMMENT) {
            if let Some(name) = self.symbols.name_at(address) {
                let column = (start + COMMENT_COLUMN).max(text.len() + 1);
                text.pad_to(column);
                let _ = write!(text, "; {}", name);
            }
        }
        text.into_string()
    }
}
