//! Text assembly for 32-bit ARM instructions.
//!
//! The A32, Thumb and Thumb2 renderers all build a [`Line`]: the
//! instruction text plus what the decode context needs to know afterwards
//! (the address it refers to, whether it writes the PC, whether it opens
//! an IT block).

use std::fmt::{self, Write};

use super::it::ItState;
use mnemo_core::register::arm;
use mnemo_core::{Condition, IndexMode, TextBuffer};

/// Address an instruction refers to, resolved against symbols and literal
/// blocks by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Target {
    /// Branch destination or `adr` result.
    Address(u32),
    /// PC-relative load of `size` bytes.
    Literal { address: u32, size: u32 },
}

/// Offset part of a memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Offset {
    Imm { value: u32, add: bool },
    Reg {
        rm: u32,
        add: bool,
        shift: u32,
        amount: u32,
    },
}

/// An instruction being rendered.
#[derive(Debug, Default)]
pub(super) struct Line {
    pub text: TextBuffer,
    operands: usize,
    pub target: Option<Target>,
    /// The instruction may write the PC.
    pub flow: bool,
    /// Block opened by an `it` instruction.
    pub it: Option<ItState>,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a mnemonic, inserting the `s` flag and the condition suffix
    /// ahead of any `.w`-style qualifier (`adds.w` + eq is `addseq.w`).
    pub fn mnemonic(&mut self, base: &str, flags: bool, cond: Option<Condition>) {
        let (stem, qualifier) = base.find('.').map_or((base, ""), |dot| base.split_at(dot));
        let _ = write!(
            self.text,
            "{}{}{}{}",
            stem,
            if flags { "s" } else { "" },
            cond.map_or("", |c| c.suffix()),
            qualifier
        );
    }

    /// Starts the next operand and writes it.
    pub fn operand(&mut self, args: fmt::Arguments<'_>) {
        let sep = if self.operands == 0 { " " } else { ", " };
        self.operands += 1;
        let _ = self.text.write_str(sep);
        let _ = self.text.write_fmt(args);
    }

    pub fn reg(&mut self, r: u32) {
        self.operand(format_args!("{}", arm::name(r)));
    }

    pub fn imm(&mut self, value: i64) {
        self.operand(format_args!("#{}", value));
    }

    /// Appends a shift to the previous register operand.
    pub fn shift(&mut self, kind: u32, amount: u32) {
        write_shift(&mut self.text, kind, amount);
    }

    /// `{r0, r4, lr}`
    pub fn reglist(&mut self, list: u32) {
        let mut body = TextBuffer::new();
        let regs = (0..16u32).filter(|&r| list & (1 << r) != 0);
        for (i, r) in regs.enumerate() {
            let _ = write!(body, "{}{}", if i == 0 { "" } else { ", " }, arm::name(r));
        }
        self.operand(format_args!("{{{}}}", body));
    }

    /// A branch destination; the instruction writes the PC.
    pub fn branch(&mut self, target: u32) {
        self.address(target);
        self.flow = true;
    }

    /// An absolute address computed from the PC.
    pub fn address(&mut self, target: u32) {
        self.operand(format_args!("{:#x}", target));
        self.target = Some(Target::Address(target));
    }

    /// `[pc, #imm]` for a literal load of `size` bytes from `target`.
    pub fn literal(&mut self, offset: u32, add: bool, target: u32, size: u32) {
        self.mem(
            u32::from(arm::PC),
            Offset::Imm { value: offset, add },
            IndexMode::Offset,
        );
        self.target = Some(Target::Literal {
            address: target,
            size,
        });
    }

    /// A memory operand in any of the three indexing modes.
    pub fn mem(&mut self, rn: u32, offset: Offset, mode: IndexMode) {
        let mut body = TextBuffer::new();
        let base = arm::name(rn);
        let _ = match (offset, mode) {
            (Offset::Imm { value: 0, add: true }, IndexMode::Offset) => write!(body, "[{}]", base),
            (Offset::Imm { value, add }, IndexMode::Offset) => {
                write!(body, "[{}, #{}{}]", base, sign(add), value)
            }
            (Offset::Imm { value, add }, IndexMode::PreIndex) => {
                write!(body, "[{}, #{}{}]!", base, sign(add), value)
            }
            (Offset::Imm { value, add }, IndexMode::PostIndex) => {
                write!(body, "[{}], #{}{}", base, sign(add), value)
            }
            (Offset::Reg { rm, add, shift, amount }, mode) => {
                let rm = arm::name(rm);
                let _ = match mode {
                    IndexMode::PostIndex => write!(body, "[{}], {}{}", base, sign(add), rm),
                    _ => write!(body, "[{}, {}{}", base, sign(add), rm),
                };
                write_shift(&mut body, shift, amount);
                match mode {
                    IndexMode::Offset => write!(body, "]"),
                    IndexMode::PreIndex => write!(body, "]!"),
                    IndexMode::PostIndex => Ok(()),
                }
            }
        };
        self.operand(format_args!("{}", body));
    }

    /// Appends text to the last operand (`!` after a writeback base).
    pub fn suffix(&mut self, text: &str) {
        let _ = self.text.write_str(text);
    }
}

fn sign(add: bool) -> &'static str {
    if add {
        ""
    } else {
        "-"
    }
}

/// Writes `, lsl #n` style shifts. A zero `lsl` is omitted, zero `lsr` and
/// `asr` mean 32, and a zero `ror` is `rrx`.
pub(super) fn write_shift(text: &mut TextBuffer, kind: u32, amount: u32) {
    let _ = match (kind & 3, amount) {
        (0, 0) => Ok(()),
        (3, 0) => write!(text, ", rrx"),
        (kind, amount) => {
            let amount = if amount == 0 { 32 } else { amount };
            write!(text, ", {} #{}", SHIFT_NAMES[kind as usize], amount)
        }
    };
}

pub(super) const SHIFT_NAMES: [&str; 4] = ["lsl", "lsr", "asr", "ror"];

/// Target of a PC-relative access: `Align(pc, 4) +/- offset`.
pub(super) fn pc_relative(pc: u32, offset: u32, add: bool) -> u32 {
    let base = pc & !3;
    if add {
        base.wrapping_add(offset)
    } else {
        base.wrapping_sub(offset)
    }
}
