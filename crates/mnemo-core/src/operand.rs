//! Instruction operand types.

use std::fmt;

use crate::Register;

/// An instruction operand.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    /// Register operand.
    Register(Register),
    /// Immediate value.
    Immediate(Immediate),
    /// Memory reference.
    Memory(MemoryRef),
    /// PC-relative address (used in branches and literal loads).
    PcRelative {
        /// Offset from PC.
        offset: i64,
        /// Resolved target address.
        target: u64,
    },
}

impl Operand {
    /// Creates a register operand.
    pub fn reg(reg: Register) -> Self {
        Self::Register(reg)
    }

    /// Creates a signed immediate operand.
    pub fn imm(value: i64, size: u8) -> Self {
        Self::Immediate(Immediate {
            value,
            size,
            signed: true,
        })
    }

    /// Creates an unsigned immediate operand.
    pub fn imm_unsigned(value: u64, size: u8) -> Self {
        Self::Immediate(Immediate {
            value: value as i64,
            size,
            signed: false,
        })
    }

    /// Creates a PC-relative operand.
    pub fn pc_rel(offset: i64, target: u64) -> Self {
        Self::PcRelative { offset, target }
    }
}

/// Immediate value operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Immediate {
    /// The value, sign-extended if `signed`.
    pub value: i64,
    /// Original size in bits.
    pub size: u8,
    /// Whether this is a signed immediate.
    pub signed: bool,
}

/// How a memory access updates its base register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexMode {
    /// `[base, #offset]`
    #[default]
    Offset,
    /// `[base, #offset]!`
    PreIndex,
    /// `[base], #offset`
    PostIndex,
}

/// Memory reference operand: `[base, index]` or `[base, #disp]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryRef {
    /// Base register.
    pub base: Register,
    /// Index register (if any).
    pub index: Option<Register>,
    /// Displacement/offset.
    pub displacement: i64,
    /// Access size in bytes.
    pub size: u8,
    /// Writeback behaviour.
    pub mode: IndexMode,
}

impl MemoryRef {
    /// Base register plus displacement.
    pub fn base_disp(base: Register, displacement: i64, size: u8) -> Self {
        Self {
            base,
            index: None,
            displacement,
            size,
            mode: IndexMode::Offset,
        }
    }

    /// Base register plus index register.
    pub fn base_index(base: Register, index: Register, size: u8) -> Self {
        Self {
            base,
            index: Some(index),
            displacement: 0,
            size,
            mode: IndexMode::Offset,
        }
    }

    /// Sets the writeback mode.
    pub fn with_mode(mut self, mode: IndexMode) -> Self {
        self.mode = mode;
        self
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.signed && self.value < 0 {
            write!(f, "#-{:#x}", self.value.unsigned_abs())
        } else {
            write!(f, "#{:#x}", self.value as u64)
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register(reg) => write!(f, "{}", reg),
            Self::Immediate(imm) => write!(f, "{}", imm),
            Self::Memory(mem) => {
                write!(f, "[{}", mem.base)?;
                if let Some(index) = mem.index {
                    return write!(f, ", {}]", index);
                }
                let disp = Immediate {
                    value: mem.displacement,
                    size: 64,
                    signed: true,
                };
                match mem.mode {
                    IndexMode::Offset if mem.displacement == 0 => write!(f, "]"),
                    IndexMode::Offset => write!(f, ", {}]", disp),
                    IndexMode::PreIndex => write!(f, ", {}]!", disp),
                    IndexMode::PostIndex => write!(f, "], {}", disp),
                }
            }
            Self::PcRelative { target, .. } => write!(f, "{:#x}", target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_display_modes() {
        let base = Register::arm64_sp(31, true);
        let mem = MemoryRef::base_disp(base, -16, 8);
        assert_eq!(Operand::Memory(mem.clone()).to_string(), "[sp, #-0x10]");
        assert_eq!(
            Operand::Memory(mem.clone().with_mode(IndexMode::PreIndex)).to_string(),
            "[sp, #-0x10]!"
        );
        assert_eq!(
            Operand::Memory(mem.with_mode(IndexMode::PostIndex)).to_string(),
            "[sp], #-0x10"
        );
    }

    #[test]
    fn test_register_index_display() {
        let mem = MemoryRef::base_index(Register::arm64_sp(1, true), Register::arm64_zr(2, true), 8);
        assert_eq!(Operand::Memory(mem).to_string(), "[x1, x2]");
    }

    #[test]
    fn test_immediate_display() {
        assert_eq!(Operand::imm_unsigned(0x2a, 12).to_string(), "#0x2a");
        assert_eq!(Operand::imm(-1, 9).to_string(), "#-0x1");
        assert_eq!(Operand::pc_rel(8, 0x1008).to_string(), "0x1008");
    }
}
