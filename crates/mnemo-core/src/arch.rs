//! Architecture identification and properties.

/// Instruction sets the decoders understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Architecture {
    /// 32-bit ARM, covering both the A32 and the Thumb/Thumb2 instruction sets.
    Arm,
    /// ARM 64-bit (AArch64)
    Arm64,
    /// RISC-V 32-bit base integer ISA
    RiscV32,
    /// The compact ARMv8-M DSP/vector extension opcode table.
    Armv8m,
}

impl Architecture {
    /// Returns the pointer size in bytes for this architecture.
    pub fn pointer_size(&self) -> usize {
        match self {
            Self::Arm64 => 8,
            Self::Arm | Self::RiscV32 | Self::Armv8m => 4,
        }
    }

    /// Number of bytes the walker skips when nothing else is known about
    /// the bytes at the current address.
    pub fn default_instruction_size(&self) -> usize {
        match self {
            Self::Armv8m => 2,
            Self::Arm | Self::Arm64 | Self::RiscV32 => 4,
        }
    }

    /// Returns the name of this architecture.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
            Self::RiscV32 => "riscv32",
            Self::Armv8m => "armv8m",
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Execution state of a 32-bit ARM core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// A32: fixed 4-byte instructions.
    Arm,
    /// Thumb/Thumb2: 2- or 4-byte instructions.
    #[default]
    Thumb,
}

impl Mode {
    /// Value the PC reads as, relative to the current instruction.
    pub fn pc_bias(&self) -> u32 {
        match self {
            Self::Arm => 8,
            Self::Thumb => 4,
        }
    }

    /// Minimum instruction size in bytes.
    pub fn min_instruction_size(&self) -> usize {
        match self {
            Self::Arm => 4,
            Self::Thumb => 2,
        }
    }
}
