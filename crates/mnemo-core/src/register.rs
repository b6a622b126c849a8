//! Register naming for the supported architectures.

use std::fmt;

use crate::Architecture;

/// Register class (general purpose, floating point, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegisterClass {
    /// General purpose register (r0, x0, a0, etc.)
    General,
    /// Floating point / SIMD scalar register (s0, d0, etc.)
    FloatingPoint,
    /// Stack pointer (sp, wsp)
    StackPointer,
    /// Hard-wired zero register (xzr, wzr, zero)
    Zero,
    /// Program counter
    ProgramCounter,
}

/// Architecture-agnostic register representation.
///
/// The ID is architecture-specific; see the [`arm`], [`arm64`] and
/// [`riscv`] modules for the numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Register {
    /// The architecture this register belongs to.
    pub arch: Architecture,
    /// The class of register.
    pub class: RegisterClass,
    /// Architecture-specific register ID.
    pub id: u16,
    /// Size of the register in bits.
    pub size: u16,
}

impl Register {
    /// Creates a new register.
    pub fn new(arch: Architecture, class: RegisterClass, id: u16, size: u16) -> Self {
        Self {
            arch,
            class,
            id,
            size,
        }
    }

    /// A 32-bit ARM core register (`r0`-`r15`).
    pub fn arm(id: u32) -> Self {
        let id = (id & 0xF) as u16;
        let class = match id {
            arm::SP => RegisterClass::StackPointer,
            arm::PC => RegisterClass::ProgramCounter,
            _ => RegisterClass::General,
        };
        Self::new(Architecture::Arm, class, id, 32)
    }

    /// An ARM64 general register where encoding 31 is the stack pointer.
    pub fn arm64_sp(id: u32, is_64bit: bool) -> Self {
        let id = (id & 0x1F) as u16;
        let class = if id == arm64::SP {
            RegisterClass::StackPointer
        } else {
            RegisterClass::General
        };
        Self::new(Architecture::Arm64, class, id, if is_64bit { 64 } else { 32 })
    }

    /// An ARM64 general register where encoding 31 is the zero register.
    pub fn arm64_zr(id: u32, is_64bit: bool) -> Self {
        let id = (id & 0x1F) as u16;
        let (id, class) = if id == 31 {
            (arm64::XZR, RegisterClass::Zero)
        } else {
            (id, RegisterClass::General)
        };
        Self::new(Architecture::Arm64, class, id, if is_64bit { 64 } else { 32 })
    }

    /// An ARM64 SIMD/FP scalar register of `size` bits.
    pub fn arm64_fp(id: u32, size: u16) -> Self {
        Self::new(
            Architecture::Arm64,
            RegisterClass::FloatingPoint,
            arm64::V0 + (id & 0x1F) as u16,
            size,
        )
    }

    /// A RISC-V integer register.
    pub fn riscv(id: u32) -> Self {
        let id = (id & 0x1F) as u16;
        let class = match id {
            0 => RegisterClass::Zero,
            2 => RegisterClass::StackPointer,
            _ => RegisterClass::General,
        };
        Self::new(Architecture::RiscV32, class, id, 32)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arch {
            Architecture::Arm | Architecture::Armv8m => f.write_str(arm::name(self.id as u32)),
            Architecture::Arm64 => match self.class {
                RegisterClass::FloatingPoint => {
                    write!(f, "{}{}", arm64::fp_prefix(self.size), self.id - arm64::V0)
                }
                _ => f.write_str(arm64::name(self.id as u32, self.size == 64)),
            },
            Architecture::RiscV32 => f.write_str(riscv::name(self.id as u32)),
        }
    }
}

/// 32-bit ARM register IDs and names.
pub mod arm {
    pub const SP: u16 = 13;
    pub const LR: u16 = 14;
    pub const PC: u16 = 15;

    pub const NAMES: [&str; 16] = [
        "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp",
        "lr", "pc",
    ];

    /// Name of core register `id` (masked to 4 bits).
    pub fn name(id: u32) -> &'static str {
        NAMES[(id & 0xF) as usize]
    }
}

/// ARM64 register IDs and names.
pub mod arm64 {
    /// Encoding 31 in stack-pointer contexts.
    pub const SP: u16 = 31;
    /// Encoding 31 in zero-register contexts.
    pub const XZR: u16 = 32;
    /// First SIMD/FP register.
    pub const V0: u16 = 64;

    const X_NAMES: [&str; 33] = [
        "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13",
        "x14", "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25",
        "x26", "x27", "x28", "x29", "x30", "sp", "xzr",
    ];

    const W_NAMES: [&str; 33] = [
        "w0", "w1", "w2", "w3", "w4", "w5", "w6", "w7", "w8", "w9", "w10", "w11", "w12", "w13",
        "w14", "w15", "w16", "w17", "w18", "w19", "w20", "w21", "w22", "w23", "w24", "w25",
        "w26", "w27", "w28", "w29", "w30", "wsp", "wzr",
    ];

    /// Name of general register `id` (0-30, [`SP`] or [`XZR`]).
    pub fn name(id: u32, is_64bit: bool) -> &'static str {
        let names = if is_64bit { &X_NAMES } else { &W_NAMES };
        names.get(id as usize).copied().unwrap_or("?")
    }

    /// Encoding 31 as the stack pointer.
    pub fn sp_name(id: u32, is_64bit: bool) -> &'static str {
        name(id & 0x1F, is_64bit)
    }

    /// Encoding 31 as the zero register.
    pub fn zr_name(id: u32, is_64bit: bool) -> &'static str {
        let id = id & 0x1F;
        name(if id == 31 { u32::from(XZR) } else { id }, is_64bit)
    }

    /// Scalar SIMD/FP register prefix for an access size in bits.
    pub fn fp_prefix(size: u16) -> char {
        match size {
            8 => 'b',
            16 => 'h',
            32 => 's',
            64 => 'd',
            _ => 'q',
        }
    }
}

/// RISC-V integer register ABI names.
pub mod riscv {
    pub const NAMES: [&str; 32] = [
        "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
        "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3",
        "t4", "t5", "t6",
    ];

    /// ABI name of register `id` (masked to 5 bits).
    pub fn name(id: u32) -> &'static str {
        NAMES[(id & 0x1F) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_names() {
        assert_eq!(Register::arm(13).to_string(), "sp");
        assert_eq!(Register::arm(0x1F).to_string(), "pc");
        assert_eq!(Register::arm(13).class, RegisterClass::StackPointer);
    }

    #[test]
    fn test_arm64_register_31() {
        assert_eq!(Register::arm64_sp(31, true).to_string(), "sp");
        assert_eq!(Register::arm64_sp(31, false).to_string(), "wsp");
        assert_eq!(Register::arm64_zr(31, true).to_string(), "xzr");
        assert_eq!(Register::arm64_zr(31, false).to_string(), "wzr");
        assert_eq!(Register::arm64_zr(5, false).to_string(), "w5");
    }

    #[test]
    fn test_arm64_fp_names() {
        assert_eq!(Register::arm64_fp(3, 64).to_string(), "d3");
        assert_eq!(Register::arm64_fp(31, 32).to_string(), "s31");
        assert_eq!(Register::arm64_fp(0, 16).to_string(), "h0");
    }

    #[test]
    fn test_riscv_abi_names() {
        assert_eq!(Register::riscv(0).to_string(), "zero");
        assert_eq!(Register::riscv(1).to_string(), "ra");
        assert_eq!(Register::riscv(10).to_string(), "a0");
        assert_eq!(Register::riscv(31).to_string(), "t6");
        assert_eq!(Register::riscv(0).class, RegisterClass::Zero);
    }
}
