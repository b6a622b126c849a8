//! # mnemo-disasm
//!
//! Architecture-specific instruction decoders for mnemo.
//!
//! This crate provides text-rendering decoders for:
//! - 32-bit ARM (A32, Thumb and Thumb2), with IT-block, literal pool and
//!   symbol tracking
//! - ARM64 (AArch64)
//! - RISC-V (RV32I with Zicsr and M)
//! - the compact ARMv8-M DSP/vector opcode table
//!
//! Every decoder implements [`Disassembler`], whose
//! [`disassemble_buffer`](Disassembler::disassemble_buffer) walks a byte
//! buffer and reports one `(address, text)` line per instruction.

pub mod error;
pub mod table;
pub mod traits;
pub mod walk;

#[cfg(feature = "arm")]
pub mod arm;

#[cfg(feature = "arm64")]
pub mod arm64;

#[cfg(feature = "riscv")]
pub mod riscv;

#[cfg(feature = "armv8m")]
pub mod armv8m;

pub use error::DecodeError;
pub use traits::{DecodedInstruction, Disassembler};
pub use walk::{WalkControl, WalkOutcome};

#[cfg(feature = "arm")]
pub use arm::ArmDisassembler;

#[cfg(feature = "arm64")]
pub use arm64::{Arm64Disassembler, Arm64Instruction};

#[cfg(feature = "riscv")]
pub use riscv::RiscVDisassembler;

#[cfg(feature = "armv8m")]
pub use armv8m::Armv8mDisassembler;
