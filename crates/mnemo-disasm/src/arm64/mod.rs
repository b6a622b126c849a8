//! ARM64 (AArch64) instruction decoder.
//!
//! ARM64 uses fixed 32-bit instructions. Bits 28:25 (`op0`) split the
//! encoding space into a handful of groups, and each group owns its own
//! ordered form table:
//! - Data processing, immediate (ADR, ADD/SUB, logical, MOVZ/MOVN/MOVK,
//!   bitfield, EXTR)
//! - Branches, exception generation and system (B, BL, B.cond, CBZ, TBZ,
//!   BR/BLR/RET, SVC, hints, barriers, MRS/MSR)
//! - Loads and stores (literal, pair, single register, exclusive)
//! - Data processing, register (logical and arithmetic shifted/extended,
//!   conditional select/compare, 1/2/3-source)
//! - Scalar floating point
//!
//! Words that fall in no table are rendered as `.long` directives. Only
//! the reserved group with a nonzero `op1` field is a hard error.

mod branch;
mod decoder;
mod dp_imm;
mod dp_reg;
mod fp;
mod ldst;

pub use decoder::{Arm64Disassembler, Arm64Instruction, Group};
