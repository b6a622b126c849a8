//! RISC-V instruction decoder.
//!
//! Supports the RV32I base integer instruction set with extensions:
//! - Zicsr: Control and status register access
//! - M: Multiply/Divide
//!
//! RISC-V uses a clean, regular encoding: the 7-bit major opcode selects
//! the instruction format and `funct3`/`funct7` pick the operation. The
//! scattered immediate fragments of the S, B and J formats are reassembled
//! before sign extension.

mod decoder;

pub use decoder::RiscVDisassembler;
