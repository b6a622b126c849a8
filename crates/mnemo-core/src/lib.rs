//! # mnemo-core
//!
//! Core data model for the mnemo instruction decoders. This crate defines
//! the architecture-independent pieces every decoder shares: bitfield
//! extraction, registers and operands, condition codes, the symbol table,
//! code/literal pool ranges, literal data blocks and the bounded text
//! buffer instructions are rendered into.

pub mod arch;
pub mod bits;
pub mod condition;
pub mod error;
pub mod format;
pub mod literal;
pub mod operand;
pub mod pool;
pub mod register;
pub mod symbol;
pub mod text;

pub use arch::{Architecture, Mode};
pub use condition::Condition;
pub use error::Error;
pub use format::FormatFlags;
pub use literal::{LiteralBlock, LiteralStore};
pub use operand::{Immediate, IndexMode, MemoryRef, Operand};
pub use pool::{CodePool, PoolKind, PoolRange};
pub use register::{Register, RegisterClass};
pub use symbol::{Symbol, SymbolKind, SymbolTable};
pub use text::{TextBuffer, MAX_TEXT_LEN};
