//! Error types for mnemo-core.

use thiserror::Error;

use crate::PoolKind;

/// Core error type, raised while registering symbols, pools and literal data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A pool range overlaps a range of a different kind.
    #[error(
        "{requested:?} pool at {address:#010x}+{size:#x} overlaps {existing:?} pool at {existing_address:#010x}"
    )]
    PoolConflict {
        address: u32,
        size: u32,
        requested: PoolKind,
        existing: PoolKind,
        existing_address: u32,
    },

    /// A range extends past the end of the 32-bit address space.
    #[error("range at {address:#010x} with size {size:#x} wraps the address space")]
    AddressOverflow { address: u64, size: u64 },

    /// A literal block without any bytes.
    #[error("empty literal block at {0:#010x}")]
    EmptyLiteralBlock(u32),
}
