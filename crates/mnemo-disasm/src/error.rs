//! Disassembly error types.

use thiserror::Error;

/// Error type for instruction decoding.
///
/// Unknown encodings are not errors: decoders render them as data
/// directives. These variants cover the cases where no text can be
/// produced at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Instruction was truncated (not enough bytes).
    #[error("truncated instruction at {address:#x}: need {needed} bytes, have {available}")]
    Truncated {
        address: u64,
        needed: usize,
        available: usize,
    },

    /// Architecturally invalid encoding.
    #[error("invalid encoding {raw:#010x} at {address:#x}: {reason}")]
    InvalidEncoding {
        address: u64,
        raw: u32,
        reason: String,
    },
}

impl DecodeError {
    /// Creates a new Truncated error.
    pub fn truncated(address: u64, needed: usize, available: usize) -> Self {
        Self::Truncated {
            address,
            needed,
            available,
        }
    }

    /// Creates a new InvalidEncoding error.
    pub fn invalid_encoding(address: u64, raw: u32, reason: impl Into<String>) -> Self {
        Self::InvalidEncoding {
            address,
            raw,
            reason: reason.into(),
        }
    }

    /// Address of the offending instruction.
    pub fn address(&self) -> u64 {
        match self {
            Self::Truncated { address, .. } | Self::InvalidEncoding { address, .. } => *address,
        }
    }
}
