//! Disassembler traits.

use std::fmt::Write;

use crate::walk::{self, WalkControl, WalkOutcome};
use crate::DecodeError;
use mnemo_core::{Architecture, TextBuffer};

/// Result of decoding an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Address of the first byte.
    pub address: u64,
    /// Rendered text, at most [`mnemo_core::MAX_TEXT_LEN`] bytes.
    pub text: String,
    /// Number of bytes consumed.
    pub size: usize,
    /// Raw encoding. 32-bit Thumb instructions hold the first halfword in
    /// the upper 16 bits.
    pub raw: u32,
}

/// Trait for architecture-specific instruction decoders.
///
/// Decoding takes `&mut self` because some decoders (32-bit ARM) carry
/// state from one instruction to the next.
pub trait Disassembler {
    /// Decode a single instruction starting at the given address.
    ///
    /// # Arguments
    /// * `bytes` - The raw bytes to decode
    /// * `address` - The virtual address of the first byte
    ///
    /// # Returns
    /// The decoded instruction and the number of bytes consumed.
    fn decode_instruction(
        &mut self,
        bytes: &[u8],
        address: u64,
    ) -> Result<DecodedInstruction, DecodeError>;

    /// Number of bytes the instruction starting at `bytes` occupies.
    ///
    /// Only the leading bytes are inspected; `bytes` may be shorter than
    /// the returned size.
    fn instruction_size(&self, _bytes: &[u8]) -> usize {
        self.min_instruction_size()
    }

    /// Returns the minimum instruction size for this architecture.
    fn min_instruction_size(&self) -> usize;

    /// Returns the maximum instruction size for this architecture.
    fn max_instruction_size(&self) -> usize;

    /// Returns whether instructions are fixed-width.
    fn is_fixed_width(&self) -> bool;

    /// Returns the target architecture.
    fn architecture(&self) -> Architecture;

    /// Clears cross-instruction state. Called at the start of every walk.
    fn reset(&mut self) {}

    /// Called by the walker before each step at `address`.
    fn prepare(&mut self, _address: u64) {}

    /// Bytes of embedded data remaining at `address`, if it lies in a data
    /// region the walker must not decode.
    fn data_at(&self, _address: u64) -> Option<usize> {
        None
    }

    /// Renders `bytes` of embedded data as a directive.
    fn render_data(&mut self, bytes: &[u8], _address: u64) -> String {
        data_directive(bytes).into_string()
    }

    /// Walks `bytes` as code starting at `base`, reporting every rendered
    /// line through `callback`.
    fn disassemble_buffer<F>(
        &mut self,
        bytes: &[u8],
        base: u64,
        callback: F,
    ) -> Result<WalkOutcome, DecodeError>
    where
        Self: Sized,
        F: FnMut(u64, &str) -> WalkControl,
    {
        walk::walk(self, bytes, base, callback)
    }
}

/// Renders up to four bytes of little-endian data as `.word`, `.short` or
/// `.byte`.
pub(crate) fn data_directive(bytes: &[u8]) -> TextBuffer {
    let mut text = TextBuffer::new();
    let _ = match *bytes {
        [a, b, c, d] => write!(
            text,
            ".word 0x{:08x}",
            u32::from_le_bytes([a, b, c, d])
        ),
        [a, b] => write!(text, ".short 0x{:04x}", u16::from_le_bytes([a, b])),
        _ => {
            let _ = write!(text, ".byte ");
            bytes.iter().enumerate().try_for_each(|(i, b)| {
                let sep = if i == 0 { "" } else { ", " };
                write!(text, "{}0x{:02x}", sep, b)
            })
        }
    };
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_directive_widths() {
        assert_eq!(
            data_directive(&[0x78, 0x56, 0x34, 0x12]).as_str(),
            ".word 0x12345678"
        );
        assert_eq!(data_directive(&[0x34, 0x12]).as_str(), ".short 0x1234");
        assert_eq!(
            data_directive(&[0x01, 0x02, 0x03]).as_str(),
            ".byte 0x01, 0x02, 0x03"
        );
    }
}
