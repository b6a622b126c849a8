//! Caller-supplied copies of read-only data.
//!
//! PC-relative loads in ARM code fetch constants from literal pools. When
//! the caller hands over the bytes around the code being decoded, the
//! decoder can show the loaded value next to the instruction.

use crate::Error;

/// A contiguous block of bytes at a fixed address.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LiteralBlock {
    /// Address of the first byte.
    pub address: u32,
    /// Block contents.
    pub bytes: Vec<u8>,
}

impl LiteralBlock {
    /// Exclusive end address.
    pub fn end(&self) -> u64 {
        u64::from(self.address) + self.bytes.len() as u64
    }

    /// Returns true if `[address, address + size)` lies inside the block.
    pub fn contains(&self, address: u32, size: u32) -> bool {
        address >= self.address && u64::from(address) + u64::from(size) <= self.end()
    }

    /// Reads a little-endian value of `size` bytes (1, 2 or 4).
    pub fn read(&self, address: u32, size: u32) -> Option<u32> {
        if !matches!(size, 1 | 2 | 4) || !self.contains(address, size) {
            return None;
        }
        let start = (address - self.address) as usize;
        let bytes = self.bytes.get(start..start + size as usize)?;
        Some(
            bytes
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)),
        )
    }
}

/// The set of literal blocks known to a decode context.
///
/// Blocks may overlap; reads are served by the most recently added block
/// that covers the whole access.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LiteralStore {
    blocks: Vec<LiteralBlock>,
}

impl LiteralStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `bytes` into a new block at `address`.
    pub fn add(&mut self, bytes: &[u8], address: u32) -> Result<(), Error> {
        if bytes.is_empty() {
            return Err(Error::EmptyLiteralBlock(address));
        }
        if u64::from(address) + bytes.len() as u64 > 1 << 32 {
            return Err(Error::AddressOverflow {
                address: u64::from(address),
                size: bytes.len() as u64,
            });
        }
        self.blocks.push(LiteralBlock {
            address,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    /// Finds the block serving an access of `size` bytes at `address`.
    pub fn find(&self, address: u32, size: u32) -> Option<&LiteralBlock> {
        self.blocks.iter().rev().find(|b| b.contains(address, size))
    }

    /// Reads a little-endian value of `size` bytes at `address`.
    pub fn read(&self, address: u32, size: u32) -> Option<u32> {
        self.find(address, size)?.read(address, size)
    }

    /// Drops every block.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
