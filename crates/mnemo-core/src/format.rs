//! Output formatting options.

use bitflags::bitflags;

bitflags! {
    /// Decorations added around the decoded instruction text.
    ///
    /// The flags are independent of each other.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct FormatFlags: u32 {
        /// Prefix each line with the instruction address.
        const ADDRESS   = 0x0001;
        /// Prefix each line with the encoded instruction in hex.
        const RAW_BYTES = 0x0002;
        /// Append comments with symbol names and literal values.
        const COMMENT   = 0x0004;

        const NONE = 0;
        const ALL  = Self::ADDRESS.bits() | Self::RAW_BYTES.bits() | Self::COMMENT.bits();
    }
}
