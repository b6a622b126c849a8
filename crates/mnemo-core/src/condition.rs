//! ARM condition codes.
//!
//! The same 4-bit encoding is shared by A32 conditional execution, Thumb
//! conditional branches and IT blocks, and ARM64 `b.cond`/`csel`-style
//! instructions.

/// A 4-bit ARM condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Condition {
    Equal,          // Z=1
    NotEqual,       // Z=0
    CarrySet,       // C=1 (HS)
    CarryClear,     // C=0 (LO)
    Minus,          // N=1
    Plus,           // N=0
    Overflow,       // V=1
    NoOverflow,     // V=0
    Higher,         // C=1 and Z=0
    LowerOrSame,    // C=0 or Z=1
    GreaterOrEqual, // N=V
    Less,           // N!=V
    Greater,        // Z=0 and N=V
    LessOrEqual,    // Z=1 or N!=V
    Always,
    /// `0b1111`: "never" on ARM64, the unconditional space on A32.
    Never,
}

impl Condition {
    /// Decodes the low 4 bits of `bits`.
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0x0 => Self::Equal,
            0x1 => Self::NotEqual,
            0x2 => Self::CarrySet,
            0x3 => Self::CarryClear,
            0x4 => Self::Minus,
            0x5 => Self::Plus,
            0x6 => Self::Overflow,
            0x7 => Self::NoOverflow,
            0x8 => Self::Higher,
            0x9 => Self::LowerOrSame,
            0xA => Self::GreaterOrEqual,
            0xB => Self::Less,
            0xC => Self::Greater,
            0xD => Self::LessOrEqual,
            0xE => Self::Always,
            _ => Self::Never,
        }
    }

    /// Returns the 4-bit encoding.
    pub fn bits(&self) -> u8 {
        *self as u8
    }

    /// Returns the inverse condition.
    ///
    /// The inverse of a condition flips bit 0 of its encoding, except
    /// that `al` and `nv` both mean "always".
    pub fn inverse(&self) -> Self {
        match self {
            Self::Always | Self::Never => *self,
            _ => Self::from_bits(u32::from(self.bits() ^ 1)),
        }
    }

    /// Returns the assembler name (`eq`, `ne`, ..., `al`, `nv`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equal => "eq",
            Self::NotEqual => "ne",
            Self::CarrySet => "cs",
            Self::CarryClear => "cc",
            Self::Minus => "mi",
            Self::Plus => "pl",
            Self::Overflow => "vs",
            Self::NoOverflow => "vc",
            Self::Higher => "hi",
            Self::LowerOrSame => "ls",
            Self::GreaterOrEqual => "ge",
            Self::Less => "lt",
            Self::Greater => "gt",
            Self::LessOrEqual => "le",
            Self::Always => "al",
            Self::Never => "nv",
        }
    }

    /// Returns the suffix appended to a mnemonic; empty for `al`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Always => "",
            _ => self.name(),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_encoding() {
        for bits in 0..16 {
            assert_eq!(u32::from(Condition::from_bits(bits).bits()), bits);
        }
    }

    #[test]
    fn test_inverse() {
        assert_eq!(Condition::Equal.inverse(), Condition::NotEqual);
        assert_eq!(Condition::Less.inverse(), Condition::GreaterOrEqual);
        assert_eq!(Condition::Always.inverse(), Condition::Always);
    }

    #[test]
    fn test_suffix_hides_always() {
        assert_eq!(Condition::Always.suffix(), "");
        assert_eq!(Condition::Higher.suffix(), "hi");
    }
}
