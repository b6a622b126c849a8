//! Declarative bit-pattern tables.
//!
//! Every decoder describes its encodings as an ordered list of [`Form`]s.
//! A form is written as a bit string where `0`/`1` are fixed bits and any
//! other letter is a wildcard naming the field it belongs to; `_` and
//! spaces separate groups and are skipped. The string is turned into a
//! `(mask, pattern)` pair at compile time.
//!
//! Lookup walks the table in order and returns the first form whose fixed
//! bits match, so more specific encodings (aliases, special cases) must be
//! listed before the general ones they overlap.

/// Parses a bit-string pattern into `(mask, pattern)`.
///
/// The last bit character is bit 0. At most 32 bit characters may appear.
pub const fn parse_pattern<const N: usize>(pat: &[u8; N]) -> (u32, u32) {
    let mut mask: u32 = 0;
    let mut pattern: u32 = 0;
    let mut count = 0;
    let mut i = 0;
    while i < N {
        match pat[i] {
            b'_' | b' ' => {}
            c => {
                mask <<= 1;
                pattern <<= 1;
                if c == b'0' {
                    mask |= 1;
                } else if c == b'1' {
                    mask |= 1;
                    pattern |= 1;
                }
                count += 1;
            }
        }
        i += 1;
    }
    assert!(count <= 32, "pattern longer than 32 bits");
    (mask, pattern)
}

/// One encoding in a dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct Form<K: 'static> {
    /// Fixed bits of the encoding.
    pub mask: u32,
    /// Required values of the fixed bits.
    pub pattern: u32,
    /// Lowercase mnemonic (may be refined by the renderer).
    pub mnemonic: &'static str,
    /// Instruction family, selecting field extraction and rendering.
    pub kind: K,
}

impl<K> Form<K> {
    /// Returns true if `word` carries this form's fixed bits.
    #[inline]
    pub const fn matches(&self, word: u32) -> bool {
        word & self.mask == self.pattern
    }
}

/// Builds a [`Form`] from a bit-string pattern at compile time.
macro_rules! form {
    ($pat:literal, $mnemonic:literal, $kind:expr) => {{
        const P: (u32, u32) = $crate::table::parse_pattern($pat);
        $crate::table::Form {
            mask: P.0,
            pattern: P.1,
            mnemonic: $mnemonic,
            kind: $kind,
        }
    }};
}
pub(crate) use form;

/// First form in `table` matching `word`.
pub fn lookup<K>(table: &'static [Form<K>], word: u32) -> Option<&'static Form<K>> {
    table.iter().find(|form| form.matches(word))
}

/// Condition-folded lookup for A32 tables.
///
/// Conditional forms leave bits 31:28 out of their mask. For a condition
/// other than `0b1111` they are compared with the condition folded into
/// the pattern; `0b1111` selects only the unconditional forms, whose masks
/// cover the whole top nibble.
pub fn lookup_conditional<K>(table: &'static [Form<K>], word: u32) -> Option<&'static Form<K>> {
    const COND_MASK: u32 = 0xF000_0000;
    let cond = word >> 28;
    table.iter().find(|form| {
        let conditional = form.mask & COND_MASK == 0;
        if cond == 0xF {
            !conditional && form.matches(word)
        } else {
            conditional && word & (form.mask | COND_MASK) == form.pattern | (cond << 28)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Kind {
        Specific,
        General,
        Unconditional,
    }

    static TABLE: &[Form<Kind>] = &[
        form!(b"cccc_0001_1010_0000_dddd_0000_0000_mmmm", "mov", Kind::Specific),
        form!(b"cccc_000o_ooos_nnnn_dddd_iiii_itt0_mmmm", "dp", Kind::General),
        form!(b"1111_101h_iiii_iiii_iiii_iiii_iiii_iiii", "blx", Kind::Unconditional),
    ];

    #[test]
    fn test_parse_pattern() {
        assert_eq!(parse_pattern(b"1x0"), (0b101, 0b100));
        assert_eq!(parse_pattern(b"01_00 0100"), (0xFF, 0x44));
        assert_eq!(
            parse_pattern(b"cccc_0001_1010_0000_dddd_0000_0000_mmmm"),
            (0x0FFF_0FF0, 0x01A0_0000)
        );
    }

    #[test]
    fn test_first_match_wins() {
        // mov r1, r2 matches both the specific and the general form.
        let form = lookup(TABLE, 0xE1A0_1002).unwrap();
        assert_eq!(form.kind, Kind::Specific);
        let form = lookup(TABLE, 0xE080_1002).unwrap();
        assert_eq!(form.kind, Kind::General);
    }

    #[test]
    fn test_conditional_lookup_folds_condition() {
        let form = lookup_conditional(TABLE, 0x01A0_1002).unwrap();
        assert_eq!(form.kind, Kind::Specific);
        // Condition 0b1111 only sees unconditional forms.
        assert_eq!(lookup_conditional(TABLE, 0xF080_1002).map(|f| f.kind), None);
        let form = lookup_conditional(TABLE, 0xFA00_0010).unwrap();
        assert_eq!(form.kind, Kind::Unconditional);
    }
}
