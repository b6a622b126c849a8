//! Bitfield extraction.
//!
//! Every decoder pulls register indices, opcodes and immediates out of a
//! raw word with these helpers. They are `const` so instruction tables can
//! use them in static initializers.

/// Extracts `len` bits of `word` starting at bit `start`.
#[inline]
pub const fn field(word: u32, start: u32, len: u32) -> u32 {
    if len >= 32 {
        word >> start
    } else {
        (word >> start) & ((1 << len) - 1)
    }
}

/// Extracts the inclusive bit range `hi..=lo`.
#[inline]
pub const fn bits(word: u32, hi: u32, lo: u32) -> u32 {
    field(word, lo, hi - lo + 1)
}

/// Returns bit `n` of `word`.
#[inline]
pub const fn bit(word: u32, n: u32) -> bool {
    (word >> n) & 1 != 0
}

/// Sign-extends the low `width` bits of `value`.
///
/// Bit `width - 1` is the sign bit. The value is biased by XOR-ing the
/// sign bit and subtracting it again, which propagates the sign through
/// all higher bits.
#[inline]
pub const fn sign_extend(value: u32, width: u32) -> i32 {
    debug_assert!(width > 0 && width <= 32);
    let value = if width >= 32 {
        value
    } else {
        value & ((1 << width) - 1)
    };
    let bias = 1u32 << (width - 1);
    (value ^ bias).wrapping_sub(bias) as i32
}

/// 64-bit variant of [`sign_extend`].
#[inline]
pub const fn sign_extend64(value: u64, width: u32) -> i64 {
    debug_assert!(width > 0 && width <= 64);
    let value = if width >= 64 {
        value
    } else {
        value & ((1 << width) - 1)
    };
    let bias = 1u64 << (width - 1);
    (value ^ bias).wrapping_sub(bias) as i64
}

/// Assembles an immediate from scattered fragments.
///
/// Each fragment is `(source_lsb, length, destination_lsb)`: `length` bits
/// starting at `source_lsb` of `word` land at `destination_lsb` of the
/// result.
#[inline]
pub fn gather(word: u32, fragments: &[(u32, u32, u32)]) -> u32 {
    fragments
        .iter()
        .fold(0, |acc, &(src, len, dst)| acc | (field(word, src, len) << dst))
}

/// Adds a signed offset to an address with 32-bit wrap-around.
#[inline]
pub const fn offset_address(address: u32, offset: i32) -> u32 {
    address.wrapping_add(offset as u32)
}
