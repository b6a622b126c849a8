//! Thumb2 IT-block tracking.

use mnemo_core::Condition;

/// The ITSTATE carried between Thumb instructions.
///
/// `mask` holds ITSTATE[4:0]: the low bit of the first condition followed
/// by the 4-bit mask of the `it` instruction. The lowest set bit marks the
/// end of the block, and bit 4 selects "then" (match the low bit of the
/// base condition) or "else" for the current slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItState {
    mask: u8,
    cond: u8,
}

impl ItState {
    /// State entered by `it` with the given first condition and mask.
    pub fn new(firstcond: u32, mask: u32) -> Self {
        Self {
            mask: (((firstcond & 1) << 4) | (mask & 0xF)) as u8,
            cond: (firstcond & 0xF) as u8,
        }
    }

    /// Returns true while slots remain.
    pub fn is_active(&self) -> bool {
        self.mask & 0xF != 0
    }

    /// Condition of the current slot, if a block is active.
    pub fn condition(&self) -> Option<Condition> {
        self.is_active().then(|| {
            Condition::from_bits(u32::from((self.cond & 0b1110) | (self.mask >> 4)))
        })
    }

    /// Number of slots left, including the current one.
    pub fn remaining(&self) -> usize {
        if self.is_active() {
            4 - (self.mask & 0xF).trailing_zeros() as usize
        } else {
            0
        }
    }

    /// Moves to the next slot, leaving the block after the last one.
    pub fn advance(&mut self) {
        if self.mask & 0b111 == 0 {
            self.reset();
        } else {
            self.mask = (self.mask << 1) & 0x1F;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Raw `(mask, cond)` pair.
    pub fn raw(&self) -> (u8, u8) {
        (self.mask, self.cond)
    }
}

/// `it` mnemonic for a first condition and mask, e.g. `itte`.
///
/// Returns `None` for a zero mask, which is a hint rather than `it`.
pub(super) fn mnemonic(firstcond: u32, mask: u32) -> Option<String> {
    let mask = mask & 0xF;
    if mask == 0 {
        return None;
    }
    let mut text = String::from("it");
    let last = mask.trailing_zeros();
    for bit in (last + 1..4).rev() {
        let then = (mask >> bit) & 1 == firstcond & 1;
        text.push(if then { 't' } else { 'e' });
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(mut state: ItState) -> Vec<Option<Condition>> {
        (0..5)
            .map(|_| {
                let cond = state.condition();
                if state.is_active() {
                    state.advance();
                }
                cond
            })
            .collect()
    }

    #[test]
    fn test_itet_eq_sequence() {
        // 0xbf0a: itet eq
        let state = ItState::new(0x0, 0xA);
        assert_eq!(state.remaining(), 3);
        assert_eq!(
            slots(state),
            vec![
                Some(Condition::Equal),
                Some(Condition::NotEqual),
                Some(Condition::Equal),
                None,
                None
            ]
        );
    }

    #[test]
    fn test_single_slot_block() {
        let mut state = ItState::new(0xC, 0x8);
        assert_eq!(state.remaining(), 1);
        assert_eq!(state.condition(), Some(Condition::Greater));
        state.advance();
        assert!(!state.is_active());
        assert_eq!(state.raw(), (0, 0));
    }

    #[test]
    fn test_four_slots_with_odd_firstcond() {
        // ittee ne: firstcond 0001, mask 1001
        let state = ItState::new(0x1, 0x9);
        assert_eq!(state.remaining(), 4);
        assert_eq!(
            slots(state),
            vec![
                Some(Condition::NotEqual),
                Some(Condition::NotEqual),
                Some(Condition::Equal),
                Some(Condition::Equal),
                None
            ]
        );
    }

    #[test]
    fn test_mnemonic_letters() {
        assert_eq!(mnemonic(0x0, 0x8).as_deref(), Some("it"));
        assert_eq!(mnemonic(0x0, 0xA).as_deref(), Some("itet"));
        assert_eq!(mnemonic(0x1, 0x9).as_deref(), Some("ittee"));
        assert_eq!(mnemonic(0x1, 0x3).as_deref(), Some("iteet"));
        assert_eq!(mnemonic(0x0, 0x4).as_deref(), Some("itt"));
        assert_eq!(mnemonic(0x0, 0x0), None);
    }
}
