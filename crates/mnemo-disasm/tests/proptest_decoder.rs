//! Property-based tests for the instruction decoders.
//!
//! These tests check properties that should hold for all decoders:
//! - Decoding never panics on arbitrary input
//! - Walks always make progress and report increasing addresses
//! - Decoding is deterministic for a fresh context
//! - IT blocks and pool ranges keep their bookkeeping consistent

use proptest::prelude::*;

use mnemo_core::{CodePool, Mode, PoolKind};
use mnemo_disasm::arm::ItState;
use mnemo_disasm::{
    Arm64Disassembler, ArmDisassembler, Armv8mDisassembler, Disassembler, RiscVDisassembler,
    WalkControl, WalkOutcome,
};

/// Walks `bytes` and returns every reported address.
fn walk_addresses<D: Disassembler>(
    disasm: &mut D,
    bytes: &[u8],
    base: u64,
) -> (Vec<u64>, WalkOutcome) {
    let mut addresses = Vec::new();
    let outcome = disasm
        .disassemble_buffer(bytes, base, |address, text| {
            assert!(!text.is_empty());
            addresses.push(address);
            WalkControl::Continue
        })
        .expect("walk should not fail");
    (addresses, outcome)
}

fn assert_progress(addresses: &[u64], outcome: WalkOutcome, base: u64, len: usize) {
    assert!(addresses.windows(2).all(|w| w[0] < w[1]));
    if let Some(first) = addresses.first() {
        assert_eq!(*first, base);
    }
    match outcome {
        WalkOutcome::Completed => {}
        WalkOutcome::Incomplete {
            address,
            needed,
            available,
        } => {
            assert!(available < needed);
            assert_eq!(address + available as u64, base + len as u64);
        }
        WalkOutcome::Stopped { .. } => panic!("callback never stops"),
    }
}

// =============================================================================
// 32-bit ARM
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Walking arbitrary Thumb bytes never fails and always makes progress.
    #[test]
    fn thumb_walk_makes_progress(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut disasm = ArmDisassembler::new();
        let (addresses, outcome) = walk_addresses(&mut disasm, &bytes, 0x1000);
        assert_progress(&addresses, outcome, 0x1000, bytes.len());
    }

    /// Walking arbitrary A32 bytes never fails.
    #[test]
    fn a32_walk_makes_progress(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut disasm = ArmDisassembler::new();
        let mut addresses = Vec::new();
        let outcome = disasm
            .disassemble_buffer_in(&bytes, 0x8000, Mode::Arm, |address, _| {
                addresses.push(address);
                WalkControl::Continue
            })
            .expect("walk should not fail");
        assert_progress(&addresses, outcome, 0x8000, bytes.len());
    }

    /// Every A32 word decodes to something, either an instruction or `.word`.
    #[test]
    fn a32_decode_is_total(word in any::<u32>(), address in (0u32..0x4000_0000).prop_map(|a| a & !3)) {
        let mut disasm = ArmDisassembler::with_format(mnemo_core::FormatFlags::NONE);
        disasm.set_address(address);
        let decoded = disasm.decode_arm(word).unwrap();
        prop_assert_eq!(decoded.size, 4);
        prop_assert_eq!(decoded.raw, word);
        prop_assert_eq!(decoded.address, u64::from(address));
        prop_assert!(!decoded.text.is_empty());
        prop_assert_eq!(disasm.address(), address + 4);
    }

    /// Thumb sizes agree between `instruction_size` and the decode.
    #[test]
    fn thumb_size_matches_prefix(hw in any::<u16>(), hw2 in any::<u16>()) {
        let mut disasm = ArmDisassembler::new();
        let mut bytes = hw.to_le_bytes().to_vec();
        bytes.extend_from_slice(&hw2.to_le_bytes());
        let expected = disasm.instruction_size(&bytes);
        let decoded = disasm.decode_instruction(&bytes, 0x2000).unwrap();
        prop_assert_eq!(decoded.size, expected);
        prop_assert!(decoded.size == 2 || decoded.size == 4);
    }

    /// A fresh context decodes the same bytes to the same text.
    #[test]
    fn thumb_decode_is_deterministic(hw in any::<u16>(), hw2 in any::<u16>()) {
        let first = ArmDisassembler::new().decode_thumb(hw, hw2).unwrap();
        let second = ArmDisassembler::new().decode_thumb(hw, hw2).unwrap();
        prop_assert_eq!(first, second);
    }

    /// An IT block covers `4 - trailing_zeros(mask)` instructions and the
    /// conditions alternate only between the base condition and its inverse.
    #[test]
    fn it_block_length(firstcond in 0u32..14, mask in 1u32..16) {
        let mut state = ItState::new(firstcond, mask);
        let expected = 4 - mask.trailing_zeros() as usize;
        prop_assert_eq!(state.remaining(), expected);

        for left in (1..=expected).rev() {
            prop_assert_eq!(state.remaining(), left);
            let cond = state.condition().expect("slot inside block");
            prop_assert_eq!(u32::from(cond.bits()) >> 1, firstcond >> 1);
            state.advance();
        }
        prop_assert!(!state.is_active());
        prop_assert_eq!(state.condition(), None);
    }
}

// =============================================================================
// Other decoders
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Decoding arbitrary ARM64 bytes should never panic.
    #[test]
    fn arm64_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..16)) {
        let mut disasm = Arm64Disassembler::new();
        if let Ok(decoded) = disasm.decode_instruction(&bytes, 0x1000) {
            prop_assert_eq!(decoded.size, 4);
            prop_assert!(!decoded.text.is_empty());
        }
    }

    /// Decoding arbitrary RISC-V words never fails.
    #[test]
    fn riscv_walk_makes_progress(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut disasm = RiscVDisassembler::new();
        let (addresses, outcome) = walk_addresses(&mut disasm, &bytes, 0);
        assert_progress(&addresses, outcome, 0, bytes.len());
        prop_assert_eq!(addresses.len(), bytes.len() / 4);
    }

    /// I-type immediates are sign-extended from 12 bits.
    #[test]
    fn riscv_itype_sign_extension(imm in -2048i32..2048) {
        let word = ((imm as u32 & 0xFFF) << 20) | (10 << 7) | 0b0010011;
        let decoded = RiscVDisassembler::new().decode_word(word, 0).unwrap();
        prop_assert_eq!(decoded.text, format!("li a0, {}", imm));
    }

    /// The ARMv8-M table decodes every halfword.
    #[test]
    fn armv8m_walk_makes_progress(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut disasm = Armv8mDisassembler::new();
        let (addresses, outcome) = walk_addresses(&mut disasm, &bytes, 0x100);
        assert_progress(&addresses, outcome, 0x100, bytes.len());
        prop_assert_eq!(addresses.len(), bytes.len() / 2);
    }
}

// =============================================================================
// Pool ranges
// =============================================================================

proptest! {
    /// Adjacent ranges of one kind merge into a single range.
    #[test]
    fn pool_adjacent_ranges_merge(
        address in 0u32..0x1000_0000,
        sizes in prop::collection::vec(1u32..0x100, 1..8),
    ) {
        let mut pool = CodePool::new();
        let mut next = address;
        for size in &sizes {
            pool.insert(next, *size, PoolKind::Literal).unwrap();
            next += size;
        }
        prop_assert_eq!(pool.len(), 1);
        let range = pool.lookup(address).unwrap();
        prop_assert_eq!(range.address, address);
        prop_assert_eq!(range.size, next - address);
        prop_assert_eq!(pool.kind_at(next), None);
    }

    /// Overlapping ranges of different kinds are rejected.
    #[test]
    fn pool_kinds_never_overlap(
        address in 0u32..0x1000_0000,
        size in 1u32..0x100,
        offset in 0u32..0x100,
        other in 1u32..0x100,
    ) {
        let mut pool = CodePool::new();
        pool.insert(address, size, PoolKind::Code).unwrap();
        let start = address + offset;
        let result = pool.insert(start, other, PoolKind::Literal);
        prop_assert_eq!(result.is_err(), offset < size);
        prop_assert!(pool.iter().all(|r| r.kind == PoolKind::Code || r.address >= address + size));
    }
}
