//! Code and literal pool ranges.
//!
//! A pool map records which parts of a code region hold instructions and
//! which hold embedded data (literal pools). The walker renders addresses
//! inside a literal pool as data instead of decoding them.
//!
//! Ranges are kept sorted by address and never overlap. Inserting a range
//! that overlaps or touches a range of the same kind merges both into
//! their union; inserting over a range of a different kind is rejected.

use crate::Error;

/// What a pool range contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PoolKind {
    /// Known instructions.
    Code,
    /// Embedded constants referenced by PC-relative loads.
    Literal,
}

/// A half-open address range `[address, address + size)`.
///
/// A size of zero means the extent is not known yet; such a range only
/// marks its start address until [`CodePool::compact`] extends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolRange {
    /// Start of the range.
    pub address: u32,
    /// Length in bytes.
    pub size: u32,
    /// Contents of the range.
    pub kind: PoolKind,
}

impl PoolRange {
    /// Creates a new range.
    pub fn new(address: u32, size: u32, kind: PoolKind) -> Self {
        Self {
            address,
            size,
            kind,
        }
    }

    /// Exclusive end address.
    pub fn end(&self) -> u64 {
        u64::from(self.address) + u64::from(self.size)
    }

    /// Returns true if `address` lies inside the range.
    pub fn contains(&self, address: u32) -> bool {
        address >= self.address && u64::from(address) < self.end()
    }

    /// End used for overlap checks against other kinds; an unsized range
    /// still occupies its start byte.
    fn occupied_end(&self) -> u64 {
        u64::from(self.address) + u64::from(self.size.max(1))
    }

    fn overlaps(&self, other: &PoolRange) -> bool {
        u64::from(self.address) < other.occupied_end() && u64::from(other.address) < self.occupied_end()
    }

    fn touches(&self, other: &PoolRange) -> bool {
        u64::from(self.address) <= other.end() && u64::from(other.address) <= self.end()
    }
}

/// Sorted, non-overlapping set of pool ranges.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodePool {
    ranges: Vec<PoolRange>,
}

impl CodePool {
    /// Creates an empty pool map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a range, merging it with touching ranges of the same kind.
    pub fn insert(&mut self, address: u32, size: u32, kind: PoolKind) -> Result<(), Error> {
        let range = PoolRange::new(address, size, kind);
        if range.end() > 1 << 32 {
            return Err(Error::AddressOverflow {
                address: u64::from(address),
                size: u64::from(size),
            });
        }

        if let Some(existing) = self
            .ranges
            .iter()
            .find(|r| r.kind != kind && r.overlaps(&range))
        {
            log::warn!(
                "rejected {:?} pool {:#010x}+{:#x}: overlaps {:?} pool at {:#010x}",
                kind,
                address,
                size,
                existing.kind,
                existing.address
            );
            return Err(Error::PoolConflict {
                address,
                size,
                requested: kind,
                existing: existing.kind,
                existing_address: existing.address,
            });
        }

        let mut start = u64::from(address);
        let mut end = range.end();
        self.ranges.retain(|r| {
            if r.kind == kind && r.touches(&range) {
                start = start.min(u64::from(r.address));
                end = end.max(r.end());
                false
            } else {
                true
            }
        });

        let merged = PoolRange::new(start as u32, (end - start) as u32, kind);
        let index = self.ranges.partition_point(|r| r.address < merged.address);
        self.ranges.insert(index, merged);
        Ok(())
    }

    /// Merges same-kind ranges inside the window `[address, address + size)`.
    ///
    /// Neighbouring ranges of the same kind with no range of another kind
    /// between them are joined across the gap, and unsized ranges are
    /// extended to the start of the next range (or the window end).
    /// Returns the number of ranges removed by merging.
    pub fn compact(&mut self, address: u32, size: u32) -> usize {
        let window_start = u64::from(address);
        let window_end = window_start + u64::from(size);
        let in_window =
            |r: &PoolRange| u64::from(r.address) < window_end && r.end() >= window_start;

        let before = self.ranges.len();
        let mut compacted: Vec<PoolRange> = Vec::with_capacity(before);
        for (i, range) in self.ranges.iter().enumerate() {
            let mut range = *range;
            if range.size == 0 && in_window(&range) {
                let limit = self
                    .ranges
                    .get(i + 1)
                    .map_or(window_end, |next| u64::from(next.address).min(window_end));
                range.size = limit.saturating_sub(u64::from(range.address)) as u32;
            }
            match compacted.last_mut() {
                Some(last) if last.kind == range.kind && in_window(&*last) && in_window(&range) => {
                    let end = last.end().max(range.end());
                    last.size = (end - u64::from(last.address)) as u32;
                }
                _ => compacted.push(range),
            }
        }
        self.ranges = compacted;
        before - self.ranges.len()
    }

    /// Returns the range containing `address`, if any.
    pub fn lookup(&self, address: u32) -> Option<&PoolRange> {
        let index = self.ranges.partition_point(|r| r.address <= address);
        index
            .checked_sub(1)
            .and_then(|i| self.ranges.get(i))
            .filter(|r| r.contains(address))
    }

    /// Returns the kind of the range containing `address`, if any.
    pub fn kind_at(&self, address: u32) -> Option<PoolKind> {
        self.lookup(address).map(|r| r.kind)
    }

    /// Removes all ranges.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Iterates over the ranges in address order.
    pub fn iter(&self) -> impl Iterator<Item = &PoolRange> {
        self.ranges.iter()
    }

    /// Number of ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns true if no ranges are registered.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_same_kind_merges() {
        let mut pool = CodePool::new();
        pool.insert(0x1000, 0x10, PoolKind::Literal).unwrap();
        pool.insert(0x1010, 0x10, PoolKind::Literal).unwrap();
        let ranges: Vec<_> = pool.iter().copied().collect();
        assert_eq!(ranges, vec![PoolRange::new(0x1000, 0x20, PoolKind::Literal)]);
    }

    #[test]
    fn test_overlapping_same_kind_merges_to_union() {
        let mut pool = CodePool::new();
        pool.insert(0x2008, 0x10, PoolKind::Code).unwrap();
        pool.insert(0x2000, 0x0C, PoolKind::Code).unwrap();
        pool.insert(0x2030, 0x04, PoolKind::Code).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.lookup(0x2000).map(|r| r.size), Some(0x18));
    }

    #[test]
    fn test_bridging_insert_joins_three_ranges() {
        let mut pool = CodePool::new();
        pool.insert(0x100, 4, PoolKind::Literal).unwrap();
        pool.insert(0x110, 4, PoolKind::Literal).unwrap();
        pool.insert(0x104, 0xC, PoolKind::Literal).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.lookup(0x113).map(|r| (r.address, r.size)), Some((0x100, 0x14)));
    }

    #[test]
    fn test_conflicting_kind_rejected() {
        let mut pool = CodePool::new();
        pool.insert(0x1000, 0x10, PoolKind::Code).unwrap();
        let err = pool.insert(0x100C, 0x8, PoolKind::Literal).unwrap_err();
        assert!(matches!(
            err,
            Error::PoolConflict {
                existing: PoolKind::Code,
                requested: PoolKind::Literal,
                ..
            }
        ));
        // The map is unchanged.
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.kind_at(0x1010), None);
    }

    #[test]
    fn test_touching_different_kinds_coexist() {
        let mut pool = CodePool::new();
        pool.insert(0x1000, 0x10, PoolKind::Code).unwrap();
        pool.insert(0x1010, 0x10, PoolKind::Literal).unwrap();
        assert_eq!(pool.kind_at(0x100F), Some(PoolKind::Code));
        assert_eq!(pool.kind_at(0x1010), Some(PoolKind::Literal));
    }

    #[test]
    fn test_wrapping_range_rejected() {
        let mut pool = CodePool::new();
        assert!(matches!(
            pool.insert(0xFFFF_FFF0, 0x20, PoolKind::Code),
            Err(Error::AddressOverflow { .. })
        ));
    }

    #[test]
    fn test_lookup_misses_gaps() {
        let mut pool = CodePool::new();
        pool.insert(0x40, 8, PoolKind::Literal).unwrap();
        assert!(pool.lookup(0x3F).is_none());
        assert!(pool.lookup(0x48).is_none());
        assert!(pool.lookup(0x47).is_some());
    }

    #[test]
    fn test_compact_joins_gaps_and_sizes_unknown_ranges() {
        let mut pool = CodePool::new();
        pool.insert(0x1000, 4, PoolKind::Literal).unwrap();
        pool.insert(0x1008, 4, PoolKind::Literal).unwrap();
        pool.insert(0x1020, 0, PoolKind::Code).unwrap();
        pool.insert(0x1030, 4, PoolKind::Literal).unwrap();

        let removed = pool.compact(0x1000, 0x40);
        assert_eq!(removed, 1);
        let ranges: Vec<_> = pool.iter().copied().collect();
        assert_eq!(
            ranges,
            vec![
                PoolRange::new(0x1000, 0x0C, PoolKind::Literal),
                PoolRange::new(0x1020, 0x10, PoolKind::Code),
                PoolRange::new(0x1030, 0x04, PoolKind::Literal),
            ]
        );
    }

    #[test]
    fn test_compact_outside_window_is_noop() {
        let mut pool = CodePool::new();
        pool.insert(0x1000, 4, PoolKind::Literal).unwrap();
        pool.insert(0x1008, 4, PoolKind::Literal).unwrap();
        assert_eq!(pool.compact(0x2000, 0x100), 0);
        assert_eq!(pool.len(), 2);
    }
}
