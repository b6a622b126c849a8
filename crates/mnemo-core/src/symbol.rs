//! Address-keyed symbol table.

use std::collections::BTreeMap;

/// What lives at a symbol's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymbolKind {
    /// Nothing known beyond the name.
    #[default]
    Unknown,
    /// Start of A32 code.
    CodeArm,
    /// Start of Thumb code.
    CodeThumb,
    /// Data object.
    Data,
}

impl SymbolKind {
    /// Returns true for the two code kinds.
    pub fn is_code(&self) -> bool {
        matches!(self, Self::CodeArm | Self::CodeThumb)
    }
}

/// A named (or anonymous) address.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Symbol {
    /// Symbol name; anonymous symbols only carry a kind.
    pub name: Option<String>,
    /// Address, with the Thumb bit already cleared.
    pub address: u32,
    /// Symbol type.
    pub kind: SymbolKind,
}

impl Symbol {
    /// Returns the name, if the symbol has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Symbols unique by address; adding a symbol at a known address replaces
/// the previous entry.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SymbolTable {
    symbols: BTreeMap<u32, Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the symbol at `address`.
    ///
    /// Thumb code addresses are interworking addresses with bit 0 set;
    /// the bit is cleared before the symbol is stored.
    pub fn insert(&mut self, name: Option<&str>, address: u32, kind: SymbolKind) {
        let address = match kind {
            SymbolKind::CodeThumb => address & !1,
            _ => address,
        };
        let symbol = Symbol {
            name: name.map(str::to_owned),
            address,
            kind,
        };
        if let Some(previous) = self.symbols.insert(address, symbol) {
            log::trace!(
                "replaced symbol {:?} at {:#010x}",
                previous.name(),
                address
            );
        }
    }

    /// Exact-address lookup.
    pub fn get(&self, address: u32) -> Option<&Symbol> {
        self.symbols.get(&address)
    }

    /// Name of the symbol at `address`, if it has one.
    pub fn name_at(&self, address: u32) -> Option<&str> {
        self.get(address).and_then(Symbol::name)
    }

    /// Removes the symbol at `address`.
    pub fn remove(&mut self, address: u32) -> Option<Symbol> {
        self.symbols.remove(&address)
    }

    /// Removes every symbol.
    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    /// Iterates in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut table = SymbolTable::new();
        table.insert(Some("first"), 0x100, SymbolKind::Data);
        table.insert(Some("second"), 0x100, SymbolKind::CodeArm);
        assert_eq!(table.len(), 1);
        let sym = table.get(0x100).unwrap();
        assert_eq!(sym.name(), Some("second"));
        assert_eq!(sym.kind, SymbolKind::CodeArm);
    }

    #[test]
    fn test_thumb_bit_cleared() {
        let mut table = SymbolTable::new();
        table.insert(Some("reset_handler"), 0x0800_0101, SymbolKind::CodeThumb);
        assert_eq!(table.name_at(0x0800_0100), Some("reset_handler"));
        assert!(table.get(0x0800_0101).is_none());
    }

    #[test]
    fn test_odd_data_address_kept() {
        let mut table = SymbolTable::new();
        table.insert(Some("byte"), 0x2001, SymbolKind::Data);
        assert!(table.get(0x2001).is_some());
    }

    #[test]
    fn test_anonymous_symbol_has_no_name() {
        let mut table = SymbolTable::new();
        table.insert(None, 0x40, SymbolKind::CodeArm);
        table.insert(Some("main"), 0x80, SymbolKind::CodeArm);
        assert_eq!(table.name_at(0x40), None);
        assert_eq!(table.get(0x40).map(|s| s.kind), Some(SymbolKind::CodeArm));
        assert_eq!(table.name_at(0x80), Some("main"));
        assert!(table.get(0x7C).is_none());
    }
}
