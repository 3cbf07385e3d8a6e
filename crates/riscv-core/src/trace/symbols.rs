use std::collections::HashMap;

/// Longest symbol name kept; longer names are truncated.
pub const MAX_SYMBOL_NAME_LEN: usize = 31;

/// Symbol type as recorded in the image's symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SymbolKind {
    /// Code.
    Function,
    /// Data.
    Object,
    /// Anything else (sections, files, untyped labels).
    Other,
}

/// One entry of the symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Symbol {
    /// Name, at most [`MAX_SYMBOL_NAME_LEN`] characters.
    pub name: String,
    /// Start address.
    pub address: u32,
    /// Size in bytes.
    pub size: u32,
    /// Symbol type.
    pub kind: SymbolKind,
}

impl Symbol {
    /// Creates a symbol, truncating `name` to [`MAX_SYMBOL_NAME_LEN`] characters.
    #[must_use]
    pub fn new(name: &str, address: u32, size: u32, kind: SymbolKind) -> Self {
        Self {
            name: name.chars().take(MAX_SYMBOL_NAME_LEN).collect(),
            address,
            size,
            kind,
        }
    }

    /// Returns `true` when `start <= pc < start + size`.
    #[must_use]
    pub const fn contains(&self, pc: u32) -> bool {
        pc >= self.address && (pc - self.address) < self.size
    }

    const fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function)
    }
}

/// Symbols of the loaded image, ordered by address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, usize>,
}

impl SymbolTable {
    /// Builds a table from `symbols`.
    ///
    /// When two symbols share a name, name lookup returns the first one seen.
    #[must_use]
    pub fn new(mut symbols: Vec<Symbol>) -> Self {
        symbols.sort_by_key(|symbol| symbol.address);
        let mut by_name = HashMap::with_capacity(symbols.len());
        for (index, symbol) in symbols.iter().enumerate() {
            by_name.entry(symbol.name.clone()).or_insert(index);
        }
        Self { symbols, by_name }
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates symbols in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.symbols.iter()
    }

    /// Function whose start address is exactly `addr`.
    #[must_use]
    pub fn function_at(&self, addr: u32) -> Option<&Symbol> {
        self.symbols
            .iter()
            .find(|symbol| symbol.is_function() && symbol.address == addr)
    }

    /// Function whose range contains `pc`.
    #[must_use]
    pub fn function_containing(&self, pc: u32) -> Option<&Symbol> {
        self.symbols
            .iter()
            .find(|symbol| symbol.is_function() && symbol.contains(pc))
    }

    /// Symbol of any kind named `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|index| &self.symbols[*index])
    }
}

impl FromIterator<Symbol> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{Symbol, SymbolKind, SymbolTable, MAX_SYMBOL_NAME_LEN};

    fn table() -> SymbolTable {
        [
            Symbol::new("fib", 0x8000_0100, 0x40, SymbolKind::Function),
            Symbol::new("main", 0x8000_0000, 0x100, SymbolKind::Function),
            Symbol::new("counter", 0x8000_1000, 4, SymbolKind::Object),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn exact_match_requires_function_start() {
        let symbols = table();
        assert_eq!(symbols.function_at(0x8000_0100).map(|s| s.name.as_str()), Some("fib"));
        assert!(symbols.function_at(0x8000_0104).is_none());
        assert!(symbols.function_at(0x8000_1000).is_none(), "objects are not call targets");
    }

    #[test]
    fn containment_is_half_open() {
        let symbols = table();
        assert_eq!(
            symbols.function_containing(0x8000_013C).map(|s| s.name.as_str()),
            Some("fib")
        );
        assert!(symbols.function_containing(0x8000_0140).is_none());
        assert_eq!(
            symbols.function_containing(0x8000_00FC).map(|s| s.name.as_str()),
            Some("main")
        );
    }

    #[test]
    fn name_lookup_covers_every_kind() {
        let symbols = table();
        assert_eq!(symbols.lookup("counter").map(|s| s.address), Some(0x8000_1000));
        assert!(symbols.lookup("missing").is_none());
        assert_eq!(symbols.iter().next().map(|s| s.address), Some(0x8000_0000));
    }

    #[test]
    fn long_names_are_truncated() {
        let name = "a".repeat(40);
        let symbol = Symbol::new(&name, 0, 4, SymbolKind::Function);
        assert_eq!(symbol.name.len(), MAX_SYMBOL_NAME_LEN);
    }
}
