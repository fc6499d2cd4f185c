//! String interning for efficient name deduplication and comparison.
//!
//! Rule, terminal, keyword, and field names are interned once per grammar.
//! Comparing two symbols is O(1) integer comparison. The interner is
//! serializable so compiled artifacts can carry their name table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A lightweight handle to an interned string.
///
/// Symbols are ordered by insertion order, not lexicographically — use
/// [`Interner::resolve`] if you need string ordering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Symbol(u32);

impl Symbol {
    /// Raw index for serialization/debugging.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Create a Symbol from a raw index. Use only for deserialization.
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// String interner. Deduplicates strings and returns cheap [`Symbol`] handles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interner {
    #[serde(skip)]
    map: HashMap<String, Symbol>,
    strings: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its Symbol.
    /// If the string was already interned, returns the existing Symbol.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }

        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(s.to_owned());
        self.map.insert(s.to_owned(), sym);
        sym
    }

    /// Look up a string without interning it.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        if self.map.is_empty() && !self.strings.is_empty() {
            // Deserialized interner: the map is rebuilt lazily by `rehydrate`.
            return self
                .strings
                .iter()
                .position(|it| it == s)
                .map(|idx| Symbol(idx as u32));
        }
        self.map.get(s).copied()
    }

    /// Resolve a symbol back to its string.
    ///
    /// Panics if the symbol did not come from this interner.
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.0 as usize]
    }

    /// Rebuild the lookup map after deserialization.
    pub fn rehydrate(&mut self) {
        if self.map.len() == self.strings.len() {
            return;
        }
        self.map = self
            .strings
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.clone(), Symbol(idx as u32)))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(idx, s)| (Symbol(idx as u32), s.as_str()))
    }
}
