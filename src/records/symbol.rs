//! # Symbol Tables and Storage Facades
//!
//! SYMBOL columns store a dense `i32` key per row; the string lives once in
//! a per-column [`SymbolTable`]. A [`StorageFacade`] hands out the table for a
//! column index and is bound by whichever cursor currently produces rows,
//! since operators that rename or reorder columns must remap indices.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::types::SYMBOL_NULL_KEY;

/// Bidirectional `i32` key <-> string dictionary for one SYMBOL column.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    values: Vec<String>,
    keys: HashMap<String, i32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `value`, returning its key. `None` maps to the null key.
    pub fn put(&mut self, value: Option<&str>) -> i32 {
        let Some(value) = value else {
            return SYMBOL_NULL_KEY;
        };
        if let Some(&key) = self.keys.get(value) {
            return key;
        }
        let key = self.values.len() as i32;
        self.values.push(value.to_owned());
        self.keys.insert(value.to_owned(), key);
        key
    }

    /// Key of `value`, or the null key when absent.
    pub fn key_of(&self, value: &str) -> i32 {
        self.keys.get(value).copied().unwrap_or(SYMBOL_NULL_KEY)
    }

    pub fn value(&self, key: i32) -> Option<&str> {
        if key < 0 {
            return None;
        }
        self.values.get(key as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolves SYMBOL column indices to their dictionaries.
pub trait StorageFacade {
    fn symbol_table(&self, col: usize) -> Option<&SymbolTable>;
}

/// Facade for row sets without symbol columns.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSymbols;

impl StorageFacade for NoSymbols {
    fn symbol_table(&self, _col: usize) -> Option<&SymbolTable> {
        None
    }
}

/// Facade that translates column indices before delegating, used by
/// operators whose output columns map onto one or more inputs.
pub struct RemappedStorageFacade {
    sources: Vec<Arc<dyn StorageFacade>>,
    mapping: Vec<Option<(usize, usize)>>,
}

impl RemappedStorageFacade {
    /// `mapping[col]` names the `(source, source_col)` backing output `col`.
    pub fn new(sources: Vec<Arc<dyn StorageFacade>>, mapping: Vec<Option<(usize, usize)>>) -> Self {
        Self { sources, mapping }
    }
}

impl StorageFacade for RemappedStorageFacade {
    fn symbol_table(&self, col: usize) -> Option<&SymbolTable> {
        let (source, source_col) = (*self.mapping.get(col)?)?;
        self.sources.get(source)?.symbol_table(source_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_interns_and_resolves() {
        let mut table = SymbolTable::new();
        let a = table.put(Some("AAPL"));
        let b = table.put(Some("MSFT"));
        assert_eq!(table.put(Some("AAPL")), a);
        assert_ne!(a, b);
        assert_eq!(table.value(b), Some("MSFT"));
        assert_eq!(table.key_of("MSFT"), b);
        assert_eq!(table.key_of("IBM"), SYMBOL_NULL_KEY);
        assert_eq!(table.put(None), SYMBOL_NULL_KEY);
        assert_eq!(table.value(SYMBOL_NULL_KEY), None);
    }

    #[test]
    fn remapped_facade_translates_indices() {
        let mut table = SymbolTable::new();
        table.put(Some("x"));

        struct One(SymbolTable);
        impl StorageFacade for One {
            fn symbol_table(&self, col: usize) -> Option<&SymbolTable> {
                (col == 3).then_some(&self.0)
            }
        }

        let facade = RemappedStorageFacade::new(
            vec![Arc::new(NoSymbols), Arc::new(One(table))],
            vec![None, Some((1, 3))],
        );
        assert!(facade.symbol_table(0).is_none());
        assert_eq!(facade.symbol_table(1).and_then(|t| t.value(0)), Some("x"));
        assert!(facade.symbol_table(7).is_none());
    }
}
