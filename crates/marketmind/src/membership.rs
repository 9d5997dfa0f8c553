//! Tracked-symbol membership and its persistence collaborator

use crate::error::{Result, StockError};
use crate::model::Symbol;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

/// External owner of the tracked-symbol list
///
/// Loaded once at startup and told about every symbol the user adds. How it
/// stores the list is its own business.
#[cfg_attr(test, mockall::automock)]
pub trait WatchlistStore: Send + Sync {
    /// Symbols tracked when the app starts
    fn load(&self) -> Result<Vec<Symbol>>;

    /// A symbol was added from search
    fn symbol_added(&self, symbol: &Symbol) -> Result<()>;
}

/// Watchlist kept only for the life of the process
#[derive(Debug, Clone, Default)]
pub struct InMemoryWatchlist {
    symbols: Arc<RwLock<Vec<Symbol>>>,
}

impl InMemoryWatchlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut list = Vec::new();
        for symbol in symbols {
            if !list.contains(&symbol) {
                list.push(symbol);
            }
        }
        Self {
            symbols: Arc::new(RwLock::new(list)),
        }
    }

    /// Current list in insertion order
    pub fn symbols(&self) -> Vec<Symbol> {
        self.symbols
            .read()
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}

impl WatchlistStore for InMemoryWatchlist {
    fn load(&self) -> Result<Vec<Symbol>> {
        self.symbols
            .read()
            .map(|list| list.clone())
            .map_err(|e| StockError::WatchlistError(format!("Lock error: {e}")))
    }

    fn symbol_added(&self, symbol: &Symbol) -> Result<()> {
        let mut list = self
            .symbols
            .write()
            .map_err(|e| StockError::WatchlistError(format!("Lock error: {e}")))?;
        if !list.contains(symbol) {
            list.push(symbol.clone());
        }
        Ok(())
    }
}

/// In-memory set of tracked symbols
///
/// Clones share the same set, so the detail aggregator and the search
/// debouncer observe each other's additions immediately. Rows must ask this
/// cache on every render instead of remembering the answer.
#[derive(Debug, Clone, Default)]
pub struct MembershipCache {
    symbols: Arc<RwLock<HashSet<Symbol>>>,
}

impl MembershipCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            symbols: Arc::new(RwLock::new(symbols.into_iter().collect())),
        }
    }

    /// Seed from the persisted watchlist
    pub fn from_store(store: &dyn WatchlistStore) -> Result<Self> {
        let symbols = store.load()?;
        tracing::debug!(count = symbols.len(), "Seeded membership cache");
        Ok(Self::from_symbols(symbols))
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(symbol)
    }

    /// Returns `true` when the symbol was not tracked before
    pub fn add(&self, symbol: Symbol) -> bool {
        self.symbols
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol)
    }

    /// Tracked symbols, sorted
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .symbols
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.symbols
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    #[test]
    fn test_add_and_contains() {
        let cache = MembershipCache::new();
        assert!(cache.is_empty());
        assert!(!cache.contains(&sym("AAPL")));

        assert!(cache.add(sym("AAPL")));
        assert!(!cache.add(sym("aapl")));
        assert!(cache.contains(&sym("AAPL")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let cache = MembershipCache::new();
        let other = cache.clone();
        other.add(sym("NVDA"));
        assert!(cache.contains(&sym("NVDA")));
    }

    #[test]
    fn test_seed_from_store() {
        let store = InMemoryWatchlist::with_symbols([sym("TSLA"), sym("AAPL"), sym("TSLA")]);
        let cache = MembershipCache::from_store(&store).unwrap();
        assert_eq!(cache.symbols(), vec![sym("AAPL"), sym("TSLA")]);
    }

    #[test]
    fn test_seed_propagates_store_failure() {
        let mut store = MockWatchlistStore::new();
        store
            .expect_load()
            .times(1)
            .returning(|| Err(StockError::WatchlistError("disk gone".into())));

        let err = MembershipCache::from_store(&store).unwrap_err();
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn test_in_memory_watchlist_appends_once() {
        let store = InMemoryWatchlist::new();
        store.symbol_added(&sym("AMD")).unwrap();
        store.symbol_added(&sym("AMD")).unwrap();
        store.symbol_added(&sym("META")).unwrap();
        assert_eq!(store.symbols(), vec![sym("AMD"), sym("META")]);
        assert_eq!(store.load().unwrap().len(), 2);
    }
}
