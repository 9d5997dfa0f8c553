//! Debounced symbol search for the add-stock screen

use crate::config::StockConfig;
use crate::generation::{Generation, GenerationCounter, Tagged};
use crate::membership::{MembershipCache, WatchlistStore};
use crate::model::{DisplayRow, Item, Symbol};
use crate::provider::Provider;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Header shown for provider search hits
pub const SEARCH_HEADER: &str = "Search";
/// Header shown before the first search
pub const POPULAR_HEADER: &str = "Popular Stocks";

/// What the add-stock list currently shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub header: String,
    pub rows: Vec<DisplayRow>,
}

impl SearchResults {
    /// Row for `symbol`, if listed
    pub fn row(&self, symbol: &Symbol) -> Option<&DisplayRow> {
        self.rows.iter().find(|r| r.symbol.as_ref() == Some(symbol))
    }
}

/// Coalesces query edits into at most one outstanding search
///
/// Each edit aborts the pending timer and restarts the quiescence window. A
/// search that already reached the provider is never cancelled; its result is
/// dropped on arrival if a newer query exists. Must be driven from inside a
/// tokio runtime.
pub struct SearchDebouncer {
    provider: Arc<dyn Provider>,
    membership: MembershipCache,
    watchlist: Arc<dyn WatchlistStore>,
    window: Duration,
    generations: GenerationCounter,
    pending_timer: Option<JoinHandle<()>>,
    outstanding: Option<Generation>,
    header: String,
    items: Vec<Item>,
    results_tx: mpsc::UnboundedSender<Tagged<Option<Vec<Item>>>>,
    results_rx: mpsc::UnboundedReceiver<Tagged<Option<Vec<Item>>>>,
    published: watch::Sender<SearchResults>,
}

impl SearchDebouncer {
    pub fn new(
        provider: Arc<dyn Provider>,
        membership: MembershipCache,
        watchlist: Arc<dyn WatchlistStore>,
        config: &StockConfig,
    ) -> Self {
        let items: Vec<Item> = config
            .popular_symbols
            .iter()
            .filter_map(|raw| match Symbol::new(raw) {
                Ok(symbol) => Some(Item::new(symbol)),
                Err(e) => {
                    warn!(error = %e, "Skipping popular symbol");
                    None
                }
            })
            .collect();

        let initial = render(POPULAR_HEADER, &items, &membership);
        let (published, _) = watch::channel(initial);
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        Self {
            provider,
            membership,
            watchlist,
            window: config.search_debounce,
            generations: GenerationCounter::new(),
            pending_timer: None,
            outstanding: None,
            header: POPULAR_HEADER.to_string(),
            items,
            results_tx,
            results_rx,
            published,
        }
    }

    /// Receive every published result list
    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.published.subscribe()
    }

    /// Register a query edit
    ///
    /// Blank queries cancel whatever is pending and schedule nothing.
    pub fn on_query_changed(&mut self, text: &str) {
        if let Some(timer) = self.pending_timer.take() {
            timer.abort();
        }
        let generation = self.generations.advance();

        let query = text.trim();
        if query.is_empty() {
            debug!(generation = generation.value(), "Blank query, search cleared");
            self.outstanding = None;
            return;
        }

        debug!(query, generation = generation.value(), "Scheduling search");
        self.outstanding = Some(generation);

        let provider = Arc::clone(&self.provider);
        let tx = self.results_tx.clone();
        let window = self.window;
        let query = query.to_string();
        self.pending_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // detached so that aborting the timer never cancels a live request
            tokio::spawn(async move {
                info!(query = %query, generation = generation.value(), "Searching");
                let items = provider.search(&query).await;
                let _ = tx.send(Tagged::new(generation, items));
            });
        }));
    }

    /// Whether a search for the latest query has yet to come back
    pub fn is_pending(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Wait for the results of the latest query
    ///
    /// Returns `None` when no search is outstanding. Superseded results are
    /// discarded; a failed search yields an empty list.
    pub async fn next_results(&mut self) -> Option<SearchResults> {
        while let Some(expected) = self.outstanding {
            let outcome = self.results_rx.recv().await?;

            if outcome.generation != expected {
                debug!(
                    generation = outcome.generation.value(),
                    current = expected.value(),
                    "Dropping stale search results"
                );
                continue;
            }

            self.outstanding = None;
            self.pending_timer = None;
            self.header = SEARCH_HEADER.to_string();
            self.items = outcome.payload.unwrap_or_else(|| {
                warn!("Search failed, showing no results");
                Vec::new()
            });
            debug!(count = self.items.len(), "Search results received");
            return Some(self.publish());
        }
        None
    }

    /// Current list, annotated against the membership cache
    pub fn results(&self) -> SearchResults {
        render(&self.header, &self.items, &self.membership)
    }

    /// Select the row at `index`
    ///
    /// Adds an untracked symbol to the watchlist and republishes so the row
    /// shows as tracked. Returns `false` (and does nothing) for tracked rows
    /// and out-of-range indices.
    pub fn select(&mut self, index: usize) -> bool {
        let Some(item) = self.items.get(index) else {
            debug!(index, "Selection out of range");
            return false;
        };
        let symbol = item.symbol.clone();

        if !self.membership.add(symbol.clone()) {
            debug!(%symbol, "Already tracked, ignoring selection");
            return false;
        }

        if let Err(e) = self.watchlist.symbol_added(&symbol) {
            warn!(%symbol, error = %e, "Failed to record added symbol");
        }
        info!(%symbol, "Symbol added to watchlist");

        self.publish();
        true
    }

    fn publish(&self) -> SearchResults {
        let results = self.results();
        self.published.send_replace(results.clone());
        results
    }
}

fn render(header: &str, items: &[Item], membership: &MembershipCache) -> SearchResults {
    let rows = items
        .iter()
        .map(|item| {
            let mut row = DisplayRow {
                title: Some(item.symbol.to_string()),
                subtitle: item.name.clone(),
                symbol: Some(item.symbol.clone()),
                ..DisplayRow::default()
            };
            row.annotate(membership);
            row
        })
        .collect();

    SearchResults {
        header: header.to_string(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{InMemoryWatchlist, MockWatchlistStore};
    use crate::testing::{ScriptedProvider, sym};
    use mockall::predicate::eq;

    fn config() -> StockConfig {
        StockConfig::builder()
            .popular_symbols(["AAPL", "NVDA", "TSLA"])
            .build()
            .unwrap()
    }

    fn debouncer(provider: &Arc<ScriptedProvider>, membership: MembershipCache) -> SearchDebouncer {
        SearchDebouncer::new(
            provider.clone(),
            membership,
            Arc::new(InMemoryWatchlist::new()),
            &config(),
        )
    }

    fn hit(symbol: &str, name: &str) -> Item {
        Item::new(sym(symbol)).with_name(name)
    }

    fn titles(results: &SearchResults) -> Vec<&str> {
        results
            .rows
            .iter()
            .filter_map(|r| r.title.as_deref())
            .collect()
    }

    #[tokio::test]
    async fn test_popular_list_before_search() {
        let provider = ScriptedProvider::new();
        let membership = MembershipCache::from_symbols([sym("TSLA")]);
        let search = debouncer(&provider, membership);

        let results = search.results();
        assert_eq!(results.header, POPULAR_HEADER);
        assert_eq!(titles(&results), vec!["AAPL", "NVDA", "TSLA"]);
        assert!(results.row(&sym("TSLA")).unwrap().already_tracked);
        assert!(!results.row(&sym("AAPL")).unwrap().already_tracked);
        assert_eq!(*search.subscribe().borrow(), results);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_coalesce_into_one_search() {
        let provider = ScriptedProvider::new();
        provider.answer_search("AAP", Some(vec![hit("AAPL", "Apple Inc")]));
        let mut search = debouncer(&provider, MembershipCache::new());

        search.on_query_changed("A");
        tokio::time::sleep(Duration::from_millis(40)).await;
        search.on_query_changed("AA");
        tokio::time::sleep(Duration::from_millis(40)).await;
        search.on_query_changed("AAP");

        let results = search.next_results().await.unwrap();
        assert_eq!(provider.search_calls(), vec!["AAP"]);
        assert_eq!(results.header, SEARCH_HEADER);
        assert_eq!(titles(&results), vec!["AAPL"]);
        assert_eq!(results.rows[0].subtitle.as_deref(), Some("Apple Inc"));
        assert!(search.next_results().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_waits_for_quiescence_window() {
        let provider = ScriptedProvider::new();
        provider.answer_search("NVDA", Some(vec![hit("NVDA", "NVIDIA Corp")]));
        let mut search = debouncer(&provider, MembershipCache::new());

        let started = tokio::time::Instant::now();
        search.on_query_changed("NVDA");
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(provider.search_calls().is_empty());

        search.next_results().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(provider.search_calls(), vec!["NVDA"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_clears_pending_search() {
        let provider = ScriptedProvider::new();
        let mut search = debouncer(&provider, MembershipCache::new());

        search.on_query_changed("TS");
        assert!(search.is_pending());
        search.on_query_changed("   ");
        assert!(!search.is_pending());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(provider.search_calls().is_empty());
        assert!(search.next_results().await.is_none());
        assert_eq!(search.results().header, POPULAR_HEADER);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_result_for_old_query_is_dropped() {
        let provider = ScriptedProvider::new();
        let apple = provider.gate_search("AAPL");
        let tesla = provider.gate_search("TSLA");
        let mut search = debouncer(&provider, MembershipCache::new());

        search.on_query_changed("AAPL");
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(provider.search_calls(), vec!["AAPL"]);

        search.on_query_changed("TSLA");
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(provider.search_calls(), vec!["AAPL", "TSLA"]);

        apple.send(Some(vec![hit("AAPL", "Apple Inc")])).unwrap();
        tokio::task::yield_now().await;
        tesla.send(Some(vec![hit("TSLA", "Tesla Inc")])).unwrap();

        let results = search.next_results().await.unwrap();
        assert_eq!(titles(&results), vec!["TSLA"]);
        assert!(search.next_results().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_search_yields_empty_results() {
        let provider = ScriptedProvider::new();
        provider.answer_search("ZZZZ", None);
        let mut search = debouncer(&provider, MembershipCache::new());

        search.on_query_changed("ZZZZ");
        let results = search.next_results().await.unwrap();
        assert_eq!(results.header, SEARCH_HEADER);
        assert!(results.rows.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_selecting_flips_row_and_survives_fresh_search() {
        let provider = ScriptedProvider::new();
        provider.answer_search("NVDA", Some(vec![hit("NVDA", "NVIDIA Corp")]));
        let membership = MembershipCache::new();
        let mut search = debouncer(&provider, membership.clone());
        let rx = search.subscribe();

        search.on_query_changed("NVDA");
        let results = search.next_results().await.unwrap();
        assert!(!results.rows[0].already_tracked);

        assert!(search.select(0));
        assert!(search.results().rows[0].already_tracked);
        assert!(rx.borrow().rows[0].already_tracked);
        assert!(membership.contains(&sym("NVDA")));

        search.on_query_changed("NVDA");
        let fresh = search.next_results().await.unwrap();
        assert!(fresh.rows[0].already_tracked);
        assert_eq!(provider.search_calls(), vec!["NVDA", "NVDA"]);
    }

    #[tokio::test]
    async fn test_reselecting_tracked_row_is_noop() {
        let provider = ScriptedProvider::new();
        let mut store = MockWatchlistStore::new();
        store
            .expect_symbol_added()
            .with(eq(sym("AAPL")))
            .times(1)
            .returning(|_| Ok(()));

        let mut search = SearchDebouncer::new(
            provider.clone(),
            MembershipCache::new(),
            Arc::new(store),
            &config(),
        );

        assert!(search.select(0));
        let after_first = search.results();
        assert!(!search.select(0));
        assert_eq!(search.results(), after_first);
        assert!(!search.select(42));
    }

    #[tokio::test]
    async fn test_store_failure_does_not_escape() {
        let provider = ScriptedProvider::new();
        let mut store = MockWatchlistStore::new();
        store
            .expect_symbol_added()
            .times(1)
            .returning(|_| Err(crate::StockError::WatchlistError("read-only".into())));

        let membership = MembershipCache::new();
        let mut search = SearchDebouncer::new(
            provider.clone(),
            membership.clone(),
            Arc::new(store),
            &config(),
        );

        assert!(search.select(1));
        assert!(membership.contains(&sym("NVDA")));
        assert!(search.results().rows[1].already_tracked);
    }
}
