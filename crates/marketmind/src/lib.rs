//! Stock detail aggregation and debounced symbol search
//!
//! This crate holds the non-UI core of a stock tracking app:
//!
//! - [`DetailAggregator`]: opens a symbol, shows a first section list at once,
//!   then merges the provider's detail sections and news sentiment as they
//!   arrive, in a fixed order and ignoring results for symbols no longer open
//! - [`SearchDebouncer`]: coalesces keystrokes into one provider search after a
//!   quiet window and publishes rows annotated with watchlist membership
//! - [`MembershipCache`]: the tracked-symbol set consulted on every render
//! - [`Provider`]: the data source contract, with [`api::LiveProvider`] backed
//!   by Alpha Vantage and Finnhub
//!
//! # Example
//!
//! ```rust,ignore
//! use marketmind::{api::LiveProvider, DetailAggregator, MembershipCache, StockConfig, Symbol};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StockConfig::default().with_env_keys();
//!     let provider = Arc::new(LiveProvider::from_config(&config)?);
//!
//!     let mut aggregator = DetailAggregator::new(provider, MembershipCache::new(), &config);
//!     let first = aggregator.open_symbol(Symbol::new("AAPL")?);
//!     println!("{:?}", first.headers());
//!
//!     while let Some(list) = aggregator.next_update().await {
//!         println!("{:?}", list.headers());
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod detail;
pub mod error;
pub mod format;
pub mod generation;
pub mod membership;
pub mod model;
pub mod provider;
pub mod retry;
pub mod search;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use config::StockConfig;
pub use detail::DetailAggregator;
pub use error::{Result, StockError};
pub use membership::{InMemoryWatchlist, MembershipCache, WatchlistStore};
pub use model::{DisplayRow, Item, Quote, Section, SectionList, Sentiment, Symbol};
pub use provider::{DetailPayload, Provider};
pub use search::{SearchDebouncer, SearchResults};
