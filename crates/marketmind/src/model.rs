//! Data model shared by the aggregator, the debouncer and providers

use crate::error::StockError;
use crate::membership::MembershipCache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use url::Url;

/// Ticker symbol, trimmed and upper-cased
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Normalize and validate a raw ticker
    pub fn new(raw: impl AsRef<str>) -> crate::Result<Self> {
        let normalized = raw.as_ref().trim().to_uppercase();
        if normalized.is_empty() {
            return Err(StockError::InvalidSymbol(raw.as_ref().to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = StockError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Price snapshot; replaced wholesale on refetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Decimal,
    pub change: Decimal,
    pub percent_change: Decimal,
}

/// A tradable security, identified by symbol alone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub symbol: Symbol,
    /// Company name, when the source knows it
    pub name: Option<String>,
    /// Last cached quote
    pub quote: Option<Quote>,
}

impl Item {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            name: None,
            quote: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quote = Some(quote);
        self
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

/// Per-ticker sentiment extracted from one news article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub ticker: Symbol,
    pub score: f64,
    pub label: String,
    pub relevance: f64,
}

/// One row of a section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub url: Option<Url>,
    pub sentiment_label: Option<String>,
    /// Subject of the row; drives `already_tracked`
    pub symbol: Option<Symbol>,
    /// Recomputed from the membership cache on every render
    pub already_tracked: bool,
}

impl DisplayRow {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_sentiment_label(mut self, label: impl Into<String>) -> Self {
        self.sentiment_label = Some(label.into());
        self
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    /// Secondary line: the sentiment label when present, else the subtitle
    pub fn detail_text(&self) -> Option<&str> {
        self.sentiment_label
            .as_deref()
            .or(self.subtitle.as_deref())
    }

    /// Refresh `already_tracked` from the membership cache
    pub fn annotate(&mut self, membership: &MembershipCache) {
        self.already_tracked = self
            .symbol
            .as_ref()
            .is_some_and(|symbol| membership.contains(symbol));
    }
}

/// Named, ordered group of rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub header: String,
    pub rows: Vec<DisplayRow>,
}

impl Section {
    pub fn new(header: impl Into<String>, rows: Vec<DisplayRow>) -> Self {
        Self {
            header: header.into(),
            rows,
        }
    }
}

/// Snapshot of the detail view for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionList {
    pub symbol: Symbol,
    pub sections: Vec<Section>,
    /// True until the detail source has resolved or timed out
    pub loading: bool,
}

impl SectionList {
    /// Look a section up by header
    pub fn section(&self, header: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.header == header)
    }

    pub fn headers(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.header.as_str()).collect()
    }

    /// Row at `(section, row)` by position in this snapshot
    pub fn row(&self, section: usize, row: usize) -> Option<&DisplayRow> {
        self.sections.get(section)?.rows.get(row)
    }
}
