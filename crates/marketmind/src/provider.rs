//! Provider contract: the only network-facing capability the core depends on

use crate::error::Result;
use crate::model::{Item, Section, Sentiment, Symbol};
use async_trait::async_trait;

/// Result of a detail fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPayload {
    /// Extra sections, shown in this order after the price section
    pub sections: Vec<Section>,
    /// Optional logo or chart bytes
    pub image: Option<Vec<u8>>,
}

impl DetailPayload {
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            sections,
            image: None,
        }
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }
}

/// Source of search hits, detail sections and sentiment
///
/// Each call is fire-once. Implementations report failure the way the
/// operation allows: `search` by returning `None`, `fetch_detail` by returning
/// whatever it has (possibly nothing), and `fetch_sentiment` with an error.
/// Callers must tolerate all of these, and must also tolerate a call that
/// never completes.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Find securities matching a free-text query
    async fn search(&self, query: &str) -> Option<Vec<Item>>;

    /// Extra detail sections for a symbol
    async fn fetch_detail(&self, symbol: &Symbol) -> DetailPayload;

    /// News sentiment for a symbol
    async fn fetch_sentiment(&self, symbol: &Symbol) -> Result<Vec<Sentiment>>;
}
