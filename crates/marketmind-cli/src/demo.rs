//! Canned provider for running without network access

use crate::QuoteSource;
use async_trait::async_trait;
use marketmind::{
    DetailPayload, DisplayRow, Item, Provider, Quote, Section, Sentiment, StockError, Symbol,
};
use rust_decimal::Decimal;
use std::time::Duration;
use url::Url;

/// symbol, name, exchange, price, change, percent change (hundredths)
const CATALOG: &[(&str, &str, &str, i64, i64, i64)] = &[
    ("AAPL", "Apple Inc", "NASDAQ", 18_744, -120, -64),
    ("TSLA", "Tesla Inc", "NASDAQ", 24_812, 731, 303),
    ("NVDA", "NVIDIA Corp", "NASDAQ", 49_522, 1_204, 249),
    ("MSFT", "Microsoft Corp", "NASDAQ", 41_560, 215, 52),
    ("SNAP", "Snap Inc", "NYSE", 1_103, -29, -256),
    ("UBER", "Uber Technologies Inc", "NYSE", 7_218, 66, 92),
    ("AMD", "Advanced Micro Devices Inc", "NASDAQ", 16_030, -288, -177),
    ("META", "Meta Platforms Inc", "NASDAQ", 50_317, 412, 83),
    ("AMZN", "Amazon.com Inc", "NASDAQ", 18_669, -15, -8),
    ("SHOP", "Shopify Inc", "NASDAQ", 7_744, 190, 251),
];

struct Listing {
    symbol: Symbol,
    name: &'static str,
    exchange: &'static str,
    quote: Quote,
}

fn listings() -> impl Iterator<Item = Listing> {
    CATALOG
        .iter()
        .filter_map(|&(symbol, name, exchange, price, change, percent)| {
            Some(Listing {
                symbol: Symbol::new(symbol).ok()?,
                name,
                exchange,
                quote: Quote {
                    price: Decimal::new(price, 2),
                    change: Decimal::new(change, 2),
                    percent_change: Decimal::new(percent, 2),
                },
            })
        })
}

fn listing(symbol: &Symbol) -> Option<Listing> {
    listings().find(|l| &l.symbol == symbol)
}

fn sentiment_label(score: f64) -> &'static str {
    match score {
        s if s >= 0.35 => "Bullish",
        s if s >= 0.15 => "Somewhat-Bullish",
        s if s > -0.15 => "Neutral",
        s if s > -0.35 => "Somewhat-Bearish",
        _ => "Bearish",
    }
}

/// [`Provider`] serving a fixed catalog with simulated latency
pub struct DemoProvider {
    latency: Duration,
}

impl DemoProvider {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

#[async_trait]
impl Provider for DemoProvider {
    async fn search(&self, query: &str) -> Option<Vec<Item>> {
        tokio::time::sleep(self.latency).await;

        let needle = query.trim().to_lowercase();
        let items = listings()
            .filter(|l| {
                l.symbol.as_str().to_lowercase().starts_with(&needle)
                    || l.name.to_lowercase().contains(&needle)
            })
            .map(|l| Item::new(l.symbol).with_name(l.name).with_quote(l.quote))
            .collect();
        Some(items)
    }

    async fn fetch_detail(&self, symbol: &Symbol) -> DetailPayload {
        // detail is the slow source, sentiment usually lands first
        tokio::time::sleep(self.latency * 3).await;

        let Some(listing) = listing(symbol) else {
            return DetailPayload::default();
        };

        let company = Section::new(
            "Company",
            vec![
                DisplayRow::new(listing.name).with_subtitle(listing.symbol.as_str()),
                DisplayRow::new("Exchange").with_subtitle(listing.exchange),
            ],
        );

        let news_rows = ["Quarterly results beat estimates", "Analysts revise targets"]
            .iter()
            .enumerate()
            .map(|(i, headline)| {
                let row = DisplayRow::new(format!("{}: {headline}", listing.name))
                    .with_subtitle("Demo Wire");
                let link = format!(
                    "https://example.com/news/{}/{}",
                    listing.symbol.as_str().to_lowercase(),
                    i + 1
                );
                match Url::parse(&link) {
                    Ok(url) => row.with_url(url),
                    Err(_) => row,
                }
            })
            .collect();

        DetailPayload::new(vec![company, Section::new("News", news_rows)])
    }

    async fn fetch_sentiment(&self, symbol: &Symbol) -> marketmind::Result<Vec<Sentiment>> {
        tokio::time::sleep(self.latency).await;

        let listing = listing(symbol).ok_or_else(|| StockError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "not in the demo catalog".to_string(),
        })?;

        let score = f64::try_from(listing.quote.percent_change / Decimal::from(10))
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0);
        Ok(vec![Sentiment {
            ticker: listing.symbol,
            score,
            label: sentiment_label(score).to_string(),
            relevance: 0.9,
        }])
    }
}

#[async_trait]
impl QuoteSource for DemoProvider {
    async fn quote(&self, symbol: &Symbol) -> Option<Quote> {
        listing(symbol).map(|l| l.quote)
    }
}
