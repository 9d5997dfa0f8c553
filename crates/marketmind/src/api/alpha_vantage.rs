//! Alpha Vantage API client: symbol search, quotes, overviews, news sentiment

use crate::error::{Result, StockError};
use crate::model::{Item, Quote, Sentiment, Symbol};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use marketmind_utils::env_var;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_NAME: &str = "Alpha Vantage";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Alpha Vantage API client
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

/// Company overview data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompanyOverview {
    pub symbol: String,
    pub name: String,
    pub exchange: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    pub market_cap: Option<String>,
    #[serde(rename = "PERatio")]
    pub pe_ratio: Option<String>,
    #[serde(rename = "DividendYield")]
    pub dividend_yield: Option<String>,
    #[serde(rename = "EPS")]
    pub eps: Option<String>,
}

impl AlphaVantageClient {
    /// Create a new Alpha Vantage client
    ///
    /// # Arguments
    /// * `api_key` - Alpha Vantage API key
    /// * `rate_limit` - Maximum requests per minute (free tier: 5)
    /// * `request_timeout` - Per-request timeout
    pub fn new(api_key: impl Into<String>, rate_limit: u32, request_timeout: Duration) -> Result<Self> {
        let per_minute = NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Ok(Self {
            client: Client::builder().timeout(request_timeout).build()?,
            api_key: api_key.into(),
            rate_limiter,
        })
    }

    /// Create from environment variable ALPHA_VANTAGE_API_KEY with free-tier limits
    pub fn from_env() -> Result<Self> {
        let api_key = env_var("ALPHA_VANTAGE_API_KEY").ok_or_else(|| {
            StockError::ConfigError(
                "ALPHA_VANTAGE_API_KEY environment variable not set".to_string(),
            )
        })?;

        Self::new(api_key, 5, Duration::from_secs(30))
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Value> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(BASE_URL)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StockError::AlphaVantageError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let data: Value = response.json().await?;
        check_api_errors(&data)?;
        Ok(data)
    }

    /// Search for symbols matching free text
    pub async fn search_symbol(&self, keywords: &str) -> Result<Vec<Item>> {
        let data = self
            .query(&[("function", "SYMBOL_SEARCH"), ("keywords", keywords)])
            .await?;
        Ok(parse_search_matches(&data))
    }

    /// Get global quote (current price data)
    pub async fn get_quote(&self, symbol: &Symbol) -> Result<Quote> {
        let data = self
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol.as_str())])
            .await?;
        parse_global_quote(symbol, &data)
    }

    /// Get company overview and fundamental data
    pub async fn get_company_overview(&self, symbol: &Symbol) -> Result<CompanyOverview> {
        let data = self
            .query(&[("function", "OVERVIEW"), ("symbol", symbol.as_str())])
            .await?;

        // Unknown symbols come back as an empty object
        if data.as_object().is_none_or(serde_json::Map::is_empty) {
            return Err(StockError::InvalidSymbol(symbol.to_string()));
        }

        Ok(serde_json::from_value(data)?)
    }

    /// Get per-ticker sentiment from the news feed mentioning `symbol`
    pub async fn get_news_sentiment(&self, symbol: &Symbol) -> Result<Vec<Sentiment>> {
        let data = self
            .query(&[("function", "NEWS_SENTIMENT"), ("tickers", symbol.as_str())])
            .await?;
        Ok(parse_news_sentiment(&data))
    }
}

fn check_api_errors(data: &Value) -> Result<()> {
    if let Some(error) = data.get("Error Message") {
        return Err(StockError::AlphaVantageError(error.to_string()));
    }

    // Throttled responses carry a "Note" (older API) or "Information" message
    if data.get("Note").is_some() || data.get("Information").is_some() {
        return Err(StockError::RateLimitExceeded {
            provider: PROVIDER_NAME.to_string(),
        });
    }

    Ok(())
}

fn parse_search_matches(data: &Value) -> Vec<Item> {
    let Some(matches) = data.get("bestMatches").and_then(Value::as_array) else {
        return Vec::new();
    };

    matches
        .iter()
        .filter_map(|m| {
            let symbol = Symbol::new(m.get("1. symbol")?.as_str()?).ok()?;
            let item = Item::new(symbol);
            Some(match m.get("2. name").and_then(Value::as_str) {
                Some(name) => item.with_name(name),
                None => item,
            })
        })
        .collect()
}

fn decimal_field(quote: &Value, key: &str) -> Option<Decimal> {
    let raw = quote.get(key)?.as_str()?.trim().trim_end_matches('%');
    Decimal::from_str(raw).ok()
}

fn parse_global_quote(symbol: &Symbol, data: &Value) -> Result<Quote> {
    let unavailable = |reason: &str| StockError::DataUnavailable {
        symbol: symbol.to_string(),
        reason: reason.to_string(),
    };

    let quote = data
        .get("Global Quote")
        .filter(|q| q.as_object().is_some_and(|o| !o.is_empty()))
        .ok_or_else(|| unavailable("empty global quote"))?;

    Ok(Quote {
        price: decimal_field(quote, "05. price").ok_or_else(|| unavailable("missing price"))?,
        change: decimal_field(quote, "09. change").unwrap_or_default(),
        percent_change: decimal_field(quote, "10. change percent").unwrap_or_default(),
    })
}

fn float_field(entry: &Value, key: &str) -> f64 {
    entry
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

fn parse_news_sentiment(data: &Value) -> Vec<Sentiment> {
    let Some(feed) = data.get("feed").and_then(Value::as_array) else {
        return Vec::new();
    };

    feed.iter()
        .filter_map(|article| article.get("ticker_sentiment").and_then(Value::as_array))
        .flatten()
        .filter_map(|entry| {
            let ticker = entry.get("ticker").and_then(Value::as_str).unwrap_or("N/A");
            Some(Sentiment {
                ticker: Symbol::new(ticker).ok()?,
                score: float_field(entry, "ticker_sentiment_score"),
                label: entry
                    .get("ticker_sentiment_label")
                    .and_then(Value::as_str)
                    .unwrap_or("N/A")
                    .to_string(),
                relevance: float_field(entry, "relevance_score"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = AlphaVantageClient::new("test_key", 5, Duration::from_secs(5)).unwrap();
        assert_eq!(client.api_key, "test_key");
    }

    #[test]
    fn test_api_error_detection() {
        let err = check_api_errors(&json!({"Error Message": "Invalid API call"})).unwrap_err();
        assert!(matches!(err, StockError::AlphaVantageError(_)));

        let err = check_api_errors(&json!({"Information": "Thank you for using Alpha Vantage!"}))
            .unwrap_err();
        assert!(matches!(err, StockError::RateLimitExceeded { .. }));

        assert!(check_api_errors(&json!({"bestMatches": []})).is_ok());
    }

    #[test]
    fn test_parse_search_matches() {
        let data = json!({
            "bestMatches": [
                {"1. symbol": "NVDA", "2. name": "NVIDIA Corp", "3. type": "Equity"},
                {"1. symbol": "nvd.de", "2. name": "NVIDIA Corp (XETRA)"},
                {"1. symbol": "", "2. name": "broken"},
                {"2. name": "no symbol"}
            ]
        });

        let items = parse_search_matches(&data);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].symbol, sym("NVDA"));
        assert_eq!(items[0].name.as_deref(), Some("NVIDIA Corp"));
        assert_eq!(items[1].symbol.as_str(), "NVD.DE");
        assert!(parse_search_matches(&json!({})).is_empty());
    }

    #[test]
    fn test_parse_global_quote() {
        let data = json!({
            "Global Quote": {
                "01. symbol": "AAPL",
                "05. price": "187.4400",
                "09. change": "-1.2000",
                "10. change percent": "-0.6400%"
            }
        });

        let quote = parse_global_quote(&sym("AAPL"), &data).unwrap();
        assert_eq!(quote.price, Decimal::new(18_744, 2));
        assert_eq!(quote.change, Decimal::new(-12, 1));
        assert_eq!(quote.percent_change, Decimal::new(-64, 2));
    }

    #[test]
    fn test_parse_empty_global_quote() {
        let err = parse_global_quote(&sym("ZZZZ"), &json!({"Global Quote": {}})).unwrap_err();
        assert!(matches!(err, StockError::DataUnavailable { .. }));
    }

    #[test]
    fn test_parse_news_sentiment() {
        let data = json!({
            "items": "2",
            "feed": [
                {
                    "title": "Chipmakers rally",
                    "ticker_sentiment": [
                        {
                            "ticker": "NVDA",
                            "relevance_score": "0.812",
                            "ticker_sentiment_score": "0.351",
                            "ticker_sentiment_label": "Bullish"
                        },
                        {
                            "ticker": "AMD",
                            "relevance_score": "not a number",
                            "ticker_sentiment_label": "Neutral"
                        }
                    ]
                },
                {"title": "No tickers here"},
                {
                    "title": "Export limits",
                    "ticker_sentiment": [{"ticker_sentiment_score": "-0.2"}]
                }
            ]
        });

        let sentiments = parse_news_sentiment(&data);
        assert_eq!(sentiments.len(), 3);

        assert_eq!(sentiments[0].ticker, sym("NVDA"));
        assert!((sentiments[0].score - 0.351).abs() < f64::EPSILON);
        assert!((sentiments[0].relevance - 0.812).abs() < f64::EPSILON);
        assert_eq!(sentiments[0].label, "Bullish");

        assert_eq!(sentiments[1].score, 0.0);
        assert_eq!(sentiments[1].relevance, 0.0);

        assert_eq!(sentiments[2].ticker.as_str(), "N/A");
        assert_eq!(sentiments[2].label, "N/A");
        assert!(parse_news_sentiment(&json!({})).is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires API key and network access
    async fn test_get_company_overview() {
        let client = AlphaVantageClient::from_env().unwrap();
        let overview = client.get_company_overview(&sym("AAPL")).await.unwrap();
        assert_eq!(overview.symbol, "AAPL");
        assert!(overview.name.contains("Apple"));
    }

    #[tokio::test]
    #[ignore] // Requires API key and network access
    async fn test_get_news_sentiment() {
        let client = AlphaVantageClient::from_env().unwrap();
        let sentiments = client.get_news_sentiment(&sym("AAPL")).await;
        assert!(sentiments.is_ok());
    }
}
