//! Configuration for detail aggregation, search and the live provider

use crate::error::{Result, StockError};
use marketmind_utils::env_var;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Symbols listed in the add-stock screen before the user searches
pub const DEFAULT_POPULAR_SYMBOLS: &[&str] = &[
    "AAPL", "TSLA", "NVDA", "MSFT", "SNAP", "UBER", "AMD", "META", "AMZN", "SHOP",
];

/// Configuration shared by the aggregator, the debouncer and the live provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockConfig {
    /// Quiescence window before a query edit turns into a search
    pub search_debounce: Duration,

    /// Upper bound for a single detail or sentiment fetch; `None` waits forever
    pub detail_timeout: Option<Duration>,

    /// Cache TTL for real-time data (quotes, search hits)
    pub cache_ttl_realtime: Duration,

    /// Cache TTL for fundamental data
    pub cache_ttl_fundamental: Duration,

    /// Cache TTL for news and sentiment
    pub cache_ttl_news: Duration,

    /// Maximum number of attempts for API calls
    pub max_retries: u32,

    /// Initial backoff duration for retries
    pub retry_backoff_base: Duration,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// Alpha Vantage API key (required by the live provider)
    pub alpha_vantage_api_key: Option<String>,

    /// Alpha Vantage requests per minute
    pub alpha_vantage_rate_limit: u32,

    /// Finnhub API key (optional; enables news and logo)
    pub finnhub_api_key: Option<String>,

    /// Finnhub requests per minute
    pub finnhub_rate_limit: u32,

    /// How many days of company news to show
    pub news_lookback_days: u32,

    /// Symbols suggested before any search
    pub popular_symbols: Vec<String>,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(500),
            detail_timeout: Some(Duration::from_secs(30)),
            cache_ttl_realtime: Duration::from_secs(60),        // 1 minute
            cache_ttl_fundamental: Duration::from_secs(3600),   // 1 hour
            cache_ttl_news: Duration::from_secs(300),           // 5 minutes
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            alpha_vantage_api_key: None,
            alpha_vantage_rate_limit: 5,
            finnhub_api_key: None,
            finnhub_rate_limit: 60,
            news_lookback_days: 7,
            popular_symbols: DEFAULT_POPULAR_SYMBOLS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl StockConfig {
    /// Create a new configuration builder
    pub fn builder() -> StockConfigBuilder {
        StockConfigBuilder::default()
    }

    /// Load API keys from the environment, keeping existing values when unset
    pub fn with_env_keys(mut self) -> Self {
        if let Some(key) = env_var("ALPHA_VANTAGE_API_KEY") {
            self.alpha_vantage_api_key = Some(key);
        }
        if let Some(key) = env_var("FINNHUB_API_KEY") {
            self.finnhub_api_key = Some(key);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.search_debounce.is_zero() {
            return Err(StockError::ConfigError(
                "search_debounce must be greater than zero".to_string(),
            ));
        }

        if self.detail_timeout.is_some_and(|t| t.is_zero()) {
            return Err(StockError::ConfigError(
                "detail_timeout must be greater than zero when set".to_string(),
            ));
        }

        if self.max_retries == 0 {
            return Err(StockError::ConfigError(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        if self.alpha_vantage_rate_limit == 0 || self.finnhub_rate_limit == 0 {
            return Err(StockError::ConfigError(
                "rate limits must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for StockConfig
#[derive(Debug, Default)]
pub struct StockConfigBuilder {
    search_debounce: Option<Duration>,
    detail_timeout: Option<Option<Duration>>,
    cache_ttl_realtime: Option<Duration>,
    cache_ttl_fundamental: Option<Duration>,
    cache_ttl_news: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
    request_timeout: Option<Duration>,
    alpha_vantage_api_key: Option<String>,
    alpha_vantage_rate_limit: Option<u32>,
    finnhub_api_key: Option<String>,
    finnhub_rate_limit: Option<u32>,
    news_lookback_days: Option<u32>,
    popular_symbols: Option<Vec<String>>,
}

impl StockConfigBuilder {
    /// Set the search debounce window
    pub fn search_debounce(mut self, window: Duration) -> Self {
        self.search_debounce = Some(window);
        self
    }

    /// Bound detail and sentiment fetches
    pub fn detail_timeout(mut self, timeout: Duration) -> Self {
        self.detail_timeout = Some(Some(timeout));
        self
    }

    /// Wait for detail and sentiment fetches without a bound
    pub fn no_detail_timeout(mut self) -> Self {
        self.detail_timeout = Some(None);
        self
    }

    /// Set cache TTL for real-time data
    pub fn cache_ttl_realtime(mut self, duration: Duration) -> Self {
        self.cache_ttl_realtime = Some(duration);
        self
    }

    /// Set cache TTL for fundamental data
    pub fn cache_ttl_fundamental(mut self, duration: Duration) -> Self {
        self.cache_ttl_fundamental = Some(duration);
        self
    }

    /// Set cache TTL for news data
    pub fn cache_ttl_news(mut self, duration: Duration) -> Self {
        self.cache_ttl_news = Some(duration);
        self
    }

    /// Set maximum retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set Alpha Vantage API key
    pub fn alpha_vantage_api_key(mut self, key: impl Into<String>) -> Self {
        self.alpha_vantage_api_key = Some(key.into());
        self
    }

    /// Set Alpha Vantage requests per minute
    pub fn alpha_vantage_rate_limit(mut self, per_minute: u32) -> Self {
        self.alpha_vantage_rate_limit = Some(per_minute);
        self
    }

    /// Set Finnhub API key
    pub fn finnhub_api_key(mut self, key: impl Into<String>) -> Self {
        self.finnhub_api_key = Some(key.into());
        self
    }

    /// Set Finnhub requests per minute
    pub fn finnhub_rate_limit(mut self, per_minute: u32) -> Self {
        self.finnhub_rate_limit = Some(per_minute);
        self
    }

    /// Set the company news lookback in days
    pub fn news_lookback_days(mut self, days: u32) -> Self {
        self.news_lookback_days = Some(days);
        self
    }

    /// Replace the popular symbol list
    pub fn popular_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.popular_symbols = Some(symbols.into_iter().map(Into::into).collect());
        self
    }

    /// Load API keys from environment
    pub fn with_env_keys(mut self) -> Self {
        if let Some(key) = env_var("ALPHA_VANTAGE_API_KEY") {
            self.alpha_vantage_api_key = Some(key);
        }
        if let Some(key) = env_var("FINNHUB_API_KEY") {
            self.finnhub_api_key = Some(key);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<StockConfig> {
        let defaults = StockConfig::default();

        let config = StockConfig {
            search_debounce: self.search_debounce.unwrap_or(defaults.search_debounce),
            detail_timeout: self.detail_timeout.unwrap_or(defaults.detail_timeout),
            cache_ttl_realtime: self.cache_ttl_realtime.unwrap_or(defaults.cache_ttl_realtime),
            cache_ttl_fundamental: self.cache_ttl_fundamental.unwrap_or(defaults.cache_ttl_fundamental),
            cache_ttl_news: self.cache_ttl_news.unwrap_or(defaults.cache_ttl_news),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            alpha_vantage_api_key: self.alpha_vantage_api_key,
            alpha_vantage_rate_limit: self
                .alpha_vantage_rate_limit
                .unwrap_or(defaults.alpha_vantage_rate_limit),
            finnhub_api_key: self.finnhub_api_key,
            finnhub_rate_limit: self.finnhub_rate_limit.unwrap_or(defaults.finnhub_rate_limit),
            news_lookback_days: self.news_lookback_days.unwrap_or(defaults.news_lookback_days),
            popular_symbols: self.popular_symbols.unwrap_or(defaults.popular_symbols),
        };

        config.validate()?;
        Ok(config)
    }
}
