//! Finnhub API client for company news and profiles

use crate::error::{Result, StockError};
use crate::model::Symbol;
use chrono::NaiveDate;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const BASE_URL: &str = "https://finnhub.io/api/v1";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Finnhub news article
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinnhubNewsArticle {
    /// Article category
    pub category: String,
    /// Publish time (UNIX timestamp)
    pub datetime: i64,
    /// News headline
    pub headline: String,
    /// Unique article ID
    pub id: i64,
    /// Thumbnail image URL
    pub image: String,
    /// Related symbols
    pub related: String,
    /// News source
    pub source: String,
    /// Article summary
    pub summary: String,
    /// Article URL
    pub url: String,
}

/// Finnhub company profile (`stock/profile2`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanyProfile {
    pub name: String,
    pub ticker: String,
    pub exchange: String,
    pub finnhub_industry: String,
    /// Logo image URL
    pub logo: String,
    /// Company homepage
    pub weburl: String,
}

/// Finnhub client for news and profile endpoints
#[derive(Debug, Clone)]
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl FinnhubClient {
    /// Create a new Finnhub client with rate limiting
    ///
    /// # Arguments
    /// * `api_key` - Finnhub API key
    /// * `rate_limit` - Requests per minute (free tier: 60, premium: 300+)
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

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(format!("{BASE_URL}/{path}"))
            .query(params)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(StockError::RateLimitExceeded {
                provider: "Finnhub".to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StockError::FinnhubError(format!("HTTP {status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StockError::FinnhubError(format!("Failed to parse response: {e}")))
    }

    /// Get company news for a symbol between two dates (inclusive)
    pub async fn get_company_news(
        &self,
        symbol: &Symbol,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FinnhubNewsArticle>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        self.get_json(
            "company-news",
            &[("symbol", symbol.as_str()), ("from", &from), ("to", &to)],
        )
        .await
    }

    /// Get the company profile; unknown symbols yield an empty profile
    pub async fn get_company_profile(&self, symbol: &Symbol) -> Result<CompanyProfile> {
        self.get_json("stock/profile2", &[("symbol", symbol.as_str())])
            .await
    }

    /// Download an image referenced by a profile or article
    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
