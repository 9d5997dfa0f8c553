//! Networked provider backed by Alpha Vantage and Finnhub

use super::alpha_vantage::{AlphaVantageClient, CompanyOverview};
use super::finnhub::{FinnhubClient, FinnhubNewsArticle};
use crate::cache::CacheManager;
use crate::config::StockConfig;
use crate::error::{Result, StockError};
use crate::format;
use crate::model::{DisplayRow, Item, Quote, Section, Sentiment, Symbol};
use crate::provider::{DetailPayload, Provider};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::{DateTime, Days, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use tracing::{debug, warn};
use url::Url;

pub const COMPANY_HEADER: &str = "Company";
pub const NEWS_HEADER: &str = "News";

const NEWS_LIMIT: usize = 10;

/// [`Provider`] that talks to the real market data APIs
pub struct LiveProvider {
    alpha_vantage: AlphaVantageClient,
    finnhub: Option<FinnhubClient>,
    cache: CacheManager,
    retry: RetryPolicy,
    news_lookback_days: u32,
}

impl LiveProvider {
    /// Build the provider from configuration
    ///
    /// An Alpha Vantage key is required. Without a Finnhub key the news
    /// section and logo are skipped.
    pub fn from_config(config: &StockConfig) -> Result<Self> {
        let api_key = config.alpha_vantage_api_key.clone().ok_or_else(|| {
            StockError::ConfigError("Alpha Vantage API key is required".to_string())
        })?;

        let alpha_vantage = AlphaVantageClient::new(
            api_key,
            config.alpha_vantage_rate_limit,
            config.request_timeout,
        )?;

        let finnhub = config
            .finnhub_api_key
            .as_ref()
            .map(|key| FinnhubClient::new(key, config.finnhub_rate_limit, config.request_timeout))
            .transpose()?;

        if finnhub.is_none() {
            debug!("No Finnhub key configured, news and logos disabled");
        }

        Ok(Self {
            alpha_vantage,
            finnhub,
            cache: CacheManager::from_config(config),
            retry: RetryPolicy::from_config(config),
            news_lookback_days: config.news_lookback_days,
        })
    }

    /// Current quote for `symbol`
    pub async fn quote(&self, symbol: &Symbol) -> Result<Quote> {
        self.cache
            .quotes
            .get_or_fetch(symbol.to_string(), || {
                self.retry
                    .execute("global_quote", || self.alpha_vantage.get_quote(symbol))
            })
            .await
    }

    async fn search_items(&self, query: &str) -> Result<Vec<Item>> {
        let key = query.trim().to_lowercase();
        self.cache
            .searches
            .get_or_fetch(key, || {
                self.retry
                    .execute("symbol_search", || self.alpha_vantage.search_symbol(query))
            })
            .await
    }

    async fn company(&self, symbol: &Symbol) -> Result<Section> {
        self.cache
            .company
            .get_or_fetch(symbol.to_string(), || async {
                let overview = self
                    .retry
                    .execute("company_overview", || {
                        self.alpha_vantage.get_company_overview(symbol)
                    })
                    .await?;
                Ok::<_, StockError>(company_section(&overview))
            })
            .await
    }

    async fn news(&self, symbol: &Symbol) -> Result<Option<Section>> {
        let Some(finnhub) = &self.finnhub else {
            return Ok(None);
        };

        let to = Utc::now().date_naive();
        let from = to
            .checked_sub_days(Days::new(u64::from(self.news_lookback_days)))
            .unwrap_or(to);

        let section = self
            .cache
            .news
            .get_or_fetch(symbol.to_string(), || async {
                let articles = self
                    .retry
                    .execute("company_news", || finnhub.get_company_news(symbol, from, to))
                    .await?;
                Ok::<_, StockError>(news_section(&articles))
            })
            .await?;

        Ok(Some(section))
    }

    async fn logo(&self, symbol: &Symbol) -> Result<Option<Vec<u8>>> {
        let Some(finnhub) = &self.finnhub else {
            return Ok(None);
        };

        self.cache
            .logos
            .get_or_fetch(symbol.to_string(), || async {
                let profile = self
                    .retry
                    .execute("company_profile", || finnhub.get_company_profile(symbol))
                    .await?;

                if profile.logo.is_empty() {
                    return Ok::<_, StockError>(None);
                }

                let bytes = self
                    .retry
                    .execute("company_logo", || finnhub.fetch_image(&profile.logo))
                    .await?;
                Ok::<_, StockError>(Some(bytes))
            })
            .await
    }
}

#[async_trait]
impl Provider for LiveProvider {
    async fn search(&self, query: &str) -> Option<Vec<Item>> {
        match self.search_items(query).await {
            Ok(items) => Some(items),
            Err(e) => {
                warn!(query, error = %e, "Symbol search failed");
                None
            }
        }
    }

    async fn fetch_detail(&self, symbol: &Symbol) -> DetailPayload {
        let (company, news, logo) =
            tokio::join!(self.company(symbol), self.news(symbol), self.logo(symbol));
        assemble_detail(symbol, company, news, logo)
    }

    async fn fetch_sentiment(&self, symbol: &Symbol) -> Result<Vec<Sentiment>> {
        self.cache
            .sentiment
            .get_or_fetch(symbol.to_string(), || {
                self.retry
                    .execute("news_sentiment", || self.alpha_vantage.get_news_sentiment(symbol))
            })
            .await
    }
}

/// Merge the detail parts, logging and leaving out the ones that failed
fn assemble_detail(
    symbol: &Symbol,
    company: Result<Section>,
    news: Result<Option<Section>>,
    logo: Result<Option<Vec<u8>>>,
) -> DetailPayload {
    let mut sections = Vec::new();
    match company {
        Ok(section) => sections.push(section),
        Err(e) => warn!(%symbol, error = %e, "Company overview unavailable"),
    }
    match news {
        Ok(Some(section)) if !section.rows.is_empty() => sections.push(section),
        Ok(_) => debug!(%symbol, "No company news"),
        Err(e) => warn!(%symbol, error = %e, "Company news unavailable"),
    }

    let payload = DetailPayload::new(sections);
    match logo {
        Ok(Some(bytes)) => payload.with_image(bytes),
        Ok(None) => payload,
        Err(e) => {
            warn!(%symbol, error = %e, "Company logo unavailable");
            payload
        }
    }
}

/// Alpha Vantage reports missing values as "None" or "-"
fn present(value: Option<&String>) -> Option<&str> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "None" && *v != "-")
}

/// `2890000000000` becomes `$2.89T`
fn compact_currency(raw: &str) -> String {
    let Ok(value) = Decimal::from_str(raw) else {
        return raw.to_string();
    };

    let units = [
        (Decimal::from(1_000_000_000_000_u64), "T"),
        (Decimal::from(1_000_000_000_u64), "B"),
        (Decimal::from(1_000_000_u64), "M"),
    ];
    for (scale, suffix) in units {
        // round first so 999.999B reads as 1.00T
        let scaled =
            (value / scale).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if scaled.abs() >= Decimal::ONE {
            return format!("{}{suffix}", format::currency(scaled));
        }
    }
    format::currency(value)
}

fn company_section(overview: &CompanyOverview) -> Section {
    let mut rows = vec![DisplayRow::new(&overview.name).with_subtitle(&overview.symbol)];

    let fields = [
        ("Exchange", present(overview.exchange.as_ref()).map(str::to_string)),
        ("Sector", present(overview.sector.as_ref()).map(str::to_string)),
        ("Industry", present(overview.industry.as_ref()).map(str::to_string)),
        ("Market Cap", present(overview.market_cap.as_ref()).map(compact_currency)),
        ("P/E Ratio", present(overview.pe_ratio.as_ref()).map(str::to_string)),
        ("EPS", present(overview.eps.as_ref()).map(str::to_string)),
        ("Dividend Yield", present(overview.dividend_yield.as_ref()).map(str::to_string)),
    ];

    rows.extend(
        fields
            .into_iter()
            .filter_map(|(label, value)| Some(DisplayRow::new(label).with_subtitle(value?))),
    );

    Section::new(COMPANY_HEADER, rows)
}

fn news_section(articles: &[FinnhubNewsArticle]) -> Section {
    let rows = articles
        .iter()
        .filter(|a| !a.headline.trim().is_empty())
        .take(NEWS_LIMIT)
        .map(|article| {
            let published = DateTime::<Utc>::from_timestamp(article.datetime, 0)
                .filter(|_| article.datetime > 0)
                .map(|t| t.format("%Y-%m-%d").to_string());
            let subtitle = match published {
                Some(date) => format!("{}{}{date}", article.source, format::SEPARATOR),
                None => article.source.clone(),
            };

            let row = DisplayRow::new(article.headline.trim()).with_subtitle(subtitle);
            match Url::parse(&article.url) {
                Ok(url) => row.with_url(url),
                Err(_) => row,
            }
        })
        .collect();

    Section::new(NEWS_HEADER, rows)
}
