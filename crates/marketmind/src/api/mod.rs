//! API clients for stock data providers

pub mod alpha_vantage;
pub mod finnhub;
pub mod live;

pub use alpha_vantage::{AlphaVantageClient, CompanyOverview};
pub use finnhub::{CompanyProfile, FinnhubClient, FinnhubNewsArticle};
pub use live::LiveProvider;
