//! Interactive stock tracker
//!
//! # Usage
//!
//! ```bash
//! # Live data
//! export ALPHA_VANTAGE_API_KEY="..."
//! export FINNHUB_API_KEY="..."   # optional: news and logos
//! cargo run -p marketmind-cli -- --track AAPL --track MSFT
//!
//! # Canned data, no network
//! cargo run -p marketmind-cli -- --offline
//! ```

mod commands;
mod demo;
mod render;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use commands::Command;
use demo::DemoProvider;
use futures::StreamExt;
use marketmind::api::LiveProvider;
use marketmind::{
    DetailAggregator, InMemoryWatchlist, Item, MembershipCache, Provider, Quote, SearchDebouncer,
    StockConfig, Symbol, WatchlistStore,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "marketmind")]
#[command(about = "Track stocks, search symbols and browse detail views", long_about = None)]
struct Args {
    /// Symbols already on the watchlist
    #[arg(long = "track", value_name = "SYMBOL")]
    track: Vec<String>,

    /// Quiet period before a search is sent
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Give up on the detail fetch after this long (0 waits forever)
    #[arg(long, value_name = "SECS")]
    detail_timeout_secs: Option<u64>,

    /// Use canned data instead of the network (also MARKETMIND_OFFLINE=1)
    #[arg(long)]
    offline: bool,
}

impl Args {
    fn offline(&self) -> bool {
        self.offline || marketmind_utils::env_flag("MARKETMIND_OFFLINE")
    }
}

/// Latest quote for a tracked symbol
#[async_trait]
pub(crate) trait QuoteSource: Send + Sync {
    async fn quote(&self, symbol: &Symbol) -> Option<Quote>;
}

#[async_trait]
impl QuoteSource for LiveProvider {
    async fn quote(&self, symbol: &Symbol) -> Option<Quote> {
        match LiveProvider::quote(self, symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!(%symbol, error = %e, "Quote unavailable");
                None
            }
        }
    }
}

fn build_config(args: &Args) -> anyhow::Result<StockConfig> {
    let mut builder = StockConfig::builder().with_env_keys();
    if let Some(ms) = args.debounce_ms {
        builder = builder.search_debounce(Duration::from_millis(ms));
    }
    builder = match args.detail_timeout_secs {
        Some(0) => builder.no_detail_timeout(),
        Some(secs) => builder.detail_timeout(Duration::from_secs(secs)),
        None => builder,
    };
    Ok(builder.build()?)
}

fn backend(
    args: &Args,
    config: &StockConfig,
) -> anyhow::Result<(Arc<dyn Provider>, Arc<dyn QuoteSource>)> {
    if !args.offline() {
        if config.alpha_vantage_api_key.is_some() {
            let live = Arc::new(LiveProvider::from_config(config)?);
            let provider: Arc<dyn Provider> = live.clone();
            let quotes: Arc<dyn QuoteSource> = live;
            return Ok((provider, quotes));
        }
        warn!("ALPHA_VANTAGE_API_KEY not set, falling back to demo data");
    }
    let demo = Arc::new(DemoProvider::default());
    let provider: Arc<dyn Provider> = demo.clone();
    let quotes: Arc<dyn QuoteSource> = demo;
    Ok((provider, quotes))
}

struct App {
    quotes: Arc<dyn QuoteSource>,
    membership: MembershipCache,
    search: SearchDebouncer,
    detail: DetailAggregator,
}

impl App {
    async fn handle(&mut self, command: Command) {
        match command {
            Command::Search { query } => self.search(&query).await,
            Command::Add { index } => self.add(index),
            Command::Open { symbol } => self.open(symbol).await,
            Command::Link { section, row } => {
                match self.detail.select_row(section - 1, row - 1) {
                    Some(url) => println!("{url}"),
                    None => println!("No link at section {section}, row {row}"),
                }
            }
            Command::Watchlist => {
                let symbols: Vec<String> = self
                    .membership
                    .symbols()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                if symbols.is_empty() {
                    println!("Watchlist is empty");
                } else {
                    println!("Watchlist: {}", symbols.join(", "));
                }
            }
            Command::Close => {
                self.detail.close();
                println!("Detail view closed");
            }
            Command::Help => println!("{}", commands::help_text()),
            Command::Exit => {}
        }
    }

    async fn search(&mut self, query: &str) {
        self.search.on_query_changed(query);
        if !self.search.is_pending() {
            // blank query: back to whatever the list already showed
            print!("{}", render::search_results(&self.search.results()));
            return;
        }
        if let Some(results) = self.search.next_results().await {
            print!("{}", render::search_results(&results));
        }
    }

    fn add(&mut self, index: usize) {
        if self.search.select(index - 1) {
            print!("{}", render::search_results(&self.search.results()));
            // the open detail view may list the new symbol
            self.detail.refresh();
        } else {
            println!("Row {index} is already tracked or does not exist");
        }
    }

    async fn open(&mut self, symbol: Symbol) {
        let mut item = Item::new(symbol);
        if let Some(quote) = self.quotes.quote(&item.symbol).await {
            item = item.with_quote(quote);
        }

        let first = self.detail.open(item);
        print!("{}", render::section_list(&first));

        {
            let mut updates = std::pin::pin!(self.detail.updates());
            while let Some(list) = updates.next().await {
                print!("{}", render::section_list(&list));
            }
        }
        if self.detail.image().is_some() {
            println!("(logo received)");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    marketmind_utils::init_tracing_with("warn,marketmind=info");

    let args = Args::parse();
    let config = build_config(&args)?;

    let tracked = args
        .track
        .iter()
        .map(Symbol::new)
        .collect::<marketmind::Result<Vec<_>>>()
        .context("Invalid --track symbol")?;
    let watchlist: Arc<dyn WatchlistStore> = Arc::new(InMemoryWatchlist::with_symbols(tracked));
    let membership = MembershipCache::from_store(watchlist.as_ref())?;

    let (provider, quotes) = backend(&args, &config)?;
    info!(tracked = membership.len(), offline = args.offline(), "Starting marketmind");

    let mut app = App {
        quotes,
        membership: membership.clone(),
        search: SearchDebouncer::new(provider.clone(), membership.clone(), watchlist, &config),
        detail: DetailAggregator::new(provider, membership, &config),
    };

    println!("marketmind - type /help for commands\n");
    print!("{}", render::search_results(&app.search.results()));

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        if input.trim().is_empty() {
            continue;
        }

        match Command::parse(&input) {
            Ok(Command::Exit) => {
                println!("Goodbye!");
                break;
            }
            Ok(command) => app.handle(command).await,
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    Ok(())
}
