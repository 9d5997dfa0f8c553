//! Detail view aggregation
//!
//! Opening a symbol produces a first [`SectionList`] immediately: a
//! placeholder sentiment section and a price section computed from the cached
//! quote. The provider's detail and sentiment fetches then run concurrently on
//! their own tasks. Their results come back over a channel stamped with the
//! generation of the `open` that started them, and are merged only while that
//! generation is still current.
//!
//! Each source owns a slot on the session, so the merged list is the same
//! whichever source finishes first.

use crate::config::StockConfig;
use crate::error::{Result, StockError};
use crate::format;
use crate::generation::{Generation, GenerationCounter, Tagged};
use crate::membership::MembershipCache;
use crate::model::{DisplayRow, Item, Section, SectionList, Sentiment, Symbol};
use crate::provider::{DetailPayload, Provider};
use futures::{FutureExt, Stream};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use url::Url;

/// Header of the sentiment section (always first)
pub const SENTIMENT_HEADER: &str = "Sentiments";
/// Header of the price section (always second)
pub const PRICE_HEADER: &str = "Stock Details";
/// Header of the section shown when the detail fetch times out
pub const TIMEOUT_HEADER: &str = "Details";
/// Placeholder row text while sentiment is loading
pub const LOADING_TEXT: &str = "Loading…";

/// Text of the row shown when the detail fetch times out
pub const TIMED_OUT_TEXT: &str = "Timed out loading details";
/// Text of the row shown when the detail fetch crashes
pub const FAILED_TEXT: &str = "Failed to load details";

enum SourceUpdate {
    Detail(Outcome<DetailPayload>),
    Sentiment(Result<Vec<Sentiment>>),
}

/// How a bounded provider call ended
enum Outcome<T> {
    Done(T),
    TimedOut,
    Panicked,
}

enum DetailSlot {
    Loading,
    Loaded(Vec<Section>),
    TimedOut,
    Failed,
}

struct Session {
    generation: Generation,
    item: Item,
    /// `None` while the placeholder is showing
    sentiment: Option<Vec<DisplayRow>>,
    detail: DetailSlot,
    image: Option<Vec<u8>>,
}

impl Session {
    fn new(generation: Generation, item: Item) -> Self {
        Self {
            generation,
            item,
            sentiment: None,
            detail: DetailSlot::Loading,
            image: None,
        }
    }

    fn is_pending(&self) -> bool {
        self.sentiment.is_none() || matches!(self.detail, DetailSlot::Loading)
    }

    fn apply(&mut self, update: SourceUpdate) {
        let symbol = &self.item.symbol;
        match update {
            SourceUpdate::Sentiment(result) => {
                self.sentiment = Some(sentiment_rows(symbol, result));
            }
            SourceUpdate::Detail(Outcome::Done(payload)) => {
                let sections = payload
                    .sections
                    .into_iter()
                    .filter(|section| {
                        let reserved =
                            section.header == SENTIMENT_HEADER || section.header == PRICE_HEADER;
                        if reserved {
                            warn!(%symbol, header = %section.header, "Dropping provider section with reserved header");
                        }
                        !reserved
                    })
                    .collect::<Vec<_>>();
                debug!(%symbol, sections = sections.len(), "Detail fetch resolved");
                self.detail = DetailSlot::Loaded(sections);
                self.image = payload.image;
            }
            SourceUpdate::Detail(Outcome::TimedOut) => {
                warn!(%symbol, "Detail fetch timed out");
                self.detail = DetailSlot::TimedOut;
            }
            SourceUpdate::Detail(Outcome::Panicked) => {
                self.detail = DetailSlot::Failed;
            }
        }
    }

    fn render(&self, membership: &MembershipCache) -> SectionList {
        let sentiment = self
            .sentiment
            .clone()
            .unwrap_or_else(|| vec![DisplayRow::new(LOADING_TEXT)]);

        let mut sections = vec![
            Section::new(SENTIMENT_HEADER, sentiment),
            price_section(&self.item),
        ];
        match &self.detail {
            DetailSlot::Loading => {}
            DetailSlot::Loaded(extra) => sections.extend(extra.iter().cloned()),
            DetailSlot::TimedOut => sections.push(Section::new(
                TIMEOUT_HEADER,
                vec![DisplayRow::new(TIMED_OUT_TEXT).with_subtitle("Error")],
            )),
            DetailSlot::Failed => sections.push(Section::new(
                TIMEOUT_HEADER,
                vec![DisplayRow::new(FAILED_TEXT).with_subtitle("Error")],
            )),
        }

        for row in sections.iter_mut().flat_map(|s| s.rows.iter_mut()) {
            row.annotate(membership);
        }

        SectionList {
            symbol: self.item.symbol.clone(),
            sections,
            loading: matches!(self.detail, DetailSlot::Loading),
        }
    }
}

fn price_section(item: &Item) -> Section {
    let quote = item.quote.as_ref();
    let row = |label: &str, value: Option<String>| DisplayRow {
        title: value,
        subtitle: Some(label.to_string()),
        symbol: Some(item.symbol.clone()),
        ..DisplayRow::default()
    };

    Section::new(
        PRICE_HEADER,
        vec![
            row("Price", quote.map(|q| format::currency(q.price))),
            row("Change", quote.map(|q| format::display_sign(q.change))),
            row("Percent Change", quote.map(|q| format::percent(q.percent_change))),
        ],
    )
}

fn sentiment_rows(symbol: &Symbol, result: Result<Vec<Sentiment>>) -> Vec<DisplayRow> {
    match result {
        Ok(sentiments) if sentiments.is_empty() => {
            vec![DisplayRow::new("No sentiment data").with_subtitle(symbol.as_str())]
        }
        Ok(sentiments) => sentiments
            .iter()
            .map(|s| {
                DisplayRow::new(s.ticker.as_str())
                    .with_subtitle(format!("Relevance {:.2}", s.relevance))
                    .with_sentiment_label(format!("{} ({:+.3})", s.label, s.score))
            })
            .collect(),
        Err(e) => {
            warn!(%symbol, error = %e, "Sentiment fetch failed");
            vec![
                DisplayRow::new("Failed to load sentiment data")
                    .with_subtitle("Error")
                    .with_sentiment_label(e.to_string()),
            ]
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Await `fut`, giving up after `limit` when one is set
///
/// A panicking provider call resolves as [`Outcome::Panicked`] so the
/// session still hears back from its task.
async fn bounded<F: Future>(
    operation: &str,
    symbol: &Symbol,
    limit: Option<Duration>,
    fut: F,
) -> Outcome<F::Output> {
    let guarded = AssertUnwindSafe(fut).catch_unwind();
    let finished = match limit {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(finished) => finished,
            Err(_) => return Outcome::TimedOut,
        },
        None => guarded.await,
    };

    match finished {
        Ok(output) => Outcome::Done(output),
        Err(payload) => {
            warn!(operation, %symbol, panic = panic_message(payload.as_ref()), "Provider call panicked");
            Outcome::Panicked
        }
    }
}

/// Owns the detail view for at most one symbol at a time
///
/// All methods take the owner's `&mut self`; provider results are only merged
/// inside [`next_update`](Self::next_update), so no locking is involved.
/// [`open`](Self::open) spawns tasks and must run inside a tokio runtime.
pub struct DetailAggregator {
    provider: Arc<dyn Provider>,
    membership: MembershipCache,
    timeout: Option<Duration>,
    generations: GenerationCounter,
    session: Option<Session>,
    updates_tx: mpsc::UnboundedSender<Tagged<SourceUpdate>>,
    updates_rx: mpsc::UnboundedReceiver<Tagged<SourceUpdate>>,
    published: watch::Sender<Option<SectionList>>,
}

impl DetailAggregator {
    pub fn new(
        provider: Arc<dyn Provider>,
        membership: MembershipCache,
        config: &StockConfig,
    ) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (published, _) = watch::channel(None);
        Self {
            provider,
            membership,
            timeout: config.detail_timeout,
            generations: GenerationCounter::new(),
            session: None,
            updates_tx,
            updates_rx,
            published,
        }
    }

    /// Receive every published snapshot; `None` means no detail view is open
    pub fn subscribe(&self) -> watch::Receiver<Option<SectionList>> {
        self.published.subscribe()
    }

    /// Make `item` the active symbol and return its first snapshot
    ///
    /// Any session still in flight is abandoned: its late results are dropped.
    pub fn open(&mut self, item: Item) -> SectionList {
        let generation = self.generations.advance();
        info!(symbol = %item.symbol, generation = generation.value(), "Opening detail session");

        self.spawn_fetches(generation, &item.symbol);

        let session = Session::new(generation, item);
        let snapshot = session.render(&self.membership);
        self.session = Some(session);
        self.published.send_replace(Some(snapshot.clone()));
        snapshot
    }

    /// Open a symbol with no cached quote
    pub fn open_symbol(&mut self, symbol: Symbol) -> SectionList {
        self.open(Item::new(symbol))
    }

    /// Discard the active session
    pub fn close(&mut self) {
        let generation = self.generations.advance();
        if let Some(session) = self.session.take() {
            info!(symbol = %session.item.symbol, generation = generation.value(), "Closing detail session");
        }
        self.published.send_replace(None);
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Option<SectionList> {
        self.published.borrow().clone()
    }

    /// Symbol of the active session
    pub fn active_symbol(&self) -> Option<&Symbol> {
        self.session.as_ref().map(|s| &s.item.symbol)
    }

    /// Image bytes delivered with the detail payload
    pub fn image(&self) -> Option<&[u8]> {
        self.session.as_ref()?.image.as_deref()
    }

    /// Whether a source of the active session has yet to resolve
    pub fn is_pending(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_pending)
    }

    /// Wait for the next merge and return the new snapshot
    ///
    /// Returns `None` once nothing is outstanding for the active session.
    /// Results from abandoned sessions are discarded along the way.
    pub async fn next_update(&mut self) -> Option<SectionList> {
        while self.is_pending() {
            let update = self.updates_rx.recv().await?;

            if !self.generations.is_current(update.generation) {
                debug!(
                    generation = update.generation.value(),
                    current = self.generations.current().value(),
                    "Dropping stale detail update"
                );
                continue;
            }

            let session = self.session.as_mut()?;
            debug_assert_eq!(session.generation, update.generation);
            session.apply(update.payload);

            let snapshot = session.render(&self.membership);
            self.published.send_replace(Some(snapshot.clone()));
            return Some(snapshot);
        }
        None
    }

    /// Stream of snapshots following the one returned by `open`
    pub fn updates(&mut self) -> impl Stream<Item = SectionList> + '_ {
        futures::stream::unfold(self, |aggregator| async move {
            let snapshot = aggregator.next_update().await?;
            Some((snapshot, aggregator))
        })
    }

    /// Re-render the active session, e.g. after membership changed
    pub fn refresh(&mut self) -> Option<SectionList> {
        let snapshot = self.session.as_ref()?.render(&self.membership);
        self.published.send_replace(Some(snapshot.clone()));
        Some(snapshot)
    }

    /// Replace the cached quote of the active symbol and re-render
    ///
    /// Ignored when `item` is for a different symbol.
    pub fn update_item(&mut self, item: Item) -> Option<SectionList> {
        let session = self.session.as_mut()?;
        if session.item != item {
            debug!(symbol = %item.symbol, "Ignoring quote for inactive symbol");
            return None;
        }
        session.item = item;
        self.refresh()
    }

    /// Link carried by a row of the current snapshot
    ///
    /// Pure read; selecting a row never changes the section list.
    pub fn select_row(&self, section: usize, row: usize) -> Option<Url> {
        self.published
            .borrow()
            .as_ref()?
            .row(section, row)?
            .url
            .clone()
    }

    fn spawn_fetches(&self, generation: Generation, symbol: &Symbol) {
        let timeout = self.timeout;

        let provider = Arc::clone(&self.provider);
        let tx = self.updates_tx.clone();
        let detail_symbol = symbol.clone();
        tokio::spawn(async move {
            let outcome = bounded(
                "fetch_detail",
                &detail_symbol,
                timeout,
                provider.fetch_detail(&detail_symbol),
            )
            .await;
            let _ = tx.send(Tagged::new(generation, SourceUpdate::Detail(outcome)));
        });

        let provider = Arc::clone(&self.provider);
        let tx = self.updates_tx.clone();
        let sentiment_symbol = symbol.clone();
        tokio::spawn(async move {
            let result = match bounded(
                "fetch_sentiment",
                &sentiment_symbol,
                timeout,
                provider.fetch_sentiment(&sentiment_symbol),
            )
            .await
            {
                Outcome::Done(result) => result,
                Outcome::TimedOut => Err(StockError::Timeout {
                    operation: "fetch_sentiment".to_string(),
                }),
                Outcome::Panicked => Err(StockError::Other(
                    "fetch_sentiment failed unexpectedly".to_string(),
                )),
            };
            let _ = tx.send(Tagged::new(generation, SourceUpdate::Sentiment(result)));
        });
    }
}
