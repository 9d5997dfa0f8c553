//! Scripted provider for exercising resolution order in tests

use crate::error::Result;
use crate::model::{Item, Sentiment, Symbol};
use crate::provider::{DetailPayload, Provider};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

type Gate<T> = Mutex<HashMap<String, oneshot::Receiver<T>>>;

/// Provider whose calls complete only when the test says so
///
/// A call with no gate registered (or whose sender was dropped) never
/// completes, which is how tests model a provider that never calls back.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    details: Gate<DetailPayload>,
    sentiments: Gate<Result<Vec<Sentiment>>>,
    searches: Gate<Option<Vec<Item>>>,
    instant_searches: Mutex<HashMap<String, Option<Vec<Item>>>>,
    search_calls: Mutex<Vec<String>>,
    crashing_details: Mutex<HashSet<String>>,
    crashing_sentiments: Mutex<HashSet<String>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn gate_detail(&self, symbol: &str) -> oneshot::Sender<DetailPayload> {
        let (tx, rx) = oneshot::channel();
        self.details.lock().unwrap().insert(symbol.to_string(), rx);
        tx
    }

    pub(crate) fn gate_sentiment(&self, symbol: &str) -> oneshot::Sender<Result<Vec<Sentiment>>> {
        let (tx, rx) = oneshot::channel();
        self.sentiments.lock().unwrap().insert(symbol.to_string(), rx);
        tx
    }

    pub(crate) fn gate_search(&self, query: &str) -> oneshot::Sender<Option<Vec<Item>>> {
        let (tx, rx) = oneshot::channel();
        self.searches.lock().unwrap().insert(query.to_string(), rx);
        tx
    }

    /// Answer `query` immediately
    pub(crate) fn answer_search(&self, query: &str, result: Option<Vec<Item>>) {
        self.instant_searches
            .lock()
            .unwrap()
            .insert(query.to_string(), result);
    }

    /// Make `fetch_detail` for `symbol` panic
    pub(crate) fn crash_detail(&self, symbol: &str) {
        self.crashing_details.lock().unwrap().insert(symbol.to_string());
    }

    /// Make `fetch_sentiment` for `symbol` panic
    pub(crate) fn crash_sentiment(&self, symbol: &str) {
        self.crashing_sentiments.lock().unwrap().insert(symbol.to_string());
    }

    pub(crate) fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock().unwrap().clone()
    }
}

async fn wait<T>(gate: Option<oneshot::Receiver<T>>) -> T {
    match gate {
        Some(rx) => match rx.await {
            Ok(value) => value,
            Err(_) => std::future::pending().await,
        },
        None => std::future::pending().await,
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn search(&self, query: &str) -> Option<Vec<Item>> {
        self.search_calls.lock().unwrap().push(query.to_string());

        let instant = self.instant_searches.lock().unwrap().get(query).cloned();
        if let Some(result) = instant {
            return result;
        }

        let gate = self.searches.lock().unwrap().remove(query);
        wait(gate).await
    }

    async fn fetch_detail(&self, symbol: &Symbol) -> DetailPayload {
        let crashing = self.crashing_details.lock().unwrap().contains(symbol.as_str());
        assert!(!crashing, "detail backend crashed for {symbol}");
        let gate = self.details.lock().unwrap().remove(symbol.as_str());
        wait(gate).await
    }

    async fn fetch_sentiment(&self, symbol: &Symbol) -> Result<Vec<Sentiment>> {
        let crashing = self.crashing_sentiments.lock().unwrap().contains(symbol.as_str());
        assert!(!crashing, "sentiment backend crashed for {symbol}");
        let gate = self.sentiments.lock().unwrap().remove(symbol.as_str());
        wait(gate).await
    }
}

pub(crate) fn sym(s: &str) -> Symbol {
    Symbol::new(s).unwrap()
}

pub(crate) fn sentiment(ticker: &str, label: &str, score: f64) -> Sentiment {
    Sentiment {
        ticker: sym(ticker),
        score,
        label: label.to_string(),
        relevance: 0.5,
    }
}
