//! In-memory backend for tests and local experiments.

use super::{BackendError, BackendResult, SearchBackend};
use crate::types::{FetchedPage, ResultSet, SearchParams, SearchResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A backend that returns predefined responses.
#[derive(Debug, Default)]
pub struct MockBackend {
    search_response: Mutex<Option<BackendResult<ResultSet>>>,
    fetch_response: Mutex<Option<BackendResult<FetchedPage>>>,
    last_search: Mutex<Option<SearchParams>>,
    delay: Mutex<Option<Duration>>,
    reachable: Mutex<bool>,
    calls: AtomicUsize,
}

impl MockBackend {
    /// Create a reachable mock that returns empty result sets.
    pub fn new() -> Self {
        Self {
            reachable: Mutex::new(true),
            ..Default::default()
        }
    }

    /// Set the search outcome to return.
    pub fn set_search_response(&self, response: BackendResult<ResultSet>) {
        *self.search_response.lock().unwrap() = Some(response);
    }

    /// Set the fetch outcome to return.
    pub fn set_fetch_response(&self, response: BackendResult<FetchedPage>) {
        *self.fetch_response.lock().unwrap() = Some(response);
    }

    /// Delay every search/fetch by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn set_reachable(&self, reachable: bool) {
        *self.reachable.lock().unwrap() = reachable;
    }

    /// Parameters of the most recent search.
    pub fn last_search(&self) -> Option<SearchParams> {
        self.last_search.lock().unwrap().clone()
    }

    /// Number of search and fetch calls served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn search(&self, params: &SearchParams) -> BackendResult<ResultSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_search.lock().unwrap() = Some(params.clone());
        self.wait().await;

        let guard = self.search_response.lock().unwrap();
        match &*guard {
            Some(response) => response.clone(),
            None => Ok(ResultSet::default()),
        }
    }

    async fn fetch(&self, url: &str) -> BackendResult<FetchedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;

        let guard = self.fetch_response.lock().unwrap();
        match &*guard {
            Some(response) => response.clone(),
            None => Err(BackendError::Status {
                status: 404,
                body: format!("no page configured for {url}"),
            }),
        }
    }

    async fn probe(&self) -> bool {
        *self.reachable.lock().unwrap()
    }

    fn endpoint(&self) -> String {
        "mock://backend".to_string()
    }
}

/// Helper to build a search hit for tests.
pub fn make_result(title: &str, url: &str, snippet: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
        ..Default::default()
    }
}
