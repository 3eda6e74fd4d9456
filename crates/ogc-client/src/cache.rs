//! Memoized capabilities fetch.
//!
//! One [`CapabilitiesCache`] per client. The first caller starts the fetch;
//! every concurrent or later caller awaits the same shared future, so a
//! client hits the network at most once until the cache is invalidated.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use ogc_common::{OgcError, OgcResult};

use crate::capabilities::{CapabilitiesDocument, LayerKind};
use crate::fetch::{fetch_with_timeout, Fetcher};

type CapabilitiesFuture = Shared<BoxFuture<'static, OgcResult<CapabilitiesDocument>>>;

/// Where the memoized fetch currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Unfetched,
    Fetching,
    Ready,
    /// Sticky until [`CapabilitiesCache::invalidate`]; timeouts never land here
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered by an existing fetch, finished or in flight
    pub hits: u64,
    /// Calls that started a fetch
    pub misses: u64,
}

struct Memo {
    generation: u64,
    future: CapabilitiesFuture,
}

#[derive(Default)]
struct MemoState {
    next_generation: u64,
    current: Option<Memo>,
    stats: CacheStats,
}

pub struct CapabilitiesCache {
    url: Arc<str>,
    kind: LayerKind,
    fetcher: Arc<dyn Fetcher>,
    timeout: Option<Duration>,
    state: Mutex<MemoState>,
}

impl CapabilitiesCache {
    pub fn new(
        url: impl Into<Arc<str>>,
        kind: LayerKind,
        fetcher: Arc<dyn Fetcher>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            url: url.into(),
            kind,
            fetcher,
            timeout,
            state: Mutex::new(MemoState::default()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The capabilities document, fetching it on first use.
    pub async fn get(&self) -> OgcResult<CapabilitiesDocument> {
        // Check-and-set completes before the first await, so concurrent
        // callers can never start a second request.
        let (generation, future) = {
            let mut state = self.lock();
            let memo = state
                .current
                .as_ref()
                .map(|memo| (memo.generation, memo.future.clone()));
            match memo {
                Some(hit) => {
                    state.stats.hits += 1;
                    debug!(url = %self.url, "Capabilities cache hit");
                    hit
                }
                None => {
                    let generation = state.next_generation;
                    state.next_generation += 1;
                    state.stats.misses += 1;
                    debug!(url = %self.url, generation, "Capabilities cache miss");

                    let future = fetch_document(
                        self.url.clone(),
                        self.kind,
                        self.fetcher.clone(),
                        self.timeout,
                    )
                    .boxed()
                    .shared();
                    state.current = Some(Memo {
                        generation,
                        future: future.clone(),
                    });
                    (generation, future)
                }
            }
        };

        let result = future.await;

        // A timeout is not a verdict on the server; let the next call retry.
        if let Err(OgcError::Timeout(_)) = &result {
            let mut state = self.lock();
            if state.current.as_ref().is_some_and(|m| m.generation == generation) {
                state.current = None;
            }
        }

        result
    }

    /// Drop the memoized document (or failure); the next call fetches again.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        if state.current.take().is_some() {
            debug!(url = %self.url, "Capabilities cache invalidated");
        }
    }

    pub fn state(&self) -> FetchState {
        match &self.lock().current {
            None => FetchState::Unfetched,
            Some(memo) => match memo.future.peek() {
                None => FetchState::Fetching,
                Some(Ok(_)) => FetchState::Ready,
                Some(Err(_)) => FetchState::Failed,
            },
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    fn lock(&self) -> MutexGuard<'_, MemoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn fetch_document(
    url: Arc<str>,
    kind: LayerKind,
    fetcher: Arc<dyn Fetcher>,
    timeout: Option<Duration>,
) -> OgcResult<CapabilitiesDocument> {
    let response = fetch_with_timeout(fetcher.as_ref(), &url, timeout).await?;
    if !response.ok() {
        warn!(url = %url, status = response.status, "Capabilities request failed");
        return Err(OgcError::CapabilitiesFetch {
            status: response.status,
            url: url.to_string(),
        });
    }

    let xml = response.text()?;
    info!(url = %url, bytes = xml.len(), "Fetched capabilities");
    CapabilitiesDocument::parse(&url, xml, kind)
}
