//! HTTP transport abstraction.
//!
//! Clients never talk to the network directly; they go through a [`Fetcher`]
//! supplied by the caller. [`HttpFetcher`] is the `reqwest` implementation,
//! [`StaticFetcher`] serves canned responses for tests and offline fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use ogc_common::{OgcError, OgcResult};

use crate::config::ClientConfig;

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    pub fn text(&self) -> OgcResult<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| OgcError::Transport(format!("response body is not UTF-8: {}", e)))
    }

    pub fn json<T: DeserializeOwned>(&self) -> OgcResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Whether the content type announces XML (OGC exception reports do).
    pub fn is_xml(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("xml"))
            .unwrap_or(false)
    }
}

/// Performs HTTP GET requests on behalf of a client.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> OgcResult<FetchResponse>;
}

/// Fetch `url`, failing with `Timeout` when `timeout` elapses first.
pub(crate) async fn fetch_with_timeout(
    fetcher: &dyn Fetcher,
    url: &str,
    timeout: Option<Duration>,
) -> OgcResult<FetchResponse> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %url, timeout_ms = limit.as_millis() as u64, "Request timed out");
                Err(OgcError::Timeout(limit))
            }
        },
        None => fetcher.fetch(url).await,
    }
}

/// `reqwest`-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &ClientConfig) -> OgcResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| OgcError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client, e.g. one with custom TLS settings.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> OgcResult<FetchResponse> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OgcError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| OgcError::Transport(e.to_string()))?;

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}

/// In-memory fetcher answering from a route table.
///
/// A route matches when the requested URL contains its pattern; the first
/// registered match wins and unmatched URLs get a 404. Every request is
/// recorded so tests can assert how often the network was hit.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    routes: Vec<(String, FetchResponse)>,
    delay: Option<Duration>,
    count: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, pattern: impl Into<String>, response: FetchResponse) -> Self {
        self.routes.push((pattern.into(), response));
        self
    }

    /// Route answering 200 with an XML body.
    pub fn with_xml(self, pattern: impl Into<String>, xml: impl Into<String>) -> Self {
        let body: String = xml.into();
        self.with_route(pattern, FetchResponse::new(200, Some("text/xml"), body))
    }

    /// Sleep this long before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn request_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> OgcResult<FetchResponse> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .routes
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| FetchResponse::new(404, Some("text/plain"), "Not Found"));
        Ok(response)
    }
}
