// SearXNG HTTP client

use super::{BackendError, BackendResult, SearchBackend};
use crate::config::EngineConfig;
use crate::types::{FetchedPage, ResultSet, SearchParams, SearchResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; searxng-mcp/", env!("CARGO_PKG_VERSION"), ")");

/// Longest error body kept from a non-success response.
const MAX_ERROR_BODY: usize = 512;

/// Client for a SearXNG instance and for arbitrary page fetches.
///
/// Single attempt per call: the tool layer enforces its own deadline and
/// repeating a search against a shared instance only adds load.
#[derive(Debug, Clone)]
pub struct SearxngClient {
    client: Client,
    base_url: Url,
    probe_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl SearxngClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
            probe_timeout: config.probe_timeout,
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests)),
        })
    }

    /// Resolve `path` under the base URL, keeping any path prefix the base has.
    fn endpoint_url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/{}", prefix, path.trim_start_matches('/')));
        url
    }

    /// Send under a concurrency permit. The permit is handed back with the
    /// response and must be held until the body has been read.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> BackendResult<(Response, OwnedSemaphorePermit)> {
        // Calls beyond the ceiling wait here rather than fail
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BackendError::Unavailable {
                kind: super::UnavailableKind::Other,
            })?;

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Backend request failed");
            BackendError::from_reqwest(&e)
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let mut body = response.text().await.unwrap_or_default();
            truncate_chars(&mut body, MAX_ERROR_BODY);
            warn!(status, "Backend returned non-success status");
            return Err(BackendError::Status { status, body });
        }

        Ok((response, permit))
    }
}

#[async_trait]
impl SearchBackend for SearxngClient {
    async fn search(&self, params: &SearchParams) -> BackendResult<ResultSet> {
        let url = self.endpoint_url("search");
        debug!(url = %url, query = %params.query, "Search request");

        let (response, _permit) = self
            .send(self.client.get(url).query(&params.to_query_pairs()))
            .await?;

        let raw: RawSearchResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to decode search response");
            BackendError::InvalidResponse("search response is not valid JSON".to_string())
        })?;

        Ok(raw.normalize())
    }

    async fn fetch(&self, url: &str) -> BackendResult<FetchedPage> {
        let parsed = Url::parse(url).map_err(|e| BackendError::InvalidUrl(format!("{url} ({e})")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(BackendError::InvalidUrl(format!(
                "only http and https are supported, got {}",
                parsed.scheme()
            )));
        }

        debug!(url = %parsed, "Fetch request");
        let (response, _permit) = self
            .send(
                self.client
                    .get(parsed)
                    .header(header::ACCEPT, "text/html,text/plain;q=0.9,*/*;q=0.5"),
            )
            .await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let final_url = response.url().to_string();

        let page = FetchedPage {
            url: final_url,
            content_type,
            body: String::new(),
        };
        if !page.is_html() && !page.is_plain_text() {
            return Err(BackendError::UnsupportedContent(if page.content_type.is_empty() {
                "unknown".to_string()
            } else {
                page.content_type
            }));
        }

        let body = response.text().await.map_err(|e| {
            warn!(error = %e, "Failed to read fetched body");
            BackendError::from_reqwest(&e)
        })?;

        Ok(FetchedPage { body, ..page })
    }

    async fn probe(&self) -> bool {
        // Own timeout, no permit: health checks must not queue behind searches
        let url = self.endpoint_url("");
        match self.client.get(url).timeout(self.probe_timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Backend probe failed");
                false
            }
        }
    }

    fn endpoint(&self) -> String {
        self.base_url.to_string()
    }
}

fn truncate_chars(text: &mut String, max: usize) {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    results: Vec<RawResult>,
    #[serde(default)]
    answers: Vec<serde_json::Value>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    number_of_results: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    engines: Vec<String>,
    #[serde(default)]
    engine: Option<String>,
    #[serde(default, rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(default)]
    img_src: Option<String>,
    #[serde(default)]
    thumbnail_src: Option<String>,
}

impl RawSearchResponse {
    fn normalize(self) -> ResultSet {
        let results = self
            .results
            .into_iter()
            .map(|r| {
                let engines = if r.engines.is_empty() {
                    r.engine.into_iter().collect()
                } else {
                    r.engines
                };
                SearchResult {
                    title: r
                        .title
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| "Untitled".to_string()),
                    url: r.url.unwrap_or_default(),
                    snippet: r.content.unwrap_or_default().trim().to_string(),
                    engines,
                    published: r.published_date.filter(|d| !d.is_empty()),
                    image_url: r.img_src.filter(|s| !s.is_empty()),
                    thumbnail_url: r.thumbnail_src.filter(|s| !s.is_empty()),
                }
            })
            .collect();

        // Answers are plain strings on older instances and objects on newer ones
        let answers = self
            .answers
            .into_iter()
            .filter_map(|a| match a {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Object(map) => map
                    .get("answer")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                _ => None,
            })
            .collect();

        ResultSet {
            results,
            answers,
            suggestions: self.suggestions,
            total: self
                .number_of_results
                .filter(|n| *n >= 1.0)
                .map(|n| n as u64),
        }
    }
}
