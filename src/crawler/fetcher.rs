//! Fetch capability
//!
//! Everything the crawl engine knows about the network goes through the
//! [`Fetcher`] trait:
//! - `HttpFetcher`: plain reqwest client with browser-like headers
//! - `RenderingFetcher` (see `render`): pages through a headless browser
//! - `VariantResolver` (see `resolver`): template/CDN variant policy
//!
//! Retry is layered on top with [`fetch_with_retry`], which distinguishes
//! permanent failures (403/404 and other client errors) from transient ones.

use crate::config::FetchConfig;
use crate::paths::content_type;
use crate::url::{NormalizedUrl, ResourceKind};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Accept header sent with page requests
const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Errors produced by a fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Renderer failed for {url}: {message}")]
    Render { url: String, message: String },
}

impl FetchError {
    /// Builds a fetch error from a reqwest error
    pub fn from_reqwest(url: &NormalizedUrl, error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            };
        }

        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }

    /// True for failures that retrying cannot fix
    ///
    /// Client errors (403, 404, 410, ...) are permanent, except 408 Request
    /// Timeout and 429 Too Many Requests. Network errors, timeouts, server
    /// errors and renderer failures are transient.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                (400..500).contains(status) && *status != 408 && *status != 429
            }
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Response body, decoded when the content is textual
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Binary(Vec<u8>),
}

impl Body {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes undeclared content, keeping it binary if it is not UTF-8
    pub fn sniff(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Self::Text(text),
            Err(e) => Self::Binary(e.into_bytes()),
        }
    }
}

/// A successfully fetched resource
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// URL after redirects; relative references in the body resolve against it
    pub final_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Body,
}

impl FetchedResource {
    /// True if the resource is an HTML document
    ///
    /// Without a Content-Type header, a textual body that opens with a
    /// doctype or `<html>` tag counts as HTML.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => content_type::is_html(ct),
            None => self
                .body
                .as_text()
                .map(|text| {
                    let head: String = text
                        .trim_start()
                        .chars()
                        .take(15)
                        .collect::<String>()
                        .to_ascii_lowercase();
                    head.starts_with("<!doctype html") || head.starts_with("<html")
                })
                .unwrap_or(false),
        }
    }

    /// Declared Content-Type, or a stand-in derived from the body
    pub fn effective_content_type(&self) -> &str {
        match &self.content_type {
            Some(ct) => ct,
            None if self.is_html() => "text/html",
            None => "application/octet-stream",
        }
    }

    pub fn is_css(&self) -> bool {
        match &self.content_type {
            Some(ct) => content_type::is_css(ct),
            None => self.final_url.path().to_ascii_lowercase().ends_with(".css"),
        }
    }

    pub fn is_javascript(&self) -> bool {
        match &self.content_type {
            Some(ct) => content_type::is_javascript(ct),
            None => self.final_url.path().to_ascii_lowercase().ends_with(".js"),
        }
    }
}

/// Abstract fetch capability
///
/// Implementations must be cheap to share across worker tasks.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a single URL once, without retrying
    async fn fetch(
        &self,
        url: &NormalizedUrl,
        kind: ResourceKind,
    ) -> Result<FetchedResource, FetchError>;
}

/// Bounded retry with a fixed delay between attempts
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Fetches a URL, retrying transient failures
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 403/404 and other 4xx | Immediate failure |
/// | HTTP 408/429, 5xx | Retry after `delay` |
/// | Timeout, connection error | Retry after `delay` |
/// | Renderer failure | Retry after `delay` |
///
/// The last error is returned once `max_attempts` is exhausted.
pub async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &NormalizedUrl,
    kind: ResourceKind,
    policy: &RetryPolicy,
) -> Result<FetchedResource, FetchError> {
    let mut attempt = 1;

    loop {
        match fetcher.fetch(url, kind).await {
            Ok(resource) => return Ok(resource),
            Err(e) if e.is_permanent() || attempt >= policy.max_attempts => return Err(e),
            Err(e) => {
                tracing::debug!(
                    "Attempt {}/{} for {} failed: {}",
                    attempt,
                    policy.max_attempts,
                    url,
                    e
                );
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

/// Builds an HTTP client from the fetch configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (for example a bad proxy)
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// Plain HTTP implementation of [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &NormalizedUrl,
        kind: ResourceKind,
    ) -> Result<FetchedResource, FetchError> {
        let accept = match kind {
            ResourceKind::Page => PAGE_ACCEPT,
            ResourceKind::Asset => "*/*",
        };

        let response = self
            .client
            .get(url.as_str())
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .filter(|ct| !ct.trim().is_empty());

        // reqwest decodes text using the declared charset, replacing invalid sequences
        let body = match content_type.as_deref() {
            Some(ct) if content_type::is_text(ct) => Body::Text(
                response
                    .text()
                    .await
                    .map_err(|e| FetchError::from_reqwest(url, e))?,
            ),
            Some(_) => Body::Binary(
                response
                    .bytes()
                    .await
                    .map_err(|e| FetchError::from_reqwest(url, e))?
                    .to_vec(),
            ),
            None => Body::sniff(
                response
                    .bytes()
                    .await
                    .map_err(|e| FetchError::from_reqwest(url, e))?
                    .to_vec(),
            ),
        };

        Ok(FetchedResource {
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
