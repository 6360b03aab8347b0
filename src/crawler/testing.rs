//! In-memory fetcher for crawler tests

use crate::crawler::fetcher::{Body, FetchError, FetchedResource, Fetcher};
use crate::url::{NormalizedUrl, ResourceKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Serves canned responses and records every request
///
/// Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct MemoryFetcher {
    responses: HashMap<String, (String, Body)>,
    latency: HashMap<String, Duration>,
    requested: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub(crate) fn with(mut self, url: &str, content_type: &str, body: &str) -> Self {
        self.responses.insert(
            url.to_string(),
            (content_type.to_string(), Body::Text(body.to_string())),
        );
        self
    }

    pub(crate) fn with_bytes(mut self, url: &str, content_type: &str, body: &[u8]) -> Self {
        self.responses.insert(
            url.to_string(),
            (content_type.to_string(), Body::Binary(body.to_vec())),
        );
        self
    }

    /// Delays the response for one URL
    pub(crate) fn with_latency(mut self, url: &str, latency: Duration) -> Self {
        self.latency.insert(url.to_string(), latency);
        self
    }

    /// Requested URLs, sorted
    pub(crate) fn requests(&self) -> Vec<String> {
        let mut requested = self.requested.lock().unwrap().clone();
        requested.sort();
        requested
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(
        &self,
        url: &NormalizedUrl,
        _kind: ResourceKind,
    ) -> Result<FetchedResource, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        if let Some(latency) = self.latency.get(url.as_str()) {
            tokio::time::sleep(*latency).await;
        }
        match self.responses.get(url.as_str()) {
            Some((content_type, body)) => Ok(FetchedResource {
                final_url: Url::parse(url.as_str()).unwrap(),
                status: 200,
                content_type: Some(content_type.clone()),
                body: body.clone(),
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
