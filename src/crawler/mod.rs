//! Crawler module for page crawling and asset downloading
//!
//! This module contains the crawl engine, including:
//! - The fetch capability (plain HTTP, headless rendering, CDN variants)
//! - Retry of transient failures
//! - The breadth-first page frontier
//! - The asset download pipeline
//! - Overall mirror coordination

mod coordinator;
mod fetcher;
mod pipeline;
mod render;
mod resolver;
mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{build_fetcher, run_mirror, Coordinator};
pub use fetcher::{
    build_http_client, fetch_with_retry, Body, FetchError, FetchedResource, Fetcher, HttpFetcher,
    RetryPolicy,
};
pub use pipeline::{AssetPipeline, MirrorState, PipelineSummary};
pub use render::{CommandRenderer, Renderer, RenderingFetcher};
pub use resolver::VariantResolver;
pub use scheduler::{CrawlFrontier, QueuedPage};
