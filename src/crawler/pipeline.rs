//! Asset pipeline
//!
//! Downloads every asset in the [`AssetSet`] until no URL is left pending.
//! Stylesheets are parsed as soon as they are saved and the assets they
//! reference are added to the same set, so the loop runs to a fixed point.
//!
//! Workers in a bounded `JoinSet` only perform the network fetch. Claiming a
//! URL, writing the file and recording it in the path table all happen on the
//! loop that owns the state, which keeps a single writer for every shared
//! structure without any locking.

use crate::crawler::fetcher::{fetch_with_retry, FetchError, FetchedResource, Fetcher, RetryPolicy};
use crate::extract::{extract_css, extract_script};
use crate::output::SiteWriter;
use crate::paths::PathTable;
use crate::rewrite::{DocumentKind, RewriteJob};
use crate::state::AssetSet;
use crate::url::{NormalizedUrl, ResourceKind, Site};
use crate::MirrorError;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Discovery state shared by the page and asset phases
///
/// Owned by the coordinator and lent to one phase at a time.
#[derive(Debug, Default)]
pub struct MirrorState {
    pub assets: AssetSet,
    pub table: PathTable,

    /// Saved HTML and CSS files, in the order they were written
    pub jobs: Vec<RewriteJob>,
}

impl MirrorState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Counts from one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub downloaded: usize,
    pub failed: usize,

    /// Assets found inside stylesheets and scripts
    pub nested: usize,
}

pub struct AssetPipeline {
    fetcher: Arc<dyn Fetcher>,
    site: Site,
    policy: RetryPolicy,
    delay: Duration,
    concurrency: usize,
    scan_scripts: bool,
}

impl AssetPipeline {
    /// Creates a pipeline with one worker and no politeness delay
    pub fn new(fetcher: Arc<dyn Fetcher>, site: Site, policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            site,
            policy,
            delay: Duration::ZERO,
            concurrency: 1,
            scan_scripts: false,
        }
    }

    /// Sets the maximum number of downloads in flight
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the delay each worker waits before its request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Enables the asset scan of downloaded JavaScript
    pub fn with_script_scan(mut self, enabled: bool) -> Self {
        self.scan_scripts = enabled;
        self
    }

    /// Downloads assets until the set is drained
    ///
    /// URLs that already have a path table entry (a page or a non-HTML page
    /// response saved earlier) are resolved without another request.
    ///
    /// Downloads run concurrently but results are committed in claim order:
    /// a finished download waits until every earlier claim is committed. Path
    /// assignment and nested discovery therefore never depend on network
    /// timing, and two runs over the same site write the same files.
    ///
    /// # Errors
    ///
    /// Only a panicked or cancelled worker task is an error. Failed downloads
    /// and failed writes are recorded as failed assets.
    pub async fn run(
        &self,
        state: &mut MirrorState,
        writer: &SiteWriter,
    ) -> Result<PipelineSummary, MirrorError> {
        let mut summary = PipelineSummary::default();
        let mut workers: JoinSet<(u64, NormalizedUrl, Result<FetchedResource, FetchError>)> =
            JoinSet::new();
        let mut finished: BTreeMap<u64, (NormalizedUrl, Result<FetchedResource, FetchError>)> =
            BTreeMap::new();
        let mut next_claim: u64 = 0;
        let mut next_commit: u64 = 0;

        tracing::info!(
            "Downloading {} assets with {} workers",
            state.assets.pending_count(),
            self.concurrency
        );

        loop {
            // Finished but uncommitted downloads keep their slot
            while workers.len() + finished.len() < self.concurrency {
                let Some(url) = state.assets.claim_next() else {
                    break;
                };

                if state.table.contains(&url) {
                    tracing::debug!("{} already saved, skipping download", url);
                    state.assets.complete(&url, true);
                    continue;
                }

                let seq = next_claim;
                next_claim += 1;

                let fetcher = Arc::clone(&self.fetcher);
                let policy = self.policy;
                let delay = self.delay;
                workers.spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let result =
                        fetch_with_retry(fetcher.as_ref(), &url, ResourceKind::Asset, &policy).await;
                    (seq, url, result)
                });
            }

            let Some(joined) = workers.join_next().await else {
                break;
            };
            let (seq, url, result) = joined?;
            finished.insert(seq, (url, result));

            while let Some((url, result)) = finished.remove(&next_commit) {
                next_commit += 1;
                self.commit(state, writer, &url, result, &mut summary);
            }

            let done = summary.downloaded + summary.failed;
            if done > 0 && done % 50 == 0 {
                tracing::info!(
                    "Progress: {} assets done, {} pending, {} in flight",
                    done,
                    state.assets.pending_count(),
                    workers.len()
                );
            }
        }

        tracing::info!(
            "Asset phase complete: {} downloaded, {} failed, {} found in stylesheets and scripts",
            summary.downloaded,
            summary.failed,
            summary.nested
        );

        Ok(summary)
    }

    fn commit(
        &self,
        state: &mut MirrorState,
        writer: &SiteWriter,
        url: &NormalizedUrl,
        result: Result<FetchedResource, FetchError>,
        summary: &mut PipelineSummary,
    ) {
        match result {
            Ok(resource) => match self.store(state, writer, url, &resource) {
                Ok(nested) => {
                    state.assets.complete(url, true);
                    summary.downloaded += 1;
                    summary.nested += nested;
                }
                Err(e) => {
                    tracing::warn!("Failed to save asset {}: {}", url, e);
                    state.assets.complete(url, false);
                    summary.failed += 1;
                }
            },
            Err(e) => {
                tracing::warn!("Failed to download asset {}: {}", url, e);
                state.assets.complete(url, false);
                summary.failed += 1;
            }
        }
    }

    /// Saves an asset and follows its nested references
    ///
    /// Stylesheets become CSS rewrite jobs and feed their `url(...)` and
    /// `@import` targets back into the asset set. HTML assets (iframe
    /// documents) become HTML rewrite jobs.
    ///
    /// # Returns
    ///
    /// The number of newly discovered assets.
    pub(crate) fn store(
        &self,
        state: &mut MirrorState,
        writer: &SiteWriter,
        url: &NormalizedUrl,
        resource: &FetchedResource,
    ) -> io::Result<usize> {
        let path = writer.persist(&mut state.table, url, resource)?;
        let mut nested = 0;

        if resource.is_css() {
            if let Some(css) = resource.body.as_text() {
                nested = state
                    .assets
                    .extend(extract_css(css, &resource.final_url, &self.site));
            }
            state.jobs.push(rewrite_job(url, resource, path, DocumentKind::Css));
        } else if resource.is_html() {
            state.jobs.push(rewrite_job(url, resource, path, DocumentKind::Html));
        } else if self.scan_scripts && resource.is_javascript() {
            if let Some(js) = resource.body.as_text() {
                nested = state
                    .assets
                    .extend(extract_script(js, &resource.final_url, &self.site));
            }
        }

        if nested > 0 {
            tracing::debug!("Found {} nested assets in {}", nested, url);
        }
        Ok(nested)
    }
}

fn rewrite_job(
    url: &NormalizedUrl,
    resource: &FetchedResource,
    path: PathBuf,
    kind: DocumentKind,
) -> RewriteJob {
    RewriteJob {
        url: url.clone(),
        base_url: resource.final_url.clone(),
        path,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::MemoryFetcher;
    use crate::state::AssetState;
    use crate::url::normalize_url;
    use tempfile::TempDir;

    fn pipeline(fetcher: Arc<MemoryFetcher>) -> AssetPipeline {
        let policy = RetryPolicy {
            max_attempts: 1,
            delay: Duration::ZERO,
        };
        AssetPipeline::new(fetcher, Site::parse("https://x.com/").unwrap(), policy)
            .with_concurrency(4)
    }

    fn url(s: &str) -> NormalizedUrl {
        normalize_url(s).unwrap()
    }

    #[tokio::test]
    async fn test_stylesheet_assets_reach_fixed_point() {
        let fetcher = Arc::new(
            MemoryFetcher::default()
                .with(
                    "https://x.com/css/app.css",
                    "text/css",
                    "@import 'theme.css'; body { background: url(../img/bg.png) }",
                )
                .with(
                    "https://x.com/css/theme.css",
                    "text/css",
                    "@font-face { src: url(../fonts/f.woff2) }",
                )
                .with("https://x.com/img/bg.png", "image/png", "png")
                .with("https://x.com/fonts/f.woff2", "font/woff2", "woff"),
        );
        let dir = TempDir::new().unwrap();
        let writer = SiteWriter::new(dir.path());

        let mut state = MirrorState::new();
        state.assets.add(url("https://x.com/css/app.css"));

        let summary = pipeline(fetcher.clone()).run(&mut state, &writer).await.unwrap();

        assert_eq!(summary.downloaded, 4);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.nested, 3);
        assert!(state.assets.is_drained());
        assert!(dir.path().join("x.com/fonts/f.woff2").exists());
        assert_eq!(state.jobs.len(), 2);
        assert!(state.jobs.iter().all(|job| job.kind == DocumentKind::Css));
        assert_eq!(
            fetcher.requests(),
            vec![
                "https://x.com/css/app.css",
                "https://x.com/css/theme.css",
                "https://x.com/fonts/f.woff2",
                "https://x.com/img/bg.png",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_asset_is_not_mapped() {
        let fetcher = Arc::new(MemoryFetcher::default().with("https://x.com/a.png", "image/png", "a"));
        let dir = TempDir::new().unwrap();
        let writer = SiteWriter::new(dir.path());

        let mut state = MirrorState::new();
        state.assets.add(url("https://x.com/a.png"));
        state.assets.add(url("https://x.com/missing.png"));

        let summary = pipeline(fetcher).run(&mut state, &writer).await.unwrap();

        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            state.assets.state(&url("https://x.com/missing.png")),
            Some(AssetState::Failed)
        );
        assert!(!state.table.contains(&url("https://x.com/missing.png")));
        assert!(state.table.contains(&url("https://x.com/a.png")));
    }

    #[tokio::test]
    async fn test_already_saved_url_is_not_fetched() {
        let fetcher = Arc::new(MemoryFetcher::default());
        let dir = TempDir::new().unwrap();
        let writer = SiteWriter::new(dir.path());

        let mut state = MirrorState::new();
        state
            .table
            .record(url("https://x.com/embed.html"), PathBuf::from("x.com/embed.html"));
        state.assets.add(url("https://x.com/embed.html"));

        let summary = pipeline(fetcher.clone()).run(&mut state, &writer).await.unwrap();

        assert_eq!(summary.downloaded, 0);
        assert!(fetcher.requests().is_empty());
        assert_eq!(
            state.assets.state(&url("https://x.com/embed.html")),
            Some(AssetState::Downloaded)
        );
    }

    async fn mirror_logos(slow: &str) -> (String, String, PathTable) {
        let fetcher = Arc::new(
            MemoryFetcher::default()
                .with("https://x.com/logo", "image/png", "route")
                .with("https://x.com/logo.png", "image/png", "file")
                .with_latency(slow, Duration::from_millis(50)),
        );
        let dir = TempDir::new().unwrap();
        let writer = SiteWriter::new(dir.path());

        let mut state = MirrorState::new();
        state.assets.add(url("https://x.com/logo"));
        state.assets.add(url("https://x.com/logo.png"));
        pipeline(fetcher).run(&mut state, &writer).await.unwrap();

        let logo = state.table.get(&url("https://x.com/logo")).unwrap().to_path_buf();
        let plain = std::fs::read_to_string(dir.path().join("x.com/logo.png")).unwrap();
        let route = std::fs::read_to_string(dir.path().join(&logo)).unwrap();
        (plain, route, state.table)
    }

    #[tokio::test]
    async fn test_colliding_paths_do_not_depend_on_timing() {
        let (plain_a, route_a, table_a) = mirror_logos("https://x.com/logo").await;
        let (plain_b, route_b, table_b) = mirror_logos("https://x.com/logo.png").await;

        // The first claimed URL keeps the plain name in both runs
        assert_eq!(plain_a, "route");
        assert_eq!(plain_b, "route");
        assert_eq!(route_a, route_b);

        let paths = |table: &PathTable| {
            table
                .iter()
                .map(|(url, path)| (url.to_string(), path.to_path_buf()))
                .collect::<Vec<_>>()
        };
        assert_eq!(paths(&table_a), paths(&table_b));
    }

    #[tokio::test]
    async fn test_script_scan_is_opt_in() {
        let fetcher = Arc::new(
            MemoryFetcher::default()
                .with("https://x.com/app.js", "application/javascript", "const a = \"/img/logo.svg\";")
                .with("https://x.com/img/logo.svg", "image/svg+xml", "<svg/>"),
        );
        let dir = TempDir::new().unwrap();
        let writer = SiteWriter::new(dir.path());

        let mut state = MirrorState::new();
        state.assets.add(url("https://x.com/app.js"));
        let summary = pipeline(fetcher.clone()).run(&mut state, &writer).await.unwrap();
        assert_eq!(summary.downloaded, 1);

        let mut state = MirrorState::new();
        state.assets.add(url("https://x.com/app.js"));
        let summary = pipeline(fetcher)
            .with_script_scan(true)
            .run(&mut state, &writer)
            .await
            .unwrap();
        assert_eq!(summary.downloaded, 2);
        assert!(state.table.contains(&url("https://x.com/img/logo.svg")));
    }
}
