//! Mirror coordinator - main orchestration logic
//!
//! Runs a mirror in three strictly sequential phases:
//! 1. Breadth-first page crawl from the seed, bounded by depth
//! 2. Asset downloads through a bounded worker pool, to a fixed point
//! 3. Link rewriting of every saved HTML and CSS file
//!
//! Rewriting only starts once every download is resolved, because relative
//! paths can only be computed against a complete path table.

use crate::config::{Config, FetchMode};
use crate::crawler::fetcher::{fetch_with_retry, FetchedResource, Fetcher, HttpFetcher, RetryPolicy};
use crate::crawler::pipeline::{AssetPipeline, MirrorState};
use crate::crawler::render::{CommandRenderer, RenderingFetcher};
use crate::crawler::resolver::VariantResolver;
use crate::crawler::scheduler::{CrawlFrontier, QueuedPage};
use crate::extract::extract_html;
use crate::output::{write_failed_log, write_root_redirect, MirrorReport, SiteWriter, ROOT_INDEX};
use crate::rewrite::{DocumentKind, RewriteJob, Rewriter};
use crate::state::{AssetState, PageState};
use crate::url::{ResourceKind, Site};
use crate::MirrorError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Builds the fetch stack selected by the configuration
///
/// Plain HTTP, or headless rendering for pages with HTTP for assets, wrapped
/// in the variant resolver when it is enabled.
pub fn build_fetcher(config: &Config) -> Result<Arc<dyn Fetcher>, MirrorError> {
    let http: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.fetch)?);

    let base: Arc<dyn Fetcher> = match config.fetch.mode {
        FetchMode::Http => http,
        FetchMode::Render => {
            let renderer = Arc::new(CommandRenderer::from_config(&config.fetch));
            Arc::new(RenderingFetcher::new(http, renderer))
        }
    };

    if config.resolver.enabled {
        Ok(Arc::new(VariantResolver::new(base, config.resolver.clone())))
    } else {
        Ok(base)
    }
}

/// Main mirror coordinator structure
pub struct Coordinator {
    config: Config,
    site: Site,
    fetcher: Arc<dyn Fetcher>,
    writer: SiteWriter,
    policy: RetryPolicy,
    delay: Duration,
}

impl Coordinator {
    /// Creates a coordinator with the fetch stack from the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(MirrorError)` - Invalid target URL or HTTP client setup failure
    pub fn new(config: Config) -> Result<Self, MirrorError> {
        let fetcher = build_fetcher(&config)?;
        Self::with_fetcher(config, fetcher)
    }

    /// Creates a coordinator around an existing fetcher
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self, MirrorError> {
        let site = Site::parse(&config.crawler.target_url)?;
        let writer = SiteWriter::new(config.output.directory.clone());
        let policy = RetryPolicy::from_config(&config.fetch);
        let delay = Duration::from_millis(config.crawler.politeness_delay_ms);

        Ok(Self {
            config,
            site,
            fetcher,
            writer,
            policy,
            delay,
        })
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Runs all three phases and writes the root files
    ///
    /// # Errors
    ///
    /// Fails only when the output root cannot be written, or on an internal
    /// error (a worker task panicked, an impossible page state transition).
    /// Individual fetch and write failures end up in the report instead.
    pub async fn run(&self) -> Result<MirrorReport, MirrorError> {
        let start_time = Instant::now();
        self.writer.ensure_root()?;

        tracing::info!(
            "Mirroring {} into {} (max depth {})",
            self.site.seed(),
            self.writer.root().display(),
            self.config.crawler.max_depth
        );

        let mut report = MirrorReport {
            output_dir: self.writer.root().to_path_buf(),
            ..MirrorReport::default()
        };
        let mut state = MirrorState::new();

        let pipeline = AssetPipeline::new(Arc::clone(&self.fetcher), self.site.clone(), self.policy)
            .with_concurrency(self.config.crawler.max_concurrent_downloads as usize)
            .with_delay(self.delay)
            .with_script_scan(self.config.crawler.scan_scripts);

        // Phase 1: pages
        let frontier = self.crawl_pages(&pipeline, &mut state, &mut report).await?;

        // Phase 2: assets
        let summary = pipeline.run(&mut state, &self.writer).await?;
        report.assets_downloaded = summary.downloaded;
        report.assets_failed = summary.failed;

        // Phase 3: rewrite
        tracing::info!("Rewriting references in {} files", state.jobs.len());
        let rewritten = Rewriter::new(&state.table, &self.site).rewrite_all(&self.writer, &state.jobs);
        report.files_rewritten = rewritten.files_rewritten;
        report.references_rewritten = rewritten.references_rewritten;

        self.write_root_files(&frontier, &state, &mut report);

        report.elapsed = start_time.elapsed();
        tracing::info!(
            "Mirror completed: {} files saved, {} failed in {:?}",
            report.files_saved(),
            report.failed_urls.len(),
            report.elapsed
        );

        Ok(report)
    }

    /// Crawls pages breadth-first until the frontier is empty
    async fn crawl_pages(
        &self,
        pipeline: &AssetPipeline,
        state: &mut MirrorState,
        report: &mut MirrorReport,
    ) -> Result<CrawlFrontier, MirrorError> {
        let mut frontier = CrawlFrontier::new(self.site.seed().clone(), self.config.crawler.max_depth);
        let mut pages_crawled = 0;
        let start_time = Instant::now();

        while let Some(page) = frontier.next_page() {
            if pages_crawled > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            tracing::debug!("Processing page {} (depth {})", page.url, page.depth);

            match fetch_with_retry(self.fetcher.as_ref(), &page.url, ResourceKind::Page, &self.policy)
                .await
            {
                Ok(resource) if resource.is_html() => {
                    self.save_page(&page, &resource, &mut frontier, state, report)?;
                }
                Ok(resource) => {
                    // Not a page after all; keep it as an asset so it is never fetched again
                    frontier.mark_failed(&page.url)?;
                    match pipeline.store(state, &self.writer, &page.url, &resource) {
                        Ok(_) => {
                            state.assets.record_downloaded(page.url.clone());
                            report.pages_saved_as_assets += 1;
                            tracing::info!(
                                "{} is {}, saved as an asset",
                                page.url,
                                resource.effective_content_type()
                            );
                        }
                        Err(e) => {
                            tracing::warn!("Failed to save {}: {}", page.url, e);
                            state.assets.record_failed(page.url.clone());
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch page {}: {}", page.url, e);
                    frontier.mark_failed(&page.url)?;
                    state.assets.record_failed(page.url.clone());
                }
            }

            pages_crawled += 1;

            if pages_crawled % 10 == 0 {
                let rate = pages_crawled as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} pages crawled, {} in frontier, {:.2} pages/sec",
                    pages_crawled,
                    frontier.frontier_size(),
                    rate
                );
            }
        }

        report.pages_failed = frontier
            .in_state(PageState::Failed)
            .filter(|url| !state.table.contains(url))
            .count();

        tracing::info!(
            "Page phase complete: {} saved, {} failed, {} assets discovered",
            report.pages_saved,
            report.pages_failed,
            state.assets.len()
        );

        Ok(frontier)
    }

    /// Saves an HTML page and feeds its references to the frontier and asset set
    fn save_page(
        &self,
        page: &QueuedPage,
        resource: &FetchedResource,
        frontier: &mut CrawlFrontier,
        state: &mut MirrorState,
        report: &mut MirrorReport,
    ) -> Result<(), MirrorError> {
        let path = match self.writer.persist(&mut state.table, &page.url, resource) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Failed to save page {}: {}", page.url, e);
                state.assets.record_failed(page.url.clone());
                return frontier.mark_failed(&page.url);
            }
        };

        frontier.mark_saved(&page.url)?;
        report.pages_saved += 1;

        if let Some(html) = resource.body.as_text() {
            let found = extract_html(html, &resource.final_url, &self.site);

            let queued = found
                .pages
                .into_iter()
                .filter(|url| frontier.enqueue(url.clone(), page.child_depth()))
                .count();
            let added = state.assets.extend(found.assets);

            tracing::debug!(
                "{}: {} new pages queued, {} new assets",
                page.url,
                queued,
                added
            );
        }

        state.jobs.push(RewriteJob {
            url: page.url.clone(),
            base_url: resource.final_url.clone(),
            path,
            kind: DocumentKind::Html,
        });

        Ok(())
    }

    /// Writes the root redirect and the failed URL log
    ///
    /// Failures here are logged and do not fail the run; the mirror itself is
    /// already complete.
    fn write_root_files(&self, frontier: &CrawlFrontier, state: &MirrorState, report: &mut MirrorReport) {
        let seed = self.site.seed();
        if frontier.state(seed) == Some(PageState::Saved) {
            if let Some(seed_path) = state.table.get(seed) {
                if let Err(e) = write_root_redirect(&self.writer, seed_path) {
                    tracing::warn!("Failed to write root index: {}", e);
                }
            }
        }

        let index = Path::new(ROOT_INDEX);
        report.root_index = self
            .writer
            .exists(index)
            .then(|| self.writer.absolute(index));

        let mut failed: Vec<String> = frontier
            .in_state(PageState::Failed)
            .filter(|url| !state.table.contains(url))
            .chain(state.assets.in_state(AssetState::Failed))
            .map(|url| url.to_string())
            .collect();
        failed.sort();
        failed.dedup();

        if self.config.output.write_failed_log {
            match write_failed_log(&self.writer, &failed) {
                Ok(log) => report.failed_log = log,
                Err(e) => tracing::warn!("Failed to write failed URL log: {}", e),
            }
        }

        report.failed_urls = failed;
    }
}

/// Runs a complete mirror with the configured fetch stack
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::load_config;
/// use site_mirror::crawler::run_mirror;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("mirror.toml"))?;
/// let report = run_mirror(config).await?;
/// println!("{} files saved", report.files_saved());
/// # Ok(())
/// # }
/// ```
pub async fn run_mirror(config: Config) -> Result<MirrorReport, MirrorError> {
    Coordinator::new(config)?.run().await
}
