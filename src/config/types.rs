use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fixture site mirrored when no target URL is given
pub const DEFAULT_TARGET_URL: &str = "https://books.toscrape.com/";

/// Browser-like user agent sent by default
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for site-mirror
///
/// Every section and every key is optional; missing values take the defaults
/// below, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetch: FetchConfig,
    pub resolver: ResolverConfig,
    pub output: OutputConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Seed page; its host defines the site
    #[serde(rename = "target-url")]
    pub target_url: String,

    /// Maximum number of link hops from the seed
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Delay before each request (milliseconds)
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: u64,

    /// Size of the asset download worker pool
    #[serde(rename = "max-concurrent-downloads")]
    pub max_concurrent_downloads: u32,

    /// Scan downloaded scripts for same-site asset paths
    #[serde(rename = "scan-scripts")]
    pub scan_scripts: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            max_depth: 10,
            politeness_delay_ms: 100,
            max_concurrent_downloads: 10,
            scan_scripts: false,
        }
    }
}

/// How pages are materialized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Plain HTTP for everything
    #[default]
    Http,
    /// Pages through a headless browser, assets over plain HTTP
    Render,
}

/// Fetch capability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub mode: FetchMode,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Attempts per URL, including the first
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Optional http, https or socks5 proxy URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Renderer argv; `{url}` is replaced with the page URL
    #[serde(rename = "render-command")]
    pub render_command: Vec<String>,

    #[serde(rename = "render-timeout-secs")]
    pub render_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::Http,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_retries: 3,
            retry_delay_ms: 2000,
            proxy: None,
            render_command: ["chromium", "--headless", "--disable-gpu", "--dump-dom", "{url}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            render_timeout_secs: 60,
        }
    }
}

/// Template placeholder and responsive CDN variant resolution
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub enabled: bool,

    /// Value substituted for `{width}`
    #[serde(rename = "placeholder-width")]
    pub placeholder_width: u32,

    /// Value substituted for `{height}`
    #[serde(rename = "placeholder-height")]
    pub placeholder_height: u32,

    /// Widths tried, in order, against responsive image CDNs
    #[serde(rename = "variant-widths")]
    pub variant_widths: Vec<u32>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            placeholder_width: 1920,
            placeholder_height: 1080,
            variant_widths: vec![1920, 1200, 800, 600, 400],
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory of the mirror
    pub directory: PathBuf,

    /// Write `failed_urls.txt` when anything failed
    #[serde(rename = "write-failed-log")]
    pub write_failed_log: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("cloned_site"),
            write_failed_log: true,
        }
    }
}
