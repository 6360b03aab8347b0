//! site-mirror main entry point
//!
//! This is the command-line interface for the site-mirror offline archiver.

use anyhow::Context;
use clap::Parser;
use site_mirror::config::{load_config_with_hash, validate, Config, FetchMode};
use site_mirror::crawler::run_mirror;
use site_mirror::output::print_report;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// site-mirror: an offline site archiver
///
/// Crawls the pages of a website, downloads every stylesheet, script, image,
/// font and media file they reference, and rewrites all references so the
/// copy can be browsed from disk.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version = "1.0.0")]
#[command(about = "Mirror a website for offline browsing", long_about = None)]
struct Cli {
    /// Seed URL of the site to mirror (defaults to a test fixture site)
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Maximum crawl depth from the seed page
    #[arg(short, long, value_name = "N")]
    depth: Option<u32>,

    /// Politeness delay between requests
    #[arg(long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// Maximum concurrent asset downloads
    #[arg(short = 'w', long, value_name = "N")]
    max_workers: Option<u32>,

    /// Render pages with the configured headless browser command
    #[arg(long)]
    render: bool,

    /// Validate the configuration and print it without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.crawler.target_url = url.clone();
        }
        if let Some(output) = &self.output {
            config.output.directory = output.clone();
        }
        if let Some(depth) = self.depth {
            config.crawler.max_depth = depth;
        }
        if let Some(delay) = self.delay {
            config.crawler.politeness_delay_ms = (delay.max(0.0) * 1000.0).round() as u64;
        }
        if let Some(workers) = self.max_workers {
            config.crawler.max_concurrent_downloads = workers;
        }
        if self.render {
            config.fetch.mode = FetchMode::Render;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    cli.apply(&mut config);
    validate(&config).context("Invalid configuration")?;

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    let output = config.output.directory.clone();
    let report = run_mirror(config)
        .await
        .with_context(|| format!("Mirror into {} failed", output.display()))?;

    if !cli.quiet {
        print_report(&report);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== site-mirror Dry Run ===\n");

    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", rendered);

    println!("✓ Configuration is valid");
    println!(
        "✓ Would mirror {} into {} (max depth {})",
        config.crawler.target_url,
        config.output.directory.display(),
        config.crawler.max_depth
    );

    Ok(())
}
