//! Run statistics
//!
//! The coordinator fills a [`MirrorReport`] as it goes; the binary prints it
//! once the run is over.

use std::path::PathBuf;
use std::time::Duration;

/// Summary of a completed mirror run
#[derive(Debug, Clone, Default)]
pub struct MirrorReport {
    /// Pages fetched as HTML and written to disk
    pub pages_saved: usize,

    /// Pages that could not be fetched or written
    pub pages_failed: usize,

    /// Page URLs that answered with non-HTML content and were saved as assets
    pub pages_saved_as_assets: usize,

    pub assets_downloaded: usize,
    pub assets_failed: usize,

    /// HTML and CSS files in which at least one reference was rewritten
    pub files_rewritten: usize,

    /// Total references rewritten across all files
    pub references_rewritten: usize,

    /// Every permanently failed URL, sorted
    pub failed_urls: Vec<String>,

    pub output_dir: PathBuf,

    /// Root redirect, when one was written
    pub root_index: Option<PathBuf>,

    /// `failed_urls.txt`, when one was written
    pub failed_log: Option<PathBuf>,

    pub elapsed: Duration,
}

impl MirrorReport {
    /// Number of files saved in total
    pub fn files_saved(&self) -> usize {
        self.pages_saved + self.pages_saved_as_assets + self.assets_downloaded
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_urls.is_empty()
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &MirrorReport) {
    println!("=== Mirror Statistics ===\n");

    println!("Pages:");
    println!("  Saved: {}", report.pages_saved);
    if report.pages_saved_as_assets > 0 {
        println!("  Saved as assets (non-HTML): {}", report.pages_saved_as_assets);
    }
    println!("  Failed: {}", report.pages_failed);
    println!();

    println!("Assets:");
    println!("  Downloaded: {}", report.assets_downloaded);
    println!("  Failed: {}", report.assets_failed);
    println!();

    println!("Rewriting:");
    println!(
        "  {} references rewritten in {} files",
        report.references_rewritten, report.files_rewritten
    );
    println!();

    let attempted = report.files_saved() + report.failed_urls.len();
    let success_rate = if attempted > 0 {
        (report.files_saved() as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} resources saved)",
        success_rate,
        report.files_saved(),
        attempted
    );
    println!("Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    println!("Output: {}", report.output_dir.display());

    if let Some(index) = &report.root_index {
        println!("Open: {}", index.display());
    }

    if let Some(log) = &report.failed_log {
        println!(
            "Failed URLs ({}) listed in {}",
            report.failed_urls.len(),
            log.display()
        );
    }
}
