//! Link rewriting
//!
//! Runs once every download has been resolved. Each saved HTML or CSS file is
//! read back, every reference whose normalized URL is in the path table is
//! replaced with a path relative to that file, and the file is written again.
//!
//! Rewriting works on byte spans of the original text: only the value being
//! replaced changes, and references that are not in the table (failed or out
//! of scope) are left exactly as they were.

mod css;
mod html;

pub use css::rewrite_css;
pub use html::rewrite_html;

use crate::output::SiteWriter;
use crate::paths::PathTable;
use crate::url::{NormalizedUrl, Site};
use std::ops::Range;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Document flavor of a rewrite target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Css,
}

/// A saved file waiting for the rewrite pass
#[derive(Debug, Clone)]
pub struct RewriteJob {
    /// Key of the file in the path table
    pub url: NormalizedUrl,

    /// URL relative references in the file resolve against (after redirects)
    pub base_url: Url,

    /// Location relative to the output root
    pub path: PathBuf,

    pub kind: DocumentKind,
}

/// Totals of a rewrite pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub files_rewritten: usize,
    pub references_rewritten: usize,
}

/// Rewrites references in documents using a complete path table
pub struct Rewriter<'a> {
    table: &'a PathTable,
    site: &'a Site,
}

impl<'a> Rewriter<'a> {
    pub fn new(table: &'a PathTable, site: &'a Site) -> Self {
        Self { table, site }
    }

    /// Local replacement for a raw reference found in `own_path`
    ///
    /// The reference is normalized exactly like the extractor normalized it.
    /// A fragment in the original text is carried over to the local path.
    pub(crate) fn resolve(&self, raw: &str, base: &Url, own_path: &Path) -> Option<String> {
        let trimmed = raw.trim();
        let url = self.site.normalize(trimmed, base)?;
        let target = self.table.get(&url)?;

        let mut local = relative_reference(own_path, target);
        if let Some(idx) = trimmed.find('#') {
            local.push_str(&trimmed[idx..]);
        }
        Some(local)
    }

    /// Rewrites one saved file in place
    ///
    /// # Returns
    ///
    /// The number of references replaced; the file is only written back when
    /// that number is non-zero.
    pub fn rewrite_file(&self, writer: &SiteWriter, job: &RewriteJob) -> std::io::Result<usize> {
        let original = writer.read_text(&job.path)?;

        let (rewritten, count) = match job.kind {
            DocumentKind::Html => rewrite_html(self, &original, &job.base_url, &job.path),
            DocumentKind::Css => rewrite_css(self, &original, &job.base_url, &job.path),
        };

        if count > 0 {
            writer.write(&job.path, rewritten.as_bytes())?;
        }
        Ok(count)
    }

    /// Rewrites every job, logging and skipping files that cannot be processed
    pub fn rewrite_all(&self, writer: &SiteWriter, jobs: &[RewriteJob]) -> RewriteSummary {
        let mut summary = RewriteSummary::default();

        for job in jobs {
            match self.rewrite_file(writer, job) {
                Ok(0) => {}
                Ok(count) => {
                    summary.files_rewritten += 1;
                    summary.references_rewritten += count;
                    tracing::debug!("Rewrote {} references in {}", count, job.path.display());
                }
                Err(e) => {
                    tracing::warn!("Failed to rewrite {}: {}", job.path.display(), e);
                }
            }
        }

        summary
    }
}

/// Path of `target` relative to the directory containing `from_file`
///
/// Both paths are relative to the output root. Separators are always `/`,
/// and every segment is percent-encoded so the result is a valid URL path.
///
/// # Examples
///
/// ```
/// use site_mirror::rewrite::relative_reference;
/// use std::path::Path;
///
/// assert_eq!(
///     relative_reference(Path::new("x.com/index.html"), Path::new("cdn.x.com/s.css")),
///     "../cdn.x.com/s.css"
/// );
/// assert_eq!(
///     relative_reference(Path::new("x.com/blog/post.html"), Path::new("x.com/a b.png")),
///     "../a%20b.png"
/// );
/// ```
pub fn relative_reference(from_file: &Path, target: &Path) -> String {
    let from_dir = from_file.parent().unwrap_or_else(|| Path::new(""));
    let relative = pathdiff::diff_paths(target, from_dir).unwrap_or_else(|| target.to_path_buf());

    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::ParentDir => Some("..".to_string()),
            Component::Normal(segment) => {
                Some(urlencoding::encode(&segment.to_string_lossy()).into_owned())
            }
            _ => None,
        })
        .collect();

    segments.join("/")
}

/// Applies non-overlapping span replacements to a text
pub(crate) fn splice(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        if range.start < cursor {
            continue;
        }
        out.push_str(&text[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize_url;

    #[test]
    fn test_relative_reference_same_directory() {
        assert_eq!(
            relative_reference(Path::new("x.com/index.html"), Path::new("x.com/a.png")),
            "a.png"
        );
    }

    #[test]
    fn test_relative_reference_across_hosts() {
        assert_eq!(
            relative_reference(
                Path::new("x.com/blog/post/index.html"),
                Path::new("cdn.x.com/css/s.css")
            ),
            "../../../cdn.x.com/css/s.css"
        );
    }

    #[test]
    fn test_relative_reference_from_root_file() {
        assert_eq!(
            relative_reference(Path::new("index.html"), Path::new("x.com/index.html")),
            "x.com/index.html"
        );
    }

    #[test]
    fn test_relative_reference_to_self() {
        assert_eq!(
            relative_reference(Path::new("x.com/about.html"), Path::new("x.com/about.html")),
            "about.html"
        );
    }

    #[test]
    fn test_splice_applies_in_order() {
        let text = "0123456789";
        let out = splice(text, vec![(6..8, "B".to_string()), (1..3, "A".to_string())]);
        assert_eq!(out, "0A345B89");
    }

    #[test]
    fn test_resolve_keeps_fragment() {
        let site = Site::parse("https://x.com/").unwrap();
        let mut table = PathTable::new();
        table.record(
            normalize_url("https://x.com/sprite.svg").unwrap(),
            PathBuf::from("x.com/sprite.svg"),
        );

        let rewriter = Rewriter::new(&table, &site);
        let base = Url::parse("https://x.com/blog/post").unwrap();
        assert_eq!(
            rewriter.resolve("/sprite.svg#icon", &base, Path::new("x.com/blog/post.html")),
            Some("../sprite.svg#icon".to_string())
        );
        assert_eq!(
            rewriter.resolve("/missing.svg", &base, Path::new("x.com/blog/post.html")),
            None
        );
    }
}
