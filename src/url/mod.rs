//! URL handling module for site-mirror
//!
//! This module provides reference normalization, the same-site heuristic and
//! page/asset classification.

mod domain;
mod normalize;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_same_site};
pub use normalize::{normalize_reference, normalize_url, NormalizedUrl};

/// Path extensions that mark a same-site link as a navigable page
pub const PAGE_EXTENSIONS: &[&str] = &["html", "htm", "xhtml", "shtml", "php", "asp", "aspx", "jsp"];

/// What a discovered reference is, decided once at the point of discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Same-site, HTML-like resource eligible for further link discovery
    Page,
    /// Anything required to render a page (image, script, stylesheet, font, media)
    Asset,
}

impl ResourceKind {
    pub fn is_page(&self) -> bool {
        matches!(self, Self::Page)
    }
}

/// The site being mirrored
///
/// Holds the seed URL and answers the two questions every extractor needs:
/// how to normalize a raw reference and whether a URL is on the same site.
#[derive(Debug, Clone)]
pub struct Site {
    seed: NormalizedUrl,
    host: String,
}

impl Site {
    /// Creates a site rooted at the given seed URL
    pub fn new(seed: NormalizedUrl) -> UrlResult<Self> {
        let host = extract_domain(seed.as_url()).ok_or(UrlError::MissingHost)?;
        Ok(Self { seed, host })
    }

    /// Parses the seed URL string and creates the site
    pub fn parse(seed: &str) -> UrlResult<Self> {
        Self::new(normalize_url(seed)?)
    }

    pub fn seed(&self) -> &NormalizedUrl {
        &self.seed
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Scheme used to complete protocol-relative references
    pub fn scheme(&self) -> &str {
        self.seed.as_url().scheme()
    }

    /// Normalizes a raw reference found in the document at `document`
    pub fn normalize(&self, raw: &str, document: &Url) -> Option<NormalizedUrl> {
        normalize_reference(raw, document, self.scheme())
    }

    /// Applies the lenient same-site heuristic to a URL
    pub fn is_same_site(&self, url: &NormalizedUrl) -> bool {
        url.host()
            .map(|host| is_same_site(&host.to_lowercase(), &self.host))
            .unwrap_or(false)
    }

    /// Classifies an anchor target
    ///
    /// Cross-site targets are out of scope and return `None`. Same-site targets
    /// with no extension or an HTML-like extension are pages; every other
    /// same-site extension is an asset.
    pub fn classify_link(&self, url: &NormalizedUrl) -> Option<ResourceKind> {
        if !self.is_same_site(url) {
            return None;
        }

        if is_page_path(url.as_url().path()) {
            Some(ResourceKind::Page)
        } else {
            Some(ResourceKind::Asset)
        }
    }
}

/// Returns the lowercase extension of the last path segment, if any
///
/// # Examples
///
/// ```
/// use site_mirror::url::path_extension;
///
/// assert_eq!(path_extension("/css/App.CSS"), Some("css".to_string()));
/// assert_eq!(path_extension("/v1.2/about"), None);
/// assert_eq!(path_extension("/blog/"), None);
/// ```
pub fn path_extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next().unwrap_or("");
    let (stem, ext) = segment.rsplit_once('.')?;

    if stem.is_empty() || ext.is_empty() || ext.len() > 10 {
        return None;
    }

    Some(ext.to_ascii_lowercase())
}

/// Checks whether a URL path looks like a navigable page
pub fn is_page_path(path: &str) -> bool {
    match path_extension(path) {
        None => true,
        Some(ext) => PAGE_EXTENSIONS.contains(&ext.as_str()),
    }
}
