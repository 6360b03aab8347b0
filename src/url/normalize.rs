use crate::{UrlError, UrlResult};
use std::fmt;
use url::Url;

/// Reference prefixes that never denote a fetchable resource
const SKIPPED_SCHEMES: &[&str] = &["data:", "javascript:", "mailto:", "tel:", "about:", "blob:"];

/// A canonical, fragment-free, absolute http(s) URL
///
/// This is the key used everywhere a resource is tracked: the crawl frontier,
/// the asset set and the path table. Query strings are kept verbatim because
/// they can select distinct resource variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    /// Returns the underlying parsed URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the canonical string form
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the lowercase host, if any
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    pub fn into_url(self) -> Url {
        self.0
    }

    /// Wraps an absolute URL after stripping its fragment
    ///
    /// Fails for schemes other than http/https and for host-less URLs.
    pub fn from_url(mut url: Url) -> UrlResult<Self> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(format!(
                "Only HTTP and HTTPS schemes are supported, got: {}",
                url.scheme()
            )));
        }

        if url.host_str().is_none() {
            return Err(UrlError::MissingHost);
        }

        url.set_fragment(None);
        Ok(Self(url))
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Parses an absolute URL string into a [`NormalizedUrl`]
///
/// Used for seed URLs; references found inside documents go through
/// [`normalize_reference`] instead.
///
/// # Examples
///
/// ```
/// use site_mirror::url::normalize_url;
///
/// let url = normalize_url("https://example.com/page#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
///
/// let root = normalize_url("https://example.com").unwrap();
/// assert_eq!(root.as_str(), "https://example.com/");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<NormalizedUrl> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    NormalizedUrl::from_url(url)
}

/// Normalizes a raw attribute value found in a document
///
/// # Steps
///
/// 1. Reject empty values, pure fragments and non-fetchable schemes
///    (`data:`, `javascript:`, `mailto:`, `tel:`, `about:`, `blob:`)
/// 2. Prefix protocol-relative values (`//host/path`) with the site's scheme
/// 3. Resolve against the referencing document's own URL (dot segments are
///    collapsed, an empty path becomes `/`)
/// 4. Drop the fragment; keep the query string verbatim
///
/// Returns `None` for anything that is not a fetchable http(s) resource.
/// This is a skippable reference, never an error.
///
/// # Examples
///
/// ```
/// use site_mirror::url::normalize_reference;
/// use url::Url;
///
/// let page = Url::parse("https://x.com/blog/post").unwrap();
/// let img = normalize_reference("../a.png?w=100#top", &page, "https").unwrap();
/// assert_eq!(img.as_str(), "https://x.com/a.png?w=100");
///
/// assert!(normalize_reference("mailto:me@x.com", &page, "https").is_none());
/// ```
pub fn normalize_reference(raw: &str, document: &Url, site_scheme: &str) -> Option<NormalizedUrl> {
    let value = raw.trim();

    if value.is_empty() || value.starts_with('#') {
        return None;
    }

    if has_skipped_scheme(value) {
        return None;
    }

    let resolved = if value.starts_with("//") {
        Url::parse(&format!("{}:{}", site_scheme, value))
    } else {
        document.join(value)
    };

    NormalizedUrl::from_url(resolved.ok()?).ok()
}

/// Checks whether a raw value starts with a non-fetchable scheme
fn has_skipped_scheme(value: &str) -> bool {
    SKIPPED_SCHEMES.iter().any(|scheme| {
        value
            .get(..scheme.len())
            .map(|prefix| prefix.eq_ignore_ascii_case(scheme))
            .unwrap_or(false)
    })
}
