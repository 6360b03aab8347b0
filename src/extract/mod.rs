//! Content extraction
//!
//! Turns a fetched document body into the set of resources it references.
//! HTML is parsed with `scraper`; stylesheets and scripts are scanned with
//! tolerant regular expressions. Extraction never fails: anything that does
//! not look like a fetchable reference is skipped.
//!
//! The attribute tables in this module are shared with the rewriter so that
//! every reference that was discovered is also a reference that gets rewritten.

mod css;
mod html;
mod script;
mod srcset;

pub use css::{css_references, extract_css};
pub(crate) use css::css_reference_spans;
pub use html::extract_html;
pub use script::extract_script;
pub use srcset::srcset_candidates;

use crate::url::NormalizedUrl;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::Range;

/// References discovered in one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    /// Resources that must be downloaded for the document to render
    pub assets: BTreeSet<NormalizedUrl>,
    /// Same-site pages to queue for crawling
    pub pages: BTreeSet<NormalizedUrl>,
}

impl Discovered {
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty() && self.pages.is_empty()
    }
}

/// How an attribute value carries references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttrKind {
    /// The whole value is a single URL
    Url,
    /// A `srcset` candidate list
    Srcset,
    /// Inline CSS
    Style,
}

/// Tag/attribute pairs whose value is a single asset URL
const ASSET_ATTRIBUTES: &[(&str, &str)] = &[
    ("img", "src"),
    ("img", "data-src"),
    ("img", "data-lazy-src"),
    ("img", "data-original"),
    ("script", "src"),
    ("video", "src"),
    ("video", "poster"),
    ("audio", "src"),
    ("source", "src"),
    ("source", "data-src"),
    ("track", "src"),
    ("iframe", "src"),
    ("embed", "src"),
    ("object", "data"),
    ("input", "src"),
    ("use", "href"),
    ("image", "href"),
    ("body", "background"),
    ("table", "background"),
    ("td", "background"),
    ("th", "background"),
];

/// Attributes that hold an asset URL on any element
const LAZY_BACKGROUND_ATTRIBUTES: &[&str] = &["data-background", "data-bg"];

/// `<meta>` names and properties whose `content` is an asset URL
const META_ASSET_NAMES: &[&str] = &[
    "og:image",
    "og:image:url",
    "og:image:secure_url",
    "og:video",
    "og:video:url",
    "og:video:secure_url",
    "og:audio",
    "twitter:image",
    "twitter:image:src",
    "msapplication-tileimage",
];

/// Classifies an attribute of a non-navigational element
///
/// `attr` may carry a namespace prefix (`xlink:href`); only the local name is
/// compared. Anchor, `<link>` and `<meta>` references are handled separately
/// because their meaning depends on sibling attributes.
pub(crate) fn attribute_kind(tag: &str, attr: &str) -> Option<AttrKind> {
    let tag = tag.to_ascii_lowercase();
    let attr = attr.to_ascii_lowercase();
    let local = attr.rsplit(':').next().unwrap_or(attr.as_str());

    match local {
        "style" => return Some(AttrKind::Style),
        "srcset" | "data-srcset" => return Some(AttrKind::Srcset),
        _ => {}
    }

    if LAZY_BACKGROUND_ATTRIBUTES.contains(&local) {
        return Some(AttrKind::Url);
    }

    ASSET_ATTRIBUTES
        .iter()
        .any(|(t, a)| *t == tag && *a == local)
        .then_some(AttrKind::Url)
}

/// What the `href` of a `<link>` element points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkRole {
    /// Another page (`canonical`, `alternate`, `next`, `prev`)
    Page,
    /// Connection hints whose target is an origin, not a resource
    Ignore,
    /// Stylesheets, icons, manifests, preloads and everything else
    Asset,
}

pub(crate) fn link_role(rel: &str) -> LinkRole {
    let rel = rel.to_ascii_lowercase();
    let tokens: Vec<&str> = rel.split_ascii_whitespace().collect();

    if tokens
        .iter()
        .any(|t| matches!(*t, "canonical" | "alternate" | "next" | "prev"))
    {
        LinkRole::Page
    } else if tokens
        .iter()
        .any(|t| matches!(*t, "preconnect" | "dns-prefetch"))
    {
        LinkRole::Ignore
    } else {
        LinkRole::Asset
    }
}

/// Byte range of the target URL inside a `<meta http-equiv="refresh">` content value
///
/// Accepts `5; url=/next`, `0;URL='/next'` and similar forms.
pub(crate) fn refresh_target(content: &str) -> Option<Range<usize>> {
    let lower = content.to_ascii_lowercase();
    let idx = lower.find("url")?;

    let rest = content[idx + 3..].trim_start();
    let after_eq = rest.strip_prefix('=')?.trim_start();

    let mut start = content.len() - after_eq.len();
    let mut end = content.trim_end().len();

    if after_eq.starts_with(['\'', '"']) {
        start += 1;
        if end > start && matches!(content.as_bytes()[end - 1], b'\'' | b'"') {
            end -= 1;
        }
    }

    (start < end).then_some(start..end)
}

/// True if a `<meta>` element with these attributes carries an asset URL
pub(crate) fn is_meta_asset(property: Option<&str>, name: Option<&str>) -> bool {
    [property, name]
        .into_iter()
        .flatten()
        .any(|key| META_ASSET_NAMES.contains(&key.to_ascii_lowercase().as_str()))
}

/// True for `<meta http-equiv="refresh">`
pub(crate) fn is_meta_refresh(http_equiv: Option<&str>) -> bool {
    http_equiv
        .map(|value| value.eq_ignore_ascii_case("refresh"))
        .unwrap_or(false)
}

/// Compiles a constant pattern
pub(crate) fn regex(pattern: &'static str, desc: &'static str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid {desc} regex: {err}"))
}

/// First participating group among `groups`
pub(crate) fn capture_first<'t>(
    caps: &regex::Captures<'t>,
    groups: &[usize],
) -> Option<regex::Match<'t>> {
    groups.iter().find_map(|idx| caps.get(*idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_kind_table() {
        assert_eq!(attribute_kind("img", "src"), Some(AttrKind::Url));
        assert_eq!(attribute_kind("IMG", "SRC"), Some(AttrKind::Url));
        assert_eq!(attribute_kind("img", "srcset"), Some(AttrKind::Srcset));
        assert_eq!(attribute_kind("source", "data-srcset"), Some(AttrKind::Srcset));
        assert_eq!(attribute_kind("div", "style"), Some(AttrKind::Style));
        assert_eq!(attribute_kind("div", "data-bg"), Some(AttrKind::Url));
        assert_eq!(attribute_kind("use", "xlink:href"), Some(AttrKind::Url));
        assert_eq!(attribute_kind("div", "src"), None);
        assert_eq!(attribute_kind("a", "href"), None);
    }

    #[test]
    fn test_link_roles() {
        assert_eq!(link_role("stylesheet"), LinkRole::Asset);
        assert_eq!(link_role("shortcut icon"), LinkRole::Asset);
        assert_eq!(link_role("Canonical"), LinkRole::Page);
        assert_eq!(link_role("preconnect"), LinkRole::Ignore);
        assert_eq!(link_role(""), LinkRole::Asset);
    }

    #[test]
    fn test_refresh_target() {
        let content = "5; url=/next.html";
        assert_eq!(&content[refresh_target(content).unwrap()], "/next.html");

        let content = "0;URL='https://x.com/a'";
        assert_eq!(&content[refresh_target(content).unwrap()], "https://x.com/a");

        assert_eq!(refresh_target("30"), None);
        assert_eq!(refresh_target("0; url="), None);
    }

    #[test]
    fn test_meta_detection() {
        assert!(is_meta_asset(Some("og:image"), None));
        assert!(is_meta_asset(None, Some("twitter:image")));
        assert!(!is_meta_asset(None, Some("description")));
        assert!(!is_meta_asset(None, None));
        assert!(is_meta_refresh(Some("Refresh")));
        assert!(!is_meta_refresh(Some("content-type")));
    }
}
