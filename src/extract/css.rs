use crate::extract::{capture_first, regex};
use crate::url::{NormalizedUrl, Site};
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::OnceLock;
use url::Url;

static URL_TOKEN: OnceLock<Regex> = OnceLock::new();
static IMPORT_STRING: OnceLock<Regex> = OnceLock::new();

/// Byte ranges of every raw reference in a stylesheet, in document order
///
/// Covers `url(...)` tokens with double, single or no quotes and the string
/// form of `@import`. The `@import url(...)` form is a `url(...)` token.
/// Ranges exclude the quotes so the rewriter can splice in place.
pub(crate) fn css_reference_spans(css: &str) -> Vec<Range<usize>> {
    let url_token = URL_TOKEN.get_or_init(|| {
        regex(
            r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^'")\s]+))\s*\)"#,
            "css url()",
        )
    });
    let import_string = IMPORT_STRING.get_or_init(|| {
        regex(r#"(?i)@import\s+(?:"([^"]*)"|'([^']*)')"#, "css @import")
    });

    let mut spans: Vec<Range<usize>> = url_token
        .captures_iter(css)
        .chain(import_string.captures_iter(css))
        .filter_map(|caps| capture_first(&caps, &[1, 2, 3]))
        .filter(|m| !m.as_str().trim().is_empty())
        .map(|m| m.range())
        .collect();

    spans.sort_by_key(|span| span.start);
    spans
}

/// Raw reference strings in a stylesheet or inline style, in document order
///
/// # Examples
///
/// ```
/// use site_mirror::extract::css_references;
///
/// let css = r#"@import "base.css"; body { background: url('/bg.png') }"#;
/// assert_eq!(css_references(css), vec!["base.css", "/bg.png"]);
/// ```
pub fn css_references(css: &str) -> Vec<&str> {
    css_reference_spans(css)
        .into_iter()
        .map(|span| css[span].trim())
        .collect()
}

/// Extracts every asset referenced by a stylesheet
///
/// References resolve against the stylesheet's own URL, so `../fonts/f.woff2`
/// inside `/css/app.css` becomes `/fonts/f.woff2`. Every reference is an
/// asset, whichever host it lives on.
pub fn extract_css(css: &str, stylesheet_url: &Url, site: &Site) -> BTreeSet<NormalizedUrl> {
    css_references(css)
        .into_iter()
        .filter_map(|raw| site.normalize(raw, stylesheet_url))
        .collect()
}
