//! HTML reference rewriting
//!
//! The document is scanned tag by tag with regular expressions rather than
//! re-serialized from a DOM, so everything outside a rewritten attribute value
//! keeps its original bytes. Comments and `<script>` bodies are copied as-is;
//! `<style>` bodies go through the CSS rewriter.

use crate::extract::{
    attribute_kind, capture_first, css_reference_spans, is_meta_asset, is_meta_refresh, link_role,
    refresh_target, regex, srcset_candidates, AttrKind, LinkRole,
};
use crate::rewrite::{splice, Rewriter};
use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;
use url::Url;

static TAG: OnceLock<Regex> = OnceLock::new();
static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();

type Edit = (Range<usize>, String);

/// Rewrites every reference in an HTML document that has a local copy
///
/// Uses the same attribute tables as extraction, so each discovered reference
/// is a rewrite candidate. References resolve against `document_url`;
/// `<base href>` is not honored. Returns the new text and the number of
/// references replaced.
pub fn rewrite_html(
    rewriter: &Rewriter<'_>,
    html: &str,
    document_url: &Url,
    own_path: &Path,
) -> (String, usize) {
    let tag_re = TAG.get_or_init(|| {
        regex(
            r#"(?s)<!--.*?-->|<([a-zA-Z][\w:-]*)((?:\s*[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'<>`]+))?)*)\s*/?>"#,
            "html tag",
        )
    });

    let lower = html.to_ascii_lowercase();
    let ctx = Context {
        rewriter,
        html,
        base: document_url,
        own_path,
    };
    let mut edits = Vec::new();
    let mut pos = 0;

    while pos < html.len() {
        let Some(caps) = tag_re.captures_at(html, pos) else {
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };
        pos = whole.end();

        // comment
        let Some(name) = caps.get(1) else {
            continue;
        };
        let tag = name.as_str().to_ascii_lowercase();

        if let Some(attrs) = caps.get(2) {
            ctx.rewrite_attributes(&tag, attrs.range(), &mut edits);
        }

        if whole.as_str().ends_with("/>") {
            continue;
        }

        match tag.as_str() {
            "script" => pos = closing_tag(&lower, "</script", pos),
            "style" => {
                let end = closing_tag(&lower, "</style", pos);
                ctx.rewrite_css_span(pos..end, false, &mut edits);
                pos = end;
            }
            _ => {}
        }
    }

    let count = edits.len();
    if count == 0 {
        return (html.to_string(), 0);
    }
    (splice(html, edits), count)
}

struct Context<'r, 'a> {
    rewriter: &'r Rewriter<'a>,
    html: &'r str,
    base: &'r Url,
    own_path: &'r Path,
}

impl Context<'_, '_> {
    fn rewrite_attributes(&self, tag: &str, span: Range<usize>, edits: &mut Vec<Edit>) {
        let attr_re = ATTRIBUTE.get_or_init(|| {
            regex(
                r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'<>`]+)))?"#,
                "html attribute",
            )
        });

        let offset = span.start;
        let attrs: Vec<(String, Range<usize>)> = attr_re
            .captures_iter(&self.html[span])
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str().to_ascii_lowercase();
                let value = capture_first(&caps, &[2, 3, 4])?.range();
                Some((name, offset + value.start..offset + value.end))
            })
            .collect();

        let lookup = |key: &str| attribute_value(self.html, &attrs, key);

        for (name, range) in &attrs {
            let value = &self.html[range.clone()];

            match (tag, name.as_str()) {
                ("a" | "area", "href") => self.rewrite_url(range.clone(), edits),
                ("link", "href") => {
                    if link_role(lookup("rel").unwrap_or("")) != LinkRole::Ignore {
                        self.rewrite_url(range.clone(), edits);
                    }
                }
                ("meta", "content") => {
                    if is_meta_refresh(lookup("http-equiv")) {
                        if let Some(target) = refresh_target(value) {
                            let start = range.start;
                            self.rewrite_url(start + target.start..start + target.end, edits);
                        }
                    } else if is_meta_asset(lookup("property"), lookup("name")) {
                        self.rewrite_url(range.clone(), edits);
                    }
                }
                _ => match attribute_kind(tag, name) {
                    Some(AttrKind::Url) => self.rewrite_url(range.clone(), edits),
                    Some(AttrKind::Srcset) => {
                        for candidate in srcset_candidates(value) {
                            self.rewrite_url(
                                range.start + candidate.start..range.start + candidate.end,
                                edits,
                            );
                        }
                    }
                    Some(AttrKind::Style) => self.rewrite_css_span(range.clone(), true, edits),
                    None => {}
                },
            }
        }
    }

    /// Replaces one attribute-encoded reference if it has a local copy
    fn rewrite_url(&self, span: Range<usize>, edits: &mut Vec<Edit>) {
        let decoded = decode_entities(&self.html[span.clone()]);
        let raw = decoded.trim().trim_matches(|c| c == '"' || c == '\'');

        if let Some(local) = self.rewriter.resolve(raw, self.base, self.own_path) {
            edits.push((span, escape_attribute(&local)));
        }
    }

    /// Rewrites references inside CSS embedded in the document
    fn rewrite_css_span(&self, span: Range<usize>, in_attribute: bool, edits: &mut Vec<Edit>) {
        let css = &self.html[span.clone()];

        for reference in css_reference_spans(css) {
            let absolute = span.start + reference.start..span.start + reference.end;
            if in_attribute {
                self.rewrite_url(absolute, edits);
            } else if let Some(local) =
                self.rewriter.resolve(&css[reference], self.base, self.own_path)
            {
                edits.push((absolute, local));
            }
        }
    }
}

fn attribute_value<'h>(html: &'h str, attrs: &[(String, Range<usize>)], key: &str) -> Option<&'h str> {
    attrs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, range)| &html[range.clone()])
}

/// Offset of the closing tag, or the end of the document if it is missing
fn closing_tag(lower: &str, needle: &str, from: usize) -> usize {
    lower[from..]
        .find(needle)
        .map(|idx| from + idx)
        .unwrap_or(lower.len())
}

/// Decodes the character references that show up in attribute URLs
fn decode_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }

    Cow::Owned(
        value
            .replace("&quot;", "\"")
            .replace("&#34;", "\"")
            .replace("&#39;", "'")
            .replace("&#x27;", "'")
            .replace("&apos;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&"),
    )
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
