//! HTML reference extraction
//!
//! Walks every element of the parsed document once and collects:
//! - Asset references from resource-carrying attributes (`src`, `srcset`,
//!   `poster`, lazy-load attributes, SVG `href`, ...)
//! - Stylesheets, icons and preloads from `<link>`
//! - `url(...)` tokens from inline `style` attributes and `<style>` bodies
//! - Open Graph / Twitter image metadata
//! - Page candidates from anchors, canonical/alternate links and meta refresh

use crate::extract::{
    attribute_kind, css_references, is_meta_asset, is_meta_refresh, link_role, refresh_target,
    srcset_candidates, AttrKind, Discovered, LinkRole,
};
use crate::url::{ResourceKind, Site};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extracts asset and page references from an HTML document
///
/// # Arguments
///
/// * `html` - The document body
/// * `document_url` - The URL the document was served from; every relative
///   reference resolves against it
/// * `site` - The site being mirrored, used for page classification
///
/// # Returns
///
/// The discovered assets and pages. Malformed markup never aborts extraction;
/// the parser recovers and unreadable references are skipped.
///
/// # Example
///
/// ```
/// use site_mirror::extract::extract_html;
/// use site_mirror::url::Site;
/// use url::Url;
///
/// let site = Site::parse("https://x.com/").unwrap();
/// let page = Url::parse("https://x.com/").unwrap();
/// let found = extract_html(r#"<img src="/a.png"><a href="/about">About</a>"#, &page, &site);
/// assert_eq!(found.assets.len(), 1);
/// assert_eq!(found.pages.len(), 1);
/// ```
pub fn extract_html(html: &str, document_url: &Url, site: &Site) -> Discovered {
    let document = Html::parse_document(html);
    let mut found = Discovered::default();

    let Ok(all) = Selector::parse("*") else {
        return found;
    };

    for element in document.select(&all) {
        let tag = element.value().name();

        match tag {
            "a" | "area" => extract_anchor(&element, document_url, site, &mut found),
            "link" => extract_link(&element, document_url, site, &mut found),
            "meta" => extract_meta(&element, document_url, site, &mut found),
            "style" => {
                let css: String = element.text().collect();
                add_css_assets(&css, document_url, site, &mut found);
            }
            _ => {}
        }

        for (name, value) in element.value().attrs() {
            match attribute_kind(tag, name) {
                Some(AttrKind::Url) => add_asset(value, document_url, site, &mut found),
                Some(AttrKind::Srcset) => {
                    for span in srcset_candidates(value) {
                        add_asset(&value[span], document_url, site, &mut found);
                    }
                }
                Some(AttrKind::Style) => add_css_assets(value, document_url, site, &mut found),
                None => {}
            }
        }
    }

    found
}

fn extract_anchor(element: &ElementRef, document_url: &Url, site: &Site, found: &mut Discovered) {
    let Some(href) = element.value().attr("href") else {
        return;
    };
    let Some(url) = site.normalize(href, document_url) else {
        return;
    };

    match site.classify_link(&url) {
        Some(ResourceKind::Page) => {
            found.pages.insert(url);
        }
        Some(ResourceKind::Asset) => {
            found.assets.insert(url);
        }
        None => tracing::debug!("Dropping cross-site link {}", url),
    }
}

fn extract_link(element: &ElementRef, document_url: &Url, site: &Site, found: &mut Discovered) {
    let Some(href) = element.value().attr("href") else {
        return;
    };
    let rel = element.value().attr("rel").unwrap_or("");

    match link_role(rel) {
        LinkRole::Asset => add_asset(href, document_url, site, found),
        LinkRole::Page => add_page_candidate(href, document_url, site, found),
        LinkRole::Ignore => {}
    }
}

fn extract_meta(element: &ElementRef, document_url: &Url, site: &Site, found: &mut Discovered) {
    let meta = element.value();
    let Some(content) = meta.attr("content") else {
        return;
    };

    if is_meta_refresh(meta.attr("http-equiv")) {
        if let Some(span) = refresh_target(content) {
            add_page_candidate(&content[span], document_url, site, found);
        }
    } else if is_meta_asset(meta.attr("property"), meta.attr("name")) {
        add_asset(content, document_url, site, found);
    }
}

fn add_asset(raw: &str, document_url: &Url, site: &Site, found: &mut Discovered) {
    if let Some(url) = site.normalize(raw, document_url) {
        found.assets.insert(url);
    }
}

/// Queues a page only when it is same-site and page-like
fn add_page_candidate(raw: &str, document_url: &Url, site: &Site, found: &mut Discovered) {
    if let Some(url) = site.normalize(raw, document_url) {
        if site.classify_link(&url) == Some(ResourceKind::Page) {
            found.pages.insert(url);
        }
    }
}

fn add_css_assets(css: &str, document_url: &Url, site: &Site, found: &mut Discovered) {
    for raw in css_references(css) {
        add_asset(raw, document_url, site, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Site {
        Site::parse("https://x.com/").unwrap()
    }

    fn extract(html: &str) -> Discovered {
        let page = Url::parse("https://x.com/").unwrap();
        extract_html(html, &page, &site())
    }

    fn assets(found: &Discovered) -> Vec<String> {
        found.assets.iter().map(|u| u.to_string()).collect()
    }

    fn pages(found: &Discovered) -> Vec<String> {
        found.pages.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_img_and_protocol_relative_stylesheet() {
        let found = extract(r#"<img src="/a.png"><link rel="stylesheet" href="//cdn.x.com/s.css">"#);
        assert_eq!(
            assets(&found),
            vec!["https://cdn.x.com/s.css", "https://x.com/a.png"]
        );
        assert!(found.pages.is_empty());
    }

    #[test]
    fn test_resource_tags() {
        let html = r#"
            <script src="/app.js"></script>
            <video src="/v.mp4" poster="/poster.jpg"><track src="/subs.vtt"></video>
            <audio><source src="/a.mp3"></audio>
            <iframe src="/embed.html"></iframe>
            <object data="/doc.pdf"></object>
            <embed src="/flash.swf">
            <input type="image" src="/button.png">
        "#;
        let found = extract(html);
        for expected in [
            "https://x.com/app.js",
            "https://x.com/v.mp4",
            "https://x.com/poster.jpg",
            "https://x.com/subs.vtt",
            "https://x.com/a.mp3",
            "https://x.com/embed.html",
            "https://x.com/doc.pdf",
            "https://x.com/flash.swf",
            "https://x.com/button.png",
        ] {
            assert!(assets(&found).contains(&expected.to_string()), "{}", expected);
        }
    }

    #[test]
    fn test_srcset_candidates_each_normalized() {
        let found = extract(r#"<img srcset="/s.jpg 1x, /m.jpg 2x, , /l.jpg 3x">"#);
        assert_eq!(
            assets(&found),
            vec![
                "https://x.com/l.jpg",
                "https://x.com/m.jpg",
                "https://x.com/s.jpg"
            ]
        );
    }

    #[test]
    fn test_lazy_load_attributes() {
        let found = extract(
            r#"<img data-src="/lazy.jpg" data-srcset="/lazy2.jpg 2x"><div data-bg="/bg.jpg"></div>"#,
        );
        assert_eq!(
            assets(&found),
            vec![
                "https://x.com/bg.jpg",
                "https://x.com/lazy.jpg",
                "https://x.com/lazy2.jpg"
            ]
        );
    }

    #[test]
    fn test_inline_and_embedded_css() {
        let html = r#"
            <style>.hero { background: url("/hero.png") }</style>
            <div style="background-image: url('/tile.png')"></div>
        "#;
        assert_eq!(
            assets(&extract(html)),
            vec!["https://x.com/hero.png", "https://x.com/tile.png"]
        );
    }

    #[test]
    fn test_social_metadata_images() {
        let html = r#"
            <meta property="og:image" content="https://img.x.com/card.png">
            <meta name="twitter:image" content="/tw.png">
            <meta name="description" content="about">
        "#;
        assert_eq!(
            assets(&extract(html)),
            vec!["https://img.x.com/card.png", "https://x.com/tw.png"]
        );
    }

    #[test]
    fn test_anchor_classification() {
        let html = r##"
            <a href="/about">About</a>
            <a href="/blog/post.html#comments">Post</a>
            <a href="/files/report.pdf">Report</a>
            <a href="https://other.com/page">Elsewhere</a>
            <a href="mailto:me@x.com">Mail</a>
            <a href="#top">Top</a>
            <a>No href</a>
        "##;
        let found = extract(html);
        assert_eq!(
            pages(&found),
            vec!["https://x.com/about", "https://x.com/blog/post.html"]
        );
        assert_eq!(assets(&found), vec!["https://x.com/files/report.pdf"]);
    }

    #[test]
    fn test_canonical_and_refresh_are_pages() {
        let html = r#"
            <link rel="canonical" href="https://www.x.com/home">
            <link rel="alternate" href="/feed.xml">
            <link rel="preconnect" href="https://fonts.example.net">
            <meta http-equiv="refresh" content="0; url=/moved">
        "#;
        let found = extract(html);
        assert_eq!(
            pages(&found),
            vec!["https://www.x.com/home", "https://x.com/moved"]
        );
        assert!(found.assets.is_empty());
    }

    #[test]
    fn test_svg_references() {
        let html = r##"<svg><use xlink:href="/sprite.svg#icon"></use><image href="/pic.png"></image></svg>"##;
        assert_eq!(
            assets(&extract(html)),
            vec!["https://x.com/pic.png", "https://x.com/sprite.svg"]
        );
    }

    #[test]
    fn test_skippable_values_do_not_abort() {
        let html = r#"
            <img src="data:image/png;base64,AAAA">
            <img src="">
            <img src="javascript:void(0)">
            <img src="/ok.png">
        "#;
        assert_eq!(assets(&extract(html)), vec!["https://x.com/ok.png"]);
    }

    #[test]
    fn test_relative_references_resolve_against_document() {
        let page = Url::parse("https://x.com/blog/post/").unwrap();
        let found = extract_html(r#"<img src="../img/a.png">"#, &page, &site());
        assert_eq!(assets(&found), vec!["https://x.com/blog/img/a.png"]);
    }

    #[test]
    fn test_malformed_html_still_extracts() {
        let found = extract(r#"<div><img src="/a.png"<p>unclosed <a href="/next">"#);
        assert!(pages(&found).contains(&"https://x.com/next".to_string()));
    }
}
