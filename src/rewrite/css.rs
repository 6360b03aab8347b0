use crate::extract::css_reference_spans;
use crate::rewrite::{splice, Rewriter};
use std::path::Path;
use url::Url;

/// Rewrites `url(...)` and `@import` references in a stylesheet or inline style
///
/// References resolve against `base`, which is the stylesheet's own URL for a
/// CSS file and the document URL for inline CSS. Returns the new text and the
/// number of references replaced.
pub fn rewrite_css(rewriter: &Rewriter<'_>, css: &str, base: &Url, own_path: &Path) -> (String, usize) {
    let edits: Vec<_> = css_reference_spans(css)
        .into_iter()
        .filter_map(|span| {
            let local = rewriter.resolve(&css[span.clone()], base, own_path)?;
            Some((span, local))
        })
        .collect();

    let count = edits.len();
    if count == 0 {
        return (css.to_string(), 0);
    }
    (splice(css, edits), count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathTable;
    use crate::url::{normalize_url, Site};
    use std::path::PathBuf;

    fn table() -> PathTable {
        let mut table = PathTable::new();
        for (url, path) in [
            ("https://x.com/fonts/f.woff2", "x.com/fonts/f.woff2"),
            ("https://x.com/img/bg.png", "x.com/img/bg.png"),
            ("https://cdn.x.com/reset.css", "cdn.x.com/reset.css"),
        ] {
            table.record(normalize_url(url).unwrap(), PathBuf::from(path));
        }
        table
    }

    #[test]
    fn test_rewrites_relative_to_stylesheet() {
        let site = Site::parse("https://x.com/").unwrap();
        let table = table();
        let rewriter = Rewriter::new(&table, &site);

        let css = "@font-face{src:url('../fonts/f.woff2') format('woff2')}\nbody{background:url(/img/bg.png)}";
        let base = Url::parse("https://x.com/css/app.css").unwrap();
        let (out, count) = rewrite_css(&rewriter, css, &base, Path::new("x.com/css/app.css"));

        assert_eq!(count, 2);
        assert_eq!(
            out,
            "@font-face{src:url('../fonts/f.woff2') format('woff2')}\nbody{background:url(../img/bg.png)}"
        );
    }

    #[test]
    fn test_import_across_hosts() {
        let site = Site::parse("https://x.com/").unwrap();
        let table = table();
        let rewriter = Rewriter::new(&table, &site);

        let css = "@import \"//cdn.x.com/reset.css\";";
        let base = Url::parse("https://x.com/css/app.css").unwrap();
        let (out, count) = rewrite_css(&rewriter, css, &base, Path::new("x.com/css/app.css"));

        assert_eq!(count, 1);
        assert_eq!(out, "@import \"../../cdn.x.com/reset.css\";");
    }

    #[test]
    fn test_unknown_references_untouched() {
        let site = Site::parse("https://x.com/").unwrap();
        let table = table();
        let rewriter = Rewriter::new(&table, &site);

        let css = "a{background:url(/missing.png)} b{background:url(data:image/gif;base64,R0)}";
        let base = Url::parse("https://x.com/app.css").unwrap();
        let (out, count) = rewrite_css(&rewriter, css, &base, Path::new("x.com/app.css"));

        assert_eq!(count, 0);
        assert_eq!(out, css);
    }
}
