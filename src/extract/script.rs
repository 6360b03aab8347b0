use crate::extract::{capture_first, regex};
use crate::paths::ASSET_EXTENSIONS;
use crate::url::{path_extension, NormalizedUrl, Site};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use url::Url;

static QUOTED_PATH: OnceLock<Regex> = OnceLock::new();

/// Scans a downloaded script for asset paths in string literals
///
/// Only absolute, protocol-relative and root-relative strings are considered,
/// since a bare relative path in a script resolves against whatever page
/// loads it. Matches are kept when they are same-site and carry a known asset
/// extension; API routes and template fragments fall out naturally.
pub fn extract_script(js: &str, script_url: &Url, site: &Site) -> BTreeSet<NormalizedUrl> {
    let quoted_path = QUOTED_PATH.get_or_init(|| {
        regex(
            r#"["'`]((?:https?:)?//[^"'`\s<>]+|/[^"'`\s<>/][^"'`\s<>]*)["'`]"#,
            "script string literal",
        )
    });

    quoted_path
        .captures_iter(js)
        .filter_map(|caps| capture_first(&caps, &[1]))
        .filter_map(|m| site.normalize(m.as_str(), script_url))
        .filter(|url| site.is_same_site(url))
        .filter(|url| {
            path_extension(url.as_url().path())
                .map(|ext| ASSET_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false)
        })
        .collect()
}
