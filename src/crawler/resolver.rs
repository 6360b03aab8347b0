//! Template placeholder and responsive-CDN variant resolution
//!
//! Some sites ship image URLs that are templates (`?w={width}`) meant to be
//! filled in by JavaScript, and some CDNs only serve an image once a size is
//! requested. The resolver turns one logical asset URL into an ordered list
//! of candidate URLs and returns the first one that downloads.
//!
//! The caller keeps the original URL as the key for the path table; only the
//! bytes come from the variant.

use crate::config::ResolverConfig;
use crate::crawler::fetcher::{FetchError, FetchedResource, Fetcher};
use crate::extract::regex;
use crate::url::{normalize_url, NormalizedUrl, ResourceKind};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| regex(r"\{([^{}]*)\}", "template placeholder"))
}

/// Fetcher wrapper that tries URL variants for assets
pub struct VariantResolver {
    inner: Arc<dyn Fetcher>,
    config: ResolverConfig,
}

impl VariantResolver {
    pub fn new(inner: Arc<dyn Fetcher>, config: ResolverConfig) -> Self {
        Self { inner, config }
    }

    /// Ordered, de-duplicated candidate URLs for an asset
    ///
    /// 1. The URL itself, or its placeholder-substituted form if it is a template
    /// 2. Width variants for Contentful (`ctfassets.net`) images
    /// 3. Size-suffix variants for Shopify (`cdn.shopify.com`) images
    /// 4. The query-less base URL for either CDN
    pub fn candidates(&self, url: &NormalizedUrl) -> Vec<NormalizedUrl> {
        let primary = self.substitute_placeholders(url.as_str()).unwrap_or_else(|| url.clone());
        let mut candidates = vec![primary.clone()];

        let host = primary.host().unwrap_or("").to_ascii_lowercase();
        let mut base = primary.as_url().clone();
        base.set_query(None);

        if host.ends_with("ctfassets.net") {
            for width in &self.config.variant_widths {
                candidates.extend(normalize_url(&format!("{}?w={}", base, width)));
                candidates.extend(normalize_url(&format!("{}?w={}&fm=jpg&q=80", base, width)));
            }
            candidates.extend(NormalizedUrl::from_url(base).ok());
        } else if host.ends_with("cdn.shopify.com") {
            let path = base.path().to_string();
            let (stem, ext) = split_extension(&path);
            for width in &self.config.variant_widths {
                let mut variant = base.clone();
                variant.set_path(&format!("{}_{}x{}", stem, width, ext));
                candidates.extend(NormalizedUrl::from_url(variant).ok());
            }
            candidates.extend(NormalizedUrl::from_url(base).ok());
        }

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|candidate| seen.insert(candidate.clone()));
        candidates
    }

    /// Fills in `{width}` / `{height}` and drops every other placeholder
    ///
    /// Query parameters whose value still holds an unknown placeholder are
    /// removed entirely, and a doubled `?` is folded into `&`. Returns `None`
    /// when the URL is not a template.
    fn substitute_placeholders(&self, raw: &str) -> Option<NormalizedUrl> {
        let decoded = raw
            .replace("%7B", "{")
            .replace("%7b", "{")
            .replace("%7D", "}")
            .replace("%7d", "}");

        if !placeholder().is_match(&decoded) {
            return None;
        }

        let (base, query) = match decoded.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (decoded.as_str(), None),
        };

        let mut cleaned = self.fill(base, true);

        let params: Vec<String> = query
            .into_iter()
            .flat_map(|q| q.split(['?', '&']))
            .filter(|param| !param.is_empty())
            .map(|param| self.fill(param, false))
            .filter(|param| !param.is_empty() && !param.ends_with('='))
            .collect();

        if !params.is_empty() {
            cleaned.push('?');
            cleaned.push_str(&params.join("&"));
        }

        normalize_url(&cleaned).ok()
    }

    /// Replaces known placeholders; unknown ones are removed from paths and
    /// void the whole query parameter
    fn fill(&self, text: &str, in_path: bool) -> String {
        let mut unknown = false;
        let filled = placeholder().replace_all(text, |caps: &regex::Captures| {
            match caps[1].trim().to_ascii_lowercase().as_str() {
                "width" => self.config.placeholder_width.to_string(),
                "height" => self.config.placeholder_height.to_string(),
                _ => {
                    unknown = true;
                    String::new()
                }
            }
        });

        if unknown && !in_path {
            String::new()
        } else {
            filled.into_owned()
        }
    }
}

fn split_extension(path: &str) -> (&str, &str) {
    let file_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => path.split_at(file_start + dot),
        _ => (path, ""),
    }
}

#[async_trait]
impl Fetcher for VariantResolver {
    async fn fetch(
        &self,
        url: &NormalizedUrl,
        kind: ResourceKind,
    ) -> Result<FetchedResource, FetchError> {
        if kind.is_page() {
            return self.inner.fetch(url, kind).await;
        }

        let candidates = self.candidates(url);
        if candidates.len() == 1 && &candidates[0] == url {
            return self.inner.fetch(url, kind).await;
        }

        let mut first_permanent = None;
        let mut first_transient = None;

        for candidate in &candidates {
            match self.inner.fetch(candidate, kind).await {
                Ok(resource) => {
                    if candidate != url {
                        tracing::debug!("Fetched {} via variant {}", url, candidate);
                    }
                    return Ok(resource);
                }
                Err(e) if e.is_permanent() => {
                    first_permanent.get_or_insert(e);
                }
                Err(e) => {
                    first_transient.get_or_insert(e);
                }
            }
        }

        // A transient failure anywhere leaves the whole set worth retrying
        match (first_transient, first_permanent) {
            (Some(e), _) | (None, Some(e)) => Err(e),
            (None, None) => Err(FetchError::Network {
                url: url.to_string(),
                message: "no candidate URLs".to_string(),
            }),
        }
    }
}
