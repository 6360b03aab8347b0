use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether two hosts belong to the same site
///
/// Hosts are the same site if they are equal after stripping a leading
/// `www.`, or if either one is a subdomain of the other. This is a lenient
/// heuristic that tolerates CDN and www mismatches; it can also accept
/// unrelated hosts sharing a suffix (`a.b.com` vs `b.com`).
///
/// # Examples
///
/// ```
/// use site_mirror::url::is_same_site;
///
/// assert!(is_same_site("www.x.com", "x.com"));
/// assert!(is_same_site("cdn.x.com", "x.com"));
/// assert!(is_same_site("x.com", "shop.x.com"));
/// assert!(!is_same_site("x.com", "y.com"));
/// ```
pub fn is_same_site(host: &str, site_host: &str) -> bool {
    let host = strip_www(host);
    let site = strip_www(site_host);

    if host.is_empty() || site.is_empty() {
        return false;
    }

    host == site || is_subdomain_of(host, site) || is_subdomain_of(site, host)
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn is_subdomain_of(candidate: &str, parent: &str) -> bool {
    candidate.len() > parent.len()
        && candidate.ends_with(parent)
        && candidate.as_bytes()[candidate.len() - parent.len() - 1] == b'.'
}
