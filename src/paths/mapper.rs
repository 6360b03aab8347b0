use crate::paths::content_type;
use crate::url::{path_extension, NormalizedUrl};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Extensions kept verbatim on disk
///
/// Anything else (no extension, `.php`, `.aspx`, version-like suffixes) is
/// treated as a route and gets an extension appended.
pub const ASSET_EXTENSIONS: &[&str] = &[
    "css", "js", "mjs", "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "bmp", "woff",
    "woff2", "ttf", "eot", "otf", "mp4", "webm", "mp3", "ogg", "wav", "m4a", "pdf", "json", "xml",
    "txt", "map", "csv", "zip",
];

/// Extensions that already name an HTML file
const HTML_EXTENSIONS: &[&str] = &["html", "htm"];

/// Characters that are invalid in file names on common filesystems
const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\'];

/// Derives the local path for a URL, relative to the output root
///
/// The mapping is pure: the same URL and content type always give the same
/// path, and nothing is recorded anywhere. The path table decides which URL
/// owns a path once it is actually written.
///
/// # Rules
///
/// 1. Root under a per-host directory (`host` or `host_port`)
/// 2. Empty path or `/` becomes `index.html`
/// 3. Paths without a whitelisted extension are routes: HTML-like content
///    (or unknown content) gets `.html` appended (`index.html` after a
///    trailing `/`); other content gets an extension guessed from its type
/// 4. A query string injects an 8-character hash before the extension
/// 5. A path that only maps to its name by decoding escapes other than the
///    ones a URL must carry, or by replacing unsafe characters, also gets a
///    hash of the raw path, so distinct URLs never compete for one name
///
/// # Examples
///
/// ```
/// use site_mirror::paths::local_path;
/// use site_mirror::url::normalize_url;
/// use std::path::PathBuf;
///
/// let url = normalize_url("https://x.com/about").unwrap();
/// assert_eq!(local_path(&url, None), PathBuf::from("x.com/about.html"));
///
/// let url = normalize_url("https://x.com/").unwrap();
/// assert_eq!(local_path(&url, None), PathBuf::from("x.com/index.html"));
/// ```
pub fn local_path(url: &NormalizedUrl, content_type: Option<&str>) -> PathBuf {
    let parsed = url.as_url();
    let (mut path, mut lossy) = decoded_path(parsed.path());

    if path.is_empty() || path == "/" {
        path = "/index.html".to_string();
    }

    let keep_extension = path_extension(&path)
        .map(|ext| ASSET_EXTENSIONS.contains(&ext.as_str()) || HTML_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);

    if !keep_extension {
        let html_like = content_type.map(content_type::is_html).unwrap_or(true);
        let suffix = if html_like {
            Some("html")
        } else {
            content_type.and_then(content_type::extension_for)
        };

        if path.ends_with('/') {
            path.push_str("index");
        }
        if let Some(ext) = suffix {
            path.push('.');
            path.push_str(ext);
        }
    }

    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let clean = sanitize_segment(segment);
            lossy |= clean != segment;
            clean
        })
        .collect();
    let mut file = segments.join("/");

    if let Some(query) = parsed.query() {
        file = inject_suffix(&file, &short_hash(query));
    }
    // Another URL may decode or sanitize to the same name
    if lossy {
        file = inject_suffix(&file, &short_hash(parsed.path()));
    }

    let mut local = PathBuf::from(host_directory(url));
    for segment in file.split('/') {
        local.push(segment);
    }
    local
}

/// Directory name used for a URL's host
pub fn host_directory(url: &NormalizedUrl) -> String {
    let host = url.host().unwrap_or("unknown-host").to_lowercase();
    let dir = match url.as_url().port() {
        Some(port) => format!("{}_{}", host, port),
        None => host,
    };
    sanitize_segment(&dir)
}

/// First 8 hex characters of the SHA-256 of `input`
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)[..8].to_string()
}

/// Inserts `_<suffix>` into the last path segment, before its extension
pub(crate) fn inject_suffix(path: &str, suffix: &str) -> String {
    let (dir, file) = match path.rfind('/') {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    };

    match file.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}_{}{}", dir, &file[..dot], suffix, &file[dot..]),
        _ => format!("{}{}_{}", dir, file, suffix),
    }
}

/// Percent-decodes a URL path
///
/// The flag is set when an escape decoded to a character a URL may also carry
/// literally (`%41` and `A`, `%2F` and `/`).
fn decoded_path(raw: &str) -> (String, bool) {
    let decoded = match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => return (raw.to_string(), false),
    };

    let bytes = raw.as_bytes();
    let lossy = bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .map(|byte| !always_escaped(byte))
                .unwrap_or(false)
    });
    (decoded, lossy)
}

/// Bytes that are never written literally in a URL path
fn always_escaped(byte: u8) -> bool {
    byte < 0x20 || byte >= 0x7f || b" \"#<>?`{}".contains(&byte)
}

fn sanitize_segment(segment: &str) -> String {
    if segment == "." || segment == ".." {
        return "_".to_string();
    }

    segment
        .chars()
        .map(|c| {
            if UNSAFE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}
