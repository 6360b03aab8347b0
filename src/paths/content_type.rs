//! Content-Type helpers shared by the fetcher, the path mapper and the pipeline

/// Returns the media type without parameters, lowercased
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// True for `text/html` and `application/xhtml+xml`
pub fn is_html(content_type: &str) -> bool {
    let media = media_type(content_type);
    media == "text/html" || media.starts_with("application/xhtml")
}

pub fn is_css(content_type: &str) -> bool {
    media_type(content_type) == "text/css"
}

pub fn is_javascript(content_type: &str) -> bool {
    matches!(
        media_type(content_type).as_str(),
        "application/javascript" | "text/javascript" | "application/x-javascript"
    )
}

/// True for bodies that should be decoded and written as text
pub fn is_text(content_type: &str) -> bool {
    let media = media_type(content_type);
    media.starts_with("text/")
        || ["javascript", "json", "xml", "svg"]
            .iter()
            .any(|marker| media.contains(marker))
}

/// Guesses a file extension for a media type
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let ext = match media_type(content_type).as_str() {
        "text/html" | "application/xhtml+xml" => "html",
        "text/css" => "css",
        "application/javascript" | "text/javascript" | "application/x-javascript" => "js",
        "application/json" => "json",
        "application/xml" | "text/xml" => "xml",
        "text/plain" => "txt",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/svg+xml" => "svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "font/woff" | "application/font-woff" => "woff",
        "font/woff2" => "woff2",
        "font/ttf" | "application/x-font-ttf" => "ttf",
        "font/otf" => "otf",
        "application/vnd.ms-fontobject" => "eot",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        "application/pdf" => "pdf",
        _ => return None,
    };
    Some(ext)
}
