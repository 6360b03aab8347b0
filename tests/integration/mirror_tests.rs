//! Integration tests for the mirror engine
//!
//! These tests use wiremock to create mock HTTP servers and run full
//! crawl, download and rewrite cycles end-to-end.

use scraper::{Html, Selector};
use site_mirror::config::Config;
use site_mirror::crawler::Coordinator;
use site_mirror::output::{FAILED_LOG, ROOT_INDEX};
use site_mirror::paths::host_directory;
use site_mirror::url::normalize_url;
use site_mirror::MirrorReport;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration for the given seed
fn create_test_config(seed: &str, output: &Path, max_depth: u32) -> Config {
    let mut config = Config::default();
    config.crawler.target_url = seed.to_string();
    config.crawler.max_depth = max_depth;
    config.crawler.politeness_delay_ms = 0;
    config.crawler.max_concurrent_downloads = 4;
    config.fetch.max_retries = 1;
    config.fetch.retry_delay_ms = 0;
    config.fetch.timeout_secs = 5;
    config.output.directory = output.to_path_buf();
    config
}

async fn mirror(seed: &str, output: &Path, max_depth: u32) -> MirrorReport {
    let config = create_test_config(seed, output, max_depth);
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    coordinator.run().await.expect("Mirror run failed")
}

/// Output directory name for a mock server
fn host_dir(server: &MockServer) -> PathBuf {
    PathBuf::from(host_directory(&normalize_url(&server.uri()).unwrap()))
}

async fn mount(server: &MockServer, route: &str, content_type: &str, body: impl Into<Vec<u8>>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.into(), content_type))
        .mount(server)
        .await;
}

/// Values of `attr` on every element matching `selector`
fn attribute_values(html: &str, selector: &str, attr: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(selector).unwrap();
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_image_and_protocol_relative_stylesheet() {
    let site = MockServer::start().await;
    let cdn = MockServer::start().await;
    let cdn_authority = cdn.uri().trim_start_matches("http://").to_string();

    let home = format!(
        r#"<!DOCTYPE html><html><head><link rel="stylesheet" href="//{}/s.css"></head>
<body><img src="/a.png" alt="A"></body></html>"#,
        cdn_authority
    );
    mount(&site, "/", "text/html", home).await;
    mount(&site, "/a.png", "image/png", vec![0x89, b'P', b'N', b'G']).await;
    mount(&cdn, "/s.css", "text/css", "body { color: red }").await;

    let output = TempDir::new().unwrap();
    let report = mirror(&format!("{}/", site.uri()), output.path(), 2).await;

    assert_eq!(report.pages_saved, 1);
    assert_eq!(report.assets_downloaded, 2);
    assert!(report.failed_urls.is_empty());

    let site_dir = host_dir(&site);
    let cdn_dir = host_dir(&cdn);
    assert!(output.path().join(&site_dir).join("a.png").exists());
    assert!(output.path().join(&cdn_dir).join("s.css").exists());

    let saved = fs::read_to_string(output.path().join(&site_dir).join("index.html")).unwrap();
    assert_eq!(attribute_values(&saved, "img", "src"), vec!["a.png"]);
    assert_eq!(
        attribute_values(&saved, "link", "href"),
        vec![format!("../{}/s.css", cdn_dir.display())]
    );
}

#[tokio::test]
async fn test_stylesheet_font_resolves_against_stylesheet() {
    let site = MockServer::start().await;

    mount(
        &site,
        "/",
        "text/html",
        r#"<html><head><link rel="stylesheet" href="/css/app.css"></head><body></body></html>"#,
    )
    .await;
    mount(
        &site,
        "/css/app.css",
        "text/css",
        "@font-face { font-family: F; src: url(../fonts/f.woff2) format('woff2'); }",
    )
    .await;
    mount(&site, "/fonts/f.woff2", "font/woff2", vec![0x77, 0x4f, 0x46, 0x32]).await;

    let output = TempDir::new().unwrap();
    let report = mirror(&format!("{}/", site.uri()), output.path(), 2).await;

    assert_eq!(report.assets_downloaded, 2);
    let site_dir = output.path().join(host_dir(&site));
    assert!(site_dir.join("fonts/f.woff2").exists());

    let css = fs::read_to_string(site_dir.join("css/app.css")).unwrap();
    assert!(css.contains("url(../fonts/f.woff2)"));

    let html = fs::read_to_string(site_dir.join("index.html")).unwrap();
    assert_eq!(attribute_values(&html, "link", "href"), vec!["css/app.css"]);
}

#[tokio::test]
async fn test_query_variants_saved_as_distinct_files() {
    let site = MockServer::start().await;

    mount(
        &site,
        "/",
        "text/html",
        r#"<img src="/img.jpg?w=100"><img src="/img.jpg?w=200">"#,
    )
    .await;
    for (width, body) in [("100", b"small".to_vec()), ("200", b"large".to_vec())] {
        Mock::given(method("GET"))
            .and(path("/img.jpg"))
            .and(query_param("w", width))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "image/jpeg"))
            .mount(&site)
            .await;
    }

    let output = TempDir::new().unwrap();
    let report = mirror(&format!("{}/", site.uri()), output.path(), 1).await;
    assert_eq!(report.assets_downloaded, 2);

    let site_dir = output.path().join(host_dir(&site));
    let html = fs::read_to_string(site_dir.join("index.html")).unwrap();
    let sources = attribute_values(&html, "img", "src");

    assert_eq!(sources.len(), 2);
    assert_ne!(sources[0], sources[1]);
    assert_eq!(fs::read(site_dir.join(&sources[0])).unwrap(), b"small");
    assert_eq!(fs::read(site_dir.join(&sources[1])).unwrap(), b"large");
}

#[tokio::test]
async fn test_depth_limit_is_a_hard_ceiling() {
    let site = MockServer::start().await;

    mount(&site, "/", "text/html", r#"<a href="/one">One</a><a href="/two">Two</a>"#).await;
    mount(&site, "/one", "text/html", r#"<a href="/two">Two</a>"#).await;
    mount(&site, "/two", "text/html", r#"<a href="/three">Three</a>"#).await;
    mount(&site, "/three", "text/html", "<p>too deep</p>").await;

    let output = TempDir::new().unwrap();
    let report = mirror(&format!("{}/", site.uri()), output.path(), 1).await;

    // /two is reachable at depth 1 directly from the seed and is visited once
    assert_eq!(report.pages_saved, 3);

    let site_dir = output.path().join(host_dir(&site));
    assert!(site_dir.join("one.html").exists());
    assert!(site_dir.join("two.html").exists());
    assert!(!site_dir.join("three.html").exists());

    let requests = site.received_requests().await.unwrap();
    let two = requests.iter().filter(|r| r.url.path() == "/two").count();
    let three = requests.iter().filter(|r| r.url.path() == "/three").count();
    assert_eq!(two, 1);
    assert_eq!(three, 0);

    let two_html = fs::read_to_string(site_dir.join("two.html")).unwrap();
    assert_eq!(attribute_values(&two_html, "a", "href"), vec!["/three"]);
}

#[tokio::test]
async fn test_failed_asset_keeps_remote_reference() {
    let site = MockServer::start().await;

    mount(
        &site,
        "/",
        "text/html",
        r#"<img src="/ok.png"><img src="/missing.png">"#,
    )
    .await;
    mount(&site, "/ok.png", "image/png", vec![1, 2, 3]).await;

    let output = TempDir::new().unwrap();
    let report = mirror(&format!("{}/", site.uri()), output.path(), 1).await;

    let missing = format!("{}/missing.png", site.uri());
    assert_eq!(report.assets_failed, 1);
    assert_eq!(report.failed_urls, vec![missing.clone()]);

    let site_dir = output.path().join(host_dir(&site));
    let html = fs::read_to_string(site_dir.join("index.html")).unwrap();
    assert_eq!(attribute_values(&html, "img", "src"), vec!["ok.png", "/missing.png"]);
    assert!(html.contains(r#"<img src="/missing.png">"#));

    let log = fs::read_to_string(output.path().join(FAILED_LOG)).unwrap();
    assert_eq!(log, format!("{}\n", missing));
}

#[tokio::test]
async fn test_root_index_redirects_to_seed() {
    let site = MockServer::start().await;
    mount(&site, "/", "text/html", "<h1>Home</h1>").await;

    let output = TempDir::new().unwrap();
    let report = mirror(&format!("{}/", site.uri()), output.path(), 0).await;

    let index = output.path().join(ROOT_INDEX);
    assert_eq!(report.root_index.as_deref(), Some(index.as_path()));

    let redirect = fs::read_to_string(index).unwrap();
    let target = format!("{}/index.html", host_dir(&site).display());
    assert!(redirect.contains(&format!("url={}", target)));
    assert!(output.path().join(target).exists());
    assert!(!output.path().join(FAILED_LOG).exists());
}

#[tokio::test]
async fn test_second_run_produces_identical_output() {
    let site = MockServer::start().await;

    mount(
        &site,
        "/",
        "text/html",
        r#"<link rel="stylesheet" href="/s.css"><img src="/a.png?v=2"><a href="/about">About</a>"#,
    )
    .await;
    mount(&site, "/about", "text/html", r#"<a href="/">Home</a>"#).await;
    mount(&site, "/s.css", "text/css", "body { background: url(/bg.png) }").await;
    mount(&site, "/a.png", "image/png", vec![1]).await;
    mount(&site, "/bg.png", "image/png", vec![2]).await;

    let output = TempDir::new().unwrap();
    let seed = format!("{}/", site.uri());

    mirror(&seed, output.path(), 3).await;
    let first = snapshot(output.path());

    mirror(&seed, output.path(), 3).await;
    let second = snapshot(output.path());

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_every_rewritten_reference_exists_on_disk() {
    let site = MockServer::start().await;

    mount(
        &site,
        "/blog/post",
        "text/html",
        r#"<html><head><link rel="icon" href="/favicon.ico"></head><body>
<img src="../img/a b.png"><img srcset="/img/s.jpg 1x, /img/l.jpg 2x">
<div style="background-image: url('/img/bg.gif')"></div></body></html>"#,
    )
    .await;
    mount(&site, "/favicon.ico", "image/x-icon", vec![0]).await;
    // wiremock matches the percent-encoded request path
    mount(&site, "/img/a%20b.png", "image/png", vec![1]).await;
    mount(&site, "/img/s.jpg", "image/jpeg", vec![2]).await;
    mount(&site, "/img/l.jpg", "image/jpeg", vec![3]).await;
    mount(&site, "/img/bg.gif", "image/gif", vec![4]).await;

    let output = TempDir::new().unwrap();
    let report = mirror(&format!("{}/blog/post", site.uri()), output.path(), 0).await;
    assert_eq!(report.assets_downloaded, 5);
    assert!(report.failed_urls.is_empty());

    let page_dir = output.path().join(host_dir(&site)).join("blog");
    let html = fs::read_to_string(page_dir.join("post.html")).unwrap();
    assert!(!html.contains("http://"));

    let mut references = attribute_values(&html, "img[src]", "src");
    references.extend(attribute_values(&html, "link", "href"));
    for srcset in attribute_values(&html, "img[srcset]", "srcset") {
        references.extend(
            srcset
                .split(',')
                .filter_map(|candidate| candidate.split_whitespace().next())
                .map(str::to_string),
        );
    }
    references.push("../img/bg.gif".to_string());
    assert!(html.contains("url('../img/bg.gif')"));

    assert_eq!(references.len(), 5);
    for reference in references {
        let decoded = urlencoding::decode(&reference).unwrap().into_owned();
        assert!(
            page_dir.join(&decoded).exists(),
            "{} does not exist on disk",
            reference
        );
    }
}

/// Every file under `root` with its contents, sorted by path
fn snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    let mut dirs = vec![root.to_path_buf()];

    while let Some(dir) = dirs.pop() {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                dirs.push(path);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
                files.push((relative, fs::read(&path).unwrap()));
            }
        }
    }

    files.sort();
    files
}
