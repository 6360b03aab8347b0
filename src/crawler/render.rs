//! Render-capable fetching
//!
//! Pages are materialized by a [`Renderer`] (a headless browser that runs the
//! page's JavaScript and returns the final DOM); assets still go through the
//! plain HTTP fetcher.

use crate::config::FetchConfig;
use crate::crawler::fetcher::{Body, FetchError, FetchedResource, Fetcher};
use crate::url::{NormalizedUrl, ResourceKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Placeholder replaced with the page URL in the renderer command line
const URL_PLACEHOLDER: &str = "{url}";

/// Abstract `render(url) -> final HTML` capability
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &NormalizedUrl) -> Result<String, FetchError>;
}

/// Runs an external headless browser and captures its stdout
///
/// The default command is `chromium --headless --disable-gpu --dump-dom {url}`.
/// If no argument contains `{url}`, the URL is appended as the last argument.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandRenderer {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.render_command.clone(),
            Duration::from_secs(config.render_timeout_secs),
        )
    }

    /// Builds the argument list for a URL
    fn arguments(&self, url: &NormalizedUrl) -> Vec<String> {
        let mut args: Vec<String> = self
            .argv
            .iter()
            .skip(1)
            .map(|arg| arg.replace(URL_PLACEHOLDER, url.as_str()))
            .collect();

        if !self.argv.iter().any(|arg| arg.contains(URL_PLACEHOLDER)) {
            args.push(url.to_string());
        }
        args
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    async fn render(&self, url: &NormalizedUrl) -> Result<String, FetchError> {
        let render_error = |message: String| FetchError::Render {
            url: url.to_string(),
            message,
        };

        let program = self
            .argv
            .first()
            .ok_or_else(|| render_error("empty render command".to_string()))?;

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(program)
                .args(self.arguments(url))
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| FetchError::Timeout {
            url: url.to_string(),
        })?
        .map_err(|e| render_error(format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(render_error(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        let html = String::from_utf8_lossy(&output.stdout).into_owned();
        if html.trim().is_empty() {
            return Err(render_error("renderer produced no output".to_string()));
        }
        Ok(html)
    }
}

/// Fetcher that renders pages and downloads assets over HTTP
pub struct RenderingFetcher {
    assets: Arc<dyn Fetcher>,
    renderer: Arc<dyn Renderer>,
}

impl RenderingFetcher {
    pub fn new(assets: Arc<dyn Fetcher>, renderer: Arc<dyn Renderer>) -> Self {
        Self { assets, renderer }
    }
}

#[async_trait]
impl Fetcher for RenderingFetcher {
    async fn fetch(
        &self,
        url: &NormalizedUrl,
        kind: ResourceKind,
    ) -> Result<FetchedResource, FetchError> {
        match kind {
            ResourceKind::Page => {
                let html = self.renderer.render(url).await?;
                Ok(FetchedResource {
                    final_url: url.as_url().clone(),
                    status: 200,
                    content_type: Some("text/html; charset=utf-8".to_string()),
                    body: Body::Text(html),
                })
            }
            ResourceKind::Asset => self.assets.fetch(url, kind).await,
        }
    }
}
