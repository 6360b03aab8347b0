use crate::crawler::FetchedResource;
use crate::paths::{local_path, PathTable};
use crate::url::NormalizedUrl;
use crate::MirrorError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the probe file written when checking the output root
const PROBE_FILE: &str = ".site-mirror-write-test";

/// Writes mirrored files under the output root
///
/// All paths handled by the writer are relative to the root, exactly as the
/// path mapper produces them and the path table stores them.
#[derive(Debug, Clone)]
pub struct SiteWriter {
    root: PathBuf,
}

impl SiteWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative output path
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Creates the output root and checks that it accepts writes
    ///
    /// This is the only fatal check of a run: if it fails nothing can be saved.
    pub fn ensure_root(&self) -> Result<(), MirrorError> {
        let unavailable = |source: io::Error| MirrorError::OutputUnavailable {
            path: self.root.clone(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(unavailable)?;

        let probe = self.root.join(PROBE_FILE);
        fs::write(&probe, b"ok").map_err(unavailable)?;
        fs::remove_file(&probe).map_err(unavailable)?;
        Ok(())
    }

    /// Writes bytes to a relative path, creating parent directories
    pub fn write(&self, relative: &Path, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.absolute(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Reads a saved file as text, replacing invalid UTF-8
    pub fn read_text(&self, relative: &Path) -> io::Result<String> {
        let bytes = fs::read(self.absolute(relative))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn exists(&self, relative: &Path) -> bool {
        self.absolute(relative).exists()
    }

    /// Saves a fetched resource under its URL's mapped path and records it
    ///
    /// Text bodies are written as UTF-8 and binary bodies byte-for-byte. The
    /// path table entry is only created once the write succeeded, so a failed
    /// write leaves the URL unmapped and its references pointing at the
    /// original remote address.
    ///
    /// # Returns
    ///
    /// The path, relative to the output root, the resource now lives at.
    pub fn persist(
        &self,
        table: &mut PathTable,
        url: &NormalizedUrl,
        resource: &FetchedResource,
    ) -> io::Result<PathBuf> {
        let candidate = local_path(url, Some(resource.effective_content_type()));
        let relative = table.resolve(url, candidate);

        self.write(&relative, resource.body.as_bytes())?;
        table.record(url.clone(), relative.clone());

        tracing::debug!("Saved {} -> {}", url, relative.display());
        Ok(relative)
    }
}
