use crate::paths::mapper::{inject_suffix, short_hash};
use crate::url::NormalizedUrl;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Mapping from every successfully saved URL to its file under the output root
///
/// An entry is recorded only after the file has been written, and is never
/// replaced afterwards. No two URLs share a path: a candidate path that is
/// already owned by a different URL is disambiguated with a hash of the full
/// URL before anything is written.
#[derive(Debug, Default, Clone)]
pub struct PathTable {
    by_url: BTreeMap<NormalizedUrl, PathBuf>,
    owners: HashMap<PathBuf, NormalizedUrl>,
}

impl PathTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the path `url` should be written to
    ///
    /// Returns the already recorded path if the URL is known. Otherwise returns
    /// `candidate`, or a disambiguated variant of it when another URL owns it.
    /// Nothing is recorded; call [`PathTable::record`] once the write succeeded.
    pub fn resolve(&self, url: &NormalizedUrl, candidate: PathBuf) -> PathBuf {
        if let Some(existing) = self.by_url.get(url) {
            return existing.clone();
        }

        match self.owners.get(&candidate) {
            Some(owner) if owner != url => disambiguate(&candidate, url),
            _ => candidate,
        }
    }

    /// Records a written file
    ///
    /// The first recorded path for a URL wins. Returns `false` if the URL
    /// already had an entry.
    pub fn record(&mut self, url: NormalizedUrl, path: PathBuf) -> bool {
        if self.by_url.contains_key(&url) {
            return false;
        }

        self.owners.insert(path.clone(), url.clone());
        self.by_url.insert(url, path);
        true
    }

    pub fn get(&self, url: &NormalizedUrl) -> Option<&Path> {
        self.by_url.get(url).map(PathBuf::as_path)
    }

    pub fn contains(&self, url: &NormalizedUrl) -> bool {
        self.by_url.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }

    /// Iterates entries in URL order
    pub fn iter(&self) -> impl Iterator<Item = (&NormalizedUrl, &Path)> {
        self.by_url.iter().map(|(url, path)| (url, path.as_path()))
    }
}

fn disambiguate(candidate: &Path, url: &NormalizedUrl) -> PathBuf {
    let file_name = candidate
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let renamed = inject_suffix(&file_name, &short_hash(url.as_str()));
    candidate.with_file_name(renamed)
}
