use crate::url::NormalizedUrl;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Lifecycle of a single asset URL
///
/// `Pending → Claimed → {Downloaded, Failed}`; the two terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetState {
    /// Discovered, waiting for a worker
    Pending,
    /// Handed to a worker, result not yet known
    Claimed,
    /// Saved to disk and registered in the path table
    Downloaded,
    /// Permanently failed (HTTP 403/404, retries exhausted, or write failure)
    Failed,
}

impl AssetState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Downloaded | Self::Failed)
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Downloaded => "downloaded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Growing set of asset URLs with their resolution state
///
/// Re-adding a URL that is already known, in any state, is a no-op. The set is
/// owned by a single pipeline loop, so "claim a URL" is a plain `&mut self`
/// operation and can never hand the same URL to two workers.
#[derive(Debug, Default)]
pub struct AssetSet {
    states: HashMap<NormalizedUrl, AssetState>,
    pending: VecDeque<NormalizedUrl>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a newly discovered asset
    ///
    /// Returns `true` if the URL was not known before.
    pub fn add(&mut self, url: NormalizedUrl) -> bool {
        if self.states.contains_key(&url) {
            return false;
        }

        self.states.insert(url.clone(), AssetState::Pending);
        self.pending.push_back(url);
        true
    }

    /// Adds several assets, returning how many were new
    pub fn extend<I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = NormalizedUrl>,
    {
        urls.into_iter().filter(|url| self.add(url.clone())).count()
    }

    /// Claims the next pending URL for processing
    pub fn claim_next(&mut self) -> Option<NormalizedUrl> {
        while let Some(url) = self.pending.pop_front() {
            if let Some(state) = self.states.get_mut(&url) {
                if *state == AssetState::Pending {
                    *state = AssetState::Claimed;
                    return Some(url);
                }
            }
        }
        None
    }

    /// Records the outcome of a claimed URL
    ///
    /// Returns `false` (and changes nothing) if the URL was not claimed.
    pub fn complete(&mut self, url: &NormalizedUrl, downloaded: bool) -> bool {
        match self.states.get_mut(url) {
            Some(state) if *state == AssetState::Claimed => {
                *state = if downloaded {
                    AssetState::Downloaded
                } else {
                    AssetState::Failed
                };
                true
            }
            _ => false,
        }
    }

    /// Marks a URL as downloaded without going through a worker
    ///
    /// Used when a page fetch turned out to be a non-HTML resource that was
    /// saved on the spot. Resolved URLs are left alone.
    pub fn record_downloaded(&mut self, url: NormalizedUrl) -> bool {
        match self.states.get(&url) {
            Some(state) if state.is_resolved() => false,
            _ => {
                self.states.insert(url, AssetState::Downloaded);
                true
            }
        }
    }

    /// Marks a URL as failed without going through a worker
    ///
    /// Used when the URL already failed as a page, so a later asset discovery
    /// of the same URL does not fetch it again. Resolved URLs are left alone.
    pub fn record_failed(&mut self, url: NormalizedUrl) -> bool {
        match self.states.get(&url) {
            Some(state) if state.is_resolved() => false,
            _ => {
                self.states.insert(url, AssetState::Failed);
                true
            }
        }
    }

    pub fn state(&self, url: &NormalizedUrl) -> Option<AssetState> {
        self.states.get(url).copied()
    }

    pub fn contains(&self, url: &NormalizedUrl) -> bool {
        self.states.contains_key(url)
    }

    /// Number of URLs still waiting to be claimed
    pub fn pending_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| **s == AssetState::Pending)
            .count()
    }

    /// True once every known URL is resolved
    pub fn is_drained(&self) -> bool {
        self.states.values().all(AssetState::is_resolved)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Iterates URLs in a given state
    pub fn in_state(&self, wanted: AssetState) -> impl Iterator<Item = &NormalizedUrl> {
        self.states
            .iter()
            .filter(move |(_, state)| **state == wanted)
            .map(|(url, _)| url)
    }
}
