//! Crawl frontier for page URLs
//!
//! This module handles:
//! - Breadth-first ordering of page URLs
//! - The depth ceiling (pages beyond it are never enqueued)
//! - The visited-set and the "fetched at most once" guarantee
//! - Per-page state transitions

use crate::state::PageState;
use crate::url::NormalizedUrl;
use crate::MirrorError;
use std::collections::{HashMap, VecDeque};

/// A page URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedPage {
    pub url: NormalizedUrl,

    /// Number of link hops from the seed
    pub depth: u32,
}

impl QueuedPage {
    /// Depth of the pages this page links to
    pub fn child_depth(&self) -> u32 {
        self.depth.saturating_add(1)
    }
}

/// Breadth-first frontier over page URLs
///
/// Every URL the frontier has ever accepted has an entry in `states`, so the
/// check-and-insert in [`CrawlFrontier::enqueue`] is the single point that
/// decides whether a page will ever be fetched. Because the queue is FIFO and
/// depths are assigned at first discovery, a page reachable by several paths
/// keeps its shallowest depth.
#[derive(Debug)]
pub struct CrawlFrontier {
    queue: VecDeque<QueuedPage>,
    states: HashMap<NormalizedUrl, PageState>,
    max_depth: u32,
}

impl CrawlFrontier {
    /// Creates a frontier seeded with one URL at depth 0
    pub fn new(seed: NormalizedUrl, max_depth: u32) -> Self {
        let mut frontier = Self {
            queue: VecDeque::new(),
            states: HashMap::new(),
            max_depth,
        };
        frontier.enqueue(seed, 0);
        frontier
    }

    /// Adds a page if it is new and within the depth ceiling
    ///
    /// Returns `true` if the page was queued. Known URLs and URLs beyond the
    /// maximum depth are silently discarded; a discarded over-depth URL leaves
    /// no trace, so it can still be queued later from a shallower page.
    pub fn enqueue(&mut self, url: NormalizedUrl, depth: u32) -> bool {
        if depth > self.max_depth || self.states.contains_key(&url) {
            return false;
        }

        self.states.insert(url.clone(), PageState::Queued);
        self.queue.push_back(QueuedPage { url, depth });
        true
    }

    /// Pops the next page and moves it to `Fetching`
    pub fn next_page(&mut self) -> Option<QueuedPage> {
        while let Some(page) = self.queue.pop_front() {
            match self.states.get_mut(&page.url) {
                Some(state) if *state == PageState::Queued => {
                    *state = PageState::Fetching;
                    return Some(page);
                }
                _ => continue,
            }
        }
        None
    }

    /// Records that a page was saved as HTML
    pub fn mark_saved(&mut self, url: &NormalizedUrl) -> Result<(), MirrorError> {
        self.transition(url, PageState::Saved)
    }

    /// Records that a page failed or turned out not to be HTML
    pub fn mark_failed(&mut self, url: &NormalizedUrl) -> Result<(), MirrorError> {
        self.transition(url, PageState::Failed)
    }

    fn transition(&mut self, url: &NormalizedUrl, to: PageState) -> Result<(), MirrorError> {
        let state = self
            .states
            .get_mut(url)
            .ok_or_else(|| MirrorError::InvalidTransition {
                url: url.to_string(),
                from: PageState::Queued,
                to,
            })?;

        if !state.can_transition_to(to) {
            return Err(MirrorError::InvalidTransition {
                url: url.to_string(),
                from: *state,
                to,
            });
        }

        *state = to;
        Ok(())
    }

    pub fn state(&self, url: &NormalizedUrl) -> Option<PageState> {
        self.states.get(url).copied()
    }

    /// Number of pages still waiting
    pub fn frontier_size(&self) -> usize {
        self.queue.len()
    }

    /// URLs that ended in a given state
    pub fn in_state(&self, wanted: PageState) -> impl Iterator<Item = &NormalizedUrl> {
        self.states
            .iter()
            .filter(move |(_, state)| **state == wanted)
            .map(|(url, _)| url)
    }
}
