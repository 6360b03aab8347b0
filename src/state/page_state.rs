/// Page state definitions for tracking crawl progress
///
/// Every page URL moves through `Queued → Fetching → {Saved, Failed}` exactly once.
use std::fmt;

/// Represents the current state of a page in the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Page is in the frontier waiting to be fetched
    Queued,

    /// Page has been popped and is being fetched
    Fetching,

    // ===== Terminal States =====
    /// Page was fetched as HTML and written to disk
    Saved,

    /// Page fetch failed permanently, or the response was not HTML and was
    /// handed over to the asset set instead
    Failed,
}

impl PageState {
    /// Checks whether moving from this state to `next` is allowed
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Fetching)
                | (Self::Fetching, Self::Saved)
                | (Self::Fetching, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Saved => "saved",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
