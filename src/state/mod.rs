//! State module for tracking mirror progress
//!
//! # Components
//!
//! - `PageState`: per-page state machine used by the crawl frontier
//! - `AssetState` / `AssetSet`: per-asset resolution state used by the asset pipeline

mod asset_set;
mod page_state;

// Re-export main types
pub use asset_set::{AssetSet, AssetState};
pub use page_state::PageState;
