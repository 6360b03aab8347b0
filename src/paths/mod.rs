//! Local path mapping
//!
//! # Components
//!
//! - `local_path`: pure URL → relative file path mapping
//! - `PathTable`: the record of which URL was saved where
//! - `content_type`: media-type helpers used when choosing extensions

pub mod content_type;
mod mapper;
mod table;

pub use mapper::{host_directory, local_path, short_hash, ASSET_EXTENSIONS};
pub use table::PathTable;
