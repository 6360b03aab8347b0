//! Output module for the on-disk mirror
//!
//! This module handles:
//! - Writing fetched resources under the output root
//! - The root redirect page and the failed URL log
//! - Run statistics

pub mod layout;
pub mod stats;
mod writer;

pub use layout::{write_failed_log, write_root_redirect, FAILED_LOG, ROOT_INDEX};
pub use stats::{print_report, MirrorReport};
pub use writer::SiteWriter;
