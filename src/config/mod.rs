//! Configuration module for site-mirror
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, and command-line flags are applied on top of the
//! loaded values before a final validation pass.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirroring {} to depth {}", config.crawler.target_url, config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FetchConfig, FetchMode, OutputConfig, ResolverConfig,
    DEFAULT_TARGET_URL, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
