//! Configuration module for Contact-Harvester
//!
//! This module handles loading, parsing, and validating the TOML configuration
//! file and the newline-delimited seed list.
//!
//! # Example
//!
//! ```no_run
//! use contact_harvester::config::{load_config, load_seeds};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! let seeds = load_seeds(Path::new(&config.output.seeds_path)).unwrap();
//! println!("{} seeds, {} pages each", seeds.len(), config.crawler.max_pages_per_seed);
//! ```

mod parser;
mod seeds;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClassifierConfig, Config, CrawlerConfig, ExtractionConfig, LinkConfig, OutputConfig,
    RenderConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use seeds::{load_seeds, parse_seeds};
pub use validation::validate;
