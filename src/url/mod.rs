//! URL handling module for Contact-Harvester
//!
//! This module provides URL normalization, host extraction, the domain-unit
//! membership test that scopes a crawl, and the host/scheme variants used by
//! the fetch fallback ladder.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{
    domain_unit, extract_domain, is_bare_host, same_domain_unit, same_host, strip_www,
    toggle_scheme, toggle_www,
};
pub use normalize::normalize_url;
