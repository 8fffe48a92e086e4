//! Crawler module for page fetching and processing
//!
//! This module contains the core harvesting logic, including:
//! - The HTTP client seam and the fetch fallback ladder
//! - HTML parsing, link discovery and tier classification
//! - The tiered frontier
//! - Headless rendering of script-built pages
//! - Per-seed crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod http;
mod links;
mod parser;
mod render;

pub use coordinator::{run_harvest, Coordinator, HarvestSummary, SeedSummary, StopReason};
pub use fetcher::{
    backoff_delay, charset_from_content_type, decode_body, FetchResult, FetchStatus, FetchedPage,
    Fetcher,
};
pub use frontier::{CrawlTask, Frontier, Tier};
pub use http::{is_name_resolution_failure, FetchError, HttpClient, HttpResponse, ReqwestClient, Timeouts};
pub use links::LinkClassifier;
pub use parser::{
    collapse_whitespace, element_text, extract_title, parse_document, parse_html, resolve_link,
    visible_text, Anchor, ParsedPage,
};
#[cfg(feature = "render")]
pub use render::ChromiumRenderer;
pub use render::{needs_render, RenderError, Renderer};
