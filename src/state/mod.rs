//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `SharedState`: run-scoped state shared by every worker (visited set, robots cache)
//! - `VisitedSet`: the dispatch gate; a URL enters it at most once per run
//! - `FailureBreaker`: per-seed consecutive-failure counter

mod breaker;
mod visited;

pub use breaker::{BatchTally, FailureBreaker};
pub use visited::VisitedSet;

use crate::robots::RobotsCache;

/// State shared between the orchestrator and all workers for one run
///
/// Each member guards itself with a mutex; nothing here is global.
#[derive(Debug, Default)]
pub struct SharedState {
    pub visited: VisitedSet,
    pub robots: RobotsCache,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }
}
