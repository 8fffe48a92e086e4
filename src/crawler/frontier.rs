//! Tiered crawl frontier
//!
//! This module handles:
//! - One FIFO queue per link tier, drained highest tier first
//! - Front insertion for pagination links
//! - Deduplication against URLs already queued

use std::collections::{HashSet, VecDeque};
use std::fmt;
use url::Url;

/// Priority class of a discovered link, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Contact,
    Pagination,
    PersonalName,
    Topical,
    Subdomain,
    Generic,
    Unclassified,
}

impl Tier {
    /// All tiers in dequeue order
    pub const ALL: [Tier; 7] = [
        Tier::Contact,
        Tier::Pagination,
        Tier::PersonalName,
        Tier::Topical,
        Tier::Subdomain,
        Tier::Generic,
        Tier::Unclassified,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Contact => "contact",
            Tier::Pagination => "pagination",
            Tier::PersonalName => "personal_name",
            Tier::Topical => "topical",
            Tier::Subdomain => "subdomain",
            Tier::Generic => "generic",
            Tier::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Normalized URL
    pub url: Url,

    pub tier: Tier,

    /// Page the link was found on; `None` for seeds and probes
    pub source: Option<Url>,
}

impl CrawlTask {
    pub fn new(url: Url, tier: Tier, source: Option<Url>) -> Self {
        Self { url, tier, source }
    }

    /// A seed task, queued as contact so it is fetched first
    pub fn seed(url: Url) -> Self {
        Self::new(url, Tier::Contact, None)
    }
}

/// Tiered queue of crawl tasks for one seed
#[derive(Debug, Default)]
pub struct Frontier {
    queues: [VecDeque<CrawlTask>; 7],
    queued: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task
    ///
    /// Pagination tasks go to the front of their tier, everything else to
    /// the back.
    ///
    /// # Returns
    ///
    /// `false` when the URL is already queued
    pub fn push(&mut self, task: CrawlTask) -> bool {
        if !self.queued.insert(task.url.as_str().to_string()) {
            return false;
        }
        let queue = &mut self.queues[task.tier.index()];
        if task.tier == Tier::Pagination {
            queue.push_front(task);
        } else {
            queue.push_back(task);
        }
        true
    }

    /// Adds the tasks discovered by one page
    ///
    /// Pagination tasks keep their discovery order ahead of anything already
    /// in the pagination tier.
    ///
    /// # Returns
    ///
    /// The number of tasks actually queued
    pub fn extend(&mut self, tasks: Vec<CrawlTask>) -> usize {
        let (pagination, rest): (Vec<_>, Vec<_>) = tasks
            .into_iter()
            .partition(|task| task.tier == Tier::Pagination);

        let mut added = 0;
        for task in pagination.into_iter().rev() {
            if self.push(task) {
                added += 1;
            }
        }
        for task in rest {
            if self.push(task) {
                added += 1;
            }
        }
        added
    }

    /// Removes the task from the highest non-empty tier
    pub fn pop(&mut self) -> Option<CrawlTask> {
        let task = self.queues.iter_mut().find_map(|queue| queue.pop_front())?;
        self.queued.remove(task.url.as_str());
        Some(task)
    }

    /// Removes up to `n` tasks in tier order
    pub fn pop_batch(&mut self, n: usize) -> Vec<CrawlTask> {
        std::iter::from_fn(|| self.pop()).take(n).collect()
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.queued.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }

    /// Number of queued tasks in one tier
    pub fn tier_len(&self, tier: Tier) -> usize {
        self.queues[tier.index()].len()
    }
}
