//! Crawler coordinator - main harvest orchestration logic
//!
//! This module contains the per-seed crawl loop that coordinates:
//! - Dequeuing batches from the tiered frontier
//! - Running robots checks, fetches, extraction and link discovery concurrently
//! - Merging batch results back into the frontier
//! - Persisting raw occurrences as each seed finishes
//! - Rebuilding the canonical table at the end of the run

use crate::config::Config;
use crate::crawler::fetcher::{FetchResult, FetchStatus, FetchedPage, Fetcher};
use crate::crawler::frontier::{CrawlTask, Frontier};
use crate::crawler::http::{HttpClient, ReqwestClient, Timeouts};
use crate::crawler::links::LinkClassifier;
use crate::crawler::parser::{parse_document, ParsedPage};
use crate::crawler::render::{needs_render, Renderer};
use crate::extract::{ExtractedIdentifier, IdentifierClassifier, IdentifierExtractor, SourceType};
use crate::robots::{ensure_policy, robots_path, HostPolicy};
use crate::state::{BatchTally, FailureBreaker, SharedState};
use crate::storage::{rebuild_canonical, RawRecord, RebuildSummary, RunStatus, SqliteStorage, Storage};
use crate::HarvestError;
use chrono::{SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use scraper::Html;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

/// Why the crawl of a seed ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BudgetReached,
    FrontierEmpty,
    QueueCeiling,
    FailureThreshold,
}

/// Outcome of crawling one seed
#[derive(Debug, Clone)]
pub struct SeedSummary {
    pub seed: Url,
    /// Pages fetched successfully
    pub pages_fetched: usize,
    /// Transient and fatal-host failures
    pub failures: usize,
    /// Accepted identifier occurrences
    pub identifiers: usize,
    pub stop_reason: StopReason,
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub run_id: i64,
    pub seeds: Vec<SeedSummary>,
    /// Seeds whose crawl ended with an error
    pub failed_seeds: usize,
    /// Raw rows written during this run
    pub raw_written: usize,
    pub rebuild: RebuildSummary,
}

/// Result of one unit of work
struct TaskResult {
    /// `None` when robots.txt disallowed the URL
    status: Option<FetchStatus>,
    records: Vec<RawRecord>,
    links: Vec<CrawlTask>,
}

impl TaskResult {
    fn skipped() -> Self {
        Self {
            status: None,
            records: Vec::new(),
            links: Vec::new(),
        }
    }

    fn failed(status: FetchStatus) -> Self {
        Self {
            status: Some(status),
            records: Vec::new(),
            links: Vec::new(),
        }
    }
}

/// Main harvest coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    state: SharedState,
    client: Arc<dyn HttpClient>,
    fetcher: Fetcher,
    renderer: Option<Arc<dyn Renderer>>,
    extractor: IdentifierExtractor,
    classifier: IdentifierClassifier,
    links: LinkClassifier,
    run_id: i64,
    agent: String,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Opens the database named in the configuration, builds the HTTP client
    /// and, when enabled, the headless renderer, and opens a new run.
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `config_hash` - Hash of the configuration file, stored on the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Failed to initialize
    pub fn new(config: Config, config_hash: &str) -> Result<Self, HarvestError> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        let client: Arc<dyn HttpClient> =
            Arc::new(ReqwestClient::new(&config.user_agent, &config.crawler)?);
        let renderer = build_renderer(&config);
        Self::with_components(config, storage, client, renderer, config_hash)
    }

    /// Creates a coordinator from already built collaborators
    pub fn with_components(
        config: Config,
        mut storage: SqliteStorage,
        client: Arc<dyn HttpClient>,
        renderer: Option<Arc<dyn Renderer>>,
        config_hash: &str,
    ) -> Result<Self, HarvestError> {
        let run_id = storage.create_run(config_hash)?;
        let extractor = IdentifierExtractor::new(&config.extraction)?;
        let classifier = IdentifierClassifier::new(config.classifier.clone());
        let links = LinkClassifier::new(&config);
        let fetcher = Fetcher::new(client.clone(), &config.crawler);
        let agent = config.user_agent.crawler_name.clone();

        Ok(Self {
            config: Arc::new(config),
            storage: Arc::new(Mutex::new(storage)),
            state: SharedState::new(),
            client,
            fetcher,
            renderer,
            extractor,
            classifier,
            links,
            run_id,
            agent,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Shared handle to the storage backend
    pub fn storage(&self) -> Arc<Mutex<SqliteStorage>> {
        self.storage.clone()
    }

    fn lock_storage(&self) -> Result<MutexGuard<'_, SqliteStorage>, HarvestError> {
        self.storage
            .lock()
            .map_err(|_| HarvestError::LockPoisoned("storage"))
    }

    /// Runs the harvest over every seed
    ///
    /// This method:
    /// 1. Crawls the seeds one after another
    /// 2. Appends each seed's occurrences to the raw log when it finishes
    /// 3. Rebuilds the canonical table once all seeds are done
    /// 4. Marks the run completed (or failed when the rebuild fails)
    ///
    /// A failing seed is logged and skipped; only the rebuild can fail the run.
    pub async fn run(&self, seeds: &[Url]) -> Result<HarvestSummary, HarvestError> {
        tracing::info!(
            "Starting harvest run {} over {} seed(s)",
            self.run_id,
            seeds.len()
        );
        let start_time = std::time::Instant::now();

        let mut summaries = Vec::new();
        let mut failed_seeds = 0;
        let mut raw_written = 0;

        for (index, seed) in seeds.iter().enumerate() {
            tracing::info!("Seed {}/{}: {}", index + 1, seeds.len(), seed);
            match self.crawl_seed(seed).await {
                Ok((summary, records)) => {
                    tracing::info!(
                        "Finished {}: {} pages, {} identifiers, stopped by {:?}",
                        seed,
                        summary.pages_fetched,
                        summary.identifiers,
                        summary.stop_reason
                    );
                    raw_written += self.persist(&records);
                    summaries.push(summary);
                }
                Err(e) => {
                    tracing::error!("Error crawling seed {}: {}", seed, e);
                    failed_seeds += 1;
                }
            }
        }

        if let Some(renderer) = &self.renderer {
            renderer.shutdown().await;
        }

        let rebuild = {
            let mut storage = self.lock_storage()?;
            match rebuild_canonical(&mut *storage, &self.classifier) {
                Ok(summary) => {
                    storage.complete_run(self.run_id)?;
                    summary
                }
                Err(e) => {
                    tracing::error!("Canonical rebuild failed: {}", e);
                    storage.finish_run(self.run_id, RunStatus::Failed)?;
                    return Err(e.into());
                }
            }
        };

        tracing::info!(
            "Harvest run {} completed in {:?}: {} seed(s), {} failed, {} occurrences written",
            self.run_id,
            start_time.elapsed(),
            seeds.len(),
            failed_seeds,
            raw_written
        );

        Ok(HarvestSummary {
            run_id: self.run_id,
            seeds: summaries,
            failed_seeds,
            raw_written,
            rebuild,
        })
    }

    /// Appends records to the raw log; failures are logged, not raised
    fn persist(&self, records: &[RawRecord]) -> usize {
        if records.is_empty() {
            return 0;
        }
        let written = self
            .lock_storage()
            .and_then(|mut storage| Ok(storage.append_raw(records)?));
        match written {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Failed to write {} raw records: {}", records.len(), e);
                0
            }
        }
    }

    /// Crawls one seed until a termination condition holds
    ///
    /// Termination conditions, checked before every batch:
    /// - the page budget is spent
    /// - the failure breaker tripped
    /// - the frontier grew past its ceiling
    /// - the frontier is empty
    pub async fn crawl_seed(
        &self,
        seed: &Url,
    ) -> Result<(SeedSummary, Vec<RawRecord>), HarvestError> {
        let crawler = &self.config.crawler;
        let pool = crawler.worker_pool_size.max(1) as usize;
        let budget = crawler.max_pages_per_seed as usize;
        let ceiling = crawler.queue_ceiling();

        let mut frontier = Frontier::new();
        frontier.push(CrawlTask::seed(seed.clone()));
        let mut breaker = FailureBreaker::new(crawler.max_consecutive_failures);
        let mut probed = false;

        let mut pages_fetched = 0;
        let mut failures = 0;
        let mut records = Vec::new();

        let stop_reason = loop {
            if pages_fetched >= budget {
                break StopReason::BudgetReached;
            }
            if breaker.is_tripped() {
                tracing::warn!(
                    "{} consecutive failures, stopping crawl of {}",
                    breaker.consecutive(),
                    seed
                );
                break StopReason::FailureThreshold;
            }
            if frontier.len() > ceiling {
                tracing::warn!(
                    "Frontier exceeded {} entries, stopping crawl of {}",
                    ceiling,
                    seed
                );
                break StopReason::QueueCeiling;
            }

            let candidates = frontier.pop_batch(pool.min(budget - pages_fetched));
            if candidates.is_empty() {
                break StopReason::FrontierEmpty;
            }
            let claimed = self.state.visited.claim_all(candidates.iter().map(|t| &t.url))?;
            let batch: Vec<CrawlTask> = claimed
                .into_iter()
                .map(|i| candidates[i].clone())
                .collect();
            if batch.is_empty() {
                continue;
            }

            tracing::debug!("Dispatching batch of {} for {}", batch.len(), seed);
            let mut results: Vec<(usize, TaskResult)> = stream::iter(batch.into_iter().enumerate())
                .map(|(i, task)| async move { (i, self.process_task(task, seed).await) })
                .buffer_unordered(pool)
                .collect()
                .await;
            // Merge in dispatch order
            results.sort_by_key(|(i, _)| *i);

            let mut tally = BatchTally::default();
            let mut discovered = Vec::new();
            for (_, result) in results {
                tally.record(result.status);
                records.extend(result.records);
                discovered.extend(result.links);
            }
            pages_fetched += tally.successes as usize;
            failures += tally.failures as usize;
            breaker.observe(&tally);

            let fresh: Vec<CrawlTask> = discovered
                .into_iter()
                .filter(|task| !self.state.visited.contains(&task.url))
                .collect();
            let added = frontier.extend(fresh);
            tracing::debug!(
                "Batch done for {}: {} ok, {} failed, {} new links, {} queued",
                seed,
                tally.successes,
                tally.failures,
                added,
                frontier.len()
            );

            // Probes follow the first batch, and only when the seed answered
            if !probed {
                probed = true;
                if tally.successes > 0 {
                    let probes: Vec<CrawlTask> = self
                        .links
                        .probe_tasks(seed)
                        .into_iter()
                        .filter(|task| !self.state.visited.contains(&task.url))
                        .collect();
                    let added = frontier.extend(probes);
                    if added > 0 {
                        tracing::debug!("Queued {} common-page probes for {}", added, seed);
                    }
                } else {
                    tracing::debug!("Seed {} did not answer, skipping common-page probes", seed);
                }
            }
        };

        let summary = SeedSummary {
            seed: seed.clone(),
            pages_fetched,
            failures,
            identifiers: records.len(),
            stop_reason,
        };
        Ok((summary, records))
    }

    /// Runs one unit of work: robots check, delay, fetch, extraction, links
    async fn process_task(&self, task: CrawlTask, seed: &Url) -> TaskResult {
        let crawler = &self.config.crawler;
        let robots_timeouts = Timeouts {
            connect: crawler.connect_timeout(),
            read: crawler.robots_timeout(),
        };

        let host = ensure_policy(
            &self.state.robots,
            self.client.as_ref(),
            &task.url,
            robots_timeouts,
        )
        .await;

        if let Some(host) = &host {
            if !self
                .state
                .robots
                .allowed(host, &robots_path(&task.url), &self.agent)
            {
                tracing::debug!("Skipping {} (disallowed by robots.txt)", task.url);
                return TaskResult::skipped();
            }
        }

        let delay = crawler.politeness_delay(
            host.as_deref()
                .and_then(|h| self.state.robots.crawl_delay(h, &self.agent)),
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        tracing::debug!("Fetching {} ({})", task.url, task.tier);
        match self.fetcher.fetch(&task.url).await {
            FetchResult::Success(page) => self.process_page(&task, page, seed).await,
            failure => {
                let status = failure.status();
                match status {
                    FetchStatus::PermanentFail => {
                        tracing::debug!("Dropping {}: {}", task.url, failure.reason().unwrap_or(""))
                    }
                    _ => tracing::warn!("Failed {}: {}", task.url, failure.reason().unwrap_or("")),
                }
                TaskResult::failed(status)
            }
        }
    }

    async fn process_page(&self, task: &CrawlTask, page: FetchedPage, seed: &Url) -> TaskResult {
        let (mut parsed, found) = self.analyse(&page.body, &page.final_url);
        let mut accepted = self.accept(found);
        let mut source_type = SourceType::Static;
        let mut status_code = page.status_code;

        if needs_render(&page.final_url, page.body.len(), accepted.len(), &self.config.render) {
            match &self.renderer {
                Some(renderer) => {
                    tracing::debug!("Rendering {} (nothing found in static body)", page.final_url);
                    let render = &self.config.render;
                    match renderer
                        .render(
                            &page.final_url,
                            render.navigation_timeout(),
                            render.settle_delay(),
                            render.wait_selector.as_deref(),
                        )
                        .await
                    {
                        Ok(body) => {
                            let (rendered, found) = self.analyse(&body, &page.final_url);
                            accepted = self.accept(found);
                            source_type = SourceType::Rendered;
                            status_code = 200;
                            if parsed.title.is_none() {
                                parsed.title = rendered.title;
                            }
                            parsed.anchors.extend(rendered.anchors);
                            parsed.text_urls.extend(rendered.text_urls);
                        }
                        Err(e) => tracing::warn!("Rendering {} failed: {}", page.final_url, e),
                    }
                }
                None => tracing::debug!("No renderer available for {}", page.final_url),
            }
        }

        let title = parsed
            .title
            .as_deref()
            .map(|t| self.extractor.bound_title(t))
            .unwrap_or_default();
        let found_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let records = accepted
            .into_iter()
            .map(|found| RawRecord {
                run_id: self.run_id,
                identifier: found.identifier,
                local_part: found.local_part,
                domain_part: found.domain_part,
                source_url: page.final_url.to_string(),
                source_type: source_type.as_str().to_string(),
                page_title: title.clone(),
                context_snippet: found.context,
                http_status: Some(status_code),
                found_at: found_at.clone(),
                channel: found.channel.as_str().to_string(),
                notes: String::new(),
            })
            .collect::<Vec<_>>();

        if !records.is_empty() {
            tracing::info!("Found {} identifier(s) on {}", records.len(), page.final_url);
        }

        let links = self.links.discover(&parsed, &page.final_url, seed);
        tracing::trace!("{} links kept from {}", links.len(), task.url);

        TaskResult {
            status: Some(FetchStatus::Success),
            records,
            links,
        }
    }

    /// Parses a body once for both links and identifiers
    fn analyse(&self, body: &str, base: &Url) -> (ParsedPage, Vec<ExtractedIdentifier>) {
        let document = Html::parse_document(body);
        (parse_document(&document, base), self.extractor.extract(&document))
    }

    fn accept(&self, found: Vec<ExtractedIdentifier>) -> Vec<ExtractedIdentifier> {
        found
            .into_iter()
            .filter(|record| {
                let verdict = self.classifier.classify(&record.identifier);
                if !verdict.is_accept() {
                    tracing::trace!("Rejected {}: {}", record.identifier, verdict);
                }
                verdict.is_accept()
            })
            .collect()
    }
}

#[cfg(feature = "render")]
fn build_renderer(config: &Config) -> Option<Arc<dyn Renderer>> {
    use crate::crawler::render::ChromiumRenderer;

    config.render.enabled.then(|| {
        Arc::new(ChromiumRenderer::new(config.user_agent.header_value())) as Arc<dyn Renderer>
    })
}

#[cfg(not(feature = "render"))]
fn build_renderer(config: &Config) -> Option<Arc<dyn Renderer>> {
    if config.render.enabled {
        tracing::warn!("Rendering is enabled but this build has no renderer; skipping");
    }
    None
}

/// Runs a complete harvest
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `config_hash` - Hash of the configuration file
/// * `seeds` - Normalized seed URLs
///
/// # Example
///
/// ```no_run
/// use contact_harvester::config::{load_config_with_hash, load_seeds};
/// use contact_harvester::crawler::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("harvest.toml"))?;
/// let seeds = load_seeds(Path::new(&config.output.seeds_path))?;
/// run_harvest(config, &hash, &seeds).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(
    config: Config,
    config_hash: &str,
    seeds: &[Url],
) -> Result<HarvestSummary, HarvestError> {
    let coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run(seeds).await
}
