use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Contact-Harvester
///
/// Every section has defaults, so a partial (or empty) TOML file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub links: LinkConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of successfully fetched pages per seed
    #[serde(rename = "max-pages-per-seed")]
    pub max_pages_per_seed: u32,

    /// Number of URLs dispatched together in one batch
    #[serde(rename = "worker-pool-size")]
    pub worker_pool_size: u32,

    /// TCP connect timeout (milliseconds)
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// Whole-response read timeout (milliseconds)
    #[serde(rename = "read-timeout-ms")]
    pub read_timeout_ms: u64,

    /// Timeout for robots.txt requests (milliseconds)
    #[serde(rename = "robots-timeout-ms")]
    pub robots_timeout_ms: u64,

    /// Retry attempts for transient failures on the same URL
    #[serde(rename = "retry-attempts")]
    pub retry_attempts: u32,

    /// Base delay for exponential backoff (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Delay before each request when robots.txt gives no crawl-delay (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Upper bound on a robots.txt `Crawl-delay` (milliseconds)
    #[serde(rename = "max-crawl-delay-ms")]
    pub max_crawl_delay_ms: u64,

    /// Queue ceiling is `max-pages-per-seed` times this factor
    #[serde(rename = "queue-ceiling-factor")]
    pub queue_ceiling_factor: u32,

    /// Transient or fatal-host failures, counted across batches without a
    /// success, before a seed is abandoned
    #[serde(rename = "max-consecutive-failures")]
    pub max_consecutive_failures: u32,

    /// Maximum number of new links accepted from a single page
    #[serde(rename = "max-links-per-page")]
    pub max_links_per_page: usize,

    /// Enqueue well-known staff directory locations for every seed
    #[serde(rename = "probe-common-pages")]
    pub probe_common_pages: bool,

    /// Labels probed both as subdomains and as paths of the seed host
    #[serde(rename = "probe-patterns")]
    pub probe_patterns: Vec<String>,

    /// Alternate encodings tried, in order, when a body is not valid UTF-8
    #[serde(rename = "fallback-encodings")]
    pub fallback_encodings: Vec<String>,

    /// Accept invalid TLS certificates
    #[serde(rename = "accept-invalid-certs")]
    pub accept_invalid_certs: bool,
}

impl CrawlerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_millis(self.robots_timeout_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn max_crawl_delay(&self) -> Duration {
        Duration::from_millis(self.max_crawl_delay_ms)
    }

    /// Delay applied before a request
    ///
    /// A host's requested delay wins over the default but never exceeds
    /// `max-crawl-delay-ms`.
    pub fn politeness_delay(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(delay) => delay.min(self.max_crawl_delay()),
            None => self.request_delay(),
        }
    }

    /// Hard ceiling on the number of queued tasks for one seed
    pub fn queue_ceiling(&self) -> usize {
        self.max_pages_per_seed as usize * self.queue_ceiling_factor as usize
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages_per_seed: 50,
            worker_pool_size: 4,
            connect_timeout_ms: 8_000,
            read_timeout_ms: 15_000,
            robots_timeout_ms: 6_000,
            retry_attempts: 3,
            backoff_base_ms: 1_000,
            request_delay_ms: 2_000,
            max_crawl_delay_ms: 30_000,
            queue_ceiling_factor: 10,
            max_consecutive_failures: 5,
            max_links_per_page: 30,
            probe_common_pages: true,
            probe_patterns: strings(&[
                "staff",
                "personnel",
                "enseignants",
                "professeurs",
                "faculty",
                "annuaire",
                "directory",
                "contact",
                "websites",
            ]),
            fallback_encodings: strings(&["windows-1256", "iso-8859-1", "windows-1252"]),
            accept_invalid_certs: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler, also used as the robots.txt product token
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        let base = format!("{}/{}", self.crawler_name, self.crawler_version);
        match (&self.contact_url, &self.contact_email) {
            (Some(url), Some(email)) => format!("{} (+{}; {})", base, url, email),
            (Some(url), None) => format!("{} (+{})", base, url),
            (None, Some(email)) => format!("{} ({})", base, email),
            (None, None) => base,
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ContactHarvester".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the newline-delimited seed list
    #[serde(rename = "seeds-path")]
    pub seeds_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./harvest.db".to_string(),
            seeds_path: "./seeds.txt".to_string(),
        }
    }
}

/// Identifier extraction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Top-level suffix every identifier and in-scope host must end with
    #[serde(rename = "domain-suffix")]
    pub domain_suffix: String,

    /// Characters kept on each side of a body-text match
    #[serde(rename = "text-context-radius")]
    pub text_context_radius: usize,

    /// Characters kept on each side of a match inside markup
    #[serde(rename = "markup-context-radius")]
    pub markup_context_radius: usize,

    /// Upper bound for any context snippet
    #[serde(rename = "max-context-length")]
    pub max_context_length: usize,

    /// Upper bound for stored page titles
    #[serde(rename = "max-title-length")]
    pub max_title_length: usize,
}

impl ExtractionConfig {
    /// Suffix without a leading dot, lower-cased
    pub fn suffix(&self) -> String {
        self.domain_suffix.trim_start_matches('.').to_lowercase()
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            domain_suffix: "dz".to_string(),
            text_context_radius: 100,
            markup_context_radius: 50,
            max_context_length: 200,
            max_title_length: 200,
        }
    }
}

/// Personal vs institutional identifier heuristics
///
/// These are tuning values, not fixed rules: each can be overridden from
/// the `[classifier]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Substrings that mark a local part as institutional
    pub denylist: Vec<String>,

    /// Role tokens rejected when followed by a separator (`vr.`, `doyen-`)
    #[serde(rename = "role-prefixes")]
    pub role_prefixes: Vec<String>,

    /// Characters treated as local-part separators
    pub separators: String,

    /// Local parts shorter than this are rejected
    #[serde(rename = "min-local-length")]
    pub min_local_length: usize,

    /// Upper length bound of the abbreviation heuristic
    #[serde(rename = "abbreviation-max-length")]
    pub abbreviation_max_length: usize,

    /// Separator-free local parts up to this length count as abbreviations
    /// regardless of case
    #[serde(rename = "abbreviation-short-length")]
    pub abbreviation_short_length: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            denylist: strings(&[
                "noreply",
                "no-reply",
                "donotreply",
                "contact",
                "info",
                "support",
                "help",
                "webmaster",
                "admin",
                "administrator",
                "postmaster",
                "abuse",
                "security",
                "service",
                "services",
                "assistance",
                "secretariat",
                "secretary",
                "secretaire",
                "direction",
                "directeur",
                "director",
                "rectorat",
                "rector",
                "recteur",
                "communication",
                "com",
                "marketing",
                "presse",
                "media",
                "relations",
                "accueil",
                "reception",
                "welcome",
                "inscription",
                "admission",
                "registration",
                "biblio",
                "bibliotheque",
                "library",
                "technique",
                "technical",
                "tech",
                "system",
                "systems",
                "sysadmin",
                "test",
                "testing",
                "demo",
                "mail",
                "email",
                "courrier",
                "generic",
                "default",
                "example",
                "elearning",
                "e-learning",
                "elearn",
                "authentification",
                "auth",
                "authentication",
                "vrp",
                "vrex",
                "vr-relex",
                "vr-",
                "cei",
                "ceil",
                "lsp",
                "laa",
                "xxx.xxx",
            ]),
            role_prefixes: strings(&[
                "vr", "vd", "vrp", "vice-recteur", "vicerecteur", "doyen", "dean", "chef", "chief",
                "dir", "directeur", "director", "admin", "service", "sg", "sec",
            ]),
            separators: ".-_".to_string(),
            min_local_length: 3,
            abbreviation_max_length: 4,
            abbreviation_short_length: 3,
        }
    }
}

/// Link discovery and tiering keywords
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Path fragments that are never followed
    pub denylist: Vec<String>,

    /// Tokens that put a link in the contact tier
    #[serde(rename = "contact-keywords")]
    pub contact_keywords: Vec<String>,

    /// Query parameters that carry a page number
    #[serde(rename = "pagination-params")]
    pub pagination_params: Vec<String>,

    /// Anchor texts of next/previous style navigation
    #[serde(rename = "pagination-texts")]
    pub pagination_texts: Vec<String>,

    /// Path words that rule out a person-name segment
    #[serde(rename = "non-name-keywords")]
    pub non_name_keywords: Vec<String>,

    /// Department and faculty keywords
    #[serde(rename = "topical-keywords")]
    pub topical_keywords: Vec<String>,

    /// Low-priority staff listing keywords
    #[serde(rename = "generic-keywords")]
    pub generic_keywords: Vec<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            denylist: strings(&[
                "login",
                "logout",
                "signin",
                "sign-in",
                "signup",
                "register",
                "wp-admin",
                "wp-login",
                "admin",
            ]),
            contact_keywords: strings(&["contact"]),
            pagination_params: strings(&["page", "p", "paged", "pg", "start", "offset"]),
            pagination_texts: strings(&[
                "next",
                "previous",
                "prev",
                "next page",
                "suivant",
                "précédent",
                "precedent",
                "page suivante",
                "»",
                "«",
                "›",
                "‹",
                ">>",
                "<<",
            ]),
            non_name_keywords: strings(&[
                "page", "news", "actualites", "actualite", "event", "events", "category", "tag",
                "article", "post", "home", "accueil", "search", "archive", "about", "read-more",
                "lire", "suite", "des", "du", "la", "les", "et", "of", "the", "and", "en", "fr",
                "ar", "faculte", "faculty", "departement", "department", "institut", "laboratoire",
            ]),
            topical_keywords: strings(&[
                "faculte",
                "faculty",
                "departement",
                "department",
                "laboratoire",
                "laboratory",
                "labo",
                "institut",
                "institute",
                "ecole",
                "school",
            ]),
            generic_keywords: strings(&[
                "staff",
                "websites",
                "personnel",
                "enseignants",
                "enseignant",
                "professeurs",
                "professeur",
                "equipe",
                "team",
                "annuaire",
                "directory",
                "corps",
                "chercheur",
                "researcher",
                "membres",
                "members",
            ]),
        }
    }
}

/// Headless rendering fallback configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Use the headless renderer when a page looks script-built
    pub enabled: bool,

    /// Bodies smaller than this (bytes) are candidates for rendering
    #[serde(rename = "size-threshold")]
    pub size_threshold: usize,

    /// Path fragments of listing/index pages that are always candidates
    #[serde(rename = "listing-patterns")]
    pub listing_patterns: Vec<String>,

    /// Navigation timeout (milliseconds)
    #[serde(rename = "navigation-timeout-ms")]
    pub navigation_timeout_ms: u64,

    /// Fixed wait after navigation (milliseconds)
    #[serde(rename = "settle-delay-ms")]
    pub settle_delay_ms: u64,

    /// Selector waited for, best-effort, before reading the DOM
    #[serde(rename = "wait-selector")]
    pub wait_selector: Option<String>,
}

impl RenderConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size_threshold: 5_000,
            listing_patterns: strings(&[
                "annuaire",
                "directory",
                "staff",
                "personnel",
                "enseignants",
                "liste",
                "list",
                "membres",
                "members",
                "equipe",
                "team",
            ]),
            navigation_timeout_ms: 15_000,
            settle_delay_ms: 2_000,
            wait_selector: Some("main, #content, .content, article".to_string()),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
