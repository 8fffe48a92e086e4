//! Link discovery and tier classification
//!
//! Every anchor and bare text URL of a fetched page is resolved, normalized,
//! scoped to the seed's domain unit and filtered against the link denylist.
//! The survivors are assigned the first matching [`Tier`]:
//!
//! 1. contact keyword in anchor text or path
//! 2. numeric page parameter, `/page/N` path, or next/previous anchor text
//! 3. person-name shaped final path segment (`amina-benali`)
//! 4. topical (faculty/department) keyword
//! 5. other host of the same domain unit
//! 6. generic staff-listing keyword
//! 7. unclassified

use crate::config::{Config, LinkConfig};
use crate::crawler::frontier::{CrawlTask, Tier};
use crate::crawler::parser::ParsedPage;
use crate::url::{is_bare_host, normalize_url, same_domain_unit, same_host, strip_www};
use std::collections::HashSet;
use url::Url;

/// Assigns tiers and builds crawl tasks from parsed pages
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    links: LinkConfig,
    suffix: String,
    max_links_per_page: usize,
    probe_common_pages: bool,
    probe_patterns: Vec<String>,
}

impl LinkClassifier {
    pub fn new(config: &Config) -> Self {
        Self {
            links: config.links.clone(),
            suffix: config.extraction.suffix(),
            max_links_per_page: config.crawler.max_links_per_page,
            probe_common_pages: config.crawler.probe_common_pages,
            probe_patterns: config.crawler.probe_patterns.clone(),
        }
    }

    /// Returns true when `url` belongs to the crawl unit of `seed`
    pub fn in_scope(&self, url: &Url, seed: &Url) -> bool {
        same_domain_unit(url, seed, &self.suffix)
    }

    /// Returns true when a path segment matches a denylisted fragment
    ///
    /// A fragment matches a segment it equals or prefixes up to a
    /// non-alphanumeric character, so `login.php` and `wp-admin` match but
    /// `administration` does not match `admin`.
    pub fn is_denylisted(&self, url: &Url) -> bool {
        let path = url.path().to_lowercase();
        path.split('/').any(|segment| {
            self.links.denylist.iter().any(|entry| {
                let entry = entry.to_lowercase();
                match segment.strip_prefix(entry.as_str()) {
                    Some(rest) => rest.chars().next().map_or(true, |c| !c.is_alphanumeric()),
                    None => false,
                }
            })
        })
    }

    /// Assigns the first matching tier to a link
    ///
    /// # Arguments
    ///
    /// * `url` - The normalized link target
    /// * `anchor_text` - Visible anchor text (empty for text URLs)
    /// * `seed` - The seed whose crawl found the link
    pub fn classify(&self, url: &Url, anchor_text: &str, seed: &Url) -> Tier {
        let path = url.path().to_lowercase();
        let text = anchor_text.trim().to_lowercase();

        if contains_any(&path, &text, &self.links.contact_keywords) {
            Tier::Contact
        } else if self.is_pagination(url, &path, &text) {
            Tier::Pagination
        } else if self.is_personal_name(&path) {
            Tier::PersonalName
        } else if contains_any(&path, &text, &self.links.topical_keywords) {
            Tier::Topical
        } else if !same_host(url, seed) && self.in_scope(url, seed) {
            Tier::Subdomain
        } else if contains_any(&path, &text, &self.links.generic_keywords) {
            Tier::Generic
        } else {
            Tier::Unclassified
        }
    }

    fn is_pagination(&self, url: &Url, path: &str, text: &str) -> bool {
        let numeric_param = url.query_pairs().any(|(key, value)| {
            let key = key.to_lowercase();
            self.links.pagination_params.iter().any(|p| *p == key) && is_number(&value)
        });
        if numeric_param {
            return true;
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments
            .windows(2)
            .any(|pair| pair[0] == "page" && is_number(pair[1]))
        {
            return true;
        }

        !text.is_empty()
            && (is_number(text) || self.links.pagination_texts.iter().any(|t| t == text))
    }

    fn is_personal_name(&self, path: &str) -> bool {
        let Some(last) = path.split('/').filter(|s| !s.is_empty()).last() else {
            return false;
        };
        let stem = match last.rsplit_once('.') {
            Some((stem, _ext)) => stem,
            None => last,
        };

        let parts: Vec<&str> = stem.split('-').collect();
        (2..=4).contains(&parts.len())
            && parts.iter().all(|part| {
                part.chars().count() >= 2
                    && part.chars().all(char::is_alphabetic)
                    && !self.links.non_name_keywords.iter().any(|k| k == part)
            })
    }

    /// Builds the crawl tasks for the links of one page
    ///
    /// Links are deduplicated, sorted by tier (stable, so discovery order is
    /// kept inside a tier) and capped at the per-page limit.
    pub fn discover(&self, page: &ParsedPage, page_url: &Url, seed: &Url) -> Vec<CrawlTask> {
        let anchors = page
            .anchors
            .iter()
            .map(|anchor| (&anchor.url, anchor.text.as_str()));
        let text_urls = page.text_urls.iter().map(|url| (url, ""));

        let mut seen = HashSet::new();
        let mut tasks = Vec::new();
        for (url, text) in anchors.chain(text_urls) {
            let Ok(normalized) = normalize_url(url.as_str()) else {
                continue;
            };
            if !self.in_scope(&normalized, seed) || self.is_denylisted(&normalized) {
                continue;
            }
            if !seen.insert(normalized.as_str().to_string()) {
                continue;
            }
            let tier = self.classify(&normalized, text, seed);
            tasks.push(CrawlTask::new(normalized, tier, Some(page_url.clone())));
        }

        tasks.sort_by_key(|task| task.tier);
        tasks.truncate(self.max_links_per_page);
        tasks
    }

    /// Well-known staff-directory locations around a seed
    ///
    /// Subdomains (`staff.univ-x.dz`) are generated for named hosts only;
    /// paths (`/staff`) are generated on both the bare and the `www.` host.
    pub fn probe_tasks(&self, seed: &Url) -> Vec<CrawlTask> {
        if !self.probe_common_pages {
            return Vec::new();
        }
        let Some(host) = seed.host_str().map(str::to_lowercase) else {
            return Vec::new();
        };

        let origin = |host: &str| match seed.port() {
            Some(port) => format!("{}://{}:{}", seed.scheme(), host, port),
            None => format!("{}://{}", seed.scheme(), host),
        };

        let mut candidates = Vec::new();
        if !is_bare_host(&host) {
            let bare = strip_www(&host);
            for pattern in &self.probe_patterns {
                candidates.push(origin(&format!("{}.{}", pattern, bare)));
            }
        }

        let mut hosts = vec![host.clone()];
        if strip_www(&host) != host {
            hosts.push(strip_www(&host).to_string());
        }
        for pattern in &self.probe_patterns {
            for h in &hosts {
                candidates.push(format!("{}/{}", origin(h), pattern));
            }
        }

        let mut seen = HashSet::new();
        candidates
            .iter()
            .filter_map(|candidate| normalize_url(candidate).ok())
            .filter(|url| self.in_scope(url, seed))
            .filter(|url| seen.insert(url.as_str().to_string()))
            .map(|url| CrawlTask::new(url, Tier::Unclassified, None))
            .collect()
    }
}

fn contains_any(path: &str, text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| {
        let keyword = keyword.to_lowercase();
        path.contains(&keyword) || text.contains(&keyword)
    })
}

fn is_number(value: &str) -> bool {
    !value.is_empty() && value.len() <= 6 && value.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::parser::parse_html;

    fn classifier() -> LinkClassifier {
        LinkClassifier::new(&Config::default())
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn seed() -> Url {
        url("https://www.univ-x.dz")
    }

    #[test]
    fn test_contact_tier_from_text_or_path() {
        let c = classifier();
        assert_eq!(c.classify(&url("https://univ-x.dz/contact-us"), "", &seed()), Tier::Contact);
        assert_eq!(c.classify(&url("https://univ-x.dz/x"), "Contact", &seed()), Tier::Contact);
    }

    #[test]
    fn test_pagination_tier() {
        let c = classifier();
        assert_eq!(c.classify(&url("https://univ-x.dz/list?page=2"), "", &seed()), Tier::Pagination);
        assert_eq!(c.classify(&url("https://univ-x.dz/news/page/3"), "", &seed()), Tier::Pagination);
        assert_eq!(c.classify(&url("https://univ-x.dz/x"), "Suivant", &seed()), Tier::Pagination);
        assert_eq!(c.classify(&url("https://univ-x.dz/x"), "4", &seed()), Tier::Pagination);
        assert_ne!(c.classify(&url("https://univ-x.dz/list?page=last"), "", &seed()), Tier::Pagination);
    }

    #[test]
    fn test_personal_name_tier() {
        let c = classifier();
        assert_eq!(c.classify(&url("https://univ-x.dz/amina-benali"), "", &seed()), Tier::PersonalName);
        assert_eq!(
            c.classify(&url("https://univ-x.dz/people/karim-said.html"), "", &seed()),
            Tier::PersonalName
        );
        // Non-name words and single segments are not names
        assert_ne!(c.classify(&url("https://univ-x.dz/news-archive"), "", &seed()), Tier::PersonalName);
        assert_ne!(c.classify(&url("https://univ-x.dz/benali"), "", &seed()), Tier::PersonalName);
        assert_ne!(c.classify(&url("https://univ-x.dz/a-b-c-d-e"), "", &seed()), Tier::PersonalName);
    }

    #[test]
    fn test_first_match_wins() {
        let c = classifier();
        // Contact beats the topical keyword in the same path
        assert_eq!(
            c.classify(&url("https://univ-x.dz/faculte/contact"), "", &seed()),
            Tier::Contact
        );
        // Topical beats subdomain
        assert_eq!(
            c.classify(&url("https://fst.univ-x.dz/departement"), "", &seed()),
            Tier::Topical
        );
    }

    #[test]
    fn test_subdomain_generic_unclassified() {
        let c = classifier();
        assert_eq!(c.classify(&url("https://lab.univ-x.dz/"), "", &seed()), Tier::Subdomain);
        assert_eq!(c.classify(&url("https://univ-x.dz/"), "", &seed()), Tier::Unclassified);
        assert_eq!(c.classify(&url("https://univ-x.dz/annuaire"), "", &seed()), Tier::Generic);
    }

    #[test]
    fn test_denylist_matches_segments() {
        let c = classifier();
        assert!(c.is_denylisted(&url("https://univ-x.dz/wp-login.php")));
        assert!(c.is_denylisted(&url("https://univ-x.dz/user/login")));
        assert!(c.is_denylisted(&url("https://univ-x.dz/admin/users")));
        assert!(!c.is_denylisted(&url("https://univ-x.dz/administration")));
    }

    #[test]
    fn test_discover_scopes_sorts_and_dedupes() {
        let html = r#"
            <html><body>
                <a href="/annuaire">Annuaire</a>
                <a href="/list?page=2">2</a>
                <a href="https://univ-y.dz/staff">Other university</a>
                <a href="/login">Login</a>
                <a href="/annuaire/">Annuaire again</a>
                <p>Also see https://lab.univ-x.dz/members</p>
            </body></html>
        "#;
        let page_url = url("https://www.univ-x.dz/");
        let parsed = parse_html(html, &page_url);
        let tasks = classifier().discover(&parsed, &page_url, &seed());

        let got: Vec<(String, Tier)> = tasks
            .iter()
            .map(|t| (t.url.to_string(), t.tier))
            .collect();
        assert_eq!(
            got,
            vec![
                ("https://www.univ-x.dz/list?page=2".to_string(), Tier::Pagination),
                ("https://lab.univ-x.dz/members".to_string(), Tier::Subdomain),
                ("https://www.univ-x.dz/annuaire".to_string(), Tier::Generic),
            ]
        );
        assert!(tasks.iter().all(|t| t.source.as_ref() == Some(&page_url)));
    }

    #[test]
    fn test_discover_caps_links_per_page() {
        let mut config = Config::default();
        config.crawler.max_links_per_page = 2;
        let c = LinkClassifier::new(&config);

        let html: String = (0..10)
            .map(|i| format!(r#"<a href="/p{}">x</a>"#, i))
            .collect();
        let page_url = url("https://univ-x.dz/");
        let tasks = c.discover(&parse_html(&html, &page_url), &page_url, &page_url);
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn test_common_pages_for_named_host() {
        let tasks = classifier().probe_tasks(&seed());
        let urls: Vec<String> = tasks.iter().map(|t| t.url.to_string()).collect();

        assert!(urls.contains(&"https://staff.univ-x.dz/".to_string()));
        assert!(urls.contains(&"https://www.univ-x.dz/annuaire".to_string()));
        assert!(urls.contains(&"https://univ-x.dz/annuaire".to_string()));
        assert!(!urls.iter().any(|u| u.contains("staff.www.")));
        assert!(tasks.iter().all(|t| t.tier == Tier::Unclassified));
    }

    #[test]
    fn test_common_pages_skip_subdomains_for_ip_hosts() {
        let tasks = classifier().probe_tasks(&url("http://127.0.0.1:8080/"));
        assert!(!tasks.is_empty());
        assert!(tasks
            .iter()
            .all(|t| t.url.host_str() == Some("127.0.0.1") && t.url.port() == Some(8080)));
    }

    #[test]
    fn test_common_pages_disabled() {
        let mut config = Config::default();
        config.crawler.probe_common_pages = false;
        assert!(LinkClassifier::new(&config).probe_tasks(&seed()).is_empty());
    }
}
