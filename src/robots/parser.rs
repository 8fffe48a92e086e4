//! Robots.txt parser implementation
//!
//! Allow/deny matching is delegated to the robotstxt crate; `Crawl-delay`,
//! which that crate ignores, is parsed here.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Parsed robots.txt data for one host
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
}

impl ParsedRobots {
    /// Wraps raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Creates a permissive policy
    ///
    /// Used when a host has no robots.txt or it cannot be retrieved.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
        }
    }

    /// Returns true when no rules are present
    pub fn is_permissive(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks if a path is allowed for the given product token
    ///
    /// # Arguments
    ///
    /// * `path` - The path and query to check (e.g., "/staff?page=2")
    /// * `agent` - The crawler's product token (e.g., "ContactHarvester")
    pub fn is_allowed(&self, path: &str, agent: &str) -> bool {
        if self.is_permissive() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, agent, path)
    }

    /// Gets the crawl delay for a specific product token
    ///
    /// A group naming the agent takes precedence over the `*` group. Values
    /// too large for a `Duration` saturate to `Duration::MAX`; callers cap
    /// the result.
    pub fn crawl_delay(&self, agent: &str) -> Option<Duration> {
        if self.is_permissive() {
            return None;
        }

        let normalized_agent = agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut wildcard_delay: Option<f64> = None;
        let mut agent_delay: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // Consecutive User-agent lines share one group
                if !in_agent_lines {
                    group_agents.clear();
                }
                group_agents.push(value.to_lowercase());
                in_agent_lines = true;
                continue;
            }
            in_agent_lines = false;

            if key != "crawl-delay" {
                continue;
            }

            let Ok(delay) = value.parse::<f64>() else {
                continue;
            };
            if !delay.is_finite() || delay < 0.0 {
                continue;
            }

            if group_agents
                .iter()
                .any(|ua| ua != "*" && normalized_agent.contains(ua.as_str()))
            {
                agent_delay = Some(delay);
            } else if group_agents.iter().any(|ua| ua == "*") {
                wildcard_delay = Some(delay);
            }
        }

        agent_delay
            .or(wildcard_delay)
            .map(|secs| Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }
}
