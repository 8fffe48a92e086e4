//! HTTP client seam
//!
//! The fetch ladder talks to the network only through [`HttpClient`], which
//! reports responses of any status as `Ok` and classifies transport failures
//! into the kinds the ladder reacts to differently.

use crate::config::{CrawlerConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Timeouts applied to a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP/TLS connection establishment
    pub connect: Duration,
    /// Whole request, from send to the last body byte
    pub read: Duration,
}

/// A response of any status
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// URL after redirects
    pub final_url: Url,
    /// Response headers, names lower-cased
    pub headers: HashMap<String, String>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Looks up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Transport-level failure kinds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The host name does not resolve
    #[error("name resolution failed: {0}")]
    NameResolution(String),

    #[error("request timed out")]
    Timeout,

    /// Any other connection, TLS, or protocol failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// Minimal HTTP client contract used by the crawler
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs a GET request
    async fn fetch(&self, url: &Url, timeouts: Timeouts) -> Result<HttpResponse, FetchError>;
}

/// reqwest-backed [`HttpClient`]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Builds the client with the crawler's User-Agent
    ///
    /// The connect timeout is fixed at construction; the per-request read
    /// timeout comes from each call's [`Timeouts`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use contact_harvester::config::Config;
    /// use contact_harvester::crawler::ReqwestClient;
    ///
    /// let config = Config::default();
    /// let client = ReqwestClient::new(&config.user_agent, &config.crawler).unwrap();
    /// ```
    pub fn new(agent: &UserAgentConfig, crawler: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(agent.header_value())
            .connect_timeout(crawler.connect_timeout())
            .redirect(Policy::limited(10))
            .danger_accept_invalid_certs(crawler.accept_invalid_certs)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn fetch(&self, url: &Url, timeouts: Timeouts) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeouts.read)
            .send()
            .await
            .map_err(|e| classify_error(&e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_error(&e))?
            .to_vec();

        Ok(HttpResponse {
            status,
            final_url,
            headers,
            body,
        })
    }
}

/// Maps a reqwest error onto the ladder's failure kinds
///
/// Name resolution is checked first: a connect timeout while resolving still
/// means the host does not exist.
fn classify_error(err: &reqwest::Error) -> FetchError {
    if is_name_resolution_failure(err) {
        return FetchError::NameResolution(error_chain(err));
    }
    if err.is_timeout() {
        return FetchError::Timeout;
    }
    FetchError::Transport(error_chain(err))
}

const RESOLUTION_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "no such host",
    "nodename nor servname",
    "temporary failure in name resolution",
];

/// Walks the error source chain looking for resolver failures
pub fn is_name_resolution_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        let message = e.to_string().to_lowercase();
        if RESOLUTION_MARKERS.iter().any(|m| message.contains(m)) {
            return true;
        }
        current = e.source();
    }
    false
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Layer {
        message: &'static str,
        source: Option<Box<Layer>>,
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for Layer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.source.as_deref().map(|s| s as &(dyn StdError + 'static))
        }
    }

    #[test]
    fn test_resolution_failure_found_in_source_chain() {
        let err = Layer {
            message: "error sending request",
            source: Some(Box::new(Layer {
                message: "dns error: failed to lookup address information",
                source: None,
            })),
        };
        assert!(is_name_resolution_failure(&err));
    }

    #[test]
    fn test_connection_refused_is_not_resolution_failure() {
        let err = Layer {
            message: "error trying to connect",
            source: Some(Box::new(Layer {
                message: "Connection refused (os error 111)",
                source: None,
            })),
        };
        assert!(!is_name_resolution_failure(&err));
    }

    #[test]
    fn test_error_chain_joins_messages() {
        let err = Layer {
            message: "outer",
            source: Some(Box::new(Layer {
                message: "inner",
                source: None,
            })),
        };
        assert_eq!(error_chain(&err), "outer: inner");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/html".to_string());
        let response = HttpResponse {
            status: 200,
            final_url: Url::parse("https://univ-x.dz/").unwrap(),
            headers,
            body: Vec::new(),
        };
        assert_eq!(response.header("Content-Type"), Some("text/html"));
    }

    #[test]
    fn test_build_client() {
        let crawler = CrawlerConfig::default();
        let agent = UserAgentConfig::default();
        assert!(ReqwestClient::new(&agent, &crawler).is_ok());
    }
}
