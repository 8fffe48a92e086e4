//! Fetch executor: the per-URL fallback ladder
//!
//! This module turns one URL into one [`FetchResult`]:
//! - Trying the URL as given, then its `www.`-toggled host, then the other scheme
//! - Abandoning immediately on name-resolution failure and on 404/403
//! - Retrying 5xx and transport errors with exponential backoff
//! - Moving to the next host variant on timeout, without retrying
//! - Decoding the body with an ordered list of fallback encodings

use crate::config::CrawlerConfig;
use crate::crawler::http::{FetchError, HttpClient, HttpResponse, Timeouts};
use crate::url::{toggle_scheme, toggle_www};
use encoding_rs::{Encoding, UTF_8};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Outcome class of a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Success,
    /// 404/403, non-HTML, or undecodable; never retried
    PermanentFail,
    /// 5xx or transport errors that outlived their retries
    TransientFail,
    /// The host name does not resolve
    FatalHostFail,
}

/// A successfully fetched and decoded page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The variant that answered
    pub variant: Url,
    /// URL after redirects, used as the base for relative links
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Decoded body
    pub body: String,
    /// Encoding the body was decoded with
    pub encoding: &'static Encoding,
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success(FetchedPage),

    /// Not worth retrying
    PermanentFail {
        reason: String,
        status_code: Option<u16>,
    },

    /// Retries and variants exhausted
    TransientFail {
        reason: String,
        status_code: Option<u16>,
    },

    /// Name resolution failed for the URL as given
    FatalHostFail { reason: String },
}

impl FetchResult {
    pub fn status(&self) -> FetchStatus {
        match self {
            Self::Success(_) => FetchStatus::Success,
            Self::PermanentFail { .. } => FetchStatus::PermanentFail,
            Self::TransientFail { .. } => FetchStatus::TransientFail,
            Self::FatalHostFail { .. } => FetchStatus::FatalHostFail,
        }
    }

    /// Human-readable failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::PermanentFail { reason, .. }
            | Self::TransientFail { reason, .. }
            | Self::FatalHostFail { reason } => Some(reason),
        }
    }
}

/// What one host variant produced
enum VariantOutcome {
    /// Final answer for the URL
    Finished(FetchResult),
    /// Try the next variant
    Fallthrough(String),
}

/// Executes the fallback ladder against an [`HttpClient`]
pub struct Fetcher {
    client: Arc<dyn HttpClient>,
    timeouts: Timeouts,
    retry_attempts: u32,
    backoff_base: Duration,
    fallback_encodings: Vec<&'static Encoding>,
}

impl Fetcher {
    /// Creates a fetcher from crawler settings
    ///
    /// Unknown encoding labels are skipped; configuration validation
    /// already rejects them.
    pub fn new(client: Arc<dyn HttpClient>, config: &CrawlerConfig) -> Self {
        let fallback_encodings = config
            .fallback_encodings
            .iter()
            .filter_map(|label| Encoding::for_label(label.as_bytes()))
            .collect();

        Self {
            client,
            timeouts: Timeouts {
                connect: config.connect_timeout(),
                read: config.read_timeout(),
            },
            retry_attempts: config.retry_attempts,
            backoff_base: config.backoff_base(),
            fallback_encodings,
        }
    }

    /// Host variants tried in order: as given, `www.` toggled, scheme toggled
    pub fn variants(url: &Url) -> Vec<Url> {
        let mut variants = vec![url.clone()];
        if let Some(www) = toggle_www(url) {
            variants.push(www);
        }
        if let Some(scheme) = toggle_scheme(url) {
            variants.push(scheme);
        }
        variants
    }

    /// Fetches a URL through the fallback ladder
    ///
    /// # Ladder
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Name resolution failure on the URL as given | FatalHostFail, stop |
    /// | HTTP 404 / 403 | PermanentFail, stop |
    /// | HTTP 5xx | Retry with backoff, then TransientFail |
    /// | Other transport error | Retry with backoff, then next variant |
    /// | Timeout | Next variant immediately |
    /// | Other non-2xx | TransientFail, stop |
    /// | All variants exhausted | TransientFail |
    pub async fn fetch(&self, url: &Url) -> FetchResult {
        let mut last_reason = String::from("no variant attempted");

        for (index, variant) in Self::variants(url).iter().enumerate() {
            match self.try_variant(variant, index == 0).await {
                VariantOutcome::Finished(result) => return result,
                VariantOutcome::Fallthrough(reason) => {
                    tracing::debug!("Variant {} failed ({}), trying next", variant, reason);
                    last_reason = reason;
                }
            }
        }

        FetchResult::TransientFail {
            reason: format!("all variants exhausted: {}", last_reason),
            status_code: None,
        }
    }

    async fn try_variant(&self, variant: &Url, as_given: bool) -> VariantOutcome {
        let mut attempt: u32 = 0;

        loop {
            match self.client.fetch(variant, self.timeouts).await {
                Ok(response) => {
                    let status = response.status;
                    match status {
                        200..=299 => return VariantOutcome::Finished(self.accept(variant, response)),
                        code @ (404 | 403) => {
                            return VariantOutcome::Finished(FetchResult::PermanentFail {
                                reason: format!("HTTP {}", code),
                                status_code: Some(code),
                            })
                        }
                        code @ 500..=599 if attempt < self.retry_attempts => {
                            tracing::debug!(
                                "HTTP {} from {}, retry {}/{}",
                                code,
                                variant,
                                attempt + 1,
                                self.retry_attempts
                            );
                        }
                        other => {
                            return VariantOutcome::Finished(FetchResult::TransientFail {
                                reason: format!("HTTP {}", other),
                                status_code: Some(other),
                            })
                        }
                    }
                }
                Err(FetchError::NameResolution(message)) => {
                    if as_given {
                        return VariantOutcome::Finished(FetchResult::FatalHostFail {
                            reason: message,
                        });
                    }
                    return VariantOutcome::Fallthrough(message);
                }
                Err(FetchError::Timeout) => {
                    return VariantOutcome::Fallthrough("timeout".to_string());
                }
                Err(FetchError::Transport(message)) => {
                    if attempt >= self.retry_attempts {
                        return VariantOutcome::Fallthrough(message);
                    }
                    tracing::debug!(
                        "Transport error for {} ({}), retry {}/{}",
                        variant,
                        message,
                        attempt + 1,
                        self.retry_attempts
                    );
                }
            }

            tokio::time::sleep(backoff_delay(self.backoff_base, attempt)).await;
            attempt += 1;
        }
    }

    /// Converts a 2xx response into a page, or a permanent failure
    fn accept(&self, variant: &Url, response: HttpResponse) -> FetchResult {
        let content_type = response.content_type().map(str::to_string);

        if let Some(ct) = &content_type {
            if !is_html_content_type(ct) {
                return FetchResult::PermanentFail {
                    reason: format!("non-HTML content type: {}", ct),
                    status_code: Some(response.status),
                };
            }
        }

        let declared = content_type.as_deref().and_then(charset_from_content_type);
        match decode_body(&response.body, declared, &self.fallback_encodings) {
            Some((body, encoding)) => FetchResult::Success(FetchedPage {
                variant: variant.clone(),
                final_url: response.final_url,
                status_code: response.status,
                content_type,
                body,
                encoding,
            }),
            None => FetchResult::PermanentFail {
                reason: "body could not be decoded".to_string(),
                status_code: Some(response.status),
            },
        }
    }
}

/// `base * 2^attempt`, saturating
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime == "text/html" || mime == "application/xhtml+xml" || mime == "text/plain"
}

/// Extracts the `charset=` parameter of a Content-Type value
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').trim_matches('\''))
        } else {
            None
        }
    })
}

/// Decodes a body without replacement characters
///
/// Tried in order: byte-order mark, declared charset, UTF-8, then each
/// fallback. Returns `None` when every candidate finds malformed input.
pub fn decode_body(
    bytes: &[u8],
    declared: Option<&str>,
    fallbacks: &[&'static Encoding],
) -> Option<(String, &'static Encoding)> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if let Some(text) =
            encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        {
            return Some((text.into_owned(), encoding));
        }
    }

    let mut candidates: Vec<&'static Encoding> = Vec::with_capacity(fallbacks.len() + 2);
    if let Some(encoding) = declared.and_then(|label| Encoding::for_label(label.as_bytes())) {
        candidates.push(encoding);
    }
    candidates.push(UTF_8);
    candidates.extend_from_slice(fallbacks);

    let mut tried: Vec<&'static Encoding> = Vec::with_capacity(candidates.len());
    for encoding in candidates {
        if tried.contains(&encoding) {
            continue;
        }
        tried.push(encoding);

        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return Some((text.into_owned(), encoding));
        }
        tracing::trace!("Body is not valid {}", encoding.name());
    }

    None
}
